use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ReleaseError;
use crate::probe::{Probe, probe_json};

pub const CONFIG_FILE_NAME: &str = "release.json";
pub const PROJECT_ROOT_ENV: &str = "MZERO_PROJECT_ROOT";

/// Build configuration shared by every release stage. Loaded from
/// `<project-root>/release.json`; only `version` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseConfig {
    #[serde(skip)]
    pub project_root: PathBuf,

    #[serde(default = "default_product")]
    pub product: String,

    pub version: String,

    #[serde(default = "default_repository")]
    pub repository: String,

    #[serde(default = "default_target_dir")]
    pub target_dir: PathBuf,

    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    #[serde(default = "default_binaries_dir")]
    pub binaries_dir: PathBuf,
}

fn default_product() -> String {
    "MetadataZero".to_string()
}

fn default_repository() -> String {
    "metadatazero/metadatazero".to_string()
}

fn default_target_dir() -> PathBuf {
    PathBuf::from("target")
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_binaries_dir() -> PathBuf {
    PathBuf::from("binaries")
}

/// The fields of `release.json` the dependency fetcher reads.
#[derive(Debug, Deserialize)]
struct DependencyConfig {
    #[serde(default = "default_binaries_dir")]
    binaries_dir: PathBuf,
}

/// `MZERO_PROJECT_ROOT`, or the current directory.
///
/// # Errors
/// Returns an error if the current directory cannot be resolved.
pub fn project_root() -> Result<PathBuf, ReleaseError> {
    match std::env::var_os(PROJECT_ROOT_ENV) {
        Some(root) if !root.is_empty() => Ok(PathBuf::from(root)),
        _ => std::env::current_dir().map_err(|error| {
            ReleaseError::io("failed to resolve current directory", Path::new("."), error)
        }),
    }
}

/// Where the side-car binaries live under `project_root`. `release.json` is
/// optional here and only its `binaries_dir` is read.
///
/// # Errors
/// Returns an error if `release.json` exists but is not valid JSON.
pub fn resolve_binaries_dir(project_root: &Path) -> Result<PathBuf, ReleaseError> {
    let path = project_root.join(CONFIG_FILE_NAME);
    let binaries_dir = match probe_json::<DependencyConfig>(&path) {
        Probe::Ready(config) => config.binaries_dir,
        Probe::Absent(_) => default_binaries_dir(),
        Probe::Malformed { path, details } => return Err(ReleaseError::Config { path, details }),
    };
    Ok(project_root.join(binaries_dir))
}

impl ReleaseConfig {
    /// Load `release.json` from `project_root`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON, or its
    /// version is not semver.
    pub fn load(project_root: &Path) -> Result<Self, ReleaseError> {
        let path = project_root.join(CONFIG_FILE_NAME);
        let content = std::fs::read_to_string(&path)
            .map_err(|error| ReleaseError::io("failed to read release config", &path, error))?;
        let mut config: Self =
            serde_json::from_str(&content).map_err(|error| ReleaseError::Config {
                path: path.clone(),
                details: error.to_string(),
            })?;

        let version = config.version.strip_prefix('v').unwrap_or(&config.version);
        semver::Version::parse(version).map_err(|error| ReleaseError::Config {
            path: path.clone(),
            details: format!("version {:?} is not semver: {error}", config.version),
        })?;
        config.version = version.to_string();
        config.project_root = project_root.to_path_buf();
        Ok(config)
    }

    #[must_use]
    pub fn target_dir(&self) -> PathBuf {
        self.project_root.join(&self.target_dir)
    }

    #[must_use]
    pub fn artifacts_dir(&self) -> PathBuf {
        self.project_root.join(&self.artifacts_dir)
    }

    #[must_use]
    pub fn binaries_dir(&self) -> PathBuf {
        self.project_root.join(&self.binaries_dir)
    }

    /// Public download URL of a release asset.
    #[must_use]
    pub fn download_url(&self, asset_name: &str) -> String {
        format!(
            "https://github.com/{}/releases/download/v{}/{asset_name}",
            self.repository, self.version
        )
    }
}
