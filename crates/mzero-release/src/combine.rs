use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{info, warn};
use mzero_core::UpdateManifest;
use serde::{Deserialize, Serialize};

use crate::config::ReleaseConfig;
use crate::error::ReleaseError;
use crate::generate::FRAGMENT_FILE_NAME;
use crate::output::write_atomic;
use crate::probe::probe_json;

/// Per-job fragment directories under the artifacts directory.
pub const FRAGMENT_DIRS: [&str; 4] = [
    "latest-json-macos-x86_64",
    "latest-json-macos-aarch64",
    "latest-json-linux",
    "latest-json-windows",
];

/// The part of a fragment the combiner reads. Other top-level fields are
/// ignored and platform entries are kept as raw JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fragment {
    #[serde(default)]
    pub platforms: BTreeMap<String, serde_json::Value>,
}

/// `latest.json` as written by the combiner, entries copied verbatim from
/// the fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedManifest {
    pub version: String,
    pub pub_date: String,
    pub platforms: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug)]
pub struct CombineReport {
    pub output: PathBuf,
    pub manifest: CombinedManifest,
    pub merged: Vec<PathBuf>,
}

/// Union the platform entries of `fragments` into a manifest for `version`.
/// A key seen twice keeps the later entry.
#[must_use]
pub fn merge_fragments(
    version: &str,
    at: DateTime<Utc>,
    fragments: impl IntoIterator<Item = (PathBuf, Fragment)>,
) -> CombinedManifest {
    let stamp = UpdateManifest::new(version, at);
    let mut platforms = BTreeMap::new();
    for (path, fragment) in fragments {
        for (platform_id, entry) in fragment.platforms {
            if platforms.contains_key(&platform_id) {
                warn!(
                    "{platform_id} appears in more than one fragment; using {}",
                    path.display()
                );
            }
            platforms.insert(platform_id, entry);
        }
    }
    CombinedManifest {
        version: stamp.version,
        pub_date: stamp.pub_date,
        platforms,
    }
}

/// Read the fragments found under `artifacts_dir`, skipping missing or
/// malformed ones.
#[must_use]
pub fn collect_fragments(artifacts_dir: &Path) -> Vec<(PathBuf, Fragment)> {
    FRAGMENT_DIRS
        .iter()
        .map(|dir| artifacts_dir.join(dir).join(FRAGMENT_FILE_NAME))
        .filter_map(|path| {
            let fragment = probe_json::<Fragment>(&path).ready_or_warn()?;
            info!(
                "Loaded {} ({} platform(s))",
                path.display(),
                fragment.platforms.len()
            );
            Some((path, fragment))
        })
        .collect()
}

/// Combine every available fragment into `artifacts_dir/latest.json`.
///
/// # Errors
/// Returns [`ReleaseError::EmptyUnion`] without writing anything when no
/// fragment contributes a platform, or an error if the output cannot be
/// written.
pub fn combine_manifests(
    config: &ReleaseConfig,
    now: DateTime<Utc>,
) -> Result<CombineReport, ReleaseError> {
    let artifacts_dir = config.artifacts_dir();
    info!("Combining latest.json files in {}", artifacts_dir.display());

    let fragments = collect_fragments(&artifacts_dir);
    let merged: Vec<PathBuf> = fragments.iter().map(|(path, _)| path.clone()).collect();
    let manifest = merge_fragments(&config.version, now, fragments);

    if manifest.platforms.is_empty() {
        return Err(ReleaseError::EmptyUnion);
    }

    let output = artifacts_dir.join(FRAGMENT_FILE_NAME);
    let json = serde_json::to_string_pretty(&manifest)
        .map_err(|error| ReleaseError::MalformedManifest {
            path: output.clone(),
            details: error.to_string(),
        })?;
    write_atomic(&output, json.as_bytes())?;

    info!("Created combined {}", output.display());
    for platform_id in manifest.platforms.keys() {
        info!("  - {platform_id}");
    }

    Ok(CombineReport {
        output,
        manifest,
        merged,
    })
}
