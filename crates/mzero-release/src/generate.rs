use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::info;
use mzero_core::{PlatformEntry, UpdateManifest};

use crate::config::ReleaseConfig;
use crate::error::ReleaseError;
use crate::output::write_atomic;
use crate::platform::{Arch, Platform, public_asset_name};
use crate::probe::probe_text;

pub const FRAGMENT_FILE_NAME: &str = "latest.json";

/// Where one build job's updater asset lives and how the manifest names it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformArtifactSet {
    pub platform_id: String,
    pub bundle_root: PathBuf,
    pub asset_name: String,
    pub signature_file: PathBuf,
}

impl PlatformArtifactSet {
    #[must_use]
    pub fn locate(config: &ReleaseConfig, platform: Platform, target: &str) -> Self {
        let bundle = platform.bundle_dir(&config.target_dir(), target);
        let (arch, subdir, extension) = match platform {
            Platform::Darwin => (Arch::from_target(target), "macos", "app.tar.gz"),
            Platform::Linux => (Arch::X64, "appimage", "AppImage"),
            Platform::Windows => (Arch::X64, "nsis", "exe"),
        };
        let asset_name =
            public_asset_name(&config.product, &config.version, platform, arch, extension);
        let bundle_root = bundle.join(subdir);

        Self {
            platform_id: format!("{platform}-{}", arch.manifest_tag()),
            signature_file: bundle_root.join(format!("{asset_name}.sig")),
            bundle_root,
            asset_name,
        }
    }

    #[must_use]
    pub fn fragment_path(&self) -> PathBuf {
        self.bundle_root.join(FRAGMENT_FILE_NAME)
    }
}

/// Write the single-platform `latest.json` next to the signed asset.
/// Returns `None` when the job produced no signature.
///
/// # Errors
/// Returns an error if the fragment cannot be written.
pub fn generate_manifest(
    config: &ReleaseConfig,
    platform: Platform,
    target: &str,
    now: DateTime<Utc>,
) -> Result<Option<PathBuf>, ReleaseError> {
    let artifacts = PlatformArtifactSet::locate(config, platform, target);
    info!("Generating latest.json for {}", artifacts.platform_id);

    let Some(signature) = probe_text(&artifacts.signature_file).ready_or_warn() else {
        info!("Skipped manifest for {}", artifacts.platform_id);
        return Ok(None);
    };

    let manifest = UpdateManifest::fragment(
        &config.version,
        now,
        artifacts.platform_id.clone(),
        PlatformEntry {
            signature: signature.trim().to_string(),
            url: config.download_url(&artifacts.asset_name),
        },
    );
    let json = manifest.to_pretty_json().map_err(|error| ReleaseError::MalformedManifest {
        path: artifacts.fragment_path(),
        details: error.to_string(),
    })?;

    let output = artifacts.fragment_path();
    write_atomic(&output, json.as_bytes())?;
    info!("Created {}", output.display());
    Ok(Some(output))
}
