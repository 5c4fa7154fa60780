use std::path::PathBuf;

use log::{debug, info};

use crate::config::ReleaseConfig;
use crate::error::ReleaseError;
use crate::platform::{Arch, Platform, public_asset_name};
use crate::probe::{Probe, probe_exists};

/// One bundler output and its public name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRule {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Default)]
pub struct RenameReport {
    pub renamed: Vec<RenameRule>,
    pub missing: Vec<PathBuf>,
}

/// Bundler default names mapped to public names for one platform/target.
#[must_use]
pub fn rename_plan(config: &ReleaseConfig, platform: Platform, target: &str) -> Vec<RenameRule> {
    let product = config.product.as_str();
    let version = config.version.as_str();
    let bundle = platform.bundle_dir(&config.target_dir(), target);
    let arch = match platform {
        Platform::Darwin => Arch::from_target(target),
        Platform::Linux | Platform::Windows => Arch::X64,
    };
    let public = |extension: &str| public_asset_name(product, version, platform, arch, extension);

    // (subdir, bundler name, public name, has signature)
    let entries: Vec<(&str, String, String, bool)> = match platform {
        Platform::Darwin => vec![
            (
                "dmg",
                format!("{product}_{version}_{}.dmg", arch.bundler_tag()),
                public("dmg"),
                false,
            ),
            (
                "macos",
                format!("{product}.app.tar.gz"),
                public("app.tar.gz"),
                true,
            ),
        ],
        Platform::Linux => vec![
            (
                "appimage",
                format!("{product}_{version}_amd64.AppImage"),
                public("AppImage"),
                true,
            ),
            (
                "deb",
                format!("{product}_{version}_amd64.deb"),
                public("deb"),
                false,
            ),
        ],
        Platform::Windows => vec![
            (
                "nsis",
                format!("{product}_{version}_x64-setup.exe"),
                public("exe"),
                true,
            ),
            (
                "msi",
                format!("{product}_{version}_x64_en-US.msi"),
                public("msi"),
                true,
            ),
        ],
    };

    let mut plan = Vec::new();
    for (subdir, from, to, signed) in entries {
        let dir = bundle.join(subdir);
        if signed {
            plan.push(RenameRule {
                from: dir.join(format!("{from}.sig")),
                to: dir.join(format!("{to}.sig")),
            });
        }
        plan.push(RenameRule {
            from: dir.join(from),
            to: dir.join(to),
        });
    }
    plan
}

/// Rename every present bundler output in place. Missing files are skipped
/// with a warning.
///
/// # Errors
/// Returns an error if renaming a present file fails.
pub fn rename_artifacts(
    config: &ReleaseConfig,
    platform: Platform,
    target: &str,
) -> Result<RenameReport, ReleaseError> {
    info!("Renaming {platform} artifacts for target {target}");
    let mut report = RenameReport::default();

    for rule in rename_plan(config, platform, target) {
        let probe = probe_exists(&rule.from);
        if let Probe::Absent(path) = &probe {
            report.missing.push(path.clone());
        }
        if probe.ready_or_warn().is_none() {
            continue;
        }

        std::fs::rename(&rule.from, &rule.to)
            .map_err(|error| ReleaseError::io("failed to rename artifact", &rule.from, error))?;
        debug!("{} -> {}", rule.from.display(), rule.to.display());
        info!(
            "Renamed {}",
            rule.to.file_name().unwrap_or_default().to_string_lossy()
        );
        report.renamed.push(rule);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::rename_plan;
    use crate::config::ReleaseConfig;
    use crate::platform::Platform;

    fn config(root: &Path) -> ReleaseConfig {
        std::fs::write(root.join("release.json"), r#"{ "version": "1.2.3" }"#)
            .expect("config should be written");
        ReleaseConfig::load(root).expect("config should load")
    }

    fn names(plan: &[super::RenameRule]) -> Vec<(String, String)> {
        plan.iter()
            .map(|rule| {
                (
                    rule.from.file_name().unwrap_or_default().to_string_lossy().to_string(),
                    rule.to.file_name().unwrap_or_default().to_string_lossy().to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn darwin_plan_uses_target_arch_and_dir() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let plan = rename_plan(&config(temp.path()), Platform::Darwin, "aarch64-apple-darwin");

        assert!(plan[0].from.starts_with(
            temp.path().join("target/aarch64-apple-darwin/release/bundle/dmg")
        ));
        assert_eq!(
            names(&plan),
            [
                (
                    "MetadataZero_1.2.3_aarch64.dmg".to_string(),
                    "MetadataZero-1.2.3-mac-arm64.dmg".to_string()
                ),
                (
                    "MetadataZero.app.tar.gz.sig".to_string(),
                    "MetadataZero-1.2.3-mac-arm64.app.tar.gz.sig".to_string()
                ),
                (
                    "MetadataZero.app.tar.gz".to_string(),
                    "MetadataZero-1.2.3-mac-arm64.app.tar.gz".to_string()
                ),
            ]
        );
    }

    #[test]
    fn windows_plan_covers_installers_and_signatures() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let plan = rename_plan(&config(temp.path()), Platform::Windows, "default");

        let renamed: Vec<String> = names(&plan).into_iter().map(|(_, to)| to).collect();
        assert_eq!(
            renamed,
            [
                "MetadataZero-1.2.3-win-x64.exe.sig",
                "MetadataZero-1.2.3-win-x64.exe",
                "MetadataZero-1.2.3-win-x64.msi.sig",
                "MetadataZero-1.2.3-win-x64.msi",
            ]
        );
        assert!(plan[0].from.starts_with(temp.path().join("target/release/bundle/nsis")));
    }
}
