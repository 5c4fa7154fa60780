use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ReleaseError;

/// Operating system family a build job produces artifacts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Darwin,
    Linux,
    Windows,
}

impl FromStr for Platform {
    type Err = ReleaseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "darwin" => Ok(Self::Darwin),
            "linux" => Ok(Self::Linux),
            "windows" => Ok(Self::Windows),
            other => Err(ReleaseError::UnknownPlatform(other.to_string())),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Darwin => "darwin",
            Self::Linux => "linux",
            Self::Windows => "windows",
        })
    }
}

impl Platform {
    /// Tag used in public asset names.
    #[must_use]
    pub fn os_tag(self) -> &'static str {
        match self {
            Self::Darwin => "mac",
            Self::Linux => "linux",
            Self::Windows => "win",
        }
    }

    /// Only macOS builds are split by architecture; the others come from the
    /// default bundle directory.
    #[must_use]
    pub fn bundle_dir(self, target_dir: &Path, target: &str) -> PathBuf {
        match self {
            Self::Darwin => bundle_dir(target_dir, target),
            Self::Linux | Self::Windows => bundle_dir(target_dir, "default"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X64,
    Arm64,
}

impl Arch {
    #[must_use]
    pub fn from_target(target: &str) -> Self {
        if target.contains("aarch64") {
            Self::Arm64
        } else {
            Self::X64
        }
    }

    /// Tag used in public asset names.
    #[must_use]
    pub fn public_tag(self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
        }
    }

    /// Tag the bundler writes into its default file names.
    #[must_use]
    pub fn bundler_tag(self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::Arm64 => "aarch64",
        }
    }

    /// Architecture half of an update platform id.
    #[must_use]
    pub fn manifest_tag(self) -> &'static str {
        match self {
            Self::X64 => "x86_64",
            Self::Arm64 => "aarch64",
        }
    }
}

/// Bundler output directory for a compilation target.
#[must_use]
pub fn bundle_dir(target_dir: &Path, target: &str) -> PathBuf {
    let base = if target == "default" {
        target_dir.to_path_buf()
    } else if target.contains("universal") {
        target_dir.join("universal-apple-darwin")
    } else {
        target_dir.join(target)
    };
    base.join("release").join("bundle")
}

/// `{product}-{version}-{os}-{arch}.{extension}`
#[must_use]
pub fn public_asset_name(
    product: &str,
    version: &str,
    platform: Platform,
    arch: Arch,
    extension: &str,
) -> String {
    format!(
        "{product}-{version}-{}-{}.{extension}",
        platform.os_tag(),
        arch.public_tag()
    )
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{Arch, Platform, bundle_dir, public_asset_name};
    use crate::error::ReleaseError;

    #[test]
    fn platforms_parse_and_reject_unknown() {
        assert_eq!("darwin".parse::<Platform>().ok(), Some(Platform::Darwin));
        assert_eq!("windows".parse::<Platform>().ok(), Some(Platform::Windows));
        assert!(matches!(
            "freebsd".parse::<Platform>(),
            Err(ReleaseError::UnknownPlatform(name)) if name == "freebsd"
        ));
    }

    #[test]
    fn bundle_dir_per_target_kind() {
        let target = Path::new("target");
        assert_eq!(
            bundle_dir(target, "default"),
            PathBuf::from("target/release/bundle")
        );
        assert_eq!(
            bundle_dir(target, "universal-apple-darwin"),
            PathBuf::from("target/universal-apple-darwin/release/bundle")
        );
        assert_eq!(
            bundle_dir(target, "aarch64-apple-darwin"),
            PathBuf::from("target/aarch64-apple-darwin/release/bundle")
        );
    }

    #[test]
    fn linux_ignores_the_target_directory() {
        assert_eq!(
            Platform::Linux.bundle_dir(Path::new("target"), "x86_64-unknown-linux-gnu"),
            PathBuf::from("target/release/bundle")
        );
    }

    #[test]
    fn arch_tags() {
        let arch = Arch::from_target("aarch64-apple-darwin");
        assert_eq!(arch.public_tag(), "arm64");
        assert_eq!(arch.bundler_tag(), "aarch64");
        assert_eq!(arch.manifest_tag(), "aarch64");
        assert_eq!(Arch::from_target("default"), Arch::X64);
    }

    #[test]
    fn public_names() {
        assert_eq!(
            public_asset_name("MetadataZero", "1.2.3", Platform::Windows, Arch::X64, "msi"),
            "MetadataZero-1.2.3-win-x64.msi"
        );
    }
}
