//! Target triples and update platform identifiers for the running build.

/// File name prefix of the bundled ExifTool side-car binaries.
pub const EXIFTOOL_PREFIX: &str = "exiftool";

/// UNIX targets that share the single platform-agnostic ExifTool script.
pub const UNIX_TARGET_TRIPLES: [&str; 4] = [
    "x86_64-apple-darwin",
    "aarch64-apple-darwin",
    "x86_64-unknown-linux-gnu",
    "aarch64-unknown-linux-gnu",
];

pub const WINDOWS_TARGET_TRIPLE: &str = "x86_64-pc-windows-msvc";

/// Platform identifier used as the key in the update manifest, or `None` when
/// no release is published for this build.
#[must_use]
pub fn current_platform_id() -> Option<&'static str> {
    if cfg!(target_os = "macos") && cfg!(target_arch = "aarch64") {
        Some("darwin-aarch64")
    } else if cfg!(target_os = "macos") && cfg!(target_arch = "x86_64") {
        Some("darwin-x86_64")
    } else if cfg!(target_os = "linux") && cfg!(target_arch = "x86_64") {
        Some("linux-x86_64")
    } else if cfg!(target_os = "windows") && cfg!(target_arch = "x86_64") {
        Some("windows-x86_64")
    } else {
        None
    }
}

#[must_use]
pub fn current_target_triple() -> Option<&'static str> {
    if cfg!(target_os = "macos") && cfg!(target_arch = "aarch64") {
        Some("aarch64-apple-darwin")
    } else if cfg!(target_os = "macos") && cfg!(target_arch = "x86_64") {
        Some("x86_64-apple-darwin")
    } else if cfg!(target_os = "linux") && cfg!(target_arch = "aarch64") {
        Some("aarch64-unknown-linux-gnu")
    } else if cfg!(target_os = "linux") && cfg!(target_arch = "x86_64") {
        Some("x86_64-unknown-linux-gnu")
    } else if cfg!(target_os = "windows") && cfg!(target_arch = "aarch64") {
        Some("aarch64-pc-windows-msvc")
    } else if cfg!(target_os = "windows") && cfg!(target_arch = "x86_64") {
        Some(WINDOWS_TARGET_TRIPLE)
    } else {
        None
    }
}

/// Name of a side-car binary for `triple`, e.g. `exiftool-x86_64-pc-windows-msvc.exe`.
#[must_use]
pub fn sidecar_file_name(prefix: &str, triple: &str) -> String {
    if triple.contains("windows") {
        format!("{prefix}-{triple}.exe")
    } else {
        format!("{prefix}-{triple}")
    }
}
