use std::path::Path;

use log::{debug, info};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::archive::ArchiveError;
use crate::signature::{self, SignatureError};
use crate::update::AppUpdate;

/// What the caller has to do once an update is on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    RestartRequired,
    ExitForInstaller,
}

#[derive(Debug, Error)]
pub enum AutoUpdateError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    Http {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error("{context}: {details}")]
    Platform {
        context: &'static str,
        details: String,
    },
    #[error("{0}")]
    Invalid(String),
}

impl AutoUpdateError {
    fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    fn http(context: &'static str, source: reqwest::Error) -> Self {
        Self::Http { context, source }
    }

    fn platform(context: &'static str, details: String) -> Self {
        Self::Platform { context, details }
    }

    fn io_with_path(context: &'static str, path: &Path, source: &std::io::Error) -> Self {
        Self::io(
            context,
            std::io::Error::new(source.kind(), format!("{}: {source}", path.display())),
        )
    }
}

/// The package formats the release pipeline publishes for self-update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// `.app.tar.gz` bundle archive (macOS).
    AppArchive,
    /// Self-contained `.AppImage` executable (Linux).
    AppImage,
    /// NSIS `.exe` installer (Windows).
    Installer,
}

impl AssetKind {
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".app.tar.gz") {
            Some(Self::AppArchive)
        } else if lower.ends_with(".appimage") {
            Some(Self::AppImage)
        } else if lower.ends_with(".exe") {
            Some(Self::Installer)
        } else {
            None
        }
    }
}

/// Download the update package, verify its signature against the pinned
/// updater key, and install it over the running copy.
///
/// # Errors
/// Returns an error when downloading, verifying, or installing fails. Nothing
/// is installed unless the download completed and its signature matched.
pub async fn download_and_apply(
    client: &reqwest::Client,
    update: &AppUpdate,
) -> Result<ApplyResult, AutoUpdateError> {
    let update_dir = mzero_platform::AppPaths::new()
        .map_err(|error| AutoUpdateError::platform("failed to resolve app paths", error.to_string()))?
        .update_dir();
    std::fs::create_dir_all(&update_dir)
        .map_err(|error| AutoUpdateError::io("failed to create update directory", error))?;

    let temp_dir = tempfile::tempdir_in(&update_dir)
        .map_err(|error| AutoUpdateError::io("failed to create temp directory", error))?;

    let file_name = download_file_name(&update.download_url);
    let kind = AssetKind::from_file_name(file_name).ok_or_else(|| {
        AutoUpdateError::Invalid(format!("Unrecognized update package: {file_name}"))
    })?;

    info!(
        "Downloading update {} from {}",
        update.latest_version, update.download_url
    );
    download_file(client, &update.download_url, &temp_dir.path().join(file_name)).await?;

    apply_verified(
        temp_dir,
        file_name,
        kind,
        &update.signature,
        signature::UPDATER_PUBLIC_KEY,
    )
}

/// Install the package downloaded into `temp_dir` once its signature checks
/// out. A rejected package is removed along with `temp_dir`.
fn apply_verified(
    temp_dir: tempfile::TempDir,
    file_name: &str,
    kind: AssetKind,
    signature: &str,
    public_key: &str,
) -> Result<ApplyResult, AutoUpdateError> {
    let download_path = temp_dir.path().join(file_name);
    signature::verify_package(&download_path, signature, public_key)?;
    info!("Update signature verified for {file_name}");

    match kind {
        AssetKind::AppArchive => {
            let extract_dir = temp_dir.path().join("extracted");
            crate::archive::extract_tar_gz(&download_path, &extract_dir)?;
            apply_app_archive(&extract_dir)
        }
        AssetKind::AppImage => apply_appimage(&download_path),
        AssetKind::Installer => {
            // The installer runs after we exit, so its package must outlive the temp dir.
            let kept = temp_dir.keep();
            apply_installer(&kept.join(file_name))
        }
    }
}

fn download_file_name(url: &str) -> &str {
    let raw_name = url.rsplit('/').next().unwrap_or("update-download");
    Path::new(raw_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && !n.contains(".."))
        .unwrap_or("update-download")
}

async fn download_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<(), AutoUpdateError> {
    use futures_util::StreamExt;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|error| AutoUpdateError::http("download request failed", error))?;

    if !response.status().is_success() {
        return Err(AutoUpdateError::Invalid(format!(
            "Download failed with status {}",
            response.status()
        )));
    }

    let mut downloaded: u64 = 0;
    let mut file = tokio::fs::File::create(dest).await.map_err(|error| {
        AutoUpdateError::io_with_path("failed to create download file", dest, &error)
    })?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|error| AutoUpdateError::http("download stream error", error))?;
        file.write_all(&chunk).await.map_err(|error| {
            AutoUpdateError::io_with_path("failed to write download data", dest, &error)
        })?;
        downloaded += chunk.len() as u64;
    }

    file.flush().await.map_err(|error| {
        AutoUpdateError::io_with_path("failed to flush download file", dest, &error)
    })?;

    info!("Download complete: {downloaded} bytes");
    Ok(())
}

#[cfg(target_os = "macos")]
fn apply_app_archive(extract_dir: &Path) -> Result<ApplyResult, AutoUpdateError> {
    let new_app = find_app_bundle(extract_dir)?;
    let current_bundle = current_app_bundle()?;
    let old_bundle = current_bundle.with_extension("app.old");

    info!(
        "Replacing {} with {}",
        current_bundle.display(),
        new_app.display()
    );

    if old_bundle.exists() {
        std::fs::remove_dir_all(&old_bundle).map_err(|error| {
            AutoUpdateError::io_with_path("failed to remove old backup", &old_bundle, &error)
        })?;
    }

    std::fs::rename(&current_bundle, &old_bundle).map_err(|error| {
        AutoUpdateError::io_with_path(
            "failed to move current app bundle aside",
            &current_bundle,
            &error,
        )
    })?;

    if let Err(error) = move_dir(&new_app, &current_bundle) {
        log::warn!("Apply failed, restoring backup: {error}");
        let _ = std::fs::rename(&old_bundle, &current_bundle);
        return Err(error);
    }

    let _ = std::process::Command::new("xattr")
        .args(["-cr", &current_bundle.to_string_lossy()])
        .output();

    info!("macOS update applied successfully");
    Ok(ApplyResult::RestartRequired)
}

#[cfg(not(target_os = "macos"))]
fn apply_app_archive(_extract_dir: &Path) -> Result<ApplyResult, AutoUpdateError> {
    Err(AutoUpdateError::Invalid(
        "App bundle updates are only supported on macOS".to_string(),
    ))
}

#[cfg(target_os = "macos")]
fn find_app_bundle(dir: &Path) -> Result<std::path::PathBuf, AutoUpdateError> {
    for entry in std::fs::read_dir(dir)
        .map_err(|error| AutoUpdateError::io_with_path("failed to read extract dir", dir, &error))?
    {
        let entry = entry.map_err(|error| {
            AutoUpdateError::io("failed to read extract directory entry", error)
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("app") && path.is_dir() {
            return Ok(path);
        }
    }
    Err(AutoUpdateError::Invalid(
        "No .app bundle found in extracted archive".to_string(),
    ))
}

#[cfg(target_os = "macos")]
fn current_app_bundle() -> Result<std::path::PathBuf, AutoUpdateError> {
    let exe = std::env::current_exe()
        .map_err(|error| AutoUpdateError::io("failed to get current executable", error))?;
    let mut path = exe.as_path();
    loop {
        if path.extension().and_then(|e| e.to_str()) == Some("app") {
            return Ok(path.to_path_buf());
        }
        path = path.parent().ok_or_else(|| {
            AutoUpdateError::Invalid("Current executable is not inside a .app bundle".to_string())
        })?;
    }
}

#[cfg(target_os = "macos")]
fn move_dir(src: &Path, dest: &Path) -> Result<(), AutoUpdateError> {
    if std::fs::rename(src, dest).is_ok() {
        return Ok(());
    }

    crate::archive::copy_dir_recursive(src, dest)?;
    std::fs::remove_dir_all(src).map_err(|error| {
        AutoUpdateError::io_with_path("failed to clean up source directory", src, &error)
    })?;
    Ok(())
}

/// The file an AppImage update must overwrite: the image itself when running
/// from one, otherwise the current executable.
#[cfg(target_os = "linux")]
fn appimage_target() -> Result<std::path::PathBuf, AutoUpdateError> {
    if let Some(path) = std::env::var_os("APPIMAGE").filter(|p| !p.is_empty()) {
        return Ok(std::path::PathBuf::from(path));
    }
    std::env::current_exe()
        .map_err(|error| AutoUpdateError::io("failed to get current executable", error))
}

#[cfg(target_os = "linux")]
fn apply_appimage(new_image: &Path) -> Result<ApplyResult, AutoUpdateError> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(new_image, std::fs::Permissions::from_mode(0o755)).map_err(
        |error| AutoUpdateError::io_with_path("failed to mark update executable", new_image, &error),
    )?;

    let target = appimage_target()?;
    let result = if std::env::var_os("APPIMAGE").is_some() {
        replace_file(new_image, &target)
    } else {
        info!("Replacing binary via self-replace");
        self_replace::self_replace(new_image)
    };

    match result {
        Ok(()) => {
            info!("Linux update applied to {}", target.display());
            Ok(ApplyResult::RestartRequired)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            info!("Permission denied, trying pkexec for elevated replacement");
            apply_appimage_with_pkexec(new_image, &target)
        }
        Err(error) => Err(AutoUpdateError::io("failed to replace AppImage", error)),
    }
}

/// Copy next to `target`, then rename over it so the swap is atomic.
#[cfg(target_os = "linux")]
fn replace_file(new_file: &Path, target: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let parent = target
        .parent()
        .ok_or_else(|| std::io::Error::other("update target has no parent directory"))?;
    let staged = tempfile::NamedTempFile::new_in(parent)?;
    std::fs::copy(new_file, staged.path())?;
    std::fs::set_permissions(staged.path(), std::fs::Permissions::from_mode(0o755))?;
    staged.persist(target).map_err(|error| error.error)?;
    Ok(())
}

#[cfg(target_os = "linux")]
fn apply_appimage_with_pkexec(
    new_image: &Path,
    target: &Path,
) -> Result<ApplyResult, AutoUpdateError> {
    let status = std::process::Command::new("pkexec")
        .args([
            "install",
            "-m",
            "755",
            "--",
            &new_image.to_string_lossy(),
            &target.to_string_lossy(),
        ])
        .status()
        .map_err(|error| AutoUpdateError::io("failed to run pkexec", error))?;

    if !status.success() {
        return Err(AutoUpdateError::Invalid(format!(
            "Elevated update failed. The app is installed in a system location.\n\
             To update manually, run:\n  sudo install -m 755 {} {}",
            new_image.display(),
            target.display()
        )));
    }

    info!("Linux update applied via pkexec");
    Ok(ApplyResult::RestartRequired)
}

#[cfg(not(target_os = "linux"))]
fn apply_appimage(_new_image: &Path) -> Result<ApplyResult, AutoUpdateError> {
    Err(AutoUpdateError::Invalid(
        "AppImage updates are only supported on Linux".to_string(),
    ))
}

#[cfg(target_os = "windows")]
fn apply_installer(installer: &Path) -> Result<ApplyResult, AutoUpdateError> {
    info!("Launching installer: {}", installer.display());
    // /P runs the bundled NSIS installer in passive mode (progress only).
    std::process::Command::new(installer)
        .arg("/P")
        .spawn()
        .map_err(|error| AutoUpdateError::io("failed to launch installer", error))?;

    Ok(ApplyResult::ExitForInstaller)
}

#[cfg(not(target_os = "windows"))]
fn apply_installer(_installer: &Path) -> Result<ApplyResult, AutoUpdateError> {
    Err(AutoUpdateError::Invalid(
        "Installer updates are only supported on Windows".to_string(),
    ))
}

/// Remove leftovers of earlier update cycles: the macOS `.app.old` backup and
/// scratch directories under the update cache.
pub fn cleanup_previous_update() {
    #[cfg(target_os = "macos")]
    {
        if let Ok(bundle) = current_app_bundle() {
            let old = bundle.with_extension("app.old");
            if old.exists() {
                info!("Cleaning up old app bundle: {}", old.display());
                let _ = std::fs::remove_dir_all(&old);
            }
        }
    }

    let Ok(paths) = mzero_platform::AppPaths::new() else {
        return;
    };
    cleanup_update_dir(&paths.update_dir());
}

fn cleanup_update_dir(update_dir: &Path) {
    let Ok(entries) = std::fs::read_dir(update_dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() && entry.file_name().to_string_lossy().starts_with(".tmp") {
            debug!("Cleaning up update temp dir: {}", path.display());
            let _ = std::fs::remove_dir_all(&path);
        }
    }
}

#[cfg(target_os = "macos")]
/// Relaunch the current application bundle.
///
/// # Errors
/// Returns an error if the running app bundle cannot be located or reopened.
pub fn restart_app() -> Result<(), AutoUpdateError> {
    let bundle = current_app_bundle()?;
    std::process::Command::new("open")
        .args(["-n", &bundle.to_string_lossy()])
        .spawn()
        .map_err(|error| AutoUpdateError::io("failed to restart app", error))?;
    Ok(())
}

#[cfg(not(target_os = "macos"))]
/// Relaunch the current executable.
///
/// # Errors
/// Returns an error if the executable path cannot be resolved or a new
/// process cannot be spawned.
pub fn restart_app() -> Result<(), AutoUpdateError> {
    #[cfg(target_os = "linux")]
    let exe = appimage_target().map(|exe| {
        // After self_replace, current_exe() points at the deleted inode.
        let path_str = exe.to_string_lossy();
        if path_str.ends_with(" (deleted)") {
            let fixed = std::path::PathBuf::from(path_str.trim_end_matches(" (deleted)"));
            info!("Adjusted exe path from deleted inode: {}", fixed.display());
            fixed
        } else {
            exe
        }
    })?;

    #[cfg(not(target_os = "linux"))]
    let exe = std::env::current_exe()
        .map_err(|error| AutoUpdateError::io("failed to get current executable", error))?;

    info!("Restarting from: {}", exe.display());
    std::process::Command::new(&exe)
        .spawn()
        .map_err(|error| AutoUpdateError::io("failed to restart app", error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        AssetKind, AutoUpdateError, apply_verified, cleanup_update_dir, download_file_name,
    };
    use crate::signature::SignatureError;
    use crate::signature::fixtures::{PAYLOAD, PUBLIC_KEY, SIGNATURE};

    const INSTALLER_NAME: &str = "MetadataZero-1.2.3-win-x64.exe";

    fn downloaded(contents: &[u8]) -> (tempfile::TempDir, tempfile::TempDir) {
        let update_dir = tempfile::tempdir().expect("update dir should be created");
        let scratch = tempfile::tempdir_in(update_dir.path()).expect("scratch dir should be created");
        std::fs::write(scratch.path().join(INSTALLER_NAME), contents)
            .expect("package should be written");
        (update_dir, scratch)
    }

    #[test]
    fn tampered_package_is_never_installed() {
        let (update_dir, scratch) = downloaded(b"not the signed payload");

        let result = apply_verified(
            scratch,
            INSTALLER_NAME,
            AssetKind::Installer,
            SIGNATURE,
            PUBLIC_KEY,
        );

        assert!(matches!(
            result,
            Err(AutoUpdateError::Signature(SignatureError::Rejected { .. }))
        ));
        let leftovers = std::fs::read_dir(update_dir.path())
            .expect("update dir should be readable")
            .count();
        assert_eq!(leftovers, 0, "rejected package should be removed");
    }

    #[test]
    fn unsigned_package_is_never_installed() {
        let (_update_dir, scratch) = downloaded(PAYLOAD);

        let result = apply_verified(scratch, INSTALLER_NAME, AssetKind::Installer, "", PUBLIC_KEY);

        assert!(matches!(result, Err(AutoUpdateError::Signature(_))));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn verified_package_reaches_the_installer_step() {
        let (_update_dir, scratch) = downloaded(PAYLOAD);

        let result = apply_verified(
            scratch,
            INSTALLER_NAME,
            AssetKind::Installer,
            SIGNATURE,
            PUBLIC_KEY,
        );

        // Past verification, the installer step itself refuses off Windows.
        assert!(matches!(result, Err(AutoUpdateError::Invalid(message)) if message.contains("Windows")));
    }

    #[test]
    fn asset_kind_follows_public_asset_names() {
        assert_eq!(
            AssetKind::from_file_name("MetadataZero-1.2.3-mac-arm64.app.tar.gz"),
            Some(AssetKind::AppArchive)
        );
        assert_eq!(
            AssetKind::from_file_name("MetadataZero-1.2.3-linux-x64.AppImage"),
            Some(AssetKind::AppImage)
        );
        assert_eq!(
            AssetKind::from_file_name("MetadataZero-1.2.3-win-x64.exe"),
            Some(AssetKind::Installer)
        );
        assert_eq!(AssetKind::from_file_name("MetadataZero-1.2.3-linux-x64.deb"), None);
    }

    #[test]
    fn download_file_name_rejects_traversal() {
        assert_eq!(
            download_file_name("https://example.com/releases/download/v1.0.0/App.AppImage"),
            "App.AppImage"
        );
        assert_eq!(download_file_name("https://example.com/.."), "update-download");
        assert_eq!(download_file_name("https://example.com/"), "update-download");
    }

    #[test]
    fn cleanup_update_dir_removes_only_temp_dirs() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let scratch = temp.path().join(".tmpAbc123");
        let keep = temp.path().join("notes");
        std::fs::create_dir_all(&scratch).expect("scratch dir should be created");
        std::fs::create_dir_all(&keep).expect("other dir should be created");

        cleanup_update_dir(temp.path());

        assert!(!scratch.exists());
        assert!(keep.exists());
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn installer_reports_unsupported_off_windows() {
        let result = super::apply_installer(std::path::Path::new("/tmp/setup.exe"));
        assert!(matches!(
            result,
            Err(AutoUpdateError::Invalid(ref message))
                if message == "Installer updates are only supported on Windows"
        ));
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn app_archive_reports_unsupported_off_macos() {
        let result = super::apply_app_archive(std::path::Path::new("/tmp/extracted"));
        assert!(matches!(result, Err(AutoUpdateError::Invalid(_))));
    }
}
