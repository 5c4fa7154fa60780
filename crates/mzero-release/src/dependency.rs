use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use mzero_core::archive::{extract_tar_gz, extract_zip, replace_dir};
use mzero_platform::{EXIFTOOL_PREFIX, UNIX_TARGET_TRIPLES, WINDOWS_TARGET_TRIPLE, sidecar_file_name};
use walkdir::WalkDir;

use crate::download::Downloader;
use crate::error::ReleaseError;
use crate::integrity::verify_file;

pub const EXIFTOOL_VERSION: &str = "13.36";
const EXIFTOOL_UNIX_SHA256: &str =
    "f70ecbcdccc18268d4d3c290faf8cf73b1cf128e3e7f8671e24d6604cae4dc73";
const EXIFTOOL_WINDOWS_SHA256: &str =
    "6e2ba32f10883aec180f71cf257fd8ac7d4a9d12f7c23e0a965f6f4b7fa7d0e9";

const UNIX_LIB_DIR: &str = "lib";
const WINDOWS_FILES_DIR: &str = "exiftool_files";
const WINDOWS_ARCHIVE_EXE: &str = "exiftool(-k).exe";

/// A download pinned to one digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedArchive {
    pub url: String,
    pub sha256: String,
}

/// The ExifTool release bundled as a side-car, and where it is laid out.
#[derive(Debug, Clone)]
pub struct PinnedDependency {
    pub version: String,
    pub unix: PinnedArchive,
    pub windows: PinnedArchive,
    pub binaries_root: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    AlreadyPresent,
    Installed,
}

impl PinnedDependency {
    /// The ExifTool release this build ships with.
    #[must_use]
    pub fn exiftool(binaries_root: &Path) -> Self {
        let version = EXIFTOOL_VERSION;
        Self {
            version: version.to_string(),
            unix: PinnedArchive {
                url: format!("https://github.com/exiftool/exiftool/archive/refs/tags/{version}.tar.gz"),
                sha256: EXIFTOOL_UNIX_SHA256.to_string(),
            },
            windows: PinnedArchive {
                url: format!(
                    "https://sourceforge.net/projects/exiftool/files/exiftool-{version}_64.zip/download"
                ),
                sha256: EXIFTOOL_WINDOWS_SHA256.to_string(),
            },
            binaries_root: binaries_root.to_path_buf(),
        }
    }

    #[must_use]
    pub fn unix_executables(&self) -> Vec<PathBuf> {
        UNIX_TARGET_TRIPLES
            .iter()
            .map(|triple| self.binaries_root.join(sidecar_file_name(EXIFTOOL_PREFIX, triple)))
            .collect()
    }

    #[must_use]
    pub fn windows_executable(&self) -> PathBuf {
        self.binaries_root
            .join(sidecar_file_name(EXIFTOOL_PREFIX, WINDOWS_TARGET_TRIPLE))
    }

    #[must_use]
    pub fn lib_dir(&self) -> PathBuf {
        self.binaries_root.join(UNIX_LIB_DIR)
    }

    #[must_use]
    pub fn windows_files_dir(&self) -> PathBuf {
        self.binaries_root.join(WINDOWS_FILES_DIR)
    }

    /// Paths that must exist for the layout to be complete.
    #[must_use]
    pub fn required_paths(&self) -> Vec<PathBuf> {
        let mut paths = self.unix_executables();
        paths.push(self.windows_executable());
        paths.push(self.lib_dir());
        paths.push(self.windows_files_dir());
        paths
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.required_paths().iter().all(|path| path.exists())
    }
}

/// Download, verify and lay out the pinned dependency. Does nothing when the
/// layout is already complete.
///
/// # Errors
/// Returns an error if a download fails, a digest does not match, an archive
/// is unreadable or lacks the expected files, or installation fails.
pub async fn fetch_dependency(
    dependency: &PinnedDependency,
    downloader: &dyn Downloader,
) -> Result<FetchOutcome, ReleaseError> {
    let root = &dependency.binaries_root;
    std::fs::create_dir_all(root)
        .map_err(|error| ReleaseError::io("failed to create binaries directory", root, error))?;

    if dependency.is_complete() {
        info!("ExifTool {} binaries already present", dependency.version);
        return Ok(FetchOutcome::AlreadyPresent);
    }

    let scratch = tempfile::Builder::new()
        .prefix(".fetch-")
        .tempdir_in(root)
        .map_err(|error| ReleaseError::io("failed to create scratch directory", root, error))?;

    let unix_archive = scratch.path().join("exiftool-unix.tar.gz");
    let windows_archive = scratch.path().join("exiftool-windows.zip");

    info!("Downloading ExifTool {} for Unix", dependency.version);
    downloader.download(&dependency.unix.url, &unix_archive).await?;
    verify_file(&unix_archive, &dependency.unix.sha256)?;

    info!("Downloading ExifTool {} for Windows", dependency.version);
    downloader
        .download(&dependency.windows.url, &windows_archive)
        .await?;
    verify_file(&windows_archive, &dependency.windows.sha256)?;
    info!("Checksums verified");

    let staged = stage(dependency, scratch.path(), &unix_archive, &windows_archive)?;

    let mut installed = Vec::new();
    if let Err(error) = install(dependency, &staged, &mut installed) {
        roll_back(&installed);
        return Err(error);
    }

    if let Err(error) = scratch.close() {
        warn!("Failed to remove scratch directory: {error}");
    }
    info!("ExifTool {} binaries ready in {}", dependency.version, root.display());
    Ok(FetchOutcome::Installed)
}

/// Extracted files ready to be installed.
struct Staged {
    unix_script: PathBuf,
    unix_lib: PathBuf,
    windows_exe: PathBuf,
    windows_files: PathBuf,
}

fn stage(
    dependency: &PinnedDependency,
    scratch: &Path,
    unix_archive: &Path,
    windows_archive: &Path,
) -> Result<Staged, ReleaseError> {
    let unix_dir = scratch.join("unix");
    let windows_dir = scratch.join("windows");
    extract_tar_gz(unix_archive, &unix_dir)?;
    extract_zip(windows_archive, &windows_dir)?;

    let unix_base = unix_dir.join(format!("exiftool-{}", dependency.version));
    let windows_base = windows_dir.join(format!("exiftool-{}_64", dependency.version));
    let staged = Staged {
        unix_script: unix_base.join(EXIFTOOL_PREFIX),
        unix_lib: unix_base.join(UNIX_LIB_DIR),
        windows_exe: windows_base.join(WINDOWS_ARCHIVE_EXE),
        windows_files: windows_base.join(WINDOWS_FILES_DIR),
    };

    for path in [
        &staged.unix_script,
        &staged.unix_lib,
        &staged.windows_exe,
        &staged.windows_files,
    ] {
        if !path.exists() {
            return Err(ReleaseError::ArchiveLayout { path: path.clone() });
        }
    }
    Ok(staged)
}

fn install(
    dependency: &PinnedDependency,
    staged: &Staged,
    installed: &mut Vec<PathBuf>,
) -> Result<(), ReleaseError> {
    // ExifTool is a Perl script, so every Unix target gets the same file.
    for dest in dependency.unix_executables() {
        std::fs::copy(&staged.unix_script, &dest)
            .map_err(|error| ReleaseError::io("failed to install executable", &dest, error))?;
        installed.push(dest.clone());
        make_executable(&dest)?;
        debug!("Installed {}", dest.display());
    }

    let lib_dir = dependency.lib_dir();
    installed.push(lib_dir.clone());
    replace_dir(&staged.unix_lib, &lib_dir)?;

    let windows_exe = dependency.windows_executable();
    installed.push(windows_exe.clone());
    std::fs::rename(&staged.windows_exe, &windows_exe)
        .map_err(|error| ReleaseError::io("failed to install executable", &windows_exe, error))?;

    let files_dir = dependency.windows_files_dir();
    installed.push(files_dir.clone());
    replace_dir(&staged.windows_files, &files_dir)?;
    make_user_writable(&files_dir)?;

    Ok(())
}

fn roll_back(installed: &[PathBuf]) {
    for path in installed.iter().rev() {
        let result = if path.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        match result {
            Ok(()) => debug!("Rolled back {}", path.display()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => warn!("Failed to roll back {}: {error}", path.display()),
        }
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), ReleaseError> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|error| ReleaseError::io("failed to set executable permissions", path, error))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn make_executable(_path: &Path) -> Result<(), ReleaseError> {
    Ok(())
}

fn make_user_writable(dir: &Path) -> Result<(), ReleaseError> {
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|error| {
            let path = error.path().unwrap_or(dir).to_path_buf();
            ReleaseError::io("failed to walk directory", &path, error.into())
        })?;
        let path = entry.path();
        let metadata = entry
            .metadata()
            .map_err(|error| ReleaseError::io("failed to read metadata", path, error.into()))?;
        let mut permissions = metadata.permissions();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            permissions.set_mode(permissions.mode() | 0o200);
        }
        #[cfg(not(unix))]
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);

        std::fs::set_permissions(path, permissions)
            .map_err(|error| ReleaseError::io("failed to update permissions", path, error))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{EXIFTOOL_VERSION, PinnedDependency};

    #[test]
    fn exiftool_pin_urls_follow_version() {
        let dependency = PinnedDependency::exiftool(Path::new("binaries"));
        assert_eq!(dependency.version, EXIFTOOL_VERSION);
        assert_eq!(
            dependency.unix.url,
            "https://github.com/exiftool/exiftool/archive/refs/tags/13.36.tar.gz"
        );
        assert_eq!(
            dependency.windows.url,
            "https://sourceforge.net/projects/exiftool/files/exiftool-13.36_64.zip/download"
        );
    }

    #[test]
    fn layout_lists_five_executables_and_two_directories() {
        let dependency = PinnedDependency::exiftool(Path::new("binaries"));
        let required = dependency.required_paths();

        assert_eq!(required.len(), 7);
        assert!(required.contains(&Path::new("binaries/exiftool-aarch64-apple-darwin").to_path_buf()));
        assert!(
            required.contains(&Path::new("binaries/exiftool-x86_64-pc-windows-msvc.exe").to_path_buf())
        );
        assert!(required.contains(&Path::new("binaries/lib").to_path_buf()));
        assert!(required.contains(&Path::new("binaries/exiftool_files").to_path_buf()));
    }

    #[test]
    fn incomplete_layout_is_detected() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let dependency = PinnedDependency::exiftool(temp.path());
        std::fs::create_dir_all(dependency.lib_dir()).expect("lib dir should be created");
        assert!(!dependency.is_complete());
    }
}
