//! Archive extraction and directory copy helpers shared by the updater and the
//! release tooling.

use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use log::{debug, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("{context} ({}): {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    Zip {
        context: &'static str,
        #[source]
        source: zip::result::ZipError,
    },
}

impl ArchiveError {
    fn io(context: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.to_path_buf(),
            source,
        }
    }

    fn zip(context: &'static str, source: zip::result::ZipError) -> Self {
        Self::Zip { context, source }
    }
}

/// Extract a zip archive into `dest`, skipping entries that would escape it.
///
/// # Errors
/// Returns an error if the archive cannot be read or an entry cannot be written.
pub fn extract_zip(zip_path: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let file = std::fs::File::open(zip_path)
        .map_err(|error| ArchiveError::io("failed to open zip file", zip_path, error))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|error| ArchiveError::zip("failed to read zip archive", error))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|error| ArchiveError::zip("failed to read zip entry", error))?;
        let Some(name) = entry.enclosed_name() else {
            warn!("Skipping zip entry with unsafe path");
            continue;
        };
        let out_path = dest.join(name);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|error| {
                ArchiveError::io("failed to create extraction directory", &out_path, error)
            })?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                ArchiveError::io("failed to create extraction parent directory", parent, error)
            })?;
        }
        let mut outfile = std::fs::File::create(&out_path).map_err(|error| {
            ArchiveError::io("failed to create extracted file", &out_path, error)
        })?;
        std::io::copy(&mut entry, &mut outfile).map_err(|error| {
            ArchiveError::io("failed to extract archive entry", &out_path, error)
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                let _ = std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode));
            }
        }
    }

    debug!("Extracted {} to {}", zip_path.display(), dest.display());
    Ok(())
}

/// Extract a gzip-compressed tarball into `dest`.
///
/// # Errors
/// Returns an error if the archive is corrupt or cannot be unpacked.
pub fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let file = std::fs::File::open(archive_path)
        .map_err(|error| ArchiveError::io("failed to open tarball", archive_path, error))?;
    std::fs::create_dir_all(dest)
        .map_err(|error| ArchiveError::io("failed to create extraction directory", dest, error))?;

    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(true);
    archive
        .unpack(dest)
        .map_err(|error| ArchiveError::io("failed to unpack tarball", archive_path, error))?;

    debug!("Extracted {} to {}", archive_path.display(), dest.display());
    Ok(())
}

/// Recursively copy `src` into `dest`, creating `dest` if needed.
///
/// # Errors
/// Returns an error if any directory or file cannot be copied.
pub fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<(), ArchiveError> {
    std::fs::create_dir_all(dest)
        .map_err(|error| ArchiveError::io("failed to create directory", dest, error))?;

    for entry in std::fs::read_dir(src)
        .map_err(|error| ArchiveError::io("failed to read directory", src, error))?
    {
        let entry =
            entry.map_err(|error| ArchiveError::io("failed to read directory entry", src, error))?;
        let src_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dest_path)?;
        } else {
            std::fs::copy(&src_path, &dest_path)
                .map_err(|error| ArchiveError::io("failed to copy file", &src_path, error))?;
        }
    }
    Ok(())
}

/// Replace `dest` with a copy of `src`. Any existing `dest` is removed first so
/// stale files never survive.
///
/// # Errors
/// Returns an error if the old directory cannot be removed or the copy fails.
pub fn replace_dir(src: &Path, dest: &Path) -> Result<(), ArchiveError> {
    if dest.exists() {
        std::fs::remove_dir_all(dest)
            .map_err(|error| ArchiveError::io("failed to remove existing directory", dest, error))?;
    }
    copy_dir_recursive(src, dest)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::{extract_tar_gz, extract_zip, replace_dir};

    #[test]
    fn extract_zip_expands_files_and_directories() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let zip_path = temp.path().join("bundle.zip");
        let extract_dir = temp.path().join("extract");

        let zip_file = std::fs::File::create(&zip_path).expect("zip file should be created");
        let mut writer = zip::ZipWriter::new(zip_file);
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);
        writer
            .add_directory("nested/", options)
            .expect("directory entry should be written");
        writer
            .start_file("nested/exiftool", options)
            .expect("file entry should be started");
        writer
            .write_all(b"binary-content")
            .expect("file entry should be written");
        writer.finish().expect("zip archive should be finalized");

        extract_zip(&zip_path, &extract_dir).expect("zip should extract");

        let extracted = std::fs::read(extract_dir.join("nested/exiftool"))
            .expect("extracted file should exist and be readable");
        assert_eq!(extracted, b"binary-content");
    }

    #[test]
    fn extract_zip_skips_unsafe_paths() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let zip_path = temp.path().join("unsafe.zip");
        let extract_dir = temp.path().join("extract");

        let zip_file = std::fs::File::create(&zip_path).expect("zip file should be created");
        let mut writer = zip::ZipWriter::new(zip_file);
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);
        writer
            .start_file("../outside.txt", options)
            .expect("unsafe file entry should be started");
        writer
            .write_all(b"should not be extracted")
            .expect("unsafe file entry should be written");
        writer.finish().expect("zip archive should be finalized");

        extract_zip(&zip_path, &extract_dir).expect("zip extraction should not fail");

        assert!(!temp.path().join("outside.txt").exists());
    }

    #[test]
    fn extract_tar_gz_unpacks_nested_tree() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let archive_path = temp.path().join("bundle.tar.gz");

        let file = std::fs::File::create(&archive_path).expect("tarball should be created");
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let payload = b"#!/usr/bin/perl\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(payload.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, "pkg-1.0/bin/tool", &payload[..])
            .expect("entry should be appended");
        builder
            .into_inner()
            .expect("tar stream should finish")
            .finish()
            .expect("gzip stream should finish");

        let dest = temp.path().join("out");
        extract_tar_gz(&archive_path, &dest).expect("tarball should extract");

        let contents =
            std::fs::read(dest.join("pkg-1.0/bin/tool")).expect("extracted entry should exist");
        assert_eq!(contents, payload);
    }

    #[test]
    fn replace_dir_drops_stale_files() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let src = temp.path().join("src");
        let dest = temp.path().join("dest");
        std::fs::create_dir_all(src.join("inner")).expect("src tree should be created");
        std::fs::write(src.join("inner/new.pm"), "new").expect("src file should be written");
        std::fs::create_dir_all(&dest).expect("dest should be created");
        std::fs::write(dest.join("stale.pm"), "old").expect("stale file should be written");

        replace_dir(&src, &dest).expect("replace should succeed");

        assert!(dest.join("inner/new.pm").is_file());
        assert!(!dest.join("stale.pm").exists());
    }
}
