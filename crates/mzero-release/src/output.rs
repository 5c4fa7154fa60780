use std::io::Write;
use std::path::Path;

use crate::error::ReleaseError;

/// Replace `path` in one step: write a temp file in the same directory, then
/// rename it over the destination. Readers never see a partial file.
///
/// # Errors
/// Returns an error if the directory cannot be created or the file cannot be
/// written or persisted.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ReleaseError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)
        .map_err(|error| ReleaseError::io("failed to create output directory", parent, error))?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .map_err(|error| ReleaseError::io("failed to create temp file", parent, error))?;
    temp.write_all(contents)
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|error| ReleaseError::io("failed to write temp file", temp.path(), error))?;
    temp.persist(path)
        .map_err(|error| ReleaseError::io("failed to replace file", path, error.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::write_atomic;

    #[test]
    fn replaces_existing_file_without_leftovers() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("latest.json");
        std::fs::write(&path, "old").expect("old file should be written");

        write_atomic(&path, b"new").expect("write should succeed");

        assert_eq!(
            std::fs::read_to_string(&path).expect("file should be readable"),
            "new"
        );
        let entries = std::fs::read_dir(temp.path())
            .expect("dir should be readable")
            .count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn creates_missing_parent() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("bundle/appimage/latest.json");

        write_atomic(&path, b"{}").expect("write should succeed");
        assert!(path.is_file());
    }
}
