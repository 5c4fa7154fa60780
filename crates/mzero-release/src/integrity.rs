use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("checksum mismatch for {file}: expected {expected}, got {actual}")]
    Mismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("failed to read {file} for checksum: {source}")]
    Read {
        file: String,
        #[source]
        source: std::io::Error,
    },
}

/// Hex SHA-256 of a file, read in fixed-size chunks.
///
/// # Errors
/// Returns [`IntegrityError::Read`] if the file cannot be opened or read.
pub fn sha256_file(path: &Path) -> Result<String, IntegrityError> {
    let read_error = |source| IntegrityError::Read {
        file: path.display().to_string(),
        source,
    };
    let mut file = std::fs::File::open(path).map_err(read_error)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];

    loop {
        let read = file.read(&mut buffer).map_err(read_error)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Check a downloaded file against its pinned digest. Comparison ignores case.
///
/// # Errors
/// Returns [`IntegrityError::Mismatch`] when the digests differ.
pub fn verify_file(path: &Path, expected_sha256: &str) -> Result<(), IntegrityError> {
    let actual = sha256_file(path)?;
    if actual.eq_ignore_ascii_case(expected_sha256) {
        return Ok(());
    }

    Err(IntegrityError::Mismatch {
        file: path.display().to_string(),
        expected: expected_sha256.to_ascii_lowercase(),
        actual,
    })
}

#[cfg(test)]
mod tests {
    use super::{IntegrityError, sha256_file, verify_file};

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    fn hello_file() -> (tempfile::TempDir, std::path::PathBuf) {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("hello.txt");
        std::fs::write(&path, b"hello").expect("file should be written");
        (temp, path)
    }

    #[test]
    fn sha256_file_returns_known_digest() {
        let (_temp, path) = hello_file();
        assert_eq!(
            sha256_file(&path).expect("checksum should be computed"),
            HELLO_SHA256
        );
    }

    #[test]
    fn verify_accepts_uppercase_digest() {
        let (_temp, path) = hello_file();
        verify_file(&path, &HELLO_SHA256.to_ascii_uppercase()).expect("digest should match");
    }

    #[test]
    fn verify_reports_both_digests_on_mismatch() {
        let (_temp, path) = hello_file();
        let error = verify_file(&path, "ABCDEF").expect_err("digest should not match");
        match error {
            IntegrityError::Mismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, "abcdef");
                assert_eq!(actual, HELLO_SHA256);
            }
            IntegrityError::Read { .. } => panic!("expected a mismatch"),
        }
    }

    #[test]
    fn verify_missing_file_is_a_read_error() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        assert!(matches!(
            verify_file(&temp.path().join("absent.zip"), HELLO_SHA256),
            Err(IntegrityError::Read { .. })
        ));
    }
}
