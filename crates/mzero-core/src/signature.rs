//! Minisign verification of downloaded update packages.
//!
//! Release builds sign every package with the updater key. The manifest
//! carries that signature base64-encoded, the same bytes the bundler writes
//! to the `.sig` file next to the package.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use minisign_verify::{PublicKey, Signature};
use thiserror::Error;

/// Public half of the updater signing key.
pub const UPDATER_PUBLIC_KEY: &str = "RWTWUtgFksAXQ35aRJ2yQgW6t/pwUMY+epmtG3MgGcFEkVG89CfjwMM2";

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("update signature is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("update signature is not valid text")]
    NotText,

    #[error("invalid updater public key: {0}")]
    InvalidKey(String),

    #[error("malformed update signature: {0}")]
    Malformed(String),

    #[error("update package {} failed signature verification: {details}", path.display())]
    Rejected { path: PathBuf, details: String },

    #[error("failed to read update package ({}): {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Check `package` against the manifest `signature` using `public_key`
/// (the base64 key line of a minisign public key).
///
/// # Errors
/// Returns an error when the key or signature cannot be decoded, the package
/// cannot be read, or the signature does not match its contents.
pub fn verify_package(
    package: &Path,
    signature: &str,
    public_key: &str,
) -> Result<(), SignatureError> {
    let public_key = PublicKey::from_base64(public_key.trim())
        .map_err(|error| SignatureError::InvalidKey(error.to_string()))?;

    let decoded = STANDARD.decode(signature.trim())?;
    let text = String::from_utf8(decoded).map_err(|_| SignatureError::NotText)?;
    let signature = Signature::decode(&text)
        .map_err(|error| SignatureError::Malformed(error.to_string()))?;

    let contents = std::fs::read(package).map_err(|source| SignatureError::Read {
        path: package.to_path_buf(),
        source,
    })?;

    public_key
        .verify(&contents, &signature, false)
        .map_err(|error| SignatureError::Rejected {
            path: package.to_path_buf(),
            details: error.to_string(),
        })
}
