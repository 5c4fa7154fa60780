//! Core update logic for MetadataZero, independent of any UI.
//!
//! - The `latest.json` manifest model shared by the release tooling and the
//!   client.
//! - Update discovery against a combined manifest.
//! - Downloading an update, checking its minisign signature, and installing
//!   it over the running copy.
//! - Archive helpers used by both sides.

pub mod archive;
pub mod auto_update;
pub mod manifest;
pub mod signature;
mod update;

/// Manifest document model.
pub use manifest::{PLATFORM_IDS, PlatformEntry, UpdateManifest, format_pub_date};
/// Update discovery: manifest polling, version comparison, and the update source seam.
pub use update::{
    AppUpdate, DEFAULT_UPDATE_ENDPOINT, ManifestUpdater, UpdateError, UpdateSource,
    fetch_manifest, is_newer_version, select_update,
};
