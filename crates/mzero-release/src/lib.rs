//! Build-side release tooling for MetadataZero.
//!
//! Each stage runs as one short-lived batch invocation:
//! - fetch the pinned ExifTool side-car and lay it out per target,
//! - rename bundler outputs to public asset names,
//! - write a single-platform `latest.json` fragment per build job,
//! - combine the fragments into the manifest clients poll.

pub mod combine;
pub mod config;
pub mod dependency;
pub mod download;
mod error;
pub mod generate;
pub mod integrity;
pub mod logging;
mod output;
pub mod platform;
pub mod probe;
pub mod rename;

pub use combine::{CombineReport, CombinedManifest, Fragment, combine_manifests};
pub use config::{ReleaseConfig, project_root, resolve_binaries_dir};
pub use dependency::{FetchOutcome, PinnedArchive, PinnedDependency, fetch_dependency};
pub use download::{Downloader, HttpDownloader};
pub use error::ReleaseError;
pub use generate::{PlatformArtifactSet, generate_manifest};
pub use integrity::IntegrityError;
pub use output::write_atomic;
pub use platform::{Arch, Platform};
pub use probe::Probe;
pub use rename::{RenameReport, RenameRule, rename_artifacts};
