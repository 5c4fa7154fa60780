//! Platform plumbing shared by the MetadataZero client and release tooling.

mod commands;
mod paths;
mod target;

pub use commands::{HideWindow, hidden_command};
pub use paths::{AppPaths, AppPathsError};
pub use target::{
    EXIFTOOL_PREFIX, UNIX_TARGET_TRIPLES, WINDOWS_TARGET_TRIPLE, current_platform_id,
    current_target_triple, sidecar_file_name,
};
