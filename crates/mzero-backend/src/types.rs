use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataInfo {
    pub file_path: PathBuf,
    pub file_name: String,
    pub file_size: u64,
    pub metadata: BTreeMap<String, String>,
}

/// How a clean treats the original file and which tags survive it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct CleanOptions {
    /// Rewrite the file in place instead of writing `<stem>_cleaned.<ext>`.
    pub backup: bool,
    pub preserve_orientation: bool,
    pub preserve_color_profile: bool,
    pub preserve_modification_date: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanResult {
    pub success: bool,
    pub file_path: PathBuf,
    pub output_path: PathBuf,
    pub message: String,
}
