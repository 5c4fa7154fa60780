use std::collections::BTreeMap;
use std::path::PathBuf;

/// One file the user handed to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub metadata: Option<BTreeMap<String, String>>,
    pub cleaned: bool,
    pub processing: bool,
    pub metadata_error: Option<String>,
    pub metadata_loading: bool,
}

impl FileRecord {
    /// A freshly added file whose metadata has not been read yet.
    #[must_use]
    pub fn pending(path: PathBuf) -> Self {
        let name = path.file_name().map_or_else(
            || path.to_string_lossy().to_string(),
            |name| name.to_string_lossy().to_string(),
        );
        Self {
            path,
            name,
            size: 0,
            metadata: None,
            cleaned: false,
            processing: false,
            metadata_error: None,
            metadata_loading: true,
        }
    }
}
