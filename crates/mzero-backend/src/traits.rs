use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::BackendError;
use crate::types::{CleanOptions, CleanResult, MetadataInfo};

#[async_trait]
pub trait MetadataBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Flatten files and directories into the list of supported files.
    async fn expand_paths(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>, BackendError>;

    async fn read_metadata(&self, path: &Path) -> Result<MetadataInfo, BackendError>;

    async fn clean_metadata(
        &self,
        path: &Path,
        options: &CleanOptions,
    ) -> Result<CleanResult, BackendError>;
}
