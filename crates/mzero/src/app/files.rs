//! File pipeline: add paths, read metadata, clean one or all, clear.
//!
//! Backend calls run one at a time in submission order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info};
use mzero_backend::{CleanResult, MetadataBackend};

use crate::error::AppError;
use crate::settings::PreservationOptions;
use crate::state::FileRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanSummary {
    pub cleaned: usize,
    pub failed: usize,
}

pub struct FileSession {
    backend: Arc<dyn MetadataBackend>,
    preservation: PreservationOptions,
    records: Vec<FileRecord>,
}

impl FileSession {
    pub fn new(backend: Arc<dyn MetadataBackend>, preservation: PreservationOptions) -> Self {
        Self {
            backend,
            preservation,
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn set_preservation(&mut self, preservation: PreservationOptions) {
        self.preservation = preservation;
    }

    /// Expand `paths`, append a record per supported file, then read each
    /// file's metadata in order. Returns how many files were added.
    pub async fn add_paths(&mut self, paths: &[PathBuf]) -> usize {
        let expanded = match self.backend.expand_paths(paths).await {
            Ok(expanded) => expanded,
            Err(error) => {
                error!("Failed to expand paths: {error}");
                return 0;
            }
        };

        let start = self.records.len();
        self.records
            .extend(expanded.into_iter().map(FileRecord::pending));
        let added = self.records.len() - start;
        info!("Added {added} file(s) using {}", self.backend.name());

        for index in start..self.records.len() {
            let path = self.records[index].path.clone();
            let result = self.backend.read_metadata(&path).await;
            let record = &mut self.records[index];
            match result {
                Ok(info) => {
                    debug!("Read {} tags from {}", info.metadata.len(), path.display());
                    record.size = info.file_size;
                    record.metadata = Some(info.metadata);
                }
                Err(error) => {
                    error!("Failed to read metadata for {}: {error}", path.display());
                    record.metadata_error = Some(error.to_string());
                }
            }
            record.metadata_loading = false;
        }

        added
    }

    /// Clean one file of the session into `<stem>_cleaned.<ext>`.
    ///
    /// # Errors
    /// Returns an error if the file is not part of the session or cleaning fails.
    pub async fn clean_file(&mut self, path: &Path) -> Result<CleanResult, AppError> {
        let index = self
            .records
            .iter()
            .position(|record| record.path == path)
            .ok_or_else(|| AppError::from(format!("{} has not been added", path.display())))?;
        self.clean_at(index).await
    }

    /// Clean every file not cleaned yet, one after another.
    pub async fn clean_all(&mut self) -> CleanSummary {
        let mut summary = CleanSummary::default();
        let pending: Vec<usize> = (0..self.records.len())
            .filter(|&index| !self.records[index].cleaned)
            .collect();

        for index in pending {
            match self.clean_at(index).await {
                Ok(_) => summary.cleaned += 1,
                Err(_) => summary.failed += 1,
            }
        }

        info!(
            "Cleaned {} file(s), {} failed",
            summary.cleaned, summary.failed
        );
        summary
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    async fn clean_at(&mut self, index: usize) -> Result<CleanResult, AppError> {
        let path = self.records[index].path.clone();
        self.records[index].processing = true;

        let result = self
            .backend
            .clean_metadata(&path, &self.preservation.clean_options())
            .await
            .map_err(|error| AppError::operation_failed("Clean", error))
            .and_then(|result| {
                if result.success {
                    Ok(result)
                } else {
                    Err(AppError::operation_failed("Clean", result.message))
                }
            });

        let record = &mut self.records[index];
        record.processing = false;
        match &result {
            Ok(cleaned) => {
                record.cleaned = true;
                info!("Cleaned {} -> {}", record.name, cleaned.output_path.display());
            }
            Err(error) => error!("Failed to clean {}: {error}", record.name),
        }
        result
    }
}
