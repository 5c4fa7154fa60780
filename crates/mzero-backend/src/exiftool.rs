use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, error, info, trace};

use mzero_platform::{EXIFTOOL_PREFIX, hidden_command, sidecar_file_name};

use crate::error::BackendError;
use crate::expand;
use crate::traits::MetadataBackend;
use crate::types::{CleanOptions, CleanResult, MetadataInfo};

/// Runs the ExifTool side-car bundled with the app.
#[derive(Debug, Clone)]
pub struct ExifToolBackend {
    exiftool_path: PathBuf,
}

impl ExifToolBackend {
    #[must_use]
    pub fn new(exiftool_path: PathBuf) -> Self {
        Self { exiftool_path }
    }

    /// Find the side-car for the running target under `binaries_dir`, falling
    /// back to an `exiftool` on `PATH`.
    ///
    /// # Errors
    /// Returns [`BackendError::NotFound`] when neither exists.
    pub fn locate(binaries_dir: &Path) -> Result<Self, BackendError> {
        if let Some(triple) = mzero_platform::current_target_triple() {
            let bundled = binaries_dir.join(sidecar_file_name(EXIFTOOL_PREFIX, triple));
            if bundled.is_file() {
                info!("Using bundled ExifTool at {}", bundled.display());
                return Ok(Self::new(bundled));
            }
            debug!("Bundled ExifTool not found at {}", bundled.display());
        }

        which::which(EXIFTOOL_PREFIX)
            .map(|path| {
                info!("Using ExifTool from PATH at {}", path.display());
                Self::new(path)
            })
            .map_err(|_| BackendError::NotFound)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.exiftool_path
    }

    async fn execute(&self, args: &[String]) -> Result<String, BackendError> {
        debug!(
            "Executing exiftool command: {} {}",
            self.exiftool_path.display(),
            args.join(" ")
        );

        let output = hidden_command(&self.exiftool_path)
            .args(args)
            .output()
            .await?;

        debug!("exiftool exit status: {:?}", output.status);
        if !output.stderr.is_empty() {
            trace!("exiftool stderr: {}", String::from_utf8_lossy(&output.stderr));
        }

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!("exiftool command failed: args={args:?}, stderr='{stderr}'");
            Err(BackendError::CommandFailed { stderr })
        }
    }
}

#[async_trait]
impl MetadataBackend for ExifToolBackend {
    fn name(&self) -> &'static str {
        "exiftool"
    }

    async fn expand_paths(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>, BackendError> {
        let paths = paths.to_vec();
        tokio::task::spawn_blocking(move || expand::expand_paths(&paths))
            .await
            .map_err(|error| BackendError::IoError {
                kind: std::io::ErrorKind::Other,
                message: format!("path expansion task failed: {error}"),
            })
    }

    async fn read_metadata(&self, path: &Path) -> Result<MetadataInfo, BackendError> {
        let file_meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(BackendError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(error) => return Err(error.into()),
        };

        let args = vec![
            "-json".to_string(),
            "-a".to_string(),
            "-s".to_string(),
            path.to_string_lossy().to_string(),
        ];
        let stdout = self.execute(&args).await?;

        Ok(MetadataInfo {
            file_path: path.to_path_buf(),
            file_name: path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
            file_size: file_meta.len(),
            metadata: parse_metadata_json(&stdout)?,
        })
    }

    async fn clean_metadata(
        &self,
        path: &Path,
        options: &CleanOptions,
    ) -> Result<CleanResult, BackendError> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(BackendError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let output_path = if options.backup {
            path.to_path_buf()
        } else {
            cleaned_output_path(path)?
        };
        let args = clean_args(path, &output_path, options);

        let (success, message) = match self.execute(&args).await {
            Ok(_) => (true, "Metadata cleaned successfully".to_string()),
            Err(BackendError::CommandFailed { stderr }) => (false, stderr),
            Err(error) => return Err(error),
        };

        Ok(CleanResult {
            success,
            file_path: path.to_path_buf(),
            output_path,
            message,
        })
    }
}

/// `photo.jpg` → `photo_cleaned.jpg` in the same directory.
fn cleaned_output_path(path: &Path) -> Result<PathBuf, BackendError> {
    let invalid = || BackendError::InvalidPath {
        path: path.to_path_buf(),
    };
    let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(invalid)?;
    let parent = path.parent().ok_or_else(invalid)?;
    let output_name = match path.extension().and_then(|s| s.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{stem}_cleaned.{ext}"),
        _ => format!("{stem}_cleaned"),
    };
    Ok(parent.join(output_name))
}

fn clean_args(path: &Path, output_path: &Path, options: &CleanOptions) -> Vec<String> {
    let mut args = vec!["-all=".to_string()];

    let is_tiff = path.extension().is_some_and(|ext| {
        let ext = ext.to_string_lossy().to_lowercase();
        ext == "tif" || ext == "tiff"
    });
    if is_tiff {
        args.push("-CommonIFD0=".to_string());
    }

    if options.preserve_orientation || options.preserve_color_profile {
        args.push("-tagsfromfile".to_string());
        args.push("@".to_string());
        if options.preserve_orientation {
            args.push("-Orientation".to_string());
        }
        if options.preserve_color_profile {
            args.push("-ColorSpaceTags".to_string());
            args.push("-ICCProfile".to_string());
        }
    }

    if options.preserve_modification_date {
        args.push("-P".to_string());
    }

    if !options.backup {
        args.push("-o".to_string());
        args.push(output_path.to_string_lossy().to_string());
    }

    args.push(path.to_string_lossy().to_string());
    args
}

/// Flatten the first object of ExifTool's `-json` array into strings.
fn parse_metadata_json(stdout: &str) -> Result<BTreeMap<String, String>, BackendError> {
    let records: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(stdout)?;

    let mut metadata = BTreeMap::new();
    if let Some(first) = records.first() {
        for (key, value) in first {
            let formatted = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                serde_json::Value::Array(items) => items
                    .iter()
                    .filter_map(serde_json::Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                _ => continue,
            };
            metadata.insert(key.clone(), formatted);
        }
    }
    Ok(metadata)
}
