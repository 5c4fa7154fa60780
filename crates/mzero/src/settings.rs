use std::path::Path;

use log::warn;
use mzero_backend::CleanOptions;
use mzero_core::DEFAULT_UPDATE_ENDPOINT;
use mzero_platform::AppPaths;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_true")]
    pub auto_update: bool,

    #[serde(default)]
    pub preservation: PreservationOptions,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default)]
    pub update_endpoint: Option<String>,
}

/// Tags kept when cleaning a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreservationOptions {
    #[serde(default)]
    pub orientation: bool,

    #[serde(default)]
    pub color_profile: bool,

    #[serde(default)]
    pub modification_date: bool,
}

impl PreservationOptions {
    /// Options for a clean that writes `<stem>_cleaned.<ext>` next to the original.
    #[must_use]
    pub fn clean_options(self) -> CleanOptions {
        CleanOptions {
            backup: false,
            preserve_orientation: self.orientation,
            preserve_color_profile: self.color_profile,
            preserve_modification_date: self.modification_date,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            auto_update: true,
            preservation: PreservationOptions::default(),
            debug_logging: false,
            max_log_size_bytes: default_max_log_size_bytes(),
            http_timeout_secs: default_http_timeout(),
            update_endpoint: None,
        }
    }
}

impl AppSettings {
    #[must_use]
    pub fn load() -> Self {
        let Ok(paths) = AppPaths::new() else {
            return Self::default();
        };
        Self::load_from(&paths.settings_file())
    }

    /// Missing, unreadable, or malformed files load as defaults.
    #[must_use]
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|error| {
                warn!("Ignoring malformed settings {}: {error}", path.display());
                Self::default()
            }),
            Err(error) => {
                warn!("Failed to read settings {}: {error}", path.display());
                Self::default()
            }
        }
    }

    /// # Errors
    /// Returns an error if the config directory or file cannot be written.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let paths = AppPaths::new().map_err(std::io::Error::other)?;
        paths.ensure_dirs()?;
        self.save_to(&paths.settings_file())
    }

    /// # Errors
    /// Returns an error if the file cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
    }

    #[must_use]
    pub fn update_endpoint(&self) -> &str {
        self.update_endpoint
            .as_deref()
            .filter(|endpoint| !endpoint.trim().is_empty())
            .unwrap_or(DEFAULT_UPDATE_ENDPOINT)
    }
}
