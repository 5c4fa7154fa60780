use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use log::{LevelFilter, info};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};

use mzero_platform::AppPaths;

use crate::settings::AppSettings;

/// Per-sink verbosity. The log file keeps a record of every update cycle and
/// cleaned file; the terminal only shows problems unless asked for more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLevels {
    pub file: LevelFilter,
    pub terminal: LevelFilter,
}

impl LogLevels {
    #[must_use]
    pub fn new(debug_logging: bool, verbose: bool) -> Self {
        Self {
            file: if debug_logging || verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            },
            terminal: if verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Warn
            },
        }
    }
}

fn rotated_path(log_path: &Path) -> PathBuf {
    let mut name = log_path.file_name().unwrap_or_default().to_os_string();
    name.push(".old");
    log_path.with_file_name(name)
}

/// Move an oversized log to `<name>.old`, replacing the previous one, so a
/// run starts on a fresh file.
fn rotate_if_oversized(log_path: &Path, max_log_size: u64) -> bool {
    let oversized = std::fs::metadata(log_path).is_ok_and(|meta| meta.len() > max_log_size);
    oversized && std::fs::rename(log_path, rotated_path(log_path)).is_ok()
}

fn file_logger(
    log_path: &Path,
    level: LevelFilter,
    config: simplelog::Config,
) -> Option<Box<WriteLogger<std::fs::File>>> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent).ok()?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .ok()?;
    Some(WriteLogger::new(level, config, file))
}

/// Log to the per-user log file and to stderr. The file is rotated first
/// when it has grown past `settings.max_log_size_bytes`.
pub fn init_logging(settings: &AppSettings, verbose: bool) {
    let levels = LogLevels::new(settings.debug_logging, verbose);
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("mzero")
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        levels.terminal,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];

    let log_path = AppPaths::new().ok().map(|paths| paths.log_file());
    let mut rotated = false;
    if let Some(log_path) = &log_path {
        rotated = rotate_if_oversized(log_path, settings.max_log_size_bytes);
        if let Some(logger) = file_logger(log_path, levels.file, config) {
            loggers.push(logger);
        }
    }

    let _ = CombinedLogger::init(loggers);

    info!(
        "MetadataZero {} starting (auto update {}, file log {:?})",
        env!("CARGO_PKG_VERSION"),
        if settings.auto_update { "on" } else { "off" },
        levels.file
    );
    if rotated && let Some(log_path) = &log_path {
        info!("Rotated oversized log to {}", rotated_path(log_path).display());
    }
}
