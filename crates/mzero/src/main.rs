use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};

use mzero_backend::ExifToolBackend;
use mzero_core::ManifestUpdater;
use mzero_core::auto_update::{ApplyResult, cleanup_previous_update, restart_app};

use mzero::app::{FileSession, Updater};
use mzero::error::AppError;
use mzero::logging;
use mzero::settings::AppSettings;

#[derive(Debug, Parser)]
#[command(name = "mzero", version, about = "Remove metadata from photos, videos and documents")]
struct Cli {
    /// Files or directories to inspect.
    paths: Vec<PathBuf>,

    /// Write a cleaned copy of every file.
    #[arg(long)]
    clean: bool,

    /// Relaunch as soon as an update is installed.
    #[arg(long)]
    restart: bool,

    /// Log debug output regardless of settings.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return if error.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let settings = AppSettings::load();
    logging::init_logging(&settings, cli.verbose);
    if let Err(error) = settings.save() {
        warn!("Failed to save settings: {error}");
    }
    cleanup_previous_update();

    match run(cli, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("{error}");
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, settings: AppSettings) -> Result<(), AppError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.http_timeout_secs))
        .user_agent(format!("MetadataZero/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|error| AppError::operation_failed("HTTP client setup", error.to_string()))?;
    let source = ManifestUpdater::new(
        client,
        settings.update_endpoint(),
        env!("CARGO_PKG_VERSION"),
    );
    let mut updater = Updater::new(Arc::new(source));
    let files = updater
        .run_alongside(settings.auto_update, async {
            if cli.paths.is_empty() {
                Ok(())
            } else {
                process_files(&cli, &settings).await
            }
        })
        .await;

    match updater.outcome() {
        Some(ApplyResult::ExitForInstaller) => {
            info!("Exiting so the installer can replace MetadataZero");
        }
        Some(ApplyResult::RestartRequired) if cli.restart => updater.restart(restart_app)?,
        Some(ApplyResult::RestartRequired) => {
            println!("Update ready. Restart MetadataZero to finish installing it.");
        }
        None => {}
    }
    files
}

async fn process_files(cli: &Cli, settings: &AppSettings) -> Result<(), AppError> {
    let binaries_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(std::path::Path::to_path_buf))
        .unwrap_or_default();
    let backend = ExifToolBackend::locate(&binaries_dir)
        .map_err(|error| AppError::operation_failed("Locating ExifTool", error))?;

    let mut session = FileSession::new(Arc::new(backend), settings.preservation);
    session.add_paths(&cli.paths).await;

    for record in session.records() {
        match (&record.metadata, &record.metadata_error) {
            (Some(metadata), _) => {
                println!("{} ({} bytes, {} tags)", record.name, record.size, metadata.len());
                for (tag, value) in metadata {
                    println!("  {tag}: {value}");
                }
            }
            (None, Some(error)) => println!("{}: {error}", record.name),
            (None, None) => println!("{}", record.name),
        }
    }

    if cli.clean {
        let summary = session.clean_all().await;
        println!("Cleaned {} file(s), {} failed", summary.cleaned, summary.failed);
        if summary.failed > 0 {
            return Err(AppError::from(format!(
                "{} file(s) could not be cleaned",
                summary.failed
            )));
        }
    }
    Ok(())
}
