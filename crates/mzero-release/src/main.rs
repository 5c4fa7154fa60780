use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use log::{error, info};

use mzero_release::logging::init_logging;
use mzero_release::{
    FetchOutcome, HttpDownloader, PinnedDependency, Platform, ReleaseConfig, ReleaseError,
    combine_manifests, fetch_dependency, generate_manifest, project_root, rename_artifacts,
    resolve_binaries_dir,
};

#[derive(Debug, Parser)]
#[command(name = "mzero-release", version, about = "MetadataZero release tooling")]
struct Cli {
    /// Print debug output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write latest.json for one platform's signed updater asset.
    GenerateManifest {
        /// darwin, linux or windows
        platform: String,
        /// Compilation target, or `default`.
        target: String,
    },
    /// Merge per-platform latest.json files into artifacts/latest.json.
    CombineManifests,
    /// Rename bundler outputs to public release asset names.
    RenameArtifacts {
        /// darwin, linux or windows
        platform: String,
        /// Compilation target, or `default`.
        target: String,
    },
    /// Download and lay out the pinned ExifTool side-car binaries.
    FetchDependency,
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

    init_logging(cli.verbose);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("{error}");
            if error.is_usage() {
                eprintln!("{}", Cli::command().render_usage());
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), ReleaseError> {
    let root = project_root()?;
    let now = chrono::Utc::now();

    match command {
        Command::GenerateManifest { platform, target } => {
            let platform: Platform = platform.parse()?;
            let config = ReleaseConfig::load(&root)?;
            generate_manifest(&config, platform, &target, now)?;
        }
        Command::CombineManifests => {
            let config = ReleaseConfig::load(&root)?;
            let report = combine_manifests(&config, now)?;
            info!(
                "Merged {} fragment(s) into {}",
                report.merged.len(),
                report.output.display()
            );
        }
        Command::RenameArtifacts { platform, target } => {
            let platform: Platform = platform.parse()?;
            let config = ReleaseConfig::load(&root)?;
            let report = rename_artifacts(&config, platform, &target)?;
            info!(
                "Renamed {} file(s), {} not found",
                report.renamed.len(),
                report.missing.len()
            );
        }
        Command::FetchDependency => {
            let dependency = PinnedDependency::exiftool(&resolve_binaries_dir(&root)?);
            let downloader = HttpDownloader::new()?;
            if fetch_dependency(&dependency, &downloader).await? == FetchOutcome::Installed {
                info!("Installed ExifTool {}", dependency.version);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn positional_platform_and_target() {
        let cli = Cli::try_parse_from(["mzero-release", "rename-artifacts", "darwin", "aarch64-apple-darwin"])
            .expect("arguments should parse");
        assert!(matches!(
            cli.command,
            Command::RenameArtifacts { ref platform, ref target }
                if platform == "darwin" && target == "aarch64-apple-darwin"
        ));
    }

    #[test]
    fn missing_target_is_a_usage_error() {
        let error = Cli::try_parse_from(["mzero-release", "generate-manifest", "linux"])
            .expect_err("target is required");
        assert!(error.use_stderr());
    }

    #[test]
    fn verbose_flag_is_global() {
        let cli = Cli::try_parse_from(["mzero-release", "combine-manifests", "-v"])
            .expect("arguments should parse");
        assert!(cli.verbose);
    }
}
