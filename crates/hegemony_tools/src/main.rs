//! Hegemony - Development Tools

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hegemony_tools::validate::{validate_data_directory, DataKind};

#[derive(Parser)]
#[command(name = "hegemony-tools")]
#[command(about = "Development tools for the Hegemony engagement engine")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to data directory
        #[arg(default_value = "assets")]
        path: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating data files in: {path}");
            let report = match validate_data_directory(std::path::Path::new(&path)) {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    std::process::exit(1);
                }
            };

            tracing::info!(
                rulesets = report.count(DataKind::Ruleset),
                configs = report.count(DataKind::EngineConfig),
                scenarios = report.count(DataKind::Scenario),
                "Checked {} files",
                report.files.len()
            );

            if report.is_ok() {
                tracing::info!("Validation passed");
            } else {
                for (file, error) in &report.failures {
                    tracing::error!("{}: {error}", file.display());
                }
                tracing::error!("Validation failed: {} file(s) rejected", report.failures.len());
                std::process::exit(1);
            }
        }
    }
}
