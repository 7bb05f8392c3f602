//! Headless engagement runner.
//!
//! Resolves scenario files without any interactive surface. Reports and
//! JSON go to stdout, logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Resolve once and print the narrative
//! cargo run -p hegemony_headless -- run --scenario border_clash --seed 7
//!
//! # Run batch balance test
//! cargo run -p hegemony_headless -- batch --scenario border_clash --count 1000 --output results/
//!
//! # Verify determinism
//! cargo run -p hegemony_headless -- verify --scenario siege_relief --runs 10
//!
//! # Write and check an engagement record
//! cargo run -p hegemony_headless -- record --scenario border_clash --seed 7 --output clash.bin
//! cargo run -p hegemony_headless -- replay --file clash.bin
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hegemony_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    runner::{self, OutputFormat},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "hegemony_headless")]
#[command(about = "Headless engagement runner for balance testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a single engagement
    Run {
        /// Built-in scenario name or scenario file
        #[arg(short, long, default_value = "border_clash")]
        scenario: String,

        /// Seed (defaults to the scenario's seed)
        #[arg(long)]
        seed: Option<u64>,

        /// Print the full result as JSON instead of a narrative
        #[arg(long)]
        json: bool,
    },

    /// Run batch of engagements for balance testing
    Batch {
        /// Built-in scenario name or scenario file
        #[arg(short, long, default_value = "border_clash")]
        scenario: String,

        /// Number of engagements to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Maximum parallel engagements (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Verify determinism by running same seed multiple times
    Verify {
        /// Built-in scenario name or scenario file
        #[arg(short, long, default_value = "border_clash")]
        scenario: String,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Resolve once and write an engagement record
    Record {
        /// Built-in scenario name or scenario file
        #[arg(short, long)]
        scenario: String,

        /// Seed to record
        #[arg(long)]
        seed: u64,

        /// Record file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Replay a record and check it reproduces its digest
    Replay {
        /// Record file path
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries reports
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            seed,
            json,
        } => cmd_run(&scenario, seed, json),
        Commands::Batch {
            scenario,
            count,
            seed,
            parallel,
            output,
        } => cmd_batch(scenario, count, seed, parallel, output),
        Commands::Verify {
            scenario,
            seed,
            runs,
        } => cmd_verify(&scenario, seed, runs),
        Commands::Record {
            scenario,
            seed,
            output,
        } => cmd_record(&scenario, seed, &output),
        Commands::Replay { file } => cmd_replay(&file),
    }
}

/// Load a scenario or exit.
fn load_scenario(name_or_path: &str) -> Scenario {
    match Scenario::find(name_or_path) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("Failed to load scenario '{}': {}", name_or_path, e);
            std::process::exit(1);
        }
    }
}

/// Resolve a single engagement
fn cmd_run(scenario: &str, seed: Option<u64>, json: bool) {
    let scenario = load_scenario(scenario);
    let seed = scenario.seed_or(seed);
    tracing::info!("Resolving '{}' with seed {}", scenario.name, seed);

    let result = match runner::resolve(&scenario, seed) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Engagement failed: {}", e);
            std::process::exit(1);
        }
    };

    let format = if json {
        OutputFormat::Json
    } else {
        OutputFormat::Narrative
    };
    match runner::format_result(&result, format) {
        Ok(text) => println!("{}", text.trim_end()),
        Err(e) => {
            eprintln!("Failed to format result: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run batch of engagements for balance testing
fn cmd_batch(scenario: String, count: u32, seed: u64, parallel: u32, output: PathBuf) {
    let loaded = load_scenario(&scenario);
    let engine = match loaded.engine() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Invalid scenario configuration: {}", e);
            std::process::exit(1);
        }
    };

    let num_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);

    tracing::info!(
        scenario = %scenario,
        count = count,
        parallel = parallel,
        seed = seed,
        output = %output.display(),
        cpus_available = num_cpus,
        "Batch configuration"
    );

    let config = BatchConfig::new(&scenario, count)
        .with_seed(seed)
        .with_parallel(parallel)
        .with_output(output.clone());

    let results = run_batch(config, &loaded, &engine);

    let results_path = output.join("batch.json");
    if let Err(e) = results.save(&results_path) {
        tracing::error!(error = %e, path = %results_path.display(), "Failed to save results");
        eprintln!("FATAL: Failed to save results: {}", e);
        std::process::exit(1);
    }

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE: {}", results.scenario_name);
    eprintln!("{}", "=".repeat(50));
    eprintln!("Engagements resolved: {}", results.engagements.len());
    if !results.errors.is_empty() {
        eprintln!("Engagements FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!("\nOutcomes:");
    eprintln!(
        "  Side A: {} wins ({:.1}%)",
        summary.wins_a,
        summary.win_rate_a * 100.0
    );
    eprintln!(
        "  Side B: {} wins ({:.1}%)",
        summary.wins_b,
        summary.win_rate_b * 100.0
    );
    eprintln!("  Draws:  {}", summary.draws);
    eprintln!(
        "\nLoops: mean {:.2}, min {}, max {}",
        summary.avg_loops, summary.min_loops, summary.max_loops
    );
    eprintln!(
        "Destroyed per engagement: A {:.2}, B {:.2}",
        summary.avg_destroyed[0], summary.avg_destroyed[1]
    );
    eprintln!(
        "Commanders captured: A {}, B {}; promoted: A {}, B {}",
        summary.captured[0], summary.captured[1], summary.promoted[0], summary.promoted[1]
    );

    if !results.errors.is_empty() {
        eprintln!("\nFAILURES:");
        for error in results.errors.iter().take(10) {
            eprintln!(
                "  Engagement {} (seed {}): {}",
                error.index, error.seed, error.message
            );
        }
        if results.errors.len() > 10 {
            eprintln!("  ... and {} more failures", results.errors.len() - 10);
        }
    }

    eprintln!("\nResults saved to: {}", results_path.display());
}

/// Verify determinism
fn cmd_verify(scenario: &str, seed: u64, runs: u32) {
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        scenario,
        seed,
        runs
    );

    let loaded = load_scenario(scenario);
    let engine = match loaded.engine() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Invalid scenario configuration: {}", e);
            std::process::exit(1);
        }
    };

    match verify_determinism(&engine, &loaded, seed, runs) {
        Ok(true) => eprintln!("PASS: All {} runs produced identical results", runs),
        Ok(false) => {
            eprintln!("FAIL: Non-determinism detected!");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Engagement failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Write an engagement record
fn cmd_record(scenario: &str, seed: u64, output: &PathBuf) {
    let loaded = load_scenario(scenario);
    match runner::record(&loaded, seed, output) {
        Ok(record) => {
            eprintln!("Recorded '{}' with seed {}", loaded.name, record.seed);
            eprintln!("  Digest: {:016x}", record.digest);
            eprintln!("  File:   {}", output.display());
        }
        Err(e) => {
            eprintln!("Failed to record engagement: {}", e);
            std::process::exit(1);
        }
    }
}

/// Replay a recorded engagement
fn cmd_replay(file: &PathBuf) {
    tracing::info!("Verifying record: {}", file.display());

    match runner::replay(file) {
        Ok((record, result)) => {
            eprintln!("PASS: Replay verification successful");
            eprintln!("  Seed:   {}", record.seed);
            eprintln!("  Digest: {:016x}", record.digest);
            eprintln!("  Events: {}", result.events.len());
        }
        Err(e) => {
            eprintln!("FAIL: {}", e);
            std::process::exit(1);
        }
    }
}
