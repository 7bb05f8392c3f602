//! Batch engagement runner for balance testing.
//!
//! Resolves many seeded engagements in parallel using rayon to collect
//! balance metrics efficiently.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use hegemony_core::battle::BattleEngine;

use crate::metrics::{BatchSummary, EngagementMetrics};
use crate::scenario::Scenario;

/// Configuration for a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario name or path
    pub scenario: String,
    /// Number of engagements to resolve
    pub count: u32,
    /// Maximum parallel engagements (0 = use rayon default)
    pub parallel: u32,
    /// Output directory for results
    pub output_dir: PathBuf,
    /// Starting seed; engagement `i` uses `seed_start + i`
    pub seed_start: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: "border_clash".to_string(),
            count: 100,
            parallel: 0,
            output_dir: PathBuf::from("results"),
            seed_start: 0,
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario
    pub fn new(scenario: &str, count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            count,
            ..Default::default()
        }
    }

    /// Set output directory
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set worker count
    pub fn with_parallel(mut self, parallel: u32) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Scenario display name
    pub scenario_name: String,
    /// Individual engagement metrics, in seed order
    pub engagements: Vec<EngagementMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Error during batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Engagement index
    pub index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Progress tracking for batch runs
#[derive(Debug)]
pub struct BatchProgress {
    /// Total engagements
    pub total: u32,
    completed: AtomicU32,
    wins: [AtomicU32; 2],
    start_time: Instant,
}

impl BatchProgress {
    /// Create new progress tracker
    pub fn new(total: u32) -> Self {
        Self {
            total,
            completed: AtomicU32::new(0),
            wins: [AtomicU32::new(0), AtomicU32::new(0)],
            start_time: Instant::now(),
        }
    }

    /// Record a completed engagement
    pub fn record_completion(&self, metrics: &EngagementMetrics) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if let Some(side) = metrics.winner {
            self.wins[side.index()].fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get current completion count
    pub fn current(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Get completion percentage
    pub fn percentage(&self) -> f64 {
        f64::from(self.current()) / f64::from(self.total.max(1)) * 100.0
    }

    /// Get estimated time remaining
    pub fn eta(&self) -> Duration {
        let completed = self.current();
        if completed == 0 {
            return Duration::from_secs(0);
        }

        let elapsed = self.start_time.elapsed();
        let per_engagement = elapsed.as_secs_f64() / f64::from(completed);
        let remaining = self.total.saturating_sub(completed);
        Duration::from_secs_f64(per_engagement * f64::from(remaining))
    }

    /// Win rates for side A and side B so far
    pub fn current_win_rates(&self) -> [f64; 2] {
        let completed = self.current();
        if completed == 0 {
            return [0.0, 0.0];
        }
        let rate = |side: usize| {
            f64::from(self.wins[side].load(Ordering::Relaxed)) / f64::from(completed)
        };
        [rate(0), rate(1)]
    }

    /// Log progress
    pub fn display(&self) {
        let [rate_a, rate_b] = self.current_win_rates();
        info!(
            completed = self.current(),
            total = self.total,
            percent = format!("{:.1}", self.percentage()),
            eta_secs = self.eta().as_secs(),
            win_rate_a = format!("{:.3}", rate_a),
            win_rate_b = format!("{:.3}", rate_b),
            "Batch progress"
        );
    }
}

/// Resolve one seeded engagement.
fn run_single(
    engine: &BattleEngine,
    scenario: &Scenario,
    seed: u64,
) -> Result<EngagementMetrics, String> {
    engine
        .resolve_seeded(&scenario.setup(), seed)
        .map(|result| EngagementMetrics::from_result(seed, &result))
        .map_err(|e| e.to_string())
}

/// Run a batch of engagements for an already loaded scenario.
///
/// A failing engagement is recorded in [`BatchResults::errors`] and never
/// stops the rest of the batch.
pub fn run_batch(config: BatchConfig, scenario: &Scenario, engine: &BattleEngine) -> BatchResults {
    let start = Instant::now();
    let progress = BatchProgress::new(config.count);

    info!(
        "Starting batch run: {} engagements of '{}'",
        config.count, scenario.name
    );

    let resolve_all = || -> Vec<Result<EngagementMetrics, BatchError>> {
        (0..config.count)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed_start.wrapping_add(u64::from(i));
                match run_single(engine, scenario, seed) {
                    Ok(metrics) => {
                        progress.record_completion(&metrics);

                        let completed = progress.current();
                        if completed % 100 == 0 {
                            debug!("Progress: {}/{}", completed, config.count);
                        }
                        if completed % 1000 == 0 {
                            progress.display();
                        }

                        Ok(metrics)
                    }
                    Err(message) => {
                        warn!("Engagement {} (seed {}) failed: {}", i, seed, message);
                        Err(BatchError {
                            index: i,
                            seed,
                            message,
                        })
                    }
                }
            })
            .collect()
    };

    // Configure a dedicated pool if requested
    let results = if config.parallel > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel as usize)
            .build()
        {
            Ok(pool) => pool.install(resolve_all),
            Err(e) => {
                warn!("Failed to build thread pool ({}), using the global pool", e);
                resolve_all()
            }
        }
    } else {
        resolve_all()
    };

    let (engagements, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let engagements: Vec<EngagementMetrics> =
        engagements.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_engagements(&engagements);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} engagements in {:.2}s ({:.0} engagements/sec)",
        engagements.len(),
        duration_seconds,
        engagements.len() as f64 / duration_seconds.max(f64::EPSILON)
    );

    BatchResults {
        config,
        scenario_name: scenario.name.clone(),
        engagements,
        summary,
        duration_seconds,
        errors,
    }
}

/// Verify determinism by resolving the same seed multiple times.
///
/// Returns `true` when every run produces the same result digest.
pub fn verify_determinism(
    engine: &BattleEngine,
    scenario: &Scenario,
    seed: u64,
    runs: u32,
) -> Result<bool, String> {
    let mut first: Option<u64> = None;

    for run in 0..runs {
        let digest = run_single(engine, scenario, seed)?.digest;
        debug!("Run {}: digest {:016x}", run, digest);

        match first {
            None => first = Some(digest),
            Some(expected) if expected != digest => {
                warn!(
                    "Run {} diverged: expected {:016x}, got {:016x}",
                    run, expected, digest
                );
                return Ok(false);
            }
            Some(_) => {}
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hegemony_core::roster::{Force, Unit, UnitType};

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert_eq!(config.count, 100);
        assert_eq!(config.scenario, "border_clash");
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new("custom_scenario", 500)
            .with_output(PathBuf::from("/tmp/results"))
            .with_seed(12345)
            .with_parallel(2);

        assert_eq!(config.scenario, "custom_scenario");
        assert_eq!(config.count, 500);
        assert_eq!(config.seed_start, 12345);
        assert_eq!(config.parallel, 2);
    }

    #[test]
    fn test_progress_tracking() {
        let progress = BatchProgress::new(100);
        assert_eq!(progress.current(), 0);
        assert!(progress.percentage().abs() < f64::EPSILON);

        let scenario = Scenario::border_clash();
        let engine = scenario.engine().unwrap();
        for seed in 0..3 {
            progress.record_completion(&run_single(&engine, &scenario, seed).unwrap());
        }

        assert_eq!(progress.current(), 3);
        let [a, b] = progress.current_win_rates();
        assert!(a + b <= 1.0 + f64::EPSILON);
    }

    #[test]
    fn test_run_batch_small() {
        let scenario = Scenario::border_clash();
        let engine = scenario.engine().unwrap();
        let results = run_batch(BatchConfig::new("border_clash", 10), &scenario, &engine);

        assert_eq!(results.engagements.len(), 10);
        assert!(results.errors.is_empty());
        assert_eq!(results.summary.total_engagements, 10);
        let seeds: Vec<u64> = results.engagements.iter().map(|m| m.seed).collect();
        assert_eq!(seeds, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_batch_matches_sequential_resolution() {
        let scenario = Scenario::siege_relief();
        let engine = scenario.engine().unwrap();
        let config = BatchConfig::new("siege_relief", 16).with_seed(500).with_parallel(4);
        let results = run_batch(config, &scenario, &engine);

        for metrics in &results.engagements {
            let result = engine.resolve_seeded(&scenario.setup(), metrics.seed).unwrap();
            assert_eq!(metrics.digest, result.digest());
        }
    }

    #[test]
    fn test_failures_are_recorded_not_fatal() {
        let mut scenario = Scenario::border_clash();
        scenario.force_b = Force::new(2).with_unit(Unit::new(1, UnitType::Heavy));
        let engine = BattleEngine::default();
        let results = run_batch(BatchConfig::new("broken", 4), &scenario, &engine);

        assert!(results.engagements.is_empty());
        assert_eq!(results.errors.len(), 4);
        assert!(results.errors[0].message.contains("Duplicate unit ID"));
    }

    #[test]
    fn test_verify_determinism() {
        let scenario = Scenario::siege_relief();
        let engine = scenario.engine().unwrap();
        assert!(verify_determinism(&engine, &scenario, 12345, 5).unwrap());
    }

    #[test]
    fn test_batch_results_save_load() {
        let scenario = Scenario::border_clash();
        let engine = scenario.engine().unwrap();
        let results = run_batch(BatchConfig::new("border_clash", 5), &scenario, &engine);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.json");

        results.save(&path).unwrap();
        assert!(path.exists());

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.engagements, results.engagements);
        assert_eq!(loaded.config.scenario, "border_clash");
    }
}
