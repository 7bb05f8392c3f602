//! Single-engagement runs, records and replays.

use std::path::Path;

use tracing::info;

use hegemony_core::battle::EngagementResult;
use hegemony_core::replay::EngagementRecord;

use crate::narrative;
use crate::scenario::{Scenario, ScenarioError};

/// How a single run is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable report.
    #[default]
    Narrative,
    /// The full result as pretty JSON.
    Json,
}

/// Resolve a scenario once with `seed`.
pub fn resolve(scenario: &Scenario, seed: u64) -> Result<EngagementResult, ScenarioError> {
    let engine = scenario.engine()?;
    let result = engine.resolve_seeded(&scenario.setup(), seed)?;
    info!(
        scenario = %scenario.name,
        seed,
        winner = ?result.winning_side,
        reason = ?result.reason,
        "Engagement resolved"
    );
    Ok(result)
}

/// Format a result for stdout.
pub fn format_result(
    result: &EngagementResult,
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Narrative => Ok(narrative::render(result)),
        OutputFormat::Json => serde_json::to_string_pretty(result),
    }
}

/// Resolve a scenario and write an engagement record to `path`.
pub fn record(
    scenario: &Scenario,
    seed: u64,
    path: &Path,
) -> Result<EngagementRecord, ScenarioError> {
    let engine = scenario.engine()?;
    let (record, _) = EngagementRecord::capture(&engine, &scenario.setup(), seed)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    record.save(path)?;
    info!(
        path = %path.display(),
        seed,
        digest = format!("{:016x}", record.digest),
        "Record written"
    );
    Ok(record)
}

/// Load a record and resolve it again, failing on any divergence.
pub fn replay(path: &Path) -> Result<(EngagementRecord, EngagementResult), ScenarioError> {
    if !path.exists() {
        return Err(ScenarioError::FileNotFound(path.display().to_string()));
    }
    let record = EngagementRecord::load(path)?;
    let result = record.verify()?;
    Ok((record, result))
}
