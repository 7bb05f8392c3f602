//! Data validation utilities.
//!
//! Every `*.ron` file under a directory is classified as a ruleset, an engine
//! config or a scenario, parsed, and checked. Scenarios are dry-run through
//! the engine's input checks against the ruleset and config found alongside
//! them. All failures are collected; one bad file does not hide the rest.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use hegemony_core::battle::BattleEngine;
use hegemony_core::config::EngineConfig;
use hegemony_core::data::Ruleset;
use hegemony_core::error::EngineError;
use hegemony_core::roster::UnitType;
use hegemony_headless::scenario::{Scenario, ScenarioError};

/// Why a data file failed validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Directory does not exist.
    #[error("Data directory not found: {0}")]
    DirectoryNotFound(PathBuf),
    /// Failed to read a file or directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// RON syntax or shape error.
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// The engine rejected the data.
    #[error("{0}")]
    Engine(#[from] EngineError),
    /// A scenario failed to load or validate.
    #[error("{0}")]
    Scenario(#[from] ScenarioError),
    /// Ruleset refers to something it does not define.
    #[error("Ruleset reference error: {0}")]
    Reference(String),
}

/// What a data file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    /// Unit types, upgrades, traits and rules.
    Ruleset,
    /// Engine tunables.
    EngineConfig,
    /// Two forces and a context.
    Scenario,
}

/// Outcome of validating a directory.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Every file checked and its kind.
    pub files: Vec<(PathBuf, DataKind)>,
    /// Every failure, by file.
    pub failures: Vec<(PathBuf, ValidationError)>,
}

impl ValidationReport {
    /// Whether every file passed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of files of a kind.
    #[must_use]
    pub fn count(&self, kind: DataKind) -> usize {
        self.files.iter().filter(|(_, k)| *k == kind).count()
    }
}

/// Decide what a file holds.
///
/// A leading struct name (`Ruleset(`, `EngineConfig(`, `Scenario(`) wins;
/// otherwise the file stem decides, and anything unrecognised is a scenario.
#[must_use]
pub fn classify(path: &Path, contents: &str) -> DataKind {
    match leading_struct_name(contents) {
        Some("Ruleset") => return DataKind::Ruleset,
        Some("EngineConfig") => return DataKind::EngineConfig,
        Some("Scenario") => return DataKind::Scenario,
        _ => {}
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if stem.contains("ruleset") || stem.contains("rules") {
        DataKind::Ruleset
    } else if stem.contains("engine") || stem.contains("config") {
        DataKind::EngineConfig
    } else {
        DataKind::Scenario
    }
}

fn leading_struct_name(contents: &str) -> Option<&str> {
    let body = contents
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("//") && !line.starts_with("#!"))?;
    let name_end = body.find('(')?;
    let name = body[..name_end].trim();
    (!name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
        .then_some(name)
}

/// Cross-references inside a ruleset that the engine does not check itself.
///
/// Returns one message per broken reference.
#[must_use]
pub fn check_ruleset_references(ruleset: &Ruleset) -> Vec<String> {
    let mut problems = Vec::new();

    for unit_type in UnitType::ALL {
        if ruleset.unit_type(unit_type).is_err() {
            problems.push(format!("unit type {unit_type} has no definition"));
        }
    }

    for upgrade in &ruleset.upgrades {
        if let Some(unit_type) = upgrade.unit_type {
            if ruleset.unit_type(unit_type).is_err() {
                problems.push(format!(
                    "upgrade '{}' is built for undefined unit type {unit_type}",
                    upgrade.key
                ));
            }
        }
    }

    problems
}

fn load_ruleset(contents: &str) -> Result<Ruleset, ValidationError> {
    let ruleset: Ruleset = ron::from_str(contents)?;
    ruleset.validate()?;
    let problems = check_ruleset_references(&ruleset);
    if !problems.is_empty() {
        return Err(ValidationError::Reference(problems.join("; ")));
    }
    Ok(ruleset)
}

fn load_config(contents: &str) -> Result<EngineConfig, ValidationError> {
    let config: EngineConfig = ron::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

fn check_scenario(
    scenario: &Scenario,
    ruleset: &Ruleset,
    config: &EngineConfig,
) -> Result<(), ValidationError> {
    let config = scenario.config.clone().unwrap_or_else(|| config.clone());
    let engine = BattleEngine::new(config, ruleset.clone())?;
    engine.validate(&scenario.setup())?;
    Ok(())
}

/// Collect `*.ron` files under `dir`, sorted.
fn collect_ron_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ValidationError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_ron_files(&path, out)?;
        } else if path.extension().map(|e| e == "ron").unwrap_or(false) {
            out.push(path);
        }
    }
    Ok(())
}

/// Validate all RON data files in a directory.
///
/// Scenarios are checked against the ruleset and engine config found in the
/// same tree, falling back to the standard ruleset and default config.
///
/// # Errors
///
/// Returns an error only if the directory itself cannot be read; per-file
/// failures are collected in the report.
pub fn validate_data_directory(dir: &Path) -> Result<ValidationReport, ValidationError> {
    if !dir.is_dir() {
        return Err(ValidationError::DirectoryNotFound(dir.to_path_buf()));
    }

    let mut paths = Vec::new();
    collect_ron_files(dir, &mut paths)?;
    paths.sort();

    let mut report = ValidationReport::default();
    let mut ruleset: Option<Ruleset> = None;
    let mut config: Option<EngineConfig> = None;
    let mut scenarios = Vec::new();

    for path in paths {
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                report.failures.push((path, e.into()));
                continue;
            }
        };
        let kind = classify(&path, &contents);
        tracing::debug!(path = %path.display(), ?kind, "Checking data file");
        report.files.push((path.clone(), kind));

        match kind {
            DataKind::Ruleset => match load_ruleset(&contents) {
                Ok(loaded) => {
                    if ruleset.is_some() {
                        tracing::warn!(
                            path = %path.display(),
                            "Multiple rulesets found; scenarios use the first"
                        );
                    } else {
                        ruleset = Some(loaded);
                    }
                }
                Err(e) => report.failures.push((path, e)),
            },
            DataKind::EngineConfig => match load_config(&contents) {
                Ok(loaded) => {
                    if config.is_none() {
                        config = Some(loaded);
                    }
                }
                Err(e) => report.failures.push((path, e)),
            },
            DataKind::Scenario => match Scenario::from_ron_str(&contents) {
                Ok(scenario) => scenarios.push((path, scenario)),
                Err(e) => report.failures.push((path, e.into())),
            },
        }
    }

    let ruleset = ruleset.unwrap_or_else(Ruleset::standard);
    let config = config.unwrap_or_default();
    for (path, scenario) in scenarios {
        if let Err(e) = check_scenario(&scenario, &ruleset, &config) {
            report.failures.push((path, e));
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hegemony_core::roster::{Force, Unit};

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    fn scenario_ron(scenario: &Scenario) -> String {
        ron::ser::to_string_pretty(scenario, ron::ser::PrettyConfig::default()).unwrap()
    }

    #[test]
    fn test_classify_by_struct_name_and_stem() {
        let p = Path::new("anything.ron");
        assert_eq!(classify(p, "// header\nRuleset(\n"), DataKind::Ruleset);
        assert_eq!(classify(p, "EngineConfig(die_sides: 6)"), DataKind::EngineConfig);
        assert_eq!(classify(Path::new("ruleset.ron"), "(unit_types: [])"), DataKind::Ruleset);
        assert_eq!(classify(Path::new("engine.ron"), "(die_sides: 8)"), DataKind::EngineConfig);
        assert_eq!(classify(Path::new("ambush.ron"), "(name: \"x\")"), DataKind::Scenario);
    }

    #[test]
    fn test_standard_ruleset_has_no_broken_references() {
        assert!(check_ruleset_references(&Ruleset::standard()).is_empty());
    }

    #[test]
    fn test_missing_unit_type_reported() {
        let mut rules = Ruleset::standard();
        rules.unit_types.retain(|d| d.unit_type != UnitType::Cavalry);
        let problems = check_ruleset_references(&rules);
        // The type itself plus the three cavalry upgrades.
        assert_eq!(problems.len(), 4, "{problems:?}");
    }

    #[test]
    fn test_valid_directory_passes() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "data/ruleset.ron",
            &Ruleset::standard().to_ron_string().unwrap(),
        );
        write(dir.path(), "data/engine.ron", "(max_pitch_rally_loops: 6)");
        write(
            dir.path(),
            "scenarios/border_clash.ron",
            &scenario_ron(&Scenario::border_clash()),
        );
        write(
            dir.path(),
            "scenarios/siege_relief.ron",
            &scenario_ron(&Scenario::siege_relief()),
        );

        let report = validate_data_directory(dir.path()).unwrap();
        assert!(report.is_ok(), "{:?}", report.failures);
        assert_eq!(report.count(DataKind::Ruleset), 1);
        assert_eq!(report.count(DataKind::EngineConfig), 1);
        assert_eq!(report.count(DataKind::Scenario), 2);
    }

    #[test]
    fn test_all_failures_reported() {
        let dir = tempfile::tempdir().unwrap();

        let mut unknown_upgrade = Scenario::border_clash();
        unknown_upgrade.force_a =
            Force::new(1).with_unit(Unit::new(1, UnitType::Heavy).with_upgrade("Jetpacks"));
        write(dir.path(), "unknown.ron", &scenario_ron(&unknown_upgrade));

        let mut duplicate_ids = Scenario::siege_relief();
        duplicate_ids.force_b = Force::new(2).with_unit(Unit::new(1, UnitType::Light));
        write(dir.path(), "duplicate.ron", &scenario_ron(&duplicate_ids));

        write(dir.path(), "engine.ron", "EngineConfig(die_sides: 1)");
        write(dir.path(), "broken.ron", "Scenario(name: ");

        let report = validate_data_directory(dir.path()).unwrap();
        assert_eq!(report.failures.len(), 4, "{:?}", report.failures);
        assert!(report
            .failures
            .iter()
            .any(|(p, e)| p.ends_with("unknown.ron") && e.to_string().contains("Jetpacks")));
        assert!(report
            .failures
            .iter()
            .any(|(p, _)| p.ends_with("broken.ron")));
    }

    #[test]
    fn test_scenarios_use_directory_ruleset() {
        let dir = tempfile::tempdir().unwrap();
        let mut rules = Ruleset::standard();
        rules.upgrades.retain(|u| u.key.as_str() != "Dragoons");
        write(dir.path(), "ruleset.ron", &rules.to_ron_string().unwrap());
        write(dir.path(), "clash.ron", &scenario_ron(&Scenario::border_clash()));

        let report = validate_data_directory(dir.path()).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].1.to_string().contains("Dragoons"));
    }

    #[test]
    fn test_missing_directory() {
        assert!(matches!(
            validate_data_directory(Path::new("no/such/dir")),
            Err(ValidationError::DirectoryNotFound(_))
        ));
    }
}
