//! Scenario loading and configuration.
//!
//! A scenario is one engagement on disk: two forces, the shared context, and
//! optionally an engine config override and a default seed.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use hegemony_core::battle::{BattleEngine, EngagementSetup};
use hegemony_core::config::EngineConfig;
use hegemony_core::data::Ruleset;
use hegemony_core::error::EngineError;
use hegemony_core::replay::RecordError;
use hegemony_core::roster::{
    Commander, EngagementContext, Force, ForceContext, Unit, UnitType,
};

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The engine rejected the scenario.
    #[error("Engine rejected scenario: {0}")]
    Engine(#[from] EngineError),
    /// Writing or verifying a record failed.
    #[error("Record failed: {0}")]
    Record(#[from] RecordError),
}

/// A complete engagement scenario.
///
/// # Example RON
///
/// ```ron
/// Scenario(
///     name: "River Crossing",
///     seed: Some(7),
///     force_a: (id: 1, units: [(id: 1, unit_type: Cavalry, upgrades: ["Lancers"])]),
///     force_b: (id: 2, units: [(id: 2, unit_type: Heavy)], context: (garrisoned: true)),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Seed used when the caller gives none.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Engine settings; defaults apply when absent.
    #[serde(default)]
    pub config: Option<EngineConfig>,
    /// First force.
    pub force_a: Force,
    /// Second force.
    pub force_b: Force,
    /// Shared flags.
    #[serde(default)]
    pub context: EngagementContext,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::border_clash()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// A built-in scenario by name, or a scenario file at that path.
    pub fn find(name_or_path: &str) -> Result<Self, ScenarioError> {
        match name_or_path {
            "border_clash" => Ok(Self::border_clash()),
            "siege_relief" => Ok(Self::siege_relief()),
            path => Self::load(path),
        }
    }

    /// Engagement inputs.
    #[must_use]
    pub fn setup(&self) -> EngagementSetup {
        EngagementSetup::new(self.force_a.clone(), self.force_b.clone())
            .with_context(self.context)
    }

    /// Engine for this scenario's config and the standard rules.
    pub fn engine(&self) -> Result<BattleEngine, ScenarioError> {
        self.engine_with(Ruleset::standard())
    }

    /// Engine for this scenario's config and the given rules.
    pub fn engine_with(&self, ruleset: Ruleset) -> Result<BattleEngine, ScenarioError> {
        let config = self.config.clone().unwrap_or_default();
        Ok(BattleEngine::new(config, ruleset)?)
    }

    /// Seed to use: the caller's, else the scenario's, else zero.
    #[must_use]
    pub fn seed_or(&self, requested: Option<u64>) -> u64 {
        requested.or(self.seed).unwrap_or(0)
    }

    /// Evenly matched mixed forces in open country.
    #[must_use]
    pub fn border_clash() -> Self {
        Self {
            name: "Border Clash".to_string(),
            description: "Two mixed brigades meet in open country".to_string(),
            seed: Some(1),
            config: None,
            force_a: Force::new(1)
                .with_unit(Unit::new(1, UnitType::Cavalry).with_upgrade("Dragoons"))
                .with_unit(Unit::new(2, UnitType::Heavy).with_upgrade("Grenadiers"))
                .with_unit(Unit::new(3, UnitType::Light).with_upgrade("Rangers"))
                .with_unit(Unit::new(4, UnitType::Ranged))
                .with_commander(Commander::new(1, "Marshal Ney", 4, "Bold")),
            force_b: Force::new(2)
                .with_unit(Unit::new(11, UnitType::Cavalry).with_upgrade("Life Guard"))
                .with_unit(Unit::new(12, UnitType::Heavy))
                .with_unit(Unit::new(13, UnitType::Heavy).with_upgrade("Sentry Team"))
                .with_unit(Unit::new(14, UnitType::Ranged).with_upgrade("Sharpshooters"))
                .with_commander(Commander::new(2, "General Blucher", 4, "Resolute")),
            context: EngagementContext::default(),
        }
    }

    /// A relief column attacks besiegers of a garrisoned town.
    #[must_use]
    pub fn siege_relief() -> Self {
        Self {
            name: "Siege Relief".to_string(),
            description: "A relief army engages the besiegers before the walls".to_string(),
            seed: Some(2),
            config: None,
            force_a: Force::new(1)
                .with_unit(Unit::new(1, UnitType::Heavy).with_upgrade("Artillery Team"))
                .with_unit(Unit::new(2, UnitType::Ranged).with_upgrade("Mortar Team"))
                .with_unit(Unit::new(3, UnitType::Support).with_upgrade("Combat Engineers"))
                .with_unit(Unit::new(4, UnitType::Light))
                .with_commander(Commander::new(1, "Vauban", 6, "Disciplined"))
                .with_context(ForceContext {
                    besieging: true,
                    ..ForceContext::default()
                }),
            force_b: Force::new(2)
                .with_unit(Unit::new(11, UnitType::Heavy))
                .with_unit(Unit::new(12, UnitType::Ranged))
                .with_unit(Unit::new(13, UnitType::Support).with_upgrade("Field Hospital"))
                .with_commander(Commander::new(2, "Governor Coehoorn", 3, "Defiant"))
                .with_context(ForceContext {
                    home_territory: true,
                    besieged: true,
                    garrisoned: true,
                    war_college_tier: 4,
                    ..ForceContext::default()
                }),
            context: EngagementContext::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_scenarios_validate() {
        for scenario in [Scenario::border_clash(), Scenario::siege_relief()] {
            let engine = scenario.engine().unwrap();
            assert!(engine.validate(&scenario.setup()).is_ok(), "{}", scenario.name);
        }
    }

    #[test]
    fn test_scenario_from_ron() {
        let ron = r#"
            Scenario(
                name: "Ambush",
                seed: Some(99),
                config: Some((max_pitch_rally_loops: 4)),
                force_a: (id: 1, units: [(id: 1, unit_type: Light, upgrades: ["Commando"])]),
                force_b: (id: 2, units: [(id: 2, unit_type: Support)]),
                context: (holy_war: true),
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.name, "Ambush");
        assert_eq!(scenario.seed_or(None), 99);
        assert_eq!(scenario.seed_or(Some(5)), 5);
        assert!(scenario.context.holy_war);
        let engine = scenario.engine().unwrap();
        assert_eq!(engine.config().max_pitch_rally_loops, 4);
        assert_eq!(engine.config().die_sides, 6);
    }

    #[test]
    fn test_find_builtin_and_missing_file() {
        assert_eq!(Scenario::find("siege_relief").unwrap().name, "Siege Relief");
        assert!(matches!(
            Scenario::find("no/such/scenario.ron"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clash.ron");
        let text = ron::ser::to_string_pretty(
            &Scenario::border_clash(),
            ron::ser::PrettyConfig::default(),
        )
        .unwrap();
        std::fs::write(&path, text).unwrap();
        assert_eq!(Scenario::load(&path).unwrap(), Scenario::border_clash());
    }

    #[test]
    fn test_invalid_config_override_rejected() {
        let mut scenario = Scenario::border_clash();
        scenario.config = Some(EngineConfig {
            die_sides: 0,
            ..EngineConfig::default()
        });
        assert!(matches!(scenario.engine(), Err(ScenarioError::Engine(_))));
    }

    #[test]
    fn test_parse_error_reported() {
        assert!(matches!(
            Scenario::from_ron_str("Scenario(name: "),
            Err(ScenarioError::ParseError(_))
        ));
    }
}
