//! Engine tuning constants.
//!
//! Every threshold the phases use lives here rather than as a literal, so a
//! campaign can adjust its ruleset without touching code. Values load from
//! RON; any field left out keeps its default.
//!
//! ```ron
//! EngineConfig(
//!     decisive_threshold: 25,
//!     max_pitch_rally_loops: 6,
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, Result};

/// Tunable engagement constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Faces on every die the engine rolls.
    pub die_sides: u32,
    /// Units each side nominates for the skirmish.
    pub skirmishers_per_side: usize,
    /// Skirmish win margin at which the defender is destroyed outright.
    pub overrun_margin: i32,
    /// Pitch rounds per invocation.
    pub pitch_rounds: u32,
    /// Absolute running pitch tally that ends an invocation early.
    pub decisive_threshold: i32,
    /// Rally total a unit needs to stay active.
    pub rally_threshold: i32,
    /// Rally bonus for every unit of the side that won the preceding pitch.
    pub pitch_winner_rally_bonus: i32,
    /// Maximum pitch/rally loop iterations before the action report is forced.
    pub max_pitch_rally_loops: u32,
    /// Casualty rolls at or below this destroy the unit.
    pub casualty_destroy_at_or_below: u32,
    /// Winning-side units may reroll one failed casualty roll.
    pub winner_casualty_reroll: bool,
    /// Losing commander rolls at or below this are captured.
    pub capture_at_or_below: u32,
    /// Winning commander rolls at or above this are promoted.
    pub promotion_at_or_above: u32,
    /// Highest commander level.
    pub max_commander_level: u8,
    /// A decisive pitch ends the engagement at once instead of going to rally.
    pub decisive_ends_engagement: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            die_sides: 6,
            skirmishers_per_side: 2,
            overrun_margin: 3,
            pitch_rounds: 3,
            decisive_threshold: 20,
            rally_threshold: 5,
            pitch_winner_rally_bonus: 1,
            max_pitch_rally_loops: 10,
            casualty_destroy_at_or_below: 2,
            winner_casualty_reroll: true,
            capture_at_or_below: 1,
            promotion_at_or_above: 5,
            max_commander_level: 10,
            decisive_ends_engagement: false,
        }
    }
}

impl EngineConfig {
    /// Load a config from a RON string.
    ///
    /// # Errors
    ///
    /// Returns a parse error or any [`EngineConfig::validate`] failure.
    pub fn from_ron_str(source_name: &str, ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron).map_err(|e| ConfigurationError::Parse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every setting for a usable value.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<()> {
        if self.die_sides < 2 {
            return Err(ConfigurationError::InvalidDieRange(self.die_sides).into());
        }
        let sides = self.die_sides;
        let checks: [(&'static str, bool, String); 8] = [
            (
                "overrun_margin",
                self.overrun_margin >= 1,
                "must be at least 1".to_string(),
            ),
            (
                "pitch_rounds",
                self.pitch_rounds >= 1,
                "must be at least 1".to_string(),
            ),
            (
                "decisive_threshold",
                self.decisive_threshold >= 1,
                "must be positive".to_string(),
            ),
            (
                "max_pitch_rally_loops",
                self.max_pitch_rally_loops >= 1,
                "must be at least 1".to_string(),
            ),
            (
                "casualty_destroy_at_or_below",
                self.casualty_destroy_at_or_below < sides,
                format!("must be below the die size {sides}"),
            ),
            (
                "capture_at_or_below",
                self.capture_at_or_below < sides,
                format!("must be below the die size {sides}"),
            ),
            (
                "promotion_at_or_above",
                self.promotion_at_or_above >= 2 && self.promotion_at_or_above <= sides,
                format!("must be within 2..={sides}"),
            ),
            (
                "max_commander_level",
                self.max_commander_level >= 1,
                "must be at least 1".to_string(),
            ),
        ];
        for (name, ok, reason) in checks {
            if !ok {
                return Err(ConfigurationError::InvalidSetting { name, reason }.into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_sided_die_rejected() {
        let config = EngineConfig {
            die_sides: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            EngineError::Configuration(ConfigurationError::InvalidDieRange(0))
        );
    }

    #[test]
    fn test_casualty_threshold_must_fit_die() {
        let config = EngineConfig {
            casualty_destroy_at_or_below: 6,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            EngineError::Configuration(ConfigurationError::InvalidSetting {
                name: "casualty_destroy_at_or_below",
                ..
            })
        ));
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config =
            EngineConfig::from_ron_str("inline", "EngineConfig(decisive_threshold: 25)").unwrap();
        assert_eq!(config.decisive_threshold, 25);
        assert_eq!(config.rally_threshold, 5);
        assert_eq!(config.die_sides, 6);
    }

    #[test]
    fn test_bad_ron_reports_source() {
        let err = EngineConfig::from_ron_str("broken.ron", "EngineConfig(").unwrap_err();
        match err {
            EngineError::Configuration(ConfigurationError::Parse { source_name, .. }) => {
                assert_eq!(source_name, "broken.ron");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
