//! Upgrade definitions.

use serde::{Deserialize, Serialize};

use super::modifier_rule::{ModifierRule, StatBlock};
use crate::roster::{UnitType, UpgradeKey};

/// An equipment or training upgrade attachable to a unit.
///
/// # Example RON
///
/// ```ron
/// UpgradeData(
///     key: "Lancers",
///     unit_type: Some(Cavalry),
///     stats: (skirmish: 2),
///     rules: [(effect: Grant(AutoOverrun))],
///     description: "Overrun automatically if they win skirmish",
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeData {
    /// Unique key.
    pub key: UpgradeKey,
    /// Unit type this upgrade is built for; `None` fits every type.
    #[serde(default)]
    pub unit_type: Option<UnitType>,
    /// Stat offsets added to the carrying unit.
    #[serde(default)]
    pub stats: StatBlock,
    /// Conditional bonuses and abilities.
    #[serde(default)]
    pub rules: Vec<ModifierRule>,
    /// Human-readable summary.
    #[serde(default)]
    pub description: String,
}

impl UpgradeData {
    /// An upgrade with stats only.
    pub fn new(key: &str, unit_type: Option<UnitType>, stats: StatBlock) -> Self {
        Self {
            key: UpgradeKey::new(key),
            unit_type,
            stats,
            rules: Vec::new(),
            description: String::new(),
        }
    }

    /// Add a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: ModifierRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Set the description.
    #[must_use]
    pub fn described(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Whether this upgrade can be attached to a unit type.
    #[must_use]
    pub fn fits(&self, unit_type: UnitType) -> bool {
        self.unit_type.map_or(true, |t| t == unit_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universal_upgrade_fits_all() {
        let sentry = UpgradeData::new("Sentry Team", None, StatBlock::new(0, 3, 0, 0, 0));
        assert!(UnitType::ALL.iter().all(|t| sentry.fits(*t)));
    }

    #[test]
    fn test_typed_upgrade_fits_one() {
        let lancers = UpgradeData::new(
            "Lancers",
            Some(UnitType::Cavalry),
            StatBlock::new(2, 0, 0, 0, 0),
        );
        assert!(lancers.fits(UnitType::Cavalry));
        assert!(!lancers.fits(UnitType::Heavy));
    }
}
