//! The complete rule data consumed by the modifier resolver.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::modifier_rule::{Ability, Amount, Axis, Condition, ModifierRule, StatBlock};
use super::trait_data::TraitData;
use super::unit_type_data::UnitTypeData;
use super::upgrade_data::UpgradeData;
use crate::error::{ConfigurationError, Result};
use crate::roster::{UnitType, UpgradeKey};

/// Unit types, upgrades, traits and ambient rules.
///
/// # Example RON
///
/// ```ron
/// Ruleset(
///     unit_types: [...],
///     upgrades: [...],
///     traits: [...],
///     commander_rules: [(scope: Force, effect: Bonus(axis: Pitch, amount: CommanderLevel))],
///     context_rules: [...],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruleset {
    /// Unit type definitions.
    pub unit_types: Vec<UnitTypeData>,
    /// Upgrade definitions.
    #[serde(default)]
    pub upgrades: Vec<UpgradeData>,
    /// Commander trait definitions.
    #[serde(default)]
    pub traits: Vec<TraitData>,
    /// Rules every commander brings to its force.
    #[serde(default)]
    pub commander_rules: Vec<ModifierRule>,
    /// Terrain and situation rules applied to every force.
    #[serde(default)]
    pub context_rules: Vec<ModifierRule>,
}

impl Default for Ruleset {
    fn default() -> Self {
        Self::standard()
    }
}

impl Ruleset {
    /// Parse a ruleset from RON and check it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::Parse`] or [`ConfigurationError::InvalidRuleset`].
    pub fn from_ron_str(source_name: &str, ron: &str) -> Result<Self> {
        let ruleset: Self = ron::from_str(ron).map_err(|e| ConfigurationError::Parse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
        ruleset.validate()?;
        Ok(ruleset)
    }

    /// Serialize to pretty RON.
    ///
    /// # Errors
    ///
    /// Returns a parse-class error if serialization fails.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()).map_err(|e| {
            ConfigurationError::Parse {
                source_name: "ruleset".to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Check the ruleset for repeated keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidRuleset`] naming the first problem.
    pub fn validate(&self) -> Result<()> {
        let mut types = BTreeSet::new();
        for def in &self.unit_types {
            if !types.insert(def.unit_type) {
                return Err(ConfigurationError::InvalidRuleset(format!(
                    "unit type {} defined twice",
                    def.unit_type
                ))
                .into());
            }
        }

        let mut upgrades = BTreeSet::new();
        for def in &self.upgrades {
            if def.key.as_str().trim().is_empty() {
                return Err(
                    ConfigurationError::InvalidRuleset("upgrade with empty key".into()).into(),
                );
            }
            if !upgrades.insert(def.key.as_str()) {
                return Err(ConfigurationError::InvalidRuleset(format!(
                    "upgrade '{}' defined twice",
                    def.key
                ))
                .into());
            }
        }

        let mut traits = BTreeSet::new();
        for def in &self.traits {
            if def.key.as_str().trim().is_empty() {
                return Err(
                    ConfigurationError::InvalidRuleset("trait with empty key".into()).into(),
                );
            }
            if !traits.insert(def.key.as_str()) {
                return Err(ConfigurationError::InvalidRuleset(format!(
                    "trait '{}' defined twice",
                    def.key
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Definition of a unit type.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownUnitType`] if the ruleset lacks it.
    pub fn unit_type(&self, unit_type: UnitType) -> Result<&UnitTypeData> {
        self.unit_types
            .iter()
            .find(|d| d.unit_type == unit_type)
            .ok_or_else(|| ConfigurationError::UnknownUnitType(unit_type.to_string()).into())
    }

    /// Definition of an upgrade.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownUpgrade`] if the key is not defined.
    pub fn upgrade(&self, key: &UpgradeKey) -> Result<&UpgradeData> {
        self.upgrades
            .iter()
            .find(|d| d.key == *key)
            .ok_or_else(|| ConfigurationError::UnknownUpgrade(key.to_string()).into())
    }

    /// Definition of a trait.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownTrait`] if the key is not defined.
    pub fn trait_def(&self, key: &str) -> Result<&TraitData> {
        self.traits
            .iter()
            .find(|d| d.key.as_str() == key)
            .ok_or_else(|| ConfigurationError::UnknownTrait(key.to_string()).into())
    }

    /// The shipped rules.
    #[must_use]
    pub fn standard() -> Self {
        use Ability::*;
        use Axis::*;
        use UnitType::*;

        let unit_types = vec![
            UnitTypeData::new(Cavalry, StatBlock::new(1, 0, 1, 0, 5)),
            UnitTypeData::new(Heavy, StatBlock::new(0, 2, 1, 1, 3)),
            UnitTypeData::new(Light, StatBlock::new(2, 0, 0, 1, 4)),
            UnitTypeData::new(Ranged, StatBlock::new(0, 2, 1, 0, 4)),
            UnitTypeData::new(Support, StatBlock::new(0, 2, 0, 1, 4)),
        ];

        let garrisoned_pitch = ModifierRule::bonus(Pitch, 1).when(Condition::Garrisoned);
        let upgrades = vec![
            UpgradeData::new("Life Guard", Some(Cavalry), StatBlock::new(0, 0, 0, 2, 0))
                .with_rule(ModifierRule::grant(PromotionReroll).force())
                .described("Commander may reroll a 1 on the promotion die"),
            UpgradeData::new("Lancers", Some(Cavalry), StatBlock::new(2, 0, 0, 0, 0))
                .with_rule(ModifierRule::grant(AutoOverrun))
                .described("Overrun automatically if they win the skirmish"),
            UpgradeData::new("Dragoons", Some(Cavalry), StatBlock::new(0, 2, 1, 1, 0)),
            UpgradeData::new("Artillery Team", Some(Heavy), StatBlock::new(0, 1, 1, 0, 0))
                .with_rule(garrisoned_pitch)
                .with_rule(ModifierRule::bonus(Defense, -1).enemy())
                .described("+1 Pitch when garrisoned, -1 Defense to every enemy unit"),
            UpgradeData::new("Grenadiers", Some(Heavy), StatBlock::new(2, 0, 2, 0, 0)),
            UpgradeData::new("Stormtroopers", Some(Heavy), StatBlock::new(0, 0, 1, 1, 1)),
            UpgradeData::new("Rangers", Some(Light), StatBlock::new(2, 0, 1, 0, 0)),
            UpgradeData::new("Assault Team", Some(Light), StatBlock::new(1, 0, 0, 0, 0))
                .with_rule(ModifierRule::grant(ChooseTarget))
                .with_rule(ModifierRule::grant(NegateGarrison).enemy())
                .described("Selects its skirmish target and negates enemy garrisons"),
            UpgradeData::new("Commando", Some(Light), StatBlock::new(0, 2, 1, 0, 0)),
            UpgradeData::new("Sharpshooters", Some(Ranged), StatBlock::new(0, 2, 0, 0, 0))
                .with_rule(garrisoned_pitch)
                .with_rule(ModifierRule::grant(Counterfire))
                .described(
                    "+1 Pitch when garrisoned, routs failed skirmishers who then roll for destruction",
                ),
            UpgradeData::new("Mobile Platforms", Some(Ranged), StatBlock::new(1, 2, 0, 0, 1)),
            UpgradeData::new("Mortar Team", Some(Ranged), StatBlock::new(0, 0, 1, 1, 0))
                .with_rule(ModifierRule::grant(ShellGarrison).force())
                .described("Negates the garrison bonus of one random enemy unit"),
            UpgradeData::new("Field Hospital", Some(Support), StatBlock::default())
                .with_rule(ModifierRule::grant(CasualtyReroll).force())
                .described("The whole force may reroll a failed casualty die"),
            UpgradeData::new("Combat Engineers", Some(Support), StatBlock::default())
                .described("Siege and fortification work, no battle effect"),
            UpgradeData::new("Officer Corps", Some(Support), StatBlock::new(0, 0, 0, 2, 0))
                .with_rule(ModifierRule::grant(EasyPromotion).force())
                .described("Commander is promoted on one less"),
            UpgradeData::new("Sentry Team", None, StatBlock::new(0, 3, 0, 0, 0)),
            UpgradeData::new("Marines", None, StatBlock::default())
                .with_rule(ModifierRule::bonus(Skirmish, 1).when(Condition::Embarked))
                .described("+1 Skirmish when fighting embarked"),
        ];

        let traits = vec![
            TraitData::new(
                "Ambitious",
                "Promoted on one less after battle",
                vec![ModifierRule::grant(EasyPromotion).force()],
            ),
            TraitData::new(
                "Bold",
                "Lead skirmisher gets half the commander level",
                vec![ModifierRule::grant(BoldSkirmisher).force()],
            ),
            TraitData::new(
                "Brilliant",
                "Double commander level during pitch",
                vec![ModifierRule::scaled(Pitch, Amount::CommanderLevel).force()],
            ),
            TraitData::new("Brutal", "Pillaging and sacking effects", vec![]),
            TraitData::new(
                "Cautious",
                "May skip the skirmish, withdraws cleanly",
                vec![
                    ModifierRule::grant(AvoidSkirmish).force(),
                    ModifierRule::bonus(Retreat, 1).force(),
                ],
            ),
            TraitData::new(
                "Chivalrous",
                "Enemy may reroll casualty dice",
                vec![ModifierRule::grant(CasualtyReroll).enemy()],
            ),
            TraitData::new(
                "Confident",
                "+2 Defense, +1 Rally for all units",
                vec![ModifierRule::bonus(Defense, 2), ModifierRule::bonus(Rally, 1)],
            ),
            TraitData::new(
                "Defiant",
                "+2 Rally for all units",
                vec![ModifierRule::bonus(Rally, 2)],
            ),
            TraitData::new(
                "Disciplined",
                "+1 Pitch, +1 Rally for all units",
                vec![ModifierRule::bonus(Pitch, 1), ModifierRule::bonus(Rally, 1)],
            ),
            TraitData::new("Dogged", "Assisting units are merged by the caller", vec![]),
            TraitData::new(
                "Heroic",
                "+1 Rally, units never rout",
                vec![ModifierRule::bonus(Rally, 1), ModifierRule::grant(RoutImmune)],
            ),
            TraitData::new(
                "Inspiring",
                "Free reroll on rally checks",
                vec![ModifierRule::grant(RallyReroll)],
            ),
            TraitData::new(
                "Lucky",
                "May reroll a 1 on the promotion die",
                vec![ModifierRule::grant(PromotionReroll).force()],
            ),
            TraitData::new("Mariner", "Movement while embarked", vec![]),
            TraitData::new(
                "Merciless",
                "Enemy units are destroyed on 1-3",
                vec![ModifierRule::bonus(Damage, 1).force()],
            ),
            TraitData::new("Prodigious", "Level bonus applied by the caller", vec![]),
            TraitData::new(
                "Relentless",
                "Pursues retreating enemies",
                vec![ModifierRule::bonus(Pursuit, 1).force()],
            ),
            TraitData::new(
                "Resolute",
                "+3 Defense for all units",
                vec![ModifierRule::bonus(Defense, 3)],
            ),
            TraitData::new("Wary", "Sight and scouting effects", vec![]),
            TraitData::new(
                "Zealous",
                "+1 Rally, +2 Rally and +1 Pitch in holy wars",
                vec![
                    ModifierRule::bonus(Rally, 1).when(Condition::NotHolyWar),
                    ModifierRule::bonus(Rally, 2).when(Condition::HolyWar),
                    ModifierRule::bonus(Pitch, 1).when(Condition::HolyWar),
                ],
            ),
        ];

        let commander_rules = vec![ModifierRule::scaled(Pitch, Amount::CommanderLevel).force()];

        let context_rules = vec![
            ModifierRule::bonus(Defense, 2).when(Condition::Garrisoned),
            ModifierRule::bonus(Rally, 2).when(Condition::Garrisoned),
            ModifierRule::bonus(Rally, 1).when(Condition::HomeTerritory),
            ModifierRule::bonus(Rally, -1).when(Condition::Outnumbered),
            ModifierRule::bonus(Skirmish, 1).when(Condition::TierAtLeast(8)),
            ModifierRule::bonus(Defense, 1).when(Condition::TierAtLeast(8)),
        ];

        Self {
            unit_types,
            upgrades,
            traits,
            commander_rules,
            context_rules,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn test_standard_is_valid() {
        let rules = Ruleset::standard();
        assert!(rules.validate().is_ok());
        assert_eq!(rules.unit_types.len(), 5);
        assert_eq!(rules.upgrades.len(), 17);
        assert_eq!(rules.traits.len(), 20);
    }

    #[test]
    fn test_lookup_unknown_keys() {
        let rules = Ruleset::standard();
        assert_eq!(
            rules.upgrade(&UpgradeKey::new("Jetpacks")).unwrap_err(),
            EngineError::Configuration(ConfigurationError::UnknownUpgrade("Jetpacks".into()))
        );
        assert_eq!(
            rules.trait_def("Sleepy").unwrap_err(),
            EngineError::Configuration(ConfigurationError::UnknownTrait("Sleepy".into()))
        );
    }

    #[test]
    fn test_missing_unit_type_is_unknown() {
        let mut rules = Ruleset::standard();
        rules.unit_types.retain(|d| d.unit_type != UnitType::Support);
        assert!(matches!(
            rules.unit_type(UnitType::Support),
            Err(EngineError::Configuration(ConfigurationError::UnknownUnitType(_)))
        ));
    }

    #[test]
    fn test_duplicate_trait_rejected() {
        let mut rules = Ruleset::standard();
        let copy = rules.traits[0].clone();
        rules.traits.push(copy);
        assert!(matches!(
            rules.validate(),
            Err(EngineError::Configuration(ConfigurationError::InvalidRuleset(_)))
        ));
    }

    #[test]
    fn test_ron_roundtrip_preserves_rules() {
        let rules = Ruleset::standard();
        let text = rules.to_ron_string().unwrap();
        let parsed = Ruleset::from_ron_str("generated", &text).unwrap();
        assert_eq!(parsed, rules);
    }
}
