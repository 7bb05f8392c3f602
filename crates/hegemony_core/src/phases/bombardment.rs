//! Opening bombardment.
//!
//! Each `ShellGarrison` source picks one active, not yet shelled unit of a
//! garrisoned enemy. That unit fights without its garrison benefits for the
//! rest of the engagement; the rest of its side keeps them.

use tracing::debug;

use crate::data::Ability;
use crate::dice::Dice;
use crate::error::Result;
use crate::events::{BattleEvent, Phase};
use crate::roster::{Side, UnitId};

use super::Battlefield;

/// Units shelled at the start of an engagement.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BombardmentReport {
    /// Shelled units with their side, in pick order.
    pub shelled: Vec<(Side, UnitId)>,
}

/// Resolve the bombardment. Draws one pick per shell that has a target.
///
/// # Errors
///
/// Returns a configuration error for unknown rule keys.
pub fn run<D: Dice + ?Sized>(
    field: &mut Battlefield<'_>,
    dice: &mut D,
) -> Result<BombardmentReport> {
    let mods = field.modifiers()?;
    let mut report = BombardmentReport::default();

    for side in Side::BOTH {
        let enemy = side.opponent();
        let shells = mods.side(side).force.count(Ability::ShellGarrison);
        if shells == 0
            || !field.force(enemy).context.garrisoned
            || mods.side(enemy).context.garrison_negated
        {
            continue;
        }

        for _ in 0..shells {
            let targets: Vec<UnitId> = field
                .active_ids(enemy)
                .into_iter()
                .filter(|id| !field.shelled().contains(id))
                .collect();
            if targets.is_empty() {
                break;
            }
            let Some(&unit) = targets.get(dice.pick(targets.len())) else {
                break;
            };
            field.shell(unit);
            debug!(side = ?enemy, %unit, "garrison shelled");
            field.record(
                Phase::Init,
                None,
                BattleEvent::GarrisonShelled { side: enemy, unit },
            );
            report.shelled.push((enemy, unit));
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{field, force_of};
    use super::*;
    use crate::config::EngineConfig;
    use crate::data::{Axis, Ruleset};
    use crate::dice::ScriptedDice;
    use crate::roster::{Force, Unit, UnitType};

    fn garrison(mut force: Force) -> Force {
        force.context.garrisoned = true;
        force
    }

    fn mortars(count: u32) -> Force {
        (1..=count).fold(Force::new(1), |f, id| {
            f.with_unit(Unit::new(id, UnitType::Ranged).with_upgrade("Mortar Team"))
        })
    }

    #[test]
    fn test_one_mortar_shells_one_unit() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let defenders = garrison(force_of(2, UnitType::Heavy, &[11, 12, 13]));
        let mut bf = field(&config, &rules, mortars(1), defenders);
        let mut dice = ScriptedDice::new([]).with_picks([1]);

        let report = run(&mut bf, &mut dice).unwrap();
        assert_eq!(report.shelled, vec![(Side::B, UnitId(12))]);
        assert!(bf.log().events().iter().any(|e| e.event
            == BattleEvent::GarrisonShelled {
                side: Side::B,
                unit: UnitId(12)
            }));

        // Only the shelled unit loses its +2 defense.
        let mods = bf.modifiers().unwrap();
        let defense = |id| mods.side(Side::B).unit(UnitId(id)).get(Axis::Defense);
        assert_eq!(defense(11), 4);
        assert_eq!(defense(12), 2);
        assert_eq!(defense(13), 4);
    }

    #[test]
    fn test_each_mortar_picks_a_new_target() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let defenders = garrison(force_of(2, UnitType::Heavy, &[11, 12]));
        let mut bf = field(&config, &rules, mortars(3), defenders);
        // Second pick sees only unit 12 left; third has nothing to shell.
        let mut dice = ScriptedDice::new([]).with_picks([0, 0, 0]);

        let report = run(&mut bf, &mut dice).unwrap();
        assert_eq!(
            report.shelled,
            vec![(Side::B, UnitId(11)), (Side::B, UnitId(12))]
        );
    }

    #[test]
    fn test_ungarrisoned_enemy_is_not_shelled() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let mut bf = field(
            &config,
            &rules,
            mortars(1),
            force_of(2, UnitType::Heavy, &[11]),
        );
        let mut dice = ScriptedDice::new([]).with_picks([0]);
        let report = run(&mut bf, &mut dice).unwrap();
        assert!(report.shelled.is_empty());
        assert!(bf.log().is_empty());
    }

    #[test]
    fn test_side_wide_negation_makes_shelling_moot() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let attackers =
            mortars(1).with_unit(Unit::new(2, UnitType::Light).with_upgrade("Assault Team"));
        let defenders = garrison(force_of(2, UnitType::Heavy, &[11]));
        let mut bf = field(&config, &rules, attackers, defenders);
        let report = run(&mut bf, &mut ScriptedDice::new([])).unwrap();
        assert!(report.shelled.is_empty());
    }
}
