//! Rally phase: morale checks after each pitch.
//!
//! Only active units roll. Routed units stay routed for the rest of the
//! engagement; a unit that falls short of the threshold routs unless it is
//! rout-immune, in which case the override is logged.

use tracing::debug;

use crate::data::{Ability, Axis};
use crate::dice::Dice;
use crate::error::Result;
use crate::events::{BattleEvent, Phase, RallyOutcome};
use crate::roster::{Side, UnitStatus};

use super::{die_value, Battlefield};

/// Outcome of one rally invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RallyReport {
    /// Units that routed.
    pub routed: usize,
    /// Units saved by rout immunity.
    pub overrides: usize,
    /// Active units left per side.
    pub active: [usize; 2],
}

/// Resolve one rally invocation, giving `pitch_winner` its bonus.
///
/// # Errors
///
/// Returns a configuration error for unknown rule keys or an invariant
/// violation if a status would move backwards.
pub fn run<D: Dice + ?Sized>(
    field: &mut Battlefield<'_>,
    dice: &mut D,
    pitch_winner: Option<Side>,
    iteration: u32,
) -> Result<RallyReport> {
    let mods = field.modifiers()?;
    let threshold = field.config.rally_threshold;
    let mut report = RallyReport::default();

    for side in Side::BOTH {
        let side_mods = mods.side(side);
        let winner_bonus = if pitch_winner == Some(side) {
            field.config.pitch_winner_rally_bonus
        } else {
            0
        };

        for id in field.active_ids(side) {
            let unit_mods = side_mods.unit(id);
            let bonus =
                unit_mods.get(Axis::Rally) + side_mods.force.get(Axis::Rally) + winner_bonus;
            let mut rerolls = u32::from(unit_mods.count(Ability::RallyReroll))
                + u32::from(side_mods.force.count(Ability::RallyReroll));

            let first = field.roll(dice, side, Some(id));
            let mut roll = first;
            let mut rerolled_from = None;
            while die_value(roll) + bonus < threshold && rerolls > 0 {
                rerolled_from.get_or_insert(first);
                roll = field.roll(dice, side, Some(id));
                rerolls -= 1;
            }

            let outcome = if die_value(roll) + bonus >= threshold {
                RallyOutcome::Held
            } else if side_mods.unit_has(id, Ability::RoutImmune) {
                report.overrides += 1;
                RallyOutcome::ImmunityOverride
            } else {
                field.set_status(side, id, UnitStatus::Routed)?;
                report.routed += 1;
                RallyOutcome::Routed
            };

            if outcome == RallyOutcome::ImmunityOverride {
                debug!(?side, unit = %id, roll, bonus, "rout immunity override");
            }
            field.record(
                Phase::Rally,
                Some(iteration),
                BattleEvent::RallyCheck {
                    side,
                    unit: id,
                    roll,
                    bonus,
                    rerolled_from,
                    outcome,
                },
            );
        }
    }

    report.active = Side::BOTH.map(|s| field.active_count(s));
    debug!(
        iteration,
        routed = report.routed,
        active_a = report.active[0],
        active_b = report.active[1],
        "rally resolved"
    );
    field.record(
        Phase::Rally,
        Some(iteration),
        BattleEvent::RallyResolved {
            active_a: report.active[0],
            active_b: report.active[1],
        },
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{field, force_of, status};
    use super::*;
    use crate::config::EngineConfig;
    use crate::data::Ruleset;
    use crate::dice::ScriptedDice;
    use crate::roster::{Commander, UnitId, UnitType};

    fn checks(field: &Battlefield<'_>) -> Vec<(UnitId, u32, Option<u32>, RallyOutcome)> {
        field
            .log()
            .events()
            .iter()
            .filter_map(|e| match e.event {
                BattleEvent::RallyCheck {
                    unit,
                    roll,
                    rerolled_from,
                    outcome,
                    ..
                } => Some((unit, roll, rerolled_from, outcome)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_threshold_splits_hold_and_rout() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        // Heavy rally +1: 4 holds, 3 routs.
        let mut bf = field(
            &config,
            &rules,
            force_of(1, UnitType::Heavy, &[1]),
            force_of(2, UnitType::Heavy, &[2]),
        );
        let mut dice = ScriptedDice::new([4, 3]);
        let report = run(&mut bf, &mut dice, None, 1).unwrap();
        assert_eq!(status(&bf, Side::A, 1), UnitStatus::Active);
        assert_eq!(status(&bf, Side::B, 2), UnitStatus::Routed);
        assert_eq!(report.active, [1, 0]);
    }

    #[test]
    fn test_pitch_winner_bonus() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let mut bf = field(
            &config,
            &rules,
            force_of(1, UnitType::Heavy, &[1]),
            force_of(2, UnitType::Heavy, &[2]),
        );
        let mut dice = ScriptedDice::new([3, 3]);
        let report = run(&mut bf, &mut dice, Some(Side::B), 1).unwrap();
        assert_eq!(report.active, [0, 1]);
    }

    #[test]
    fn test_heroic_unit_never_routs() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let a = force_of(1, UnitType::Cavalry, &[1])
            .with_commander(Commander::new(1, "Leonidas", 2, "Heroic"));
        let mut bf = field(&config, &rules, a, force_of(2, UnitType::Heavy, &[2]));
        let mut dice = ScriptedDice::new([1, 6]);
        let report = run(&mut bf, &mut dice, None, 1).unwrap();
        assert_eq!(status(&bf, Side::A, 1), UnitStatus::Active);
        assert_eq!(report.overrides, 1);
        assert_eq!(checks(&bf)[0].3, RallyOutcome::ImmunityOverride);
    }

    #[test]
    fn test_routed_units_do_not_roll() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let mut bf = field(
            &config,
            &rules,
            force_of(1, UnitType::Heavy, &[1, 2]),
            force_of(2, UnitType::Heavy, &[3]),
        );
        bf.set_status(Side::A, UnitId(2), UnitStatus::Routed).unwrap();
        let mut dice = ScriptedDice::new([6]);
        run(&mut bf, &mut dice, None, 1).unwrap();
        assert_eq!(dice.rolls_consumed(), 2);
        assert_eq!(status(&bf, Side::A, 2), UnitStatus::Routed);
    }

    #[test]
    fn test_inspiring_rerolls_failure_once() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let a = force_of(1, UnitType::Cavalry, &[1])
            .with_commander(Commander::new(1, "Joan", 2, "Inspiring"));
        let mut bf = field(&config, &rules, a, force_of(2, UnitType::Heavy, &[2]));
        // Cavalry rally 0: 2 fails, reroll 5 holds. Heavy rolls 6.
        let mut dice = ScriptedDice::new([2, 5, 6]);
        run(&mut bf, &mut dice, None, 1).unwrap();
        assert_eq!(checks(&bf)[0], (UnitId(1), 5, Some(2), RallyOutcome::Held));
        assert_eq!(status(&bf, Side::A, 1), UnitStatus::Active);
        assert_eq!(dice.rolls_consumed(), 3);
    }

    #[test]
    fn test_pass_needs_no_reroll() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let a = force_of(1, UnitType::Cavalry, &[1])
            .with_commander(Commander::new(1, "Joan", 2, "Inspiring"));
        let mut bf = field(&config, &rules, a, force_of(2, UnitType::Heavy, &[2]));
        let mut dice = ScriptedDice::new([6]);
        run(&mut bf, &mut dice, None, 1).unwrap();
        assert_eq!(checks(&bf)[0].2, None);
        assert_eq!(dice.rolls_consumed(), 2);
    }
}
