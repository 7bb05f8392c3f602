//! Action report: casualties and commander fates.
//!
//! Runs exactly once, after the pitch/rally loop. Units of the losing force
//! and routed units of any other force roll a casualty die; low rolls
//! destroy. Commanders of the winner and the loser then roll for promotion
//! or capture.

use tracing::debug;

use crate::data::{Ability, Axis};
use crate::dice::Dice;
use crate::error::Result;
use crate::events::{BattleEvent, CommanderOutcome, Phase};
use crate::modifiers::PhaseModifiers;
use crate::roster::{Side, UnitId, UnitStatus};

use super::Battlefield;

/// What the action report did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionReportSummary {
    /// Units destroyed here, per side.
    pub destroyed: [usize; 2],
    /// Commander outcome per side; `None` also when a side has no commander.
    pub commanders: [CommanderOutcome; 2],
}

/// Resolve casualties and commander fates for a finished engagement.
///
/// # Errors
///
/// Returns a configuration error for unknown rule keys or an invariant
/// violation if a status would move backwards.
pub fn run<D: Dice + ?Sized>(
    field: &mut Battlefield<'_>,
    dice: &mut D,
    winner: Option<Side>,
) -> Result<ActionReportSummary> {
    let mods = field.modifiers()?;
    let mut summary = ActionReportSummary::default();

    for side in Side::BOTH {
        let lost = winner == Some(side.opponent());
        let mut rolling: Vec<(UnitId, UnitStatus)> = field
            .force(side)
            .units
            .iter()
            .filter(|u| match u.status() {
                UnitStatus::Destroyed => false,
                UnitStatus::Routed => true,
                UnitStatus::Active => lost,
            })
            .map(|u| (u.id, u.status()))
            .collect();
        rolling.sort_unstable_by_key(|(id, _)| *id);

        for (id, status) in rolling {
            if casualty_check(field, &mods, dice, side, id, status, winner)? {
                summary.destroyed[side.index()] += 1;
            }
        }
    }

    if let Some(winning_side) = winner {
        for side in Side::BOTH {
            summary.commanders[side.index()] =
                commander_check(field, &mods, dice, side, side == winning_side);
        }
    }

    debug!(
        destroyed_a = summary.destroyed[0],
        destroyed_b = summary.destroyed[1],
        "action report resolved"
    );
    Ok(summary)
}

/// Destroy threshold for one unit, clamped to the die.
fn destroy_threshold(
    field: &Battlefield<'_>,
    mods: &PhaseModifiers,
    side: Side,
    unit: UnitId,
    status: UnitStatus,
) -> u32 {
    let own = mods.side(side);
    let enemy = &mods.side(side.opponent()).force;
    let base = i64::from(field.config.casualty_destroy_at_or_below);
    let mut threshold = base + i64::from(enemy.get(Axis::Damage));
    if status == UnitStatus::Routed {
        threshold += i64::from(enemy.get(Axis::Pursuit));
        threshold -= i64::from(own.combined(unit).get(Axis::Retreat));
    }
    let max = i64::from(field.config.die_sides.saturating_sub(1));
    u32::try_from(threshold.clamp(0, max)).unwrap_or(0)
}

/// Roll one unit's casualty die. Returns whether it was destroyed.
fn casualty_check<D: Dice + ?Sized>(
    field: &mut Battlefield<'_>,
    mods: &PhaseModifiers,
    dice: &mut D,
    side: Side,
    unit: UnitId,
    status: UnitStatus,
    winner: Option<Side>,
) -> Result<bool> {
    let threshold = destroy_threshold(field, mods, side, unit, status);
    let may_reroll = (winner == Some(side) && field.config.winner_casualty_reroll)
        || mods.side(side).unit_has(unit, Ability::CasualtyReroll);

    let first = field.roll(dice, side, Some(unit));
    let mut roll = first;
    let mut rerolled_from = None;
    if roll <= threshold && may_reroll {
        rerolled_from = Some(first);
        roll = field.roll(dice, side, Some(unit));
    }

    let destroyed = roll <= threshold;
    if destroyed {
        field.set_status(side, unit, UnitStatus::Destroyed)?;
    }
    field.record(
        Phase::ActionReport,
        None,
        BattleEvent::CasualtyCheck {
            side,
            unit,
            roll,
            destroy_at_or_below: threshold,
            rerolled_from,
            status: if destroyed { UnitStatus::Destroyed } else { status },
        },
    );
    Ok(destroyed)
}

/// Roll a commander's fate. Sides without an eligible commander roll nothing.
fn commander_check<D: Dice + ?Sized>(
    field: &mut Battlefield<'_>,
    mods: &PhaseModifiers,
    dice: &mut D,
    side: Side,
    won: bool,
) -> CommanderOutcome {
    let Some(commander) = field.force(side).commander.as_ref().filter(|c| c.eligible) else {
        return CommanderOutcome::None;
    };
    let level = commander.level;
    let force_mods = &mods.side(side).force;
    let config = field.config;

    let first = field.roll(dice, side, None);
    let mut roll = first;
    let mut rerolled_from = None;

    let outcome = if won {
        if roll == 1 && force_mods.has(Ability::PromotionReroll) {
            rerolled_from = Some(first);
            roll = field.roll(dice, side, None);
        }
        let mut needed = config.promotion_at_or_above;
        if force_mods.has(Ability::EasyPromotion) {
            needed = needed.saturating_sub(1);
        }
        if roll >= needed && level < config.max_commander_level {
            CommanderOutcome::Promoted {
                from: level,
                to: (level + 1).min(config.max_commander_level),
            }
        } else {
            CommanderOutcome::None
        }
    } else if roll <= config.capture_at_or_below {
        CommanderOutcome::Captured
    } else {
        CommanderOutcome::None
    };

    if let CommanderOutcome::Promoted { to, .. } = outcome {
        field.set_commander_level(side, to);
    }
    debug!(?side, roll, ?outcome, "commander check");
    field.record(
        Phase::ActionReport,
        None,
        BattleEvent::CommanderCheck {
            side,
            roll,
            rerolled_from,
            outcome,
        },
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{field, force_of, status};
    use super::*;
    use crate::config::EngineConfig;
    use crate::data::Ruleset;
    use crate::dice::ScriptedDice;
    use crate::roster::{Commander, Force, Unit, UnitType};

    #[test]
    fn test_loser_rolls_every_unit_winner_only_routed() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let a = Force::new(1)
            .with_unit(Unit::new(1, UnitType::Heavy))
            .with_unit(Unit::new(2, UnitType::Heavy).with_status(UnitStatus::Routed));
        let b = Force::new(2)
            .with_unit(Unit::new(3, UnitType::Heavy))
            .with_unit(Unit::new(4, UnitType::Heavy).with_status(UnitStatus::Destroyed));
        let mut bf = field(&config, &rules, a, b);
        // A's routed #2 rolls 5, B's active #3 rolls 2.
        let mut dice = ScriptedDice::new([5, 2]);
        let summary = run(&mut bf, &mut dice, Some(Side::A)).unwrap();
        assert_eq!(dice.rolls_consumed(), 2);
        assert_eq!(status(&bf, Side::A, 1), UnitStatus::Active);
        assert_eq!(status(&bf, Side::A, 2), UnitStatus::Routed);
        assert_eq!(status(&bf, Side::B, 3), UnitStatus::Destroyed);
        assert_eq!(summary.destroyed, [0, 1]);
    }

    #[test]
    fn test_winner_rerolls_failed_casualty() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let a = Force::new(1).with_unit(Unit::new(1, UnitType::Light).with_status(UnitStatus::Routed));
        let mut bf = field(&config, &rules, a, force_of(2, UnitType::Light, &[2]));
        // Winner's 1 is rerolled into a 4; loser's 1 stands.
        let mut dice = ScriptedDice::new([1, 4, 1]);
        run(&mut bf, &mut dice, Some(Side::A)).unwrap();
        assert_eq!(status(&bf, Side::A, 1), UnitStatus::Routed);
        assert_eq!(status(&bf, Side::B, 2), UnitStatus::Destroyed);
    }

    #[test]
    fn test_draw_rolls_routed_units_without_privilege() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let a = Force::new(1)
            .with_unit(Unit::new(1, UnitType::Light).with_status(UnitStatus::Routed))
            .with_unit(Unit::new(2, UnitType::Light))
            .with_commander(Commander::new(1, "Hannibal", 4, "Wary"));
        let b = Force::new(2).with_unit(Unit::new(3, UnitType::Light).with_status(UnitStatus::Routed));
        let mut bf = field(&config, &rules, a, b);
        let mut dice = ScriptedDice::new([2, 3]);
        let summary = run(&mut bf, &mut dice, None).unwrap();
        assert_eq!(status(&bf, Side::A, 1), UnitStatus::Destroyed);
        assert_eq!(status(&bf, Side::B, 3), UnitStatus::Routed);
        assert_eq!(summary.commanders, [CommanderOutcome::None; 2]);
        assert_eq!(dice.rolls_consumed(), 2);
    }

    #[test]
    fn test_merciless_and_relentless_widen_destruction() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let a = force_of(1, UnitType::Heavy, &[1])
            .with_commander(Commander::new(1, "Attila", 1, "Merciless"));
        let b = Force::new(2).with_unit(Unit::new(2, UnitType::Heavy).with_status(UnitStatus::Routed));
        let bf = field(&config, &rules, a, b);
        let mods = bf.modifiers().unwrap();
        assert_eq!(destroy_threshold(&bf, &mods, Side::B, UnitId(2), UnitStatus::Routed), 3);

        let a = force_of(1, UnitType::Heavy, &[1])
            .with_commander(Commander::new(1, "Sherman", 1, "Relentless"));
        let b = Force::new(2).with_unit(Unit::new(2, UnitType::Heavy).with_status(UnitStatus::Routed));
        let bf = field(&config, &rules, a, b);
        let mods = bf.modifiers().unwrap();
        assert_eq!(destroy_threshold(&bf, &mods, Side::B, UnitId(2), UnitStatus::Routed), 3);
        assert_eq!(destroy_threshold(&bf, &mods, Side::A, UnitId(1), UnitStatus::Active), 2);
    }

    #[test]
    fn test_cautious_retreat_lowers_threshold_for_routed() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let a = Force::new(1)
            .with_unit(Unit::new(1, UnitType::Heavy).with_status(UnitStatus::Routed))
            .with_commander(Commander::new(1, "Fabius", 1, "Cautious"));
        let bf = field(&config, &rules, a, force_of(2, UnitType::Heavy, &[2]));
        let mods = bf.modifiers().unwrap();
        assert_eq!(destroy_threshold(&bf, &mods, Side::A, UnitId(1), UnitStatus::Routed), 1);
    }

    #[test]
    fn test_loser_commander_captured_on_one() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let a = force_of(1, UnitType::Heavy, &[1]).with_commander(Commander::new(1, "Caesar", 3, "Wary"));
        let b = force_of(2, UnitType::Heavy, &[2]).with_commander(Commander::new(2, "Vercingetorix", 3, "Wary"));
        let mut bf = field(&config, &rules, a, b);
        // B's unit survives on 6; A commander 2 (no promotion); B commander 1.
        let mut dice = ScriptedDice::new([6, 2, 1]);
        let summary = run(&mut bf, &mut dice, Some(Side::A)).unwrap();
        assert_eq!(summary.commanders, [CommanderOutcome::None, CommanderOutcome::Captured]);
    }

    #[test]
    fn test_winner_commander_promoted_and_capped() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let a = force_of(1, UnitType::Heavy, &[1]).with_commander(Commander::new(1, "Scipio", 4, "Wary"));
        let mut bf = field(&config, &rules, a, force_of(2, UnitType::Heavy, &[2]));
        let mut dice = ScriptedDice::new([6, 5]);
        let summary = run(&mut bf, &mut dice, Some(Side::A)).unwrap();
        assert_eq!(summary.commanders[0], CommanderOutcome::Promoted { from: 4, to: 5 });
        assert_eq!(bf.force(Side::A).commander.as_ref().map(|c| c.level), Some(5));

        let veteran = force_of(1, UnitType::Heavy, &[1]).with_commander(Commander::new(1, "Old Guard", 10, "Wary"));
        let mut bf = field(&config, &rules, veteran, force_of(2, UnitType::Heavy, &[2]));
        let mut dice = ScriptedDice::new([6, 6]);
        let summary = run(&mut bf, &mut dice, Some(Side::A)).unwrap();
        assert_eq!(summary.commanders[0], CommanderOutcome::None);
    }

    #[test]
    fn test_lucky_rerolls_a_one() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let a = force_of(1, UnitType::Heavy, &[1]).with_commander(Commander::new(1, "Sulla", 2, "Lucky"));
        let mut bf = field(&config, &rules, a, force_of(2, UnitType::Heavy, &[2]));
        let mut dice = ScriptedDice::new([6, 1, 5]);
        let summary = run(&mut bf, &mut dice, Some(Side::A)).unwrap();
        assert_eq!(summary.commanders[0], CommanderOutcome::Promoted { from: 2, to: 3 });
    }

    #[test]
    fn test_ambitious_promotes_on_four() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let a = force_of(1, UnitType::Heavy, &[1]).with_commander(Commander::new(1, "Octavian", 2, "Ambitious"));
        let mut bf = field(&config, &rules, a, force_of(2, UnitType::Heavy, &[2]));
        let mut dice = ScriptedDice::new([6, 4]);
        let summary = run(&mut bf, &mut dice, Some(Side::A)).unwrap();
        assert_eq!(summary.commanders[0], CommanderOutcome::Promoted { from: 2, to: 3 });
    }
}
