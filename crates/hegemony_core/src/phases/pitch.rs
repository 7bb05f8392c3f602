//! Pitch phase: the main line battle.
//!
//! Every active unit rolls each round and adds its pitch bonus; each side
//! adds its force-wide pitch bonus once per round. The tally is signed toward
//! side A and stops early once its magnitude reaches the decisive threshold.
//! Pitch never changes unit status.

use std::cmp::Ordering;

use tracing::debug;

use crate::data::Axis;
use crate::dice::Dice;
use crate::error::Result;
use crate::events::{BattleEvent, Phase};
use crate::roster::Side;

use super::{die_value, Battlefield};

/// Outcome of one pitch invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PitchReport {
    /// Cumulative tally, positive favours side A.
    pub tally: i32,
    /// Side with the higher tally, `None` on an exact tie.
    pub winner: Option<Side>,
    /// The decisive threshold was reached.
    pub decisive: bool,
    /// Rounds fought.
    pub rounds: u32,
}

/// Resolve one pitch invocation for loop iteration `iteration`.
///
/// # Errors
///
/// Returns a configuration error for unknown rule keys.
pub fn run<D: Dice + ?Sized>(
    field: &mut Battlefield<'_>,
    dice: &mut D,
    iteration: u32,
) -> Result<PitchReport> {
    let mods = field.modifiers()?;
    let mut report = PitchReport::default();

    for round in 1..=field.config.pitch_rounds {
        let mut totals = [0i32; 2];
        let mut force_bonus = [0i32; 2];
        for side in Side::BOTH {
            let side_mods = mods.side(side);
            let ids = field.active_ids(side);
            if ids.is_empty() {
                continue;
            }
            force_bonus[side.index()] = side_mods.force.get(Axis::Pitch);
            let mut total = force_bonus[side.index()];
            for id in ids {
                let roll = field.roll(dice, side, Some(id));
                let bonus = side_mods.unit(id).get(Axis::Pitch);
                total += die_value(roll) + bonus;
                field.record(
                    Phase::Pitch,
                    Some(iteration),
                    BattleEvent::PitchRoll {
                        side,
                        unit: id,
                        round,
                        roll,
                        bonus,
                    },
                );
            }
            totals[side.index()] = total;
        }

        report.tally += totals[0] - totals[1];
        report.rounds = round;
        field.record(
            Phase::Pitch,
            Some(iteration),
            BattleEvent::PitchRound {
                round,
                force_bonus_a: force_bonus[0],
                force_bonus_b: force_bonus[1],
                total_a: totals[0],
                total_b: totals[1],
                running: report.tally,
            },
        );

        if report.tally.abs() >= field.config.decisive_threshold {
            report.decisive = true;
            break;
        }
    }

    report.winner = match report.tally.cmp(&0) {
        Ordering::Greater => Some(Side::A),
        Ordering::Less => Some(Side::B),
        Ordering::Equal => None,
    };

    debug!(
        iteration,
        tally = report.tally,
        winner = ?report.winner,
        decisive = report.decisive,
        "pitch resolved"
    );
    field.record(
        Phase::Pitch,
        Some(iteration),
        BattleEvent::PitchResolved {
            tally: report.tally,
            winner: report.winner,
            decisive: report.decisive,
            rounds: report.rounds,
        },
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{field, force_of};
    use super::*;
    use crate::config::EngineConfig;
    use crate::data::Ruleset;
    use crate::dice::ScriptedDice;
    use crate::roster::{Commander, UnitType};

    #[test]
    fn test_decisive_threshold_short_circuits() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        // Four Light (pitch 0) against one Light.
        let mut bf = field(
            &config,
            &rules,
            force_of(1, UnitType::Light, &[1, 2, 3, 4]),
            force_of(2, UnitType::Light, &[5]),
        );
        // +11 per round: +22 after round 2.
        let mut dice = ScriptedDice::new([3, 3, 3, 3, 1, 3, 3, 3, 3, 1, 6, 6, 6, 6, 1]);
        let report = run(&mut bf, &mut dice, 1).unwrap();
        assert_eq!(report.tally, 22);
        assert_eq!(report.rounds, 2);
        assert!(report.decisive);
        assert_eq!(report.winner, Some(Side::A));
        // Round 3 never drew.
        assert_eq!(dice.rolls_consumed(), 10);
    }

    #[test]
    fn test_three_rounds_without_decision() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let mut bf = field(
            &config,
            &rules,
            force_of(1, UnitType::Heavy, &[1]),
            force_of(2, UnitType::Heavy, &[2]),
        );
        let mut dice = ScriptedDice::new([4, 2, 1, 5, 3, 3]);
        let report = run(&mut bf, &mut dice, 1).unwrap();
        // (4-2) + (1-5) + (3-3) = -2
        assert_eq!(report.tally, -2);
        assert_eq!(report.rounds, 3);
        assert!(!report.decisive);
        assert_eq!(report.winner, Some(Side::B));
    }

    #[test]
    fn test_exact_tie_has_no_winner() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let mut bf = field(
            &config,
            &rules,
            force_of(1, UnitType::Cavalry, &[1]),
            force_of(2, UnitType::Cavalry, &[2]),
        );
        let mut dice = ScriptedDice::new([4]);
        let report = run(&mut bf, &mut dice, 1).unwrap();
        assert_eq!(report.tally, 0);
        assert_eq!(report.winner, None);
    }

    #[test]
    fn test_commander_level_added_once_per_round() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let a = force_of(1, UnitType::Light, &[1, 2])
            .with_commander(Commander::new(1, "Kutuzov", 3, "Wary"));
        let mut bf = field(&config, &rules, a, force_of(2, UnitType::Light, &[3, 4]));
        let mut dice = ScriptedDice::new([2]);
        let report = run(&mut bf, &mut dice, 1).unwrap();
        assert_eq!(report.tally, 9);
    }

    #[test]
    fn test_rounds_are_logged_with_iteration() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let mut bf = field(
            &config,
            &rules,
            force_of(1, UnitType::Heavy, &[1]),
            force_of(2, UnitType::Heavy, &[2]),
        );
        let mut dice = ScriptedDice::new([3]);
        run(&mut bf, &mut dice, 4).unwrap();
        let pitch_events: Vec<_> = bf.log().in_phase(Phase::Pitch).collect();
        // Two rolls and a round summary per round, then the resolution.
        assert_eq!(pitch_events.len(), 10);
        assert!(pitch_events.iter().all(|e| e.round == Some(4)));
    }

    #[test]
    fn test_logged_rolls_add_up_to_round_totals() {
        let config = EngineConfig::default();
        let rules = Ruleset::standard();
        let a = force_of(1, UnitType::Heavy, &[1, 2])
            .with_commander(Commander::new(1, "Kutuzov", 2, "Wary"));
        let b = force_of(2, UnitType::Light, &[3, 4, 5]);
        let mut bf = field(&config, &rules, a, b);
        let mut dice = ScriptedDice::new([1, 6, 2, 5, 3, 4, 2, 2, 6, 1]);
        run(&mut bf, &mut dice, 1).unwrap();

        let mut sums = [0i32; 2];
        let mut checked = 0;
        for event in bf.log().in_phase(Phase::Pitch) {
            match &event.event {
                BattleEvent::PitchRoll {
                    side, roll, bonus, ..
                } => sums[side.index()] += die_value(*roll) + bonus,
                BattleEvent::PitchRound {
                    force_bonus_a,
                    force_bonus_b,
                    total_a,
                    total_b,
                    ..
                } => {
                    assert_eq!(*force_bonus_a, 2);
                    assert_eq!(*force_bonus_b, 0);
                    assert_eq!(sums[0] + force_bonus_a, *total_a);
                    assert_eq!(sums[1] + force_bonus_b, *total_b);
                    sums = [0, 0];
                    checked += 1;
                }
                _ => {}
            }
        }
        assert!(checked > 0);
    }
}
