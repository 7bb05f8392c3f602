//! Skirmish phase: each side's best skirmishers strike before the main battle.
//!
//! Nominees are fixed at phase start. Side A's nominees attack first, then
//! side B's; a nominee routed in the meantime forfeits its attack. Every
//! pairing rolls one die for the attacker and one for the defender, and a
//! tie goes to the defender.
//!
//! Rout-immune units never rout here either: a beaten immune defender and an
//! immune attacker caught by counterfire stay active. Overrun still destroys.

use tracing::debug;

use crate::data::{Ability, Amount, Axis};
use crate::dice::Dice;
use crate::error::Result;
use crate::events::{BattleEvent, CounterfireOutcome, Phase, SkirmishOutcome};
use crate::modifiers::{ForceModifiers, PhaseModifiers};
use crate::roster::{Side, UnitId, UnitStatus};

use super::{die_value, Battlefield};

/// What the skirmish did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SkirmishReport {
    /// Side that declined to skirmish, if any.
    pub avoided_by: Option<Side>,
    /// Pairings fought.
    pub pairings: usize,
    /// Units routed, attackers that survived counterfire included.
    pub routed: usize,
    /// Units destroyed by overrun or after counterfire.
    pub destroyed: usize,
    /// Routs prevented by rout immunity.
    pub overrides: usize,
}

/// Resolve the skirmish.
///
/// # Errors
///
/// Returns a configuration error for unknown rule keys or an invariant
/// violation if a status would move backwards.
pub fn run<D: Dice + ?Sized>(field: &mut Battlefield<'_>, dice: &mut D) -> Result<SkirmishReport> {
    let mods = field.modifiers()?;
    let mut report = SkirmishReport::default();

    if let Some(side) = Side::BOTH
        .into_iter()
        .find(|&s| mods.side(s).force.has(Ability::AvoidSkirmish))
    {
        debug!(?side, "skirmish avoided");
        field.record(Phase::Skirmish, None, BattleEvent::SkirmishAvoided { side });
        report.avoided_by = Some(side);
        return Ok(report);
    }

    let nominees = Side::BOTH.map(|side| nominate(field, &mods, side));
    for side in Side::BOTH {
        field.record(
            Phase::Skirmish,
            None,
            BattleEvent::SkirmishNominated {
                side,
                units: nominees[side.index()].clone(),
            },
        );
    }

    for side in Side::BOTH {
        let bold_bonus = bold_bonus(field, &mods, side);
        for (slot, &attacker) in nominees[side.index()].iter().enumerate() {
            if !field.is_active(side, attacker) {
                field.record(
                    Phase::Skirmish,
                    None,
                    BattleEvent::SkirmishForfeited { side, unit: attacker },
                );
                continue;
            }
            let Some(defender) = pick_target(field, &mods, side, attacker, dice) else {
                break;
            };
            let extra = if slot == 0 { bold_bonus } else { 0 };
            fight(field, &mods, dice, side, attacker, defender, extra, &mut report)?;
        }
    }

    debug!(
        pairings = report.pairings,
        routed = report.routed,
        destroyed = report.destroyed,
        "skirmish resolved"
    );
    Ok(report)
}

/// Top skirmishers of a side, highest skirmish bonus first, ties by id.
fn nominate(field: &Battlefield<'_>, mods: &PhaseModifiers, side: Side) -> Vec<UnitId> {
    let side_mods = mods.side(side);
    let mut ranked: Vec<(i32, UnitId)> = field
        .active_ids(side)
        .into_iter()
        .map(|id| (side_mods.combined(id).get(Axis::Skirmish), id))
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    ranked
        .into_iter()
        .take(field.config.skirmishers_per_side)
        .map(|(_, id)| id)
        .collect()
}

fn bold_bonus(field: &Battlefield<'_>, mods: &PhaseModifiers, side: Side) -> i32 {
    if !mods.side(side).force.has(Ability::BoldSkirmisher) {
        return 0;
    }
    let level = field.force(side).commander.as_ref().map(|c| c.level);
    Amount::HalfCommanderLevelRoundedUp.value(level)
}

fn pick_target<D: Dice + ?Sized>(
    field: &Battlefield<'_>,
    mods: &PhaseModifiers,
    side: Side,
    attacker: UnitId,
    dice: &mut D,
) -> Option<UnitId> {
    let enemy = side.opponent();
    let targets = field.active_ids(enemy);
    if targets.is_empty() {
        return None;
    }
    if mods.side(side).unit_has(attacker, Ability::ChooseTarget) {
        let enemy_mods = mods.side(enemy);
        return targets
            .into_iter()
            .min_by_key(|&id| (enemy_mods.combined(id).get(Axis::Defense), id));
    }
    targets.get(dice.pick(targets.len())).copied()
}

#[allow(clippy::too_many_arguments)]
fn fight<D: Dice + ?Sized>(
    field: &mut Battlefield<'_>,
    mods: &PhaseModifiers,
    dice: &mut D,
    side: Side,
    attacker: UnitId,
    defender: UnitId,
    extra: i32,
    report: &mut SkirmishReport,
) -> Result<()> {
    let enemy = side.opponent();
    let attacker_mods = mods.side(side);
    let defender_mods = mods.side(enemy);

    let attacker_roll = field.roll(dice, side, Some(attacker));
    let defender_roll = field.roll(dice, enemy, Some(defender));
    let attacker_bonus = attacker_mods.combined(attacker).get(Axis::Skirmish) + extra;
    let defender_bonus = defender_mods.combined(defender).get(Axis::Defense);
    let margin = (die_value(attacker_roll) + attacker_bonus)
        - (die_value(defender_roll) + defender_bonus);

    let mut counterfire = None;
    let outcome = if margin <= 0 {
        if defender_mods.unit_has(defender, Ability::Counterfire) {
            counterfire = Some(fire_back(field, attacker_mods, dice, side, attacker, report)?);
        }
        SkirmishOutcome::Held
    } else if margin >= field.config.overrun_margin
        || attacker_mods.unit_has(attacker, Ability::AutoOverrun)
    {
        field.set_status(enemy, defender, UnitStatus::Destroyed)?;
        report.destroyed += 1;
        SkirmishOutcome::Overrun
    } else if defender_mods.unit_has(defender, Ability::RoutImmune) {
        debug!(side = ?enemy, unit = %defender, margin, "rout immunity override");
        report.overrides += 1;
        SkirmishOutcome::ImmunityOverride
    } else {
        field.set_status(enemy, defender, UnitStatus::Routed)?;
        report.routed += 1;
        SkirmishOutcome::Routed
    };
    report.pairings += 1;

    debug!(%attacker, %defender, margin, ?outcome, "skirmish pairing");
    field.record(
        Phase::Skirmish,
        None,
        BattleEvent::SkirmishPairing {
            side,
            attacker,
            defender,
            attacker_roll,
            attacker_bonus,
            defender_roll,
            defender_bonus,
            margin,
            outcome,
            counterfire,
        },
    );
    Ok(())
}

/// Counterfire against a repulsed attacker: rout, then a destruction roll.
fn fire_back<D: Dice + ?Sized>(
    field: &mut Battlefield<'_>,
    attacker_mods: &ForceModifiers,
    dice: &mut D,
    side: Side,
    attacker: UnitId,
    report: &mut SkirmishReport,
) -> Result<CounterfireOutcome> {
    if attacker_mods.unit_has(attacker, Ability::RoutImmune) {
        debug!(?side, unit = %attacker, "rout immunity override");
        report.overrides += 1;
        return Ok(CounterfireOutcome::ImmunityOverride);
    }

    field.set_status(side, attacker, UnitStatus::Routed)?;
    let destroy_at_or_below = field.config.casualty_destroy_at_or_below;
    let roll = field.roll(dice, side, Some(attacker));
    if roll <= destroy_at_or_below {
        field.set_status(side, attacker, UnitStatus::Destroyed)?;
        report.destroyed += 1;
        Ok(CounterfireOutcome::Destroyed {
            roll,
            destroy_at_or_below,
        })
    } else {
        report.routed += 1;
        Ok(CounterfireOutcome::Routed {
            roll,
            destroy_at_or_below,
        })
    }
}
