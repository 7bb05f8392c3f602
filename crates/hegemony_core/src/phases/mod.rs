//! Phase engines.
//!
//! Each phase is a free function over a [`Battlefield`]: it resolves fresh
//! modifier bundles at its start, draws from the injected dice, writes unit
//! statuses back into the forces and appends to the event log. Phases never
//! call each other; sequencing belongs to [`crate::battle`].

pub mod action_report;
pub mod bombardment;
pub mod pitch;
pub mod rally;
pub mod skirmish;

pub use action_report::ActionReportSummary;
pub use bombardment::BombardmentReport;
pub use pitch::PitchReport;
pub use rally::RallyReport;
pub use skirmish::SkirmishReport;

use std::collections::BTreeSet;

use tracing::trace;

use crate::config::EngineConfig;
use crate::dice::Dice;
use crate::error::{EngineError, Result};
use crate::events::{BattleEvent, EventLog, Phase};
use crate::modifiers::{ModifierResolver, PhaseModifiers};
use crate::roster::{EngagementContext, Force, Side, UnitId, UnitStatus};

/// Mutable state shared by the phases of one engagement.
#[derive(Debug, Clone)]
pub struct Battlefield<'r> {
    /// Tuning constants.
    pub config: &'r EngineConfig,
    /// Rule lookup.
    pub resolver: ModifierResolver<'r>,
    /// Flags shared by both sides.
    pub engagement: EngagementContext,
    forces: [Force; 2],
    shelled: BTreeSet<UnitId>,
    log: EventLog,
}

impl<'r> Battlefield<'r> {
    /// Take ownership of both forces for one engagement.
    #[must_use]
    pub fn new(
        config: &'r EngineConfig,
        resolver: ModifierResolver<'r>,
        engagement: EngagementContext,
        forces: [Force; 2],
    ) -> Self {
        Self {
            config,
            resolver,
            engagement,
            forces,
            shelled: BTreeSet::new(),
            log: EventLog::new(),
        }
    }

    /// A side's force.
    #[must_use]
    pub fn force(&self, side: Side) -> &Force {
        &self.forces[side.index()]
    }

    /// Both forces, side A first.
    #[must_use]
    pub const fn forces(&self) -> &[Force; 2] {
        &self.forces
    }

    /// Active units on a side.
    #[must_use]
    pub fn active_count(&self, side: Side) -> usize {
        self.force(side).active_count()
    }

    /// Active unit ids of a side in id order.
    #[must_use]
    pub fn active_ids(&self, side: Side) -> Vec<UnitId> {
        let mut ids: Vec<UnitId> = self.force(side).active_units().map(|u| u.id).collect();
        ids.sort_unstable();
        ids
    }

    /// Whether a unit is still fighting.
    #[must_use]
    pub fn is_active(&self, side: Side, unit: UnitId) -> bool {
        self.force(side).unit(unit).is_some_and(|u| u.is_active())
    }

    /// Units whose garrison benefits were shelled away.
    #[must_use]
    pub const fn shelled(&self) -> &BTreeSet<UnitId> {
        &self.shelled
    }

    /// Cancel one unit's garrison benefits for the rest of the engagement.
    pub(crate) fn shell(&mut self, unit: UnitId) {
        self.shelled.insert(unit);
    }

    /// Bundles for both sides as they stand now.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown rule keys.
    pub fn modifiers(&self) -> Result<PhaseModifiers> {
        PhaseModifiers::resolve(&self.resolver, &self.forces, self.engagement, &self.shelled)
    }

    /// Move a unit forward to `status`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvariantViolation`] for an unknown unit or a
    /// backward transition.
    pub fn set_status(&mut self, side: Side, unit: UnitId, status: UnitStatus) -> Result<()> {
        let target = self.forces[side.index()].unit_mut(unit).ok_or_else(|| {
            EngineError::InvariantViolation(format!("unit {unit} is not on side {side:?}"))
        })?;
        target.set_status(status)
    }

    /// Set a commander's level after promotion.
    pub(crate) fn set_commander_level(&mut self, side: Side, level: u8) {
        if let Some(commander) = self.forces[side.index()].commander.as_mut() {
            commander.level = level;
        }
    }

    /// Roll one die of the configured size.
    pub fn roll<D: Dice + ?Sized>(&self, dice: &mut D, side: Side, unit: Option<UnitId>) -> u32 {
        let roll = dice.roll(self.config.die_sides);
        trace!(?side, ?unit, roll, "die rolled");
        roll
    }

    /// Append an event.
    pub fn record(&mut self, phase: Phase, round: Option<u32>, event: BattleEvent) {
        self.log.push(phase, round, event);
    }

    /// The log so far.
    #[must_use]
    pub const fn log(&self) -> &EventLog {
        &self.log
    }

    /// Hand back the forces and the log.
    #[must_use]
    pub fn into_parts(self) -> ([Force; 2], EventLog) {
        (self.forces, self.log)
    }
}

/// Die value as a signed total component.
pub(crate) fn die_value(roll: u32) -> i32 {
    i32::try_from(roll).unwrap_or(i32::MAX)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::data::Ruleset;
    use crate::roster::{Unit, UnitType};

    pub fn field<'r>(
        config: &'r EngineConfig,
        ruleset: &'r Ruleset,
        a: Force,
        b: Force,
    ) -> Battlefield<'r> {
        Battlefield::new(
            config,
            ModifierResolver::new(ruleset),
            EngagementContext::default(),
            [a, b],
        )
    }

    pub fn force_of(id: u32, unit_type: UnitType, ids: &[u32]) -> Force {
        ids.iter()
            .fold(Force::new(id), |f, &uid| f.with_unit(Unit::new(uid, unit_type)))
    }

    pub fn status(field: &Battlefield<'_>, side: Side, unit: u32) -> UnitStatus {
        field
            .force(side)
            .unit(UnitId(unit))
            .map(crate::roster::Unit::status)
            .unwrap_or_default()
    }
}
