//! Battle orchestrator.
//!
//! Drives `Init -> Skirmish -> PitchRally(loop) -> ActionReport -> Done`.
//! All input checks run at `Init`, before any phase touches a force, so an
//! invalid call never exposes partial state. Running a phase out of order is
//! an [`EngineError::InvariantViolation`].

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::data::Ruleset;
use crate::dice::{Dice, SeededDice};
use crate::error::{ConfigurationError, EngineError, Result};
use crate::events::{BattleEvent, CommanderOutcome, ConclusionReason, LoggedEvent, Phase};
use crate::modifiers::ModifierResolver;
use crate::phases::{self, Battlefield};
use crate::roster::{
    CommanderId, EngagementContext, Force, ForceId, Side, UnitId, UnitStatus, UnitType,
};

/// Everything needed to resolve one engagement.
///
/// # Example RON
///
/// ```ron
/// EngagementSetup(
///     force_a: (id: 1, units: [(id: 1, unit_type: Cavalry)]),
///     force_b: (id: 2, units: [(id: 2, unit_type: Heavy, upgrades: ["Sentry Team"])]),
///     context: (holy_war: false),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementSetup {
    /// First force; pitch tallies are signed toward it.
    pub force_a: Force,
    /// Second force.
    pub force_b: Force,
    /// Flags shared by both sides.
    #[serde(default)]
    pub context: EngagementContext,
}

impl EngagementSetup {
    /// Pair two forces with a neutral context.
    #[must_use]
    pub fn new(force_a: Force, force_b: Force) -> Self {
        Self {
            force_a,
            force_b,
            context: EngagementContext::default(),
        }
    }

    /// Set the shared context.
    #[must_use]
    pub fn with_context(mut self, context: EngagementContext) -> Self {
        self.context = context;
        self
    }

    /// The force on a side.
    #[must_use]
    pub fn force(&self, side: Side) -> &Force {
        match side {
            Side::A => &self.force_a,
            Side::B => &self.force_b,
        }
    }

    /// The same engagement with the sides exchanged.
    #[must_use]
    pub fn swapped(&self) -> Self {
        Self {
            force_a: self.force_b.clone(),
            force_b: self.force_a.clone(),
            context: self.context,
        }
    }
}

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleState {
    /// Inputs accepted, nothing resolved yet.
    Init,
    /// Skirmish is next.
    Skirmish,
    /// Pitch/rally iteration `iteration` (from 1) is next.
    PitchRally {
        /// Next iteration.
        iteration: u32,
    },
    /// The engagement is decided; casualties are next.
    ActionReport,
    /// Finished.
    Done,
}

/// Final status of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitReport {
    /// Owning side.
    pub side: Side,
    /// The unit.
    pub unit: UnitId,
    /// Its type.
    pub unit_type: UnitType,
    /// Status on entry.
    pub initial: UnitStatus,
    /// Status at the end.
    pub status: UnitStatus,
}

/// Outcome for one commander.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommanderReport {
    /// Commanded side.
    pub side: Side,
    /// The commander.
    pub commander: CommanderId,
    /// Name for reports.
    pub name: String,
    /// Level after the engagement.
    pub level: u8,
    /// What happened.
    pub outcome: CommanderOutcome,
}

/// Terminal output of an engagement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngagementResult {
    /// Forces in side order.
    pub forces: [ForceId; 2],
    /// Winning side, `None` for a draw.
    pub winning_side: Option<Side>,
    /// Winning force, `None` for a draw.
    pub winner: Option<ForceId>,
    /// How the engagement was decided.
    pub reason: ConclusionReason,
    /// Pitch/rally iterations fought.
    pub pitch_loops: u32,
    /// Every unit, side A first, in deployment order.
    pub units: Vec<UnitReport>,
    /// One entry per side with a commander.
    pub commanders: Vec<CommanderReport>,
    /// Ordered event log.
    pub events: Vec<LoggedEvent>,
}

impl EngagementResult {
    /// Whether nobody won.
    #[must_use]
    pub const fn is_draw(&self) -> bool {
        self.winning_side.is_none()
    }

    /// Final report for a unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&UnitReport> {
        self.units.iter().find(|u| u.unit == id)
    }

    /// Commander outcome for a side.
    #[must_use]
    pub fn commander(&self, side: Side) -> Option<&CommanderReport> {
        self.commanders.iter().find(|c| c.side == side)
    }

    /// Units of a side that ended with `status`.
    #[must_use]
    pub fn count(&self, side: Side, status: UnitStatus) -> usize {
        self.units
            .iter()
            .filter(|u| u.side == side && u.status == status)
            .count()
    }

    /// Hash of the complete result, events included.
    ///
    /// Two runs of the same engagement with the same dice have equal digests.
    #[must_use]
    pub fn digest(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// Resolves engagements under one config and ruleset.
///
/// Holds no per-engagement state, so one engine can be shared across
/// threads; each call brings its own dice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleEngine {
    config: EngineConfig,
    ruleset: Ruleset,
}

impl Default for BattleEngine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            ruleset: Ruleset::standard(),
        }
    }
}

impl BattleEngine {
    /// Create an engine, checking both inputs.
    ///
    /// # Errors
    ///
    /// Returns the first config or ruleset problem.
    pub fn new(config: EngineConfig, ruleset: Ruleset) -> Result<Self> {
        config.validate()?;
        ruleset.validate()?;
        Ok(Self { config, ruleset })
    }

    /// Tuning constants in use.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Rules in use.
    #[must_use]
    pub const fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    /// Check a setup without resolving it.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] found.
    pub fn validate(&self, setup: &EngagementSetup) -> Result<()> {
        let resolver = ModifierResolver::new(&self.ruleset);
        let mut seen = BTreeSet::new();
        for side in Side::BOTH {
            let force = setup.force(side);
            if force.deployable_count() == 0 {
                return Err(ConfigurationError::EmptyForce(side).into());
            }
            for unit in &force.units {
                if !seen.insert(unit.id) {
                    return Err(ConfigurationError::DuplicateUnitId(unit.id).into());
                }
                resolver.validate_unit(unit)?;
            }
            if let Some(commander) = &force.commander {
                self.ruleset.trait_def(commander.trait_key.as_str())?;
                let max = self.config.max_commander_level;
                if commander.level == 0 || commander.level > max {
                    return Err(ConfigurationError::InvalidCommanderLevel {
                        level: commander.level,
                        max,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Start a step-by-step engagement.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] for invalid input; `setup` is never
    /// modified.
    pub fn begin(&self, setup: &EngagementSetup) -> Result<Battle<'_>> {
        self.validate(setup)?;
        Ok(Battle::new(self, setup))
    }

    /// Resolve an engagement to completion with the given dice.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] for invalid input, rejected before
    /// any phase runs, or an [`EngineError::InvariantViolation`] on an
    /// internal fault.
    pub fn resolve<D: Dice + ?Sized>(
        &self,
        setup: &EngagementSetup,
        dice: &mut D,
    ) -> Result<EngagementResult> {
        let mut battle = self.begin(setup)?;
        while battle.state() != BattleState::Done {
            battle.step(dice)?;
        }
        battle.finish()
    }

    /// Resolve with [`SeededDice`] from `seed`.
    ///
    /// # Errors
    ///
    /// See [`BattleEngine::resolve`].
    pub fn resolve_seeded(&self, setup: &EngagementSetup, seed: u64) -> Result<EngagementResult> {
        self.resolve(setup, &mut SeededDice::new(seed))
    }
}

/// One engagement in progress.
#[derive(Debug, Clone)]
pub struct Battle<'e> {
    field: Battlefield<'e>,
    state: BattleState,
    initial: Vec<(Side, UnitId, UnitStatus)>,
    last_pitch: Option<Side>,
    verdict: Option<(Option<Side>, ConclusionReason)>,
    pitch_loops: u32,
    commanders: [CommanderOutcome; 2],
}

impl<'e> Battle<'e> {
    fn new(engine: &'e BattleEngine, setup: &EngagementSetup) -> Self {
        let forces = [setup.force_a.clone(), setup.force_b.clone()];
        let initial = Side::BOTH
            .into_iter()
            .flat_map(|side| {
                forces[side.index()]
                    .units
                    .iter()
                    .map(move |u| (side, u.id, u.status()))
            })
            .collect();
        let mut field = Battlefield::new(
            &engine.config,
            ModifierResolver::new(&engine.ruleset),
            setup.context,
            forces,
        );
        field.record(
            Phase::Init,
            None,
            BattleEvent::EngagementStarted {
                force_a: setup.force_a.id,
                force_b: setup.force_b.id,
                units_a: setup.force_a.active_count(),
                units_b: setup.force_b.active_count(),
            },
        );
        Self {
            field,
            state: BattleState::Init,
            initial,
            last_pitch: None,
            verdict: None,
            pitch_loops: 0,
            commanders: [CommanderOutcome::None; 2],
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> BattleState {
        self.state
    }

    /// Shared phase state, for inspection between steps.
    #[must_use]
    pub const fn field(&self) -> &Battlefield<'e> {
        &self.field
    }

    /// Advance by one state. Leaving `Init` resolves the opening
    /// bombardment.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation when called after `Done`, or whatever
    /// the phase run returns.
    pub fn step<D: Dice + ?Sized>(&mut self, dice: &mut D) -> Result<BattleState> {
        match self.state {
            BattleState::Init => {
                phases::bombardment::run(&mut self.field, dice)?;
                debug!("entering skirmish");
                self.state = BattleState::Skirmish;
            }
            BattleState::Skirmish => self.skirmish(dice)?,
            BattleState::PitchRally { .. } => self.pitch_rally(dice)?,
            BattleState::ActionReport => self.action_report(dice)?,
            BattleState::Done => {
                return Err(EngineError::InvariantViolation(
                    "engagement already finished".to_string(),
                ))
            }
        }
        Ok(self.state)
    }

    /// Run the skirmish.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation unless the state is `Skirmish`.
    pub fn skirmish<D: Dice + ?Sized>(&mut self, dice: &mut D) -> Result<()> {
        self.expect(BattleState::Skirmish, Phase::Skirmish)?;
        let before = self.statuses();
        phases::skirmish::run(&mut self.field, dice)?;
        self.check_monotonic(&before)?;

        self.state = match self.rout_verdict(None) {
            Some(verdict) => self.conclude(verdict),
            None => BattleState::PitchRally { iteration: 1 },
        };
        Ok(())
    }

    /// Run one pitch and, unless it ends the engagement, one rally.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation unless the state is `PitchRally`.
    pub fn pitch_rally<D: Dice + ?Sized>(&mut self, dice: &mut D) -> Result<()> {
        let BattleState::PitchRally { iteration } = self.state else {
            return Err(self.out_of_order(Phase::Pitch));
        };
        let before = self.statuses();
        self.pitch_loops = iteration;

        let pitch = phases::pitch::run(&mut self.field, dice, iteration)?;
        self.last_pitch = pitch.winner;
        if pitch.decisive && self.field.config.decisive_ends_engagement {
            if let Some(winner) = pitch.winner {
                self.state = self.conclude((Some(winner), ConclusionReason::DecisivePitch));
                return Ok(());
            }
        }

        phases::rally::run(&mut self.field, dice, pitch.winner, iteration)?;
        self.check_monotonic(&before)?;

        self.state = if let Some(verdict) = self.rout_verdict(self.last_pitch) {
            self.conclude(verdict)
        } else if iteration >= self.field.config.max_pitch_rally_loops {
            self.field.record(
                Phase::Rally,
                Some(iteration),
                BattleEvent::LoopCapReached { loops: iteration },
            );
            self.conclude((self.last_pitch, ConclusionReason::LoopCap))
        } else {
            BattleState::PitchRally {
                iteration: iteration + 1,
            }
        };
        Ok(())
    }

    /// Resolve casualties and commanders.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation unless the state is `ActionReport`.
    pub fn action_report<D: Dice + ?Sized>(&mut self, dice: &mut D) -> Result<()> {
        self.expect(BattleState::ActionReport, Phase::ActionReport)?;
        let winner = self.verdict.and_then(|(w, _)| w);
        let before = self.statuses();
        let summary = phases::action_report::run(&mut self.field, dice, winner)?;
        self.check_monotonic(&before)?;
        self.commanders = summary.commanders;
        self.state = BattleState::Done;
        Ok(())
    }

    /// Package the result.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation unless the state is `Done`.
    pub fn finish(self) -> Result<EngagementResult> {
        if self.state != BattleState::Done {
            return Err(EngineError::InvariantViolation(format!(
                "result requested in state {:?}",
                self.state
            )));
        }
        let (winning_side, reason) = self.verdict.ok_or_else(|| {
            EngineError::InvariantViolation("finished without a verdict".to_string())
        })?;
        let (forces, log) = self.field.into_parts();

        let units = self
            .initial
            .iter()
            .filter_map(|&(side, id, initial)| {
                forces[side.index()].unit(id).map(|u| UnitReport {
                    side,
                    unit: id,
                    unit_type: u.unit_type,
                    initial,
                    status: u.status(),
                })
            })
            .collect();
        let commanders = Side::BOTH
            .into_iter()
            .filter_map(|side| {
                forces[side.index()]
                    .commander
                    .as_ref()
                    .map(|c| CommanderReport {
                        side,
                        commander: c.id,
                        name: c.name.clone(),
                        level: c.level,
                        outcome: self.commanders[side.index()],
                    })
            })
            .collect();

        Ok(EngagementResult {
            forces: [forces[0].id, forces[1].id],
            winning_side,
            winner: winning_side.map(|s| forces[s.index()].id),
            reason,
            pitch_loops: self.pitch_loops,
            units,
            commanders,
            events: log.into_events(),
        })
    }

    fn expect(&self, state: BattleState, phase: Phase) -> Result<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(self.out_of_order(phase))
        }
    }

    fn out_of_order(&self, phase: Phase) -> EngineError {
        EngineError::InvariantViolation(format!("{phase} invoked in state {:?}", self.state))
    }

    /// Verdict when a side has run out of active units.
    fn rout_verdict(&self, tiebreak: Option<Side>) -> Option<(Option<Side>, ConclusionReason)> {
        let active = Side::BOTH.map(|s| self.field.active_count(s));
        match active {
            [0, 0] => Some((tiebreak, ConclusionReason::MutualRout)),
            [0, _] => Some((Some(Side::B), ConclusionReason::Rout)),
            [_, 0] => Some((Some(Side::A), ConclusionReason::Rout)),
            _ => None,
        }
    }

    fn conclude(&mut self, verdict: (Option<Side>, ConclusionReason)) -> BattleState {
        let (winner, reason) = verdict;
        info!(?winner, ?reason, loops = self.pitch_loops, "engagement concluded");
        self.field.record(
            Phase::ActionReport,
            None,
            BattleEvent::EngagementConcluded { winner, reason },
        );
        self.verdict = Some(verdict);
        BattleState::ActionReport
    }

    fn statuses(&self) -> Vec<UnitStatus> {
        self.field
            .forces()
            .iter()
            .flat_map(|f| f.units.iter().map(crate::roster::Unit::status))
            .collect()
    }

    #[cfg(feature = "debug-validation")]
    fn check_monotonic(&self, before: &[UnitStatus]) -> Result<()> {
        for (old, new) in before.iter().zip(self.statuses()) {
            if !old.can_become(new) {
                return Err(EngineError::InvariantViolation(format!(
                    "status regressed from {old:?} to {new:?}"
                )));
            }
        }
        Ok(())
    }

    #[cfg(not(feature = "debug-validation"))]
    #[allow(clippy::unused_self, clippy::unnecessary_wraps)]
    fn check_monotonic(&self, _before: &[UnitStatus]) -> Result<()> {
        Ok(())
    }
}
