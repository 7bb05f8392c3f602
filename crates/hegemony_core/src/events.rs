//! Flat, ordered event log of an engagement.
//!
//! Each event carries the rolls and totals behind it, so a caller can render
//! a narrative report without re-deriving any resolution logic.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::roster::{ForceId, Side, UnitId, UnitStatus};

/// Engagement phase an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Input checks and setup.
    Init,
    /// Opening skirmishes.
    Skirmish,
    /// Main line battle.
    Pitch,
    /// Morale checks.
    Rally,
    /// Casualties and commander fates.
    ActionReport,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Init => "init",
            Phase::Skirmish => "skirmish",
            Phase::Pitch => "pitch",
            Phase::Rally => "rally",
            Phase::ActionReport => "action report",
        };
        f.write_str(name)
    }
}

/// Result of one skirmish pairing for the defender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkirmishOutcome {
    /// Defender held, tie included.
    Held,
    /// Defender routed.
    Routed,
    /// Defender destroyed outright.
    Overrun,
    /// Defender lost but cannot rout.
    ImmunityOverride,
}

/// What a defender's counterfire did to the attacker it repulsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CounterfireOutcome {
    /// Attacker routed and survived its destruction roll.
    Routed {
        /// Destruction die.
        roll: u32,
        /// Rolls at or below this destroy.
        destroy_at_or_below: u32,
    },
    /// Attacker routed and failed its destruction roll.
    Destroyed {
        /// Destruction die.
        roll: u32,
        /// Rolls at or below this destroy.
        destroy_at_or_below: u32,
    },
    /// Attacker cannot rout; no destruction roll.
    ImmunityOverride,
}

/// Result of one unit's rally check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RallyOutcome {
    /// Met the threshold.
    Held,
    /// Fell short and routed.
    Routed,
    /// Fell short but cannot rout.
    ImmunityOverride,
}

/// Commander fate after the engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CommanderOutcome {
    /// Nothing happened.
    #[default]
    None,
    /// Taken by the enemy.
    Captured,
    /// Gained a level.
    Promoted {
        /// Level before.
        from: u8,
        /// Level after.
        to: u8,
    },
}

/// Why the engagement ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConclusionReason {
    /// One side had no active units left.
    Rout,
    /// Both sides broke; the last pitch decided it.
    MutualRout,
    /// A decisive pitch ended the fighting.
    DecisivePitch,
    /// The loop cap was reached; the last pitch decided it.
    LoopCap,
}

/// One thing that happened.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleEvent {
    /// Inputs accepted.
    EngagementStarted {
        /// Force on side A.
        force_a: ForceId,
        /// Force on side B.
        force_b: ForceId,
        /// Active units on side A.
        units_a: usize,
        /// Active units on side B.
        units_b: usize,
    },
    /// An enemy bombardment cancelled one unit's garrison benefits.
    GarrisonShelled {
        /// Side that lost the benefit.
        side: Side,
        /// The shelled unit.
        unit: UnitId,
    },
    /// Skirmishers picked for a side.
    SkirmishNominated {
        /// Nominating side.
        side: Side,
        /// Nominees in attack order.
        units: Vec<UnitId>,
    },
    /// A side declined the skirmish.
    SkirmishAvoided {
        /// Side that avoided it.
        side: Side,
    },
    /// A nominee was no longer active when its turn came.
    SkirmishForfeited {
        /// Side of the nominee.
        side: Side,
        /// The nominee.
        unit: UnitId,
    },
    /// One skirmish pairing.
    SkirmishPairing {
        /// Attacking side.
        side: Side,
        /// Attacking unit.
        attacker: UnitId,
        /// Defending unit.
        defender: UnitId,
        /// Attacker die.
        attacker_roll: u32,
        /// Attacker skirmish bonus.
        attacker_bonus: i32,
        /// Defender die.
        defender_roll: u32,
        /// Defender defense bonus.
        defender_bonus: i32,
        /// Attacker total minus defender total.
        margin: i32,
        /// What happened to the defender.
        outcome: SkirmishOutcome,
        /// The defender held and fired back.
        counterfire: Option<CounterfireOutcome>,
    },
    /// One unit's pitch die.
    PitchRoll {
        /// Unit's side.
        side: Side,
        /// The unit.
        unit: UnitId,
        /// Round within the invocation, from 1.
        round: u32,
        /// Die.
        roll: u32,
        /// The unit's pitch bonus.
        bonus: i32,
    },
    /// One pitch round.
    PitchRound {
        /// Round within the invocation, from 1.
        round: u32,
        /// Side A force-wide bonus, zero when the side had no active units.
        force_bonus_a: i32,
        /// Side B force-wide bonus.
        force_bonus_b: i32,
        /// Side A total.
        total_a: i32,
        /// Side B total.
        total_b: i32,
        /// Running tally after the round, signed toward side A.
        running: i32,
    },
    /// End of a pitch invocation.
    PitchResolved {
        /// Final tally.
        tally: i32,
        /// Winning side, `None` on a tie.
        winner: Option<Side>,
        /// Ended early on the decisive threshold.
        decisive: bool,
        /// Rounds actually fought.
        rounds: u32,
    },
    /// One unit's rally check.
    RallyCheck {
        /// Unit's side.
        side: Side,
        /// The unit.
        unit: UnitId,
        /// Final die.
        roll: u32,
        /// Bonus added to the die.
        bonus: i32,
        /// First die when a reroll was used.
        rerolled_from: Option<u32>,
        /// Outcome.
        outcome: RallyOutcome,
    },
    /// End of a rally invocation.
    RallyResolved {
        /// Active units left on side A.
        active_a: usize,
        /// Active units left on side B.
        active_b: usize,
    },
    /// The pitch/rally loop hit its cap.
    LoopCapReached {
        /// Iterations run.
        loops: u32,
    },
    /// One unit's casualty roll.
    CasualtyCheck {
        /// Unit's side.
        side: Side,
        /// The unit.
        unit: UnitId,
        /// Final die.
        roll: u32,
        /// Rolls at or below this destroy.
        destroy_at_or_below: u32,
        /// First die when a reroll was used.
        rerolled_from: Option<u32>,
        /// Status after the roll.
        status: UnitStatus,
    },
    /// One commander's fate roll.
    CommanderCheck {
        /// Commander's side.
        side: Side,
        /// Final die.
        roll: u32,
        /// First die when a reroll was used.
        rerolled_from: Option<u32>,
        /// Outcome.
        outcome: CommanderOutcome,
    },
    /// Final verdict.
    EngagementConcluded {
        /// Winning side, `None` for a draw.
        winner: Option<Side>,
        /// How it ended.
        reason: ConclusionReason,
    },
}

/// An event with its position in the engagement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoggedEvent {
    /// Zero-based position in the log.
    pub seq: u32,
    /// Phase that produced it.
    pub phase: Phase,
    /// Pitch/rally loop iteration, from 1, for pitch and rally events.
    pub round: Option<u32>,
    /// The event.
    pub event: BattleEvent,
}

/// Append-only event log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<LoggedEvent>,
}

impl EventLog {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&mut self, phase: Phase, round: Option<u32>, event: BattleEvent) {
        let seq = u32::try_from(self.events.len()).unwrap_or(u32::MAX);
        self.events.push(LoggedEvent {
            seq,
            phase,
            round,
            event,
        });
    }

    /// Events in order.
    #[must_use]
    pub fn events(&self) -> &[LoggedEvent] {
        &self.events
    }

    /// Events of one phase.
    pub fn in_phase(&self, phase: Phase) -> impl Iterator<Item = &LoggedEvent> {
        self.events.iter().filter(move |e| e.phase == phase)
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing has been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Take the events out.
    #[must_use]
    pub fn into_events(self) -> Vec<LoggedEvent> {
        self.events
    }
}
