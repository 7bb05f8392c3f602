//! # Hegemony Core
//!
//! Deterministic engagement resolution for the Hegemony strategy game.
//!
//! This crate contains **only** resolution logic:
//! - No rendering
//! - No IO (apart from explicit record save/load)
//! - No global randomness
//!
//! Given two forces, an engagement context and a source of dice, the engine
//! resolves Skirmish, a bounded Pitch/Rally loop, and the Action Report, and
//! returns an [`EngagementResult`](battle::EngagementResult) with a complete
//! event log. The same inputs and seed always give the same result.
//!
//! ## Crate Structure
//!
//! - [`dice`] - Injectable, seedable dice
//! - [`roster`] - Forces, units and commanders
//! - [`data`] - Declarative rule data (unit types, upgrades, traits)
//! - [`modifiers`] - Modifier resolution into per-axis bundles
//! - [`phases`] - The four phase engines
//! - [`battle`] - Orchestrator state machine and result
//! - [`events`] - Structured event log
//! - [`replay`] - Engagement records

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod battle;
pub mod config;
pub mod data;
pub mod dice;
pub mod error;
pub mod events;
pub mod modifiers;
pub mod phases;
pub mod replay;
pub mod roster;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::battle::{
        BattleEngine, BattleState, CommanderReport, EngagementResult, EngagementSetup, UnitReport,
    };
    pub use crate::config::EngineConfig;
    pub use crate::data::{Ability, Axis, Ruleset};
    pub use crate::dice::{Dice, ScriptedDice, SeededDice};
    pub use crate::error::{ConfigurationError, EngineError, Result};
    pub use crate::events::{
        BattleEvent, CommanderOutcome, ConclusionReason, CounterfireOutcome, LoggedEvent, Phase,
        RallyOutcome, SkirmishOutcome,
    };
    pub use crate::modifiers::{ModifierBundle, ModifierResolver};
    pub use crate::replay::{EngagementRecord, RecordError};
    pub use crate::roster::{
        Commander, EngagementContext, Force, ForceContext, ForceId, Side, Unit, UnitId,
        UnitStatus, UnitType,
    };
}
