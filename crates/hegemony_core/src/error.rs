//! Error types for engagement resolution.
//!
//! Two categories exist. [`ConfigurationError`] covers malformed or
//! semantically invalid input and is always reported before any force is
//! touched. [`EngineError::InvariantViolation`] is a programming-error class:
//! it aborts the engagement and no partial result is returned.

use thiserror::Error;

use crate::roster::{Side, UnitId};

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error type for the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Invalid input, rejected before any state mutation.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// An internal invariant was broken while resolving.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

impl EngineError {
    /// Whether this error came from bad input rather than an engine bug.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Malformed or semantically invalid engine input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A force has no deployable (non-destroyed) units.
    #[error("Force on side {0:?} has no deployable units")]
    EmptyForce(Side),

    /// The same unit id appears twice across the engagement.
    #[error("Duplicate unit ID: {0}")]
    DuplicateUnitId(UnitId),

    /// The ruleset has no definition for a unit type.
    #[error("Unknown unit type: {0}")]
    UnknownUnitType(String),

    /// The ruleset has no upgrade with this key.
    #[error("Unknown upgrade: {0}")]
    UnknownUpgrade(String),

    /// The ruleset has no trait with this key.
    #[error("Unknown commander trait: {0}")]
    UnknownTrait(String),

    /// An upgrade was attached to a unit type it is not built for.
    #[error("Upgrade '{upgrade}' cannot be attached to {unit_type} units")]
    UpgradeNotAllowed {
        /// Upgrade key.
        upgrade: String,
        /// Unit type it was attached to.
        unit_type: String,
    },

    /// The same upgrade was attached twice to one unit.
    #[error("Unit {unit} carries upgrade '{upgrade}' more than once")]
    DuplicateUpgrade {
        /// Offending unit.
        unit: UnitId,
        /// Repeated upgrade key.
        upgrade: String,
    },

    /// Commander level outside the configured range.
    #[error("Commander level {level} is outside 1..={max}")]
    InvalidCommanderLevel {
        /// Supplied level.
        level: u8,
        /// Configured maximum.
        max: u8,
    },

    /// A die with fewer than two faces.
    #[error("Invalid die range: {0} sides (need at least 2)")]
    InvalidDieRange(u32),

    /// An engine setting has a nonsensical value.
    #[error("Invalid setting '{name}': {reason}")]
    InvalidSetting {
        /// Setting name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Rule data failed to parse.
    #[error("Failed to parse '{source_name}': {message}")]
    Parse {
        /// File path or other label for the data source.
        source_name: String,
        /// Parser message.
        message: String,
    },

    /// Rule data refers to something that does not exist or repeats a key.
    #[error("Ruleset is inconsistent: {0}")]
    InvalidRuleset(String),
}
