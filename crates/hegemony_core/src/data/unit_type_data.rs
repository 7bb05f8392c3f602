//! Unit type definitions.

use serde::{Deserialize, Serialize};

use super::modifier_rule::{ModifierRule, StatBlock};
use crate::roster::UnitType;

/// Base stats and rules for one unit type.
///
/// # Example RON
///
/// ```ron
/// UnitTypeData(
///     unit_type: Heavy,
///     stats: (defense: 2, pitch: 1, rally: 1, movement: 3),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTypeData {
    /// Type being defined.
    pub unit_type: UnitType,
    /// Base stat offsets.
    pub stats: StatBlock,
    /// Extra rules every unit of this type carries.
    #[serde(default)]
    pub rules: Vec<ModifierRule>,
}

impl UnitTypeData {
    /// A type with plain stats.
    #[must_use]
    pub const fn new(unit_type: UnitType, stats: StatBlock) -> Self {
        Self {
            unit_type,
            stats,
            rules: Vec::new(),
        }
    }
}
