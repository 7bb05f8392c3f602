//! Forces, units and commanders taking part in one engagement.
//!
//! A [`Force`] is owned by the engagement for its whole duration. Only the
//! phase engines mutate it, and only through [`Unit::set_status`], which
//! refuses any backward status transition.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, EngineError, Result};

/// One of the two sides of an engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The first force passed to the engine. Pitch tallies are signed toward it.
    A,
    /// The second force.
    B,
}

impl Side {
    /// Both sides in resolution order.
    pub const BOTH: [Side; 2] = [Side::A, Side::B];

    /// The other side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    /// Index into per-side arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }
}

/// Caller-assigned identifier of a force.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ForceId(pub u32);

/// Caller-assigned identifier of a unit, unique across both forces.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UnitId(pub u32);

/// Caller-assigned identifier of a commander.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CommanderId(pub u32);

impl fmt::Display for ForceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "force {}", self.0)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Combat unit type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum UnitType {
    /// Fast shock troops.
    Cavalry,
    /// Line infantry.
    Heavy,
    /// Skirmishing infantry.
    Light,
    /// Missile troops.
    Ranged,
    /// Logistics and engineers.
    Support,
}

impl UnitType {
    /// Every unit type.
    pub const ALL: [UnitType; 5] = [
        UnitType::Cavalry,
        UnitType::Heavy,
        UnitType::Light,
        UnitType::Ranged,
        UnitType::Support,
    ];

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            UnitType::Cavalry => "Cavalry",
            UnitType::Heavy => "Heavy",
            UnitType::Light => "Light",
            UnitType::Ranged => "Ranged",
            UnitType::Support => "Support",
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for UnitType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigurationError::UnknownUnitType(s.to_string()))
    }
}

/// Key of an upgrade in the ruleset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpgradeKey(pub String);

impl UpgradeKey {
    /// Create a key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UpgradeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of a commander trait in the ruleset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraitKey(pub String);

impl TraitKey {
    /// Create a key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Combat status of a unit.
///
/// Transitions only move forward: `Active -> Routed -> Destroyed` or
/// `Active -> Destroyed`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum UnitStatus {
    /// Fighting.
    #[default]
    Active,
    /// Broken and out of the fight, may still survive the action report.
    Routed,
    /// Gone.
    Destroyed,
}

impl UnitStatus {
    /// Whether moving from `self` to `next` is allowed.
    #[must_use]
    pub fn can_become(self, next: UnitStatus) -> bool {
        self <= next
    }
}

/// One deployed combat element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    /// Unique identifier.
    pub id: UnitId,
    /// Unit type.
    pub unit_type: UnitType,
    /// Applied upgrades, in attachment order.
    #[serde(default)]
    pub upgrades: Vec<UpgradeKey>,
    /// Status on entry to the engagement.
    #[serde(default)]
    status: UnitStatus,
}

impl Unit {
    /// An active unit with no upgrades.
    #[must_use]
    pub fn new(id: u32, unit_type: UnitType) -> Self {
        Self {
            id: UnitId(id),
            unit_type,
            upgrades: Vec::new(),
            status: UnitStatus::Active,
        }
    }

    /// Attach an upgrade.
    #[must_use]
    pub fn with_upgrade(mut self, key: impl Into<String>) -> Self {
        self.upgrades.push(UpgradeKey::new(key));
        self
    }

    /// Deploy with a starting status other than active.
    #[must_use]
    pub fn with_status(mut self, status: UnitStatus) -> Self {
        self.status = status;
        self
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> UnitStatus {
        self.status
    }

    /// Whether the unit is still fighting.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == UnitStatus::Active
    }

    /// Move the unit to a new status.
    ///
    /// Setting the current status again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvariantViolation`] for a backward transition.
    pub fn set_status(&mut self, next: UnitStatus) -> Result<()> {
        if !self.status.can_become(next) {
            return Err(EngineError::InvariantViolation(format!(
                "unit {} cannot go from {:?} back to {:?}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

/// Leader of a force.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commander {
    /// Identifier.
    pub id: CommanderId,
    /// Name used in reports.
    pub name: String,
    /// Experience level, 1 through the configured maximum.
    pub level: u8,
    /// Trait key looked up in the ruleset.
    #[serde(rename = "trait")]
    pub trait_key: TraitKey,
    /// Whether this commander can be captured or promoted.
    #[serde(default = "default_eligible")]
    pub eligible: bool,
}

const fn default_eligible() -> bool {
    true
}

impl Commander {
    /// A capture/promotion-eligible commander.
    pub fn new(id: u32, name: impl Into<String>, level: u8, trait_key: impl Into<String>) -> Self {
        Self {
            id: CommanderId(id),
            name: name.into(),
            level,
            trait_key: TraitKey::new(trait_key),
            eligible: true,
        }
    }
}

/// Caller-supplied engagement flags for one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ForceContext {
    /// Fighting in its own territory.
    pub home_territory: bool,
    /// Laying siege to the location.
    pub besieging: bool,
    /// Under siege at the location.
    pub besieged: bool,
    /// Fighting from ships or a landing.
    pub embarked: bool,
    /// Holding fortified positions.
    pub garrisoned: bool,
    /// War college progression tier of the owning player.
    pub war_college_tier: u8,
}

/// Flags shared by both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngagementContext {
    /// The war was justified on religious grounds.
    pub holy_war: bool,
}

/// One side's deployment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Force {
    /// Identifier reported back in the result.
    pub id: ForceId,
    /// Units in deployment order.
    pub units: Vec<Unit>,
    /// Leading commander, if any.
    #[serde(default)]
    pub commander: Option<Commander>,
    /// Caller-supplied flags.
    #[serde(default)]
    pub context: ForceContext,
}

impl Force {
    /// An empty force without a commander.
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self {
            id: ForceId(id),
            units: Vec::new(),
            commander: None,
            context: ForceContext::default(),
        }
    }

    /// Add a unit.
    #[must_use]
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.units.push(unit);
        self
    }

    /// Set the commander.
    #[must_use]
    pub fn with_commander(mut self, commander: Commander) -> Self {
        self.commander = Some(commander);
        self
    }

    /// Set the context flags.
    #[must_use]
    pub fn with_context(mut self, context: ForceContext) -> Self {
        self.context = context;
        self
    }

    /// Merge caller-resolved assisting units into the roster.
    #[must_use]
    pub fn with_assists(mut self, assists: impl IntoIterator<Item = Unit>) -> Self {
        self.units.extend(assists);
        self
    }

    /// Units still fighting.
    pub fn active_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(|u| u.is_active())
    }

    /// Number of units still fighting.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active_units().count()
    }

    /// Number of units not yet destroyed.
    #[must_use]
    pub fn deployable_count(&self) -> usize {
        self.units
            .iter()
            .filter(|u| u.status() != UnitStatus::Destroyed)
            .count()
    }

    /// Look up a unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Look up a unit by id for mutation.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == id)
    }
}
