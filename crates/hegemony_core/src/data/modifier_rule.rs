//! Declarative modifier rules.
//!
//! Unit types, upgrades, traits and context effects are all expressed as
//! [`ModifierRule`] records. The resolver consumes them uniformly, so adding
//! a trait is a data change.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A combat axis that bonuses apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// Attacking in the skirmish.
    Skirmish,
    /// Resisting skirmish attacks.
    Defense,
    /// Pitch round contribution.
    Pitch,
    /// Rally checks.
    Rally,
    /// Extra casualties inflicted on routed enemies.
    Pursuit,
    /// Fewer casualties suffered by own routed units.
    Retreat,
    /// Extra casualties inflicted on every enemy unit that rolls.
    Damage,
}

impl Axis {
    /// Number of axes.
    pub const COUNT: usize = 7;

    /// Every axis in storage order.
    pub const ALL: [Axis; Axis::COUNT] = [
        Axis::Skirmish,
        Axis::Defense,
        Axis::Pitch,
        Axis::Rally,
        Axis::Pursuit,
        Axis::Retreat,
        Axis::Damage,
    ];

    /// Storage index.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Special abilities a rule can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ability {
    /// Never routs on a failed rally.
    RoutImmune,
    /// Any skirmish win destroys the defender.
    AutoOverrun,
    /// Holding against a skirmish attack routs the attacker.
    Counterfire,
    /// Picks the weakest enemy as skirmish target instead of a random one.
    ChooseTarget,
    /// The side declines the skirmish; no pairings are fought.
    AvoidSkirmish,
    /// The first nominated skirmisher adds half the commander level.
    BoldSkirmisher,
    /// One reroll of a failed rally check per source.
    RallyReroll,
    /// One reroll of a failed casualty roll.
    CasualtyReroll,
    /// The commander rerolls a 1 on the promotion die.
    PromotionReroll,
    /// The commander needs one less to be promoted.
    EasyPromotion,
    /// The opposing side gets no garrison benefits.
    NegateGarrison,
    /// One random garrisoned enemy unit per source loses its garrison
    /// benefits for the whole engagement.
    ShellGarrison,
}

impl Ability {
    /// Whether several sources add up rather than collapse into one.
    #[must_use]
    pub const fn stacks(self) -> bool {
        matches!(self, Ability::RallyReroll | Ability::ShellGarrison)
    }
}

/// Who a rule applies to, relative to the rule's source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Scope {
    /// The carrying unit for an upgrade; every unit of the force for a trait
    /// or context rule.
    #[default]
    Unit,
    /// A side-wide effect counted once.
    Force,
    /// Every unit of the opposing force.
    Enemy,
}

/// When a rule is in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Condition {
    /// Unconditionally.
    #[default]
    Always,
    /// The side fights in its home territory.
    HomeTerritory,
    /// The side is besieging.
    Besieging,
    /// The side is besieged.
    Besieged,
    /// The side fights embarked.
    Embarked,
    /// The side holds fortified positions and no enemy negates them.
    Garrisoned,
    /// The side has fewer active units than its opponent.
    Outnumbered,
    /// The engagement is part of a holy war.
    HolyWar,
    /// The engagement is not part of a holy war.
    NotHolyWar,
    /// The side's war college tier is at least this value.
    TierAtLeast(u8),
}

/// Size of a bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Amount {
    /// A fixed value.
    Flat(i32),
    /// The commander's level, zero without a commander.
    CommanderLevel,
    /// Half the commander's level, rounded up.
    HalfCommanderLevelRoundedUp,
}

impl Amount {
    /// Evaluate against the commander level of the rule's source side.
    #[must_use]
    pub fn value(self, commander_level: Option<u8>) -> i32 {
        let level = i32::from(commander_level.unwrap_or(0));
        match self {
            Amount::Flat(n) => n,
            Amount::CommanderLevel => level,
            Amount::HalfCommanderLevelRoundedUp => (level + 1) / 2,
        }
    }
}

/// What a rule does when it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// Add to an axis.
    Bonus {
        /// Axis affected.
        axis: Axis,
        /// Size of the bonus.
        amount: Amount,
    },
    /// Grant a special ability.
    Grant(Ability),
}

/// One declarative modifier rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModifierRule {
    /// Who the rule applies to.
    #[serde(default)]
    pub scope: Scope,
    /// When the rule applies. Conditions are evaluated for the side the rule
    /// lands on.
    #[serde(default)]
    pub condition: Condition,
    /// What it does.
    pub effect: Effect,
}

impl ModifierRule {
    /// A flat bonus to the covered units.
    #[must_use]
    pub const fn bonus(axis: Axis, amount: i32) -> Self {
        Self {
            scope: Scope::Unit,
            condition: Condition::Always,
            effect: Effect::Bonus {
                axis,
                amount: Amount::Flat(amount),
            },
        }
    }

    /// A bonus that scales with the commander.
    #[must_use]
    pub const fn scaled(axis: Axis, amount: Amount) -> Self {
        Self {
            scope: Scope::Unit,
            condition: Condition::Always,
            effect: Effect::Bonus { axis, amount },
        }
    }

    /// An ability granted to the covered units.
    #[must_use]
    pub const fn grant(ability: Ability) -> Self {
        Self {
            scope: Scope::Unit,
            condition: Condition::Always,
            effect: Effect::Grant(ability),
        }
    }

    /// Apply side-wide instead.
    #[must_use]
    pub const fn force(mut self) -> Self {
        self.scope = Scope::Force;
        self
    }

    /// Apply to the opposing force instead.
    #[must_use]
    pub const fn enemy(mut self) -> Self {
        self.scope = Scope::Enemy;
        self
    }

    /// Only apply under a condition.
    #[must_use]
    pub const fn when(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }
}

/// Stat offsets carried by unit types and upgrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StatBlock {
    /// Skirmish offset.
    pub skirmish: i32,
    /// Defense offset.
    pub defense: i32,
    /// Pitch offset.
    pub pitch: i32,
    /// Rally offset.
    pub rally: i32,
    /// Strategic movement, reported to callers and unused in combat.
    pub movement: i32,
}

impl StatBlock {
    /// Build a stat block.
    #[must_use]
    pub const fn new(skirmish: i32, defense: i32, pitch: i32, rally: i32, movement: i32) -> Self {
        Self {
            skirmish,
            defense,
            pitch,
            rally,
            movement,
        }
    }

    /// Combat offsets as (axis, value) pairs.
    #[must_use]
    pub const fn combat_offsets(&self) -> [(Axis, i32); 4] {
        [
            (Axis::Skirmish, self.skirmish),
            (Axis::Defense, self.defense),
            (Axis::Pitch, self.pitch),
            (Axis::Rally, self.rally),
        ]
    }
}
