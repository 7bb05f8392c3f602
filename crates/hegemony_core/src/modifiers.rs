//! Modifier resolution.
//!
//! Turns a unit, its upgrades, its commander's trait and the engagement
//! context into a [`ModifierBundle`] of additive per-axis bonuses plus a set
//! of special abilities. Resolution is pure: it never rolls dice and never
//! mutates its inputs, so the same inputs always give the same bundle.
//!
//! Bundles are snapshots for one phase invocation. [`PhaseModifiers`]
//! recomputes them at every phase start because statuses, and with them the
//! outnumbered flag and enemy effects, change between phases.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::data::{Ability, Axis, Condition, Effect, ModifierRule, Ruleset, Scope};
use crate::error::{ConfigurationError, Result};
use crate::roster::{Commander, EngagementContext, Force, ForceContext, Side, Unit, UnitId, UnitStatus};

/// Resolved per-axis bonuses and abilities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ModifierBundle {
    values: [i32; Axis::COUNT],
    abilities: BTreeMap<Ability, u8>,
}

impl ModifierBundle {
    /// An empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bonus on an axis.
    #[must_use]
    pub const fn get(&self, axis: Axis) -> i32 {
        self.values[axis.index()]
    }

    /// Add to an axis.
    pub fn add(&mut self, axis: Axis, amount: i32) {
        self.values[axis.index()] += amount;
    }

    /// Grant an ability. Non-stacking abilities are kept once.
    pub fn grant(&mut self, ability: Ability) {
        let count = self.abilities.entry(ability).or_insert(0);
        if ability.stacks() || *count == 0 {
            *count = count.saturating_add(1);
        }
    }

    /// Whether the bundle carries an ability.
    #[must_use]
    pub fn has(&self, ability: Ability) -> bool {
        self.abilities.contains_key(&ability)
    }

    /// How many times an ability is held (at most 1 for non-stacking ones).
    #[must_use]
    pub fn count(&self, ability: Ability) -> u8 {
        self.abilities.get(&ability).copied().unwrap_or(0)
    }

    /// Abilities held, in a stable order.
    pub fn abilities(&self) -> impl Iterator<Item = Ability> + '_ {
        self.abilities.keys().copied()
    }

    /// Combine two bundles, summing axes and merging abilities.
    #[must_use]
    pub fn merged(&self, other: &ModifierBundle) -> ModifierBundle {
        let mut out = self.clone();
        for axis in Axis::ALL {
            out.add(axis, other.get(axis));
        }
        for (&ability, &count) in &other.abilities {
            for _ in 0..count {
                out.grant(ability);
            }
        }
        out
    }

    fn apply(&mut self, rule: &ModifierRule, commander_level: Option<u8>) {
        match rule.effect {
            Effect::Bonus { axis, amount } => self.add(axis, amount.value(commander_level)),
            Effect::Grant(ability) => self.grant(ability),
        }
    }
}

/// Situation of one side at the start of a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SideContext {
    /// Caller-supplied flags.
    pub flags: ForceContext,
    /// Shared engagement flags.
    pub engagement: EngagementContext,
    /// Fewer active units than the opponent.
    pub outnumbered: bool,
    /// An enemy effect cancels this side's garrison.
    pub garrison_negated: bool,
}

impl SideContext {
    /// Whether a rule condition holds for this side.
    #[must_use]
    pub const fn holds(&self, condition: Condition) -> bool {
        match condition {
            Condition::Always => true,
            Condition::HomeTerritory => self.flags.home_territory,
            Condition::Besieging => self.flags.besieging,
            Condition::Besieged => self.flags.besieged,
            Condition::Embarked => self.flags.embarked,
            Condition::Garrisoned => self.flags.garrisoned && !self.garrison_negated,
            Condition::Outnumbered => self.outnumbered,
            Condition::HolyWar => self.engagement.holy_war,
            Condition::NotHolyWar => !self.engagement.holy_war,
            Condition::TierAtLeast(tier) => self.flags.war_college_tier >= tier,
        }
    }
}

/// Everything the resolver needs about one side's surroundings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveContext {
    /// Situation of the side being resolved.
    pub side: SideContext,
    /// Enemy-scope rules projected by the opposing force, each with the
    /// opposing commander level.
    hostile: Vec<(ModifierRule, Option<u8>)>,
}

impl ResolveContext {
    /// Context for a side with no opposing effects.
    #[must_use]
    pub fn isolated(side: SideContext) -> Self {
        Self {
            side,
            hostile: Vec::new(),
        }
    }

    /// Enemy-scope rules landing on this side.
    pub fn hostile_rules(&self) -> impl Iterator<Item = &ModifierRule> {
        self.hostile.iter().map(|(rule, _)| rule)
    }
}

/// Pure resolver over a ruleset.
#[derive(Debug, Clone, Copy)]
pub struct ModifierResolver<'r> {
    ruleset: &'r Ruleset,
}

impl<'r> ModifierResolver<'r> {
    /// Resolver over the given rules.
    #[must_use]
    pub const fn new(ruleset: &'r Ruleset) -> Self {
        Self { ruleset }
    }

    /// The rules in use.
    #[must_use]
    pub const fn ruleset(&self) -> &'r Ruleset {
        self.ruleset
    }

    /// Build the context for `own` facing `opposing`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the opposing force references
    /// unknown rule keys.
    pub fn context(
        &self,
        own: &Force,
        opposing: &Force,
        engagement: EngagementContext,
    ) -> Result<ResolveContext> {
        let hostile = self.projected_rules(opposing, Scope::Enemy)?;
        let garrison_negated = hostile
            .iter()
            .any(|(rule, _)| rule.effect == Effect::Grant(Ability::NegateGarrison));
        let side = SideContext {
            flags: own.context,
            engagement,
            outnumbered: own.active_count() < opposing.active_count(),
            garrison_negated,
        };
        Ok(ResolveContext { side, hostile })
    }

    /// Resolve the bundle for one unit.
    ///
    /// Sums type stats, upgrade stats, and every unit-scope rule from the
    /// unit type, its upgrades, the commander's trait, the baseline commander
    /// rules and the context rules, plus enemy-scope rules projected onto
    /// this side.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] for an unknown unit type, upgrade or
    /// trait.
    pub fn resolve(
        &self,
        unit: &Unit,
        commander: Option<&Commander>,
        ctx: &ResolveContext,
    ) -> Result<ModifierBundle> {
        let level = commander.map(|c| c.level);
        let mut bundle = ModifierBundle::new();

        let type_def = self.ruleset.unit_type(unit.unit_type)?;
        for (axis, value) in type_def.stats.combat_offsets() {
            bundle.add(axis, value);
        }
        self.apply_rules(&mut bundle, &type_def.rules, Scope::Unit, ctx, level);

        for key in &unit.upgrades {
            let upgrade = self.ruleset.upgrade(key)?;
            for (axis, value) in upgrade.stats.combat_offsets() {
                bundle.add(axis, value);
            }
            self.apply_rules(&mut bundle, &upgrade.rules, Scope::Unit, ctx, level);
        }

        if let Some(commander) = commander {
            let trait_def = self.ruleset.trait_def(commander.trait_key.as_str())?;
            self.apply_rules(&mut bundle, &trait_def.rules, Scope::Unit, ctx, level);
            self.apply_rules(
                &mut bundle,
                &self.ruleset.commander_rules,
                Scope::Unit,
                ctx,
                level,
            );
        }

        self.apply_rules(&mut bundle, &self.ruleset.context_rules, Scope::Unit, ctx, level);

        for (rule, hostile_level) in &ctx.hostile {
            if ctx.side.holds(rule.condition) {
                bundle.apply(rule, *hostile_level);
            }
        }

        Ok(bundle)
    }

    /// Resolve the side-wide bundle for a force.
    ///
    /// Collects every force-scope rule from the commander, from units still
    /// on the field, and from the context rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] for unknown rule keys.
    pub fn resolve_force(&self, force: &Force, ctx: &ResolveContext) -> Result<ModifierBundle> {
        let mut bundle = ModifierBundle::new();
        for (rule, level) in self.projected_rules(force, Scope::Force)? {
            if ctx.side.holds(rule.condition) {
                bundle.apply(&rule, level);
            }
        }
        let level = force.commander.as_ref().map(|c| c.level);
        self.apply_rules(&mut bundle, &self.ruleset.context_rules, Scope::Force, ctx, level);
        Ok(bundle)
    }

    /// Check a unit's type and upgrades against the ruleset.
    ///
    /// # Errors
    ///
    /// Returns the first unknown key, misplaced upgrade or repeated upgrade.
    pub fn validate_unit(&self, unit: &Unit) -> Result<()> {
        self.ruleset.unit_type(unit.unit_type)?;
        let mut seen = BTreeSet::new();
        for key in &unit.upgrades {
            let upgrade = self.ruleset.upgrade(key)?;
            if !upgrade.fits(unit.unit_type) {
                return Err(ConfigurationError::UpgradeNotAllowed {
                    upgrade: key.to_string(),
                    unit_type: unit.unit_type.to_string(),
                }
                .into());
            }
            if !seen.insert(key) {
                return Err(ConfigurationError::DuplicateUpgrade {
                    unit: unit.id,
                    upgrade: key.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Rules of `scope` that a force's commander and non-destroyed units
    /// carry, each paired with the force's commander level.
    fn projected_rules(
        &self,
        force: &Force,
        scope: Scope,
    ) -> Result<Vec<(ModifierRule, Option<u8>)>> {
        let level = force.commander.as_ref().map(|c| c.level);
        let mut rules = Vec::new();
        let mut take = |source: &[ModifierRule]| {
            rules.extend(
                source
                    .iter()
                    .filter(|r| r.scope == scope)
                    .map(|r| (*r, level)),
            );
        };

        if let Some(commander) = &force.commander {
            take(&self.ruleset.trait_def(commander.trait_key.as_str())?.rules);
            take(&self.ruleset.commander_rules);
        }
        for unit in force
            .units
            .iter()
            .filter(|u| u.status() != UnitStatus::Destroyed)
        {
            take(&self.ruleset.unit_type(unit.unit_type)?.rules);
            for key in &unit.upgrades {
                take(&self.ruleset.upgrade(key)?.rules);
            }
        }
        Ok(rules)
    }

    fn apply_rules(
        &self,
        bundle: &mut ModifierBundle,
        rules: &[ModifierRule],
        scope: Scope,
        ctx: &ResolveContext,
        level: Option<u8>,
    ) {
        for rule in rules
            .iter()
            .filter(|r| r.scope == scope && ctx.side.holds(r.condition))
        {
            bundle.apply(rule, level);
        }
    }
}

/// Bundles for one side, valid for a single phase invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ForceModifiers {
    /// Side-wide effects.
    pub force: ModifierBundle,
    /// Situation the bundles were resolved under.
    pub context: SideContext,
    units: BTreeMap<UnitId, ModifierBundle>,
    empty: ModifierBundle,
}

impl ForceModifiers {
    /// Bundle for a unit; empty for units that were already destroyed.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> &ModifierBundle {
        self.units.get(&id).unwrap_or(&self.empty)
    }

    /// Unit bundle merged with the side-wide bundle.
    #[must_use]
    pub fn combined(&self, id: UnitId) -> ModifierBundle {
        self.unit(id).merged(&self.force)
    }

    /// Whether the unit or its side holds an ability.
    #[must_use]
    pub fn unit_has(&self, id: UnitId, ability: Ability) -> bool {
        self.unit(id).has(ability) || self.force.has(ability)
    }
}

/// Bundles for both sides at a phase start.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhaseModifiers {
    sides: [ForceModifiers; 2],
}

impl PhaseModifiers {
    /// Resolve every non-destroyed unit of both forces.
    ///
    /// Units in `shelled` are resolved as if their garrison were negated.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown rule keys.
    pub fn resolve(
        resolver: &ModifierResolver<'_>,
        forces: &[Force; 2],
        engagement: EngagementContext,
        shelled: &BTreeSet<UnitId>,
    ) -> Result<Self> {
        let mut sides: [ForceModifiers; 2] = Default::default();
        for side in Side::BOTH {
            let own = &forces[side.index()];
            let opposing = &forces[side.opponent().index()];
            let ctx = resolver.context(own, opposing, engagement)?;
            let mut shelled_ctx = ctx.clone();
            shelled_ctx.side.garrison_negated = true;
            let out = &mut sides[side.index()];
            out.force = resolver.resolve_force(own, &ctx)?;
            out.context = ctx.side;
            for unit in own
                .units
                .iter()
                .filter(|u| u.status() != UnitStatus::Destroyed)
            {
                let unit_ctx = if shelled.contains(&unit.id) {
                    &shelled_ctx
                } else {
                    &ctx
                };
                let bundle = resolver.resolve(unit, own.commander.as_ref(), unit_ctx)?;
                out.units.insert(unit.id, bundle);
            }
        }
        Ok(Self { sides })
    }

    /// Bundles for one side.
    #[must_use]
    pub fn side(&self, side: Side) -> &ForceModifiers {
        &self.sides[side.index()]
    }
}
