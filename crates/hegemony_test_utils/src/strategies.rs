//! Proptest strategies for engagement testing.
//!
//! These strategies generate random but always-valid engagements against the
//! standard ruleset: upgrades only go on unit types they fit, unit ids are
//! unique across both forces, and commander levels stay in range.

use proptest::prelude::*;
use proptest::sample::{select, subsequence};

use hegemony_core::battle::EngagementSetup;
use hegemony_core::data::Ruleset;
use hegemony_core::roster::{
    Commander, EngagementContext, Force, ForceContext, Unit, UnitType, UpgradeKey,
};

/// First unit id used for side B, leaving room below for side A.
pub const SIDE_B_FIRST_ID: u32 = 100;

/// Upgrades applied to one generated unit at most.
pub const MAX_UPGRADES_PER_UNIT: usize = 2;

/// Generate any unit type.
pub fn arb_unit_type() -> impl Strategy<Value = UnitType> {
    select(UnitType::ALL.to_vec())
}

/// Upgrade keys of the standard ruleset that fit `unit_type`.
#[must_use]
pub fn fitting_upgrades(unit_type: UnitType) -> Vec<UpgradeKey> {
    Ruleset::standard()
        .upgrades
        .iter()
        .filter(|u| u.fits(unit_type))
        .map(|u| u.key.clone())
        .collect()
}

/// Generate a unit type with a valid, duplicate-free set of upgrades.
///
/// The id is a placeholder; [`arb_force`] assigns the real ones.
pub fn arb_unit() -> impl Strategy<Value = Unit> {
    arb_unit_type().prop_flat_map(|unit_type| {
        let options = fitting_upgrades(unit_type);
        let max = MAX_UPGRADES_PER_UNIT.min(options.len());
        subsequence(options, 0..=max).prop_map(move |upgrades| {
            let mut unit = Unit::new(0, unit_type);
            unit.upgrades = upgrades;
            unit
        })
    })
}

/// Generate a commander level in the default range (1-10).
pub fn arb_commander_level() -> impl Strategy<Value = u8> {
    1u8..=10
}

/// Generate a commander with any standard trait.
pub fn arb_commander(id: u32) -> impl Strategy<Value = Commander> {
    let traits: Vec<String> = Ruleset::standard()
        .traits
        .iter()
        .map(|t| t.key.as_str().to_string())
        .collect();
    (select(traits), arb_commander_level(), any::<bool>()).prop_map(
        move |(trait_key, level, eligible)| {
            let mut commander = Commander::new(id, format!("Commander {id}"), level, trait_key);
            commander.eligible = eligible;
            commander
        },
    )
}

/// Generate per-force engagement flags.
pub fn arb_force_context() -> impl Strategy<Value = ForceContext> {
    (
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        0u8..=10,
    )
        .prop_map(
            |(home_territory, besieging, besieged, embarked, garrisoned, war_college_tier)| {
                ForceContext {
                    home_territory,
                    besieging,
                    besieged,
                    embarked,
                    garrisoned,
                    war_college_tier,
                }
            },
        )
}

/// Generate shared engagement flags.
pub fn arb_engagement_context() -> impl Strategy<Value = EngagementContext> {
    any::<bool>().prop_map(|holy_war| EngagementContext { holy_war })
}

/// Generate a force of `1..=max_units` units with ids from `first_id`.
pub fn arb_force(force_id: u32, first_id: u32, max_units: usize) -> impl Strategy<Value = Force> {
    (
        proptest::collection::vec(arb_unit(), 1..=max_units.max(1)),
        proptest::option::of(arb_commander(force_id)),
        arb_force_context(),
    )
        .prop_map(move |(units, commander, context)| {
            let mut force = Force::new(force_id).with_context(context);
            for (mut unit, id) in units.into_iter().zip(first_id..) {
                unit.id.0 = id;
                force = force.with_unit(unit);
            }
            force.commander = commander;
            force
        })
}

/// Generate a complete, valid engagement.
///
/// `max_units` must stay below [`SIDE_B_FIRST_ID`] so ids never collide.
pub fn arb_setup(max_units: usize) -> impl Strategy<Value = EngagementSetup> {
    (
        arb_force(1, 1, max_units),
        arb_force(2, SIDE_B_FIRST_ID, max_units),
        arb_engagement_context(),
    )
        .prop_map(|(force_a, force_b, context)| {
            EngagementSetup::new(force_a, force_b).with_context(context)
        })
}

/// Generate a dice seed.
pub fn arb_seed() -> impl Strategy<Value = u64> {
    any::<u64>()
}

/// Generate a script of six-sided rolls.
pub fn arb_roll_script(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
    proptest::collection::vec(1u32..=6, 1..=max_len.max(1))
}
