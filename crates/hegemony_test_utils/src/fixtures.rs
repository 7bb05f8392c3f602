//! Test fixtures and helpers.
//!
//! Pre-built forces and engagements for consistent testing.

use hegemony_core::battle::EngagementSetup;
use hegemony_core::roster::{Commander, Force, ForceContext, Unit, UnitType};

/// A force of plain units, ids assigned from `first_id` upward.
#[must_use]
pub fn force_of(force_id: u32, first_id: u32, units: &[UnitType]) -> Force {
    units
        .iter()
        .zip(first_id..)
        .fold(Force::new(force_id), |force, (&unit_type, id)| {
            force.with_unit(Unit::new(id, unit_type))
        })
}

/// `count` units of one type.
#[must_use]
pub fn uniform_force(force_id: u32, first_id: u32, unit_type: UnitType, count: usize) -> Force {
    force_of(force_id, first_id, &vec![unit_type; count])
}

/// A capture/promotion-eligible commander.
#[must_use]
pub fn commander(id: u32, trait_key: &str, level: u8) -> Commander {
    Commander::new(id, format!("{trait_key} General"), level, trait_key)
}

/// Two Cavalry against two Heavy, no commanders.
#[must_use]
pub fn cavalry_vs_heavy() -> EngagementSetup {
    EngagementSetup::new(
        uniform_force(1, 1, UnitType::Cavalry, 2),
        uniform_force(2, 3, UnitType::Heavy, 2),
    )
}

/// One Heavy each side.
#[must_use]
pub fn heavy_duel() -> EngagementSetup {
    EngagementSetup::new(
        uniform_force(1, 1, UnitType::Heavy, 1),
        uniform_force(2, 2, UnitType::Heavy, 1),
    )
}

/// A mixed engagement exercising upgrades, traits and context flags.
#[must_use]
pub fn combined_arms() -> EngagementSetup {
    let attackers = Force::new(1)
        .with_unit(Unit::new(1, UnitType::Cavalry).with_upgrade("Lancers"))
        .with_unit(Unit::new(2, UnitType::Cavalry).with_upgrade("Life Guard"))
        .with_unit(Unit::new(3, UnitType::Light).with_upgrade("Assault Team"))
        .with_unit(Unit::new(4, UnitType::Heavy).with_upgrade("Grenadiers"))
        .with_unit(Unit::new(5, UnitType::Support).with_upgrade("Field Hospital"))
        .with_commander(commander(1, "Bold", 6))
        .with_context(ForceContext {
            besieging: true,
            war_college_tier: 8,
            ..ForceContext::default()
        });
    let defenders = Force::new(2)
        .with_unit(Unit::new(11, UnitType::Heavy).with_upgrade("Sentry Team"))
        .with_unit(Unit::new(12, UnitType::Heavy).with_upgrade("Artillery Team"))
        .with_unit(Unit::new(13, UnitType::Ranged).with_upgrade("Sharpshooters"))
        .with_unit(Unit::new(14, UnitType::Ranged).with_upgrade("Mortar Team"))
        .with_commander(commander(2, "Resolute", 4))
        .with_context(ForceContext {
            home_territory: true,
            besieged: true,
            garrisoned: true,
            ..ForceContext::default()
        });
    EngagementSetup::new(attackers, defenders)
}

/// Parse an engagement setup from RON.
///
/// # Panics
///
/// Panics if the text does not parse; fixtures are expected to be valid.
#[must_use]
pub fn setup_from_ron(text: &str) -> EngagementSetup {
    ron::from_str(text).unwrap_or_else(|e| panic!("invalid fixture RON: {e}"))
}
