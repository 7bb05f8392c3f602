//! Rule data for the modifier resolver.
//!
//! Pure data structures, deserializable from RON. The shipped rules are built
//! by [`Ruleset::standard`] and mirrored in `assets/data/ruleset.ron`.
//!
//! **Note:** This module contains no file IO. Callers read files and hand the
//! text to [`Ruleset::from_ron_str`].

mod modifier_rule;
mod ruleset;
mod trait_data;
mod unit_type_data;
mod upgrade_data;

pub use modifier_rule::{Ability, Amount, Axis, Condition, Effect, ModifierRule, Scope, StatBlock};
pub use ruleset::Ruleset;
pub use trait_data::TraitData;
pub use unit_type_data::UnitTypeData;
pub use upgrade_data::UpgradeData;
