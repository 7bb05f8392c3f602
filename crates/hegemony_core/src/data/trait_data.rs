//! Commander trait definitions.

use serde::{Deserialize, Serialize};

use super::modifier_rule::ModifierRule;
use crate::roster::TraitKey;

/// A commander trait and the rules it brings.
///
/// Traits without rules are legal: their effects live outside the engine
/// (movement, sight, pillaging) and the engine only needs to recognise them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitData {
    /// Unique key.
    pub key: TraitKey,
    /// Human-readable summary.
    #[serde(default)]
    pub description: String,
    /// Rules applied to the commander's force.
    #[serde(default)]
    pub rules: Vec<ModifierRule>,
}

impl TraitData {
    /// A trait with the given rules.
    pub fn new(key: &str, description: &str, rules: Vec<ModifierRule>) -> Self {
        Self {
            key: TraitKey::new(key),
            description: description.to_string(),
            rules,
        }
    }
}
