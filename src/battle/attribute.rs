//! Sparse attribute storage shared by persistent players and per-battle combatants.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The three spendable character attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AttributeType {
    Strength,
    Stamina,
    Agility,
}

impl AttributeType {
    pub const ALL: [AttributeType; 3] = [
        AttributeType::Strength,
        AttributeType::Stamina,
        AttributeType::Agility,
    ];

    /// Parse the short and long names players type (`str`, `stamina`, `agi`, ...).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "strength" | "str" => Some(AttributeType::Strength),
            "stamina" | "sta" | "stam" => Some(AttributeType::Stamina),
            "agility" | "ag" | "agi" => Some(AttributeType::Agility),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeType::Strength => "Strength",
            AttributeType::Stamina => "Stamina",
            AttributeType::Agility => "Agility",
        };
        f.write_str(name)
    }
}

/// Attribute values keyed by type. Missing keys read as 0.
///
/// Not synchronized; the owning player or combatant serializes access.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeContainer {
    values: BTreeMap<AttributeType, i32>,
}

impl AttributeContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: AttributeType) -> i32 {
        self.values.get(&kind).copied().unwrap_or(0)
    }

    pub fn set(&mut self, kind: AttributeType, val: i32) {
        self.values.insert(kind, val);
    }

    pub fn modify(&mut self, kind: AttributeType, delta: i32) {
        self.set(kind, self.get(kind) + delta);
    }

    /// Sum of all three attributes.
    pub fn total(&self) -> i32 {
        AttributeType::ALL.iter().map(|k| self.get(*k)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_read_as_zero() {
        let attrs = AttributeContainer::new();
        for kind in AttributeType::ALL {
            assert_eq!(attrs.get(kind), 0);
        }
    }

    #[test]
    fn modify_adds_to_existing_value() {
        let mut attrs = AttributeContainer::new();
        attrs.modify(AttributeType::Agility, 3);
        attrs.modify(AttributeType::Agility, -1);
        attrs.set(AttributeType::Strength, 7);
        assert_eq!(attrs.get(AttributeType::Agility), 2);
        assert_eq!(attrs.get(AttributeType::Strength), 7);
        assert_eq!(attrs.total(), 9);
    }

    #[test]
    fn parses_aliases() {
        assert_eq!(AttributeType::from_str("STR"), Some(AttributeType::Strength));
        assert_eq!(AttributeType::from_str("stam"), Some(AttributeType::Stamina));
        assert_eq!(AttributeType::from_str("agi"), Some(AttributeType::Agility));
        assert_eq!(AttributeType::from_str("luck"), None);
    }
}
