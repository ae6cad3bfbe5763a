use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

// Character attributes, keyed in data files and rule expressions by their abbreviation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
)]
pub enum Attribute {
    #[strum(serialize = "BOD")]
    #[serde(rename = "BOD")]
    Body,
    #[strum(serialize = "AGI")]
    #[serde(rename = "AGI")]
    Agility,
    #[strum(serialize = "REA")]
    #[serde(rename = "REA")]
    Reaction,
    #[strum(serialize = "STR")]
    #[serde(rename = "STR")]
    Strength,
    #[strum(serialize = "CHA")]
    #[serde(rename = "CHA")]
    Charisma,
    #[strum(serialize = "INT")]
    #[serde(rename = "INT")]
    Intuition,
    #[strum(serialize = "LOG")]
    #[serde(rename = "LOG")]
    Logic,
    #[strum(serialize = "WIL")]
    #[serde(rename = "WIL")]
    Willpower,
    #[strum(serialize = "EDG")]
    #[serde(rename = "EDG")]
    Edge,
    #[strum(serialize = "MAG")]
    #[serde(rename = "MAG")]
    Magic,
    #[strum(serialize = "RES")]
    #[serde(rename = "RES")]
    Resonance,
    #[strum(serialize = "DEP")]
    #[serde(rename = "DEP")]
    Depth,
}

impl Attribute {
    // Display name, as opposed to the abbreviation used in expressions.
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Body => "Body",
            Attribute::Agility => "Agility",
            Attribute::Reaction => "Reaction",
            Attribute::Strength => "Strength",
            Attribute::Charisma => "Charisma",
            Attribute::Intuition => "Intuition",
            Attribute::Logic => "Logic",
            Attribute::Willpower => "Willpower",
            Attribute::Edge => "Edge",
            Attribute::Magic => "Magic",
            Attribute::Resonance => "Resonance",
            Attribute::Depth => "Depth",
        }
    }
}

// The three SR5 limits.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum LimitKind {
    Physical,
    Mental,
    Social,
}

/// Point-in-time view of a character's effective attribute values.
///
/// Rule expressions only ever see a snapshot, so entity caches stay valid
/// until the character explicitly hands out a new one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeSnapshot {
    values: BTreeMap<Attribute, i32>,
    essence: f64,
}

impl Default for AttributeSnapshot {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
            essence: 6.0,
        }
    }
}

impl AttributeSnapshot {
    pub fn new(values: BTreeMap<Attribute, i32>, essence: f64) -> Self {
        Self { values, essence }
    }

    pub fn get(&self, attribute: Attribute) -> i32 {
        self.values.get(&attribute).copied().unwrap_or(0)
    }

    pub fn essence(&self) -> f64 {
        self.essence
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, i32)> + '_ {
        self.values.iter().map(|(attribute, value)| (*attribute, *value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_abbreviations_round_trip() {
        assert_eq!(Attribute::from_str("BOD"), Ok(Attribute::Body));
        assert_eq!(Attribute::Willpower.to_string(), "WIL");
        assert_eq!(Attribute::Willpower.name(), "Willpower");
        assert!(Attribute::from_str("Body").is_err());
    }

    #[test]
    fn test_snapshot_defaults_to_zero() {
        let snapshot = AttributeSnapshot::new(BTreeMap::from([(Attribute::Logic, 5)]), 5.5);
        assert_eq!(snapshot.get(Attribute::Logic), 5);
        assert_eq!(snapshot.get(Attribute::Magic), 0);
        assert_eq!(snapshot.essence(), 5.5);
    }
}
