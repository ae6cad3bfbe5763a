use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

use crate::attributes::{Attribute, AttributeSnapshot, LimitKind};
use crate::cache::{Cached, Change};
use crate::context::EvalContext;
use crate::definitions::DrugComponentDef;
use crate::rules::{AvailabilityValue, evaluate_availability, evaluate_decimal};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum DrugComponentCategory {
    Foundation,
    Enhancer,
    Block,
}

// Unit a drug's duration is counted in.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
pub enum DurationTimescale {
    #[default]
    #[strum(serialize = "Combat Turns")]
    CombatTurns,
    Minutes,
    Hours,
    Days,
}

/// Everything one level of a component does while the drug is active.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrugEffect {
    pub attributes: BTreeMap<Attribute, i32>, // Attribute modifiers.
    pub limits: BTreeMap<LimitKind, i32>,     // Limit modifiers.
    pub qualities: Vec<String>,               // Qualities granted while active.
    pub infos: Vec<String>,                   // Free-text effect notes.
    pub initiative: i32,
    pub initiative_dice: i32,
    pub duration: i32,      // Duration multiplier.
    pub duration_dice: i32, // D6 rolled for the duration.
    pub timescale: Option<DurationTimescale>,
    pub speed: i32,        // Onset time in combat turns; lower is faster.
    pub crash_damage: i32, // Stun damage taken when the drug wears off.
}

/// Which derived values a [`DrugComponent`] memoizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrugComponentField {
    Cost,
    Availability,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct DrugComponentCache {
    cost: Cached<Decimal>,
    availability: Cached<AvailabilityValue>,
}

impl DrugComponentCache {
    fn invalidate(&mut self, change: Change) {
        match change {
            Change::Parent | Change::Children | Change::Flags => {}
            Change::Rating | Change::Attributes | Change::Definition => {
                self.cost.invalidate();
                self.availability.invalidate();
            }
        }
    }
}

/// A foundation, enhancer or block mixed into a drug at a given level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugComponent {
    id: Uuid,
    source_id: Uuid,
    name: String,
    category: DrugComponentCategory,
    level: i32,
    limit: u32,
    cost: String,
    availability: String,
    addiction_threshold: i32,
    addiction_rating: i32,
    effects: Vec<DrugEffect>,
    source: String,
    page: String,
    #[serde(skip)]
    cache: DrugComponentCache,
}

impl DrugComponent {
    pub fn from_definition(definition: &DrugComponentDef, level: i32) -> Self {
        let mut component = Self {
            id: Uuid::new_v4(),
            source_id: definition.id,
            name: definition.name.clone(),
            category: definition.category,
            level: 1,
            limit: definition.limit,
            cost: definition.cost.clone(),
            availability: definition.availability.clone(),
            addiction_threshold: definition.addiction_threshold,
            addiction_rating: definition.addiction_rating,
            effects: definition.effects.clone(),
            source: definition.source.clone(),
            page: definition.page.clone(),
            cache: DrugComponentCache::default(),
        };
        component.level = level.clamp(1, component.max_level());
        component
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source_id(&self) -> Uuid {
        self.source_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> DrugComponentCategory {
        self.category
    }

    /// 1-based; also the `Rating` seen by the component's expressions.
    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn max_level(&self) -> i32 {
        (self.effects.len() as i32).max(1)
    }

    /// How many copies of this component one drug may contain.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn addiction_threshold(&self) -> i32 {
        self.addiction_threshold
    }

    pub fn addiction_rating(&self) -> i32 {
        self.addiction_rating
    }

    pub fn effects(&self) -> &[DrugEffect] {
        &self.effects
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn active_effect(&self) -> Option<&DrugEffect> {
        if self.effects.is_empty() {
            return None;
        }
        let index = self.level.clamp(1, self.effects.len() as i32) - 1;
        self.effects.get(index as usize)
    }

    /// Clamp to the defined levels; returns the level actually applied.
    pub fn set_level(&mut self, level: i32) -> i32 {
        let level = level.clamp(1, self.max_level());
        if level != self.level {
            self.level = level;
            self.invalidate(Change::Rating);
        }
        self.level
    }

    fn context(&self, attributes: &AttributeSnapshot) -> EvalContext {
        EvalContext::new(self.level)
            .with_max_rating(self.max_level())
            .with_attributes(attributes)
    }

    pub fn cost(&self, attributes: &AttributeSnapshot) -> Decimal {
        *self
            .cache
            .cost
            .get_or_compute(|| evaluate_decimal(&self.cost, &self.context(attributes)).value)
    }

    pub fn availability(&self, attributes: &AttributeSnapshot) -> AvailabilityValue {
        self.cache.availability.get_cloned(|| {
            let mut availability = evaluate_availability(&self.availability, &self.context(attributes));
            availability.add_to_parent = true;
            availability
        })
    }

    pub fn invalidate(&mut self, change: Change) {
        self.cache.invalidate(change);
    }

    pub fn is_cached(&self, field: DrugComponentField) -> bool {
        match field {
            DrugComponentField::Cost => self.cache.cost.is_set(),
            DrugComponentField::Availability => self.cache.availability.is_set(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::AvailSuffix;

    fn alertness() -> DrugComponentDef {
        serde_json::from_str(
            r#"{
                "id": "5e5c2a4f-0a6e-4a8f-9d1b-0c7d1c2b9a01",
                "name": "Alertness",
                "category": "Enhancer",
                "limit": 1,
                "cost": "Rating * 300",
                "availability": "FixedValues(4R,6R,8F)",
                "effects": [
                    { "limits": { "Mental": 1 } },
                    { "limits": { "Mental": 2 } },
                    { "limits": { "Mental": 3 }, "infos": ["Sleep is optional"] }
                ]
            }"#,
        )
        .expect("parse component definition")
    }

    #[test]
    fn test_level_selects_effect() {
        let mut component = DrugComponent::from_definition(&alertness(), 2);
        assert_eq!(component.active_effect().map(|e| e.limits[&LimitKind::Mental]), Some(2));

        assert_eq!(component.set_level(9), 3);
        assert_eq!(component.active_effect().map(|e| e.infos.len()), Some(1));
        assert_eq!(component.set_level(0), 1);
    }

    #[test]
    fn test_level_change_invalidates_cost() {
        let attributes = AttributeSnapshot::default();
        let mut component = DrugComponent::from_definition(&alertness(), 1);
        assert_eq!(component.cost(&attributes), Decimal::from(300));
        assert!(component.is_cached(DrugComponentField::Cost));

        component.set_level(3);
        assert!(!component.is_cached(DrugComponentField::Cost));
        assert_eq!(component.cost(&attributes), Decimal::from(900));

        let availability = component.availability(&attributes);
        assert_eq!(availability.value, 8);
        assert_eq!(availability.suffix, AvailSuffix::Forbidden);
    }
}
