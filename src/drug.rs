use derive_more::Display;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::attributes::{Attribute, AttributeSnapshot, LimitKind};
use crate::cache::{Cached, Change};
use crate::context::EvalContext;
use crate::definitions::{DefinitionStore, DrugDef};
use crate::drug_component::{DrugComponent, DrugComponentCategory, DrugEffect, DurationTimescale};
use crate::error::GearError;
use crate::improvement::ImprovementKind;
use crate::rules::{AvailabilityValue, evaluate_availability, evaluate_decimal};

/// How long a dose lasts: `multiplier × dice D6` in `timescale` units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
#[display("{multiplier} × {dice}D6 {timescale}")]
pub struct DrugDuration {
    pub multiplier: i32,
    pub dice: i32,
    pub timescale: DurationTimescale,
}

impl DrugDuration {
    pub fn roll(&self, rng: &mut impl Rng) -> i32 {
        if self.dice <= 0 {
            return self.multiplier;
        }
        let total: i32 = (0..self.dice).map(|_| rng.random_range(1..=6)).sum();
        self.multiplier * total
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrugField {
    Cost,
    Availability,
    Duration,
    Speed,
    AddictionThreshold,
    AddictionRating,
    Attributes,
    Limits,
    Initiative,
    InitiativeDice,
    CrashDamage,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct DrugCache {
    cost: Cached<Decimal>,
    availability: Cached<AvailabilityValue>,
    duration: Cached<DrugDuration>,
    speed: Cached<i32>,
    addiction_threshold: Cached<i32>,
    addiction_rating: Cached<i32>,
    attributes: Cached<BTreeMap<Attribute, i32>>,
    limits: Cached<BTreeMap<LimitKind, i32>>,
    initiative: Cached<i32>,
    initiative_dice: Cached<i32>,
    crash_damage: Cached<i32>,
}

impl DrugCache {
    fn invalidate(&mut self, change: Change) {
        match change {
            Change::Parent | Change::Flags => {}
            // Only the expression-driven values read attributes.
            Change::Attributes | Change::Rating => {
                self.cost.invalidate();
                self.availability.invalidate();
            }
            Change::Children | Change::Definition => *self = Self::default(),
        }
    }
}

/// A drug: premade or custom, built from components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drug {
    id: Uuid,
    source_id: Option<Uuid>,
    name: String,
    category: String,
    cost: String,
    availability: String,
    quantity: Decimal,
    addiction_threshold: i32,
    addiction_rating: i32,
    components: Vec<DrugComponent>,
    active: bool,
    source: String,
    page: String,
    pub notes: String,
    #[serde(skip)]
    cache: DrugCache,
}

impl Drug {
    /// An empty custom drug to be assembled component by component.
    pub fn custom(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id: None,
            name: name.into(),
            category: String::from("Custom Drug"),
            cost: String::from("0"),
            availability: String::from("0"),
            quantity: Decimal::ONE,
            addiction_threshold: 0,
            addiction_rating: 0,
            components: Vec::new(),
            active: false,
            source: String::new(),
            page: String::new(),
            notes: String::new(),
            cache: DrugCache::default(),
        }
    }

    pub fn from_definition(definition: &DrugDef, store: &DefinitionStore) -> Result<Self, GearError> {
        let mut drug = Self::custom(definition.name.clone());
        drug.source_id = Some(definition.id);
        drug.category = definition.category.clone();
        drug.cost = definition.cost.clone();
        drug.availability = definition.availability.clone();
        drug.addiction_threshold = definition.addiction_threshold;
        drug.addiction_rating = definition.addiction_rating;
        drug.source = definition.source.clone();
        drug.page = definition.page.clone();

        for reference in &definition.components {
            let component_def = store.drug_component(&reference.name)?;
            drug.add_component(DrugComponent::from_definition(component_def, reference.level))?;
        }
        Ok(drug)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source_id(&self) -> Option<Uuid> {
        self.source_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn components(&self) -> &[DrugComponent] {
        &self.components
    }

    pub fn component(&self, id: Uuid) -> Option<&DrugComponent> {
        self.components.iter().find(|component| component.id() == id)
    }

    /// Add a component, enforcing the single foundation and per-component limits.
    pub fn add_component(&mut self, component: DrugComponent) -> Result<Uuid, GearError> {
        if component.category() == DrugComponentCategory::Foundation
            && self
                .components
                .iter()
                .any(|existing| existing.category() == DrugComponentCategory::Foundation)
        {
            return Err(GearError::DuplicateFoundation);
        }

        let copies = self
            .components
            .iter()
            .filter(|existing| existing.source_id() == component.source_id())
            .count() as u32;
        if copies >= component.limit() {
            return Err(GearError::ComponentLimit {
                name: component.name().to_string(),
                limit: component.limit(),
            });
        }

        let id = component.id();
        log::debug!("Adding {} (level {}) to {}", component.name(), component.level(), self.name);
        self.components.push(component);
        self.invalidate(Change::Children);
        Ok(id)
    }

    pub fn remove_component(&mut self, id: Uuid) -> Option<DrugComponent> {
        let index = self.components.iter().position(|component| component.id() == id)?;
        let component = self.components.remove(index);
        self.invalidate(Change::Children);
        Some(component)
    }

    pub fn set_component_level(&mut self, id: Uuid, level: i32) -> Result<i32, GearError> {
        let component = self
            .components
            .iter_mut()
            .find(|component| component.id() == id)
            .ok_or(GearError::InvalidHandle("drug component"))?;
        let applied = component.set_level(level);
        self.invalidate(Change::Children);
        Ok(applied)
    }

    pub fn set_quantity(&mut self, quantity: Decimal) {
        self.quantity = quantity.max(Decimal::ZERO);
        self.invalidate(Change::Flags);
    }

    fn context(&self, attributes: &AttributeSnapshot) -> EvalContext {
        EvalContext::new(0).with_attributes(attributes)
    }

    // Active effect of every component, in component order.
    fn active_effects(&self) -> impl Iterator<Item = &DrugEffect> {
        self.components.iter().filter_map(DrugComponent::active_effect)
    }

    /// Cost of a single dose.
    pub fn cost(&self, attributes: &AttributeSnapshot) -> Decimal {
        *self.cache.cost.get_or_compute(|| {
            let own = evaluate_decimal(&self.cost, &self.context(attributes)).value;
            own + self
                .components
                .iter()
                .map(|component| component.cost(attributes))
                .sum::<Decimal>()
        })
    }

    pub fn total_cost(&self, attributes: &AttributeSnapshot) -> Decimal {
        self.cost(attributes) * self.quantity
    }

    pub fn availability(&self, attributes: &AttributeSnapshot) -> AvailabilityValue {
        self.cache.availability.get_cloned(|| {
            let mut total = evaluate_availability(&self.availability, &self.context(attributes));
            for component in &self.components {
                total += component.availability(attributes);
            }
            total
        })
    }

    pub fn addiction_threshold(&self) -> i32 {
        *self.cache.addiction_threshold.get_or_compute(|| {
            self.addiction_threshold
                + self
                    .components
                    .iter()
                    .map(DrugComponent::addiction_threshold)
                    .sum::<i32>()
        })
    }

    pub fn addiction_rating(&self) -> i32 {
        *self.cache.addiction_rating.get_or_compute(|| {
            self.addiction_rating
                + self
                    .components
                    .iter()
                    .map(DrugComponent::addiction_rating)
                    .sum::<i32>()
        })
    }

    pub fn duration(&self) -> DrugDuration {
        *self.cache.duration.get_or_compute(|| {
            let mut duration = DrugDuration::default();
            for effect in self.active_effects() {
                duration.multiplier += effect.duration;
                duration.dice += effect.duration_dice;
                if let Some(timescale) = effect.timescale {
                    duration.timescale = duration.timescale.max(timescale);
                }
            }
            if duration.multiplier == 0 && duration.dice > 0 {
                duration.multiplier = 1;
            }
            duration
        })
    }

    /// Onset time in combat turns, never below zero.
    pub fn speed(&self) -> i32 {
        *self
            .cache
            .speed
            .get_or_compute(|| self.active_effects().map(|effect| effect.speed).sum::<i32>().max(0))
    }

    pub fn attributes(&self) -> &BTreeMap<Attribute, i32> {
        self.cache.attributes.get_or_compute(|| {
            let mut totals = BTreeMap::new();
            for effect in self.active_effects() {
                for (attribute, value) in &effect.attributes {
                    *totals.entry(*attribute).or_insert(0) += value;
                }
            }
            totals.retain(|_, value| *value != 0);
            totals
        })
    }

    pub fn limits(&self) -> &BTreeMap<LimitKind, i32> {
        self.cache.limits.get_or_compute(|| {
            let mut totals = BTreeMap::new();
            for effect in self.active_effects() {
                for (limit, value) in &effect.limits {
                    *totals.entry(*limit).or_insert(0) += value;
                }
            }
            totals.retain(|_, value| *value != 0);
            totals
        })
    }

    pub fn initiative(&self) -> i32 {
        *self
            .cache
            .initiative
            .get_or_compute(|| self.active_effects().map(|effect| effect.initiative).sum())
    }

    pub fn initiative_dice(&self) -> i32 {
        *self
            .cache
            .initiative_dice
            .get_or_compute(|| self.active_effects().map(|effect| effect.initiative_dice).sum())
    }

    pub fn crash_damage(&self) -> i32 {
        *self
            .cache
            .crash_damage
            .get_or_compute(|| self.active_effects().map(|effect| effect.crash_damage).sum())
    }

    /// Granted qualities, without duplicates.
    pub fn qualities(&self) -> Vec<&str> {
        let mut qualities: Vec<&str> = Vec::new();
        for quality in self.active_effects().flat_map(|effect| &effect.qualities) {
            if !qualities.contains(&quality.as_str()) {
                qualities.push(quality);
            }
        }
        qualities
    }

    pub fn infos(&self) -> Vec<&str> {
        self.active_effects()
            .flat_map(|effect| effect.infos.iter().map(String::as_str))
            .collect()
    }

    /// What activating a dose grants the character.
    pub fn improvement_bonuses(&self) -> Vec<(ImprovementKind, i32)> {
        let mut bonuses: Vec<(ImprovementKind, i32)> = self
            .attributes()
            .iter()
            .map(|(attribute, value)| (ImprovementKind::Attribute(*attribute), *value))
            .collect();
        bonuses.extend(
            self.limits()
                .iter()
                .map(|(limit, value)| (ImprovementKind::Limit(*limit), *value)),
        );
        if self.initiative() != 0 {
            bonuses.push((ImprovementKind::Initiative, self.initiative()));
        }
        if self.initiative_dice() != 0 {
            bonuses.push((ImprovementKind::InitiativeDice, self.initiative_dice()));
        }
        bonuses
    }

    pub fn invalidate(&mut self, change: Change) {
        if change == Change::Attributes {
            for component in &mut self.components {
                component.invalidate(change);
            }
        }
        self.cache.invalidate(change);
    }

    pub fn is_cached(&self, field: DrugField) -> bool {
        let cache = &self.cache;
        match field {
            DrugField::Cost => cache.cost.is_set(),
            DrugField::Availability => cache.availability.is_set(),
            DrugField::Duration => cache.duration.is_set(),
            DrugField::Speed => cache.speed.is_set(),
            DrugField::AddictionThreshold => cache.addiction_threshold.is_set(),
            DrugField::AddictionRating => cache.addiction_rating.is_set(),
            DrugField::Attributes => cache.attributes.is_set(),
            DrugField::Limits => cache.limits.is_set(),
            DrugField::Initiative => cache.initiative.is_set(),
            DrugField::InitiativeDice => cache.initiative_dice.is_set(),
            DrugField::CrashDamage => cache.crash_damage.is_set(),
        }
    }
}

/// Read-only view of a drug together with the attributes its expressions see.
#[derive(Debug, Clone, Copy)]
pub struct DrugView<'a> {
    pub drug: &'a Drug,
    pub attributes: &'a AttributeSnapshot,
}

impl DrugView<'_> {
    pub fn cost(&self) -> Decimal {
        self.drug.cost(self.attributes)
    }

    pub fn total_cost(&self) -> Decimal {
        self.drug.total_cost(self.attributes)
    }

    pub fn availability(&self) -> AvailabilityValue {
        self.drug.availability(self.attributes)
    }
}
