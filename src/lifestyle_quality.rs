use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

use crate::arena::Handle;
use crate::attributes::AttributeSnapshot;
use crate::cache::{Cached, Change};
use crate::context::EvalContext;
use crate::definitions::LifestyleQualityDef;
use crate::improvement::{Improvement, ImprovementSource, ImprovementSpec, SourceKind};
use crate::lifestyle::Lifestyle;
use crate::prompt::{UserPrompt, resolve_variable};
use crate::rules::evaluate_decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum LifestyleQualityCategory {
    Positive,
    Negative,
    #[strum(serialize = "Entertainment - Asset")]
    #[serde(rename = "Entertainment - Asset")]
    EntertainmentAsset,
    #[strum(serialize = "Entertainment - Service")]
    #[serde(rename = "Entertainment - Service")]
    EntertainmentService,
    #[strum(serialize = "Entertainment - Outing")]
    #[serde(rename = "Entertainment - Outing")]
    EntertainmentOuting,
    Contracts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifestyleQualityField {
    CostFree,
    Cost,
    LpCost,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct LifestyleQualityCache {
    cost_free: Cached<bool>,
    cost: Cached<Decimal>,
    lp_cost: Cached<i32>,
}

impl LifestyleQualityCache {
    fn invalidate(&mut self, change: Change) {
        match change {
            Change::Rating | Change::Children => {}
            Change::Attributes => self.cost.invalidate(),
            Change::Parent | Change::Flags | Change::Definition => *self = Self::default(),
        }
    }
}

/// A quality, entertainment or contract attached to a lifestyle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifestyleQuality {
    id: Uuid,
    source_id: Uuid,
    name: String,
    extra: String,
    category: LifestyleQualityCategory,
    lp: i32,
    cost: String,
    multiplier: i32,
    base_multiplier: i32,
    allowed_free_lifestyles: Vec<String>,
    free: bool,
    use_lp_cost: bool,
    bonus: Vec<ImprovementSpec>,
    lifestyle: Option<Handle<Lifestyle>>,
    source: String,
    page: String,
    pub notes: String,
    #[serde(skip)]
    cache: LifestyleQualityCache,
}

impl LifestyleQuality {
    /// Build from a definition; a `Variable(...)` cost is settled through `prompt` here, once.
    pub fn from_definition(definition: &LifestyleQualityDef, prompt: &dyn UserPrompt) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id: definition.id,
            name: definition.name.clone(),
            extra: String::new(),
            category: definition.category,
            lp: definition.lp,
            cost: resolve_variable(prompt, &definition.name, &definition.cost),
            multiplier: definition.multiplier,
            base_multiplier: definition.base_multiplier,
            allowed_free_lifestyles: definition.allowed_free_lifestyles.clone(),
            free: false,
            use_lp_cost: true,
            bonus: definition.bonus.clone(),
            lifestyle: None,
            source: definition.source.clone(),
            page: definition.page.clone(),
            notes: String::new(),
            cache: LifestyleQualityCache::default(),
        }
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

    pub fn extra(&self) -> &str {
        &self.extra
    }

    pub fn set_extra(&mut self, extra: impl Into<String>) {
        self.extra = extra.into();
    }

    pub fn category(&self) -> LifestyleQualityCategory {
        self.category
    }

    pub fn is_contract(&self) -> bool {
        self.category == LifestyleQualityCategory::Contracts
    }

    pub fn lp(&self) -> i32 {
        self.lp
    }

    pub fn multiplier(&self) -> i32 {
        self.multiplier
    }

    pub fn base_multiplier(&self) -> i32 {
        self.base_multiplier
    }

    pub fn is_free(&self) -> bool {
        self.free
    }

    pub fn uses_lp_cost(&self) -> bool {
        self.use_lp_cost
    }

    pub fn lifestyle(&self) -> Option<Handle<Lifestyle>> {
        self.lifestyle
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn improvement_source(&self) -> ImprovementSource {
        ImprovementSource::new(SourceKind::LifestyleQuality, self.id)
    }

    pub fn set_free(&mut self, free: bool) {
        if self.free != free {
            self.free = free;
            self.invalidate(Change::Flags);
        }
    }

    pub fn set_use_lp_cost(&mut self, use_lp_cost: bool) {
        if self.use_lp_cost != use_lp_cost {
            self.use_lp_cost = use_lp_cost;
            self.invalidate(Change::Flags);
        }
    }

    pub(crate) fn set_lifestyle(&mut self, lifestyle: Option<Handle<Lifestyle>>) {
        self.lifestyle = lifestyle;
        self.invalidate(Change::Parent);
    }

    fn context(&self, lifestyle: Option<&Lifestyle>, attributes: &AttributeSnapshot) -> EvalContext {
        EvalContext::new(0)
            .with_optional(
                "Lifestyle Cost",
                lifestyle.and_then(|parent| parent.cost().to_f64()),
            )
            .with_optional("Roommates", lifestyle.map(|parent| f64::from(parent.roommates())))
            .with_attributes(attributes)
    }

    /// Free by flag, or because the parent's base lifestyle includes it.
    pub fn cost_free(&self, lifestyle: Option<&Lifestyle>) -> bool {
        *self.cache.cost_free.get_or_compute(|| {
            self.free
                || lifestyle.is_some_and(|parent| {
                    self.allowed_free_lifestyles
                        .iter()
                        .any(|allowed| allowed == parent.base_lifestyle())
                })
        })
    }

    /// Monthly nuyen cost.
    pub fn cost(&self, lifestyle: Option<&Lifestyle>, attributes: &AttributeSnapshot) -> Decimal {
        *self.cache.cost.get_or_compute(|| {
            if self.cost_free(lifestyle) {
                Decimal::ZERO
            } else {
                evaluate_decimal(&self.cost, &self.context(lifestyle, attributes)).value
            }
        })
    }

    /// Lifestyle points consumed; negative qualities give points back.
    pub fn lp_cost(&self, lifestyle: Option<&Lifestyle>) -> i32 {
        *self.cache.lp_cost.get_or_compute(|| {
            if self.cost_free(lifestyle) || !self.use_lp_cost {
                0
            } else {
                self.lp
            }
        })
    }

    pub(crate) fn improvements(
        &self,
        lifestyle: Option<&Lifestyle>,
        attributes: &AttributeSnapshot,
    ) -> Vec<Improvement> {
        let context = self.context(lifestyle, attributes);
        self.bonus
            .iter()
            .map(|bonus| bonus.evaluate(self.improvement_source(), &context))
            .collect()
    }

    pub fn invalidate(&mut self, change: Change) {
        self.cache.invalidate(change);
    }

    pub fn is_cached(&self, field: LifestyleQualityField) -> bool {
        match field {
            LifestyleQualityField::CostFree => self.cache.cost_free.is_set(),
            LifestyleQualityField::Cost => self.cache.cost.is_set(),
            LifestyleQualityField::LpCost => self.cache.lp_cost.is_set(),
        }
    }
}

impl fmt::Display for LifestyleQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.extra.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, self.extra)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LifestyleQualityView<'a> {
    pub quality: &'a LifestyleQuality,
    pub lifestyle: Option<&'a Lifestyle>,
    pub attributes: &'a AttributeSnapshot,
}

impl LifestyleQualityView<'_> {
    pub fn cost_free(&self) -> bool {
        self.quality.cost_free(self.lifestyle)
    }

    pub fn cost(&self) -> Decimal {
        self.quality.cost(self.lifestyle, self.attributes)
    }

    pub fn lp_cost(&self) -> i32 {
        self.quality.lp_cost(self.lifestyle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{DEFAULT_LANGUAGE, DefinitionStore};
    use crate::prompt::AutoPrompt;

    fn store() -> DefinitionStore {
        DefinitionStore::from_embedded(DEFAULT_LANGUAGE).expect("embedded data")
    }

    #[test]
    fn test_free_in_allowed_lifestyle() {
        let store = store();
        let mut quality = LifestyleQuality::from_definition(
            store.lifestyle_quality("Gym").expect("gym"),
            &AutoPrompt,
        );
        let high = Lifestyle::from_definition(store.lifestyle("High").expect("high"));
        let low = Lifestyle::from_definition(store.lifestyle("Low").expect("low"));
        let attributes = AttributeSnapshot::default();

        assert!(quality.cost_free(Some(&high)));
        assert_eq!(quality.cost(Some(&high), &attributes), Decimal::ZERO);
        assert_eq!(quality.lp_cost(Some(&high)), 0);

        // Moving to another lifestyle is a parent change.
        quality.invalidate(Change::Parent);
        assert!(!quality.is_cached(LifestyleQualityField::CostFree));
        assert!(!quality.cost_free(Some(&low)));
        assert!(quality.cost(Some(&low), &attributes) > Decimal::ZERO);
        assert_eq!(quality.lp_cost(Some(&low)), quality.lp());
    }

    #[test]
    fn test_flags_invalidate_derived_values() {
        let store = store();
        let mut quality = LifestyleQuality::from_definition(
            store.lifestyle_quality("Gym").expect("gym"),
            &AutoPrompt,
        );
        let low = Lifestyle::from_definition(store.lifestyle("Low").expect("low"));
        assert_eq!(quality.lp_cost(Some(&low)), quality.lp());
        assert!(quality.is_cached(LifestyleQualityField::LpCost));

        quality.set_use_lp_cost(false);
        assert!(!quality.is_cached(LifestyleQualityField::LpCost));
        assert_eq!(quality.lp_cost(Some(&low)), 0);

        quality.set_free(true);
        assert_eq!(quality.cost(Some(&low), &AttributeSnapshot::default()), Decimal::ZERO);
    }

    #[test]
    fn test_display_includes_extra() {
        let store = store();
        let mut quality = LifestyleQuality::from_definition(
            store.lifestyle_quality("Dangerous Area").expect("quality"),
            &AutoPrompt,
        );
        assert_eq!(quality.to_string(), "Dangerous Area");
        quality.set_extra("Redmond Barrens");
        assert_eq!(quality.to_string(), "Dangerous Area (Redmond Barrens)");
    }
}
