use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::arena::{Arena, Handle};
use crate::attributes::AttributeSnapshot;
use crate::definitions::LifestyleDef;
use crate::lifestyle_quality::{LifestyleQuality, LifestyleQualityView};

/// A lifestyle the character pays for each month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lifestyle {
    id: Uuid,
    source_id: Uuid,
    name: String,
    base_lifestyle: String, // Name of the lifestyle definition (Low, Middle, ...).
    cost: Decimal,          // Base monthly cost.
    lp: i32,                // Lifestyle points granted by the base lifestyle.
    roommates: u32,
    percentage: Decimal, // Share of the cost this character pays.
    qualities: Vec<Handle<LifestyleQuality>>,
    source: String,
    page: String,
    pub notes: String,
}

impl Lifestyle {
    pub fn from_definition(definition: &LifestyleDef) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id: definition.id,
            name: definition.name.clone(),
            base_lifestyle: definition.name.clone(),
            cost: definition.cost,
            lp: definition.lp,
            roommates: 0,
            percentage: definition.percentage,
            qualities: Vec::new(),
            source: definition.source.clone(),
            page: definition.page.clone(),
            notes: String::new(),
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

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn base_lifestyle(&self) -> &str {
        &self.base_lifestyle
    }

    pub fn cost(&self) -> Decimal {
        self.cost
    }

    pub fn lp(&self) -> i32 {
        self.lp
    }

    pub fn roommates(&self) -> u32 {
        self.roommates
    }

    pub fn percentage(&self) -> Decimal {
        self.percentage
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn qualities(&self) -> &[Handle<LifestyleQuality>] {
        &self.qualities
    }

    // Changing these fields affects every attached quality; the character
    // owning both arenas is responsible for invalidating them.
    pub(crate) fn set_roommates(&mut self, roommates: u32) {
        self.roommates = roommates;
    }

    pub(crate) fn set_percentage(&mut self, percentage: Decimal) {
        self.percentage = percentage.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
    }

    pub(crate) fn attach(&mut self, quality: Handle<LifestyleQuality>) {
        if !self.qualities.contains(&quality) {
            self.qualities.push(quality);
        }
    }

    pub(crate) fn detach(&mut self, quality: Handle<LifestyleQuality>) {
        self.qualities.retain(|attached| *attached != quality);
    }

    fn attached<'a>(
        &'a self,
        qualities: &'a Arena<LifestyleQuality>,
    ) -> impl Iterator<Item = &'a LifestyleQuality> + 'a {
        self.qualities.iter().filter_map(|handle| qualities.get(*handle))
    }

    pub fn used_lp(&self, qualities: &Arena<LifestyleQuality>) -> i32 {
        self.attached(qualities)
            .map(|quality| quality.lp_cost(Some(self)))
            .sum()
    }

    pub fn remaining_lp(&self, qualities: &Arena<LifestyleQuality>) -> i32 {
        self.lp - self.used_lp(qualities)
    }

    /// Monthly cost.
    ///
    /// Base multipliers and the character's lifestyle-cost improvements scale
    /// the base cost. Quality costs are added, the result is scaled by quality
    /// multipliers, roommates (+10% each) and the paid percentage. Contracts
    /// are added last at full price.
    pub fn monthly_cost(
        &self,
        qualities: &Arena<LifestyleQuality>,
        attributes: &AttributeSnapshot,
        cost_improvement: i32,
    ) -> Decimal {
        let mut base_percent = Decimal::ONE_HUNDRED + Decimal::from(cost_improvement);
        let mut percent = Decimal::ONE_HUNDRED;
        let mut extras = Decimal::ZERO;
        let mut contracts = Decimal::ZERO;

        for quality in self.attached(qualities) {
            let cost = quality.cost(Some(self), attributes);
            if quality.is_contract() {
                contracts += cost;
                continue;
            }
            extras += cost;
            if !quality.cost_free(Some(self)) {
                base_percent += Decimal::from(quality.base_multiplier());
                percent += Decimal::from(quality.multiplier());
            }
        }

        let mut total = self.cost * base_percent / Decimal::ONE_HUNDRED + extras;
        total = total * percent / Decimal::ONE_HUNDRED;
        total *= Decimal::ONE + Decimal::new(i64::from(self.roommates), 1);
        total = total * self.percentage / Decimal::ONE_HUNDRED;
        (total + contracts).round_dp(2)
    }
}

/// Read-only view of a lifestyle with its qualities and the owner's attributes.
#[derive(Debug, Clone, Copy)]
pub struct LifestyleView<'a> {
    pub lifestyle: &'a Lifestyle,
    pub qualities: &'a Arena<LifestyleQuality>,
    pub attributes: &'a AttributeSnapshot,
    pub cost_improvement: i32,
}

impl<'a> LifestyleView<'a> {
    pub fn monthly_cost(&self) -> Decimal {
        self.lifestyle
            .monthly_cost(self.qualities, self.attributes, self.cost_improvement)
    }

    pub fn used_lp(&self) -> i32 {
        self.lifestyle.used_lp(self.qualities)
    }

    pub fn remaining_lp(&self) -> i32 {
        self.lifestyle.remaining_lp(self.qualities)
    }

    pub fn qualities(&self) -> impl Iterator<Item = LifestyleQualityView<'a>> + 'a {
        let view = *self;
        view.lifestyle.qualities.iter().filter_map(move |handle| {
            view.qualities.get(*handle).map(|quality| LifestyleQualityView {
                quality,
                lifestyle: Some(view.lifestyle),
                attributes: view.attributes,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{DEFAULT_LANGUAGE, DefinitionStore};
    use crate::prompt::AutoPrompt;
    use pretty_assertions::assert_eq;

    fn store() -> DefinitionStore {
        DefinitionStore::from_embedded(DEFAULT_LANGUAGE).expect("embedded data")
    }

    fn attach(
        store: &DefinitionStore,
        lifestyle: &mut Lifestyle,
        qualities: &mut Arena<LifestyleQuality>,
        name: &str,
    ) -> Handle<LifestyleQuality> {
        let definition = store.lifestyle_quality(name).expect("quality");
        let handle = qualities.insert(LifestyleQuality::from_definition(definition, &AutoPrompt));
        lifestyle.attach(handle);
        handle
    }

    #[test]
    fn test_base_cost_without_qualities() {
        let store = store();
        let lifestyle = Lifestyle::from_definition(store.lifestyle("Low").expect("low"));
        let qualities = Arena::new();
        assert_eq!(
            lifestyle.monthly_cost(&qualities, &AttributeSnapshot::default(), 0),
            Decimal::from(2000)
        );
    }

    #[test]
    fn test_roommates_percentage_and_contracts() {
        let store = store();
        let mut lifestyle = Lifestyle::from_definition(store.lifestyle("Low").expect("low"));
        let mut qualities = Arena::new();
        attach(&store, &mut lifestyle, &mut qualities, "Dangerous Area");
        attach(&store, &mut lifestyle, &mut qualities, "DocWagon Basic Contract");

        lifestyle.set_roommates(1);
        lifestyle.set_percentage(Decimal::from(50));

        // (2000 * 0.8) * 1.1 * 0.5 + 417
        assert_eq!(
            lifestyle.monthly_cost(&qualities, &AttributeSnapshot::default(), 0),
            Decimal::from(880 + 417)
        );
    }

    #[test]
    fn test_lifestyle_points() {
        let store = store();
        let mut lifestyle = Lifestyle::from_definition(store.lifestyle("Middle").expect("middle"));
        let mut qualities = Arena::new();
        attach(&store, &mut lifestyle, &mut qualities, "Gym");
        attach(&store, &mut lifestyle, &mut qualities, "Dangerous Area");

        let gym = store.lifestyle_quality("Gym").expect("gym").lp;
        let area = store.lifestyle_quality("Dangerous Area").expect("area").lp;
        assert_eq!(lifestyle.used_lp(&qualities), gym + area);
        assert_eq!(lifestyle.remaining_lp(&qualities), lifestyle.lp() - gym - area);
    }
}
