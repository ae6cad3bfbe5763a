use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use strum::IntoEnumIterator;
use uuid::Uuid;

use crate::arena::{Arena, Handle};
use crate::attributes::{Attribute, AttributeSnapshot, LimitKind};
use crate::cache::{Cached, Change};
use crate::definitions::DefinitionStore;
use crate::drug::{Drug, DrugView};
use crate::drug_component::DrugComponent;
use crate::error::GearError;
use crate::improvement::{Improvement, ImprovementKind, ImprovementSource, Improvements, SourceKind};
use crate::lifestyle::{Lifestyle, LifestyleView};
use crate::lifestyle_quality::{LifestyleQuality, LifestyleQualityView};
use crate::prompt::UserPrompt;
use crate::vehicle::{Vehicle, VehicleStat, VehicleView};
use crate::vehicle_mod::{VehicleMod, VehicleModView};

// Define the metatypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Race {
    Human,
    Elf,
    Dwarf,
    Ork,
    Troll,
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Race::Human => write!(f, "Human"),
            Race::Elf => write!(f, "Elf"),
            Race::Dwarf => write!(f, "Dwarf"),
            Race::Ork => write!(f, "Ork"),
            Race::Troll => write!(f, "Troll"),
        }
    }
}

impl Race {
    /// Natural maximum of an attribute for this metatype.
    pub fn attribute_maximum(self, attribute: Attribute) -> i32 {
        use Attribute::*;
        match (self, attribute) {
            (Race::Human, Edge) => 7,
            (Race::Elf, Agility) => 7,
            (Race::Elf, Charisma) => 8,
            (Race::Dwarf, Body) | (Race::Dwarf, Strength) => 8,
            (Race::Dwarf, Reaction) => 5,
            (Race::Dwarf, Willpower) => 7,
            (Race::Ork, Body) => 9,
            (Race::Ork, Strength) => 8,
            (Race::Ork, Logic) | (Race::Ork, Charisma) => 5,
            (Race::Troll, Body) | (Race::Troll, Strength) => 10,
            (Race::Troll, Agility) | (Race::Troll, Logic) | (Race::Troll, Intuition) => 5,
            (Race::Troll, Charisma) => 4,
            _ => 6,
        }
    }
}

// Special attributes start at 0 and are never raised by augmentation.
fn is_special(attribute: Attribute) -> bool {
    matches!(
        attribute,
        Attribute::Edge | Attribute::Magic | Attribute::Resonance | Attribute::Depth
    )
}

fn attribute_minimum(attribute: Attribute) -> i32 {
    match attribute {
        Attribute::Magic | Attribute::Resonance | Attribute::Depth => 0,
        _ => 1,
    }
}

/// A character and all the gear it owns.
///
/// Entities live in per-kind arenas and refer to each other by handle. Every
/// mutation that can affect a derived value goes through a method here, so the
/// right caches are dropped before anyone reads them again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    race: Race,
    attributes: BTreeMap<Attribute, i32>, // Base (natural) values.
    essence: f64,
    improvements: Improvements,
    drugs: Arena<Drug>,
    lifestyles: Arena<Lifestyle>,
    lifestyle_qualities: Arena<LifestyleQuality>,
    vehicles: Arena<Vehicle>,
    vehicle_mods: Arena<VehicleMod>,
    #[serde(skip)]
    snapshot: Cached<AttributeSnapshot>,
}

impl Character {
    pub fn new(name: impl Into<String>, race: Race) -> Self {
        let attributes = Attribute::iter()
            .map(|attribute| (attribute, attribute_minimum(attribute)))
            .collect();
        Self {
            name: name.into(),
            race,
            attributes,
            essence: 6.0,
            improvements: Improvements::default(),
            drugs: Arena::new(),
            lifestyles: Arena::new(),
            lifestyle_qualities: Arena::new(),
            vehicles: Arena::new(),
            vehicle_mods: Arena::new(),
            snapshot: Cached::new(),
        }
    }

    pub fn race(&self) -> Race {
        self.race
    }

    pub fn essence(&self) -> f64 {
        self.essence
    }

    pub fn set_essence(&mut self, essence: f64) {
        self.essence = essence.clamp(0.0, 6.0);
        self.attributes_changed();
    }

    pub fn attribute_base(&self, attribute: Attribute) -> i32 {
        self.attributes.get(&attribute).copied().unwrap_or(0)
    }

    /// Set a natural value, clamped to the metatype's limits. Returns the value applied.
    pub fn set_attribute(&mut self, attribute: Attribute, value: i32) -> i32 {
        let value = value.clamp(
            attribute_minimum(attribute),
            self.race.attribute_maximum(attribute),
        );
        self.attributes.insert(attribute, value);
        self.attributes_changed();
        value
    }

    fn augmented_maximum(&self, attribute: Attribute) -> i32 {
        let natural = self.race.attribute_maximum(attribute);
        if is_special(attribute) { natural } else { natural + 4 }
    }

    /// Effective values every rule expression is evaluated against.
    pub fn attribute_snapshot(&self) -> &AttributeSnapshot {
        self.snapshot.get_or_compute(|| {
            let values = Attribute::iter()
                .map(|attribute| {
                    let improved = self.attribute_base(attribute)
                        + self.improvements.total(ImprovementKind::Attribute(attribute));
                    (attribute, improved.clamp(0, self.augmented_maximum(attribute)))
                })
                .collect();
            AttributeSnapshot::new(values, self.essence)
        })
    }

    pub fn attribute(&self, attribute: Attribute) -> i32 {
        self.attribute_snapshot().get(attribute)
    }

    pub fn improvements(&self) -> &Improvements {
        &self.improvements
    }

    /// Initiative score and dice.
    pub fn initiative(&self) -> (i32, i32) {
        let score = self.attribute(Attribute::Reaction)
            + self.attribute(Attribute::Intuition)
            + self.improvements.total(ImprovementKind::Initiative);
        let dice = 1 + self.improvements.total(ImprovementKind::InitiativeDice);
        (score, dice.clamp(1, 5))
    }

    pub fn limit(&self, kind: LimitKind) -> i32 {
        let attributes = self.attribute_snapshot();
        let base = match kind {
            LimitKind::Physical => {
                (attributes.get(Attribute::Strength) * 2
                    + attributes.get(Attribute::Body)
                    + attributes.get(Attribute::Reaction)) as f64
            }
            LimitKind::Mental => {
                (attributes.get(Attribute::Logic) * 2
                    + attributes.get(Attribute::Intuition)
                    + attributes.get(Attribute::Willpower)) as f64
            }
            LimitKind::Social => {
                (attributes.get(Attribute::Charisma) * 2 + attributes.get(Attribute::Willpower))
                    as f64
                    + attributes.essence()
            }
        };
        (base / 3.0).ceil() as i32 + self.improvements.total(ImprovementKind::Limit(kind))
    }

    pub fn physical_monitor(&self) -> i32 {
        8 + (self.attribute(Attribute::Body) + 1) / 2
    }

    pub fn stun_monitor(&self) -> i32 {
        8 + (self.attribute(Attribute::Willpower) + 1) / 2
    }

    // Attribute values feed every rule expression.
    fn attributes_changed(&mut self) {
        self.snapshot.invalidate();
        for drug in self.drugs.values_mut() {
            drug.invalidate(Change::Attributes);
        }
        for quality in self.lifestyle_qualities.values_mut() {
            quality.invalidate(Change::Attributes);
        }
        for vehicle_mod in self.vehicle_mods.values_mut() {
            vehicle_mod.invalidate(Change::Attributes);
        }
    }

    fn grant(&mut self, improvements: Vec<Improvement>) {
        if improvements.is_empty() {
            return;
        }
        self.improvements.extend(improvements);
        self.attributes_changed();
    }

    fn revoke(&mut self, source: ImprovementSource) {
        if self.improvements.remove_source(source) > 0 {
            self.attributes_changed();
        }
    }

    // ---- Drugs ----

    pub fn add_drug(&mut self, store: &DefinitionStore, key: &str) -> Result<Handle<Drug>, GearError> {
        let drug = Drug::from_definition(store.drug(key)?, store)?;
        log::info!("{} gained drug {}", self.name, drug.name());
        Ok(self.drugs.insert(drug))
    }

    pub fn add_custom_drug(&mut self, name: impl Into<String>) -> Handle<Drug> {
        self.drugs.insert(Drug::custom(name))
    }

    fn drug_mut(&mut self, handle: Handle<Drug>) -> Result<&mut Drug, GearError> {
        self.drugs.get_mut(handle).ok_or(GearError::InvalidHandle("drug"))
    }

    pub fn add_drug_component(
        &mut self,
        drug: Handle<Drug>,
        store: &DefinitionStore,
        key: &str,
        level: i32,
    ) -> Result<Uuid, GearError> {
        let definition = store.drug_component(key)?;
        let id = self
            .drug_mut(drug)?
            .add_component(DrugComponent::from_definition(definition, level))?;
        self.refresh_drug(drug);
        Ok(id)
    }

    pub fn remove_drug_component(
        &mut self,
        drug: Handle<Drug>,
        component: Uuid,
    ) -> Result<DrugComponent, GearError> {
        let removed = self
            .drug_mut(drug)?
            .remove_component(component)
            .ok_or(GearError::InvalidHandle("drug component"))?;
        self.refresh_drug(drug);
        Ok(removed)
    }

    pub fn set_drug_component_level(
        &mut self,
        drug: Handle<Drug>,
        component: Uuid,
        level: i32,
    ) -> Result<i32, GearError> {
        let applied = self.drug_mut(drug)?.set_component_level(component, level)?;
        self.refresh_drug(drug);
        Ok(applied)
    }

    pub fn set_drug_quantity(&mut self, drug: Handle<Drug>, quantity: Decimal) -> Result<(), GearError> {
        self.drug_mut(drug)?.set_quantity(quantity);
        Ok(())
    }

    fn drug_improvements(drug: &Drug) -> Vec<Improvement> {
        let source = ImprovementSource::new(SourceKind::Drug, drug.id());
        drug.improvement_bonuses()
            .into_iter()
            .map(|(kind, value)| Improvement { source, kind, value })
            .collect()
    }

    /// Take a dose: the drug's effects apply until it is deactivated or removed.
    pub fn activate_drug(&mut self, drug: Handle<Drug>) -> Result<(), GearError> {
        let item = self.drug_mut(drug)?;
        if item.is_active() {
            return Ok(());
        }
        item.set_active(true);
        let granted = Self::drug_improvements(item);
        log::info!("{} activated {}", self.name, self.drugs.get(drug).map_or("", Drug::name));
        self.grant(granted);
        Ok(())
    }

    pub fn deactivate_drug(&mut self, drug: Handle<Drug>) -> Result<(), GearError> {
        let item = self.drug_mut(drug)?;
        item.set_active(false);
        let source = ImprovementSource::new(SourceKind::Drug, item.id());
        self.revoke(source);
        Ok(())
    }

    // Re-apply an active drug's improvements after its components changed.
    fn refresh_drug(&mut self, drug: Handle<Drug>) {
        let Some(item) = self.drugs.get(drug).filter(|item| item.is_active()) else {
            return;
        };
        let source = ImprovementSource::new(SourceKind::Drug, item.id());
        let granted = Self::drug_improvements(item);
        self.improvements.remove_source(source);
        self.improvements.extend(granted);
        self.attributes_changed();
    }

    /// Remove a drug, asking first when `confirm` is set. Returns whether it was removed.
    pub fn remove_drug(
        &mut self,
        drug: Handle<Drug>,
        prompt: &dyn UserPrompt,
        confirm: bool,
    ) -> Result<bool, GearError> {
        let item = self.drugs.get(drug).ok_or(GearError::InvalidHandle("drug"))?;
        if confirm && !prompt.confirm_delete(item.name()) {
            return Ok(false);
        }
        let source = ImprovementSource::new(SourceKind::Drug, item.id());
        self.drugs.remove(drug);
        self.revoke(source);
        Ok(true)
    }

    pub fn drug(&self, drug: Handle<Drug>) -> Option<DrugView<'_>> {
        let attributes = self.attribute_snapshot();
        self.drugs.get(drug).map(|drug| DrugView { drug, attributes })
    }

    pub fn drugs(&self) -> impl Iterator<Item = (Handle<Drug>, DrugView<'_>)> {
        let attributes = self.attribute_snapshot();
        self.drugs
            .iter()
            .map(move |(handle, drug)| (handle, DrugView { drug, attributes }))
    }

    // ---- Lifestyles ----

    pub fn add_lifestyle(
        &mut self,
        store: &DefinitionStore,
        key: &str,
    ) -> Result<Handle<Lifestyle>, GearError> {
        let lifestyle = Lifestyle::from_definition(store.lifestyle(key)?);
        log::info!("{} moved into a {} lifestyle", self.name, lifestyle.name());
        Ok(self.lifestyles.insert(lifestyle))
    }

    pub fn add_lifestyle_quality(
        &mut self,
        lifestyle: Handle<Lifestyle>,
        store: &DefinitionStore,
        key: &str,
        prompt: &dyn UserPrompt,
    ) -> Result<Handle<LifestyleQuality>, GearError> {
        let definition = store.lifestyle_quality(key)?;
        if !self.lifestyles.contains(lifestyle) {
            return Err(GearError::InvalidHandle("lifestyle"));
        }

        let mut quality = LifestyleQuality::from_definition(definition, prompt);
        quality.set_lifestyle(Some(lifestyle));
        let handle = self.lifestyle_qualities.insert(quality);
        if let Some(parent) = self.lifestyles.get_mut(lifestyle) {
            parent.attach(handle);
        }

        let granted = match self.lifestyle_qualities.get(handle) {
            Some(quality) => quality.improvements(self.lifestyles.get(lifestyle), self.attribute_snapshot()),
            None => Vec::new(),
        };
        self.grant(granted);
        Ok(handle)
    }

    fn lifestyle_mut(&mut self, lifestyle: Handle<Lifestyle>) -> Result<&mut Lifestyle, GearError> {
        self.lifestyles
            .get_mut(lifestyle)
            .ok_or(GearError::InvalidHandle("lifestyle"))
    }

    fn invalidate_qualities(&mut self, qualities: &[Handle<LifestyleQuality>], change: Change) {
        for handle in qualities {
            if let Some(quality) = self.lifestyle_qualities.get_mut(*handle) {
                quality.invalidate(change);
            }
        }
    }

    pub fn set_lifestyle_roommates(&mut self, lifestyle: Handle<Lifestyle>, roommates: u32) -> Result<(), GearError> {
        let parent = self.lifestyle_mut(lifestyle)?;
        parent.set_roommates(roommates);
        let attached = parent.qualities().to_vec();
        self.invalidate_qualities(&attached, Change::Parent);
        Ok(())
    }

    pub fn set_lifestyle_percentage(
        &mut self,
        lifestyle: Handle<Lifestyle>,
        percentage: Decimal,
    ) -> Result<(), GearError> {
        let parent = self.lifestyle_mut(lifestyle)?;
        parent.set_percentage(percentage);
        let attached = parent.qualities().to_vec();
        self.invalidate_qualities(&attached, Change::Parent);
        Ok(())
    }

    pub fn lifestyle_quality_mut(&mut self, quality: Handle<LifestyleQuality>) -> Option<&mut LifestyleQuality> {
        self.lifestyle_qualities.get_mut(quality)
    }

    pub fn remove_lifestyle_quality(
        &mut self,
        quality: Handle<LifestyleQuality>,
        prompt: &dyn UserPrompt,
        confirm: bool,
    ) -> Result<bool, GearError> {
        let item = self
            .lifestyle_qualities
            .get(quality)
            .ok_or(GearError::InvalidHandle("lifestyle quality"))?;
        if confirm && !prompt.confirm_delete(&item.to_string()) {
            return Ok(false);
        }
        let source = item.improvement_source();
        let parent = item.lifestyle();

        self.lifestyle_qualities.remove(quality);
        if let Some(lifestyle) = parent.and_then(|parent| self.lifestyles.get_mut(parent)) {
            lifestyle.detach(quality);
        }
        self.revoke(source);
        Ok(true)
    }

    /// Remove a lifestyle together with its qualities.
    pub fn remove_lifestyle(
        &mut self,
        lifestyle: Handle<Lifestyle>,
        prompt: &dyn UserPrompt,
        confirm: bool,
    ) -> Result<bool, GearError> {
        let item = self
            .lifestyles
            .get(lifestyle)
            .ok_or(GearError::InvalidHandle("lifestyle"))?;
        if confirm && !prompt.confirm_delete(item.name()) {
            return Ok(false);
        }
        let attached = item.qualities().to_vec();
        self.lifestyles.remove(lifestyle);
        for handle in attached {
            if let Some(quality) = self.lifestyle_qualities.remove(handle) {
                self.revoke(quality.improvement_source());
            }
        }
        Ok(true)
    }

    pub fn lifestyle(&self, lifestyle: Handle<Lifestyle>) -> Option<LifestyleView<'_>> {
        let attributes = self.attribute_snapshot();
        let cost_improvement = self.improvements.total(ImprovementKind::LifestyleCost);
        self.lifestyles.get(lifestyle).map(|lifestyle| LifestyleView {
            lifestyle,
            qualities: &self.lifestyle_qualities,
            attributes,
            cost_improvement,
        })
    }

    pub fn lifestyles(&self) -> impl Iterator<Item = (Handle<Lifestyle>, LifestyleView<'_>)> {
        let attributes = self.attribute_snapshot();
        let cost_improvement = self.improvements.total(ImprovementKind::LifestyleCost);
        let qualities = &self.lifestyle_qualities;
        self.lifestyles.iter().map(move |(handle, lifestyle)| {
            (
                handle,
                LifestyleView {
                    lifestyle,
                    qualities,
                    attributes,
                    cost_improvement,
                },
            )
        })
    }

    pub fn lifestyle_quality(&self, quality: Handle<LifestyleQuality>) -> Option<LifestyleQualityView<'_>> {
        let attributes = self.attribute_snapshot();
        self.lifestyle_qualities
            .get(quality)
            .map(|quality| LifestyleQualityView {
                quality,
                lifestyle: quality.lifestyle().and_then(|parent| self.lifestyles.get(parent)),
                attributes,
            })
    }

    // ---- Vehicles ----

    pub fn add_vehicle(&mut self, store: &DefinitionStore, key: &str) -> Result<Handle<Vehicle>, GearError> {
        let vehicle = Vehicle::from_definition(store.vehicle(key)?);
        log::info!("{} bought a {}", self.name, vehicle.name());
        Ok(self.vehicles.insert(vehicle))
    }

    pub fn add_vehicle_mod(
        &mut self,
        vehicle: Handle<Vehicle>,
        store: &DefinitionStore,
        key: &str,
        rating: i32,
        prompt: &dyn UserPrompt,
    ) -> Result<Handle<VehicleMod>, GearError> {
        let definition = store.vehicle_mod(key)?;
        let attributes = self.attribute_snapshot().clone();
        let parent = self
            .vehicles
            .get(vehicle)
            .ok_or(GearError::InvalidHandle("vehicle"))?;

        let mut item = VehicleMod::from_definition(definition, rating, prompt, Some(parent), &attributes);
        item.set_vehicle(Some(vehicle));
        log::debug!("Installing {} (rating {}) in {}", item.name(), item.rating(), parent.name());

        let handle = self.vehicle_mods.insert(item);
        if let Some(parent) = self.vehicles.get_mut(vehicle) {
            parent.attach(handle);
        }
        Ok(handle)
    }

    /// Clamp and apply a mod's rating. Returns the rating actually applied.
    pub fn set_vehicle_mod_rating(&mut self, vehicle_mod: Handle<VehicleMod>, rating: i32) -> Result<i32, GearError> {
        let attributes = self.attribute_snapshot().clone();
        let item = self
            .vehicle_mods
            .get_mut(vehicle_mod)
            .ok_or(GearError::InvalidHandle("vehicle mod"))?;
        let parent = item.vehicle().and_then(|parent| self.vehicles.get(parent));
        Ok(item.set_rating(rating, parent, &attributes))
    }

    /// Change a stock vehicle stat; every installed mod is recomputed.
    pub fn set_vehicle_stat(&mut self, vehicle: Handle<Vehicle>, stat: VehicleStat, value: i32) -> Result<(), GearError> {
        let parent = self
            .vehicles
            .get_mut(vehicle)
            .ok_or(GearError::InvalidHandle("vehicle"))?;
        parent.set_base(stat, value);
        for handle in parent.mods().to_vec() {
            if let Some(item) = self.vehicle_mods.get_mut(handle) {
                item.invalidate(Change::Parent);
            }
        }
        Ok(())
    }

    pub fn vehicle_mod_mut(&mut self, vehicle_mod: Handle<VehicleMod>) -> Option<&mut VehicleMod> {
        self.vehicle_mods.get_mut(vehicle_mod)
    }

    pub fn remove_vehicle_mod(
        &mut self,
        vehicle_mod: Handle<VehicleMod>,
        prompt: &dyn UserPrompt,
        confirm: bool,
    ) -> Result<bool, GearError> {
        let item = self
            .vehicle_mods
            .get(vehicle_mod)
            .ok_or(GearError::InvalidHandle("vehicle mod"))?;
        if confirm && !prompt.confirm_delete(item.name()) {
            return Ok(false);
        }
        let source = ImprovementSource::new(SourceKind::VehicleMod, item.id());
        let parent = item.vehicle();

        self.vehicle_mods.remove(vehicle_mod);
        if let Some(vehicle) = parent.and_then(|parent| self.vehicles.get_mut(parent)) {
            vehicle.detach(vehicle_mod);
        }
        self.revoke(source);
        Ok(true)
    }

    /// Remove a vehicle together with its mods.
    pub fn remove_vehicle(
        &mut self,
        vehicle: Handle<Vehicle>,
        prompt: &dyn UserPrompt,
        confirm: bool,
    ) -> Result<bool, GearError> {
        let item = self
            .vehicles
            .get(vehicle)
            .ok_or(GearError::InvalidHandle("vehicle"))?;
        if confirm && !prompt.confirm_delete(item.name()) {
            return Ok(false);
        }
        let attached = item.mods().to_vec();
        self.vehicles.remove(vehicle);
        for handle in attached {
            if let Some(removed) = self.vehicle_mods.remove(handle) {
                self.revoke(ImprovementSource::new(SourceKind::VehicleMod, removed.id()));
            }
        }
        Ok(true)
    }

    pub fn vehicle(&self, vehicle: Handle<Vehicle>) -> Option<VehicleView<'_>> {
        let attributes = self.attribute_snapshot();
        self.vehicles.get(vehicle).map(|vehicle| VehicleView {
            vehicle,
            mods: &self.vehicle_mods,
            attributes,
        })
    }

    pub fn vehicles(&self) -> impl Iterator<Item = (Handle<Vehicle>, VehicleView<'_>)> {
        let attributes = self.attribute_snapshot();
        let mods = &self.vehicle_mods;
        self.vehicles.iter().map(move |(handle, vehicle)| {
            (
                handle,
                VehicleView {
                    vehicle,
                    mods,
                    attributes,
                },
            )
        })
    }

    pub fn vehicle_mod(&self, vehicle_mod: Handle<VehicleMod>) -> Option<VehicleModView<'_>> {
        let attributes = self.attribute_snapshot();
        self.vehicle_mods.get(vehicle_mod).map(|item| VehicleModView {
            item,
            vehicle: item.vehicle().and_then(|parent| self.vehicles.get(parent)),
            attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::DEFAULT_LANGUAGE;
    use crate::prompt::AutoPrompt;
    use crate::vehicle_mod::VehicleModField;

    struct Refuse;

    impl UserPrompt for Refuse {
        fn select_number(&self, _label: &str, _range: crate::rules::VariableRange) -> Option<Decimal> {
            None
        }

        fn confirm_delete(&self, _name: &str) -> bool {
            false
        }
    }

    fn store() -> DefinitionStore {
        DefinitionStore::from_embedded(DEFAULT_LANGUAGE).expect("embedded data")
    }

    #[test]
    fn test_race_caps_attributes() {
        let mut troll = Character::new("Grunt", Race::Troll);
        assert_eq!(troll.set_attribute(Attribute::Charisma, 6), 4);
        assert_eq!(troll.set_attribute(Attribute::Body, 12), 10);
        assert_eq!(troll.race().to_string(), "Troll");
    }

    #[test]
    fn test_limits_follow_attributes() {
        let mut runner = Character::new("Sam", Race::Human);
        runner.set_attribute(Attribute::Strength, 3);
        runner.set_attribute(Attribute::Body, 4);
        runner.set_attribute(Attribute::Reaction, 5);
        // (3 * 2 + 4 + 5) / 3 = 5
        assert_eq!(runner.limit(LimitKind::Physical), 5);
        runner.set_attribute(Attribute::Reaction, 6);
        assert_eq!(runner.limit(LimitKind::Physical), 6);
    }

    #[test]
    fn test_drug_activation_grants_and_revokes() {
        let store = store();
        let mut runner = Character::new("Sam", Race::Human);
        runner.set_attribute(Attribute::Reaction, 4);
        runner.set_attribute(Attribute::Intuition, 3);
        let jazz = runner.add_drug(&store, "Jazz").expect("jazz");

        runner.activate_drug(jazz).expect("activate");
        assert_eq!(runner.attribute(Attribute::Reaction), 5);
        assert_eq!(runner.initiative(), (8, 3));

        runner.deactivate_drug(jazz).expect("deactivate");
        assert_eq!(runner.attribute(Attribute::Reaction), 4);
        assert_eq!(runner.initiative(), (7, 1));
    }

    #[test]
    fn test_removal_needs_confirmation() {
        let store = store();
        let mut runner = Character::new("Sam", Race::Human);
        let jazz = runner.add_drug(&store, "Jazz").expect("jazz");
        runner.activate_drug(jazz).expect("activate");

        assert!(!runner.remove_drug(jazz, &Refuse, true).expect("refused"));
        assert!(runner.drug(jazz).is_some());
        assert!(runner.remove_drug(jazz, &Refuse, false).expect("removed"));
        assert!(runner.drug(jazz).is_none());
        assert!(runner.improvements().is_empty());
        assert!(matches!(
            runner.activate_drug(jazz),
            Err(GearError::InvalidHandle("drug"))
        ));
    }

    #[test]
    fn test_quality_bonus_and_cascade_removal() {
        let store = store();
        let mut runner = Character::new("Sam", Race::Human);
        runner.set_attribute(Attribute::Charisma, 3);
        runner.set_attribute(Attribute::Willpower, 3);
        let base_social = runner.limit(LimitKind::Social);

        let home = runner.add_lifestyle(&store, "Middle").expect("lifestyle");
        let secure = runner
            .add_lifestyle_quality(home, &store, "Extra Secure", &AutoPrompt)
            .expect("quality");
        assert_eq!(runner.limit(LimitKind::Social), base_social + 1);
        assert!(runner.lifestyle_quality(secure).is_some());

        assert!(runner.remove_lifestyle(home, &AutoPrompt, true).expect("removed"));
        assert!(runner.lifestyle_quality(secure).is_none());
        assert_eq!(runner.limit(LimitKind::Social), base_social);
    }

    #[test]
    fn test_roommates_change_quality_cost() {
        let store = store();
        let mut runner = Character::new("Sam", Race::Human);
        let home = runner.add_lifestyle(&store, "Low").expect("lifestyle");
        let watch = runner
            .add_lifestyle_quality(home, &store, "Neighborhood Watch", &AutoPrompt)
            .expect("quality");
        let alone = runner.lifestyle_quality(watch).map(|view| view.cost()).expect("view");
        assert_eq!(alone, Decimal::from(100));

        runner.set_lifestyle_roommates(home, 2).expect("roommates");
        let shared = runner.lifestyle_quality(watch).map(|view| view.cost()).expect("view");
        assert_eq!(shared, Decimal::from(150));
    }

    #[test]
    fn test_vehicle_stat_change_reaches_mods() {
        let store = store();
        let mut rigger = Character::new("Dodger", Race::Elf);
        let car = rigger.add_vehicle(&store, "Ford Americar").expect("car");
        let armor = rigger
            .add_vehicle_mod(car, &store, "Armor", 4, &AutoPrompt)
            .expect("armor");
        let before = rigger.vehicle_mod(armor).map(|view| view.own_cost()).expect("view");
        assert!(rigger.vehicle_mod_mut(armor).is_some_and(|item| item.is_cached(VehicleModField::OwnCost)));

        rigger.set_vehicle_stat(car, VehicleStat::Body, 12).expect("body");
        assert!(!rigger.vehicle_mod_mut(armor).is_some_and(|item| item.is_cached(VehicleModField::OwnCost)));
        let after = rigger.vehicle_mod(armor).map(|view| view.own_cost()).expect("view");
        assert!(after > before);

        assert_eq!(rigger.set_vehicle_mod_rating(armor, 20).expect("rating"), 12);
    }
}
