use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::arena::Handle;
use crate::attributes::AttributeSnapshot;
use crate::cache::{Cached, Change};
use crate::context::EvalContext;
use crate::definitions::VehicleModDef;
use crate::prompt::{UserPrompt, resolve_variable};
use crate::rules::{
    AvailabilityValue, SignedValue, evaluate_availability, evaluate_decimal, evaluate_int,
};
use crate::vehicle::{Vehicle, VehicleStat};

/// A weapon fitted to a weapon mount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MountedWeapon {
    pub id: Uuid,
    pub name: String,
    pub cost: String,
    pub availability: String,
    pub capacity_cost: i32,
}

impl MountedWeapon {
    pub fn new(
        name: impl Into<String>,
        cost: impl Into<String>,
        availability: impl Into<String>,
        capacity_cost: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            cost: cost.into(),
            availability: availability.into(),
            capacity_cost,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleModField {
    MaxRating,
    Slots,
    OwnCost,
    TotalCost,
    Availability,
    Capacity,
    Bonuses,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct VehicleModCache {
    max_rating: Cached<i32>,
    slots: Cached<i32>,
    own_cost: Cached<Decimal>,
    total_cost: Cached<Decimal>,
    availability: Cached<AvailabilityValue>,
    capacity: Cached<i32>,
    bonuses: Cached<BTreeMap<VehicleStat, SignedValue<i32>>>,
}

impl VehicleModCache {
    fn invalidate(&mut self, change: Change) {
        match change {
            // Everything but the maximum depends on the rating.
            Change::Rating => {
                let max_rating = std::mem::take(&mut self.max_rating);
                *self = Self {
                    max_rating,
                    ..Self::default()
                };
            }
            Change::Children => {
                self.total_cost.invalidate();
                self.availability.invalidate();
            }
            Change::Flags => {
                self.own_cost.invalidate();
                self.total_cost.invalidate();
                self.availability.invalidate();
            }
            Change::Attributes | Change::Parent | Change::Definition => *self = Self::default(),
        }
    }
}

/// A modification installed in a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleMod {
    id: Uuid,
    source_id: Uuid,
    name: String,
    category: String,
    extra: String,
    rating: i32,
    max_rating: String,
    rating_label: String,
    slots: String,
    cost: String,
    availability: String,
    capacity: String,
    markup: Decimal, // Percentage added to the cost.
    discounted: bool, // Black-market discount, -10%.
    included_in_vehicle: bool,
    equipped: bool,
    downgrade: bool,
    bonus: BTreeMap<VehicleStat, String>,
    weapons: Vec<MountedWeapon>,
    vehicle: Option<Handle<Vehicle>>,
    source: String,
    page: String,
    pub notes: String,
    #[serde(skip)]
    cache: VehicleModCache,
}

impl VehicleMod {
    /// Build from a definition for `vehicle`, clamping `rating` to the mod's maximum.
    pub fn from_definition(
        definition: &VehicleModDef,
        rating: i32,
        prompt: &dyn UserPrompt,
        vehicle: Option<&Vehicle>,
        attributes: &AttributeSnapshot,
    ) -> Self {
        let mut item = Self {
            id: Uuid::new_v4(),
            source_id: definition.id,
            name: definition.name.clone(),
            category: definition.category.clone(),
            extra: String::new(),
            rating: 0,
            max_rating: definition.max_rating.clone(),
            rating_label: definition.rating_label.clone(),
            slots: definition.slots.clone(),
            cost: resolve_variable(prompt, &definition.name, &definition.cost),
            availability: definition.availability.clone(),
            capacity: definition.capacity.clone(),
            markup: Decimal::ZERO,
            discounted: false,
            included_in_vehicle: false,
            equipped: true,
            downgrade: definition.downgrade,
            bonus: definition.bonus.clone(),
            weapons: Vec::new(),
            vehicle: None,
            source: definition.source.clone(),
            page: definition.page.clone(),
            notes: String::new(),
            cache: VehicleModCache::default(),
        };
        item.set_rating(rating, vehicle, attributes);
        item
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

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn extra(&self) -> &str {
        &self.extra
    }

    pub fn set_extra(&mut self, extra: impl Into<String>) {
        self.extra = extra.into();
    }

    pub fn rating(&self) -> i32 {
        self.rating
    }

    /// What the rating is called for this mod ("Rating", "Level", ...).
    pub fn rating_label(&self) -> &str {
        &self.rating_label
    }

    pub fn markup(&self) -> Decimal {
        self.markup
    }

    pub fn discounted(&self) -> bool {
        self.discounted
    }

    pub fn included_in_vehicle(&self) -> bool {
        self.included_in_vehicle
    }

    pub fn equipped(&self) -> bool {
        self.equipped
    }

    pub fn downgrade(&self) -> bool {
        self.downgrade
    }

    pub fn weapons(&self) -> &[MountedWeapon] {
        &self.weapons
    }

    pub fn vehicle(&self) -> Option<Handle<Vehicle>> {
        self.vehicle
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub(crate) fn set_vehicle(&mut self, vehicle: Option<Handle<Vehicle>>) {
        self.vehicle = vehicle;
        self.invalidate(Change::Parent);
    }

    /// Clamp to `0..=max_rating`; returns the rating actually applied.
    pub fn set_rating(&mut self, rating: i32, vehicle: Option<&Vehicle>, attributes: &AttributeSnapshot) -> i32 {
        let rating = rating.clamp(0, self.max_rating(vehicle, attributes));
        if rating != self.rating {
            self.rating = rating;
            self.invalidate(Change::Rating);
        }
        self.rating
    }

    pub fn set_markup(&mut self, markup: Decimal) {
        self.markup = markup;
        self.invalidate(Change::Flags);
    }

    pub fn set_discounted(&mut self, discounted: bool) {
        self.discounted = discounted;
        self.invalidate(Change::Flags);
    }

    pub fn set_included_in_vehicle(&mut self, included: bool) {
        self.included_in_vehicle = included;
        self.invalidate(Change::Flags);
    }

    pub fn set_equipped(&mut self, equipped: bool) {
        self.equipped = equipped;
    }

    pub fn add_weapon(&mut self, weapon: MountedWeapon) -> Uuid {
        let id = weapon.id;
        log::debug!("Mounting {} on {}", weapon.name, self.name);
        self.weapons.push(weapon);
        self.invalidate(Change::Children);
        id
    }

    pub fn remove_weapon(&mut self, id: Uuid) -> Option<MountedWeapon> {
        let index = self.weapons.iter().position(|weapon| weapon.id == id)?;
        let weapon = self.weapons.remove(index);
        self.invalidate(Change::Children);
        Some(weapon)
    }

    // Rating, stock vehicle stats and owner attributes, without MaxRating.
    fn base_context(&self, vehicle: Option<&Vehicle>, attributes: &AttributeSnapshot) -> EvalContext {
        let mut context = EvalContext::new(self.rating).with_attributes(attributes);
        match vehicle {
            Some(vehicle) => vehicle.fill_context(&mut context, attributes),
            None => {
                for stat in <VehicleStat as strum::IntoEnumIterator>::iter() {
                    context.set(stat.as_ref().to_string(), None);
                }
                context.set("Vehicle Cost", None);
            }
        }
        context
    }

    fn context(&self, vehicle: Option<&Vehicle>, attributes: &AttributeSnapshot) -> EvalContext {
        self.base_context(vehicle, attributes)
            .with_max_rating(self.max_rating(vehicle, attributes))
    }

    // Cost and availability may also scale with the slots taken.
    fn priced_context(&self, vehicle: Option<&Vehicle>, attributes: &AttributeSnapshot) -> EvalContext {
        self.context(vehicle, attributes)
            .with_value("Slots", f64::from(self.slots(vehicle, attributes)))
    }

    pub fn max_rating(&self, vehicle: Option<&Vehicle>, attributes: &AttributeSnapshot) -> i32 {
        *self.cache.max_rating.get_or_compute(|| {
            evaluate_int(&self.max_rating, &self.base_context(vehicle, attributes))
                .value
                .max(0)
        })
    }

    pub fn slots(&self, vehicle: Option<&Vehicle>, attributes: &AttributeSnapshot) -> i32 {
        *self
            .cache
            .slots
            .get_or_compute(|| evaluate_int(&self.slots, &self.context(vehicle, attributes)).value)
    }

    /// Cost of the mod itself, after markup and discount.
    pub fn own_cost(&self, vehicle: Option<&Vehicle>, attributes: &AttributeSnapshot) -> Decimal {
        *self.cache.own_cost.get_or_compute(|| {
            let mut cost = evaluate_decimal(&self.cost, &self.priced_context(vehicle, attributes)).value;
            cost *= Decimal::ONE + self.markup / Decimal::ONE_HUNDRED;
            if self.discounted {
                cost *= Decimal::new(9, 1);
            }
            cost
        })
    }

    /// Own cost plus mounted weapons.
    pub fn total_cost(&self, vehicle: Option<&Vehicle>, attributes: &AttributeSnapshot) -> Decimal {
        *self.cache.total_cost.get_or_compute(|| {
            let context = self.context(vehicle, attributes);
            self.own_cost(vehicle, attributes)
                + self
                    .weapons
                    .iter()
                    .map(|weapon| evaluate_decimal(&weapon.cost, &context).value)
                    .sum::<Decimal>()
        })
    }

    pub fn availability(&self, vehicle: Option<&Vehicle>, attributes: &AttributeSnapshot) -> AvailabilityValue {
        self.cache.availability.get_cloned(|| {
            let context = self.priced_context(vehicle, attributes);
            let mut availability = evaluate_availability(&self.availability, &context);
            for weapon in &self.weapons {
                let weapon_availability = evaluate_availability(&weapon.availability, &context);
                availability.value = availability.value.max(weapon_availability.value);
                availability.suffix = availability.suffix.max(weapon_availability.suffix);
            }
            availability.included_in_parent = self.included_in_vehicle;
            availability
        })
    }

    pub fn capacity(&self, vehicle: Option<&Vehicle>, attributes: &AttributeSnapshot) -> i32 {
        *self
            .cache
            .capacity
            .get_or_compute(|| evaluate_int(&self.capacity, &self.context(vehicle, attributes)).value)
    }

    pub fn remaining_capacity(&self, vehicle: Option<&Vehicle>, attributes: &AttributeSnapshot) -> i32 {
        self.capacity(vehicle, attributes)
            - self.weapons.iter().map(|weapon| weapon.capacity_cost).sum::<i32>()
    }

    /// Every stat bonus this mod grants at its current rating.
    pub fn bonuses(
        &self,
        vehicle: Option<&Vehicle>,
        attributes: &AttributeSnapshot,
    ) -> &BTreeMap<VehicleStat, SignedValue<i32>> {
        self.cache.bonuses.get_or_compute(|| {
            let context = self.context(vehicle, attributes);
            self.bonus
                .iter()
                .map(|(stat, expression)| (*stat, evaluate_int(expression, &context)))
                .collect()
        })
    }

    pub fn bonus(
        &self,
        stat: VehicleStat,
        vehicle: Option<&Vehicle>,
        attributes: &AttributeSnapshot,
    ) -> Option<SignedValue<i32>> {
        self.bonuses(vehicle, attributes).get(&stat).copied()
    }

    pub fn invalidate(&mut self, change: Change) {
        self.cache.invalidate(change);
    }

    pub fn is_cached(&self, field: VehicleModField) -> bool {
        let cache = &self.cache;
        match field {
            VehicleModField::MaxRating => cache.max_rating.is_set(),
            VehicleModField::Slots => cache.slots.is_set(),
            VehicleModField::OwnCost => cache.own_cost.is_set(),
            VehicleModField::TotalCost => cache.total_cost.is_set(),
            VehicleModField::Availability => cache.availability.is_set(),
            VehicleModField::Capacity => cache.capacity.is_set(),
            VehicleModField::Bonuses => cache.bonuses.is_set(),
        }
    }
}

/// Read-only view of a mod with its vehicle and the owner's attributes.
#[derive(Debug, Clone, Copy)]
pub struct VehicleModView<'a> {
    pub item: &'a VehicleMod,
    pub vehicle: Option<&'a Vehicle>,
    pub attributes: &'a AttributeSnapshot,
}

impl VehicleModView<'_> {
    pub fn max_rating(&self) -> i32 {
        self.item.max_rating(self.vehicle, self.attributes)
    }

    pub fn slots(&self) -> i32 {
        self.item.slots(self.vehicle, self.attributes)
    }

    pub fn own_cost(&self) -> Decimal {
        self.item.own_cost(self.vehicle, self.attributes)
    }

    pub fn total_cost(&self) -> Decimal {
        self.item.total_cost(self.vehicle, self.attributes)
    }

    pub fn availability(&self) -> AvailabilityValue {
        self.item.availability(self.vehicle, self.attributes)
    }

    pub fn capacity(&self) -> i32 {
        self.item.capacity(self.vehicle, self.attributes)
    }

    pub fn remaining_capacity(&self) -> i32 {
        self.item.remaining_capacity(self.vehicle, self.attributes)
    }

    pub fn bonus(&self, stat: VehicleStat) -> Option<SignedValue<i32>> {
        self.item.bonus(stat, self.vehicle, self.attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{DEFAULT_LANGUAGE, DefinitionStore};
    use crate::prompt::AutoPrompt;
    use crate::rules::AvailSuffix;
    use pretty_assertions::assert_eq;

    fn store() -> DefinitionStore {
        DefinitionStore::from_embedded(DEFAULT_LANGUAGE).expect("embedded data")
    }

    fn vehicle(store: &DefinitionStore, name: &str) -> Vehicle {
        Vehicle::from_definition(store.vehicle(name).expect("vehicle"))
    }

    fn build(store: &DefinitionStore, name: &str, rating: i32, vehicle: Option<&Vehicle>) -> VehicleMod {
        VehicleMod::from_definition(
            store.vehicle_mod(name).expect("mod"),
            rating,
            &AutoPrompt,
            vehicle,
            &AttributeSnapshot::default(),
        )
    }

    #[test]
    fn test_rating_clamped_to_maximum() {
        let store = store();
        let car = vehicle(&store, "Ford Americar");
        let attributes = AttributeSnapshot::default();
        let mut enhancement = build(&store, "Handling Enhancement", 9, Some(&car));
        assert_eq!(enhancement.rating(), 3);
        assert_eq!(enhancement.set_rating(-1, Some(&car), &attributes), 0);
    }

    #[test]
    fn test_rating_change_keeps_max_rating_cached() {
        let store = store();
        let car = vehicle(&store, "Ford Americar");
        let attributes = AttributeSnapshot::default();
        let mut enhancement = build(&store, "Handling Enhancement", 1, Some(&car));
        let first = enhancement.own_cost(Some(&car), &attributes);
        assert!(enhancement.is_cached(VehicleModField::OwnCost));

        enhancement.set_rating(3, Some(&car), &attributes);
        assert!(enhancement.is_cached(VehicleModField::MaxRating));
        assert!(!enhancement.is_cached(VehicleModField::OwnCost));
        assert!(enhancement.own_cost(Some(&car), &attributes) > first);
    }

    #[test]
    fn test_vehicle_cost_drives_range_cost() {
        let store = store();
        let car = vehicle(&store, "Ford Americar");
        let attributes = AttributeSnapshot::default();
        let enhancement = build(&store, "Handling Enhancement", 1, Some(&car));

        // Rating 1 bracket: 10% of the stock vehicle cost.
        assert_eq!(
            enhancement.own_cost(Some(&car), &attributes),
            car.own_cost(&attributes) * Decimal::new(1, 1)
        );
        assert_eq!(
            enhancement.bonus(VehicleStat::Handling, Some(&car), &attributes),
            Some(SignedValue::new(1, true))
        );
    }

    #[test]
    fn test_microdrone_body_counts_as_half() {
        let store = store();
        let drone = vehicle(&store, "MCT Fly-Spy");
        let attributes = AttributeSnapshot::default();
        let armor = build(&store, "Armor", 1, Some(&drone));
        assert_eq!(drone.base(VehicleStat::Body), 0);
        assert_eq!(armor.own_cost(Some(&drone), &attributes), Decimal::from(100));
    }

    #[test]
    fn test_markup_and_discount() {
        let store = store();
        let car = vehicle(&store, "Ford Americar");
        let attributes = AttributeSnapshot::default();
        let mut interface = build(&store, "Rigger Interface", 0, Some(&car));
        assert_eq!(interface.own_cost(Some(&car), &attributes), Decimal::from(1000));

        interface.set_markup(Decimal::from(20));
        assert!(!interface.is_cached(VehicleModField::OwnCost));
        assert_eq!(interface.own_cost(Some(&car), &attributes), Decimal::from(1200));

        interface.set_discounted(true);
        assert_eq!(interface.own_cost(Some(&car), &attributes), Decimal::from(1080));
    }

    #[test]
    fn test_weapon_mount_capacity_and_children() {
        let store = store();
        let car = vehicle(&store, "Ford Americar");
        let attributes = AttributeSnapshot::default();
        let mut mount = build(&store, "Weapon Mount", 0, Some(&car));
        let capacity = mount.capacity(Some(&car), &attributes);
        let own = mount.own_cost(Some(&car), &attributes);
        assert_eq!(mount.total_cost(Some(&car), &attributes), own);

        let weapon = mount.add_weapon(MountedWeapon::new("Ares Alpha", "2650", "11F", 1));
        assert!(mount.is_cached(VehicleModField::OwnCost));
        assert!(!mount.is_cached(VehicleModField::TotalCost));
        assert_eq!(
            mount.total_cost(Some(&car), &attributes),
            own + Decimal::from(2650)
        );
        assert_eq!(mount.remaining_capacity(Some(&car), &attributes), capacity - 1);
        assert_eq!(mount.availability(Some(&car), &attributes).suffix, AvailSuffix::Forbidden);

        assert!(mount.remove_weapon(weapon).is_some());
        assert_eq!(mount.remaining_capacity(Some(&car), &attributes), capacity);
    }

    #[test]
    fn test_variable_cost_resolved_once() {
        let store = store();
        let car = vehicle(&store, "Ford Americar");
        let compartment = build(&store, "Smuggling Compartment", 0, Some(&car));
        assert_eq!(
            compartment.own_cost(Some(&car), &AttributeSnapshot::default()),
            Decimal::from(500)
        );
    }
}
