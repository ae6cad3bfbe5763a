use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::arena::{Arena, Handle};
use crate::attributes::AttributeSnapshot;
use crate::context::EvalContext;
use crate::definitions::VehicleDef;
use crate::rules::{AvailabilityValue, evaluate_availability, evaluate_decimal};
use crate::vehicle_mod::{VehicleMod, VehicleModView};

// Vehicle statistics, named as they appear in mod expressions.
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
)]
pub enum VehicleStat {
    Body,
    Armor,
    Speed,
    Acceleration,
    Handling,
    Pilot,
    Sensor,
    Seats,
}

/// A vehicle or drone and the mod slots it offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    id: Uuid,
    source_id: Uuid,
    name: String,
    category: String,
    stats: BTreeMap<VehicleStat, i32>,
    cost: String,
    availability: String,
    mod_slots: Option<i32>, // Defaults to Body when absent.
    mods: Vec<Handle<VehicleMod>>,
    source: String,
    page: String,
    pub notes: String,
}

impl Vehicle {
    pub fn from_definition(definition: &VehicleDef) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id: definition.id,
            name: definition.name.clone(),
            category: definition.category.clone(),
            stats: definition.stats.clone(),
            cost: definition.cost.clone(),
            availability: definition.availability.clone(),
            mod_slots: definition.mod_slots,
            mods: Vec::new(),
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

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn mods(&self) -> &[Handle<VehicleMod>] {
        &self.mods
    }

    /// Stock value, before any mod.
    pub fn base(&self, stat: VehicleStat) -> i32 {
        self.stats.get(&stat).copied().unwrap_or(0)
    }

    // Mods read base stats, so the character re-invalidates them after this.
    pub(crate) fn set_base(&mut self, stat: VehicleStat, value: i32) {
        self.stats.insert(stat, value);
    }

    pub(crate) fn attach(&mut self, vehicle_mod: Handle<VehicleMod>) {
        if !self.mods.contains(&vehicle_mod) {
            self.mods.push(vehicle_mod);
        }
    }

    pub(crate) fn detach(&mut self, vehicle_mod: Handle<VehicleMod>) {
        self.mods.retain(|attached| *attached != vehicle_mod);
    }

    fn own_context(&self, attributes: &AttributeSnapshot) -> EvalContext {
        EvalContext::new(0).with_attributes(attributes)
    }

    pub fn own_cost(&self, attributes: &AttributeSnapshot) -> Decimal {
        evaluate_decimal(&self.cost, &self.own_context(attributes)).value
    }

    pub fn own_availability(&self, attributes: &AttributeSnapshot) -> AvailabilityValue {
        evaluate_availability(&self.availability, &self.own_context(attributes))
    }

    /// Register the stock stats and cost as placeholders for a mod expression.
    ///
    /// A Body of 0 (microdrones) is seen as 0.5 so Body-scaled costs stay non-zero.
    pub(crate) fn fill_context(&self, context: &mut EvalContext, attributes: &AttributeSnapshot) {
        for stat in VehicleStat::iter() {
            let value = match (stat, self.base(stat)) {
                (VehicleStat::Body, 0) => 0.5,
                (_, value) => f64::from(value),
            };
            context.set(stat.as_ref().to_string(), Some(value));
        }
        context.set("Vehicle Cost", self.own_cost(attributes).to_f64());
    }

    fn attached<'a>(&'a self, mods: &'a Arena<VehicleMod>) -> impl Iterator<Item = &'a VehicleMod> + 'a {
        self.mods.iter().filter_map(|handle| mods.get(*handle))
    }

    pub fn total_slots(&self) -> i32 {
        self.mod_slots.unwrap_or_else(|| self.base(VehicleStat::Body))
    }

    /// Slots taken by mods the vehicle did not ship with.
    pub fn used_slots(&self, mods: &Arena<VehicleMod>, attributes: &AttributeSnapshot) -> i32 {
        self.attached(mods)
            .filter(|vehicle_mod| !vehicle_mod.included_in_vehicle())
            .map(|vehicle_mod| vehicle_mod.slots(Some(self), attributes))
            .sum()
    }

    /// Stock value adjusted by equipped mods.
    ///
    /// Signed bonuses (`+1`, `-2`) add up. An unsigned bonus replaces the stock
    /// value; when several mods replace the same stat the largest one wins.
    pub fn total(&self, stat: VehicleStat, mods: &Arena<VehicleMod>, attributes: &AttributeSnapshot) -> i32 {
        let mut replacement: Option<i32> = None;
        let mut added: i32 = 0;
        for vehicle_mod in self.attached(mods) {
            if !vehicle_mod.equipped() || vehicle_mod.included_in_vehicle() {
                continue;
            }
            let Some(bonus) = vehicle_mod.bonus(stat, Some(self), attributes) else {
                continue;
            };
            if bonus.add_to_parent {
                added = added.saturating_add(bonus.value);
            } else {
                replacement = Some(replacement.map_or(bonus.value, |current| current.max(bonus.value)));
            }
        }
        replacement.unwrap_or_else(|| self.base(stat)).saturating_add(added)
    }

    pub fn total_cost(&self, mods: &Arena<VehicleMod>, attributes: &AttributeSnapshot) -> Decimal {
        self.own_cost(attributes)
            + self
                .attached(mods)
                .filter(|vehicle_mod| !vehicle_mod.included_in_vehicle())
                .map(|vehicle_mod| vehicle_mod.total_cost(Some(self), attributes))
                .sum::<Decimal>()
    }

    /// Own availability plus every mod that adds to its parent.
    pub fn total_availability(
        &self,
        mods: &Arena<VehicleMod>,
        attributes: &AttributeSnapshot,
    ) -> AvailabilityValue {
        let mut total = self.own_availability(attributes);
        for vehicle_mod in self.attached(mods) {
            let availability = vehicle_mod.availability(Some(self), attributes);
            if availability.add_to_parent && !availability.included_in_parent {
                total += availability;
            }
        }
        total
    }
}

/// Read-only view of a vehicle with its mods and the owner's attributes.
#[derive(Debug, Clone, Copy)]
pub struct VehicleView<'a> {
    pub vehicle: &'a Vehicle,
    pub mods: &'a Arena<VehicleMod>,
    pub attributes: &'a AttributeSnapshot,
}

impl<'a> VehicleView<'a> {
    pub fn total(&self, stat: VehicleStat) -> i32 {
        self.vehicle.total(stat, self.mods, self.attributes)
    }

    pub fn used_slots(&self) -> i32 {
        self.vehicle.used_slots(self.mods, self.attributes)
    }

    pub fn total_cost(&self) -> Decimal {
        self.vehicle.total_cost(self.mods, self.attributes)
    }

    pub fn total_availability(&self) -> AvailabilityValue {
        self.vehicle.total_availability(self.mods, self.attributes)
    }

    pub fn mods(&self) -> impl Iterator<Item = VehicleModView<'a>> + 'a {
        let view = *self;
        view.vehicle.mods.iter().filter_map(move |handle| {
            view.mods.get(*handle).map(|item| VehicleModView {
                item,
                vehicle: Some(view.vehicle),
                attributes: view.attributes,
            })
        })
    }
}
