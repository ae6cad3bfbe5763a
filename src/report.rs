use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

use crate::attributes::{Attribute, LimitKind};
use crate::character::Character;
use crate::drug::DrugView;
use crate::lifestyle::LifestyleView;
use crate::vehicle::{VehicleStat, VehicleView};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrugReport {
    pub name: String,
    pub active: bool,
    pub quantity: Decimal,
    pub cost: Decimal,
    pub total_cost: Decimal,
    pub availability: String,
    pub duration: String,
    pub speed: i32,
    pub addiction_threshold: i32,
    pub addiction_rating: i32,
    pub components: Vec<String>,
    pub effects: Vec<String>,
}

impl DrugReport {
    fn new(view: DrugView<'_>) -> Self {
        let drug = view.drug;
        let mut effects: Vec<String> = drug
            .attributes()
            .iter()
            .map(|(attribute, value)| format!("{attribute} {value:+}"))
            .collect();
        effects.extend(drug.limits().iter().map(|(limit, value)| format!("{limit} limit {value:+}")));
        if drug.initiative_dice() != 0 {
            effects.push(format!("Initiative dice {:+}", drug.initiative_dice()));
        }
        effects.extend(drug.qualities().into_iter().map(String::from));
        effects.extend(drug.infos().into_iter().map(String::from));

        Self {
            name: drug.name().to_string(),
            active: drug.is_active(),
            quantity: drug.quantity(),
            cost: view.cost(),
            total_cost: view.total_cost(),
            availability: view.availability().to_string(),
            duration: drug.duration().to_string(),
            speed: drug.speed(),
            addiction_threshold: drug.addiction_threshold(),
            addiction_rating: drug.addiction_rating(),
            components: drug
                .components()
                .iter()
                .map(|component| format!("{} {}", component.name(), component.level()))
                .collect(),
            effects,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub name: String,
    pub category: String,
    pub cost: Decimal,
    pub lp_cost: i32,
    pub free: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifestyleReport {
    pub name: String,
    pub monthly_cost: Decimal,
    pub used_lp: i32,
    pub remaining_lp: i32,
    pub roommates: u32,
    pub qualities: Vec<QualityReport>,
}

impl LifestyleReport {
    fn new(view: LifestyleView<'_>) -> Self {
        Self {
            name: view.lifestyle.name().to_string(),
            monthly_cost: view.monthly_cost(),
            used_lp: view.used_lp(),
            remaining_lp: view.remaining_lp(),
            roommates: view.lifestyle.roommates(),
            qualities: view
                .qualities()
                .map(|quality| QualityReport {
                    name: quality.quality.to_string(),
                    category: quality.quality.category().to_string(),
                    cost: quality.cost(),
                    lp_cost: quality.lp_cost(),
                    free: quality.cost_free(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModReport {
    pub name: String,
    pub rating: i32,
    pub slots: i32,
    pub cost: Decimal,
    pub availability: String,
    pub capacity: i32,
    pub weapons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleReport {
    pub name: String,
    pub stats: BTreeMap<VehicleStat, i32>,
    pub used_slots: i32,
    pub total_slots: i32,
    pub total_cost: Decimal,
    pub availability: String,
    pub mods: Vec<ModReport>,
}

impl VehicleReport {
    fn new(view: VehicleView<'_>) -> Self {
        Self {
            name: view.vehicle.name().to_string(),
            stats: VehicleStat::iter().map(|stat| (stat, view.total(stat))).collect(),
            used_slots: view.used_slots(),
            total_slots: view.vehicle.total_slots(),
            total_cost: view.total_cost(),
            availability: view.total_availability().to_string(),
            mods: view
                .mods()
                .map(|item| ModReport {
                    name: item.item.name().to_string(),
                    rating: item.item.rating(),
                    slots: item.slots(),
                    cost: item.total_cost(),
                    availability: item.availability().to_string(),
                    capacity: item.capacity(),
                    weapons: item.item.weapons().iter().map(|weapon| weapon.name.clone()).collect(),
                })
                .collect(),
        }
    }
}

/// Everything derived about a character, flattened for display or export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterReport {
    pub name: String,
    pub race: String,
    pub attributes: BTreeMap<String, i32>,
    pub essence: f64,
    pub initiative: String,
    pub limits: BTreeMap<String, i32>,
    pub physical_monitor: i32,
    pub stun_monitor: i32,
    pub drugs: Vec<DrugReport>,
    pub lifestyles: Vec<LifestyleReport>,
    pub vehicles: Vec<VehicleReport>,
}

impl CharacterReport {
    pub fn from_character(character: &Character) -> Self {
        let (score, dice) = character.initiative();
        Self {
            name: character.name.clone(),
            race: character.race().to_string(),
            attributes: Attribute::iter()
                .map(|attribute| (attribute.name().to_string(), character.attribute(attribute)))
                .collect(),
            essence: character.essence(),
            initiative: format!("{score} + {dice}D6"),
            limits: LimitKind::iter()
                .map(|limit| (limit.to_string(), character.limit(limit)))
                .collect(),
            physical_monitor: character.physical_monitor(),
            stun_monitor: character.stun_monitor(),
            drugs: character.drugs().map(|(_, view)| DrugReport::new(view)).collect(),
            lifestyles: character
                .lifestyles()
                .map(|(_, view)| LifestyleReport::new(view))
                .collect(),
            vehicles: character
                .vehicles()
                .map(|(_, view)| VehicleReport::new(view))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Race;
    use crate::definitions::{DEFAULT_LANGUAGE, DefinitionStore};
    use crate::prompt::AutoPrompt;

    #[test]
    fn test_report_lists_gear() {
        let store = DefinitionStore::from_embedded(DEFAULT_LANGUAGE).expect("embedded data");
        let mut rigger = Character::new("Dodger", Race::Elf);
        let car = rigger.add_vehicle(&store, "Ford Americar").expect("car");
        rigger
            .add_vehicle_mod(car, &store, "Handling Enhancement", 2, &AutoPrompt)
            .expect("mod");
        let home = rigger.add_lifestyle(&store, "Low").expect("lifestyle");
        rigger
            .add_lifestyle_quality(home, &store, "Gym", &AutoPrompt)
            .expect("quality");
        rigger.add_drug(&store, "Jazz").expect("drug");

        let report = CharacterReport::from_character(&rigger);
        assert_eq!(report.race, "Elf");
        assert_eq!(report.vehicles[0].stats[&VehicleStat::Handling], 6);
        assert_eq!(report.vehicles[0].mods[0].rating, 2);
        assert_eq!(report.lifestyles[0].qualities[0].cost, Decimal::from(300));
        assert_eq!(report.lifestyles[0].monthly_cost, Decimal::from(2300));
        assert!(report.drugs[0].effects.iter().any(|effect| effect == "REA +1"));

        let json = serde_json::to_string(&report).expect("serialize report");
        assert!(json.contains("Dodger"));
    }
}
