//! Read-only rule definitions, one JSON document per category.
//!
//! Records are looked up by GUID first and by exact name second. The default
//! data pack ships inside the binary; `Settings::data_dir` can point at an
//! on-disk copy laid out the same way (`<dir>/<language>/<category>.json`).

use include_dir::{Dir, include_dir};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::drug_component::{DrugComponentCategory, DrugEffect};
use crate::error::GearError;
use crate::improvement::ImprovementSpec;
use crate::lifestyle_quality::LifestyleQualityCategory;
use crate::settings::Settings;
use crate::utils::block_on;
use crate::vehicle::VehicleStat;

pub const DEFAULT_LANGUAGE: &str = "en-us";

static EMBEDDED_DATA: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/data");

// Loaded stores, keyed by data source and language.
static STORES: Lazy<RwLock<HashMap<String, Arc<DefinitionStore>>>> = Lazy::new(Default::default);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
pub enum DefinitionCategory {
    #[strum(serialize = "drugs")]
    Drugs,
    #[strum(serialize = "drugcomponents")]
    DrugComponents,
    #[strum(serialize = "lifestyles")]
    Lifestyles,
    #[strum(serialize = "lifestylequalities")]
    LifestyleQualities,
    #[strum(serialize = "vehicles")]
    Vehicles,
    #[strum(serialize = "vehiclemods")]
    VehicleMods,
}

impl DefinitionCategory {
    pub fn file_name(self) -> String {
        format!("{self}.json")
    }
}

/// A record that can be found by GUID or name.
pub trait Definition {
    const CATEGORY: DefinitionCategory;

    fn id(&self) -> Uuid;
    fn name(&self) -> &str;
}

macro_rules! impl_definition {
    ($type:ty, $category:expr) => {
        impl Definition for $type {
            const CATEGORY: DefinitionCategory = $category;

            fn id(&self) -> Uuid {
                self.id
            }

            fn name(&self) -> &str {
                &self.name
            }
        }
    };
}

fn default_one() -> u32 {
    1
}

fn default_zero() -> String {
    String::from("0")
}

fn default_rating_label() -> String {
    String::from("Rating")
}

fn default_hundred() -> Decimal {
    Decimal::ONE_HUNDRED
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRef {
    pub name: String,
    #[serde(default = "default_level")]
    pub level: i32,
}

fn default_level() -> i32 {
    1
}

// Premade drug: base values plus the components it is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugDef {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    #[serde(default = "default_zero")]
    pub cost: String,
    #[serde(default = "default_zero")]
    pub availability: String,
    #[serde(default)]
    pub addiction_threshold: i32,
    #[serde(default)]
    pub addiction_rating: i32,
    #[serde(default)]
    pub components: Vec<ComponentRef>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub page: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugComponentDef {
    pub id: Uuid,
    pub name: String,
    pub category: DrugComponentCategory,
    #[serde(default = "default_one")]
    pub limit: u32,
    #[serde(default = "default_zero")]
    pub cost: String,
    #[serde(default = "default_zero")]
    pub availability: String,
    #[serde(default)]
    pub addiction_threshold: i32,
    #[serde(default)]
    pub addiction_rating: i32,
    #[serde(default)]
    pub effects: Vec<DrugEffect>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub page: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifestyleDef {
    pub id: Uuid,
    pub name: String,
    pub cost: Decimal,
    #[serde(default)]
    pub lp: i32,
    #[serde(default = "default_hundred")]
    pub percentage: Decimal,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub page: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifestyleQualityDef {
    pub id: Uuid,
    pub name: String,
    pub category: LifestyleQualityCategory,
    #[serde(default)]
    pub lp: i32,
    #[serde(default = "default_zero")]
    pub cost: String,
    #[serde(default)]
    pub multiplier: i32,
    #[serde(default)]
    pub base_multiplier: i32,
    #[serde(default)]
    pub allowed_free_lifestyles: Vec<String>,
    #[serde(default)]
    pub bonus: Vec<ImprovementSpec>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub page: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleDef {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub stats: BTreeMap<VehicleStat, i32>,
    #[serde(default = "default_zero")]
    pub cost: String,
    #[serde(default = "default_zero")]
    pub availability: String,
    #[serde(default)]
    pub mod_slots: Option<i32>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub page: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleModDef {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    #[serde(default = "default_zero")]
    pub max_rating: String,
    #[serde(default = "default_rating_label")]
    pub rating_label: String,
    #[serde(default = "default_zero")]
    pub slots: String,
    #[serde(default = "default_zero")]
    pub cost: String,
    #[serde(default = "default_zero")]
    pub availability: String,
    #[serde(default = "default_zero")]
    pub capacity: String,
    #[serde(default)]
    pub bonus: BTreeMap<VehicleStat, String>,
    #[serde(default)]
    pub downgrade: bool,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub page: String,
}

impl_definition!(DrugDef, DefinitionCategory::Drugs);
impl_definition!(DrugComponentDef, DefinitionCategory::DrugComponents);
impl_definition!(LifestyleDef, DefinitionCategory::Lifestyles);
impl_definition!(LifestyleQualityDef, DefinitionCategory::LifestyleQualities);
impl_definition!(VehicleDef, DefinitionCategory::Vehicles);
impl_definition!(VehicleModDef, DefinitionCategory::VehicleMods);

/// GUID first, then exact name.
pub fn find_definition<'a, T: Definition>(items: &'a [T], key: &str) -> Result<&'a T, GearError> {
    let key = key.trim();
    Uuid::parse_str(key)
        .ok()
        .and_then(|id| items.iter().find(|item| item.id() == id))
        .or_else(|| items.iter().find(|item| item.name() == key))
        .ok_or_else(|| GearError::DefinitionNotFound {
            category: T::CATEGORY,
            key: key.to_string(),
        })
}

fn parse_document<T: DeserializeOwned>(file: &str, text: &str) -> Result<Vec<T>, GearError> {
    serde_json::from_str(text).map_err(|source| GearError::DefinitionData {
        file: file.to_string(),
        source,
    })
}

#[derive(Debug, Default)]
pub struct DefinitionStore {
    language: String,
    drugs: Vec<DrugDef>,
    drug_components: Vec<DrugComponentDef>,
    lifestyles: Vec<LifestyleDef>,
    lifestyle_qualities: Vec<LifestyleQualityDef>,
    vehicles: Vec<VehicleDef>,
    vehicle_mods: Vec<VehicleModDef>,
}

impl DefinitionStore {
    // Build a store from a reader that returns the document text of each category.
    fn from_documents(
        language: &str,
        mut read: impl FnMut(DefinitionCategory) -> Result<(String, String), GearError>,
    ) -> Result<Self, GearError> {
        let (file, text) = read(DefinitionCategory::Drugs)?;
        let drugs = parse_document(&file, &text)?;
        let (file, text) = read(DefinitionCategory::DrugComponents)?;
        let drug_components = parse_document(&file, &text)?;
        let (file, text) = read(DefinitionCategory::Lifestyles)?;
        let lifestyles = parse_document(&file, &text)?;
        let (file, text) = read(DefinitionCategory::LifestyleQualities)?;
        let lifestyle_qualities = parse_document(&file, &text)?;
        let (file, text) = read(DefinitionCategory::Vehicles)?;
        let vehicles = parse_document(&file, &text)?;
        let (file, text) = read(DefinitionCategory::VehicleMods)?;
        let vehicle_mods = parse_document(&file, &text)?;

        Ok(Self {
            language: language.to_string(),
            drugs,
            drug_components,
            lifestyles,
            lifestyle_qualities,
            vehicles,
            vehicle_mods,
        })
    }

    /// The data pack compiled into the crate.
    pub fn from_embedded(language: &str) -> Result<Self, GearError> {
        let language = if EMBEDDED_DATA.get_dir(language).is_some() {
            language
        } else {
            log::warn!("No embedded data for language {language}, using {DEFAULT_LANGUAGE}");
            DEFAULT_LANGUAGE
        };

        Self::from_documents(language, |category| {
            let path = format!("{language}/{}", category.file_name());
            let text = EMBEDDED_DATA
                .get_file(&path)
                .and_then(|file| file.contents_utf8())
                .ok_or_else(|| GearError::MissingDataFile(path.clone()))?;
            Ok((path, text.to_string()))
        })
    }

    /// A data pack on disk, laid out as `<dir>/<language>/<category>.json`.
    pub async fn from_dir(dir: &Path, language: &str) -> Result<Self, GearError> {
        let language = if tokio::fs::metadata(dir.join(language)).await.is_ok() {
            language
        } else {
            log::warn!(
                "No data for language {language} in {}, using {DEFAULT_LANGUAGE}",
                dir.display()
            );
            DEFAULT_LANGUAGE
        };

        let mut documents = HashMap::new();
        for category in <DefinitionCategory as strum::IntoEnumIterator>::iter() {
            let path = dir.join(language).join(category.file_name());
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|_| GearError::MissingDataFile(path.display().to_string()))?;
            documents.insert(category, (path.display().to_string(), text));
        }

        Self::from_documents(language, |category| {
            documents
                .remove(&category)
                .ok_or_else(|| GearError::MissingDataFile(category.file_name()))
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn drug(&self, key: &str) -> Result<&DrugDef, GearError> {
        find_definition(&self.drugs, key)
    }

    pub fn drug_component(&self, key: &str) -> Result<&DrugComponentDef, GearError> {
        find_definition(&self.drug_components, key)
    }

    pub fn lifestyle(&self, key: &str) -> Result<&LifestyleDef, GearError> {
        find_definition(&self.lifestyles, key)
    }

    pub fn lifestyle_quality(&self, key: &str) -> Result<&LifestyleQualityDef, GearError> {
        find_definition(&self.lifestyle_qualities, key)
    }

    pub fn vehicle(&self, key: &str) -> Result<&VehicleDef, GearError> {
        find_definition(&self.vehicles, key)
    }

    pub fn vehicle_mod(&self, key: &str) -> Result<&VehicleModDef, GearError> {
        find_definition(&self.vehicle_mods, key)
    }

    pub fn drugs(&self) -> &[DrugDef] {
        &self.drugs
    }

    pub fn drug_components(&self) -> &[DrugComponentDef] {
        &self.drug_components
    }

    pub fn lifestyles(&self) -> &[LifestyleDef] {
        &self.lifestyles
    }

    pub fn lifestyle_qualities(&self) -> &[LifestyleQualityDef] {
        &self.lifestyle_qualities
    }

    pub fn vehicles(&self) -> &[VehicleDef] {
        &self.vehicles
    }

    pub fn vehicle_mods(&self) -> &[VehicleModDef] {
        &self.vehicle_mods
    }
}

/// Load (or reuse) the definition store for the configured language and data source.
pub async fn load_definitions(settings: &Settings) -> Result<Arc<DefinitionStore>, GearError> {
    let language = settings.language.to_lowercase();
    let key = match &settings.data_dir {
        Some(dir) => format!("{}|{language}", dir.display()),
        None => format!("embedded|{language}"),
    };

    if let Some(store) = STORES.read().await.get(&key) {
        return Ok(Arc::clone(store));
    }

    let store = match &settings.data_dir {
        Some(dir) => DefinitionStore::from_dir(dir, &language).await?,
        None => DefinitionStore::from_embedded(&language)?,
    };
    log::info!(
        "Loaded definitions for {} ({} vehicle mods, {} lifestyle qualities, {} drug components)",
        store.language(),
        store.vehicle_mods.len(),
        store.lifestyle_qualities.len(),
        store.drug_components.len()
    );

    let mut stores = STORES.write().await;
    Ok(Arc::clone(stores.entry(key).or_insert_with(|| Arc::new(store))))
}

/// Blocking wrapper around [`load_definitions`].
pub fn load_definitions_blocking(settings: &Settings) -> Result<Arc<DefinitionStore>, GearError> {
    block_on(load_definitions(settings))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> DefinitionStore {
        DefinitionStore::from_embedded(DEFAULT_LANGUAGE).expect("embedded data should parse")
    }

    #[test]
    fn test_lookup_by_name_and_guid() {
        let store = store();
        let by_name = store.vehicle_mod("Rigger Interface").expect("by name");
        let by_id = store
            .vehicle_mod(&by_name.id.to_string())
            .expect("by guid");
        assert_eq!(by_name, by_id);
    }

    #[test]
    fn test_missing_definition_reports_category() {
        let error = store().lifestyle_quality("Does Not Exist").unwrap_err();
        assert!(matches!(
            error,
            GearError::DefinitionNotFound {
                category: DefinitionCategory::LifestyleQualities,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_language_falls_back() {
        let store = DefinitionStore::from_embedded("xx-yy").expect("fallback store");
        assert_eq!(store.language(), DEFAULT_LANGUAGE);
        assert!(!store.drug_components().is_empty());
    }

    #[test]
    fn test_every_premade_drug_references_known_components() {
        let store = store();
        for drug in store.drugs() {
            for component in &drug.components {
                assert!(
                    store.drug_component(&component.name).is_ok(),
                    "{} references unknown component {}",
                    drug.name,
                    component.name
                );
            }
        }
    }

    #[tokio::test]
    async fn test_stores_are_cached_per_language() {
        let settings = Settings::default();
        let first = load_definitions(&settings).await.expect("load");
        let second = load_definitions(&settings).await.expect("load again");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_loads_from_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let language_dir = dir.path().join(DEFAULT_LANGUAGE);
        std::fs::create_dir_all(&language_dir).expect("create language dir");
        for category in <DefinitionCategory as strum::IntoEnumIterator>::iter() {
            std::fs::write(language_dir.join(category.file_name()), "[]").expect("write data");
        }

        let store = DefinitionStore::from_dir(dir.path(), "de-de").await.expect("load dir");
        assert_eq!(store.language(), DEFAULT_LANGUAGE);
        assert!(store.vehicles().is_empty());
    }
}
