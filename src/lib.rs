pub mod arena;
pub mod attributes;
pub mod cache;
pub mod character;
pub mod context;
pub mod definitions;
pub mod drug;
pub mod drug_component;
pub mod error;
pub mod expression;
pub mod improvement;
pub mod lifestyle;
pub mod lifestyle_quality;
pub mod logging;
pub mod prompt;
pub mod report;
pub mod rules;
pub mod save;
pub mod settings;
pub mod shared;
pub mod utils;
pub mod vehicle;
pub mod vehicle_mod;

// Re-export commonly used items for easier access
pub use arena::{Arena, Handle};
pub use attributes::{Attribute, AttributeSnapshot, LimitKind};
pub use cache::Change;
pub use character::{Character, Race};
pub use context::EvalContext;
pub use definitions::{DefinitionStore, load_definitions, load_definitions_blocking};
pub use drug::{Drug, DrugDuration, DrugField};
pub use drug_component::{DrugComponent, DrugComponentCategory, DrugComponentField, DrugEffect};
pub use error::{ExpressionError, GearError};
pub use expression::evaluate_invariant;
pub use improvement::{Improvement, ImprovementKind, ImprovementSource, Improvements};
pub use lifestyle::Lifestyle;
pub use lifestyle_quality::{LifestyleQuality, LifestyleQualityCategory, LifestyleQualityField};
pub use prompt::{AutoPrompt, UserPrompt};
pub use report::CharacterReport;
pub use rules::{AvailSuffix, AvailabilityValue, SignedValue};
pub use save::SaveManager;
pub use settings::Settings;
pub use shared::SharedCharacter;
pub use vehicle::{Vehicle, VehicleStat};
pub use vehicle_mod::{MountedWeapon, VehicleMod, VehicleModField};
