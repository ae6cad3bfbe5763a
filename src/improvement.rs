use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attributes::{Attribute, LimitKind};
use crate::context::EvalContext;
use crate::rules::evaluate_int;

// Kind of entity that granted an improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Drug,
    LifestyleQuality,
    VehicleMod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImprovementSource {
    pub kind: SourceKind,
    pub id: Uuid,
}

impl ImprovementSource {
    pub fn new(kind: SourceKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}

// What an improvement modifies on the character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "target")]
pub enum ImprovementKind {
    Attribute(Attribute),
    Limit(LimitKind),
    Initiative,
    InitiativeDice,
    LifestyleCost, // Percentage applied to every lifestyle's base cost.
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    pub source: ImprovementSource,
    pub kind: ImprovementKind,
    pub value: i32,
}

// A bonus as written in a definition; `value` is a rule expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementSpec {
    pub kind: ImprovementKind,
    pub value: String,
}

impl ImprovementSpec {
    pub fn evaluate(&self, source: ImprovementSource, context: &EvalContext) -> Improvement {
        Improvement {
            source,
            kind: self.kind,
            value: evaluate_int(&self.value, context).value,
        }
    }
}

/// Every improvement currently applied to a character.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Improvements(Vec<Improvement>);

impl Improvements {
    pub fn add(&mut self, improvement: Improvement) {
        log::debug!(
            "Adding improvement {:?} {} from {:?}",
            improvement.kind,
            improvement.value,
            improvement.source
        );
        self.0.push(improvement);
    }

    pub fn extend(&mut self, improvements: impl IntoIterator<Item = Improvement>) {
        for improvement in improvements {
            self.add(improvement);
        }
    }

    /// Drop everything granted by `source`, returning how many were removed.
    pub fn remove_source(&mut self, source: ImprovementSource) -> usize {
        let before = self.0.len();
        self.0.retain(|improvement| improvement.source != source);
        let removed = before - self.0.len();
        if removed > 0 {
            log::debug!("Removed {removed} improvement(s) from {source:?}");
        }
        removed
    }

    pub fn total(&self, kind: ImprovementKind) -> i32 {
        self.0
            .iter()
            .filter(|improvement| improvement.kind == kind)
            .map(|improvement| improvement.value)
            .sum()
    }

    pub fn from_source(&self, source: ImprovementSource) -> impl Iterator<Item = &Improvement> {
        self.0
            .iter()
            .filter(move |improvement| improvement.source == source)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Improvement> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_and_source_removal() {
        let drug = ImprovementSource::new(SourceKind::Drug, Uuid::new_v4());
        let quality = ImprovementSource::new(SourceKind::LifestyleQuality, Uuid::new_v4());
        let mut improvements = Improvements::default();
        improvements.add(Improvement {
            source: drug,
            kind: ImprovementKind::Attribute(Attribute::Reaction),
            value: 2,
        });
        improvements.add(Improvement {
            source: quality,
            kind: ImprovementKind::Attribute(Attribute::Reaction),
            value: 1,
        });
        improvements.add(Improvement {
            source: drug,
            kind: ImprovementKind::InitiativeDice,
            value: 1,
        });

        assert_eq!(improvements.total(ImprovementKind::Attribute(Attribute::Reaction)), 3);
        assert_eq!(improvements.from_source(drug).count(), 2);
        assert_eq!(improvements.remove_source(drug), 2);
        assert_eq!(improvements.total(ImprovementKind::Attribute(Attribute::Reaction)), 1);
        assert_eq!(improvements.total(ImprovementKind::InitiativeDice), 0);
    }

    #[test]
    fn test_bonus_is_evaluated_against_context() {
        let bonus: ImprovementSpec = serde_json::from_str(
            r#"{ "kind": { "type": "Limit", "target": "Mental" }, "value": "+Rating" }"#,
        )
        .expect("parse bonus");
        let source = ImprovementSource::new(SourceKind::LifestyleQuality, Uuid::new_v4());
        let improvement = bonus.evaluate(source, &EvalContext::new(2));
        assert_eq!(improvement.kind, ImprovementKind::Limit(LimitKind::Mental));
        assert_eq!(improvement.value, 2);
    }
}
