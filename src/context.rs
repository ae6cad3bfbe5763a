use std::borrow::Cow;
use strum::IntoEnumIterator;

use crate::attributes::{Attribute, AttributeSnapshot};

/// Named numeric inputs a rule expression is evaluated against.
///
/// `Rating` (and `MaxRating` when known) are always available; everything
/// else is registered by the entity building the context. A name registered
/// without a value still counts as recognised and substitutes as `0`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalContext {
    rating: i32,
    max_rating: Option<i32>,
    values: Vec<(Cow<'static, str>, Option<f64>)>,
}

impl EvalContext {
    pub fn new(rating: i32) -> Self {
        Self {
            rating: rating.max(0),
            ..Self::default()
        }
    }

    pub fn rating(&self) -> i32 {
        self.rating
    }

    pub fn max_rating(&self) -> Option<i32> {
        self.max_rating
    }

    pub fn with_max_rating(mut self, max_rating: i32) -> Self {
        self.max_rating = Some(max_rating);
        self
    }

    pub fn with_value(self, name: impl Into<Cow<'static, str>>, value: f64) -> Self {
        self.with_optional(name, Some(value))
    }

    pub fn with_optional(mut self, name: impl Into<Cow<'static, str>>, value: Option<f64>) -> Self {
        self.set(name, value);
        self
    }

    // Every attribute abbreviation (BOD, AGI, ...) plus ESS; missing values count as 0.
    pub fn with_attributes(mut self, attributes: &AttributeSnapshot) -> Self {
        for attribute in Attribute::iter() {
            self.set(attribute.as_ref().to_string(), Some(f64::from(attributes.get(attribute))));
        }
        self.set("ESS", Some(attributes.essence()));
        self
    }

    pub fn set(&mut self, name: impl Into<Cow<'static, str>>, value: Option<f64>) {
        let name = name.into();
        match self.values.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        match name {
            "Rating" => Some(self.rating as f64),
            "MaxRating" => self.max_rating.map(f64::from),
            _ => self
                .values
                .iter()
                .find(|(existing, _)| existing == name)
                .and_then(|(_, value)| *value),
        }
    }

    /// Every recognised name with its substitution value, longest name first
    /// so that `Vehicle Cost` wins over a shorter overlapping name.
    pub(crate) fn placeholders(&self) -> Vec<(&str, f64)> {
        let mut placeholders: Vec<(&str, f64)> = self
            .values
            .iter()
            .map(|(name, value)| (&**name, value.unwrap_or(0.0)))
            .collect();
        // Attribute names are always recognised, even before a snapshot is attached.
        for attribute in Attribute::iter() {
            let name: &'static str = attribute.into();
            if !placeholders.iter().any(|(existing, _)| *existing == name) {
                placeholders.push((name, 0.0));
            }
        }
        if !placeholders.iter().any(|(existing, _)| *existing == "ESS") {
            placeholders.push(("ESS", 0.0));
        }
        placeholders.push(("Rating", self.rating as f64));
        placeholders.push(("MaxRating", self.max_rating.map(f64::from).unwrap_or(0.0)));
        placeholders.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        placeholders
    }
}
