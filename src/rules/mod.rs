//! The rule-expression pipeline shared by every gear entity.
//!
//! 1. per-Rating selection (`FixedValues(...)`, `Range(...)`)
//! 2. placeholder substitution (`Rating`, `Body`, attribute abbreviations, ...)
//! 3. sign handling (`+x` / `-x` modify the parent instead of replacing it)
//! 4. evaluation, where any failure quietly yields 0
//! 5. rounding half away from zero for integer fields
//!
//! Malformed rule data never surfaces as an error here: data files are
//! trusted, and a broken entry should cost the user a zero, not the sheet.

pub mod selection;
pub mod substitution;
pub mod value;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::str::FromStr;

use crate::context::EvalContext;
use crate::expression::evaluate_invariant;

pub use selection::{VariableRange, select_for_rating};
pub use substitution::substitute;
pub use value::{AvailSuffix, AvailabilityValue, SignedValue, standard_round};

// Leading `+` is stripped; leading `-` stays part of the value. Both mark add-to-parent.
fn split_sign(expression: &str) -> (&str, bool) {
    let trimmed = expression.trim();
    match trimmed.strip_prefix('+') {
        Some(rest) => (rest.trim_start(), true),
        None => (trimmed, trimmed.starts_with('-')),
    }
}

fn split_suffix(expression: &str) -> (&str, AvailSuffix) {
    let trimmed = expression.trim();
    match trimmed.chars().last().and_then(AvailSuffix::from_char) {
        Some(suffix) => (trimmed[..trimmed.len() - 1].trim_end(), suffix),
        None => (trimmed, AvailSuffix::None),
    }
}

fn evaluate_body(body: &str, context: &EvalContext) -> f64 {
    if body.trim().is_empty() {
        return 0.0;
    }
    if let Some(range) = VariableRange::parse(body) {
        return range.min.to_f64().unwrap_or(0.0);
    }

    let substituted = substitute(body, context);
    match evaluate_invariant(&substituted) {
        Ok(value) => value,
        Err(e) => {
            log::debug!("Rule expression '{body}' evaluated to 0: {e}");
            0.0
        }
    }
}

/// Evaluate to a raw `f64`.
pub fn evaluate_number(expression: &str, context: &EvalContext) -> SignedValue<f64> {
    let selected = select_for_rating(expression, context);
    let (body, add_to_parent) = split_sign(&selected);
    SignedValue::new(evaluate_body(body, context), add_to_parent)
}

/// Evaluate an integer field (slots, capacity, bonuses, ratings).
pub fn evaluate_int(expression: &str, context: &EvalContext) -> SignedValue<i32> {
    evaluate_number(expression, context).map(standard_round)
}

/// Evaluate a decimal field (costs) without rounding.
pub fn evaluate_decimal(expression: &str, context: &EvalContext) -> SignedValue<Decimal> {
    let selected = select_for_rating(expression, context);
    let (body, add_to_parent) = split_sign(&selected);
    if let Ok(value) = Decimal::from_str(body) {
        return SignedValue::new(value, add_to_parent);
    }
    if let Some(range) = VariableRange::parse(body) {
        return SignedValue::new(range.min, add_to_parent);
    }

    let value = evaluate_body(body, context);
    SignedValue::new(
        Decimal::from_f64(value).unwrap_or(Decimal::ZERO),
        add_to_parent,
    )
}

/// Evaluate an availability expression, separating the `R`/`F` suffix.
pub fn evaluate_availability(expression: &str, context: &EvalContext) -> AvailabilityValue {
    let selected = select_for_rating(expression, context);
    let (body, suffix) = split_suffix(&selected);
    let (body, add_to_parent) = split_sign(body);
    AvailabilityValue {
        value: standard_round(evaluate_body(body, context)),
        suffix,
        add_to_parent,
        included_in_parent: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rating_expression() {
        let context = EvalContext::new(3);
        assert_eq!(evaluate_int("Rating*2", &context), SignedValue::new(6, false));
    }

    #[test]
    fn test_plus_prefix_adds_to_parent() {
        let context = EvalContext::new(1);
        assert_eq!(evaluate_int("+2", &context), SignedValue::new(2, true));
        assert_eq!(evaluate_int("-2", &context), SignedValue::new(-2, true));
        assert_eq!(evaluate_int("+Rating", &EvalContext::new(4)), SignedValue::new(4, true));
    }

    #[test]
    fn test_sign_outside_selection_wrapper() {
        let context = EvalContext::new(2);
        assert_eq!(evaluate_int("+FixedValues(1,2,3)", &context), SignedValue::new(2, true));
        assert_eq!(evaluate_int("-FixedValues(1,2,3)", &context), SignedValue::new(-2, true));
        assert_eq!(
            evaluate_int("-Range(2[100],4[200])", &EvalContext::new(3)),
            SignedValue::new(-200, true)
        );
        assert_eq!(
            evaluate_decimal("-Range(2[Rating * 50],4[200])", &context),
            SignedValue::new(Decimal::from(-100), true)
        );

        let availability = evaluate_availability("+FixedValues(2R,4R,6F)", &EvalContext::new(3));
        assert_eq!(availability.value, 6);
        assert_eq!(availability.suffix, AvailSuffix::Forbidden);
        assert!(availability.add_to_parent);

        let negative = evaluate_availability("-FixedValues(2,4R)", &context);
        assert_eq!(negative.value, -4);
        assert_eq!(negative.suffix, AvailSuffix::Restricted);
        assert!(negative.add_to_parent);
    }

    #[test]
    fn test_availability_suffixes() {
        let context = EvalContext::new(2);
        let forbidden = evaluate_availability("Rating*3F", &context);
        assert_eq!(forbidden, AvailabilityValue::new(6, AvailSuffix::Forbidden));

        let restricted = evaluate_availability("+4R", &context);
        assert_eq!(restricted.value, 4);
        assert_eq!(restricted.suffix, AvailSuffix::Restricted);
        assert!(restricted.add_to_parent);

        let fixed = evaluate_availability("FixedValues(4R,6R,8F)", &EvalContext::new(3));
        assert_eq!(fixed.to_string(), "8F");
    }

    #[test]
    fn test_failures_evaluate_to_zero() {
        let context = EvalContext::new(1);
        assert_eq!(evaluate_int("", &context).value, 0);
        assert_eq!(evaluate_int("Nonsense * 2", &context).value, 0);
        assert_eq!(evaluate_int("4 div 0", &context).value, 0);
        assert_eq!(evaluate_decimal("(((", &context).value, Decimal::ZERO);
        assert_eq!(evaluate_availability("F", &context), AvailabilityValue::new(0, AvailSuffix::Forbidden));
    }

    #[test]
    fn test_rounding_for_integer_fields() {
        let context = EvalContext::new(5);
        assert_eq!(evaluate_int("Rating div 2", &context).value, 3);
        assert_eq!(evaluate_int("7 div 2 * -1", &context).value, -4);
        assert_eq!(evaluate_availability("Rating * 0.5R", &context).value, 3);
    }

    #[test]
    fn test_decimal_keeps_precision() {
        let context = EvalContext::new(3).with_value("Vehicle Cost", 16000.0);
        assert_eq!(evaluate_decimal("1234.56", &context).value, Decimal::new(123456, 2));
        assert_eq!(
            evaluate_decimal("Vehicle Cost * 0.15", &context).value,
            Decimal::from(2400)
        );
        assert_eq!(evaluate_decimal("Rating * 2.5", &context).value, Decimal::new(75, 1));
        assert_eq!(evaluate_decimal("Variable(10-500)", &context).value, Decimal::from(10));
    }

    #[test]
    fn test_range_and_body_fallback() {
        let context = EvalContext::new(2)
            .with_max_rating(6)
            .with_value("Body", 0.5);
        let cost = evaluate_decimal("Range(1[100],MaxRating[Body * 1000])", &context);
        assert_eq!(cost.value, Decimal::from(500));
    }
}
