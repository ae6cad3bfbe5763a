use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::str::FromStr;

use crate::context::EvalContext;

const FIXED_VALUES: &str = "FixedValues";
const RANGE: &str = "Range";
const VARIABLE: &str = "Variable";

/// Split on commas that are not nested inside `()` or `[]`.
pub fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, c) in list.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(list[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(list[start..].trim());
    parts
}

// `Name(inner)` -> `inner`; a missing closing parenthesis is tolerated.
fn unwrap_call<'a>(expression: &'a str, name: &str) -> Option<&'a str> {
    let inner = expression.strip_prefix(name)?.strip_prefix('(')?;
    Some(inner.strip_suffix(')').unwrap_or(inner))
}

/// `FixedValues(v1,...,vN)` picks `v[clamp(rating, 1, N) - 1]`.
pub fn select_fixed_value(expression: &str, rating: i32) -> Option<&str> {
    let values = split_top_level(unwrap_call(expression, FIXED_VALUES)?);
    let index = rating.clamp(1, values.len() as i32) as usize - 1;
    Some(values[index])
}

/// `Range(N1[code1],N2[code2],...)` picks the first bracket whose threshold is at
/// least `rating`. `MaxRating` is accepted as a threshold. Falls back to the last
/// bracket when none matches.
pub fn select_range(expression: &str, rating: i32, max_rating: Option<i32>) -> Option<&str> {
    let brackets: Vec<(Option<i32>, &str)> = split_top_level(unwrap_call(expression, RANGE)?)
        .into_iter()
        .filter_map(|entry| {
            let open = entry.find('[')?;
            let close = entry.rfind(']').filter(|close| *close > open)?;
            let threshold = match entry[..open].trim() {
                "MaxRating" => Some(max_rating.unwrap_or(i32::MAX)),
                threshold => threshold.parse().ok(),
            };
            Some((threshold, entry[open + 1..close].trim()))
        })
        .collect();

    brackets
        .iter()
        .find(|(threshold, _)| threshold.is_some_and(|threshold| rating <= threshold))
        .or(brackets.last())
        .map(|(_, code)| *code)
}

/// Resolve the per-Rating wrappers, returning the working expression.
///
/// A sign written outside the wrapper (`+FixedValues(...)`, `-Range(...)`)
/// is carried over to the selected value.
pub fn select_for_rating<'a>(expression: &'a str, context: &EvalContext) -> Cow<'a, str> {
    let trimmed = expression.trim();
    let select = |candidate: &'a str| {
        select_fixed_value(candidate, context.rating())
            .or_else(|| select_range(candidate, context.rating(), context.max_rating()))
    };

    if let Some(selected) = select(trimmed) {
        return Cow::Borrowed(selected);
    }
    let mut chars = trimmed.chars();
    match (chars.next(), select(chars.as_str().trim_start())) {
        (Some('+'), Some(selected)) if selected.starts_with('+') => Cow::Borrowed(selected),
        (Some('+'), Some(selected)) => Cow::Owned(format!("+{selected}")),
        (Some('-'), Some(selected)) => Cow::Owned(negate(selected)),
        _ => Cow::Borrowed(trimmed),
    }
}

// `-` applied to a selected code; a trailing availability suffix stays outside the parentheses.
fn negate(selected: &str) -> String {
    let selected = selected.trim().trim_start_matches('+').trim_start();
    if Decimal::from_str(selected).is_ok() {
        return format!("-{selected}");
    }
    match selected.strip_suffix(['R', 'F']) {
        Some(body) => format!("-({}){}", body.trim_end(), &selected[body.len()..]),
        None => format!("-({selected})"),
    }
}

/// Bounds of a `Variable(min-max)` or open-ended `Variable(min+)` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRange {
    pub min: Decimal,
    pub max: Option<Decimal>,
}

impl VariableRange {
    pub fn parse(expression: &str) -> Option<Self> {
        let inner = unwrap_call(expression.trim(), VARIABLE)?.trim();
        match inner.split_once('-') {
            Some((min, max)) => Some(Self {
                min: Decimal::from_str(min.trim()).ok()?,
                max: Decimal::from_str(max.trim()).ok(),
            }),
            None => Some(Self {
                min: Decimal::from_str(inner.trim_end_matches('+').trim()).ok()?,
                max: None,
            }),
        }
    }

    pub fn clamp(&self, value: Decimal) -> Decimal {
        let value = value.max(self.min);
        match self.max {
            Some(max) => value.min(max),
            None => value,
        }
    }
}
