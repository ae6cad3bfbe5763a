use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

/// Legality marker carried at the end of an availability expression.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum AvailSuffix {
    #[default]
    None,
    Restricted,
    Forbidden,
}

impl AvailSuffix {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'R' => Some(AvailSuffix::Restricted),
            'F' => Some(AvailSuffix::Forbidden),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            AvailSuffix::None => ' ',
            AvailSuffix::Restricted => 'R',
            AvailSuffix::Forbidden => 'F',
        }
    }
}

/// Evaluated availability: value, legality suffix and how it combines with a parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AvailabilityValue {
    pub value: i32,
    pub suffix: AvailSuffix,
    pub add_to_parent: bool,
    pub included_in_parent: bool,
}

impl AvailabilityValue {
    pub fn new(value: i32, suffix: AvailSuffix) -> Self {
        Self {
            value,
            suffix,
            ..Self::default()
        }
    }
}

// Summing keeps the left-hand flags and the strongest suffix.
impl Add for AvailabilityValue {
    type Output = AvailabilityValue;

    fn add(self, rhs: AvailabilityValue) -> AvailabilityValue {
        AvailabilityValue {
            value: self.value.saturating_add(rhs.value),
            suffix: self.suffix.max(rhs.suffix),
            ..self
        }
    }
}

impl AddAssign for AvailabilityValue {
    fn add_assign(&mut self, rhs: AvailabilityValue) {
        *self = *self + rhs;
    }
}

impl fmt::Display for AvailabilityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.suffix {
            AvailSuffix::None => write!(f, "{}", self.value),
            suffix => write!(f, "{}{}", self.value, suffix.as_char()),
        }
    }
}

/// A rule result plus whether it modifies the parent's total instead of replacing it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SignedValue<T> {
    pub value: T,
    pub add_to_parent: bool,
}

impl<T> SignedValue<T> {
    pub fn new(value: T, add_to_parent: bool) -> Self {
        Self {
            value,
            add_to_parent,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SignedValue<U> {
        SignedValue {
            value: f(self.value),
            add_to_parent: self.add_to_parent,
        }
    }
}

/// Round half away from zero, saturating at the `i32` range.
pub fn standard_round(value: f64) -> i32 {
    value.round() as i32
}
