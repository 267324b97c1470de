use serde::{Serialize, Serializer};
use std::fmt;

/// Contribution of one item to one subscale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    Reversed,
    Excluded,
    Normal,
}

impl Polarity {
    pub const fn for_item(reversed: bool) -> Self {
        if reversed {
            Self::Reversed
        } else {
            Self::Normal
        }
    }

    pub const fn value(self) -> i8 {
        match self {
            Self::Reversed => -1,
            Self::Excluded => 0,
            Self::Normal => 1,
        }
    }

    pub const fn from_value(value: i64) -> Option<Self> {
        match value {
            -1 => Some(Self::Reversed),
            0 => Some(Self::Excluded),
            1 => Some(Self::Normal),
            _ => None,
        }
    }

    pub const fn is_scored(self) -> bool {
        !matches!(self, Self::Excluded)
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl Serialize for Polarity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.value())
    }
}

/// Lowest and highest raw response a scale's items accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseBounds {
    min: i32,
    max: i32,
}

impl ResponseBounds {
    pub fn new(min: i32, max: i32) -> Result<Self, super::KeyError> {
        if min >= max {
            return Err(super::KeyError::InvalidBounds { min, max });
        }
        Ok(Self { min, max })
    }

    pub const fn min(&self) -> i32 {
        self.min
    }

    pub const fn max(&self) -> i32 {
        self.max
    }

    /// Reflects `value` across the middle of the scale, so `min` and `max`
    /// swap and the midpoint stays put.
    pub fn reverse(&self, value: f64) -> f64 {
        f64::from(self.max) + f64::from(self.min) - value
    }

    pub fn midpoint(&self) -> f64 {
        (f64::from(self.max) + f64::from(self.min)) / 2.0
    }
}

impl fmt::Display for ResponseBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polarity_round_trips_through_its_integer_code() {
        for polarity in [Polarity::Reversed, Polarity::Excluded, Polarity::Normal] {
            assert_eq!(
                Polarity::from_value(i64::from(polarity.value())),
                Some(polarity)
            );
        }
        assert_eq!(Polarity::from_value(2), None);
        assert_eq!(Polarity::from_value(-2), None);
    }

    #[test]
    fn bounds_reject_empty_or_inverted_ranges() {
        assert!(ResponseBounds::new(1, 5).is_ok());
        assert!(ResponseBounds::new(5, 5).is_err());
        assert!(ResponseBounds::new(7, 1).is_err());
    }

    #[test]
    fn reverse_swaps_endpoints_and_fixes_midpoint() {
        let bounds = ResponseBounds::new(1, 5).expect("valid bounds");
        assert_eq!(bounds.reverse(1.0), 5.0);
        assert_eq!(bounds.reverse(5.0), 1.0);
        assert_eq!(bounds.reverse(bounds.midpoint()), 3.0);
    }

    #[test]
    fn reverse_is_an_involution() {
        let bounds = ResponseBounds::new(0, 6).expect("valid bounds");
        for raw in [0.0, 0.5, 2.0, 3.0, 4.25, 6.0, 9.0, -3.0] {
            assert_eq!(bounds.reverse(bounds.reverse(raw)), raw);
        }
    }
}
