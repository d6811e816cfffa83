use std::{fmt, iter::Sum, ops::Add, str::FromStr};

use crate::{
    EngineError,
    decimal::{hundredths_from_f64, parse_hundredths, write_hundredths},
};

/// Percentage stored as integer hundredths of a percent (`100% == 10_000`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Percent(i64);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const FULL: Percent = Percent(10_000);
    /// Deviation from 100% still accepted by the split validation (0.01%).
    pub const TOLERANCE: Percent = Percent(1);

    #[must_use]
    pub const fn new(hundredths: i64) -> Self {
        Self(hundredths)
    }

    #[must_use]
    pub const fn hundredths(self) -> i64 {
        self.0
    }

    /// Converts a float percentage from the wire (e.g. `33.33`).
    pub fn from_f64(value: f64) -> Result<Self, EngineError> {
        hundredths_from_f64(value)
            .map(Percent)
            .ok_or_else(|| EngineError::InvalidPercent(format!("{value} is not a percentage")))
    }

    #[must_use]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// `true` when the value is within [`Percent::TOLERANCE`] of 100%.
    #[must_use]
    pub fn is_whole(self) -> bool {
        (self.0 - Self::FULL.0).abs() <= Self::TOLERANCE.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hundredths(f, self.0, "")
    }
}

impl Add for Percent {
    type Output = Percent;

    fn add(self, rhs: Percent) -> Self::Output {
        Percent(self.0 + rhs.0)
    }
}

/// Saturates at the `i64` bounds.
impl Sum for Percent {
    fn sum<I: Iterator<Item = Percent>>(iter: I) -> Self {
        iter.fold(Percent::ZERO, |acc, value| Percent(acc.0.saturating_add(value.0)))
    }
}

impl FromStr for Percent {
    type Err = EngineError;

    /// Parses `"60"`, `"33.33"` or `"12,5%"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = s.trim().trim_end_matches('%');
        parse_hundredths(cleaned)
            .map(Percent)
            .map_err(|err| EngineError::InvalidPercent(err.describe().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        assert_eq!("60".parse::<Percent>().unwrap(), Percent::new(6_000));
        assert_eq!("33.33%".parse::<Percent>().unwrap(), Percent::new(3_333));
        assert_eq!(Percent::new(9_950).to_string(), "99.50");
        assert!("1.234".parse::<Percent>().is_err());
    }

    #[test]
    fn whole_accepts_one_hundredth_of_drift() {
        assert!(Percent::new(9_999).is_whole());
        assert!(Percent::new(10_001).is_whole());
        assert!(!Percent::new(10_100).is_whole());
        assert!(!Percent::new(9_998).is_whole());
    }
}
