use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use crate::{
    EngineError, Percent,
    decimal::{hundredths_from_f64, parse_hundredths, write_hundredths},
};

/// Signed money amount represented as **integer cents**.
///
/// Use this type for **all** monetary values in the engine (totals, split
/// shares, balances) to avoid floating-point drift. The backend speaks JSON
/// numbers; convert at the boundary with [`MoneyCents::from_major`] and
/// [`MoneyCents::to_major`].
///
/// The value is signed. For balances:
/// - positive = owed to the member
/// - negative = the member owes others
///
/// # Examples
///
/// ```rust
/// use engine::MoneyCents;
///
/// let amount = MoneyCents::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "$12.34");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; rejects >
/// 2 decimals):
///
/// ```rust
/// use engine::MoneyCents;
///
/// assert_eq!("10".parse::<MoneyCents>().unwrap().cents(), 1000);
/// assert_eq!("10,5".parse::<MoneyCents>().unwrap().cents(), 1050);
/// assert!("12.345".parse::<MoneyCents>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct MoneyCents(i64);

/// Difference allowed between two sums that must reconcile (one cent).
pub const TOLERANCE: MoneyCents = MoneyCents(1);

impl MoneyCents {
    pub const ZERO: MoneyCents = MoneyCents(0);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[must_use]
    pub const fn abs(self) -> MoneyCents {
        MoneyCents(self.0.abs())
    }

    /// Converts a major-unit float from the wire (e.g. `12.345`) into cents,
    /// rounding half away from zero.
    pub fn from_major(value: f64) -> Result<Self, EngineError> {
        hundredths_from_f64(value)
            .map(MoneyCents)
            .ok_or_else(|| EngineError::InvalidAmount(format!("{value} is not a valid amount")))
    }

    /// Major-unit float for the wire.
    #[must_use]
    pub fn to_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// `true` when `self` and `other` differ by at most [`TOLERANCE`].
    #[must_use]
    pub fn reconciles_with(self, other: MoneyCents) -> bool {
        (self.0 - other.0).abs() <= TOLERANCE.0
    }

    /// Share of `self` for `percent`, rounded half away from zero.
    #[must_use]
    pub fn percent_of(self, percent: Percent) -> MoneyCents {
        let numerator = i128::from(self.0) * i128::from(percent.hundredths());
        let denominator = i128::from(Percent::FULL.hundredths());
        let half = denominator / 2;
        let rounded = if numerator >= 0 {
            (numerator + half) / denominator
        } else {
            (numerator - half) / denominator
        };
        MoneyCents(rounded as i64)
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_add(rhs.0).map(MoneyCents)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_sub(rhs.0).map(MoneyCents)
    }

    /// Sum of `values`, `None` on overflow.
    pub fn checked_sum<I>(values: I) -> Option<MoneyCents>
    where
        I: IntoIterator<Item = MoneyCents>,
    {
        values
            .into_iter()
            .try_fold(MoneyCents::ZERO, MoneyCents::checked_add)
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hundredths(f, self.0, "$")
    }
}

impl From<i64> for MoneyCents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<MoneyCents> for i64 {
    fn from(value: MoneyCents) -> Self {
        value.0
    }
}

impl Add for MoneyCents {
    type Output = MoneyCents;

    fn add(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 + rhs.0)
    }
}

impl AddAssign for MoneyCents {
    fn add_assign(&mut self, rhs: MoneyCents) {
        self.0 += rhs.0;
    }
}

impl Sub for MoneyCents {
    type Output = MoneyCents;

    fn sub(self, rhs: MoneyCents) -> Self::Output {
        MoneyCents(self.0 - rhs.0)
    }
}

impl SubAssign for MoneyCents {
    fn sub_assign(&mut self, rhs: MoneyCents) {
        self.0 -= rhs.0;
    }
}

impl Mul<i64> for MoneyCents {
    type Output = MoneyCents;

    fn mul(self, rhs: i64) -> Self::Output {
        MoneyCents(self.0 * rhs)
    }
}

impl Neg for MoneyCents {
    type Output = MoneyCents;

    fn neg(self) -> Self::Output {
        MoneyCents(-self.0)
    }
}

/// Saturates at the `i64` bounds; use [`MoneyCents::checked_sum`] where an
/// overflow must be reported.
impl Sum for MoneyCents {
    fn sum<I: Iterator<Item = MoneyCents>>(iter: I) -> Self {
        iter.fold(MoneyCents::ZERO, |acc, value| {
            MoneyCents(acc.0.saturating_add(value.0))
        })
    }
}

impl<'a> Sum<&'a MoneyCents> for MoneyCents {
    fn sum<I: Iterator<Item = &'a MoneyCents>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl FromStr for MoneyCents {
    type Err = EngineError;

    /// Parses a decimal string into cents.
    ///
    /// Accepts `.` or `,` as decimal separator, an optional leading `+`/`-`
    /// and an optional `$` before the digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let cleaned = match trimmed.strip_prefix('-') {
            Some(rest) => format!("-{}", rest.trim_start().trim_start_matches('$')),
            None => trimmed.trim_start_matches('$').to_string(),
        };
        parse_hundredths(&cleaned)
            .map(MoneyCents)
            .map_err(|err| EngineError::InvalidAmount(err.describe().to_string()))
    }
}
