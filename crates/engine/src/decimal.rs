//! Fixed-point parsing shared by [`MoneyCents`] and [`Percent`].
//!
//! Both types store a value scaled by 100, so a single parser covers them.
//!
//! [`MoneyCents`]: crate::MoneyCents
//! [`Percent`]: crate::Percent

/// Why a decimal string was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecimalError {
    Empty,
    Invalid,
    TooManyDecimals,
    Overflow,
}

impl DecimalError {
    pub(crate) fn describe(self) -> &'static str {
        match self {
            Self::Empty => "empty value",
            Self::Invalid => "invalid value",
            Self::TooManyDecimals => "too many decimals",
            Self::Overflow => "value too large",
        }
    }
}

/// Parses a decimal string into hundredths.
///
/// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
/// Rejects more than 2 fractional digits.
pub(crate) fn parse_hundredths(s: &str) -> Result<i64, DecimalError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(DecimalError::Empty);
    }

    let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
        (true, stripped)
    } else if let Some(stripped) = trimmed.strip_prefix('+') {
        (false, stripped)
    } else {
        (false, trimmed)
    };

    let rest = rest.trim();
    if rest.is_empty() {
        return Err(DecimalError::Empty);
    }

    let rest = rest.replace(',', ".");
    let mut parts = rest.split('.');
    let units_str = parts.next().ok_or(DecimalError::Invalid)?;
    let frac_str = parts.next();
    if parts.next().is_some() {
        return Err(DecimalError::Invalid);
    }

    if units_str.is_empty() || !units_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(DecimalError::Invalid);
    }
    let units: i64 = units_str.parse().map_err(|_| DecimalError::Overflow)?;

    let frac: i64 = match frac_str {
        None | Some("") => 0,
        Some(frac) => {
            if !frac.chars().all(|c| c.is_ascii_digit()) {
                return Err(DecimalError::Invalid);
            }
            match frac.len() {
                1 => frac.parse::<i64>().map_err(|_| DecimalError::Invalid)? * 10,
                2 => frac.parse::<i64>().map_err(|_| DecimalError::Invalid)?,
                _ => return Err(DecimalError::TooManyDecimals),
            }
        }
    };

    let total = units
        .checked_mul(100)
        .and_then(|v| v.checked_add(frac))
        .ok_or(DecimalError::Overflow)?;

    if negative {
        total.checked_neg().ok_or(DecimalError::Overflow)
    } else {
        Ok(total)
    }
}

/// Converts a floating point major value (as found on the wire) into
/// hundredths, rounding half away from zero.
pub(crate) fn hundredths_from_f64(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let scaled = (value * 100.0).round();
    if scaled.abs() > i64::MAX as f64 {
        return None;
    }
    Some(scaled as i64)
}

/// Writes `value` (hundredths) as `units.frac` with an optional prefix after
/// the sign, e.g. `-$10.50`.
pub(crate) fn write_hundredths(
    f: &mut std::fmt::Formatter<'_>,
    value: i64,
    prefix: &str,
) -> std::fmt::Result {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    write!(f, "{sign}{prefix}{}.{:02}", abs / 100, abs % 100)
}
