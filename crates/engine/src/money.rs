use std::{
    fmt,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};

/// Money amount represented as **integer cents**.
///
/// Use this type for **all** monetary values in the engine (balances,
/// transaction amounts, budget targets, goal targets) to avoid
/// floating-point drift. Floats appear only while multiplying by a currency
/// conversion rate, and the result is rounded straight back to cents.
///
/// Transaction amounts are stored positive; the income/expense kind carries
/// the sign, so the type itself stays signed for balance arithmetic.
///
/// # Examples
///
/// ```rust
/// use engine::MoneyCents;
///
/// let amount = MoneyCents::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct MoneyCents(i64);

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

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
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

    /// Converts the amount by a currency rate, rounding half-away-from-zero
    /// to whole cents.
    ///
    /// Returns `None` when the rate is not finite or the result does not fit
    /// in an `i64`.
    #[must_use]
    pub fn convert(self, rate: f64) -> Option<MoneyCents> {
        if !rate.is_finite() || rate <= 0.0 {
            return None;
        }
        let converted = (self.0 as f64) * rate;
        let rounded = converted.round();
        if rounded > i64::MAX as f64 || rounded < i64::MIN as f64 {
            return None;
        }
        Some(MoneyCents(rounded as i64))
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}{units}.{cents:02}")
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

impl Neg for MoneyCents {
    type Output = MoneyCents;

    fn neg(self) -> Self::Output {
        MoneyCents(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_cents() {
        assert_eq!(MoneyCents::new(0).to_string(), "0.00");
        assert_eq!(MoneyCents::new(1).to_string(), "0.01");
        assert_eq!(MoneyCents::new(1050).to_string(), "10.50");
        assert_eq!(MoneyCents::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn convert_rounds_to_whole_cents() {
        // 10.00 at rate 1.1305 -> 11.305 -> 11.31
        assert_eq!(
            MoneyCents::new(1000).convert(1.1305),
            Some(MoneyCents::new(1131))
        );
        assert_eq!(
            MoneyCents::new(9999).convert(0.5),
            Some(MoneyCents::new(5000))
        );
    }

    #[test]
    fn convert_rejects_bad_rates() {
        assert_eq!(MoneyCents::new(100).convert(0.0), None);
        assert_eq!(MoneyCents::new(100).convert(-1.2), None);
        assert_eq!(MoneyCents::new(100).convert(f64::NAN), None);
        assert_eq!(MoneyCents::new(100).convert(f64::INFINITY), None);
    }
}
