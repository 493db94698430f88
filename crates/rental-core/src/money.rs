//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  EVERY FIGURE IS AN INTEGER NUMBER OF CURRENCY UNITS                    │
//! │                                                                         │
//! │  Rounding happens exactly once per derived quantity:                   │
//! │    basePrice   = days × rate                (exact)                    │
//! │    serviceFee  = round(basePrice × 5%)      (one rounding)             │
//! │    damage      = round(replacement × 40%)   (one rounding)             │
//! │                                                                         │
//! │  Never on running partial sums, so a quote is reproducible to the      │
//! │  unit on every machine that computes it.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use rental_core::money::Money;
//! use rental_core::types::Rate;
//!
//! let base = Money::from_units(1_600_000);
//! let fee = base.apply_rate(Rate::from_bps(500)); // 5%
//! assert_eq!(fee.units(), 80_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};
use ts_rs::TS;

use crate::types::Rate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in whole currency units.
///
/// ## Design Decisions
/// - **i64 (signed)**: subtraction of settled amounts never panics
/// - **Single field tuple struct**: serializes as a bare integer
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole currency units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units)
    }

    /// Returns the value in whole currency units.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Applies a basis-point rate, rounding half up.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`.
    /// The +5000 provides rounding (5000/10000 = 0.5). Amounts handled by
    /// the engine are never negative, so half-up and half-away-from-zero agree.
    ///
    /// ## Example
    /// ```rust
    /// use rental_core::money::Money;
    /// use rental_core::types::Rate;
    ///
    /// let replacement = Money::from_units(45_000_000);
    /// let damage = replacement.apply_rate(Rate::from_bps(4000)); // 40%
    /// assert_eq!(damage.units(), 18_000_000);
    /// ```
    pub fn apply_rate(&self, rate: Rate) -> Money {
        // i128 prevents overflow on large replacement prices
        let units = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_units(units as i64)
    }

    /// Multiplies money by a count (days, hours, units).
    ///
    /// Returns `None` on overflow.
    #[inline]
    pub const fn checked_mul(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(units) => Some(Money(units)),
            None => None,
        }
    }

    /// Adds two amounts. Returns `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(units) => Some(Money(units)),
            None => None,
        }
    }

    /// Returns `self * numerator / denominator`, rounded half up.
    ///
    /// Used where the true factor is not a whole number of basis points,
    /// such as an hourly rate of `dailyRate / 24`.
    pub fn scale_rounded(&self, numerator: i64, denominator: i64) -> Money {
        debug_assert!(denominator > 0);
        let num = self.0 as i128 * numerator as i128;
        let den = denominator as i128;
        Money::from_units(((2 * num + den) / (2 * den)) as i64)
    }

    /// Returns the larger of two amounts.
    #[inline]
    pub fn max(self, other: Money) -> Money {
        if self.0 >= other.0 {
            self
        } else {
            other
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Groups thousands for logs and debugging: `1,600,000`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        if self.0 < 0 {
            write!(f, "-{}", grouped)
        } else {
            write!(f, "{}", grouped)
        }
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Money::from_units(1_600_000).to_string(), "1,600,000");
        assert_eq!(Money::from_units(999).to_string(), "999");
        assert_eq!(Money::from_units(1000).to_string(), "1,000");
        assert_eq!(Money::from_units(-15_000).to_string(), "-15,000");
        assert_eq!(Money::zero().to_string(), "0");
    }

    #[test]
    fn test_apply_rate_rounds_half_up() {
        // 5% of 10 = 0.5 → 1
        assert_eq!(Money::from_units(10).apply_rate(Rate::from_bps(500)).units(), 1);
        // 5% of 9 = 0.45 → 0
        assert_eq!(Money::from_units(9).apply_rate(Rate::from_bps(500)).units(), 0);
        assert_eq!(
            Money::from_units(1_600_000).apply_rate(Rate::from_bps(500)).units(),
            80_000
        );
    }

    #[test]
    fn test_scale_rounded() {
        // 800_000 / 24 × 2 = 66_666.67 → 66_667
        assert_eq!(Money::from_units(800_000).scale_rounded(2, 24).units(), 66_667);
        // 240 / 24 × 3 = 30 exactly
        assert_eq!(Money::from_units(240).scale_rounded(3, 24).units(), 30);
        // 36 / 24 = 1.5 → 2
        assert_eq!(Money::from_units(36).scale_rounded(1, 24).units(), 2);
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_units(1000);
        let b = Money::from_units(500);
        assert_eq!((a + b).units(), 1500);
        assert_eq!((a - b).units(), 500);
        assert_eq!((a * 3).units(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.units(), 2000);
        assert_eq!(a.max(b), a);
    }

    #[test]
    fn test_large_amounts_do_not_overflow() {
        let big = Money::from_units(9_000_000_000_000);
        assert_eq!(big.apply_rate(Rate::from_bps(10000)), big);
    }
}
