//! # Pricing Calculator
//!
//! Maps a date range, a daily rate and an insurance selection to a price
//! breakdown. This is the only pricing implementation: the booking UI calls
//! it for the instant preview and the engine calls it again at commit.
//!
//! ## Chargeable Days
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Fri 1   Sat 2   Sun 3   Mon 4   Tue 5                                  │
//! │  ─────   ─────────────   ─────   ─────                                  │
//! │  pickup  weekend run     weekday return                                 │
//! │  (free)  = 1 day         = 1 day (free)                                 │
//! │                                                                         │
//! │  chargeable_days = 2                                                    │
//! │                                                                         │
//! │  • first and last calendar day are never billed                        │
//! │  • each interior weekday counts 1                                       │
//! │  • each contiguous run of Sat/Sun counts 1, whether 1 or 2 days long   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fees
//! - `base_price   = chargeable_days × daily_rate`
//! - `service_fee  = round(base_price × 5%)`
//! - `insurance_fee = max(15000, round(avgCoverage × 0.15% × chargeable_days))`
//!   or zero when no package is selected

use chrono::{Datelike, Weekday};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{DateRange, InsuranceSelection, Rate};

/// Service fee charged on the base price.
pub const SERVICE_FEE_RATE: Rate = Rate::from_bps(500);

/// Insurance premium per chargeable day, as a share of average coverage (0.15%).
pub const INSURANCE_DAILY_RATE: Rate = Rate::from_bps(15);

/// Lowest insurance fee charged when a package is selected.
pub const INSURANCE_MIN_FEE: Money = Money::from_units(15_000);

/// Shortest allowed rental span (`end - start`) in calendar days.
pub const MIN_SPAN_DAYS: i64 = 3;

/// Longest allowed rental span in calendar days.
pub const MAX_SPAN_DAYS: i64 = 365;

// =============================================================================
// Price Breakdown
// =============================================================================

/// Result of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceBreakdown {
    pub chargeable_days: i64,
    pub daily_rate: Money,
    pub base_price: Money,
    pub service_fee: Money,
    pub insurance_fee: Money,
    pub total_price: Money,
}

// =============================================================================
// Calculator
// =============================================================================

#[inline]
fn is_weekend(weekday: Weekday) -> bool {
    matches!(weekday, Weekday::Sat | Weekday::Sun)
}

/// Counts chargeable days for a range, floored at 1.
///
/// Does not enforce the minimum stay; [`quote`] does.
pub fn chargeable_days(range: &DateRange) -> i64 {
    let mut days = 0;
    let mut in_weekend_run = false;

    for day in range.interior_days() {
        if is_weekend(day.weekday()) {
            if !in_weekend_run {
                days += 1;
                in_weekend_run = true;
            }
        } else {
            days += 1;
            in_weekend_run = false;
        }
    }

    days.max(1)
}

/// Insurance fee for a selection over `chargeable_days`.
///
/// ## Implementation
/// `avgCoverage × 0.0015 × days` with `avgCoverage = (min + max) / 2` is
/// evaluated as `(min + max) × 15 × days / 20000` so the halving and the
/// rate share a single rounding step.
pub fn insurance_fee(selection: &InsuranceSelection, chargeable_days: i64) -> Money {
    match selection {
        InsuranceSelection::None => Money::zero(),
        InsuranceSelection::Package(pkg) => {
            let coverage_sum = pkg.min_coverage.units() as i128 + pkg.max_coverage.units() as i128;
            let numerator = coverage_sum * INSURANCE_DAILY_RATE.bps() as i128 * chargeable_days.max(1) as i128;
            let denominator = 2 * 10_000_i128;
            let premium = i64::try_from((numerator + denominator / 2) / denominator).unwrap_or(i64::MAX);
            Money::from_units(premium).max(INSURANCE_MIN_FEE)
        }
    }
}

/// Computes the full price breakdown.
///
/// ## Errors
/// - `SpanTooShort` when `end - start < 3` days
/// - `SpanTooLong` when `end - start > 365` days
/// - `AmountTooLarge` when a price does not fit in `Money`
/// - `MustBePositive` when the daily rate is not positive
/// - `InvalidFormat` when a package's coverage bounds are inverted or negative
///
/// ## Determinism
/// Depends only on its arguments: no clock, no locale, no configuration.
pub fn quote(
    range: &DateRange,
    daily_rate: Money,
    insurance: &InsuranceSelection,
) -> CoreResult<PriceBreakdown> {
    let span = range.span_days();
    if span < MIN_SPAN_DAYS {
        return Err(ValidationError::SpanTooShort {
            days: span,
            min: MIN_SPAN_DAYS,
        }
        .into());
    }
    if span > MAX_SPAN_DAYS {
        return Err(ValidationError::SpanTooLong {
            days: span,
            max: MAX_SPAN_DAYS,
        }
        .into());
    }

    if !daily_rate.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "dailyRate".to_string(),
        }
        .into());
    }

    if let InsuranceSelection::Package(pkg) = insurance {
        if pkg.min_coverage.is_negative() || pkg.min_coverage > pkg.max_coverage {
            return Err(ValidationError::InvalidFormat {
                field: "insurance".to_string(),
                reason: format!(
                    "coverage bounds {}..{} are invalid",
                    pkg.min_coverage, pkg.max_coverage
                ),
            }
            .into());
        }
    }

    let too_large = |field: &str| -> CoreError {
        ValidationError::AmountTooLarge {
            field: field.to_string(),
        }
        .into()
    };

    let days = chargeable_days(range);
    let base_price = daily_rate
        .checked_mul(days)
        .ok_or_else(|| too_large("basePrice"))?;
    let service_fee = base_price.apply_rate(SERVICE_FEE_RATE);
    let insurance_fee = insurance_fee(insurance, days);
    let total_price = base_price
        .checked_add(service_fee)
        .and_then(|subtotal| subtotal.checked_add(insurance_fee))
        .ok_or_else(|| too_large("totalPrice"))?;

    Ok(PriceBreakdown {
        chargeable_days: days,
        daily_rate,
        base_price,
        service_fee,
        insurance_fee,
        total_price,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
