//! # Validation Module
//!
//! Field validation for booking requests and hand-off reports.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (booking UI / API)                                    │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE + pricing policy (minimum stay)                  │
//! │  └── Field rules, returned as ValidationError with the field name      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (start_date < end_date)                                     │
//! │  └── Overlap trigger on reservation windows                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::IncidentOutcome;
use crate::{MAX_IMAGES_PER_EVENT, MAX_LATE_MINUTES, MAX_TEXT_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates an identifier supplied by an external service.
///
/// ## Example
/// ```rust
/// use rental_core::validation::validate_id;
///
/// assert!(validate_id("renterId", "user-42").is_ok());
/// assert!(validate_id("renterId", "   ").is_err());
/// ```
pub fn validate_id(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > 128 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 128,
        });
    }

    Ok(())
}

/// Validates the number of units requested.
pub fn validate_quantity(quantity: i64, max: i64) -> ValidationResult<()> {
    if quantity < 1 || quantity > max {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max,
        });
    }
    Ok(())
}

/// Validates optional free text (notes, descriptions, reasons).
pub fn validate_text(field: &str, value: Option<&str>) -> ValidationResult<()> {
    match value {
        Some(text) if text.chars().count() > MAX_TEXT_LEN => Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        }),
        _ => Ok(()),
    }
}

/// Validates evidence image references.
///
/// ## Rules
/// - At most [`MAX_IMAGES_PER_EVENT`] entries
/// - No blank entries
pub fn validate_images(field: &str, images: &[String]) -> ValidationResult<()> {
    if images.len() > MAX_IMAGES_PER_EVENT {
        return Err(ValidationError::TooMany {
            field: field.to_string(),
            max: MAX_IMAGES_PER_EVENT,
        });
    }

    if images.iter().any(|i| i.trim().is_empty()) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "image reference must not be blank".to_string(),
        });
    }

    Ok(())
}

/// Reported lateness must not be negative and is capped at a year.
pub fn validate_late_minutes(late_minutes: i64) -> ValidationResult<()> {
    if late_minutes < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "lateMinutes".to_string(),
        });
    }
    if late_minutes > MAX_LATE_MINUTES {
        return Err(ValidationError::OutOfRange {
            field: "lateMinutes".to_string(),
            min: 0,
            max: MAX_LATE_MINUTES,
        });
    }
    Ok(())
}

/// Validates a review decision.
///
/// ## Rules
/// - The amount is never negative
/// - A waived incident settles at zero
pub fn validate_resolution(amount: Money, outcome: IncidentOutcome) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "resolutionAmount".to_string(),
        });
    }

    if outcome == IncidentOutcome::Waived && !amount.is_zero() {
        return Err(ValidationError::InvalidFormat {
            field: "resolutionAmount".to_string(),
            reason: "a waived incident must resolve to 0".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
