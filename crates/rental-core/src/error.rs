//! # Error Types
//!
//! Domain-specific error types for rental-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  rental-core errors (this file)                                        │
//! │  ├── CoreError        - Lifecycle and domain rule violations           │
//! │  └── ValidationError  - Input / policy validation failures             │
//! │                                                                         │
//! │  rental-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  rental-engine errors                                                  │
//! │  └── EngineError      - Validation / Conflict / State / NotFound       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::BookingStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Every variant is an *expected* outcome: callers branch on it as part of
/// normal control flow.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The booking's current status does not allow the requested action.
    ///
    /// ## When This Occurs
    /// - Check-in on a booking that is not `confirmed`
    /// - Check-out on a booking that is not `ongoing`
    /// - Cancelling after hand-off
    #[error("Booking {booking_id} is {current_status}, cannot {action}")]
    InvalidBookingStatus {
        booking_id: String,
        current_status: BookingStatus,
        action: String,
    },

    /// Check-in was already recorded for this booking.
    ///
    /// ## User Workflow
    /// ```text
    /// checkin() ── network timeout ── retry checkin()
    ///                                      │
    ///                                      ▼
    ///                             AlreadyCheckedIn (no side effects)
    /// ```
    #[error("Booking {booking_id} was already checked in")]
    AlreadyCheckedIn { booking_id: String },

    /// Check-out attempted on a booking with no recorded hand-off.
    #[error("Booking {booking_id} has no check-in recorded")]
    NotCheckedIn { booking_id: String },

    /// The incident already carries a resolution.
    #[error("Incident {incident_id} is already resolved")]
    IncidentAlreadyResolved { incident_id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns true for lifecycle violations (the StateError family).
    pub fn is_state_error(&self) -> bool {
        !matches!(self, CoreError::Validation(_))
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when a request violates a field rule or the
/// rental policy. They carry the field name for field-level messages.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Too many entries in a list field.
    #[error("{field} must have at most {max} entries")]
    TooMany { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format or inconsistent values.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Start date is not strictly before end date.
    #[error("start date {start} must be before end date {end}")]
    InvalidRange { start: String, end: String },

    /// Rental span is shorter than the minimum stay.
    #[error("rental span of {days} days is shorter than the minimum of {min} days")]
    SpanTooShort { days: i64, min: i64 },

    /// Rental span is longer than the maximum stay.
    #[error("rental span of {days} days is longer than the maximum of {max} days")]
    SpanTooLong { days: i64, max: i64 },

    /// A computed amount does not fit in the money type.
    #[error("{field} exceeds the largest supported amount")]
    AmountTooLarge { field: String },
}

impl ValidationError {
    /// Returns the field this error refers to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::TooMany { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::MustNotBeNegative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::AmountTooLarge { field } => field,
            ValidationError::InvalidRange { .. }
            | ValidationError::SpanTooShort { .. }
            | ValidationError::SpanTooLong { .. } => "endDate",
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidBookingStatus {
            booking_id: "b-1".to_string(),
            current_status: BookingStatus::Pending,
            action: "check in".to_string(),
        };
        assert_eq!(err.to_string(), "Booking b-1 is pending, cannot check in");

        let err = ValidationError::SpanTooShort { days: 2, min: 3 };
        assert_eq!(
            err.to_string(),
            "rental span of 2 days is shorter than the minimum of 3 days"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "renterId".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert!(!core_err.is_state_error());
    }

    #[test]
    fn test_field_names() {
        let err = ValidationError::MustBePositive {
            field: "dailyRate".to_string(),
        };
        assert_eq!(err.field(), "dailyRate");
        assert_eq!(ValidationError::SpanTooShort { days: 1, min: 3 }.field(), "endDate");
        assert_eq!(ValidationError::SpanTooLong { days: 400, max: 365 }.field(), "endDate");
    }
}
