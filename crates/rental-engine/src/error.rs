//! # Engine Error Type
//!
//! Unified error type for booking operations.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Expected Outcomes vs. Faults                         │
//! │                                                                         │
//! │  ValidationError ─┐                                                     │
//! │  ConflictError   ─┼─► business outcomes: callers branch on them         │
//! │  StateError      ─┤                                                     │
//! │  NotFoundError   ─┤                                                     │
//! │  Authorization   ─┘   (raised by the calling layer's actor checks)     │
//! │                                                                         │
//! │  Storage(DbError) ──► infrastructure fault: abort, log, generic text    │
//! │                                                                         │
//! │  Serialized for callers as { "code": "CONFLICT",                        │
//! │                              "message": "dates no longer available" }   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

use rental_core::{CoreError, ValidationError};
use rental_db::DbError;

/// Error returned from engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input or policy violation (span too short, bad quantity, ...).
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The requested dates overlap an active reservation of the unit.
    #[error("Unit {unit} is not available for {start}..{end}")]
    Conflict {
        unit: String,
        start: String,
        end: String,
    },

    /// Illegal lifecycle transition, or a repeated one-way action.
    #[error("{0}")]
    State(CoreError),

    /// Unknown booking, equipment, package or incident.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The acting account is not a party to the booking.
    #[error("{actor_id} is not a participant of booking {booking_id}")]
    Authorization { actor_id: String, booking_id: String },

    /// Storage unreachable or failed mid-operation.
    #[error("Storage failure: {0}")]
    Storage(DbError),
}

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    Conflict,
    StateError,
    NotFound,
    Unauthorized,
    DatabaseError,
}

impl EngineError {
    /// Creates a not found error.
    pub fn not_found(entity: &str, id: &str) -> Self {
        EngineError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Validation(_) => ErrorCode::ValidationError,
            EngineError::Conflict { .. } => ErrorCode::Conflict,
            EngineError::State(_) => ErrorCode::StateError,
            EngineError::NotFound { .. } => ErrorCode::NotFound,
            EngineError::Authorization { .. } => ErrorCode::Unauthorized,
            EngineError::Storage(_) => ErrorCode::DatabaseError,
        }
    }

    /// `true` for expected outcomes, `false` for infrastructure faults.
    pub fn is_business(&self) -> bool {
        !matches!(self, EngineError::Storage(_))
    }

    /// Offending field for validation errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            EngineError::Validation(e) => Some(e.field()),
            _ => None,
        }
    }

    /// Text safe to show an end user.
    ///
    /// Storage details never leave the engine; they are logged once when the
    /// `DbError` is converted.
    pub fn user_message(&self) -> String {
        match self {
            EngineError::Validation(e) => e.to_string(),
            EngineError::Conflict { .. } => "dates no longer available".to_string(),
            EngineError::State(_) => "action not allowed in current state".to_string(),
            EngineError::NotFound { entity, .. } => format!("{} not found", entity),
            EngineError::Authorization { .. } => "not allowed".to_string(),
            EngineError::Storage(_) => "Database operation failed".to_string(),
        }
    }
}

/// Converts core errors: field problems stay validation, everything else is state.
impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => EngineError::Validation(e),
            other => EngineError::State(other),
        }
    }
}

/// Converts database errors.
///
/// ## Error Mapping
/// ```text
/// DbError::RangeConflict  → EngineError::Conflict
/// DbError::NotFound       → EngineError::NotFound
/// anything else           → EngineError::Storage (logged at ERROR)
/// ```
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::RangeConflict { unit, start, end } => EngineError::Conflict { unit, start, end },
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            other => {
                tracing::error!(error = %other, "Storage failure");
                EngineError::Storage(other)
            }
        }
    }
}

/// What a caller receives when an operation fails:
/// ```json
/// { "code": "VALIDATION_ERROR", "message": "...", "field": "endDate" }
/// ```
impl Serialize for EngineError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let field = self.field();
        let mut state = serializer.serialize_struct("EngineError", if field.is_some() { 3 } else { 2 })?;
        state.serialize_field("code", &self.code())?;
        state.serialize_field("message", &self.user_message())?;
        if let Some(field) = field {
            state.serialize_field("field", field)?;
        }
        state.end()
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rental_core::BookingStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_conflict_maps_from_db_and_serializes() {
        let err = EngineError::from(DbError::RangeConflict {
            unit: "cam-1".to_string(),
            start: "2024-03-01".to_string(),
            end: "2024-03-05".to_string(),
        });

        assert_eq!(err.code(), ErrorCode::Conflict);
        assert!(err.is_business());
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            serde_json::json!({ "code": "CONFLICT", "message": "dates no longer available" })
        );
    }

    #[test]
    fn test_state_errors_share_one_user_message() {
        let err = EngineError::from(CoreError::InvalidBookingStatus {
            booking_id: "b1".to_string(),
            current_status: BookingStatus::Completed,
            action: "cancel".to_string(),
        });

        assert_eq!(err.code(), ErrorCode::StateError);
        assert_eq!(err.user_message(), "action not allowed in current state");
        assert_eq!(err.to_string(), "Booking b1 is completed, cannot cancel");
    }

    #[test]
    fn test_validation_carries_field() {
        let err = EngineError::from(CoreError::Validation(ValidationError::SpanTooShort {
            days: 2,
            min: 3,
        }));

        assert_eq!(err.code(), ErrorCode::ValidationError);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["field"], "endDate");
    }

    #[test]
    fn test_storage_is_a_fault() {
        let err = EngineError::from(DbError::PoolExhausted);
        assert!(!err.is_business());
        assert_eq!(err.code(), ErrorCode::DatabaseError);
        assert_eq!(err.user_message(), "Database operation failed");
    }

    struct CountEvents(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CountEvents {
        fn on_event(&self, _event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_storage_fault_is_logged_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(CountEvents(count.clone()));

        tracing::subscriber::with_default(subscriber, || {
            let err = EngineError::from(DbError::QueryFailed("disk I/O error".to_string()));
            assert_eq!(count.load(Ordering::SeqCst), 1);

            let json = serde_json::to_value(&err).unwrap();
            assert_eq!(json["message"], "Database operation failed");
            let _ = err.user_message();
            let _ = serde_json::to_string(&err).unwrap();
            assert_eq!(count.load(Ordering::SeqCst), 1);
        });
    }
}
