//! # Booking State Machine
//!
//! Legal lifecycle transitions for a single booking.
//!
//! ## Transition Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   pending ──Confirm──► confirmed ──CheckIn──► ongoing                   │
//! │     │  │                 │  │                  │   │                    │
//! │     │  └─Cancel──┐  ┌────┘  └─Fail─┐           │   └─CheckOut{open}─┐   │
//! │     │            ▼  ▼               ▼           │                    ▼   │
//! │     │          canceled           failed        │               reviewing│
//! │     └─Fail────────────────────────►▲            │                    │   │
//! │                                                 CheckOut{none}       │   │
//! │                                                 │   ResolveLast──────┘   │
//! │                                                 ▼   ▼                    │
//! │                                                 completed                │
//! │                                                                         │
//! │   Anything else is an InvalidBookingStatus error.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The functions here mutate an in-memory [`Booking`]; persisting the result
//! with a compare-and-set on the previous status is the database layer's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{Booking, BookingStatus};

// =============================================================================
// Events
// =============================================================================

/// Something that happened to a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingEvent {
    /// Payment / authorization captured (external trigger).
    Confirm,
    /// Physical hand-off recorded.
    CheckIn,
    /// Return recorded; `open_incidents` says whether the return raised a
    /// damage or late incident.
    CheckOut { open_incidents: bool },
    /// The last open incident of a reviewing booking was resolved.
    ResolveLast,
    /// Explicit cancellation before hand-off.
    Cancel,
    /// Payment failure or expiry (external trigger).
    Fail,
}

impl BookingEvent {
    /// Human-readable action name used in error messages.
    pub const fn action(&self) -> &'static str {
        match self {
            BookingEvent::Confirm => "confirm",
            BookingEvent::CheckIn => "check in",
            BookingEvent::CheckOut { .. } => "check out",
            BookingEvent::ResolveLast => "complete review",
            BookingEvent::Cancel => "cancel",
            BookingEvent::Fail => "mark failed",
        }
    }
}

impl BookingStatus {
    /// Returns the next status, or `None` when the transition is illegal.
    pub const fn next(self, event: BookingEvent) -> Option<BookingStatus> {
        use BookingStatus::*;

        match (self, event) {
            (Pending, BookingEvent::Confirm) => Some(Confirmed),
            (Confirmed, BookingEvent::CheckIn) => Some(Ongoing),
            (Ongoing, BookingEvent::CheckOut { open_incidents: true }) => Some(Reviewing),
            (Ongoing, BookingEvent::CheckOut { open_incidents: false }) => Some(Completed),
            (Reviewing, BookingEvent::ResolveLast) => Some(Completed),
            (Pending | Confirmed, BookingEvent::Cancel) => Some(Canceled),
            (Pending | Confirmed, BookingEvent::Fail) => Some(Failed),
            _ => None,
        }
    }
}

// =============================================================================
// Booking Transitions
// =============================================================================

impl Booking {
    /// The status `event` would lead to, without applying it.
    pub fn peek(&self, event: BookingEvent) -> CoreResult<BookingStatus> {
        self.status
            .next(event)
            .ok_or_else(|| CoreError::InvalidBookingStatus {
                booking_id: self.id.clone(),
                current_status: self.status,
                action: event.action().to_string(),
            })
    }

    /// Applies `event` to the status, or reports why it cannot.
    pub fn transition(&mut self, event: BookingEvent, now: DateTime<Utc>) -> CoreResult<BookingStatus> {
        let next = self.peek(event)?;
        self.status = next;
        self.updated_at = now;
        Ok(next)
    }

    /// Records the physical hand-off and moves `confirmed → ongoing`.
    ///
    /// ## Idempotent Rejection
    /// A second call fails with `AlreadyCheckedIn` before touching any field,
    /// so a retried request never double-applies evidence.
    pub fn record_checkin(
        &mut self,
        now: DateTime<Utc>,
        images: Vec<String>,
        notes: Option<String>,
    ) -> CoreResult<()> {
        if self.checkin_time.is_some() {
            return Err(CoreError::AlreadyCheckedIn {
                booking_id: self.id.clone(),
            });
        }

        self.transition(BookingEvent::CheckIn, now)?;
        self.checkin_time = Some(now);
        self.checkin_images = images;
        self.checkin_notes = notes;
        Ok(())
    }

    /// Records the return and moves `ongoing → reviewing | completed`.
    pub fn record_checkout(
        &mut self,
        now: DateTime<Utc>,
        images: Vec<String>,
        notes: Option<String>,
        open_incidents: bool,
    ) -> CoreResult<()> {
        if self.checkin_time.is_none() {
            return Err(CoreError::NotCheckedIn {
                booking_id: self.id.clone(),
            });
        }

        self.transition(BookingEvent::CheckOut { open_incidents }, now)?;
        self.checkout_time = Some(now);
        self.checkout_images = images;
        self.checkout_notes = notes;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
