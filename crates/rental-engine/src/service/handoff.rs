//! # Check-in / Check-out Processor
//!
//! Records the physical hand-off and return, stores evidence, and derives
//! incidents from the condition reports.
//!
//! ## Checkout Routing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  late_minutes > grace ──► Incident(late,   ceil(h) × dailyRate / 24)    │
//! │  severity ≠ none      ──► Incident(damage, replacement × multiplier)    │
//! │                                                                         │
//! │  did this checkout raise an incident?                                   │
//! │     yes ──► ongoing → reviewing                                         │
//! │     no  ──► ongoing → completed                                         │
//! │                                                                         │
//! │  Check-in incidents never route the return; they are settled through   │
//! │  the ledger on their own.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::BookingEngine;
use crate::error::EngineResult;
use crate::request::{CheckinRequest, CheckoutRequest, CheckoutResult};
use rental_core::{settlement, validation, Booking, BookingEvent, Incident};
use rental_db::{DbError, IncidentRepository};

impl BookingEngine {
    /// Hand-off: `confirmed → ongoing`.
    ///
    /// A supplied incident report (severity or description) is logged to the
    /// ledger but never blocks the hand-off. A repeated call fails with a
    /// StateError and changes nothing.
    pub async fn checkin(&self, booking_id: &str, req: CheckinRequest) -> EngineResult<Booking> {
        validation::validate_id("bookingId", booking_id)?;
        validation::validate_images("images", &req.images)?;
        validation::validate_text("notes", req.notes.as_deref())?;
        if let Some(report) = &req.incident {
            validation::validate_images("incident.images", &report.images)?;
            validation::validate_text("incident.description", report.description.as_deref())?;
        }

        let mut booking = self.load_booking(booking_id).await?;
        let expected = booking.status;
        let now = Utc::now();

        if let Err(err) = booking.record_checkin(now, req.images, req.notes) {
            warn!(booking_id, status = %expected, "Rejected check-in");
            return Err(err.into());
        }

        let incident = req
            .incident
            .as_ref()
            .and_then(|report| settlement::assess_checkin(&booking, report))
            .map(|draft| draft.into_incident(Uuid::new_v4().to_string(), &booking.id, now));

        let mut tx = self.db.begin().await?;
        Self::save_lifecycle(&mut tx, &booking, expected, BookingEvent::CheckIn).await?;
        if let Some(incident) = &incident {
            IncidentRepository::insert_in(&mut tx, incident).await?;
        }
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            booking_id,
            images = booking.checkin_images.len(),
            incident = incident.is_some(),
            "Checked in"
        );
        Ok(booking)
    }

    /// Return: `ongoing → reviewing | completed`.
    ///
    /// Returns the booking and the incidents this checkout created.
    pub async fn checkout(&self, booking_id: &str, req: CheckoutRequest) -> EngineResult<CheckoutResult> {
        validation::validate_id("bookingId", booking_id)?;
        validation::validate_images("images", &req.images)?;
        validation::validate_text("notes", req.notes.as_deref())?;
        validation::validate_text("issueDescription", req.issue_description.as_deref())?;
        validation::validate_text("lateReason", req.late_reason.as_deref())?;
        validation::validate_late_minutes(req.late_minutes)?;

        let mut booking = self.load_booking(booking_id).await?;
        let expected = booking.status;

        // Reject before anything is written
        if let Err(err) = booking.peek(BookingEvent::CheckOut { open_incidents: false }) {
            warn!(booking_id, status = %expected, "Rejected check-out");
            return Err(err.into());
        }

        let now = Utc::now();
        let incidents: Vec<Incident> = settlement::assess_checkout(
            &booking,
            &req.report(),
            &req.images,
            self.config.late_grace_minutes,
        )
        .into_iter()
        .map(|draft| draft.into_incident(Uuid::new_v4().to_string(), &booking.id, now))
        .collect();

        let raised = !incidents.is_empty();
        let event = BookingEvent::CheckOut {
            open_incidents: raised,
        };
        booking.record_checkout(now, req.images, req.notes, raised)?;

        let mut tx = self.db.begin().await?;
        Self::save_lifecycle(&mut tx, &booking, expected, event).await?;
        for incident in &incidents {
            IncidentRepository::insert_in(&mut tx, incident).await?;
        }
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            booking_id,
            status = %booking.status,
            created_incidents = incidents.len(),
            "Checked out"
        );

        Ok(CheckoutResult { booking, incidents })
    }

    /// Lateness of a return at `returned_at`, ready to pass as `lateMinutes`.
    ///
    /// The configured grace period is left to [`BookingEngine::checkout`].
    pub async fn late_minutes(&self, booking_id: &str, returned_at: DateTime<Utc>) -> EngineResult<i64> {
        validation::validate_id("bookingId", booking_id)?;
        let booking = self.load_booking(booking_id).await?;
        Ok(settlement::late_minutes(booking.end_date, returned_at))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
