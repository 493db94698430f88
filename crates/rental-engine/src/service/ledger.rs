//! # Incident & Settlement Ledger
//!
//! Review decisions on incidents and the money picture of a booking.
//!
//! Resolving the last open incident of a `reviewing` booking completes it in
//! the same transaction. `estimated_charge` is never touched; the decision is
//! stored beside it.

use chrono::Utc;
use tracing::{info, warn};

use super::BookingEngine;
use crate::error::{EngineError, EngineResult};
use crate::request::ResolveIncidentRequest;
use rental_core::{
    settlement::{self, Settlement},
    validation, BookingEvent, BookingStatus, CoreError, Incident,
};
use rental_db::{BookingRepository, DbError, IncidentRepository};

impl BookingEngine {
    /// Records the review decision for an incident.
    ///
    /// ## Errors
    /// - `NotFound` - unknown incident
    /// - `Validation` - negative amount, or a non-zero waived amount
    /// - `State` - the incident already has a decision
    pub async fn resolve_incident(
        &self,
        incident_id: &str,
        req: ResolveIncidentRequest,
    ) -> EngineResult<Incident> {
        validation::validate_id("incidentId", incident_id)?;
        validation::validate_resolution(req.resolution_amount, req.outcome)?;

        let mut incident = self
            .db
            .incidents()
            .get_by_id(incident_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Incident", incident_id))?;

        let already_resolved = || -> EngineError {
            CoreError::IncidentAlreadyResolved {
                incident_id: incident_id.to_string(),
            }
            .into()
        };

        if !incident.is_open() {
            warn!(incident_id, "Incident already resolved");
            return Err(already_resolved());
        }

        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        if !IncidentRepository::resolve_in(&mut tx, incident_id, req.resolution_amount, req.outcome, now)
            .await?
        {
            return Err(already_resolved());
        }

        let open = IncidentRepository::count_open_in(&mut tx, &incident.booking_id).await?;
        let mut completed = false;
        if open == 0 {
            let mut booking = BookingRepository::get_in(&mut tx, &incident.booking_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Booking", &incident.booking_id))?;

            // Check-in incidents can be settled while the rental is still running
            if booking.status == BookingStatus::Reviewing {
                booking.transition(BookingEvent::ResolveLast, now)?;
                Self::save_lifecycle(&mut tx, &booking, BookingStatus::Reviewing, BookingEvent::ResolveLast)
                    .await?;
                completed = true;
            }
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        incident.resolution_amount = Some(req.resolution_amount);
        incident.outcome = Some(req.outcome);
        incident.resolved_at = Some(now);

        info!(
            incident_id,
            booking_id = %incident.booking_id,
            estimated = incident.estimated_charge.units(),
            resolved = req.resolution_amount.units(),
            outcome = ?req.outcome,
            booking_completed = completed,
            "Incident resolved"
        );

        Ok(incident)
    }

    /// All incidents of a booking in creation order.
    pub async fn list_incidents(&self, booking_id: &str) -> EngineResult<Vec<Incident>> {
        validation::validate_id("bookingId", booking_id)?;
        let booking = self.load_booking(booking_id).await?;
        Ok(self.db.incidents().list_for_booking(&booking.id).await?)
    }

    /// Quoted price, ledger estimates and settled surcharges for a booking.
    pub async fn settlement(&self, booking_id: &str) -> EngineResult<Settlement> {
        validation::validate_id("bookingId", booking_id)?;
        let booking = self.load_booking(booking_id).await?;
        let incidents = self.db.incidents().list_for_booking(&booking.id).await?;
        Ok(settlement::summarize(&booking, &incidents))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::error::ErrorCode;
    use crate::request::CheckoutRequest;
    use rental_core::{IncidentOutcome, Money, Severity};

    fn resolve(amount: i64, outcome: IncidentOutcome) -> ResolveIncidentRequest {
        ResolveIncidentRequest {
            resolution_amount: Money::from_units(amount),
            outcome,
        }
    }

    #[tokio::test]
    async fn test_resolving_last_incident_completes_booking() {
        let engine = engine().await;
        let booking = ongoing_booking(&engine).await;

        let req = CheckoutRequest {
            severity: Severity::Major,
            late_minutes: 61,
            ..Default::default()
        };
        let result = engine.checkout(&booking.id, req).await.unwrap();
        assert_eq!(result.incidents.len(), 2);
        let (late, damage) = (&result.incidents[0], &result.incidents[1]);

        engine
            .resolve_incident(&late.id, resolve(66_667, IncidentOutcome::Charged))
            .await
            .unwrap();
        assert_eq!(
            engine.get_booking(&booking.id).await.unwrap().status,
            BookingStatus::Reviewing
        );

        let resolved = engine
            .resolve_incident(&damage.id, resolve(10_000_000, IncidentOutcome::Adjusted))
            .await
            .unwrap();
        assert_eq!(resolved.resolution_amount, Some(Money::from_units(10_000_000)));
        // Estimate is preserved next to the decision
        assert_eq!(resolved.estimated_charge, Money::from_units(18_000_000));

        let booking = engine.get_booking(&booking.id).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Completed);
        assert_eq!(booking.total_price, Money::from_units(1_680_000));
    }

    #[tokio::test]
    async fn test_resolve_twice_is_state_error() {
        let engine = engine().await;
        let booking = ongoing_booking(&engine).await;
        let req = CheckoutRequest {
            severity: Severity::Minor,
            ..Default::default()
        };
        let result = engine.checkout(&booking.id, req).await.unwrap();
        let incident_id = result.incidents[0].id.clone();

        engine
            .resolve_incident(&incident_id, resolve(0, IncidentOutcome::Waived))
            .await
            .unwrap();
        let err = engine
            .resolve_incident(&incident_id, resolve(6_750_000, IncidentOutcome::Charged))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StateError);

        let stored = engine.list_incidents(&booking.id).await.unwrap();
        assert_eq!(stored[0].resolution_amount, Some(Money::zero()));
        assert_eq!(stored[0].outcome, Some(IncidentOutcome::Waived));
    }

    #[tokio::test]
    async fn test_resolution_validation_and_not_found() {
        let engine = engine().await;
        let booking = ongoing_booking(&engine).await;
        let req = CheckoutRequest {
            severity: Severity::Minor,
            ..Default::default()
        };
        let result = engine.checkout(&booking.id, req).await.unwrap();
        let incident_id = &result.incidents[0].id;

        let err = engine
            .resolve_incident(incident_id, resolve(100, IncidentOutcome::Waived))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = engine
            .resolve_incident(incident_id, resolve(-1, IncidentOutcome::Charged))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);

        let err = engine
            .resolve_incident("missing", resolve(0, IncidentOutcome::Waived))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_settlement_separates_estimates_from_settled() {
        let engine = engine().await;
        let booking = ongoing_booking(&engine).await;
        let req = CheckoutRequest {
            severity: Severity::Major,
            late_minutes: 61,
            ..Default::default()
        };
        let result = engine.checkout(&booking.id, req).await.unwrap();

        engine
            .resolve_incident(&result.incidents[0].id, resolve(50_000, IncidentOutcome::Adjusted))
            .await
            .unwrap();

        let summary = engine.settlement(&booking.id).await.unwrap();
        assert_eq!(summary.quoted_total, Money::from_units(1_680_000));
        assert_eq!(summary.late_estimated, Money::from_units(66_667));
        assert_eq!(summary.damage_estimated, Money::from_units(18_000_000));
        assert_eq!(summary.open_incidents, 1);
        assert_eq!(summary.open_estimated, Money::from_units(18_000_000));
        assert_eq!(summary.settled_surcharges, Money::from_units(50_000));
        assert_eq!(summary.amount_due, Money::from_units(1_730_000));
    }

    #[tokio::test]
    async fn test_checkin_incident_resolved_during_rental() {
        let engine = engine().await;
        let booking = engine.create_booking(request()).await.unwrap();
        engine.confirm_booking(&booking.id).await.unwrap();
        let req = crate::request::CheckinRequest {
            incident: Some(rental_core::settlement::IncidentReport {
                severity: Severity::None,
                description: Some("dent on case".to_string()),
                images: vec![],
            }),
            ..Default::default()
        };
        engine.checkin(&booking.id, req).await.unwrap();
        let incident = engine.list_incidents(&booking.id).await.unwrap().remove(0);

        engine
            .resolve_incident(&incident.id, resolve(0, IncidentOutcome::Waived))
            .await
            .unwrap();

        // Still out with the renter; resolution does not skip the return
        assert_eq!(
            engine.get_booking(&booking.id).await.unwrap().status,
            BookingStatus::Ongoing
        );
        let result = engine.checkout(&booking.id, Default::default()).await.unwrap();
        assert_eq!(result.booking.status, BookingStatus::Completed);
    }
}
