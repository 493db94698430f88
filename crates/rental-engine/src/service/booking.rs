//! # Booking Operations
//!
//! ## createBooking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate ids, quantity, notes                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  catalog lookup ──► price with pricing::quote  (ValidationError here    │
//! │       │             owner / unit serial checks   means nothing reserved) │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │    reserve_in   conditional insert ─── overlap ──► ConflictError        │
//! │    insert_in    booking row (pending), prices frozen                    │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::BookingEngine;
use crate::error::{EngineError, EngineResult};
use crate::request::{CreateBookingRequest, Quote, QuoteRequest, NO_INSURANCE};
use rental_core::{
    pricing, validation, Booking, BookingEvent, BookingStatus, DateRange, Equipment,
    EquipmentUnit, InsuranceSelection, PriceBreakdown, ValidationError,
};
use rental_db::{BookingRepository, DbError, ReservationRepository};

/// Inputs and result of one pricing run.
struct Priced {
    equipment: Equipment,
    range: DateRange,
    insurance: InsuranceSelection,
    breakdown: PriceBreakdown,
}

impl BookingEngine {
    /// Prices a rental without reserving anything.
    ///
    /// Runs the same calculator as [`BookingEngine::create_booking`], so a
    /// preview and the committed booking agree for the same inputs.
    pub async fn quote(&self, req: QuoteRequest) -> EngineResult<Quote> {
        let priced = self.price(&req).await?;

        Ok(Quote {
            equipment_id: priced.equipment.id,
            start_date: priced.range.start,
            end_date: priced.range.end,
            insurance_id: priced.insurance.package_id().map(str::to_string),
            replacement_price: priced.equipment.replacement_price,
            breakdown: priced.breakdown,
        })
    }

    /// Creates a `pending` booking and reserves its dates atomically.
    ///
    /// ## Errors
    /// - `Validation` - bad input or a span shorter than 3 days; nothing is reserved
    /// - `NotFound` - unknown equipment or insurance package
    /// - `Conflict` - the unit is already reserved for part of the range
    pub async fn create_booking(&self, req: CreateBookingRequest) -> EngineResult<Booking> {
        validation::validate_id("renterId", &req.renter_id)?;
        validation::validate_id("ownerId", &req.owner_id)?;
        if let Some(serial) = &req.unit_serial {
            validation::validate_id("unitSerial", serial)?;
        }
        validation::validate_quantity(req.quantity, self.config.max_quantity)?;
        validation::validate_text("notes", req.notes.as_deref())?;

        if req.renter_id == req.owner_id {
            return Err(ValidationError::InvalidFormat {
                field: "renterId".to_string(),
                reason: "owners cannot rent their own equipment".to_string(),
            }
            .into());
        }

        let Priced {
            equipment,
            range,
            insurance,
            breakdown,
        } = self.price(&QuoteRequest::from(&req)).await?;

        if equipment.owner_id != req.owner_id {
            return Err(ValidationError::InvalidFormat {
                field: "ownerId".to_string(),
                reason: "does not match the equipment owner".to_string(),
            }
            .into());
        }

        if let Some(serial) = &req.unit_serial {
            if !equipment.has_serial(serial) {
                return Err(ValidationError::InvalidFormat {
                    field: "unitSerial".to_string(),
                    reason: format!("{} has no unit {}", equipment.id, serial),
                }
                .into());
            }
        }

        let unit = EquipmentUnit {
            equipment_id: equipment.id.clone(),
            serial: req.unit_serial.clone(),
        };

        // Reserve must be the first statement of the transaction
        let mut tx = self.db.begin().await?;
        let window = match ReservationRepository::reserve_in(&mut tx, &unit, &range).await {
            Ok(window) => window,
            Err(err @ DbError::RangeConflict { .. }) => {
                debug!(
                    equipment_id = %unit.equipment_id,
                    start = %range.start,
                    end = %range.end,
                    "Reservation conflict"
                );
                return Err(err.into());
            }
            Err(err) => return Err(err.into()),
        };

        let now = Utc::now();
        let booking = Booking {
            id: Uuid::new_v4().to_string(),
            equipment_id: req.equipment_id,
            unit_serial: req.unit_serial,
            renter_id: req.renter_id,
            owner_id: req.owner_id,
            start_date: range.start,
            end_date: range.end,
            quantity: req.quantity,
            daily_rate: breakdown.daily_rate,
            replacement_price: equipment.replacement_price,
            base_price: breakdown.base_price,
            service_fee: breakdown.service_fee,
            insurance_fee: breakdown.insurance_fee,
            total_price: breakdown.total_price,
            status: BookingStatus::Pending,
            checkin_time: None,
            checkout_time: None,
            checkin_images: Vec::new(),
            checkout_images: Vec::new(),
            checkin_notes: None,
            checkout_notes: None,
            insurance_id: insurance.package_id().map(str::to_string),
            notes: req.notes,
            reservation_id: window.id,
            created_at: now,
            updated_at: now,
        };

        BookingRepository::insert_in(&mut tx, &booking).await?;
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            booking_id = %booking.id,
            equipment_id = %booking.equipment_id,
            chargeable_days = breakdown.chargeable_days,
            total_price = booking.total_price.units(),
            "Booking created"
        );

        Ok(booking)
    }

    /// Payment captured: `pending → confirmed`.
    pub async fn confirm_booking(&self, booking_id: &str) -> EngineResult<Booking> {
        self.apply_event(booking_id, BookingEvent::Confirm).await
    }

    /// Payment failed or expired: `pending | confirmed → failed`. Releases the window.
    pub async fn fail_booking(&self, booking_id: &str) -> EngineResult<Booking> {
        self.apply_event(booking_id, BookingEvent::Fail).await
    }

    /// Cancels before check-in: `pending | confirmed → canceled`.
    ///
    /// The window is released in the same transaction, so the caller's next
    /// availability query already sees the dates as free.
    pub async fn cancel_booking(&self, booking_id: &str) -> EngineResult<Booking> {
        self.apply_event(booking_id, BookingEvent::Cancel).await
    }

    pub async fn get_booking(&self, booking_id: &str) -> EngineResult<Booking> {
        validation::validate_id("bookingId", booking_id)?;
        self.load_booking(booking_id).await
    }

    async fn apply_event(&self, booking_id: &str, event: BookingEvent) -> EngineResult<Booking> {
        validation::validate_id("bookingId", booking_id)?;

        let mut booking = self.load_booking(booking_id).await?;
        let expected = booking.status;
        if let Err(err) = booking.transition(event, Utc::now()) {
            warn!(booking_id, action = event.action(), status = %expected, "Rejected transition");
            return Err(err.into());
        }

        let mut tx = self.db.begin().await?;
        Self::save_lifecycle(&mut tx, &booking, expected, event).await?;
        if !booking.status.holds_reservation() {
            ReservationRepository::release_in(&mut tx, &booking.reservation_id).await?;
        }
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(
            booking_id,
            from = %expected,
            to = %booking.status,
            "Booking transitioned"
        );
        Ok(booking)
    }

    /// Catalog lookups plus the pure calculator.
    async fn price(&self, req: &QuoteRequest) -> EngineResult<Priced> {
        validation::validate_id("equipmentId", &req.equipment_id)?;
        let range = DateRange::new(req.start_date, req.end_date)?;

        let equipment = self
            .equipment
            .get_equipment(&req.equipment_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Equipment", &req.equipment_id))?;

        let insurance = self.insurance_selection(req.insurance_id.as_deref()).await?;
        let breakdown = pricing::quote(&range, equipment.daily_rate, &insurance)?;

        Ok(Priced {
            equipment,
            range,
            insurance,
            breakdown,
        })
    }

    /// Resolves an insurance id to a selection. `None` and `"none"` mean uninsured.
    pub(crate) async fn insurance_selection(
        &self,
        insurance_id: Option<&str>,
    ) -> EngineResult<InsuranceSelection> {
        match insurance_id.map(str::trim) {
            None | Some("") | Some(NO_INSURANCE) => Ok(InsuranceSelection::None),
            Some(id) => self
                .insurance
                .get_package(id)
                .await?
                .map(InsuranceSelection::Package)
                .ok_or_else(|| EngineError::not_found("InsurancePackage", id)),
        }
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
    use rental_core::Money;

    #[tokio::test]
    async fn test_weekend_bundled_price() {
        let engine = engine().await;
        let booking = engine.create_booking(request()).await.unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.base_price, Money::from_units(1_600_000));
        assert_eq!(booking.service_fee, Money::from_units(80_000));
        assert_eq!(booking.insurance_fee, Money::zero());
        assert_eq!(booking.total_price, Money::from_units(1_680_000));
        assert_eq!(booking.daily_rate, Money::from_units(800_000));
        assert_eq!(booking.replacement_price, Money::from_units(45_000_000));
    }

    #[tokio::test]
    async fn test_short_span_reserves_nothing() {
        let engine = engine().await;
        let mut req = request();
        req.end_date = date(2024, 3, 3);

        let err = engine.create_booking(req).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert!(engine.list_booked_ranges("cam-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overlap_conflicts_and_back_to_back_succeeds() {
        let engine = engine().await;
        engine.create_booking(request()).await.unwrap();

        let mut overlapping = request();
        overlapping.renter_id = "renter-2".to_string();
        overlapping.start_date = date(2024, 3, 4);
        overlapping.end_date = date(2024, 3, 8);
        let err = engine.create_booking(overlapping).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);
        assert_eq!(err.user_message(), "dates no longer available");

        let mut adjacent = request();
        adjacent.renter_id = "renter-2".to_string();
        adjacent.start_date = date(2024, 3, 5);
        adjacent.end_date = date(2024, 3, 9);
        engine.create_booking(adjacent).await.unwrap();

        assert_eq!(engine.list_booked_ranges("cam-1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unit_serial_cannot_bypass_listing_reservation() {
        let engine = engine().await;
        engine.create_booking(request()).await.unwrap();

        let mut invented = request();
        invented.renter_id = "renter-2".to_string();
        invented.unit_serial = Some("ghost".to_string());
        let err = engine.create_booking(invented).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(err.field(), Some("unitSerial"));

        let mut known = request();
        known.renter_id = "renter-2".to_string();
        known.unit_serial = Some("SN-1".to_string());
        let err = engine.create_booking(known).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Conflict);

        assert_eq!(engine.list_booked_ranges("cam-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insurance_package_fee_and_none_pseudo_package() {
        let engine = engine().await;

        let mut insured = request();
        insured.insurance_id = Some("basic".to_string());
        let booking = engine.create_booking(insured).await.unwrap();
        // avg coverage 20,000,000 × 0.15% × 2 days = 60,000
        assert_eq!(booking.insurance_fee, Money::from_units(60_000));
        assert_eq!(booking.total_price, Money::from_units(1_740_000));
        assert_eq!(booking.insurance_id.as_deref(), Some("basic"));

        let mut uninsured = request();
        uninsured.insurance_id = Some(NO_INSURANCE.to_string());
        uninsured.start_date = date(2024, 3, 10);
        uninsured.end_date = date(2024, 3, 14);
        let booking = engine.create_booking(uninsured).await.unwrap();
        assert_eq!(booking.insurance_fee, Money::zero());
        assert!(booking.insurance_id.is_none());
    }

    #[tokio::test]
    async fn test_unknown_references_are_not_found() {
        let engine = engine().await;

        let mut req = request();
        req.equipment_id = "cam-404".to_string();
        assert_eq!(engine.create_booking(req).await.unwrap_err().code(), ErrorCode::NotFound);

        let mut req = request();
        req.insurance_id = Some("gold".to_string());
        assert_eq!(engine.create_booking(req).await.unwrap_err().code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_field_validation() {
        let engine = engine().await;

        let mut req = request();
        req.quantity = 0;
        let err = engine.create_booking(req).await.unwrap_err();
        assert_eq!(err.field(), Some("quantity"));

        let mut req = request();
        req.owner_id = "owner-2".to_string();
        let err = engine.create_booking(req).await.unwrap_err();
        assert_eq!(err.field(), Some("ownerId"));

        let mut req = request();
        req.renter_id = "owner-1".to_string();
        let err = engine.create_booking(req).await.unwrap_err();
        assert_eq!(err.field(), Some("renterId"));

        let mut req = request();
        req.end_date = date(9999, 12, 31);
        let err = engine.create_booking(req).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(err.field(), Some("endDate"));

        assert!(engine.list_booked_ranges("cam-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quote_matches_created_booking() {
        let engine = engine().await;
        let quote = engine.quote(QuoteRequest::from(&request())).await.unwrap();
        let booking = engine.create_booking(request()).await.unwrap();

        assert_eq!(quote.breakdown.chargeable_days, 2);
        assert_eq!(quote.breakdown.total_price, booking.total_price);
        assert!(engine.list_booked_ranges("cam-1").await.unwrap().len() == 1);
    }

    #[tokio::test]
    async fn test_cancel_releases_window_for_next_query() {
        let engine = engine().await;
        let booking = engine.create_booking(request()).await.unwrap();
        engine.confirm_booking(&booking.id).await.unwrap();

        let canceled = engine.cancel_booking(&booking.id).await.unwrap();
        assert_eq!(canceled.status, BookingStatus::Canceled);
        assert!(engine.list_booked_ranges("cam-1").await.unwrap().is_empty());

        // Same dates are bookable again
        engine.create_booking(request()).await.unwrap();
    }

    #[tokio::test]
    async fn test_fail_releases_and_is_terminal() {
        let engine = engine().await;
        let booking = engine.create_booking(request()).await.unwrap();

        let failed = engine.fail_booking(&booking.id).await.unwrap();
        assert_eq!(failed.status, BookingStatus::Failed);
        assert!(engine.list_booked_ranges("cam-1").await.unwrap().is_empty());

        let err = engine.cancel_booking(&booking.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::StateError);
        assert_eq!(err.user_message(), "action not allowed in current state");
    }

    #[tokio::test]
    async fn test_cancel_after_checkin_is_state_error() {
        let engine = engine().await;
        let booking = ongoing_booking(&engine).await;

        let err = engine.cancel_booking(&booking.id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::StateError);
        assert_eq!(
            engine.get_booking(&booking.id).await.unwrap().status,
            BookingStatus::Ongoing
        );
        assert_eq!(engine.list_booked_ranges("cam-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_twice_is_state_error() {
        let engine = engine().await;
        let booking = engine.create_booking(request()).await.unwrap();

        engine.confirm_booking(&booking.id).await.unwrap();
        let err = engine.confirm_booking(&booking.id).await.unwrap_err();
        assert!(matches!(err, EngineError::State(_)));
    }
}
