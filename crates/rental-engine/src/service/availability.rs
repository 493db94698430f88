//! Booked ranges for calendar display.
//!
//! Not authoritative: a range missing here can still lose the race in
//! `create_booking`, which is decided by the conditional insert alone.

use rental_core::{validation, DateRange, EquipmentUnit};

use super::BookingEngine;
use crate::error::EngineResult;

impl BookingEngine {
    /// Active reservation ranges of a listing, ordered by start date.
    pub async fn list_booked_ranges(&self, equipment_id: &str) -> EngineResult<Vec<DateRange>> {
        validation::validate_id("equipmentId", equipment_id)?;
        Ok(self
            .db
            .reservations()
            .list_blocked_for_equipment(equipment_id)
            .await?)
    }

    /// Active reservation ranges of one serialized unit.
    pub async fn list_unit_booked_ranges(&self, unit: &EquipmentUnit) -> EngineResult<Vec<DateRange>> {
        validation::validate_id("equipmentId", &unit.equipment_id)?;
        Ok(self.db.reservations().list_blocked_ranges(unit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::request::CheckoutRequest;
    use rental_core::{DateRange, EquipmentUnit, Severity};

    #[tokio::test]
    async fn test_ranges_are_ordered_and_survive_completion() {
        let engine = engine().await;

        let mut later = request();
        later.start_date = date(2024, 4, 1);
        later.end_date = date(2024, 4, 5);
        engine.create_booking(later).await.unwrap();

        let booking = ongoing_booking(&engine).await;
        let req = CheckoutRequest {
            severity: Severity::None,
            ..Default::default()
        };
        engine.checkout(&booking.id, req).await.unwrap();

        let ranges = engine.list_booked_ranges("cam-1").await.unwrap();
        assert_eq!(
            ranges,
            vec![
                DateRange::new(date(2024, 3, 1), date(2024, 3, 5)).unwrap(),
                DateRange::new(date(2024, 4, 1), date(2024, 4, 5)).unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn test_serialized_units_book_independently() {
        let engine = engine().await;

        let mut first = request();
        first.unit_serial = Some("SN-1".to_string());
        engine.create_booking(first).await.unwrap();

        let mut second = request();
        second.unit_serial = Some("SN-2".to_string());
        second.renter_id = "renter-2".to_string();
        engine.create_booking(second).await.unwrap();

        let unit = EquipmentUnit::serialized("cam-1", "SN-1");
        assert_eq!(engine.list_unit_booked_ranges(&unit).await.unwrap().len(), 1);
        assert_eq!(engine.list_booked_ranges("cam-1").await.unwrap().len(), 2);
    }
}
