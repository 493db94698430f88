//! # Booking Engine
//!
//! The engine's public operations, grouped by concern:
//!
//! - [`booking`] - create, quote, confirm, fail, cancel, get
//! - [`handoff`] - check-in and check-out
//! - [`ledger`] - incident resolution, listing, settlement
//! - [`availability`] - booked ranges for display
//!
//! ## Write Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. read booking            (pool, no lock)                             │
//! │  2. apply pure rules        (rental-core: validate, transition, assess) │
//! │  3. BEGIN                                                               │
//! │  4. first write             takes the SQLite write lock                 │
//! │       save_lifecycle_in(.., expected = status read in step 1)           │
//! │       0 rows → another request moved the booking → StateError           │
//! │  5. dependent writes        release window / append incidents           │
//! │  6. COMMIT                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! A retried request re-reads in step 1 and is rejected by step 2 or step 4,
//! so side effects are never applied twice.

pub mod availability;
pub mod booking;
pub mod handoff;
pub mod ledger;

use std::sync::Arc;

use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use rental_core::{Booking, BookingEvent, BookingStatus, CoreError};
use rental_db::{BookingRepository, Database, EquipmentCatalog, InsuranceCatalog};

/// Entry point for every booking operation.
///
/// Cheap to clone; clones share the pool and catalogs.
#[derive(Clone)]
pub struct BookingEngine {
    db: Database,
    equipment: Arc<dyn EquipmentCatalog>,
    insurance: Arc<dyn InsuranceCatalog>,
    config: EngineConfig,
}

impl std::fmt::Debug for BookingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingEngine")
            .field("db", &self.db)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BookingEngine {
    /// Engine backed by the database's own catalog tables.
    pub fn new(db: Database, config: EngineConfig) -> Self {
        let catalog = Arc::new(db.catalog());
        BookingEngine {
            equipment: catalog.clone(),
            insurance: catalog,
            db,
            config,
        }
    }

    /// Engine reading equipment and insurance from external catalogs.
    pub fn with_catalogs(
        db: Database,
        config: EngineConfig,
        equipment: Arc<dyn EquipmentCatalog>,
        insurance: Arc<dyn InsuranceCatalog>,
    ) -> Self {
        BookingEngine {
            db,
            equipment,
            insurance,
            config,
        }
    }

    /// Opens the configured database and builds an engine over it.
    pub async fn connect(config: EngineConfig) -> EngineResult<Self> {
        info!(path = %config.database_path.display(), "Starting booking engine");
        let db = Database::new(config.db_config()).await?;
        Ok(BookingEngine::new(db, config))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Shared helpers
    // =========================================================================

    pub(crate) async fn load_booking(&self, booking_id: &str) -> EngineResult<Booking> {
        self.db
            .bookings()
            .get_by_id(booking_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Booking", booking_id))
    }

    /// Compare-and-set write of a booking's lifecycle fields.
    ///
    /// When the stored status no longer matches `expected`, the booking is
    /// re-read inside the same transaction and the caller gets a StateError
    /// naming the status that won.
    pub(crate) async fn save_lifecycle(
        conn: &mut SqliteConnection,
        booking: &Booking,
        expected: BookingStatus,
        event: BookingEvent,
    ) -> EngineResult<()> {
        if BookingRepository::save_lifecycle_in(conn, booking, expected).await? {
            return Ok(());
        }

        let current = BookingRepository::get_in(conn, &booking.id)
            .await?
            .map(|b| b.status)
            .unwrap_or(expected);

        debug!(
            booking_id = %booking.id,
            expected = %expected,
            current = %current,
            "Lost lifecycle race"
        );

        Err(CoreError::InvalidBookingStatus {
            booking_id: booking.id.clone(),
            current_status: current,
            action: event.action().to_string(),
        }
        .into())
    }
}

/// Rejects an actor who is neither the renter nor the owner.
///
/// Identity is established by the calling layer; this only checks membership.
pub fn ensure_participant(booking: &Booking, actor_id: &str) -> EngineResult<()> {
    if booking.involves(actor_id) {
        Ok(())
    } else {
        Err(EngineError::Authorization {
            actor_id: actor_id.to_string(),
            booking_id: booking.id.clone(),
        })
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::request::CreateBookingRequest;
    use chrono::NaiveDate;
    use rental_core::{Equipment, InsurancePackage, Money};
    use rental_db::DbConfig;

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Engine over an in-memory database with one camera and one package.
    pub(crate) async fn engine() -> BookingEngine {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();
        catalog
            .upsert_equipment(&Equipment {
                id: "cam-1".to_string(),
                owner_id: "owner-1".to_string(),
                name: "Mirrorless Camera".to_string(),
                daily_rate: Money::from_units(800_000),
                replacement_price: Money::from_units(45_000_000),
                serials: vec!["SN-1".to_string(), "SN-2".to_string()],
            })
            .await
            .unwrap();
        catalog
            .upsert_package(&InsurancePackage {
                id: "basic".to_string(),
                name: "Basic Protection".to_string(),
                min_coverage: Money::from_units(10_000_000),
                max_coverage: Money::from_units(30_000_000),
            })
            .await
            .unwrap();

        BookingEngine::new(db, EngineConfig::default())
    }

    /// Friday 2024-03-01 to Tuesday 2024-03-05.
    pub(crate) fn request() -> CreateBookingRequest {
        CreateBookingRequest {
            equipment_id: "cam-1".to_string(),
            unit_serial: None,
            renter_id: "renter-1".to_string(),
            owner_id: "owner-1".to_string(),
            start_date: date(2024, 3, 1),
            end_date: date(2024, 3, 5),
            quantity: 1,
            insurance_id: None,
            notes: None,
        }
    }

    /// A booking already confirmed and handed off.
    pub(crate) async fn ongoing_booking(engine: &BookingEngine) -> Booking {
        let booking = engine.create_booking(request()).await.unwrap();
        engine.confirm_booking(&booking.id).await.unwrap();
        engine
            .checkin(&booking.id, Default::default())
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_participant_check() {
        let engine = engine().await;
        let booking = engine.create_booking(request()).await.unwrap();

        assert!(ensure_participant(&booking, "renter-1").is_ok());
        assert!(ensure_participant(&booking, "owner-1").is_ok());
        let err = ensure_participant(&booking, "stranger").unwrap_err();
        assert!(matches!(err, EngineError::Authorization { .. }));
    }

    struct FixedCatalog;

    #[async_trait::async_trait]
    impl EquipmentCatalog for FixedCatalog {
        async fn get_equipment(
            &self,
            equipment_id: &str,
        ) -> rental_db::DbResult<Option<rental_core::Equipment>> {
            Ok((equipment_id == "lens-9").then(|| rental_core::Equipment {
                id: "lens-9".to_string(),
                owner_id: "owner-1".to_string(),
                name: "Telephoto Lens".to_string(),
                daily_rate: rental_core::Money::from_units(500_000),
                replacement_price: rental_core::Money::from_units(20_000_000),
                serials: vec![],
            }))
        }
    }

    #[async_trait::async_trait]
    impl InsuranceCatalog for FixedCatalog {
        async fn list_packages(&self) -> rental_db::DbResult<Vec<rental_core::InsurancePackage>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_external_catalogs() {
        let db = Database::new(rental_db::DbConfig::in_memory()).await.unwrap();
        let catalog = Arc::new(FixedCatalog);
        let engine =
            BookingEngine::with_catalogs(db, EngineConfig::default(), catalog.clone(), catalog);

        let mut req = request();
        req.equipment_id = "lens-9".to_string();
        let booking = engine.create_booking(req.clone()).await.unwrap();
        assert_eq!(booking.base_price.units(), 1_000_000);
        assert_eq!(booking.service_fee.units(), 50_000);
        assert_eq!(booking.total_price.units(), 1_050_000);

        // Packages come from the external catalog, which has none
        req.start_date = date(2024, 4, 1);
        req.end_date = date(2024, 4, 5);
        req.insurance_id = Some("basic".to_string());
        let err = engine.create_booking(req).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_unknown_booking_is_not_found() {
        let engine = engine().await;
        let err = engine.get_booking("missing").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }
}
