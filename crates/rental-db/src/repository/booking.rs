//! # Booking Repository
//!
//! Persistence for bookings.
//!
//! ## Write Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert_in            once, inside the reserve transaction              │
//! │  save_lifecycle_in    compare-and-set on status                         │
//! │                       UPDATE ... WHERE id = ? AND status = <expected>   │
//! │                       0 rows → someone else moved the booking first     │
//! │                                                                         │
//! │  Price columns are never in an UPDATE. The schema trigger aborts any   │
//! │  statement that tries.                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use rental_core::{Booking, BookingStatus, Money};

const BOOKING_COLUMNS: &str = r#"
    id, equipment_id, unit_serial, renter_id, owner_id,
    start_date, end_date, quantity,
    daily_rate, replacement_price,
    base_price, service_fee, insurance_fee, total_price,
    status, checkin_time, checkout_time,
    checkin_images, checkout_images, checkin_notes, checkout_notes,
    insurance_id, notes, reservation_id, created_at, updated_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: String,
    equipment_id: String,
    unit_serial: Option<String>,
    renter_id: String,
    owner_id: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    quantity: i64,
    daily_rate: i64,
    replacement_price: i64,
    base_price: i64,
    service_fee: i64,
    insurance_fee: i64,
    total_price: i64,
    status: BookingStatus,
    checkin_time: Option<DateTime<Utc>>,
    checkout_time: Option<DateTime<Utc>>,
    checkin_images: String,
    checkout_images: String,
    checkin_notes: Option<String>,
    checkout_notes: Option<String>,
    insurance_id: Option<String>,
    notes: Option<String>,
    reservation_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = DbError;

    fn try_from(row: BookingRow) -> DbResult<Self> {
        let checkin_images = serde_json::from_str(&row.checkin_images)
            .map_err(|e| DbError::corrupt("Booking", &row.id, e))?;
        let checkout_images = serde_json::from_str(&row.checkout_images)
            .map_err(|e| DbError::corrupt("Booking", &row.id, e))?;

        Ok(Booking {
            id: row.id,
            equipment_id: row.equipment_id,
            unit_serial: row.unit_serial,
            renter_id: row.renter_id,
            owner_id: row.owner_id,
            start_date: row.start_date,
            end_date: row.end_date,
            quantity: row.quantity,
            daily_rate: Money::from_units(row.daily_rate),
            replacement_price: Money::from_units(row.replacement_price),
            base_price: Money::from_units(row.base_price),
            service_fee: Money::from_units(row.service_fee),
            insurance_fee: Money::from_units(row.insurance_fee),
            total_price: Money::from_units(row.total_price),
            status: row.status,
            checkin_time: row.checkin_time,
            checkout_time: row.checkout_time,
            checkin_images,
            checkout_images,
            checkin_notes: row.checkin_notes,
            checkout_notes: row.checkout_notes,
            insurance_id: row.insurance_id,
            notes: row.notes,
            reservation_id: row.reservation_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for booking database operations.
#[derive(Debug, Clone)]
pub struct BookingRepository {
    pool: SqlitePool,
}

impl BookingRepository {
    /// Creates a new BookingRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BookingRepository { pool }
    }

    /// Gets a booking by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Booking>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, id).await
    }

    /// Gets a booking by ID on an open connection or transaction.
    pub async fn get_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(Booking::try_from).transpose()
    }

    /// Lists bookings for an equipment listing, oldest start first.
    pub async fn list_for_equipment(&self, equipment_id: &str) -> DbResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE equipment_id = ?1 ORDER BY start_date, created_at"
        );
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(equipment_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    /// Inserts a new booking.
    ///
    /// ## Snapshot Pattern
    /// `daily_rate` and `replacement_price` are copied from the catalog at
    /// creation. Later surcharges use these values even if the listing changes.
    pub async fn insert_in(conn: &mut SqliteConnection, booking: &Booking) -> DbResult<()> {
        debug!(id = %booking.id, equipment_id = %booking.equipment_id, "Inserting booking");

        let checkin_images = serde_json::to_string(&booking.checkin_images)?;
        let checkout_images = serde_json::to_string(&booking.checkout_images)?;

        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, equipment_id, unit_serial, renter_id, owner_id,
                start_date, end_date, quantity,
                daily_rate, replacement_price,
                base_price, service_fee, insurance_fee, total_price,
                status, checkin_time, checkout_time,
                checkin_images, checkout_images, checkin_notes, checkout_notes,
                insurance_id, notes, reservation_id, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8,
                ?9, ?10,
                ?11, ?12, ?13, ?14,
                ?15, ?16, ?17,
                ?18, ?19, ?20, ?21,
                ?22, ?23, ?24, ?25, ?26
            )
            "#,
        )
        .bind(&booking.id)
        .bind(&booking.equipment_id)
        .bind(&booking.unit_serial)
        .bind(&booking.renter_id)
        .bind(&booking.owner_id)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.quantity)
        .bind(booking.daily_rate.units())
        .bind(booking.replacement_price.units())
        .bind(booking.base_price.units())
        .bind(booking.service_fee.units())
        .bind(booking.insurance_fee.units())
        .bind(booking.total_price.units())
        .bind(booking.status)
        .bind(booking.checkin_time)
        .bind(booking.checkout_time)
        .bind(checkin_images)
        .bind(checkout_images)
        .bind(&booking.checkin_notes)
        .bind(&booking.checkout_notes)
        .bind(&booking.insurance_id)
        .bind(&booking.notes)
        .bind(&booking.reservation_id)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Writes the lifecycle fields of `booking` if the stored status is still
    /// `expected`.
    ///
    /// ## Returns
    /// * `Ok(true)` - the row was updated
    /// * `Ok(false)` - the stored status changed since it was read
    pub async fn save_lifecycle_in(
        conn: &mut SqliteConnection,
        booking: &Booking,
        expected: BookingStatus,
    ) -> DbResult<bool> {
        debug!(
            id = %booking.id,
            from = %expected,
            to = %booking.status,
            "Saving booking lifecycle"
        );

        let checkin_images = serde_json::to_string(&booking.checkin_images)?;
        let checkout_images = serde_json::to_string(&booking.checkout_images)?;

        let result = sqlx::query(
            r#"
            UPDATE bookings SET
                status = ?3,
                checkin_time = ?4,
                checkout_time = ?5,
                checkin_images = ?6,
                checkout_images = ?7,
                checkin_notes = ?8,
                checkout_notes = ?9,
                updated_at = ?10
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(&booking.id)
        .bind(expected)
        .bind(booking.status)
        .bind(booking.checkin_time)
        .bind(booking.checkout_time)
        .bind(checkin_images)
        .bind(checkout_images)
        .bind(&booking.checkin_notes)
        .bind(&booking.checkout_notes)
        .bind(booking.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
