//! # Reservation Window Repository (Availability Index)
//!
//! Tracks booked date ranges per equipment unit and rejects overlaps.
//!
//! ## Atomic Reserve
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Caller A                         Caller B                              │
//! │  ────────                         ────────                              │
//! │  INSERT ... SELECT                INSERT ... SELECT                     │
//! │    WHERE NOT EXISTS (overlap)       WHERE NOT EXISTS (overlap)          │
//! │       │                                │                                │
//! │       │  takes write lock              │  waits (busy_timeout)          │
//! │       ▼                                │                                │
//! │  1 row inserted ── COMMIT ────────────►▼                                │
//! │                                   overlap found → 0 rows                │
//! │                                   └─► RangeConflict                     │
//! │                                                                         │
//! │  A read-then-write from two statements would let both callers see      │
//! │  "free" and both insert. The check lives inside the insert, and the    │
//! │  overlap trigger rejects any writer that bypasses this path.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Units
//! A window with an empty serial holds the whole listing, so it conflicts
//! with every serial of that equipment and every serial conflicts with it.
//! Windows of two different serials never conflict.
//!
//! Windows are released, never deleted: `released_at` marks them inactive.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use rental_core::{DateRange, EquipmentUnit, ReservationWindow};

#[derive(Debug, sqlx::FromRow)]
struct WindowRow {
    id: String,
    equipment_id: String,
    serial: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    created_at: DateTime<Utc>,
    released_at: Option<DateTime<Utc>>,
}

impl From<WindowRow> for ReservationWindow {
    fn from(row: WindowRow) -> Self {
        ReservationWindow {
            id: row.id,
            unit: EquipmentUnit {
                equipment_id: row.equipment_id,
                serial: (!row.serial.is_empty()).then_some(row.serial),
            },
            range: DateRange {
                start: row.start_date,
                end: row.end_date,
            },
            created_at: row.created_at,
            released_at: row.released_at,
        }
    }
}

fn conflict(unit: &EquipmentUnit, range: &DateRange) -> DbError {
    let unit = match &unit.serial {
        Some(serial) => format!("{}#{}", unit.equipment_id, serial),
        None => unit.equipment_id.clone(),
    };
    DbError::RangeConflict {
        unit,
        start: range.start.to_string(),
        end: range.end.to_string(),
    }
}

/// Repository for reservation windows.
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: SqlitePool,
}

impl ReservationRepository {
    /// Creates a new ReservationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReservationRepository { pool }
    }

    /// Reserves `range` for `unit` in its own transaction.
    ///
    /// ## Returns
    /// * `Ok(ReservationWindow)` - the new active window
    /// * `Err(DbError::RangeConflict)` - an active window overlaps `[start, end)`
    pub async fn reserve(&self, unit: &EquipmentUnit, range: &DateRange) -> DbResult<ReservationWindow> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let window = Self::reserve_in(&mut tx, unit, range).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(window)
    }

    /// Conditional insert on an open connection or transaction.
    ///
    /// Must be the first statement of its transaction (see [`crate::Database::begin`]).
    pub async fn reserve_in(
        conn: &mut SqliteConnection,
        unit: &EquipmentUnit,
        range: &DateRange,
    ) -> DbResult<ReservationWindow> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(
            equipment_id = %unit.equipment_id,
            serial = unit.serial_key(),
            start = %range.start,
            end = %range.end,
            "Reserving window"
        );

        let result = sqlx::query(
            r#"
            INSERT INTO reservation_windows (
                id, equipment_id, serial, start_date, end_date, created_at, released_at
            )
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, NULL
            WHERE NOT EXISTS (
                SELECT 1 FROM reservation_windows
                WHERE equipment_id = ?2
                  AND (serial = ?3 OR serial = '' OR ?3 = '')
                  AND released_at IS NULL
                  AND start_date < ?5
                  AND ?4 < end_date
            )
            "#,
        )
        .bind(&id)
        .bind(&unit.equipment_id)
        .bind(unit.serial_key())
        .bind(range.start)
        .bind(range.end)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::RangeConflict { .. } => conflict(unit, range),
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(conflict(unit, range));
        }

        Ok(ReservationWindow {
            id,
            unit: unit.clone(),
            range: *range,
            created_at: now,
            released_at: None,
        })
    }

    /// Releases a window. Idempotent.
    ///
    /// ## Returns
    /// * `Ok(true)` - the window was active and is now released
    /// * `Ok(false)` - already released, or unknown id (a no-op)
    pub async fn release(&self, reservation_id: &str) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        Self::release_in(&mut conn, reservation_id).await
    }

    /// Releases a window on an open connection or transaction.
    pub async fn release_in(conn: &mut SqliteConnection, reservation_id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reservation_windows
            SET released_at = ?2
            WHERE id = ?1 AND released_at IS NULL
            "#,
        )
        .bind(reservation_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        let released = result.rows_affected() > 0;
        debug!(reservation_id, released, "Release window");
        Ok(released)
    }

    /// Gets a window by ID, active or not.
    pub async fn get_by_id(&self, reservation_id: &str) -> DbResult<Option<ReservationWindow>> {
        let row: Option<WindowRow> = sqlx::query_as(
            r#"
            SELECT id, equipment_id, serial, start_date, end_date, created_at, released_at
            FROM reservation_windows
            WHERE id = ?1
            "#,
        )
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ReservationWindow::from))
    }

    /// Active ranges that block one unit, ordered by start date.
    ///
    /// Includes whole-listing windows. For display only; conflict checks never read this list.
    pub async fn list_blocked_ranges(&self, unit: &EquipmentUnit) -> DbResult<Vec<DateRange>> {
        let rows: Vec<(NaiveDate, NaiveDate)> = sqlx::query_as(
            r#"
            SELECT start_date, end_date
            FROM reservation_windows
            WHERE equipment_id = ?1
              AND (serial = ?2 OR serial = '' OR ?2 = '')
              AND released_at IS NULL
            ORDER BY start_date, end_date
            "#,
        )
        .bind(&unit.equipment_id)
        .bind(unit.serial_key())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(start, end)| DateRange { start, end })
            .collect())
    }

    /// Active ranges across every unit of an equipment listing.
    pub async fn list_blocked_for_equipment(&self, equipment_id: &str) -> DbResult<Vec<DateRange>> {
        let rows: Vec<(NaiveDate, NaiveDate)> = sqlx::query_as(
            r#"
            SELECT start_date, end_date
            FROM reservation_windows
            WHERE equipment_id = ?1 AND released_at IS NULL
            ORDER BY start_date, end_date
            "#,
        )
        .bind(equipment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(start, end)| DateRange { start, end })
            .collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn range(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        )
        .unwrap()
    }

    async fn repo() -> ReservationRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().reservations()
    }

    #[tokio::test]
    async fn test_overlapping_reserve_conflicts() {
        let repo = repo().await;
        let unit = EquipmentUnit::listing("cam-1");

        repo.reserve(&unit, &range((2024, 3, 1), (2024, 3, 5))).await.unwrap();
        let err = repo
            .reserve(&unit, &range((2024, 3, 4), (2024, 3, 8)))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::RangeConflict { .. }));
        assert_eq!(repo.list_blocked_ranges(&unit).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_back_to_back_windows_both_succeed() {
        let repo = repo().await;
        let unit = EquipmentUnit::listing("cam-1");

        repo.reserve(&unit, &range((2024, 3, 5), (2024, 3, 9))).await.unwrap();
        repo.reserve(&unit, &range((2024, 3, 1), (2024, 3, 5))).await.unwrap();

        let blocked = repo.list_blocked_ranges(&unit).await.unwrap();
        assert_eq!(
            blocked,
            vec![
                range((2024, 3, 1), (2024, 3, 5)),
                range((2024, 3, 5), (2024, 3, 9)),
            ]
        );
    }

    #[tokio::test]
    async fn test_units_are_independent() {
        let repo = repo().await;
        let r = range((2024, 3, 1), (2024, 3, 5));

        repo.reserve(&EquipmentUnit::serialized("drone", "SN-1"), &r).await.unwrap();
        repo.reserve(&EquipmentUnit::serialized("drone", "SN-2"), &r).await.unwrap();
        repo.reserve(&EquipmentUnit::listing("tent"), &r).await.unwrap();

        assert_eq!(repo.list_blocked_for_equipment("drone").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_listing_window_blocks_every_serial() {
        let repo = repo().await;
        let r = range((2024, 3, 1), (2024, 3, 5));

        repo.reserve(&EquipmentUnit::listing("drone"), &r).await.unwrap();
        let err = repo
            .reserve(&EquipmentUnit::serialized("drone", "SN-1"), &range((2024, 3, 4), (2024, 3, 6)))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::RangeConflict { .. }));

        // Back-to-back with the listing window is still free
        let sn1 = EquipmentUnit::serialized("drone", "SN-1");
        repo.reserve(&sn1, &range((2024, 3, 5), (2024, 3, 7))).await.unwrap();
        assert_eq!(
            repo.list_blocked_ranges(&sn1).await.unwrap(),
            vec![range((2024, 3, 1), (2024, 3, 5)), range((2024, 3, 5), (2024, 3, 7))]
        );
    }

    #[tokio::test]
    async fn test_serial_window_blocks_whole_listing() {
        let repo = repo().await;
        let r = range((2024, 3, 1), (2024, 3, 5));

        repo.reserve(&EquipmentUnit::serialized("drone", "SN-2"), &r).await.unwrap();
        let err = repo
            .reserve(&EquipmentUnit::listing("drone"), &r)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::RangeConflict { .. }));
        assert_eq!(repo.list_blocked_for_equipment("drone").await.unwrap().len(), 1);
        assert!(repo
            .list_blocked_ranges(&EquipmentUnit::serialized("drone", "SN-1"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_release_is_idempotent_and_frees_range() {
        let repo = repo().await;
        let unit = EquipmentUnit::listing("cam-1");
        let r = range((2024, 3, 1), (2024, 3, 5));

        let window = repo.reserve(&unit, &r).await.unwrap();
        assert!(repo.release(&window.id).await.unwrap());
        assert!(!repo.release(&window.id).await.unwrap());
        assert!(!repo.release("no-such-window").await.unwrap());

        let stored = repo.get_by_id(&window.id).await.unwrap().unwrap();
        assert!(!stored.is_active());

        // Released dates can be booked again
        repo.reserve(&unit, &r).await.unwrap();
    }

    #[tokio::test]
    async fn test_trigger_rejects_direct_overlapping_insert() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let unit = EquipmentUnit::listing("cam-1");
        db.reservations()
            .reserve(&unit, &range((2024, 3, 1), (2024, 3, 5)))
            .await
            .unwrap();

        let err = sqlx::query(
            "INSERT INTO reservation_windows (id, equipment_id, serial, start_date, end_date, created_at)
             VALUES ('raw', 'cam-1', '', '2024-03-02', '2024-03-03', '2024-01-01T00:00:00Z')",
        )
        .execute(db.pool())
        .await
        .unwrap_err();

        assert!(matches!(DbError::from(err), DbError::RangeConflict { .. }));

        // A serial cannot slip under the whole-listing window either
        let err = sqlx::query(
            "INSERT INTO reservation_windows (id, equipment_id, serial, start_date, end_date, created_at)
             VALUES ('raw-sn', 'cam-1', 'SN-9', '2024-03-02', '2024-03-03', '2024-01-01T00:00:00Z')",
        )
        .execute(db.pool())
        .await
        .unwrap_err();

        assert!(matches!(DbError::from(err), DbError::RangeConflict { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_reservations_admit_exactly_one() {
        let path = std::env::temp_dir().join(format!("rental-race-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(4))
            .await
            .unwrap();
        let unit = EquipmentUnit::listing("cam-1");

        let mut handles = Vec::new();
        for day in 1..=8u32 {
            let repo = db.reservations();
            let unit = unit.clone();
            handles.push(tokio::spawn(async move {
                // Every candidate range covers March 9
                repo.reserve(&unit, &range((2024, 3, day), (2024, 3, day + 9))).await
            }));
        }

        let mut won = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => won += 1,
                Err(DbError::RangeConflict { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(won, 1);
        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }
}
