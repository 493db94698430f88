//! # Incident Repository (Incident Ledger)
//!
//! Append-only storage for incidents raised at check-in and check-out.
//!
//! ## Ledger Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Rows are inserted, never deleted (trigger: INCIDENT_APPEND_ONLY)    │
//! │  2. estimated_charge is frozen once written                             │
//! │  3. Resolution is a one-way write:                                      │
//! │       UPDATE ... WHERE id = ? AND resolution_amount IS NULL             │
//! │     A second resolve touches 0 rows.                                    │
//! │  4. Listing order is insertion order (rowid; rows are never deleted)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use rental_core::{Incident, IncidentOutcome, IncidentStage, IncidentType, Money, Severity};

#[derive(Debug, sqlx::FromRow)]
struct IncidentRow {
    id: String,
    booking_id: String,
    incident_type: IncidentType,
    severity: Severity,
    stage: IncidentStage,
    description: Option<String>,
    images: String,
    estimated_charge: i64,
    resolution_amount: Option<i64>,
    outcome: Option<IncidentOutcome>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<IncidentRow> for Incident {
    type Error = DbError;

    fn try_from(row: IncidentRow) -> DbResult<Self> {
        let images =
            serde_json::from_str(&row.images).map_err(|e| DbError::corrupt("Incident", &row.id, e))?;

        Ok(Incident {
            id: row.id,
            booking_id: row.booking_id,
            incident_type: row.incident_type,
            severity: row.severity,
            stage: row.stage,
            description: row.description,
            images,
            estimated_charge: Money::from_units(row.estimated_charge),
            resolution_amount: row.resolution_amount.map(Money::from_units),
            outcome: row.outcome,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        })
    }
}

const INCIDENT_COLUMNS: &str = r#"
    id, booking_id, incident_type, severity, stage, description, images,
    estimated_charge, resolution_amount, outcome, created_at, resolved_at
"#;

/// Repository for the incident ledger.
#[derive(Debug, Clone)]
pub struct IncidentRepository {
    pool: SqlitePool,
}

impl IncidentRepository {
    /// Creates a new IncidentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        IncidentRepository { pool }
    }

    /// Gets an incident by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Incident>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, id).await
    }

    /// Gets an incident by ID on an open connection or transaction.
    pub async fn get_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Incident>> {
        let sql = format!("SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = ?1");
        let row: Option<IncidentRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(Incident::try_from).transpose()
    }

    /// Lists every incident of a booking in creation order.
    pub async fn list_for_booking(&self, booking_id: &str) -> DbResult<Vec<Incident>> {
        let mut conn = self.pool.acquire().await?;
        Self::list_in(&mut conn, booking_id).await
    }

    /// Lists incidents on an open connection or transaction.
    pub async fn list_in(conn: &mut SqliteConnection, booking_id: &str) -> DbResult<Vec<Incident>> {
        let sql = format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE booking_id = ?1 ORDER BY rowid"
        );
        let rows: Vec<IncidentRow> = sqlx::query_as(&sql)
            .bind(booking_id)
            .fetch_all(&mut *conn)
            .await?;

        rows.into_iter().map(Incident::try_from).collect()
    }

    /// Appends an incident.
    pub async fn insert_in(conn: &mut SqliteConnection, incident: &Incident) -> DbResult<()> {
        debug!(
            id = %incident.id,
            booking_id = %incident.booking_id,
            incident_type = ?incident.incident_type,
            estimated_charge = incident.estimated_charge.units(),
            "Appending incident"
        );

        let images = serde_json::to_string(&incident.images)?;

        sqlx::query(
            r#"
            INSERT INTO incidents (
                id, booking_id, incident_type, severity, stage, description, images,
                estimated_charge, resolution_amount, outcome, created_at, resolved_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&incident.id)
        .bind(&incident.booking_id)
        .bind(incident.incident_type)
        .bind(incident.severity)
        .bind(incident.stage)
        .bind(&incident.description)
        .bind(images)
        .bind(incident.estimated_charge.units())
        .bind(incident.resolution_amount.map(|m| m.units()))
        .bind(incident.outcome)
        .bind(incident.created_at)
        .bind(incident.resolved_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Records a resolution if the incident is still open.
    ///
    /// ## Returns
    /// * `Ok(true)` - resolution written
    /// * `Ok(false)` - already resolved (or unknown id)
    pub async fn resolve_in(
        conn: &mut SqliteConnection,
        id: &str,
        amount: Money,
        outcome: IncidentOutcome,
        resolved_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE incidents
            SET resolution_amount = ?2, outcome = ?3, resolved_at = ?4
            WHERE id = ?1 AND resolution_amount IS NULL
            "#,
        )
        .bind(id)
        .bind(amount.units())
        .bind(outcome)
        .bind(resolved_at)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts unresolved incidents of a booking.
    pub async fn count_open_in(conn: &mut SqliteConnection, booking_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM incidents WHERE booking_id = ?1 AND resolution_amount IS NULL",
        )
        .bind(booking_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
