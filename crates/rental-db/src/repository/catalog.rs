//! # Catalog Repository
//!
//! Equipment listings and insurance packages.
//!
//! The booking engine only reads the catalog through [`EquipmentCatalog`] and
//! [`InsuranceCatalog`], so a listing service or an in-memory fixture can stand
//! in for these tables.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use rental_core::{Equipment, InsurancePackage, Money};

// =============================================================================
// Catalog Traits
// =============================================================================

/// Read access to equipment listings.
#[async_trait]
pub trait EquipmentCatalog: Send + Sync {
    /// Looks up a listing. `Ok(None)` when it does not exist.
    async fn get_equipment(&self, equipment_id: &str) -> DbResult<Option<Equipment>>;
}

/// Read access to insurance packages.
#[async_trait]
pub trait InsuranceCatalog: Send + Sync {
    /// All packages, ordered by id.
    async fn list_packages(&self) -> DbResult<Vec<InsurancePackage>>;

    /// Looks up a package. `Ok(None)` when it does not exist.
    async fn get_package(&self, package_id: &str) -> DbResult<Option<InsurancePackage>> {
        Ok(self
            .list_packages()
            .await?
            .into_iter()
            .find(|p| p.id == package_id))
    }
}

// =============================================================================
// SQLite Implementation
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct EquipmentRow {
    id: String,
    owner_id: String,
    name: String,
    daily_rate: i64,
    replacement_price: i64,
    serials: String,
}

impl TryFrom<EquipmentRow> for Equipment {
    type Error = DbError;

    fn try_from(row: EquipmentRow) -> DbResult<Self> {
        let serials = serde_json::from_str(&row.serials)
            .map_err(|e| DbError::corrupt("Equipment", &row.id, e))?;

        Ok(Equipment {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            daily_rate: Money::from_units(row.daily_rate),
            replacement_price: Money::from_units(row.replacement_price),
            serials,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PackageRow {
    id: String,
    name: String,
    min_coverage: i64,
    max_coverage: i64,
}

impl From<PackageRow> for InsurancePackage {
    fn from(row: PackageRow) -> Self {
        InsurancePackage {
            id: row.id,
            name: row.name,
            min_coverage: Money::from_units(row.min_coverage),
            max_coverage: Money::from_units(row.max_coverage),
        }
    }
}

/// Repository for catalog tables.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Inserts or replaces an equipment listing.
    pub async fn upsert_equipment(&self, equipment: &Equipment) -> DbResult<()> {
        debug!(id = %equipment.id, units = equipment.serials.len(), "Upserting equipment");

        let serials = serde_json::to_string(&equipment.serials)?;

        sqlx::query(
            r#"
            INSERT INTO equipment (id, owner_id, name, daily_rate, replacement_price, serials)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                owner_id = excluded.owner_id,
                name = excluded.name,
                daily_rate = excluded.daily_rate,
                replacement_price = excluded.replacement_price,
                serials = excluded.serials
            "#,
        )
        .bind(&equipment.id)
        .bind(&equipment.owner_id)
        .bind(&equipment.name)
        .bind(equipment.daily_rate.units())
        .bind(equipment.replacement_price.units())
        .bind(serials)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts or replaces an insurance package.
    pub async fn upsert_package(&self, package: &InsurancePackage) -> DbResult<()> {
        debug!(id = %package.id, "Upserting insurance package");

        sqlx::query(
            r#"
            INSERT INTO insurance_packages (id, name, min_coverage, max_coverage)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                min_coverage = excluded.min_coverage,
                max_coverage = excluded.max_coverage
            "#,
        )
        .bind(&package.id)
        .bind(&package.name)
        .bind(package.min_coverage.units())
        .bind(package.max_coverage.units())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Number of equipment listings.
    pub async fn count_equipment(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM equipment")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl EquipmentCatalog for CatalogRepository {
    async fn get_equipment(&self, equipment_id: &str) -> DbResult<Option<Equipment>> {
        let row: Option<EquipmentRow> = sqlx::query_as(
            "SELECT id, owner_id, name, daily_rate, replacement_price, serials
             FROM equipment WHERE id = ?1",
        )
        .bind(equipment_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Equipment::try_from).transpose()
    }
}

#[async_trait]
impl InsuranceCatalog for CatalogRepository {
    async fn list_packages(&self) -> DbResult<Vec<InsurancePackage>> {
        let rows: Vec<PackageRow> = sqlx::query_as(
            "SELECT id, name, min_coverage, max_coverage FROM insurance_packages ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(InsurancePackage::from).collect())
    }

    async fn get_package(&self, package_id: &str) -> DbResult<Option<InsurancePackage>> {
        let row: Option<PackageRow> = sqlx::query_as(
            "SELECT id, name, min_coverage, max_coverage FROM insurance_packages WHERE id = ?1",
        )
        .bind(package_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(InsurancePackage::from))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_upsert_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();

        let mut camera = Equipment {
            id: "cam-1".to_string(),
            owner_id: "owner-1".to_string(),
            name: "Mirrorless Camera".to_string(),
            daily_rate: Money::from_units(800_000),
            replacement_price: Money::from_units(45_000_000),
            serials: vec![],
        };
        catalog.upsert_equipment(&camera).await.unwrap();

        camera.daily_rate = Money::from_units(900_000);
        camera.serials = vec!["SN-1".to_string(), "SN-2".to_string()];
        catalog.upsert_equipment(&camera).await.unwrap();

        assert_eq!(catalog.count_equipment().await.unwrap(), 1);
        let loaded = catalog.get_equipment("cam-1").await.unwrap().unwrap();
        assert_eq!(loaded.daily_rate, Money::from_units(900_000));
        assert!(loaded.has_serial("SN-2"));
        assert!(!loaded.has_serial("ghost"));
        assert!(catalog.get_equipment("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_packages_through_trait_object() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.catalog()
            .upsert_package(&InsurancePackage {
                id: "basic".to_string(),
                name: "Basic".to_string(),
                min_coverage: Money::from_units(10_000_000),
                max_coverage: Money::from_units(30_000_000),
            })
            .await
            .unwrap();

        let insurance: std::sync::Arc<dyn InsuranceCatalog> = std::sync::Arc::new(db.catalog());
        assert_eq!(insurance.list_packages().await.unwrap().len(), 1);
        assert_eq!(
            insurance.get_package("basic").await.unwrap().unwrap().name,
            "Basic"
        );
        assert!(insurance.get_package("gold").await.unwrap().is_none());
    }
}
