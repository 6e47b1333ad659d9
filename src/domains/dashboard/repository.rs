use async_trait::async_trait;
use sqlx::{query_scalar, SqlitePool};

use crate::domains::dashboard::types::DashboardStats;
use crate::domains::lease::types::LEASE_STATUS_ACTIVE;
use crate::domains::property::types::PROPERTY_STATUS_VACANT;
use crate::errors::{DbError, DomainError, DomainResult};

/// Dashboard repository trait
#[async_trait]
pub trait DashboardRepository: Send + Sync {
    /// Entity counts for the dashboard tiles
    async fn stats(&self) -> DomainResult<DashboardStats>;
}

/// SQLite implementation of DashboardRepository
pub struct SqliteDashboardRepository {
    pool: SqlitePool,
}

impl SqliteDashboardRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn count(&self, sql: &str, bind: Option<&str>) -> DomainResult<i64> {
        let q = query_scalar::<_, i64>(sql);
        let q = match bind {
            Some(value) => q.bind(value.to_string()),
            None => q,
        };
        q.fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))
    }
}

#[async_trait]
impl DashboardRepository for SqliteDashboardRepository {
    async fn stats(&self) -> DomainResult<DashboardStats> {
        let buildings = self.count("SELECT COUNT(*) FROM buildings", None).await?;
        let properties = self.count("SELECT COUNT(*) FROM properties", None).await?;
        let tenants = self.count("SELECT COUNT(*) FROM tenants", None).await?;
        let active_leases = self
            .count("SELECT COUNT(*) FROM leases WHERE status = ?", Some(LEASE_STATUS_ACTIVE))
            .await?;
        let vacant_properties = self
            .count(
                "SELECT COUNT(*) FROM properties WHERE status = ?",
                Some(PROPERTY_STATUS_VACANT),
            )
            .await?;

        Ok(DashboardStats {
            buildings,
            properties,
            tenants,
            active_leases,
            vacant_properties,
        })
    }
}
