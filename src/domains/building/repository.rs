use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, QueryBuilder, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::database::DependencyChecker;
use crate::domains::building::types::{
    Building, BuildingFilter, BuildingRow, BuildingSummary, NewBuilding, UpdateBuilding,
};
use crate::domains::core::repository::{FindById, HardDeletable};
use crate::errors::{DbError, DomainError, DomainResult};
use crate::types::{PaginatedResult, PaginationParams};

/// Building repository trait
#[async_trait]
pub trait BuildingRepository: Send + Sync + FindById<Building> + HardDeletable {
    /// Find all buildings matching the filter, ordered by name
    async fn find_all(&self, filter: &BuildingFilter) -> DomainResult<Vec<Building>>;

    /// Find one page of buildings matching the filter
    async fn find_paginated(
        &self,
        filter: &BuildingFilter,
        params: PaginationParams,
    ) -> DomainResult<PaginatedResult<Building>>;

    /// Id/name pairs for form dropdowns, ordered by name
    async fn find_summaries(&self) -> DomainResult<Vec<BuildingSummary>>;

    /// Create a new building
    async fn create(&self, building: &NewBuilding) -> DomainResult<Building>;

    /// Update an existing building
    async fn update(&self, id: Uuid, update: &UpdateBuilding) -> DomainResult<Building>;
}

/// SQLite implementation of BuildingRepository
pub struct SqliteBuildingRepository {
    pool: SqlitePool,
    dependency_checker: DependencyChecker,
}

impl SqliteBuildingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        let dependency_checker = DependencyChecker::new(pool.clone());
        Self {
            pool,
            dependency_checker,
        }
    }

    fn push_filters(qb: &mut QueryBuilder<Sqlite>, filter: &BuildingFilter) {
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            qb.push(" AND (name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR address LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(building_type) = &filter.building_type {
            qb.push(" AND type = ").push_bind(building_type.clone());
        }
        if let Some(status) = &filter.status {
            qb.push(" AND status = ").push_bind(status.clone());
        }
    }

    async fn find_by_id_with_tx(
        &self,
        id: Uuid,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Building> {
        let row = query_as::<_, BuildingRow>("SELECT * FROM buildings WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("Building".to_string(), id))?;

        row.into_entity()
    }
}

#[async_trait]
impl FindById<Building> for SqliteBuildingRepository {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Building> {
        let row = query_as::<_, BuildingRow>("SELECT * FROM buildings WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("Building".to_string(), id))?;

        row.into_entity()
    }
}

#[async_trait]
impl HardDeletable for SqliteBuildingRepository {
    fn entity_name(&self) -> &'static str {
        "buildings"
    }

    async fn hard_delete(&self, id: Uuid) -> DomainResult<()> {
        let dependencies = self
            .dependency_checker
            .dependency_table_names(self.entity_name(), id)
            .await
            .map_err(DomainError::Database)?;

        if !dependencies.is_empty() {
            log::warn!("refused to delete building {}: dependents in {:?}", id, dependencies);
            return Err(DomainError::DependentRecordsExist {
                entity_type: "Building".to_string(),
                id,
                dependencies,
            });
        }

        let result = query("DELETE FROM buildings WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        if result.rows_affected() == 0 {
            Err(DomainError::EntityNotFound("Building".to_string(), id))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BuildingRepository for SqliteBuildingRepository {
    async fn find_all(&self, filter: &BuildingFilter) -> DomainResult<Vec<Building>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM buildings WHERE 1=1");
        Self::push_filters(&mut qb, filter);
        qb.push(" ORDER BY name");

        let rows = qb
            .build_query_as::<BuildingRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        rows.into_iter().map(BuildingRow::into_entity).collect()
    }

    async fn find_paginated(
        &self,
        filter: &BuildingFilter,
        params: PaginationParams,
    ) -> DomainResult<PaginatedResult<Building>> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM buildings WHERE 1=1");
        Self::push_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM buildings WHERE 1=1");
        Self::push_filters(&mut qb, filter);
        qb.push(" ORDER BY name LIMIT ")
            .push_bind(params.per_page as i64)
            .push(" OFFSET ")
            .push_bind(params.offset() as i64);

        let rows = qb
            .build_query_as::<BuildingRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        let items = rows
            .into_iter()
            .map(BuildingRow::into_entity)
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(PaginatedResult::new(items, total as u64, params))
    }

    async fn find_summaries(&self) -> DomainResult<Vec<BuildingSummary>> {
        let rows: Vec<(String, String)> =
            query_as("SELECT id, name FROM buildings ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DomainError::Database(DbError::from(e)))?;

        rows.into_iter()
            .map(|(id, name)| {
                Ok(BuildingSummary {
                    id: Uuid::parse_str(&id).map_err(|_| DomainError::InvalidUuid(id))?,
                    name,
                })
            })
            .collect()
    }

    async fn create(&self, building: &NewBuilding) -> DomainResult<Building> {
        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();

        query(
            "INSERT INTO buildings (
                id, name, address, type, units, year_built, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&building.name)
        .bind(&building.address)
        .bind(&building.building_type)
        .bind(building.units)
        .bind(building.year_built)
        .bind(&building.status)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Database(DbError::from(e)))?;

        self.find_by_id(id).await
    }

    async fn update(&self, id: Uuid, update: &UpdateBuilding) -> DomainResult<Building> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        // Fetch the current state inside the transaction, then write the
        // merged row back in one statement.
        let current = self.find_by_id_with_tx(id, &mut tx).await?;

        let name = update.name.clone().unwrap_or(current.name);
        let address = update.address.clone().unwrap_or(current.address);
        let building_type = update.building_type.clone().unwrap_or(current.building_type);
        let units = update.units.or(current.units);
        let year_built = update.year_built.or(current.year_built);
        let status = update.status.clone().or(current.status);
        let now = Utc::now().to_rfc3339();

        query(
            "UPDATE buildings SET
                name = ?, address = ?, type = ?, units = ?, year_built = ?, status = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&name)
        .bind(&address)
        .bind(&building_type)
        .bind(units)
        .bind(year_built)
        .bind(&status)
        .bind(&now)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::Database(DbError::from(e)))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        self.find_by_id(id).await
    }
}
