use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, query_scalar, QueryBuilder, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::database::DependencyChecker;
use crate::domains::core::repository::{FindById, HardDeletable};
use crate::domains::property::types::{
    NewProperty, Property, PropertyFilter, PropertyRow, PropertySummary, PropertyWithBuilding,
    PropertyWithBuildingRow, UpdateProperty,
};
use crate::errors::{DbError, DomainError, DomainResult, ValidationError};
use crate::types::{PaginatedResult, PaginationParams};

const SELECT_WITH_BUILDING: &str =
    "SELECT p.*, b.name AS building_name
     FROM properties p
     LEFT JOIN buildings b ON b.id = p.building_id
     WHERE 1=1";

/// Property repository trait
#[async_trait]
pub trait PropertyRepository: Send + Sync + FindById<Property> + HardDeletable {
    /// Find a property with its building name resolved
    async fn find_with_building(&self, id: Uuid) -> DomainResult<PropertyWithBuilding>;

    /// Find all properties matching the filter, building name resolved, ordered by ref
    async fn find_all_with_building(
        &self,
        filter: &PropertyFilter,
    ) -> DomainResult<Vec<PropertyWithBuilding>>;

    /// Find one page of properties matching the filter
    async fn find_paginated(
        &self,
        filter: &PropertyFilter,
        params: PaginationParams,
    ) -> DomainResult<PaginatedResult<PropertyWithBuilding>>;

    /// Id/ref pairs for form dropdowns, ordered by ref
    async fn find_summaries(&self) -> DomainResult<Vec<PropertySummary>>;

    /// Create a new property
    async fn create(&self, property: &NewProperty) -> DomainResult<Property>;

    /// Update an existing property
    async fn update(&self, id: Uuid, update: &UpdateProperty) -> DomainResult<Property>;

    /// Check if a property ref is unique
    async fn is_ref_unique(&self, reference: &str, exclude_id: Option<Uuid>) -> DomainResult<bool>;
}

/// SQLite implementation of PropertyRepository
pub struct SqlitePropertyRepository {
    pool: SqlitePool,
    dependency_checker: DependencyChecker,
}

impl SqlitePropertyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        let dependency_checker = DependencyChecker::new(pool.clone());
        Self {
            pool,
            dependency_checker,
        }
    }

    fn push_filters(qb: &mut QueryBuilder<Sqlite>, filter: &PropertyFilter) {
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            qb.push(" AND (p.ref LIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.description LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(property_type) = &filter.property_type {
            qb.push(" AND p.type = ").push_bind(property_type.clone());
        }
        if let Some(status) = &filter.status {
            qb.push(" AND p.status = ").push_bind(status.clone());
        }
        if let Some(building_id) = &filter.building_id {
            qb.push(" AND p.building_id = ").push_bind(building_id.to_string());
        }
    }

    async fn ensure_building_exists(&self, building_id: Uuid) -> DomainResult<()> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM buildings WHERE id = ?")
            .bind(building_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        if count == 0 {
            return Err(DomainError::Validation(ValidationError::relationship(
                &format!("building {} does not exist", building_id),
            )));
        }
        Ok(())
    }

    async fn find_by_id_with_tx(
        &self,
        id: Uuid,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Property> {
        let row = query_as::<_, PropertyRow>("SELECT * FROM properties WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("Property".to_string(), id))?;

        row.into_entity()
    }
}

#[async_trait]
impl FindById<Property> for SqlitePropertyRepository {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Property> {
        let row = query_as::<_, PropertyRow>("SELECT * FROM properties WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("Property".to_string(), id))?;

        row.into_entity()
    }
}

#[async_trait]
impl HardDeletable for SqlitePropertyRepository {
    fn entity_name(&self) -> &'static str {
        "properties"
    }

    async fn hard_delete(&self, id: Uuid) -> DomainResult<()> {
        let dependencies = self
            .dependency_checker
            .dependency_table_names(self.entity_name(), id)
            .await
            .map_err(DomainError::Database)?;

        if !dependencies.is_empty() {
            log::warn!("refused to delete property {}: dependents in {:?}", id, dependencies);
            return Err(DomainError::DependentRecordsExist {
                entity_type: "Property".to_string(),
                id,
                dependencies,
            });
        }

        let result = query("DELETE FROM properties WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        if result.rows_affected() == 0 {
            Err(DomainError::EntityNotFound("Property".to_string(), id))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PropertyRepository for SqlitePropertyRepository {
    async fn find_with_building(&self, id: Uuid) -> DomainResult<PropertyWithBuilding> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_WITH_BUILDING);
        qb.push(" AND p.id = ").push_bind(id.to_string());

        let row = qb
            .build_query_as::<PropertyWithBuildingRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("Property".to_string(), id))?;

        row.into_entity()
    }

    async fn find_all_with_building(
        &self,
        filter: &PropertyFilter,
    ) -> DomainResult<Vec<PropertyWithBuilding>> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_WITH_BUILDING);
        Self::push_filters(&mut qb, filter);
        qb.push(" ORDER BY p.ref");

        let rows = qb
            .build_query_as::<PropertyWithBuildingRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        rows.into_iter()
            .map(PropertyWithBuildingRow::into_entity)
            .collect()
    }

    async fn find_paginated(
        &self,
        filter: &PropertyFilter,
        params: PaginationParams,
    ) -> DomainResult<PaginatedResult<PropertyWithBuilding>> {
        let mut count_qb =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM properties p WHERE 1=1");
        Self::push_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_WITH_BUILDING);
        Self::push_filters(&mut qb, filter);
        qb.push(" ORDER BY p.ref LIMIT ")
            .push_bind(params.per_page as i64)
            .push(" OFFSET ")
            .push_bind(params.offset() as i64);

        let rows = qb
            .build_query_as::<PropertyWithBuildingRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        let items = rows
            .into_iter()
            .map(PropertyWithBuildingRow::into_entity)
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(PaginatedResult::new(items, total as u64, params))
    }

    async fn find_summaries(&self) -> DomainResult<Vec<PropertySummary>> {
        let rows: Vec<(String, String)> = query_as("SELECT id, ref FROM properties ORDER BY ref")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        rows.into_iter()
            .map(|(id, reference)| {
                Ok(PropertySummary {
                    id: Uuid::parse_str(&id).map_err(|_| DomainError::InvalidUuid(id))?,
                    reference,
                })
            })
            .collect()
    }

    async fn create(&self, property: &NewProperty) -> DomainResult<Property> {
        if !self.is_ref_unique(&property.reference, None).await? {
            return Err(DomainError::Validation(ValidationError::unique("ref")));
        }
        self.ensure_building_exists(property.building_id).await?;

        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();

        query(
            "INSERT INTO properties (
                id, ref, type, building_id, surface, rooms, floor,
                rent, charges, deposit, description, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&property.reference)
        .bind(&property.property_type)
        .bind(property.building_id.to_string())
        .bind(property.surface)
        .bind(property.rooms)
        .bind(property.floor)
        .bind(property.rent.to_string())
        .bind(property.charges.map(|d| d.to_string()))
        .bind(property.deposit.map(|d| d.to_string()))
        .bind(&property.description)
        .bind(&property.status)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Database(DbError::from(e)))?;

        self.find_by_id(id).await
    }

    async fn update(&self, id: Uuid, update: &UpdateProperty) -> DomainResult<Property> {
        if let Some(reference) = &update.reference {
            if !self.is_ref_unique(reference, Some(id)).await? {
                return Err(DomainError::Validation(ValidationError::unique("ref")));
            }
        }
        if let Some(building_id) = update.building_id {
            self.ensure_building_exists(building_id).await?;
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        let current = self.find_by_id_with_tx(id, &mut tx).await?;

        let reference = update.reference.clone().unwrap_or(current.reference);
        let property_type = update.property_type.clone().unwrap_or(current.property_type);
        let building_id = update.building_id.unwrap_or(current.building_id);
        let surface = update.surface.or(current.surface);
        let rooms = update.rooms.or(current.rooms);
        let floor = update.floor.or(current.floor);
        let rent = update.rent.unwrap_or(current.rent);
        let charges = update.charges.or(current.charges);
        let deposit = update.deposit.or(current.deposit);
        let description = update.description.clone().or(current.description);
        let status = update.status.clone().unwrap_or(current.status);
        let now = Utc::now().to_rfc3339();

        query(
            "UPDATE properties SET
                ref = ?, type = ?, building_id = ?, surface = ?, rooms = ?, floor = ?,
                rent = ?, charges = ?, deposit = ?, description = ?, status = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&reference)
        .bind(&property_type)
        .bind(building_id.to_string())
        .bind(surface)
        .bind(rooms)
        .bind(floor)
        .bind(rent.to_string())
        .bind(charges.map(|d| d.to_string()))
        .bind(deposit.map(|d| d.to_string()))
        .bind(&description)
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

    async fn is_ref_unique(&self, reference: &str, exclude_id: Option<Uuid>) -> DomainResult<bool> {
        let count: i64 = match exclude_id {
            Some(id) => query_scalar("SELECT COUNT(*) FROM properties WHERE ref = ? AND id != ?")
                .bind(reference)
                .bind(id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DomainError::Database(DbError::from(e)))?,
            None => query_scalar("SELECT COUNT(*) FROM properties WHERE ref = ?")
                .bind(reference)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DomainError::Database(DbError::from(e)))?,
        };

        Ok(count == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Store;
    use crate::domains::building::repository::{BuildingRepository, SqliteBuildingRepository};
    use crate::domains::building::types::NewBuilding;
    use rust_decimal_macros::dec;

    async fn setup() -> (Store, SqlitePropertyRepository, Uuid) {
        let store = Store::in_memory().await.unwrap();
        store.migrate().await.unwrap();

        let buildings = SqliteBuildingRepository::new(store.pool().clone());
        let building = buildings
            .create(&NewBuilding {
                name: "Résidence Les Oliviers".to_string(),
                address: "12 rue des Oliviers, 75011 Paris".to_string(),
                building_type: "Résidentiel".to_string(),
                units: Some(24),
                year_built: Some(1985),
                status: Some("Bon".to_string()),
            })
            .await
            .unwrap();

        let repo = SqlitePropertyRepository::new(store.pool().clone());
        (store, repo, building.id)
    }

    fn apartment(reference: &str, building_id: Uuid) -> NewProperty {
        NewProperty {
            reference: reference.to_string(),
            property_type: "Appartement".to_string(),
            building_id,
            surface: Some(45.5),
            rooms: Some(2),
            floor: Some(1),
            rent: dec!(850.00),
            charges: Some(dec!(120.00)),
            deposit: Some(dec!(850.00)),
            description: Some("Deux pièces lumineux".to_string()),
            status: "Vacant".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_round_trips_decimals() {
        let (_store, repo, building_id) = setup().await;

        let created = repo.create(&apartment("APT-A101", building_id)).await.unwrap();
        assert_eq!(created.rent, dec!(850.00));
        assert_eq!(created.charges, Some(dec!(120.00)));

        let found = repo.find_by_id(created.id).await.unwrap();
        assert_eq!(found.rent, dec!(850.00));
    }

    #[tokio::test]
    async fn test_building_join_resolved() {
        let (_store, repo, building_id) = setup().await;

        let created = repo.create(&apartment("APT-A101", building_id)).await.unwrap();

        let joined = repo.find_with_building(created.id).await.unwrap();
        assert_eq!(joined.building_name.as_deref(), Some("Résidence Les Oliviers"));

        let all = repo
            .find_all_with_building(&PropertyFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].building_name.as_deref(), Some("Résidence Les Oliviers"));
    }

    #[tokio::test]
    async fn test_duplicate_ref_rejected() {
        let (_store, repo, building_id) = setup().await;

        repo.create(&apartment("APT-A101", building_id)).await.unwrap();
        let err = repo
            .create(&apartment("APT-A101", building_id))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation(ValidationError::Unique { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_building_rejected() {
        let (_store, repo, _building_id) = setup().await;

        let err = repo
            .create(&apartment("APT-B201", Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_status_filter() {
        let (_store, repo, building_id) = setup().await;

        repo.create(&apartment("APT-A101", building_id)).await.unwrap();
        let mut occupied = apartment("APT-A102", building_id);
        occupied.status = "Occupé".to_string();
        repo.create(&occupied).await.unwrap();

        let filter = PropertyFilter {
            status: Some("Vacant".to_string()),
            ..Default::default()
        };
        let vacant = repo.find_all_with_building(&filter).await.unwrap();
        assert_eq!(vacant.len(), 1);
        assert_eq!(vacant[0].property.reference, "APT-A101");
    }
}
