use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, query_scalar, QueryBuilder, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::domains::core::repository::{FindById, HardDeletable};
use crate::domains::lease::types::{
    Lease, LeaseFilter, LeaseRow, LeaseWithRelations, LeaseWithRelationsRow, NewLease, UpdateLease,
};
use crate::errors::{DbError, DomainError, DomainResult, ValidationError};
use crate::types::{PaginatedResult, PaginationParams};

const SELECT_WITH_RELATIONS: &str =
    "SELECT l.*, t.name AS tenant_name, p.ref AS property_ref, b.name AS building_name
     FROM leases l
     LEFT JOIN tenants t ON t.id = l.tenant_id
     LEFT JOIN properties p ON p.id = l.property_id
     LEFT JOIN buildings b ON b.id = p.building_id
     WHERE 1=1";

/// Lease repository trait
#[async_trait]
pub trait LeaseRepository: Send + Sync + FindById<Lease> + HardDeletable {
    /// Find a lease with tenant, property and building names resolved
    async fn find_with_relations(&self, id: Uuid) -> DomainResult<LeaseWithRelations>;

    /// Find all leases matching the filter, relations resolved, ordered by ref
    async fn find_all_with_relations(
        &self,
        filter: &LeaseFilter,
    ) -> DomainResult<Vec<LeaseWithRelations>>;

    /// Find one page of leases matching the filter
    async fn find_paginated(
        &self,
        filter: &LeaseFilter,
        params: PaginationParams,
    ) -> DomainResult<PaginatedResult<LeaseWithRelations>>;

    /// Most recently created leases, relations resolved (dashboard feed)
    async fn find_recent(&self, limit: u32) -> DomainResult<Vec<LeaseWithRelations>>;

    /// Create a new lease
    async fn create(&self, lease: &NewLease) -> DomainResult<Lease>;

    /// Update an existing lease
    async fn update(&self, id: Uuid, update: &UpdateLease) -> DomainResult<Lease>;

    /// Check if a lease ref is unique
    async fn is_ref_unique(&self, reference: &str, exclude_id: Option<Uuid>) -> DomainResult<bool>;
}

/// SQLite implementation of LeaseRepository
pub struct SqliteLeaseRepository {
    pool: SqlitePool,
}

impl SqliteLeaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn push_filters(qb: &mut QueryBuilder<Sqlite>, filter: &LeaseFilter) {
        if let Some(search) = &filter.search {
            qb.push(" AND l.ref LIKE ")
                .push_bind(format!("%{}%", search));
        }
        if let Some(status) = &filter.status {
            qb.push(" AND l.status = ").push_bind(status.clone());
        }
        if let Some(tenant_id) = &filter.tenant_id {
            qb.push(" AND l.tenant_id = ").push_bind(tenant_id.to_string());
        }
        if let Some(property_id) = &filter.property_id {
            qb.push(" AND l.property_id = ").push_bind(property_id.to_string());
        }
    }

    async fn ensure_related_exist(&self, tenant_id: Uuid, property_id: Uuid) -> DomainResult<()> {
        let tenants: i64 = query_scalar("SELECT COUNT(*) FROM tenants WHERE id = ?")
            .bind(tenant_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;
        if tenants == 0 {
            return Err(DomainError::Validation(ValidationError::relationship(
                &format!("tenant {} does not exist", tenant_id),
            )));
        }

        let properties: i64 = query_scalar("SELECT COUNT(*) FROM properties WHERE id = ?")
            .bind(property_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;
        if properties == 0 {
            return Err(DomainError::Validation(ValidationError::relationship(
                &format!("property {} does not exist", property_id),
            )));
        }

        Ok(())
    }

    async fn find_by_id_with_tx(
        &self,
        id: Uuid,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Lease> {
        let row = query_as::<_, LeaseRow>("SELECT * FROM leases WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("Lease".to_string(), id))?;

        row.into_entity()
    }
}

#[async_trait]
impl FindById<Lease> for SqliteLeaseRepository {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Lease> {
        let row = query_as::<_, LeaseRow>("SELECT * FROM leases WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("Lease".to_string(), id))?;

        row.into_entity()
    }
}

#[async_trait]
impl HardDeletable for SqliteLeaseRepository {
    fn entity_name(&self) -> &'static str {
        "leases"
    }

    async fn hard_delete(&self, id: Uuid) -> DomainResult<()> {
        // Nothing references leases; the delete is unconditional
        let result = query("DELETE FROM leases WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        if result.rows_affected() == 0 {
            Err(DomainError::EntityNotFound("Lease".to_string(), id))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LeaseRepository for SqliteLeaseRepository {
    async fn find_with_relations(&self, id: Uuid) -> DomainResult<LeaseWithRelations> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_WITH_RELATIONS);
        qb.push(" AND l.id = ").push_bind(id.to_string());

        let row = qb
            .build_query_as::<LeaseWithRelationsRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("Lease".to_string(), id))?;

        row.into_entity()
    }

    async fn find_all_with_relations(
        &self,
        filter: &LeaseFilter,
    ) -> DomainResult<Vec<LeaseWithRelations>> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_WITH_RELATIONS);
        Self::push_filters(&mut qb, filter);
        qb.push(" ORDER BY l.ref");

        let rows = qb
            .build_query_as::<LeaseWithRelationsRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        rows.into_iter()
            .map(LeaseWithRelationsRow::into_entity)
            .collect()
    }

    async fn find_paginated(
        &self,
        filter: &LeaseFilter,
        params: PaginationParams,
    ) -> DomainResult<PaginatedResult<LeaseWithRelations>> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM leases l WHERE 1=1");
        Self::push_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_WITH_RELATIONS);
        Self::push_filters(&mut qb, filter);
        qb.push(" ORDER BY l.ref LIMIT ")
            .push_bind(params.per_page as i64)
            .push(" OFFSET ")
            .push_bind(params.offset() as i64);

        let rows = qb
            .build_query_as::<LeaseWithRelationsRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        let items = rows
            .into_iter()
            .map(LeaseWithRelationsRow::into_entity)
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(PaginatedResult::new(items, total as u64, params))
    }

    async fn find_recent(&self, limit: u32) -> DomainResult<Vec<LeaseWithRelations>> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_WITH_RELATIONS);
        qb.push(" ORDER BY l.created_at DESC LIMIT ")
            .push_bind(limit as i64);

        let rows = qb
            .build_query_as::<LeaseWithRelationsRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        rows.into_iter()
            .map(LeaseWithRelationsRow::into_entity)
            .collect()
    }

    async fn create(&self, lease: &NewLease) -> DomainResult<Lease> {
        if !self.is_ref_unique(&lease.reference, None).await? {
            return Err(DomainError::Validation(ValidationError::unique("ref")));
        }
        self.ensure_related_exist(lease.tenant_id, lease.property_id).await?;

        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();

        query(
            "INSERT INTO leases (
                id, ref, tenant_id, property_id, start_date, end_date,
                rent, charges, deposit, payment_day, payment_method, status,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&lease.reference)
        .bind(lease.tenant_id.to_string())
        .bind(lease.property_id.to_string())
        .bind(lease.start_date.format("%Y-%m-%d").to_string())
        .bind(lease.end_date.format("%Y-%m-%d").to_string())
        .bind(lease.rent.to_string())
        .bind(lease.charges.map(|d| d.to_string()))
        .bind(lease.deposit.map(|d| d.to_string()))
        .bind(lease.payment_day)
        .bind(&lease.payment_method)
        .bind(&lease.status)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Database(DbError::from(e)))?;

        self.find_by_id(id).await
    }

    async fn update(&self, id: Uuid, update: &UpdateLease) -> DomainResult<Lease> {
        if let Some(reference) = &update.reference {
            if !self.is_ref_unique(reference, Some(id)).await? {
                return Err(DomainError::Validation(ValidationError::unique("ref")));
            }
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        let current = self.find_by_id_with_tx(id, &mut tx).await?;

        let reference = update.reference.clone().unwrap_or(current.reference);
        let start_date = update.start_date.unwrap_or(current.start_date);
        let end_date = update.end_date.unwrap_or(current.end_date);
        if end_date <= start_date {
            return Err(DomainError::Validation(ValidationError::invalid_value(
                "end_date",
                "must be after start_date",
            )));
        }
        let rent = update.rent.unwrap_or(current.rent);
        let charges = update.charges.or(current.charges);
        let deposit = update.deposit.or(current.deposit);
        let payment_day = update.payment_day.unwrap_or(current.payment_day);
        let payment_method = update.payment_method.clone().or(current.payment_method);
        let status = update.status.clone().unwrap_or(current.status);
        let now = Utc::now().to_rfc3339();

        query(
            "UPDATE leases SET
                ref = ?, start_date = ?, end_date = ?, rent = ?, charges = ?, deposit = ?,
                payment_day = ?, payment_method = ?, status = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&reference)
        .bind(start_date.format("%Y-%m-%d").to_string())
        .bind(end_date.format("%Y-%m-%d").to_string())
        .bind(rent.to_string())
        .bind(charges.map(|d| d.to_string()))
        .bind(deposit.map(|d| d.to_string()))
        .bind(payment_day)
        .bind(&payment_method)
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
            Some(id) => query_scalar("SELECT COUNT(*) FROM leases WHERE ref = ? AND id != ?")
                .bind(reference)
                .bind(id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DomainError::Database(DbError::from(e)))?,
            None => query_scalar("SELECT COUNT(*) FROM leases WHERE ref = ?")
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
    use crate::domains::property::repository::{PropertyRepository, SqlitePropertyRepository};
    use crate::domains::property::types::NewProperty;
    use crate::domains::tenant::repository::{SqliteTenantRepository, TenantRepository};
    use crate::domains::tenant::types::NewTenant;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    struct Fixture {
        repo: SqliteLeaseRepository,
        tenant_id: Uuid,
        property_id: Uuid,
    }

    async fn setup() -> Fixture {
        let store = Store::in_memory().await.unwrap();
        store.migrate().await.unwrap();

        let building = SqliteBuildingRepository::new(store.pool().clone())
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

        let property = SqlitePropertyRepository::new(store.pool().clone())
            .create(&NewProperty {
                reference: "APT-A101".to_string(),
                property_type: "Appartement".to_string(),
                building_id: building.id,
                surface: Some(45.5),
                rooms: Some(2),
                floor: Some(1),
                rent: dec!(850.00),
                charges: Some(dec!(120.00)),
                deposit: Some(dec!(850.00)),
                description: None,
                status: "Occupé".to_string(),
            })
            .await
            .unwrap();

        let tenant = SqliteTenantRepository::new(store.pool().clone())
            .create(&NewTenant {
                name: "Jean Dupont".to_string(),
                email: "jean.dupont@example.com".to_string(),
                phone: Some("0612345678".to_string()),
            })
            .await
            .unwrap();

        Fixture {
            repo: SqliteLeaseRepository::new(store.pool().clone()),
            tenant_id: tenant.id,
            property_id: property.id,
        }
    }

    fn new_lease(reference: &str, fixture: &Fixture) -> NewLease {
        NewLease {
            reference: reference.to_string(),
            tenant_id: fixture.tenant_id,
            property_id: fixture.property_id,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            rent: dec!(850.00),
            charges: Some(dec!(120.00)),
            deposit: Some(dec!(850.00)),
            payment_day: 5,
            payment_method: Some("Virement bancaire".to_string()),
            status: "Actif".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_relations() {
        let fixture = setup().await;

        let created = fixture
            .repo
            .create(&new_lease("BAIL-2025-001", &fixture))
            .await
            .unwrap();
        assert_eq!(created.payment_day, 5);
        assert_eq!(created.rent, dec!(850.00));

        let joined = fixture.repo.find_with_relations(created.id).await.unwrap();
        assert_eq!(joined.tenant_name.as_deref(), Some("Jean Dupont"));
        assert_eq!(joined.property_ref.as_deref(), Some("APT-A101"));
        assert_eq!(joined.building_name.as_deref(), Some("Résidence Les Oliviers"));
    }

    #[tokio::test]
    async fn test_unknown_tenant_rejected() {
        let fixture = setup().await;

        let mut lease = new_lease("BAIL-2025-002", &fixture);
        lease.tenant_id = Uuid::new_v4();
        let err = fixture.repo.create(&lease).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_rechecks_date_ordering() {
        let fixture = setup().await;

        let created = fixture
            .repo
            .create(&new_lease("BAIL-2025-003", &fixture))
            .await
            .unwrap();

        // Moving the start past the stored end must fail
        let update = UpdateLease {
            start_date: Some(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()),
            ..Default::default()
        };
        let err = fixture.repo.update(created.id, &update).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_status_filter_and_recent() {
        let fixture = setup().await;

        fixture
            .repo
            .create(&new_lease("BAIL-2025-004", &fixture))
            .await
            .unwrap();
        let mut notice = new_lease("BAIL-2025-005", &fixture);
        notice.status = "Préavis".to_string();
        fixture.repo.create(&notice).await.unwrap();

        let filter = LeaseFilter {
            status: Some("Actif".to_string()),
            ..Default::default()
        };
        let active = fixture.repo.find_all_with_relations(&filter).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].lease.reference, "BAIL-2025-004");

        let recent = fixture.repo.find_recent(5).await.unwrap();
        assert_eq!(recent.len(), 2);
    }
}
