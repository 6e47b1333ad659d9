use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, query_scalar, QueryBuilder, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::database::DependencyChecker;
use crate::domains::core::repository::{FindById, HardDeletable};
use crate::domains::tenant::types::{
    NewTenant, Tenant, TenantFilter, TenantRow, TenantSummary, UpdateTenant,
};
use crate::errors::{DbError, DomainError, DomainResult, ValidationError};
use crate::types::{PaginatedResult, PaginationParams};

/// Tenant repository trait
#[async_trait]
pub trait TenantRepository: Send + Sync + FindById<Tenant> + HardDeletable {
    /// Find all tenants matching the filter, ordered by name
    async fn find_all(&self, filter: &TenantFilter) -> DomainResult<Vec<Tenant>>;

    /// Find one page of tenants matching the filter
    async fn find_paginated(
        &self,
        filter: &TenantFilter,
        params: PaginationParams,
    ) -> DomainResult<PaginatedResult<Tenant>>;

    /// Id/name pairs for form dropdowns, ordered by name
    async fn find_summaries(&self) -> DomainResult<Vec<TenantSummary>>;

    /// Create a new tenant
    async fn create(&self, tenant: &NewTenant) -> DomainResult<Tenant>;

    /// Update an existing tenant
    async fn update(&self, id: Uuid, update: &UpdateTenant) -> DomainResult<Tenant>;

    /// Check if an email is unique
    async fn is_email_unique(&self, email: &str, exclude_id: Option<Uuid>) -> DomainResult<bool>;
}

/// SQLite implementation of TenantRepository
pub struct SqliteTenantRepository {
    pool: SqlitePool,
    dependency_checker: DependencyChecker,
}

impl SqliteTenantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        let dependency_checker = DependencyChecker::new(pool.clone());
        Self {
            pool,
            dependency_checker,
        }
    }

    fn push_filters(qb: &mut QueryBuilder<Sqlite>, filter: &TenantFilter) {
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            qb.push(" AND (name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR email LIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }

    async fn find_by_id_with_tx(
        &self,
        id: Uuid,
        tx: &mut Transaction<'_, Sqlite>,
    ) -> DomainResult<Tenant> {
        let row = query_as::<_, TenantRow>("SELECT * FROM tenants WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("Tenant".to_string(), id))?;

        row.into_entity()
    }
}

#[async_trait]
impl FindById<Tenant> for SqliteTenantRepository {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Tenant> {
        let row = query_as::<_, TenantRow>("SELECT * FROM tenants WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?
            .ok_or_else(|| DomainError::EntityNotFound("Tenant".to_string(), id))?;

        row.into_entity()
    }
}

#[async_trait]
impl HardDeletable for SqliteTenantRepository {
    fn entity_name(&self) -> &'static str {
        "tenants"
    }

    async fn hard_delete(&self, id: Uuid) -> DomainResult<()> {
        let dependencies = self
            .dependency_checker
            .dependency_table_names(self.entity_name(), id)
            .await
            .map_err(DomainError::Database)?;

        if !dependencies.is_empty() {
            log::warn!("refused to delete tenant {}: dependents in {:?}", id, dependencies);
            return Err(DomainError::DependentRecordsExist {
                entity_type: "Tenant".to_string(),
                id,
                dependencies,
            });
        }

        let result = query("DELETE FROM tenants WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        if result.rows_affected() == 0 {
            Err(DomainError::EntityNotFound("Tenant".to_string(), id))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TenantRepository for SqliteTenantRepository {
    async fn find_all(&self, filter: &TenantFilter) -> DomainResult<Vec<Tenant>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM tenants WHERE 1=1");
        Self::push_filters(&mut qb, filter);
        qb.push(" ORDER BY name");

        let rows = qb
            .build_query_as::<TenantRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        rows.into_iter().map(TenantRow::into_entity).collect()
    }

    async fn find_paginated(
        &self,
        filter: &TenantFilter,
        params: PaginationParams,
    ) -> DomainResult<PaginatedResult<Tenant>> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM tenants WHERE 1=1");
        Self::push_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM tenants WHERE 1=1");
        Self::push_filters(&mut qb, filter);
        qb.push(" ORDER BY name LIMIT ")
            .push_bind(params.per_page as i64)
            .push(" OFFSET ")
            .push_bind(params.offset() as i64);

        let rows = qb
            .build_query_as::<TenantRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        let items = rows
            .into_iter()
            .map(TenantRow::into_entity)
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(PaginatedResult::new(items, total as u64, params))
    }

    async fn find_summaries(&self) -> DomainResult<Vec<TenantSummary>> {
        let rows: Vec<(String, String)> = query_as("SELECT id, name FROM tenants ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        rows.into_iter()
            .map(|(id, name)| {
                Ok(TenantSummary {
                    id: Uuid::parse_str(&id).map_err(|_| DomainError::InvalidUuid(id))?,
                    name,
                })
            })
            .collect()
    }

    async fn create(&self, tenant: &NewTenant) -> DomainResult<Tenant> {
        if !self.is_email_unique(&tenant.email, None).await? {
            return Err(DomainError::Validation(ValidationError::unique("email")));
        }

        let id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();

        query(
            "INSERT INTO tenants (id, name, email, phone, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&tenant.name)
        .bind(&tenant.email)
        .bind(&tenant.phone)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Database(DbError::from(e)))?;

        self.find_by_id(id).await
    }

    async fn update(&self, id: Uuid, update: &UpdateTenant) -> DomainResult<Tenant> {
        if let Some(email) = &update.email {
            if !self.is_email_unique(email, Some(id)).await? {
                return Err(DomainError::Validation(ValidationError::unique("email")));
            }
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::Database(DbError::from(e)))?;

        let current = self.find_by_id_with_tx(id, &mut tx).await?;

        let name = update.name.clone().unwrap_or(current.name);
        let email = update.email.clone().unwrap_or(current.email);
        let phone = update.phone.clone().or(current.phone);
        let now = Utc::now().to_rfc3339();

        query("UPDATE tenants SET name = ?, email = ?, phone = ?, updated_at = ? WHERE id = ?")
            .bind(&name)
            .bind(&email)
            .bind(&phone)
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

    async fn is_email_unique(&self, email: &str, exclude_id: Option<Uuid>) -> DomainResult<bool> {
        let count: i64 = match exclude_id {
            Some(id) => query_scalar("SELECT COUNT(*) FROM tenants WHERE email = ? AND id != ?")
                .bind(email)
                .bind(id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DomainError::Database(DbError::from(e)))?,
            None => query_scalar("SELECT COUNT(*) FROM tenants WHERE email = ?")
                .bind(email)
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

    async fn setup() -> SqliteTenantRepository {
        let store = Store::in_memory().await.unwrap();
        store.migrate().await.unwrap();
        SqliteTenantRepository::new(store.pool().clone())
    }

    fn jean() -> NewTenant {
        NewTenant {
            name: "Jean Dupont".to_string(),
            email: "jean.dupont@example.com".to_string(),
            phone: Some("0612345678".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_search() {
        let repo = setup().await;

        repo.create(&jean()).await.unwrap();
        repo.create(&NewTenant {
            name: "Marie Martin".to_string(),
            email: "marie.martin@example.com".to_string(),
            phone: None,
        })
        .await
        .unwrap();

        let filter = TenantFilter {
            search: Some("martin".to_string()),
        };
        let matches = repo.find_all(&filter).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name, "Marie Martin");
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = setup().await;

        repo.create(&jean()).await.unwrap();
        let err = repo.create(&jean()).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation(ValidationError::Unique { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_unique_email_check() {
        let repo = setup().await;

        repo.create(&jean()).await.unwrap();
        let marie = repo
            .create(&NewTenant {
                name: "Marie Martin".to_string(),
                email: "marie.martin@example.com".to_string(),
                phone: None,
            })
            .await
            .unwrap();

        let update = UpdateTenant {
            email: Some("jean.dupont@example.com".to_string()),
            ..Default::default()
        };
        let err = repo.update(marie.id, &update).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation(ValidationError::Unique { .. })
        ));
    }
}
