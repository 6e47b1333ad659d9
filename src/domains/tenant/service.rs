use std::sync::Arc;

use uuid::Uuid;

use crate::database::Store;
use crate::domains::tenant::repository::{SqliteTenantRepository, TenantRepository};
use crate::domains::tenant::types::{
    NewTenant, TenantFilter, TenantResponse, TenantSummary, UpdateTenant,
};
use crate::errors::{DomainError, ServiceError, ServiceResult};
use crate::types::{PaginatedResult, PaginationParams};
use crate::validation::Validate;

/// Service for tenant-related operations
pub struct TenantService {
    repo: Arc<dyn TenantRepository>,
}

impl TenantService {
    pub fn new(repo: Arc<dyn TenantRepository>) -> Self {
        Self { repo }
    }

    pub fn from_store(store: &Store) -> Self {
        Self::new(Arc::new(SqliteTenantRepository::new(store.pool().clone())))
    }

    /// Get a tenant by ID
    pub async fn get_tenant(&self, id: Uuid) -> ServiceResult<TenantResponse> {
        let tenant = self.repo.find_by_id(id).await.map_err(ServiceError::Domain)?;
        Ok(tenant.into())
    }

    /// One page of tenants matching the filter
    pub async fn list_tenants(
        &self,
        filter: &TenantFilter,
        params: PaginationParams,
    ) -> ServiceResult<PaginatedResult<TenantResponse>> {
        let page = self
            .repo
            .find_paginated(filter, params)
            .await
            .map_err(ServiceError::Domain)?;
        Ok(page.map(Into::into))
    }

    /// Id/name pairs for the tenant dropdown on lease forms
    pub async fn tenant_summaries(&self) -> ServiceResult<Vec<TenantSummary>> {
        self.repo.find_summaries().await.map_err(ServiceError::Domain)
    }

    /// Create a new tenant
    pub async fn create_tenant(&self, tenant: NewTenant) -> ServiceResult<TenantResponse> {
        tenant.validate().map_err(ServiceError::Domain)?;

        let created = self.repo.create(&tenant).await.map_err(ServiceError::Domain)?;
        Ok(created.into())
    }

    /// Update an existing tenant
    pub async fn update_tenant(
        &self,
        id: Uuid,
        update: UpdateTenant,
    ) -> ServiceResult<TenantResponse> {
        update.validate().map_err(ServiceError::Domain)?;

        if update.is_empty_update() {
            return self.get_tenant(id).await;
        }

        let updated = self.repo.update(id, &update).await.map_err(ServiceError::Domain)?;
        Ok(updated.into())
    }

    /// Delete a tenant (refused while leases reference them)
    pub async fn delete_tenant(&self, id: Uuid) -> ServiceResult<()> {
        match self.repo.hard_delete(id).await {
            Ok(()) => Ok(()),
            Err(DomainError::DependentRecordsExist { dependencies, .. }) => {
                Err(ServiceError::DependenciesPreventDeletion(dependencies))
            }
            Err(e) => Err(ServiceError::Domain(e)),
        }
    }
}
