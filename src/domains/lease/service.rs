use std::sync::Arc;

use uuid::Uuid;

use crate::database::Store;
use crate::domains::lease::repository::{LeaseRepository, SqliteLeaseRepository};
use crate::domains::lease::types::{LeaseFilter, LeaseResponse, NewLease, UpdateLease};
use crate::errors::{ServiceError, ServiceResult};
use crate::types::{PaginatedResult, PaginationParams};
use crate::validation::Validate;

/// Service for lease-related operations
pub struct LeaseService {
    repo: Arc<dyn LeaseRepository>,
}

impl LeaseService {
    pub fn new(repo: Arc<dyn LeaseRepository>) -> Self {
        Self { repo }
    }

    pub fn from_store(store: &Store) -> Self {
        Self::new(Arc::new(SqliteLeaseRepository::new(store.pool().clone())))
    }

    /// Get a lease by ID with related names resolved
    pub async fn get_lease(&self, id: Uuid) -> ServiceResult<LeaseResponse> {
        let joined = self
            .repo
            .find_with_relations(id)
            .await
            .map_err(ServiceError::Domain)?;
        Ok(joined.into())
    }

    /// One page of leases matching the filter
    pub async fn list_leases(
        &self,
        filter: &LeaseFilter,
        params: PaginationParams,
    ) -> ServiceResult<PaginatedResult<LeaseResponse>> {
        let page = self
            .repo
            .find_paginated(filter, params)
            .await
            .map_err(ServiceError::Domain)?;
        Ok(page.map(Into::into))
    }

    /// Create a new lease
    pub async fn create_lease(&self, lease: NewLease) -> ServiceResult<LeaseResponse> {
        lease.validate().map_err(ServiceError::Domain)?;

        let created = self.repo.create(&lease).await.map_err(ServiceError::Domain)?;
        self.get_lease(created.id).await
    }

    /// Update an existing lease
    pub async fn update_lease(&self, id: Uuid, update: UpdateLease) -> ServiceResult<LeaseResponse> {
        update.validate().map_err(ServiceError::Domain)?;

        if update.is_empty_update() {
            return self.get_lease(id).await;
        }

        let updated = self.repo.update(id, &update).await.map_err(ServiceError::Domain)?;
        self.get_lease(updated.id).await
    }

    /// Delete a lease
    pub async fn delete_lease(&self, id: Uuid) -> ServiceResult<()> {
        self.repo.hard_delete(id).await.map_err(ServiceError::Domain)
    }
}
