use std::sync::Arc;

use uuid::Uuid;

use crate::database::Store;
use crate::domains::property::repository::{PropertyRepository, SqlitePropertyRepository};
use crate::domains::property::types::{
    NewProperty, PropertyFilter, PropertyResponse, PropertySummary, UpdateProperty,
};
use crate::errors::{DomainError, ServiceError, ServiceResult};
use crate::types::{PaginatedResult, PaginationParams};
use crate::validation::Validate;

/// Service for property-related operations
pub struct PropertyService {
    repo: Arc<dyn PropertyRepository>,
}

impl PropertyService {
    pub fn new(repo: Arc<dyn PropertyRepository>) -> Self {
        Self { repo }
    }

    pub fn from_store(store: &Store) -> Self {
        Self::new(Arc::new(SqlitePropertyRepository::new(store.pool().clone())))
    }

    /// Get a property by ID, building name resolved
    pub async fn get_property(&self, id: Uuid) -> ServiceResult<PropertyResponse> {
        let joined = self
            .repo
            .find_with_building(id)
            .await
            .map_err(ServiceError::Domain)?;
        Ok(joined.into())
    }

    /// One page of properties matching the filter
    pub async fn list_properties(
        &self,
        filter: &PropertyFilter,
        params: PaginationParams,
    ) -> ServiceResult<PaginatedResult<PropertyResponse>> {
        let page = self
            .repo
            .find_paginated(filter, params)
            .await
            .map_err(ServiceError::Domain)?;
        Ok(page.map(Into::into))
    }

    /// Id/ref pairs for the property dropdown on lease forms
    pub async fn property_summaries(&self) -> ServiceResult<Vec<PropertySummary>> {
        self.repo.find_summaries().await.map_err(ServiceError::Domain)
    }

    /// Create a new property
    pub async fn create_property(&self, property: NewProperty) -> ServiceResult<PropertyResponse> {
        property.validate().map_err(ServiceError::Domain)?;

        let created = self.repo.create(&property).await.map_err(ServiceError::Domain)?;
        self.get_property(created.id).await
    }

    /// Update an existing property
    pub async fn update_property(
        &self,
        id: Uuid,
        update: UpdateProperty,
    ) -> ServiceResult<PropertyResponse> {
        update.validate().map_err(ServiceError::Domain)?;

        if update.is_empty_update() {
            return self.get_property(id).await;
        }

        let updated = self.repo.update(id, &update).await.map_err(ServiceError::Domain)?;
        self.get_property(updated.id).await
    }

    /// Delete a property (refused while leases reference it)
    pub async fn delete_property(&self, id: Uuid) -> ServiceResult<()> {
        match self.repo.hard_delete(id).await {
            Ok(()) => Ok(()),
            Err(DomainError::DependentRecordsExist { dependencies, .. }) => {
                Err(ServiceError::DependenciesPreventDeletion(dependencies))
            }
            Err(e) => Err(ServiceError::Domain(e)),
        }
    }
}
