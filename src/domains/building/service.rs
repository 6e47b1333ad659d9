use std::sync::Arc;

use uuid::Uuid;

use crate::database::Store;
use crate::domains::building::repository::{BuildingRepository, SqliteBuildingRepository};
use crate::domains::building::types::{
    BuildingFilter, BuildingResponse, BuildingSummary, NewBuilding, UpdateBuilding,
};
use crate::errors::{DomainError, ServiceError, ServiceResult};
use crate::types::{PaginatedResult, PaginationParams};
use crate::validation::Validate;

/// Service for building-related operations
pub struct BuildingService {
    repo: Arc<dyn BuildingRepository>,
}

impl BuildingService {
    pub fn new(repo: Arc<dyn BuildingRepository>) -> Self {
        Self { repo }
    }

    pub fn from_store(store: &Store) -> Self {
        Self::new(Arc::new(SqliteBuildingRepository::new(store.pool().clone())))
    }

    /// Get a building by ID
    pub async fn get_building(&self, id: Uuid) -> ServiceResult<BuildingResponse> {
        let building = self.repo.find_by_id(id).await.map_err(ServiceError::Domain)?;
        Ok(building.into())
    }

    /// One page of buildings matching the filter
    pub async fn list_buildings(
        &self,
        filter: &BuildingFilter,
        params: PaginationParams,
    ) -> ServiceResult<PaginatedResult<BuildingResponse>> {
        let page = self
            .repo
            .find_paginated(filter, params)
            .await
            .map_err(ServiceError::Domain)?;
        Ok(page.map(Into::into))
    }

    /// Id/name pairs for the building dropdown on property forms
    pub async fn building_summaries(&self) -> ServiceResult<Vec<BuildingSummary>> {
        self.repo.find_summaries().await.map_err(ServiceError::Domain)
    }

    /// Create a new building
    pub async fn create_building(&self, building: NewBuilding) -> ServiceResult<BuildingResponse> {
        building.validate().map_err(ServiceError::Domain)?;

        let created = self.repo.create(&building).await.map_err(ServiceError::Domain)?;
        Ok(created.into())
    }

    /// Update an existing building
    pub async fn update_building(
        &self,
        id: Uuid,
        update: UpdateBuilding,
    ) -> ServiceResult<BuildingResponse> {
        update.validate().map_err(ServiceError::Domain)?;

        if update.is_empty_update() {
            // Nothing to change, return the current state
            return self.get_building(id).await;
        }

        let updated = self.repo.update(id, &update).await.map_err(ServiceError::Domain)?;
        Ok(updated.into())
    }

    /// Delete a building (refused while properties reference it)
    pub async fn delete_building(&self, id: Uuid) -> ServiceResult<()> {
        match self.repo.hard_delete(id).await {
            Ok(()) => Ok(()),
            Err(DomainError::DependentRecordsExist { dependencies, .. }) => {
                Err(ServiceError::DependenciesPreventDeletion(dependencies))
            }
            Err(e) => Err(ServiceError::Domain(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> BuildingService {
        let store = Store::in_memory().await.unwrap();
        store.migrate().await.unwrap();
        BuildingService::from_store(&store)
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_type() {
        let service = service().await;

        let building = NewBuilding {
            name: "Résidence Les Oliviers".to_string(),
            address: "12 rue des Oliviers, 75011 Paris".to_string(),
            building_type: "Château".to_string(),
            units: None,
            year_built: None,
            status: None,
        };

        let err = service.create_building(building).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_empty_update_returns_current_state() {
        let service = service().await;

        let created = service
            .create_building(NewBuilding {
                name: "Immeuble Le Parisien".to_string(),
                address: "8 boulevard Haussmann, 75009 Paris".to_string(),
                building_type: "Commercial".to_string(),
                units: Some(6),
                year_built: Some(1930),
                status: Some("Excellent".to_string()),
            })
            .await
            .unwrap();

        let unchanged = service
            .update_building(created.id, UpdateBuilding::default())
            .await
            .unwrap();
        assert_eq!(unchanged.name, created.name);
        assert_eq!(unchanged.updated_at, created.updated_at);
    }
}
