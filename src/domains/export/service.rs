use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::database::Store;
use crate::domains::building::repository::{BuildingRepository, SqliteBuildingRepository};
use crate::domains::building::types::BuildingFilter;
use crate::domains::export::record::ExportRow;
use crate::domains::export::serializer::{serialize, Record};
use crate::domains::export::types::{EntityType, ExportDocument, CSV_CONTENT_TYPE};
use crate::domains::lease::repository::{LeaseRepository, SqliteLeaseRepository};
use crate::domains::lease::types::LeaseFilter;
use crate::domains::property::repository::{PropertyRepository, SqlitePropertyRepository};
use crate::domains::property::types::PropertyFilter;
use crate::domains::tenant::repository::{SqliteTenantRepository, TenantRepository};
use crate::domains::tenant::types::TenantFilter;
use crate::errors::{DomainError, ServiceError, ServiceResult, ValidationError};

/// Service producing delimited-text exports of the four entity types.
///
/// The entity type is validated before anything is fetched; an upstream query
/// failure aborts the export with no partial document.
pub struct ExportService {
    building_repo: Arc<dyn BuildingRepository>,
    property_repo: Arc<dyn PropertyRepository>,
    tenant_repo: Arc<dyn TenantRepository>,
    lease_repo: Arc<dyn LeaseRepository>,
}

impl ExportService {
    pub fn new(
        building_repo: Arc<dyn BuildingRepository>,
        property_repo: Arc<dyn PropertyRepository>,
        tenant_repo: Arc<dyn TenantRepository>,
        lease_repo: Arc<dyn LeaseRepository>,
    ) -> Self {
        Self {
            building_repo,
            property_repo,
            tenant_repo,
            lease_repo,
        }
    }

    pub fn from_store(store: &Store) -> Self {
        Self::new(
            Arc::new(SqliteBuildingRepository::new(store.pool().clone())),
            Arc::new(SqlitePropertyRepository::new(store.pool().clone())),
            Arc::new(SqliteTenantRepository::new(store.pool().clone())),
            Arc::new(SqliteLeaseRepository::new(store.pool().clone())),
        )
    }

    /// Export the requested entity type, dating the filename with today's
    /// calendar date.
    pub async fn export(&self, entity_type: &str) -> ServiceResult<ExportDocument> {
        self.export_for_date(entity_type, Utc::now().date_naive()).await
    }

    /// Export the requested entity type with an explicit filename date.
    pub async fn export_for_date(
        &self,
        entity_type: &str,
        date: NaiveDate,
    ) -> ServiceResult<ExportDocument> {
        let entity = EntityType::from_str(entity_type).ok_or_else(|| {
            ServiceError::Domain(DomainError::Validation(ValidationError::invalid_value(
                "type",
                "must be one of buildings, properties, tenants, leases",
            )))
        })?;

        let records = self.fetch_records(entity).await.map_err(|e| {
            log::error!("export query failed for {}: {}", entity.as_str(), e);
            ServiceError::Domain(e)
        })?;

        let body = serialize(&records);
        let filename = format!("{}_export_{}.csv", entity.as_str(), date.format("%Y-%m-%d"));

        log::info!("exported {} records of {}", records.len(), entity.as_str());

        Ok(ExportDocument {
            entity_type: entity,
            content_disposition: format!("attachment; filename={}", filename),
            filename,
            content_type: CSV_CONTENT_TYPE,
            body,
        })
    }

    async fn fetch_records(&self, entity: EntityType) -> Result<Vec<Record>, DomainError> {
        let records = match entity {
            EntityType::Buildings => self
                .building_repo
                .find_all(&BuildingFilter::default())
                .await?
                .iter()
                .map(ExportRow::to_record)
                .collect(),
            EntityType::Properties => self
                .property_repo
                .find_all_with_building(&PropertyFilter::default())
                .await?
                .iter()
                .map(ExportRow::to_record)
                .collect(),
            EntityType::Tenants => self
                .tenant_repo
                .find_all(&TenantFilter::default())
                .await?
                .iter()
                .map(ExportRow::to_record)
                .collect(),
            EntityType::Leases => self
                .lease_repo
                .find_all_with_relations(&LeaseFilter::default())
                .await?
                .iter()
                .map(ExportRow::to_record)
                .collect(),
        };

        Ok(records)
    }
}
