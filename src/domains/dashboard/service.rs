use std::sync::Arc;

use crate::database::Store;
use crate::domains::dashboard::repository::{DashboardRepository, SqliteDashboardRepository};
use crate::domains::dashboard::types::{Activity, DashboardStats};
use crate::domains::lease::repository::{LeaseRepository, SqliteLeaseRepository};
use crate::domains::lease::types::{LeaseWithRelations, LEASE_STATUS_NOTICE};
use crate::errors::{ServiceError, ServiceResult};

const RECENT_ACTIVITY_LIMIT: u32 = 5;

/// Service assembling the dashboard: tile counts plus a feed derived from
/// the most recent leases.
pub struct DashboardService {
    dashboard_repo: Arc<dyn DashboardRepository>,
    lease_repo: Arc<dyn LeaseRepository>,
}

impl DashboardService {
    pub fn new(
        dashboard_repo: Arc<dyn DashboardRepository>,
        lease_repo: Arc<dyn LeaseRepository>,
    ) -> Self {
        Self {
            dashboard_repo,
            lease_repo,
        }
    }

    pub fn from_store(store: &Store) -> Self {
        Self::new(
            Arc::new(SqliteDashboardRepository::new(store.pool().clone())),
            Arc::new(SqliteLeaseRepository::new(store.pool().clone())),
        )
    }

    /// Entity counts for the dashboard tiles
    pub async fn stats(&self) -> ServiceResult<DashboardStats> {
        self.dashboard_repo.stats().await.map_err(ServiceError::Domain)
    }

    /// Recent activity derived from the latest leases
    pub async fn recent_activities(&self) -> ServiceResult<Vec<Activity>> {
        let recent = self
            .lease_repo
            .find_recent(RECENT_ACTIVITY_LIMIT)
            .await
            .map_err(ServiceError::Domain)?;

        Ok(recent.into_iter().map(activity_from_lease).collect())
    }
}

fn activity_from_lease(joined: LeaseWithRelations) -> Activity {
    let tenant = joined.tenant_name.as_deref().unwrap_or("-");
    let property = joined.property_ref.as_deref().unwrap_or("-");

    if joined.lease.status == LEASE_STATUS_NOTICE {
        Activity {
            activity_type: "Préavis".to_string(),
            description: format!("{} a donné son préavis pour {}", tenant, property),
            date: joined.lease.start_date,
        }
    } else {
        Activity {
            activity_type: "Nouveau bail".to_string(),
            description: format!("{} a signé un bail pour {}", tenant, property),
            date: joined.lease.start_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::building::repository::{BuildingRepository, SqliteBuildingRepository};
    use crate::domains::building::types::NewBuilding;
    use crate::domains::lease::repository::SqliteLeaseRepository;
    use crate::domains::lease::types::NewLease;
    use crate::domains::property::repository::{PropertyRepository, SqlitePropertyRepository};
    use crate::domains::property::types::NewProperty;
    use crate::domains::tenant::repository::{SqliteTenantRepository, TenantRepository};
    use crate::domains::tenant::types::NewTenant;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    async fn seeded_store() -> Store {
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

        let properties = SqlitePropertyRepository::new(store.pool().clone());
        let occupied = properties
            .create(&NewProperty {
                reference: "APT-A101".to_string(),
                property_type: "Appartement".to_string(),
                building_id: building.id,
                surface: Some(45.5),
                rooms: Some(2),
                floor: Some(1),
                rent: dec!(850.00),
                charges: None,
                deposit: None,
                description: None,
                status: "Occupé".to_string(),
            })
            .await
            .unwrap();
        properties
            .create(&NewProperty {
                reference: "APT-A102".to_string(),
                property_type: "Appartement".to_string(),
                building_id: building.id,
                surface: Some(30.0),
                rooms: Some(1),
                floor: Some(1),
                rent: dec!(650.00),
                charges: None,
                deposit: None,
                description: None,
                status: "Vacant".to_string(),
            })
            .await
            .unwrap();

        let tenant = SqliteTenantRepository::new(store.pool().clone())
            .create(&NewTenant {
                name: "Jean Dupont".to_string(),
                email: "jean.dupont@example.com".to_string(),
                phone: None,
            })
            .await
            .unwrap();

        SqliteLeaseRepository::new(store.pool().clone())
            .create(&NewLease {
                reference: "BAIL-2025-001".to_string(),
                tenant_id: tenant.id,
                property_id: occupied.id,
                start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                rent: dec!(850.00),
                charges: None,
                deposit: None,
                payment_day: 5,
                payment_method: None,
                status: "Actif".to_string(),
            })
            .await
            .unwrap();

        store
    }

    #[tokio::test]
    async fn test_stats_match_seeded_data() {
        let store = seeded_store().await;
        let service = DashboardService::from_store(&store);

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.buildings, 1);
        assert_eq!(stats.properties, 2);
        assert_eq!(stats.tenants, 1);
        assert_eq!(stats.active_leases, 1);
        assert_eq!(stats.vacant_properties, 1);
        assert!((stats.occupancy_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_recent_activities_feed() {
        let store = seeded_store().await;
        let service = DashboardService::from_store(&store);

        let activities = service.recent_activities().await.unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].activity_type, "Nouveau bail");
        assert_eq!(
            activities[0].description,
            "Jean Dupont a signé un bail pour APT-A101"
        );
    }
}
