use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Entity counts shown as the dashboard tiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub buildings: i64,
    pub properties: i64,
    pub tenants: i64,
    pub active_leases: i64,
    pub vacant_properties: i64,
}

impl DashboardStats {
    /// Share of properties currently occupied, in percent.
    pub fn occupancy_rate(&self) -> f64 {
        if self.properties == 0 {
            return 0.0;
        }
        let occupied = (self.properties - self.vacant_properties) as f64;
        occupied / self.properties as f64 * 100.0
    }
}

/// One entry of the recent-activity feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub activity_type: String,
    pub description: String,
    pub date: NaiveDate,
}
