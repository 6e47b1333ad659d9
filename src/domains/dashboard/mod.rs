pub mod repository;
pub mod service;
pub mod types;

pub use repository::{DashboardRepository, SqliteDashboardRepository};
pub use service::DashboardService;
