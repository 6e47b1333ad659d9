pub mod repository;
pub mod service;
pub mod types;

pub use repository::{BuildingRepository, SqliteBuildingRepository};
pub use service::BuildingService;
