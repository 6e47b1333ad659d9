pub mod repository;
pub mod service;
pub mod types;

pub use repository::{SqliteTenantRepository, TenantRepository};
pub use service::TenantService;
