pub mod repository;
pub mod service;
pub mod types;

pub use repository::{LeaseRepository, SqliteLeaseRepository};
pub use service::LeaseService;
