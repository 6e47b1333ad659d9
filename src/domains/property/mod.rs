pub mod repository;
pub mod service;
pub mod types;

pub use repository::{PropertyRepository, SqlitePropertyRepository};
pub use service::PropertyService;
