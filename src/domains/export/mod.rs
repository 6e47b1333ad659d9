pub mod record;
pub mod serializer;
pub mod service;
pub mod types;

pub use record::ExportRow;
pub use serializer::{serialize, serialize_with, Record, SerializerConfig, Value};
pub use service::ExportService;
pub use types::{EntityType, ExportDocument};
