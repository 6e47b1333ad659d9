use serde::{Deserialize, Serialize};

/// The fixed set of exportable entity types, selected by the caller through
/// a query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Buildings,
    Properties,
    Tenants,
    Leases,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Buildings => "buildings",
            EntityType::Properties => "properties",
            EntityType::Tenants => "tenants",
            EntityType::Leases => "leases",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "buildings" => Some(EntityType::Buildings),
            "properties" => Some(EntityType::Properties),
            "tenants" => Some(EntityType::Tenants),
            "leases" => Some(EntityType::Leases),
            _ => None,
        }
    }
}

/// Media type of the produced document.
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// A finished export, ready for the HTTP layer to stream as a download.
/// Transport (writing headers, sending the body) is entirely the caller's
/// concern.
#[derive(Debug, Clone, Serialize)]
pub struct ExportDocument {
    pub entity_type: EntityType,
    pub filename: String,
    pub content_type: &'static str,
    pub content_disposition: String,
    pub body: String,
}
