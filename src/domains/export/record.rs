//! Conversion of domain rows into serializer [`Record`]s.
//!
//! Field order here defines the export column order, matching the stored
//! column order of each table; joined relations ride along as nested objects
//! under the relation's table name, the shape list views already consume.

use serde_json::json;

use crate::domains::building::types::Building;
use crate::domains::export::serializer::{Record, Value};
use crate::domains::lease::types::LeaseWithRelations;
use crate::domains::property::types::PropertyWithBuilding;
use crate::domains::tenant::types::Tenant;

/// Trait for rows that can be exported as delimited text
pub trait ExportRow {
    /// Column names for this row type, in export order
    fn columns() -> Vec<&'static str>;

    /// Convert to a serializer record
    fn to_record(&self) -> Record;
}

impl ExportRow for Building {
    fn columns() -> Vec<&'static str> {
        vec![
            "id",
            "name",
            "address",
            "type",
            "units",
            "year_built",
            "status",
            "created_at",
            "updated_at",
        ]
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with_field("id", self.id)
            .with_field("name", self.name.clone())
            .with_field("address", self.address.clone())
            .with_field("type", self.building_type.clone())
            .with_field("units", self.units)
            .with_field("year_built", self.year_built)
            .with_field("status", self.status.clone())
            .with_field("created_at", self.created_at)
            .with_field("updated_at", self.updated_at)
    }
}

impl ExportRow for Tenant {
    fn columns() -> Vec<&'static str> {
        vec!["id", "name", "email", "phone", "created_at", "updated_at"]
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with_field("id", self.id)
            .with_field("name", self.name.clone())
            .with_field("email", self.email.clone())
            .with_field("phone", self.phone.clone())
            .with_field("created_at", self.created_at)
            .with_field("updated_at", self.updated_at)
    }
}

impl ExportRow for PropertyWithBuilding {
    fn columns() -> Vec<&'static str> {
        vec![
            "id",
            "ref",
            "type",
            "building_id",
            "surface",
            "rooms",
            "floor",
            "rent",
            "charges",
            "deposit",
            "description",
            "status",
            "created_at",
            "updated_at",
            "buildings",
        ]
    }

    fn to_record(&self) -> Record {
        let property = &self.property;
        let buildings = match &self.building_name {
            Some(name) => Value::Nested(json!({ "name": name })),
            None => Value::Null,
        };

        Record::new()
            .with_field("id", property.id)
            .with_field("ref", property.reference.clone())
            .with_field("type", property.property_type.clone())
            .with_field("building_id", property.building_id)
            .with_field("surface", property.surface)
            .with_field("rooms", property.rooms)
            .with_field("floor", property.floor)
            .with_field("rent", property.rent)
            .with_field("charges", property.charges)
            .with_field("deposit", property.deposit)
            .with_field("description", property.description.clone())
            .with_field("status", property.status.clone())
            .with_field("created_at", property.created_at)
            .with_field("updated_at", property.updated_at)
            .with_field("buildings", buildings)
    }
}

impl ExportRow for LeaseWithRelations {
    fn columns() -> Vec<&'static str> {
        vec![
            "id",
            "ref",
            "tenant_id",
            "property_id",
            "start_date",
            "end_date",
            "rent",
            "charges",
            "deposit",
            "payment_day",
            "payment_method",
            "status",
            "created_at",
            "updated_at",
            "tenants",
            "properties",
        ]
    }

    fn to_record(&self) -> Record {
        let lease = &self.lease;

        let tenants = match &self.tenant_name {
            Some(name) => Value::Nested(json!({ "name": name })),
            None => Value::Null,
        };

        // The property relation carries its own building relation, nested a
        // second level like the source query shape
        let properties = match &self.property_ref {
            Some(reference) => Value::Nested(json!({
                "ref": reference,
                "buildings": self
                    .building_name
                    .as_ref()
                    .map(|name| json!({ "name": name }))
                    .unwrap_or(serde_json::Value::Null),
            })),
            None => Value::Null,
        };

        Record::new()
            .with_field("id", lease.id)
            .with_field("ref", lease.reference.clone())
            .with_field("tenant_id", lease.tenant_id)
            .with_field("property_id", lease.property_id)
            .with_field("start_date", lease.start_date)
            .with_field("end_date", lease.end_date)
            .with_field("rent", lease.rent)
            .with_field("charges", lease.charges)
            .with_field("deposit", lease.deposit)
            .with_field("payment_day", lease.payment_day)
            .with_field("payment_method", lease.payment_method.clone())
            .with_field("status", lease.status.clone())
            .with_field("created_at", lease.created_at)
            .with_field("updated_at", lease.updated_at)
            .with_field("tenants", tenants)
            .with_field("properties", properties)
    }
}
