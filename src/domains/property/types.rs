use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};
use crate::validation::{common, Validate, ValidationBuilder};

/// Allowed property categories.
pub const PROPERTY_TYPES: &[&str] = &["Appartement", "Maison", "Parking"];

/// Allowed occupancy states.
pub const PROPERTY_STATUSES: &[&str] = &["Occupé", "Vacant", "Préavis"];

pub const PROPERTY_STATUS_OCCUPIED: &str = "Occupé";
pub const PROPERTY_STATUS_VACANT: &str = "Vacant";

/// Core Property entity - one rentable unit (bien)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    #[serde(rename = "ref")]
    pub reference: String,
    pub property_type: String,
    pub building_id: Uuid,
    pub surface: Option<f64>,
    pub rooms: Option<i64>,
    pub floor: Option<i64>,
    pub rent: Decimal,
    pub charges: Option<Decimal>,
    pub deposit: Option<Decimal>,
    pub description: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A property together with its building's name, as list views and exports
/// consume it (the join is resolved by the repository).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyWithBuilding {
    #[serde(flatten)]
    pub property: Property,
    pub building_name: Option<String>,
}

/// NewProperty DTO - used when creating a property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProperty {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "type")]
    pub property_type: String,
    pub building_id: Uuid,
    pub surface: Option<f64>,
    pub rooms: Option<i64>,
    pub floor: Option<i64>,
    pub rent: Decimal,
    pub charges: Option<Decimal>,
    pub deposit: Option<Decimal>,
    pub description: Option<String>,
    pub status: String,
}

impl Validate for NewProperty {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("ref", Some(self.reference.clone()))
            .required()
            .min_length(2)
            .max_length(20)
            .validate()?;

        ValidationBuilder::new("type", Some(self.property_type.clone()))
            .required()
            .one_of(PROPERTY_TYPES, Some("Invalid property type"))
            .validate()?;

        if let Some(surface) = self.surface {
            ValidationBuilder::new("surface", Some(surface)).min(1.0).validate()?;
        }

        if let Some(rooms) = self.rooms {
            ValidationBuilder::new("rooms", Some(rooms)).range(0, 50).validate()?;
        }

        common::validate_amount(&self.rent, "rent")?;
        if let Some(charges) = &self.charges {
            common::validate_amount(charges, "charges")?;
        }
        if let Some(deposit) = &self.deposit {
            common::validate_amount(deposit, "deposit")?;
        }

        ValidationBuilder::new("status", Some(self.status.clone()))
            .required()
            .one_of(PROPERTY_STATUSES, Some("Invalid property status"))
            .validate()?;

        Ok(())
    }
}

/// UpdateProperty DTO - partial update of an existing property
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProperty {
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    #[serde(rename = "type")]
    pub property_type: Option<String>,
    pub building_id: Option<Uuid>,
    pub surface: Option<f64>,
    pub rooms: Option<i64>,
    pub floor: Option<i64>,
    pub rent: Option<Decimal>,
    pub charges: Option<Decimal>,
    pub deposit: Option<Decimal>,
    pub description: Option<String>,
    pub status: Option<String>,
}

impl Validate for UpdateProperty {
    fn validate(&self) -> DomainResult<()> {
        if let Some(reference) = &self.reference {
            ValidationBuilder::new("ref", Some(reference.clone()))
                .min_length(2)
                .max_length(20)
                .validate()?;
        }

        if let Some(property_type) = &self.property_type {
            ValidationBuilder::new("type", Some(property_type.clone()))
                .one_of(PROPERTY_TYPES, Some("Invalid property type"))
                .validate()?;
        }

        if let Some(surface) = self.surface {
            ValidationBuilder::new("surface", Some(surface)).min(1.0).validate()?;
        }

        if let Some(rooms) = self.rooms {
            ValidationBuilder::new("rooms", Some(rooms)).range(0, 50).validate()?;
        }

        if let Some(rent) = &self.rent {
            common::validate_amount(rent, "rent")?;
        }
        if let Some(charges) = &self.charges {
            common::validate_amount(charges, "charges")?;
        }
        if let Some(deposit) = &self.deposit {
            common::validate_amount(deposit, "deposit")?;
        }

        if let Some(status) = &self.status {
            ValidationBuilder::new("status", Some(status.clone()))
                .one_of(PROPERTY_STATUSES, Some("Invalid property status"))
                .validate()?;
        }

        Ok(())
    }
}

impl UpdateProperty {
    pub fn is_empty_update(&self) -> bool {
        self.reference.is_none()
            && self.property_type.is_none()
            && self.building_id.is_none()
            && self.surface.is_none()
            && self.rooms.is_none()
            && self.floor.is_none()
            && self.rent.is_none()
            && self.charges.is_none()
            && self.deposit.is_none()
            && self.description.is_none()
            && self.status.is_none()
    }
}

/// Filter applied to property list queries
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    /// Matches ref or description, case-insensitive substring
    pub search: Option<String>,
    pub property_type: Option<String>,
    pub status: Option<String>,
    pub building_id: Option<Uuid>,
}

fn parse_datetime(s: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DomainError::Internal(format!("Invalid date format: {}", s)))
}

fn parse_decimal(s: &str, field: &str) -> DomainResult<Decimal> {
    s.parse::<Decimal>()
        .map_err(|_| DomainError::Internal(format!("Invalid decimal for {}: {}", field, s)))
}

fn parse_optional_decimal(s: &Option<String>, field: &str) -> DomainResult<Option<Decimal>> {
    match s {
        Some(raw) => parse_decimal(raw, field).map(Some),
        None => Ok(None),
    }
}

/// PropertyRow - SQLite row representation for mapping from database
#[derive(Debug, Clone, FromRow)]
pub struct PropertyRow {
    pub id: String,
    #[sqlx(rename = "ref")]
    pub reference: String,
    #[sqlx(rename = "type")]
    pub property_type: String,
    pub building_id: String,
    pub surface: Option<f64>,
    pub rooms: Option<i64>,
    pub floor: Option<i64>,
    pub rent: String,
    pub charges: Option<String>,
    pub deposit: Option<String>,
    pub description: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl PropertyRow {
    /// Convert database row to domain entity
    pub fn into_entity(self) -> DomainResult<Property> {
        Ok(Property {
            id: Uuid::parse_str(&self.id).map_err(|_| DomainError::InvalidUuid(self.id.clone()))?,
            reference: self.reference,
            property_type: self.property_type,
            building_id: Uuid::parse_str(&self.building_id)
                .map_err(|_| DomainError::InvalidUuid(self.building_id.clone()))?,
            surface: self.surface,
            rooms: self.rooms,
            floor: self.floor,
            rent: parse_decimal(&self.rent, "rent")?,
            charges: parse_optional_decimal(&self.charges, "charges")?,
            deposit: parse_optional_decimal(&self.deposit, "deposit")?,
            description: self.description,
            status: self.status,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

/// Property row joined with its building's name
#[derive(Debug, Clone, FromRow)]
pub struct PropertyWithBuildingRow {
    #[sqlx(flatten)]
    pub property: PropertyRow,
    pub building_name: Option<String>,
}

impl PropertyWithBuildingRow {
    pub fn into_entity(self) -> DomainResult<PropertyWithBuilding> {
        Ok(PropertyWithBuilding {
            property: self.property.into_entity()?,
            building_name: self.building_name,
        })
    }
}

/// PropertyResponse DTO - list/detail view including the building name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyResponse {
    pub id: Uuid,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "type")]
    pub property_type: String,
    pub building_id: Uuid,
    pub building_name: Option<String>,
    pub surface: Option<f64>,
    pub rooms: Option<i64>,
    pub floor: Option<i64>,
    pub rent: Decimal,
    pub charges: Option<Decimal>,
    pub deposit: Option<Decimal>,
    pub description: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PropertyWithBuilding> for PropertyResponse {
    fn from(joined: PropertyWithBuilding) -> Self {
        let property = joined.property;
        Self {
            id: property.id,
            reference: property.reference,
            property_type: property.property_type,
            building_id: property.building_id,
            building_name: joined.building_name,
            surface: property.surface,
            rooms: property.rooms,
            floor: property.floor,
            rent: property.rent,
            charges: property.charges,
            deposit: property.deposit,
            description: property.description,
            status: property.status,
            created_at: property.created_at.to_rfc3339(),
            updated_at: property.updated_at.to_rfc3339(),
        }
    }
}

/// Id/ref pair for the property dropdown on lease forms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySummary {
    pub id: Uuid,
    #[serde(rename = "ref")]
    pub reference: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn valid_property() -> NewProperty {
        NewProperty {
            reference: "APT-A101".to_string(),
            property_type: "Appartement".to_string(),
            building_id: Uuid::new_v4(),
            surface: Some(45.5),
            rooms: Some(2),
            floor: Some(1),
            rent: dec!(850.00),
            charges: Some(dec!(120.00)),
            deposit: Some(dec!(850.00)),
            description: None,
            status: "Vacant".to_string(),
        }
    }

    #[test]
    fn test_new_property_validation() {
        assert!(valid_property().validate().is_ok());

        let mut property = valid_property();
        property.property_type = "Bureau".to_string();
        assert!(property.validate().is_err());

        let mut property = valid_property();
        property.rent = dec!(-10);
        assert!(property.validate().is_err());

        let mut property = valid_property();
        property.status = "Libre".to_string();
        assert!(property.validate().is_err());
    }
}
