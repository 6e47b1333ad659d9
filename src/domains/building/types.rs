use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};
use crate::validation::{Validate, ValidationBuilder};

/// Allowed building categories, as stored and displayed.
pub const BUILDING_TYPES: &[&str] = &["Résidentiel", "Commercial", "Mixte", "Historique"];

/// Allowed building condition labels.
pub const BUILDING_STATUSES: &[&str] = &["Excellent", "Bon", "Moyen", "Rénové"];

/// Core Building entity - one managed building (immeuble)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub building_type: String,
    pub units: Option<i64>,
    pub year_built: Option<i64>,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// NewBuilding DTO - used when creating a building
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBuilding {
    pub name: String,
    pub address: String,
    #[serde(rename = "type")]
    pub building_type: String,
    pub units: Option<i64>,
    pub year_built: Option<i64>,
    pub status: Option<String>,
}

impl Validate for NewBuilding {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("name", Some(self.name.clone()))
            .required()
            .min_length(2)
            .max_length(100)
            .validate()?;

        ValidationBuilder::new("address", Some(self.address.clone()))
            .required()
            .min_length(5)
            .max_length(200)
            .validate()?;

        ValidationBuilder::new("type", Some(self.building_type.clone()))
            .required()
            .one_of(BUILDING_TYPES, Some("Invalid building type"))
            .validate()?;

        if let Some(units) = self.units {
            ValidationBuilder::new("units", Some(units)).min(0).validate()?;
        }

        if let Some(year) = self.year_built {
            ValidationBuilder::new("year_built", Some(year))
                .range(1800, 2100)
                .validate()?;
        }

        if let Some(status) = &self.status {
            ValidationBuilder::new("status", Some(status.clone()))
                .one_of(BUILDING_STATUSES, Some("Invalid building status"))
                .validate()?;
        }

        Ok(())
    }
}

/// UpdateBuilding DTO - partial update of an existing building
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBuilding {
    pub name: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub building_type: Option<String>,
    pub units: Option<i64>,
    pub year_built: Option<i64>,
    pub status: Option<String>,
}

impl Validate for UpdateBuilding {
    fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.name {
            ValidationBuilder::new("name", Some(name.clone()))
                .min_length(2)
                .max_length(100)
                .validate()?;
        }

        if let Some(address) = &self.address {
            ValidationBuilder::new("address", Some(address.clone()))
                .min_length(5)
                .max_length(200)
                .validate()?;
        }

        if let Some(building_type) = &self.building_type {
            ValidationBuilder::new("type", Some(building_type.clone()))
                .one_of(BUILDING_TYPES, Some("Invalid building type"))
                .validate()?;
        }

        if let Some(units) = self.units {
            ValidationBuilder::new("units", Some(units)).min(0).validate()?;
        }

        if let Some(year) = self.year_built {
            ValidationBuilder::new("year_built", Some(year))
                .range(1800, 2100)
                .validate()?;
        }

        if let Some(status) = &self.status {
            ValidationBuilder::new("status", Some(status.clone()))
                .one_of(BUILDING_STATUSES, Some("Invalid building status"))
                .validate()?;
        }

        Ok(())
    }
}

impl UpdateBuilding {
    /// Check whether the update payload carries any field changes.
    pub fn is_empty_update(&self) -> bool {
        self.name.is_none()
            && self.address.is_none()
            && self.building_type.is_none()
            && self.units.is_none()
            && self.year_built.is_none()
            && self.status.is_none()
    }
}

/// Filter applied to building list queries
#[derive(Debug, Clone, Default)]
pub struct BuildingFilter {
    /// Matches name or address, case-insensitive substring
    pub search: Option<String>,
    pub building_type: Option<String>,
    pub status: Option<String>,
}

/// BuildingRow - SQLite row representation for mapping from database
#[derive(Debug, Clone, FromRow)]
pub struct BuildingRow {
    pub id: String,
    pub name: String,
    pub address: String,
    #[sqlx(rename = "type")]
    pub building_type: String,
    pub units: Option<i64>,
    pub year_built: Option<i64>,
    pub status: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl BuildingRow {
    /// Convert database row to domain entity
    pub fn into_entity(self) -> DomainResult<Building> {
        let parse_datetime = |s: &str| -> DomainResult<DateTime<Utc>> {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| DomainError::Internal(format!("Invalid date format: {}", s)))
        };

        Ok(Building {
            id: Uuid::parse_str(&self.id).map_err(|_| DomainError::InvalidUuid(self.id.clone()))?,
            name: self.name,
            address: self.address,
            building_type: self.building_type,
            units: self.units,
            year_built: self.year_built,
            status: self.status,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

/// BuildingResponse DTO - used for list and detail views
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingResponse {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    #[serde(rename = "type")]
    pub building_type: String,
    pub units: Option<i64>,
    pub year_built: Option<i64>,
    pub status: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Building> for BuildingResponse {
    fn from(building: Building) -> Self {
        Self {
            id: building.id,
            name: building.name,
            address: building.address,
            building_type: building.building_type,
            units: building.units,
            year_built: building.year_built,
            status: building.status,
            created_at: building.created_at.to_rfc3339(),
            updated_at: building.updated_at.to_rfc3339(),
        }
    }
}

/// Id/name pair for form dropdowns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingSummary {
    pub id: Uuid,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_building() -> NewBuilding {
        NewBuilding {
            name: "Résidence Les Oliviers".to_string(),
            address: "12 rue des Oliviers, 75011 Paris".to_string(),
            building_type: "Résidentiel".to_string(),
            units: Some(24),
            year_built: Some(1985),
            status: Some("Bon".to_string()),
        }
    }

    #[test]
    fn test_new_building_validation() {
        assert!(valid_building().validate().is_ok());

        let mut building = valid_building();
        building.name = "X".to_string();
        assert!(building.validate().is_err());

        let mut building = valid_building();
        building.building_type = "Loft".to_string();
        assert!(building.validate().is_err());

        let mut building = valid_building();
        building.year_built = Some(1500);
        assert!(building.validate().is_err());
    }

    #[test]
    fn test_empty_update_detection() {
        assert!(UpdateBuilding::default().is_empty_update());

        let update = UpdateBuilding {
            name: Some("Le Parisien".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty_update());
    }
}
