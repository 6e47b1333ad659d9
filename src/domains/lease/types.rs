use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult, ValidationError};
use crate::validation::{common, Validate, ValidationBuilder};

/// Lease lifecycle states.
pub const LEASE_STATUSES: &[&str] = &["Actif", "Préavis", "Archivé"];

pub const LEASE_STATUS_ACTIVE: &str = "Actif";
pub const LEASE_STATUS_NOTICE: &str = "Préavis";

/// Accepted rent payment methods.
pub const PAYMENT_METHODS: &[&str] = &[
    "Virement bancaire",
    "Prélèvement automatique",
    "Chèque",
    "Espèces",
];

/// Core Lease entity (bail)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lease {
    pub id: Uuid,
    #[serde(rename = "ref")]
    pub reference: String,
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rent: Decimal,
    pub charges: Option<Decimal>,
    pub deposit: Option<Decimal>,
    pub payment_day: i64,
    pub payment_method: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A lease with the names its list view needs: tenant name, property ref and
/// the property's building name (two joins, resolved by the repository).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseWithRelations {
    #[serde(flatten)]
    pub lease: Lease,
    pub tenant_name: Option<String>,
    pub property_ref: Option<String>,
    pub building_name: Option<String>,
}

/// NewLease DTO - used when creating a lease
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLease {
    #[serde(rename = "ref")]
    pub reference: String,
    pub tenant_id: Uuid,
    pub property_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rent: Decimal,
    pub charges: Option<Decimal>,
    pub deposit: Option<Decimal>,
    pub payment_day: i64,
    pub payment_method: Option<String>,
    pub status: String,
}

impl Validate for NewLease {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("ref", Some(self.reference.clone()))
            .required()
            .min_length(2)
            .max_length(20)
            .validate()?;

        if self.end_date <= self.start_date {
            return Err(DomainError::Validation(ValidationError::invalid_value(
                "end_date",
                "must be after start_date",
            )));
        }

        common::validate_amount(&self.rent, "rent")?;
        if let Some(charges) = &self.charges {
            common::validate_amount(charges, "charges")?;
        }
        if let Some(deposit) = &self.deposit {
            common::validate_amount(deposit, "deposit")?;
        }

        common::validate_payment_day(self.payment_day)?;

        if let Some(method) = &self.payment_method {
            ValidationBuilder::new("payment_method", Some(method.clone()))
                .one_of(PAYMENT_METHODS, Some("Invalid payment method"))
                .validate()?;
        }

        ValidationBuilder::new("status", Some(self.status.clone()))
            .required()
            .one_of(LEASE_STATUSES, Some("Invalid lease status"))
            .validate()?;

        Ok(())
    }
}

/// UpdateLease DTO - partial update of an existing lease
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateLease {
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub rent: Option<Decimal>,
    pub charges: Option<Decimal>,
    pub deposit: Option<Decimal>,
    pub payment_day: Option<i64>,
    pub payment_method: Option<String>,
    pub status: Option<String>,
}

impl Validate for UpdateLease {
    fn validate(&self) -> DomainResult<()> {
        if let Some(reference) = &self.reference {
            ValidationBuilder::new("ref", Some(reference.clone()))
                .min_length(2)
                .max_length(20)
                .validate()?;
        }

        // Cross-field date ordering is rechecked against the stored lease by
        // the repository; here we can only check when both ends are present.
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end <= start {
                return Err(DomainError::Validation(ValidationError::invalid_value(
                    "end_date",
                    "must be after start_date",
                )));
            }
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

        if let Some(day) = self.payment_day {
            common::validate_payment_day(day)?;
        }

        if let Some(method) = &self.payment_method {
            ValidationBuilder::new("payment_method", Some(method.clone()))
                .one_of(PAYMENT_METHODS, Some("Invalid payment method"))
                .validate()?;
        }

        if let Some(status) = &self.status {
            ValidationBuilder::new("status", Some(status.clone()))
                .one_of(LEASE_STATUSES, Some("Invalid lease status"))
                .validate()?;
        }

        Ok(())
    }
}

impl UpdateLease {
    pub fn is_empty_update(&self) -> bool {
        self.reference.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.rent.is_none()
            && self.charges.is_none()
            && self.deposit.is_none()
            && self.payment_day.is_none()
            && self.payment_method.is_none()
            && self.status.is_none()
    }
}

/// Filter applied to lease list queries
#[derive(Debug, Clone, Default)]
pub struct LeaseFilter {
    /// Matches the lease ref, case-insensitive substring
    pub search: Option<String>,
    pub status: Option<String>,
    pub tenant_id: Option<Uuid>,
    pub property_id: Option<Uuid>,
}

fn parse_datetime(s: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DomainError::Internal(format!("Invalid date format: {}", s)))
}

fn parse_date(s: &str, field: &str) -> DomainResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| DomainError::Internal(format!("Invalid date for {}: {}", field, s)))
}

fn parse_decimal(s: &str, field: &str) -> DomainResult<Decimal> {
    s.parse::<Decimal>()
        .map_err(|_| DomainError::Internal(format!("Invalid decimal for {}: {}", field, s)))
}

/// LeaseRow - SQLite row representation for mapping from database
#[derive(Debug, Clone, FromRow)]
pub struct LeaseRow {
    pub id: String,
    #[sqlx(rename = "ref")]
    pub reference: String,
    pub tenant_id: String,
    pub property_id: String,
    pub start_date: String,
    pub end_date: String,
    pub rent: String,
    pub charges: Option<String>,
    pub deposit: Option<String>,
    pub payment_day: i64,
    pub payment_method: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl LeaseRow {
    /// Convert database row to domain entity
    pub fn into_entity(self) -> DomainResult<Lease> {
        Ok(Lease {
            id: Uuid::parse_str(&self.id).map_err(|_| DomainError::InvalidUuid(self.id.clone()))?,
            reference: self.reference,
            tenant_id: Uuid::parse_str(&self.tenant_id)
                .map_err(|_| DomainError::InvalidUuid(self.tenant_id.clone()))?,
            property_id: Uuid::parse_str(&self.property_id)
                .map_err(|_| DomainError::InvalidUuid(self.property_id.clone()))?,
            start_date: parse_date(&self.start_date, "start_date")?,
            end_date: parse_date(&self.end_date, "end_date")?,
            rent: parse_decimal(&self.rent, "rent")?,
            charges: self
                .charges
                .as_deref()
                .map(|raw| parse_decimal(raw, "charges"))
                .transpose()?,
            deposit: self
                .deposit
                .as_deref()
                .map(|raw| parse_decimal(raw, "deposit"))
                .transpose()?,
            payment_day: self.payment_day,
            payment_method: self.payment_method,
            status: self.status,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

/// Lease row joined with tenant name, property ref and building name
#[derive(Debug, Clone, FromRow)]
pub struct LeaseWithRelationsRow {
    #[sqlx(flatten)]
    pub lease: LeaseRow,
    pub tenant_name: Option<String>,
    pub property_ref: Option<String>,
    pub building_name: Option<String>,
}

impl LeaseWithRelationsRow {
    pub fn into_entity(self) -> DomainResult<LeaseWithRelations> {
        Ok(LeaseWithRelations {
            lease: self.lease.into_entity()?,
            tenant_name: self.tenant_name,
            property_ref: self.property_ref,
            building_name: self.building_name,
        })
    }
}

/// LeaseResponse DTO - list/detail view with related names resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseResponse {
    pub id: Uuid,
    #[serde(rename = "ref")]
    pub reference: String,
    pub tenant_id: Uuid,
    pub tenant_name: Option<String>,
    pub property_id: Uuid,
    pub property_ref: Option<String>,
    pub building_name: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rent: Decimal,
    pub charges: Option<Decimal>,
    pub deposit: Option<Decimal>,
    pub payment_day: i64,
    pub payment_method: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<LeaseWithRelations> for LeaseResponse {
    fn from(joined: LeaseWithRelations) -> Self {
        let lease = joined.lease;
        Self {
            id: lease.id,
            reference: lease.reference,
            tenant_id: lease.tenant_id,
            tenant_name: joined.tenant_name,
            property_id: lease.property_id,
            property_ref: joined.property_ref,
            building_name: joined.building_name,
            start_date: lease.start_date,
            end_date: lease.end_date,
            rent: lease.rent,
            charges: lease.charges,
            deposit: lease.deposit,
            payment_day: lease.payment_day,
            payment_method: lease.payment_method,
            status: lease.status,
            created_at: lease.created_at.to_rfc3339(),
            updated_at: lease.updated_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn valid_lease() -> NewLease {
        NewLease {
            reference: "BAIL-2025-001".to_string(),
            tenant_id: Uuid::new_v4(),
            property_id: Uuid::new_v4(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            rent: dec!(850.00),
            charges: Some(dec!(120.00)),
            deposit: Some(dec!(850.00)),
            payment_day: 5,
            payment_method: Some("Virement bancaire".to_string()),
            status: "Actif".to_string(),
        }
    }

    #[test]
    fn test_new_lease_validation() {
        assert!(valid_lease().validate().is_ok());

        let mut lease = valid_lease();
        lease.end_date = lease.start_date;
        assert!(lease.validate().is_err());

        let mut lease = valid_lease();
        lease.payment_day = 31;
        assert!(lease.validate().is_err());

        let mut lease = valid_lease();
        lease.payment_method = Some("Bitcoin".to_string());
        assert!(lease.validate().is_err());

        let mut lease = valid_lease();
        lease.status = "Suspendu".to_string();
        assert!(lease.validate().is_err());
    }

    #[test]
    fn test_update_lease_date_check_needs_both_ends() {
        // A lone start_date can't be checked against the stored end here
        let update = UpdateLease {
            start_date: Some(NaiveDate::from_ymd_opt(2027, 1, 1).unwrap()),
            ..Default::default()
        };
        assert!(update.validate().is_ok());

        let update = UpdateLease {
            start_date: Some(NaiveDate::from_ymd_opt(2027, 1, 1).unwrap()),
            end_date: Some(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
