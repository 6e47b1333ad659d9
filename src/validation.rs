use crate::errors::{DomainError, DomainResult, ValidationError};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

/// A trait that entities should implement for validation.
pub trait Validate {
    /// Validates the entity and returns an error if validation fails.
    fn validate(&self) -> DomainResult<()>;
}

// Common regex patterns
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+?[0-9 .-]{8,20}$").unwrap()
});

/// Struct for configuring validations in a fluent style
#[derive(Default)]
pub struct ValidationBuilder<T> {
    field_name: String,
    value: Option<T>,
    errors: Vec<ValidationError>,
}

/// Generic validation implementations
impl<T> ValidationBuilder<T> {
    pub fn new(field_name: &str, value: Option<T>) -> Self {
        Self {
            field_name: field_name.to_string(),
            value,
            errors: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self
    where T: Default + PartialEq {
        if self.value.is_none() || self.value == Some(T::default()) {
            self.errors.push(ValidationError::required(&self.field_name));
        }
        self
    }

    pub fn validate_with<F>(mut self, validator: F) -> Self
    where F: FnOnce(&T) -> Result<(), ValidationError> {
        if let Some(value) = &self.value {
            if let Err(err) = validator(value) {
                self.errors.push(err);
            }
        }
        self
    }

    /// Complete validation and return result
    pub fn validate(self) -> DomainResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            // Return the first error for simplicity
            Err(DomainError::Validation(self.errors[0].clone()))
        }
    }
}

/// String-specific validations
impl ValidationBuilder<String> {
    pub fn min_length(mut self, min: usize) -> Self {
        if let Some(value) = &self.value {
            if value.len() < min {
                self.errors.push(ValidationError::min_length(&self.field_name, min));
            }
        }
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        if let Some(value) = &self.value {
            if value.len() > max {
                self.errors.push(ValidationError::max_length(&self.field_name, max));
            }
        }
        self
    }

    pub fn matches_pattern(mut self, pattern: &Regex, message: &str) -> Self {
        if let Some(value) = &self.value {
            if !pattern.is_match(value) {
                self.errors.push(ValidationError::format(&self.field_name, message));
            }
        }
        self
    }

    pub fn email(self) -> Self {
        self.matches_pattern(&EMAIL_REGEX, "must be a valid email address")
    }

    pub fn phone(self) -> Self {
        self.matches_pattern(&PHONE_REGEX, "must be a valid phone number")
    }

    pub fn one_of(mut self, allowed_values: &[&str], message: Option<&str>) -> Self {
        if let Some(value) = &self.value {
            if !allowed_values.contains(&value.as_str()) {
                let reason = message.unwrap_or("must be one of the allowed values");
                self.errors.push(ValidationError::invalid_value(&self.field_name, reason));
            }
        }
        self
    }
}

/// Numeric validations
impl<T> ValidationBuilder<T>
where T: PartialOrd + std::fmt::Display
{
    pub fn min(mut self, min: T) -> Self {
        if let Some(value) = &self.value {
            if value < &min {
                self.errors.push(ValidationError::range(
                    &self.field_name,
                    min.to_string(),
                    "maximum".to_string(),
                ));
            }
        }
        self
    }

    pub fn max(mut self, max: T) -> Self {
        if let Some(value) = &self.value {
            if value > &max {
                self.errors.push(ValidationError::range(
                    &self.field_name,
                    "minimum".to_string(),
                    max.to_string(),
                ));
            }
        }
        self
    }

    pub fn range(mut self, min: T, max: T) -> Self {
        if let Some(value) = &self.value {
            if value < &min || value > &max {
                self.errors.push(ValidationError::range(
                    &self.field_name,
                    min.to_string(),
                    max.to_string(),
                ));
            }
        }
        self
    }
}

/// Shared validation helpers used across domains
pub mod common {
    use super::*;

    pub fn validate_date_format(date_str: &str, field_name: &str) -> DomainResult<()> {
        match NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
            Ok(_) => Ok(()),
            Err(_) => Err(DomainError::Validation(ValidationError::format(
                field_name,
                "must be in the format YYYY-MM-DD",
            ))),
        }
    }

    /// Monetary amounts must not be negative.
    pub fn validate_amount(amount: &Decimal, field_name: &str) -> DomainResult<()> {
        if amount.is_sign_negative() {
            return Err(DomainError::Validation(ValidationError::invalid_value(
                field_name,
                "must not be negative",
            )));
        }
        Ok(())
    }

    /// Day-of-month for rent payment (1 to 28 so it exists in every month).
    pub fn validate_payment_day(day: i64) -> DomainResult<()> {
        ValidationBuilder::new("payment_day", Some(day))
            .range(1, 28)
            .validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_email_validation() {
        assert!(EMAIL_REGEX.is_match("user@example.com"));
        assert!(EMAIL_REGEX.is_match("user.name+tag@example.co.uk"));
        assert!(!EMAIL_REGEX.is_match("user@"));
        assert!(!EMAIL_REGEX.is_match("@example.com"));
        assert!(!EMAIL_REGEX.is_match("user@example"));
    }

    #[test]
    fn test_phone_validation() {
        assert!(PHONE_REGEX.is_match("0612345678"));
        assert!(PHONE_REGEX.is_match("+33 6 12 34 56 78"));
        assert!(!PHONE_REGEX.is_match("123"));
        assert!(!PHONE_REGEX.is_match("abcdefghij"));
    }

    #[test]
    fn test_validation_builder() {
        let result = ValidationBuilder::new("name", Some("".to_string()))
            .required()
            .validate();
        assert!(result.is_err());

        let result = ValidationBuilder::new("name", Some("test".to_string()))
            .required()
            .min_length(5)
            .validate();
        assert!(result.is_err());

        let result = ValidationBuilder::new("email", Some("invalid".to_string()))
            .email()
            .validate();
        assert!(result.is_err());

        let result = ValidationBuilder::new("email", Some("valid@example.com".to_string()))
            .email()
            .validate();
        assert!(result.is_ok());

        let result = ValidationBuilder::new("units", Some(-1))
            .min(0)
            .validate();
        assert!(result.is_err());

        let result = ValidationBuilder::new("year_built", Some(1975))
            .range(1800, 2100)
            .validate();
        assert!(result.is_ok());

        let value: Option<String> = None;
        let result = ValidationBuilder::new("name", value)
            .required()
            .validate();
        assert!(result.is_err());
    }

    #[test]
    fn test_one_of() {
        let result = ValidationBuilder::new("status", Some("Vacant".to_string()))
            .one_of(&["Occupé", "Vacant", "Préavis"], None)
            .validate();
        assert!(result.is_ok());

        let result = ValidationBuilder::new("status", Some("Libre".to_string()))
            .one_of(&["Occupé", "Vacant", "Préavis"], Some("Invalid status"))
            .validate();
        assert!(result.is_err());
    }

    #[test]
    fn test_common_validations() {
        assert!(common::validate_date_format("2025-01-01", "date").is_ok());
        assert!(common::validate_date_format("01/01/2025", "date").is_err());

        assert!(common::validate_amount(&dec!(850.00), "rent").is_ok());
        assert!(common::validate_amount(&dec!(-1), "rent").is_err());

        assert!(common::validate_payment_day(5).is_ok());
        assert!(common::validate_payment_day(31).is_err());
    }
}
