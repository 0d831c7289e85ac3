//! Seizure numbering and seizure form validation.

use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::records::NewContrabandItem;
use crate::types::{CategoryId, Unit};
use crate::validate::{ValidationErrors, non_blank};

/// Errors for a client-supplied seizure number.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SeizureNumberError {
    #[error("seizure number cannot be empty")]
    Empty,
    #[error("seizure number must be at most {max} characters")]
    TooLong { max: usize },
    #[error("seizure number may only contain letters, digits, '-' and '/'")]
    InvalidCharacter,
}

/// Human-facing identifier of a seizure, e.g. `CMS-2024-123456`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeizureNumber(String);

impl SeizureNumber {
    pub const MAX_LENGTH: usize = 64;

    /// `CMS-{year}-{last six digits of the millisecond timestamp}`.
    #[must_use]
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix = now.timestamp_millis().rem_euclid(1_000_000);
        Self(format!("CMS-{}-{suffix:06}", now.year()))
    }

    /// Validate a seizure number typed by an officer. Uppercases it.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is blank, too long, or has characters
    /// other than ASCII letters, digits, `-` and `/`.
    pub fn parse(s: &str) -> Result<Self, SeizureNumberError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SeizureNumberError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SeizureNumberError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '/')
        {
            return Err(SeizureNumberError::InvalidCharacter);
        }
        Ok(Self(s.to_ascii_uppercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SeizureNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw seizure registration form, as submitted.
///
/// Every field is text so a failed submission can be re-rendered with what
/// the officer typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeizureForm {
    pub category_id: String,
    pub item_name: String,
    pub description: String,
    pub quantity: String,
    pub unit: String,
    pub estimated_value: String,
    pub weight_kg: String,
    pub seizure_location: String,
    pub gps_latitude: String,
    pub gps_longitude: String,
    pub case_number: String,
    pub barcode: String,
    pub storage_location: String,
}

impl SeizureForm {
    /// Assign a field by its form name. Unknown names are ignored.
    pub fn set(&mut self, name: &str, value: String) {
        let slot = match name {
            "category_id" => &mut self.category_id,
            "item_name" => &mut self.item_name,
            "description" => &mut self.description,
            "quantity" => &mut self.quantity,
            "unit" => &mut self.unit,
            "estimated_value" => &mut self.estimated_value,
            "weight_kg" => &mut self.weight_kg,
            "seizure_location" => &mut self.seizure_location,
            "gps_latitude" => &mut self.gps_latitude,
            "gps_longitude" => &mut self.gps_longitude,
            "case_number" => &mut self.case_number,
            "barcode" => &mut self.barcode,
            "storage_location" => &mut self.storage_location,
            _ => return,
        };
        *slot = value;
    }

    /// Validate the form and build the API payload.
    ///
    /// Category, item name, description, quantity and seizure location are
    /// required. Quantity must be positive; value and weight must not be
    /// negative; coordinates must be in range and come as a pair.
    ///
    /// # Errors
    ///
    /// Returns every problem found.
    pub fn validate(&self) -> Result<NewContrabandItem, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let category_id = match self.category_id.trim() {
            "" => {
                errors.push("category_id", "Contraband category is required");
                None
            }
            raw => raw.parse::<CategoryId>().map_or_else(
                |_| {
                    errors.push("category_id", "Unknown contraband category");
                    None
                },
                Some,
            ),
        };

        errors.require("item_name", "Item name", &self.item_name);
        errors.require("description", "Description", &self.description);
        errors.require("seizure_location", "Seizure location", &self.seizure_location);

        let quantity = match parse_decimal(&self.quantity) {
            Ok(Some(q)) if q > Decimal::ZERO => q,
            Ok(_) => {
                errors.push("quantity", "Quantity must be greater than zero");
                Decimal::ZERO
            }
            Err(()) => {
                errors.push("quantity", "Quantity must be a number");
                Decimal::ZERO
            }
        };

        let unit = non_blank(&self.unit);
        if unit.as_deref().is_some_and(|u| u.parse::<Unit>().is_err()) {
            errors.push("unit", "Unknown unit");
        }

        let estimated_value = non_negative(&mut errors, "estimated_value", "Estimated value", &self.estimated_value);
        let weight_kg = non_negative(&mut errors, "weight_kg", "Weight", &self.weight_kg);

        let latitude = coordinate(&mut errors, "gps_latitude", "Latitude", &self.gps_latitude, 90.0);
        let longitude = coordinate(&mut errors, "gps_longitude", "Longitude", &self.gps_longitude, 180.0);
        if latitude.is_some() != longitude.is_some() {
            errors.push("gps_latitude", "Latitude and longitude must be given together");
        }

        errors.finish(NewContrabandItem {
            seizure_number: None,
            category_id,
            item_name: self.item_name.trim().to_owned(),
            description: non_blank(&self.description),
            quantity,
            unit,
            estimated_value,
            weight_kg,
            seizure_location: self.seizure_location.trim().to_owned(),
            seizure_date: None,
            gps_latitude: latitude,
            gps_longitude: longitude,
            case_number: non_blank(&self.case_number),
            court_case_number: None,
            barcode: non_blank(&self.barcode),
            rfid_tag: None,
            storage_location: non_blank(&self.storage_location),
        })
    }
}

/// Server-side checks on a seizure payload, mirroring the form rules.
///
/// # Errors
///
/// Returns every problem found.
pub fn validate_item(item: &NewContrabandItem) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.require("item_name", "Item name", &item.item_name);
    errors.require("seizure_location", "Seizure location", &item.seizure_location);
    if item.quantity <= Decimal::ZERO {
        errors.push("quantity", "Quantity must be greater than zero");
    }
    if item.estimated_value.is_some_and(|v| v < Decimal::ZERO) {
        errors.push("estimated_value", "Estimated value cannot be negative");
    }
    if item.weight_kg.is_some_and(|v| v < Decimal::ZERO) {
        errors.push("weight_kg", "Weight cannot be negative");
    }
    if item
        .unit
        .as_deref()
        .is_some_and(|u| u.parse::<Unit>().is_err())
    {
        errors.push("unit", "Unknown unit");
    }
    match (item.gps_latitude, item.gps_longitude) {
        (Some(lat), Some(lon)) => {
            if !(lat.is_finite() && lat.abs() <= 90.0) {
                errors.push("gps_latitude", "Latitude must be between -90 and 90");
            }
            if !(lon.is_finite() && lon.abs() <= 180.0) {
                errors.push("gps_longitude", "Longitude must be between -180 and 180");
            }
        }
        (None, None) => {}
        _ => errors.push("gps_latitude", "Latitude and longitude must be given together"),
    }
    errors.finish(())
}

fn parse_decimal(raw: &str) -> Result<Option<Decimal>, ()> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.replace(',', "").parse::<Decimal>().map(Some).map_err(|_| ())
}

fn non_negative(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    raw: &str,
) -> Option<Decimal> {
    match parse_decimal(raw) {
        Ok(Some(v)) if v < Decimal::ZERO => {
            errors.push(field, format!("{label} cannot be negative"));
            None
        }
        Ok(v) => v,
        Err(()) => {
            errors.push(field, format!("{label} must be a number"));
            None
        }
    }
}

fn coordinate(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    raw: &str,
    limit: f64,
) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.abs() <= limit => Some(v),
        Ok(_) => {
            errors.push(field, format!("{label} must be between -{limit} and {limit}"));
            None
        }
        Err(_) => {
            errors.push(field, format!("{label} must be a number"));
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn valid_form() -> SeizureForm {
        SeizureForm {
            category_id: "6f1c1b0e-8d8a-4f5e-9b43-2a7c4d1e9f00".into(),
            item_name: "Cocaine".into(),
            description: "Two sealed packets".into(),
            quantity: "1.25".into(),
            unit: "kg".into(),
            estimated_value: "150,000".into(),
            seizure_location: "Bole International Airport".into(),
            ..SeizureForm::default()
        }
    }

    #[test]
    fn test_generate_uses_year_and_last_six_millis() {
        let now = Utc.timestamp_millis_opt(1_717_171_234_567).unwrap();
        assert_eq!(SeizureNumber::generate(now).as_str(), "CMS-2024-234567");
    }

    #[test]
    fn test_generate_zero_pads() {
        let now = Utc.timestamp_millis_opt(1_704_067_200_042).unwrap();
        assert_eq!(SeizureNumber::generate(now).as_str(), "CMS-2024-200042");
        let padded = Utc.timestamp_millis_opt(1_704_067_000_007).unwrap();
        assert_eq!(SeizureNumber::generate(padded).as_str(), "CMS-2023-000007");
    }

    #[test]
    fn test_parse_seizure_number() {
        assert_eq!(SeizureNumber::parse(" cms-2024-1/a ").unwrap().as_str(), "CMS-2024-1/A");
        assert_eq!(SeizureNumber::parse(""), Err(SeizureNumberError::Empty));
        assert_eq!(
            SeizureNumber::parse("CMS 2024"),
            Err(SeizureNumberError::InvalidCharacter)
        );
    }

    #[test]
    fn test_valid_form_builds_payload() {
        let item = valid_form().validate().unwrap();
        assert_eq!(item.item_name, "Cocaine");
        assert_eq!(item.quantity, "1.25".parse::<Decimal>().unwrap());
        assert_eq!(item.estimated_value, Some(Decimal::from(150_000)));
        assert_eq!(item.weight_kg, None);
        assert_eq!(item.barcode, None);
        assert!(item.category_id.is_some());
    }

    #[test]
    fn test_required_fields() {
        let errors = SeizureForm::default().validate().unwrap_err();
        for field in ["category_id", "item_name", "description", "quantity", "seizure_location"] {
            assert!(errors.has(field), "missing error for {field}");
        }
    }

    #[test]
    fn test_numeric_rules() {
        let mut form = valid_form();
        form.quantity = "0".into();
        form.estimated_value = "-5".into();
        form.weight_kg = "heavy".into();
        let errors = form.validate().unwrap_err();
        assert!(errors.has("quantity"));
        assert!(errors.has("estimated_value"));
        assert!(errors.has("weight_kg"));
    }

    #[test]
    fn test_coordinates_must_pair_and_be_in_range() {
        let mut form = valid_form();
        form.gps_latitude = "9.03".into();
        assert!(form.validate().unwrap_err().has("gps_latitude"));

        form.gps_longitude = "38.74".into();
        let item = form.validate().unwrap();
        assert_eq!(item.gps_latitude, Some(9.03));
        assert_eq!(item.gps_longitude, Some(38.74));

        form.gps_longitude = "181".into();
        assert!(form.validate().unwrap_err().has("gps_longitude"));
    }

    #[test]
    fn test_unknown_unit_rejected() {
        let mut form = valid_form();
        form.unit = "bushels".into();
        assert!(form.validate().unwrap_err().has("unit"));
    }

    #[test]
    fn test_validate_item_payload() {
        let item = valid_form().validate().unwrap();
        assert!(validate_item(&item).is_ok());

        let bad = NewContrabandItem {
            quantity: Decimal::ZERO,
            weight_kg: Some(Decimal::from(-1)),
            gps_longitude: Some(38.7),
            unit: Some("crates".into()),
            ..item
        };
        let errors = validate_item(&bad).unwrap_err();
        for field in ["quantity", "weight_kg", "gps_latitude", "unit"] {
            assert!(errors.has(field), "missing error for {field}");
        }
    }

    #[test]
    fn test_set_by_field_name() {
        let mut form = SeizureForm::default();
        form.set("barcode", "RFID-0099".into());
        form.set("photos", "ignored".into());
        assert_eq!(form.barcode, "RFID-0099");
    }
}
