//! Claim record loader
//!
//! Parses a claim document at the boundary into an immutable
//! [`ClaimRecord`]. The schema is closed over its required fields and open
//! over everything else: unknown keys are ignored, required keys are checked
//! for presence and type, and the first offending field is named in the
//! returned [`ClaimError::Validation`].

use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::debug;

use core_kernel::{ClaimNumber, Currency, Money, PolicyNumber};

use crate::claim::{ClaimRecord, UsageType};
use crate::error::ClaimError;

/// Canonical field names
pub mod fields {
    pub const CLAIM_NUMBER: &str = "claim_number";
    pub const POLICY_NUMBER: &str = "policy_number";
    pub const CLAIMANT_NAME: &str = "claimant_name";
    pub const DATE_OF_LOSS: &str = "date_of_loss";
    pub const LOSS_DESCRIPTION: &str = "loss_description";
    pub const ESTIMATED_REPAIR_COST: &str = "estimated_repair_cost";
    pub const USAGE_TYPE: &str = "usage_type";
    pub const VEHICLE_DETAILS: &str = "vehicle_details";
    pub const LOSS_LOCATION: &str = "loss_location";
    pub const REPORTED_DATE: &str = "reported_date";
}

/// Older claim exports use these names; they apply only when the canonical
/// field is absent.
const FIELD_ALIASES: &[(&str, &str)] = &[
    ("damage_amount", fields::ESTIMATED_REPAIR_COST),
    ("claimed_amount", fields::ESTIMATED_REPAIR_COST),
    ("policyholder_name", fields::CLAIMANT_NAME),
    ("date_of_incident", fields::DATE_OF_LOSS),
    ("description", fields::LOSS_DESCRIPTION),
    ("location", fields::LOSS_LOCATION),
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Loads and validates claim documents
pub struct ClaimLoader;

impl ClaimLoader {
    /// Loads a claim from a JSON file on disk
    ///
    /// # Errors
    ///
    /// `FileNotFound` when the path does not exist, `MalformedJson` when the
    /// file is not JSON, and `Validation` naming the first bad field.
    pub fn from_path(path: impl AsRef<Path>) -> Result<ClaimRecord, ClaimError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ClaimError::FileNotFound(path.display().to_string())
            } else {
                ClaimError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }
            }
        })?;
        Self::from_json_str(&contents)
    }

    /// Loads a claim from a JSON string
    pub fn from_json_str(json: &str) -> Result<ClaimRecord, ClaimError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| ClaimError::MalformedJson(e.to_string()))?;
        Self::from_value(value)
    }

    /// Loads a claim from an already-parsed JSON value
    pub fn from_value(value: Value) -> Result<ClaimRecord, ClaimError> {
        let mut map = match value {
            Value::Object(map) => map,
            _ => return Err(ClaimError::validation("$root", "claim must be a JSON object")),
        };
        apply_aliases(&mut map);

        let record = ClaimRecord {
            claim_number: ClaimNumber::new(required_str(&map, fields::CLAIM_NUMBER)?)
                .map_err(|e| ClaimError::validation(fields::CLAIM_NUMBER, e.to_string()))?,
            policy_number: PolicyNumber::new(required_str(&map, fields::POLICY_NUMBER)?)
                .map_err(|e| ClaimError::validation(fields::POLICY_NUMBER, e.to_string()))?,
            claimant_name: required_str(&map, fields::CLAIMANT_NAME)?,
            date_of_loss: required_date(&map, fields::DATE_OF_LOSS)?,
            loss_description: required_str(&map, fields::LOSS_DESCRIPTION)?,
            claimed_amount: required_amount(&map, fields::ESTIMATED_REPAIR_COST)?,
            usage_type: optional_usage(&map)?,
            vehicle_details: optional_str(&map, fields::VEHICLE_DETAILS)?,
            loss_location: optional_str(&map, fields::LOSS_LOCATION)?,
            reported_date: optional_date(&map, fields::REPORTED_DATE)?,
        };

        debug!(
            claim_number = %record.claim_number,
            policy_number = %record.policy_number,
            "Claim record loaded"
        );

        Ok(record)
    }
}

fn apply_aliases(map: &mut Map<String, Value>) {
    for (legacy, canonical) in FIELD_ALIASES {
        if !present(map, canonical) {
            if let Some(value) = map.remove(*legacy) {
                map.insert((*canonical).to_string(), value);
            }
        }
    }
}

fn present(map: &Map<String, Value>, field: &str) -> bool {
    map.get(field).map(|v| !v.is_null()).unwrap_or(false)
}

fn required<'a>(map: &'a Map<String, Value>, field: &str) -> Result<&'a Value, ClaimError> {
    match map.get(field) {
        Some(Value::Null) | None => Err(ClaimError::missing(field)),
        Some(value) => Ok(value),
    }
}

fn required_str(map: &Map<String, Value>, field: &str) -> Result<String, ClaimError> {
    match required(map, field)? {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Value::String(_) => Err(ClaimError::validation(field, "must not be blank")),
        _ => Err(ClaimError::validation(field, "expected a string")),
    }
}

fn optional_str(map: &Map<String, Value>, field: &str) -> Result<Option<String>, ClaimError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(ClaimError::validation(field, "expected a string")),
    }
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, ClaimError> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw.trim(), format).ok())
        .ok_or_else(|| {
            ClaimError::validation(field, format!("'{}' is not a date (expected YYYY-MM-DD)", raw))
        })
}

fn required_date(map: &Map<String, Value>, field: &str) -> Result<NaiveDate, ClaimError> {
    match required(map, field)? {
        Value::String(s) => parse_date(field, s),
        _ => Err(ClaimError::validation(field, "expected a date string")),
    }
}

fn optional_date(map: &Map<String, Value>, field: &str) -> Result<Option<NaiveDate>, ClaimError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => parse_date(field, s).map(Some),
        Some(_) => Err(ClaimError::validation(field, "expected a date string")),
    }
}

fn required_amount(map: &Map<String, Value>, field: &str) -> Result<Money, ClaimError> {
    let amount = match required(map, field)? {
        Value::Number(n) => number_to_decimal(n)
            .ok_or_else(|| ClaimError::validation(field, format!("'{}' is not a usable amount", n)))?,
        Value::String(s) => Money::parse(s, Currency::USD)
            .map_err(|e| ClaimError::validation(field, e.to_string()))?
            .amount(),
        _ => return Err(ClaimError::validation(field, "expected a number")),
    };

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ClaimError::validation(field, "amount must not be negative"));
    }
    Ok(Money::usd(amount))
}

fn number_to_decimal(n: &serde_json::Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    n.as_f64().and_then(|f| Decimal::try_from(f).ok())
}

fn optional_usage(map: &Map<String, Value>) -> Result<UsageType, ClaimError> {
    match map.get(fields::USAGE_TYPE) {
        None | Some(Value::Null) => Ok(UsageType::default()),
        Some(Value::String(s)) => s
            .parse()
            .map_err(|message: String| ClaimError::validation(fields::USAGE_TYPE, message)),
        Some(_) => Err(ClaimError::validation(fields::USAGE_TYPE, "expected a string")),
    }
}
