//! Comprehensive tests for domain_claims

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use domain_claims::claim::{ClaimRecord, UsageType};
use domain_claims::loader::{fields, ClaimLoader};
use domain_claims::ClaimError;

fn john_delivery_claim() -> Value {
    json!({
        "claim_number": "CLAIM-0001",
        "policy_number": "CAPA-781234",
        "claimant_name": "John Smith",
        "date_of_loss": "2025-06-20",
        "loss_description": "While delivering pizzas for Tony's Pizzeria, rear-ended another vehicle at a red light.",
        "estimated_repair_cost": 4500.0,
        "vehicle_details": "2019 Honda Civic",
        "usage_type": "commercial",
        "reported_date": "2025-06-21",
        "adjuster_notes": "ignored"
    })
}

// ============================================================================
// Loader Tests
// ============================================================================

mod loader_tests {
    use super::*;

    #[test]
    fn test_loads_full_claim() {
        let record = ClaimLoader::from_value(john_delivery_claim()).unwrap();

        assert_eq!(record.claim_number.as_str(), "CLAIM-0001");
        assert_eq!(record.policy_number.as_str(), "CAPA-781234");
        assert_eq!(record.date_of_loss, NaiveDate::from_ymd_opt(2025, 6, 20).unwrap());
        assert_eq!(record.claimed_amount.amount(), dec!(4500));
        assert_eq!(record.usage_type, UsageType::Commercial);
        assert_eq!(record.vehicle_details.as_deref(), Some("2019 Honda Civic"));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        assert!(ClaimLoader::from_value(john_delivery_claim()).is_ok());
    }

    #[test]
    fn test_each_required_field_is_named_when_missing() {
        for field in [
            fields::CLAIM_NUMBER,
            fields::POLICY_NUMBER,
            fields::CLAIMANT_NAME,
            fields::DATE_OF_LOSS,
            fields::LOSS_DESCRIPTION,
            fields::ESTIMATED_REPAIR_COST,
        ] {
            let mut value = john_delivery_claim();
            value.as_object_mut().unwrap().remove(field);

            let err = ClaimLoader::from_value(value).unwrap_err();
            assert_eq!(err.field(), Some(field), "field {} should be reported", field);
        }
    }

    #[test]
    fn test_null_required_field_is_missing() {
        let mut value = john_delivery_claim();
        value["claimant_name"] = Value::Null;
        let err = ClaimLoader::from_value(value).unwrap_err();
        assert!(err.to_string().contains("claimant_name"));
    }

    #[test]
    fn test_unparseable_date_rejected() {
        let mut value = john_delivery_claim();
        value["date_of_loss"] = json!("June twentieth");
        let err = ClaimLoader::from_value(value).unwrap_err();
        assert_eq!(err.field(), Some(fields::DATE_OF_LOSS));
    }

    #[test]
    fn test_us_date_format_accepted() {
        let mut value = john_delivery_claim();
        value["date_of_loss"] = json!("06/20/2025");
        let record = ClaimLoader::from_value(value).unwrap();
        assert_eq!(record.date_of_loss, NaiveDate::from_ymd_opt(2025, 6, 20).unwrap());
    }

    #[test]
    fn test_bad_reported_date_rejected() {
        let mut value = john_delivery_claim();
        value["reported_date"] = json!(20250621);
        let err = ClaimLoader::from_value(value).unwrap_err();
        assert_eq!(err.field(), Some(fields::REPORTED_DATE));
    }

    #[test]
    fn test_amount_as_boolean_rejected() {
        let mut value = john_delivery_claim();
        value["estimated_repair_cost"] = json!(true);
        let err = ClaimLoader::from_value(value).unwrap_err();
        assert_eq!(err.field(), Some(fields::ESTIMATED_REPAIR_COST));
    }

    #[test]
    fn test_zero_amount_accepted() {
        let mut value = john_delivery_claim();
        value["estimated_repair_cost"] = json!(0);
        assert!(ClaimLoader::from_value(value).unwrap().claimed_amount.is_zero());
    }

    #[test]
    fn test_blank_policy_number_rejected() {
        let mut value = john_delivery_claim();
        value["policy_number"] = json!("   ");
        let err = ClaimLoader::from_value(value).unwrap_err();
        assert_eq!(err.field(), Some(fields::POLICY_NUMBER));
    }

    #[test]
    fn test_malformed_json() {
        let err = ClaimLoader::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ClaimError::MalformedJson(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = ClaimLoader::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ClaimError::FileNotFound(_)));
    }

    #[test]
    fn test_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("john.json");
        std::fs::write(&path, john_delivery_claim().to_string()).unwrap();

        let record = ClaimLoader::from_path(&path).unwrap();
        assert_eq!(record.claimant_name, "John Smith");
    }
}

// ============================================================================
// Claim Record Tests
// ============================================================================

mod record_tests {
    use super::*;

    fn record() -> ClaimRecord {
        ClaimLoader::from_value(john_delivery_claim()).unwrap()
    }

    #[test]
    fn test_commercial_activity_detected_from_narrative() {
        let mut record = record();
        record.usage_type = UsageType::Personal;
        assert!(record.indicates_commercial_activity());
        assert!(record.is_commercial_use());
    }

    #[test]
    fn test_personal_narrative_is_not_commercial() {
        let mut record = record();
        record.usage_type = UsageType::Personal;
        record.loss_description = "Slid on ice into a guardrail".to_string();
        assert!(!record.is_commercial_use());
    }

    #[test]
    fn test_reporting_lag() {
        assert_eq!(record().reporting_lag_days(), Some(1));
    }

    #[test]
    fn test_usage_type_parse() {
        assert_eq!("Business".parse::<UsageType>().unwrap(), UsageType::Commercial);
        assert!("fleet".parse::<UsageType>().is_err());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn non_negative_amounts_always_load(cents in 0i64..100_000_000i64) {
            let mut value = john_delivery_claim();
            value["estimated_repair_cost"] = json!(cents as f64 / 100.0);
            let record = ClaimLoader::from_value(value).unwrap();
            prop_assert!(!record.claimed_amount.is_negative());
        }

        #[test]
        fn negative_amounts_always_rejected(cents in 1i64..100_000_000i64) {
            let mut value = john_delivery_claim();
            value["estimated_repair_cost"] = json!(-(cents as f64) / 100.0);
            let err = ClaimLoader::from_value(value).unwrap_err();
            prop_assert_eq!(err.field(), Some(fields::ESTIMATED_REPAIR_COST));
        }
    }
}
