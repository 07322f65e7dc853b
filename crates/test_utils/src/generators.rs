//! Property-Based Test Generators
//!
//! Proptest strategies for claim documents that pass loader validation.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use serde_json::{json, Value};

use crate::fixtures::ALICE_POLICY;

/// Required claim fields, in the order the loader checks them
pub const REQUIRED_CLAIM_FIELDS: &[&str] = &[
    "claim_number",
    "policy_number",
    "claimant_name",
    "date_of_loss",
    "loss_description",
    "estimated_repair_cost",
];

/// Repair costs in whole dollars, from trivial to total loss
pub fn repair_cost_strategy() -> impl Strategy<Value = u64> {
    1u64..60_000u64
}

/// Loss dates within the fixture policy periods
pub fn loss_date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..300i64).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date") + Duration::days(offset)
    })
}

/// Loss narratives ranging from sparse to detailed, some mentioning
/// commercial activity
pub fn narrative_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Car damaged.".to_string()),
        Just("Rear-ended at a stop light by another vehicle on Main Street".to_string()),
        Just("Hail storm dented the hood and cracked the windshield overnight".to_string()),
        Just("Collided with a parked van while delivering pizzas for a restaurant".to_string()),
        Just("Backed into a pole while delivering packages for a courier service".to_string()),
        "[a-z]{3,9}( [a-z]{2,9}){0,12}",
    ]
}

/// Valid claim documents against the plain personal policy
pub fn claim_value_strategy() -> impl Strategy<Value = Value> {
    (
        1u32..99_999u32,
        loss_date_strategy(),
        0i64..90i64,
        narrative_strategy(),
        repair_cost_strategy(),
    )
        .prop_map(|(seq, loss_date, lag, narrative, cost)| {
            json!({
                "claim_number": format!("CLM-PROP-{:05}", seq),
                "policy_number": ALICE_POLICY,
                "claimant_name": "Alice Johnson",
                "date_of_loss": loss_date.format("%Y-%m-%d").to_string(),
                "reported_date": (loss_date + Duration::days(lag)).format("%Y-%m-%d").to_string(),
                "loss_description": narrative,
                "estimated_repair_cost": cost,
            })
        })
}

/// One of the required claim fields
pub fn required_field_strategy() -> impl Strategy<Value = &'static str> {
    proptest::sample::select(REQUIRED_CLAIM_FIELDS)
}
