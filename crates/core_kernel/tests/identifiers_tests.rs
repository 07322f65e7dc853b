//! Tests for identifier newtypes

use core_kernel::{ClaimNumber, DecisionId, PolicyNumber};

#[test]
fn test_decision_ids_are_unique() {
    assert_ne!(DecisionId::new_v7(), DecisionId::new_v7());
}

#[test]
fn test_decision_id_parse_with_prefix() {
    let id = DecisionId::new_v7();
    let parsed: DecisionId = id.to_string().parse().unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn test_policy_number_case_insensitive_equality() {
    assert_eq!(
        PolicyNumber::new("capa-123456").unwrap(),
        PolicyNumber::new("CAPA-123456").unwrap()
    );
}

#[test]
fn test_claim_number_serde_rejects_blank() {
    let result: Result<ClaimNumber, _> = serde_json::from_str("\"  \"");
    assert!(result.is_err());
}

#[test]
fn test_claim_number_serializes_as_string() {
    let number = ClaimNumber::new("clm-001").unwrap();
    assert_eq!(serde_json::to_string(&number).unwrap(), "\"CLM-001\"");
}
