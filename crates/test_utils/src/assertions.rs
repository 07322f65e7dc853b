//! Custom Test Assertions
//!
//! Assertion helpers for decisions that print the full rationale trail on
//! failure.

use rust_decimal::Decimal;

use domain_adjudication::{ClaimDecision, Determination, StageName};

fn trail(decision: &ClaimDecision) -> String {
    decision
        .stages
        .iter()
        .map(|r| format!("  {} [{}]: {}", r.stage, r.source, r.rationale))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Asserts the determination, showing every stage rationale on mismatch
pub fn assert_determination(decision: &ClaimDecision, expected: Determination) {
    assert_eq!(
        decision.determination, expected,
        "Unexpected determination for {}:\n{}",
        decision.claim.claim_number,
        trail(decision)
    );
}

/// Asserts the recommended payout in dollars
pub fn assert_payout(decision: &ClaimDecision, expected: Decimal) {
    assert_eq!(
        decision.recommended_payout.amount(),
        expected,
        "Unexpected payout for {}:\n{}",
        decision.claim.claim_number,
        trail(decision)
    );
}

/// Asserts the decision carries all five stages in pipeline order, each
/// with a rationale
pub fn assert_complete_trail(decision: &ClaimDecision) {
    let stages: Vec<StageName> = decision.stages.iter().map(|r| r.stage).collect();
    assert_eq!(stages, StageName::ORDER.to_vec(), "Stages out of order or missing");
    for result in &decision.stages {
        assert!(
            !result.rationale.trim().is_empty(),
            "Stage {} has no rationale",
            result.stage
        );
    }
}

/// Asserts the payout invariants every decision must satisfy
pub fn assert_payout_invariants(decision: &ClaimDecision) {
    let payout = decision.recommended_payout.amount();
    assert!(payout >= Decimal::ZERO, "Negative payout {}", payout);
    assert!(
        payout <= decision.claim.claimed_amount.amount(),
        "Payout {} exceeds claimed {}",
        payout,
        decision.claim.claimed_amount
    );
    if !decision.covered {
        assert_determination(decision, Determination::Denied);
        assert_eq!(payout, Decimal::ZERO, "Uncovered claim paid {}", payout);
    }
    if decision.fraud_risk_score > Decimal::new(5, 1) {
        assert!(decision.review_required, "High fraud score without review");
        assert_ne!(decision.determination, Determination::Approved);
    }
}
