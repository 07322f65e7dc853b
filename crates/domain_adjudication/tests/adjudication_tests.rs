//! Integration tests for the Adjudication domain
//!
//! Tests cover the deterministic stage rules end to end, the collaborator
//! path with its retry and fallback reasons, the endorsement tie-break,
//! the fraud review guard, cancellation and decision formatting.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use core_kernel::{PolicyNumber, RetryPolicy};
use domain_adjudication::stages::FraudStage;
use domain_adjudication::{
    AgentStage, CancellationToken, ClaimPipeline, DecisionFormatter, Determination,
    FallbackReason, MockReasoningClient, MockReply, PipelineConfig, PipelineError, PipelineState,
    Severity, StageEvidence, StageInput, StageName, StageSource,
};
use domain_claims::{ClaimLoader, ClaimRecord};
use domain_policy::mock::StaticRetriever;
use domain_policy::{
    DeclarationsParser, DeclarationsSource, InMemoryDeclarationsStore, PolicyContext,
    PolicyContextResolver, PolicySnippet,
};

const JOHN_DECLARATIONS: &str = "\
PERSONAL AUTO POLICY DECLARATIONS
Policy Number: CAPA-781234
Named Insured: John Smith
Policy Period: 2025-01-01 to 2025-12-31

COVERAGES AND PREMIUMS
Collision | Limit: Actual Cash Value | Deductible: $500 | Premium: $412
Comprehensive | Limit: Actual Cash Value | Deductible: $250 | Premium: $188

FORMS AND ENDORSEMENTS
- PP 03 06 Commercial Use Endorsement

COMMERCIAL USE ENDORSEMENT
Form: PP 03 06
Covered Activities: food delivery, pizza delivery
Deductible: $1,000
";

const ALICE_DECLARATIONS: &str = "\
PERSONAL AUTO POLICY DECLARATIONS
Policy Number: CAPA-100200
Named Insured: Alice Johnson
Policy Period: 2025-03-01 to 2026-02-28

COVERAGES AND PREMIUMS
Collision | Limit: Actual Cash Value | Deductible: $500 | Premium: $390
";

const RIDESHARE_DECLARATIONS: &str = "\
PERSONAL AUTO POLICY DECLARATIONS
Policy Number: CAPA-555010
Named Insured: Maria Lopez
Policy Period: 2025-01-01 to 2025-12-31

COVERAGES AND PREMIUMS
Collision | Limit: Actual Cash Value | Deductible: $500 | Premium: $455

FORMS AND ENDORSEMENTS
- PP 03 06 Commercial Use Endorsement

COMMERCIAL USE ENDORSEMENT
Form: PP 03 06
Covered Activities: Uber, Lyft
";

/// John's page with every endorsement block removed
fn john_without_endorsement() -> &'static str {
    JOHN_DECLARATIONS
        .split("FORMS AND ENDORSEMENTS")
        .next()
        .unwrap()
}

fn rear_end_claim() -> Value {
    json!({
        "claim_number": "CLM-2025-0001",
        "policy_number": "CAPA-100200",
        "claimant_name": "Alice Johnson",
        "date_of_loss": "2025-06-15",
        "reported_date": "2025-06-16",
        "loss_description": "Rear-ended at a stop light by another vehicle on Main Street",
        "estimated_repair_cost": 3200,
    })
}

fn pizza_delivery_claim() -> Value {
    json!({
        "claim_number": "CLM-2025-0002",
        "policy_number": "CAPA-781234",
        "claimant_name": "John Smith",
        "date_of_loss": "2025-07-10",
        "reported_date": "2025-07-11",
        "loss_description": "Collided with a parked van while delivering pizzas for Tony's Pizzeria",
        "estimated_repair_cost": 4500,
    })
}

fn courier_claim() -> Value {
    json!({
        "claim_number": "CLM-2025-0003",
        "policy_number": "CAPA-100200",
        "claimant_name": "Alice Johnson",
        "date_of_loss": "2025-06-20",
        "loss_description": "Backed into a pole while delivering packages for a courier service",
        "estimated_repair_cost": 2800,
    })
}

fn suspicious_claim() -> Value {
    json!({
        "claim_number": "CLM-2025-0004",
        "policy_number": "CAPA-100200",
        "claimant_name": "Alice Johnson",
        "date_of_loss": "2025-03-10",
        "reported_date": "2025-05-20",
        "loss_description": "Car damaged.",
        "estimated_repair_cost": 22000,
    })
}

fn no_backoff() -> PipelineConfig {
    PipelineConfig::default().with_retry(RetryPolicy {
        max_retries: 1,
        backoff_ms: 0,
    })
}

fn resolver() -> PolicyContextResolver {
    let store = InMemoryDeclarationsStore::from_texts([JOHN_DECLARATIONS, ALICE_DECLARATIONS]).unwrap();
    PolicyContextResolver::new(Arc::new(store))
}

fn pipeline_for(texts: &[&str]) -> ClaimPipeline {
    let store = InMemoryDeclarationsStore::from_texts(texts.iter().copied()).unwrap();
    ClaimPipeline::new(PolicyContextResolver::new(Arc::new(store)), no_backoff())
}

fn pipeline() -> ClaimPipeline {
    ClaimPipeline::new(resolver(), no_backoff())
}

fn pipeline_with(client: &Arc<MockReasoningClient>) -> ClaimPipeline {
    pipeline().with_reasoning_client(client.clone())
}

fn load(value: Value) -> ClaimRecord {
    ClaimLoader::from_value(value).unwrap()
}

fn context_for(text: &str) -> PolicyContext {
    PolicyContext {
        declarations: DeclarationsParser::parse(text).unwrap(),
        source: DeclarationsSource::Local,
    }
}

// ============================================================================
// Deterministic Pipeline Tests
// ============================================================================

mod deterministic_tests {
    use super::*;

    #[tokio::test]
    async fn test_rear_end_claim_is_approved_net_of_deductible() {
        let decision = pipeline().process_value(rear_end_claim()).await.unwrap();

        assert_eq!(decision.determination, Determination::Approved);
        assert!(decision.covered);
        assert_eq!(decision.recommended_payout.amount(), dec!(2700));
        assert_eq!(decision.deductible.amount(), dec!(500));
        assert!(!decision.review_required);
        assert_eq!(decision.policy.named_insured, "Alice Johnson");

        let fnol = decision.stage(StageName::FnolIntelligence).unwrap().fnol().unwrap();
        assert_eq!(fnol.severity, Severity::Moderate);
        assert!(fnol
            .next_actions
            .iter()
            .any(|a| a.contains("other party's insurance")));
    }

    #[tokio::test]
    async fn test_every_stage_records_not_configured() {
        let decision = pipeline().process_value(rear_end_claim()).await.unwrap();

        let order: Vec<StageName> = decision.stages.iter().map(|s| s.stage).collect();
        assert_eq!(order, StageName::ORDER.to_vec());
        for stage in &decision.stages {
            assert_eq!(
                stage.source,
                StageSource::Fallback {
                    reason: FallbackReason::NotConfigured
                }
            );
            assert!(stage.rationale.ends_with("[fallback: not-configured]"));
        }
        assert!(decision.used_fallback());
    }

    #[tokio::test]
    async fn test_fallback_is_deterministic() {
        let first = pipeline().process_value(pizza_delivery_claim()).await.unwrap();
        let second = pipeline().process_value(pizza_delivery_claim()).await.unwrap();

        assert_eq!(first.stages, second.stages);
        assert_eq!(first.notes, second.notes);
        assert_ne!(first.decision_id, second.decision_id);
    }

    #[tokio::test]
    async fn test_loss_below_deductible_is_denied_without_payout() {
        let mut claim = rear_end_claim();
        claim["estimated_repair_cost"] = json!(400);

        let decision = pipeline().process_value(claim).await.unwrap();
        assert_eq!(decision.determination, Determination::Denied);
        assert!(decision.recommended_payout.amount().is_zero());
    }

    #[tokio::test]
    async fn test_unknown_policy_halts_before_any_stage() {
        let mut claim = rear_end_claim();
        claim["policy_number"] = json!("CAPA-404404");

        let err = pipeline().process_value(claim).await.unwrap_err();
        assert!(matches!(err, PipelineError::PolicyNotFound(p) if p == "CAPA-404404"));
    }

    #[tokio::test]
    async fn test_invalid_claim_names_the_field() {
        let mut claim = rear_end_claim();
        claim.as_object_mut().unwrap().remove("date_of_loss");

        let err = pipeline().process_value(claim).await.unwrap_err();
        match err {
            PipelineError::Validation(e) => assert_eq!(e.field(), Some("date_of_loss")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_process_path_reads_claim_file() {
        let dir = std::env::temp_dir().join(format!("claim-pipeline-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("claim.json");
        std::fs::write(&path, rear_end_claim().to_string()).unwrap();

        let decision = pipeline().process_path(&path).await.unwrap();
        assert_eq!(decision.claim.claim_number.as_str(), "CLM-2025-0001");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}

// ============================================================================
// Coverage and Endorsement Tests
// ============================================================================

mod coverage_tests {
    use super::*;

    #[tokio::test]
    async fn test_pizza_delivery_with_endorsement_is_not_denied() {
        let decision = pipeline().process_value(pizza_delivery_claim()).await.unwrap();

        assert_ne!(decision.determination, Determination::Denied);
        let coverage = decision
            .stage(StageName::CoveragePolicyQuery)
            .unwrap()
            .coverage()
            .unwrap();
        assert!(coverage.covered);
        assert_eq!(coverage.endorsement.as_deref(), Some("PP 03 06"));
        assert_eq!(coverage.policy_section, "PP 03 06 COMMERCIAL USE ENDORSEMENT");
        assert!(coverage
            .matched_sections
            .contains(&"PART D - COLLISION COVERAGE".to_string()));
        assert!(coverage.tie_break.is_some());

        // Endorsement deductible overrides the base collision deductible
        assert_eq!(decision.deductible.amount(), dec!(1000));
        assert_eq!(decision.recommended_payout.amount(), dec!(3500));
        assert!(decision.notes.iter().any(|n| n.contains("more specific endorsement")));
    }

    #[tokio::test]
    async fn test_commercial_use_without_endorsement_is_excluded() {
        let decision = pipeline().process_value(courier_claim()).await.unwrap();

        assert_eq!(decision.determination, Determination::Denied);
        assert!(!decision.covered);
        let coverage = decision
            .stage(StageName::CoveragePolicyQuery)
            .unwrap()
            .coverage()
            .unwrap();
        assert!(coverage.exclusion.as_deref().unwrap().contains("for compensation"));
    }

    #[tokio::test]
    async fn test_removing_endorsement_falls_back_to_base_section() {
        let decision = pipeline_for(&[john_without_endorsement()])
            .process_value(pizza_delivery_claim())
            .await
            .unwrap();
        let coverage = decision
            .stage(StageName::CoveragePolicyQuery)
            .unwrap()
            .coverage()
            .unwrap();

        assert_eq!(coverage.policy_section, "PART D - COLLISION COVERAGE");
        assert_eq!(coverage.endorsement, None);
        assert_eq!(coverage.tie_break, None);
        assert_eq!(coverage.matched_sections, vec!["PART D - COLLISION COVERAGE".to_string()]);
        assert_eq!(decision.determination, Determination::Denied);
    }

    #[tokio::test]
    async fn test_short_activity_names_on_endorsement_apply() {
        let claim = json!({
            "claim_number": "CLM-2025-0005",
            "policy_number": "CAPA-555010",
            "claimant_name": "Maria Lopez",
            "date_of_loss": "2025-08-02",
            "reported_date": "2025-08-02",
            "loss_description": "Rear-ended at an intersection while driving for Uber with a passenger",
            "estimated_repair_cost": 3000,
        });
        let decision = pipeline_for(&[RIDESHARE_DECLARATIONS])
            .process_value(claim)
            .await
            .unwrap();
        let coverage = decision
            .stage(StageName::CoveragePolicyQuery)
            .unwrap()
            .coverage()
            .unwrap();

        assert!(coverage.covered);
        assert_eq!(coverage.endorsement.as_deref(), Some("PP 03 06"));
        assert_eq!(coverage.exclusion, None);
        assert_eq!(decision.determination, Determination::Approved);
        assert_eq!(decision.recommended_payout.amount(), dec!(2500));
    }

    #[tokio::test]
    async fn test_coverage_queries_are_scoped_and_foreign_snippets_dropped() {
        let own = PolicyNumber::new("CAPA-781234").unwrap();
        let retriever = Arc::new(StaticRetriever::new().with_snippets([
            PolicySnippet::new("pp0306-own", "Commercial use endorsement covers pizza delivery")
                .for_policy(&own),
            PolicySnippet::new(
                "pp0306-foreign",
                "Commercial use endorsement covers pizza delivery",
            )
            .for_policy(&PolicyNumber::new("CAPA-999999").unwrap()),
        ]));
        let resolver = resolver().with_retriever(retriever.clone());
        let pipeline = ClaimPipeline::new(resolver, no_backoff());

        let decision = pipeline.process_value(pizza_delivery_claim()).await.unwrap();
        let coverage = decision
            .stage(StageName::CoveragePolicyQuery)
            .unwrap()
            .coverage()
            .unwrap();

        assert_eq!(coverage.queries.len(), 5);
        assert!(coverage.evidence.contains(&"pp0306-own".to_string()));
        assert!(!coverage.evidence.contains(&"pp0306-foreign".to_string()));
        assert!(retriever
            .queries()
            .iter()
            .all(|q| q.policy_number.as_ref() == Some(&own)));
    }

    #[tokio::test]
    async fn test_retrieval_outage_uses_local_declarations() {
        let retriever = Arc::new(StaticRetriever::new().unavailable());
        let resolver = resolver().with_retriever(retriever);
        let pipeline = ClaimPipeline::new(resolver, no_backoff());

        let decision = pipeline.process_value(pizza_delivery_claim()).await.unwrap();
        let stage = decision.stage(StageName::CoveragePolicyQuery).unwrap();
        assert!(stage.coverage().unwrap().covered);
        assert!(stage.rationale.contains("local declarations used"));
    }
}

// ============================================================================
// Fraud Guard Tests
// ============================================================================

mod fraud_tests {
    use super::*;

    #[tokio::test]
    async fn test_high_risk_approval_is_downgraded_for_review() {
        let decision = pipeline().process_value(suspicious_claim()).await.unwrap();

        let fraud = decision.stage(StageName::FraudRadar).unwrap().fraud().unwrap();
        assert!(fraud.risk_score > dec!(0.5));
        for flag in ["late-reporting", "high-value-claim", "sparse-narrative", "early-policy-loss"] {
            assert!(fraud.flags.contains(&flag.to_string()), "missing {flag}");
        }

        assert_eq!(decision.determination, Determination::Partial);
        assert!(decision.review_required);
        assert_eq!(decision.recommended_payout.amount(), dec!(21500));
    }

    #[tokio::test]
    async fn test_guard_applies_to_collaborator_settlement() {
        let client = Arc::new(MockReasoningClient::new().with_reply(
            StageName::SettlementRecommendation,
            MockReply::json(json!({
                "determination": "approved",
                "recommended_payout": 21500,
                "rationale": "Repair estimate supported",
            })),
        ));

        let decision = pipeline_with(&client).process_value(suspicious_claim()).await.unwrap();
        let settlement = decision.stage(StageName::SettlementRecommendation).unwrap();

        assert!(matches!(settlement.source, StageSource::Collaborator { .. }));
        assert_eq!(decision.determination, Determination::Partial);
        assert!(decision.review_required);
    }

    #[tokio::test]
    async fn test_collaborator_midpoint_score_trips_guard_and_flags_are_unique() {
        let client = Arc::new(MockReasoningClient::new().with_reply(
            StageName::FraudRadar,
            MockReply::json(json!({
                "risk_score": 0.505,
                "flags": ["Prior Claims", "inconsistent-story", "prior_claims"],
            })),
        ));

        let decision = pipeline_with(&client).process_value(rear_end_claim()).await.unwrap();
        let fraud = decision.stage(StageName::FraudRadar).unwrap().fraud().unwrap();

        assert_eq!(fraud.risk_score, dec!(0.51));
        assert_eq!(fraud.flags, vec!["prior-claims", "inconsistent-story"]);
        assert_eq!(decision.determination, Determination::Partial);
        assert!(decision.review_required);
        assert_eq!(decision.recommended_payout.amount(), dec!(2700));
    }
}

// ============================================================================
// Collaborator Path Tests
// ============================================================================

mod collaborator_tests {
    use super::*;

    #[tokio::test]
    async fn test_valid_answer_is_used() {
        let client = Arc::new(MockReasoningClient::new().with_reply(
            StageName::FnolIntelligence,
            MockReply::content(
                "```json\n{\"severity\": \"high\", \"next_actions\": [\"Call the claimant\"], \
                 \"rationale\": \"Frame damage likely\"}\n```",
            ),
        ));

        let decision = pipeline_with(&client).process_value(rear_end_claim()).await.unwrap();
        let fnol = decision.stage(StageName::FnolIntelligence).unwrap();

        assert_eq!(
            fnol.source,
            StageSource::Collaborator {
                name: "mock-reasoner".to_string()
            }
        );
        assert_eq!(fnol.fnol().unwrap().severity, Severity::High);
        assert_eq!(fnol.rationale, "Frame damage likely");
    }

    #[tokio::test]
    async fn test_requests_are_least_privilege() {
        let client = Arc::new(MockReasoningClient::new());
        pipeline_with(&client).process_value(rear_end_claim()).await.unwrap();

        let requests = client.requests();
        assert_eq!(requests.len(), 5);
        for request in requests {
            let context = request.context.to_string();
            assert!(!context.contains("Alice Johnson"), "{} leaked the claimant", request.stage);
            assert!(!context.contains("claimant_name"));
        }
    }

    #[tokio::test]
    async fn test_unscripted_stage_falls_back_unavailable() {
        let client = Arc::new(MockReasoningClient::new());
        let decision = pipeline_with(&client).process_value(rear_end_claim()).await.unwrap();

        for stage in &decision.stages {
            assert_eq!(
                stage.source,
                StageSource::Fallback {
                    reason: FallbackReason::CollaboratorUnavailable
                }
            );
        }
        // Non-transient failures are not retried
        assert_eq!(client.requests().len(), 5);
        assert_eq!(decision.recommended_payout.amount(), dec!(2700));
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_schema_mismatch() {
        let client = Arc::new(MockReasoningClient::new().with_reply(
            StageName::FraudRadar,
            MockReply::json(json!({ "risk_score": 1.7, "flags": [] })),
        ));

        let decision = pipeline_with(&client).process_value(rear_end_claim()).await.unwrap();
        let fraud = decision.stage(StageName::FraudRadar).unwrap();

        assert_eq!(
            fraud.source,
            StageSource::Fallback {
                reason: FallbackReason::SchemaMismatch
            }
        );
        assert!(fraud.rationale.contains("[fallback: schema-mismatch"));
        assert_eq!(fraud.fraud().unwrap().risk_score, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_once() {
        let client = Arc::new(
            MockReasoningClient::new()
                .with_reply(StageName::FraudRadar, MockReply::Unavailable)
                .with_reply(
                    StageName::FraudRadar,
                    MockReply::json(json!({ "risk_score": 0.1, "flags": ["Minor Inconsistency"] })),
                ),
        );

        let decision = pipeline_with(&client).process_value(rear_end_claim()).await.unwrap();
        let fraud = decision.stage(StageName::FraudRadar).unwrap();

        assert!(matches!(fraud.source, StageSource::Collaborator { .. }));
        assert_eq!(fraud.fraud().unwrap().flags, vec!["minor-inconsistency"]);
        assert_eq!(client.requests_for(StageName::FraudRadar).len(), 2);
    }

    #[tokio::test]
    async fn test_second_transient_failure_falls_back() {
        let client = Arc::new(
            MockReasoningClient::new()
                .with_reply(StageName::SmartTriage, MockReply::Unavailable)
                .with_reply(StageName::SmartTriage, MockReply::Unavailable)
                .with_reply(StageName::SmartTriage, MockReply::content("{}")),
        );

        let decision = pipeline_with(&client).process_value(rear_end_claim()).await.unwrap();
        let triage = decision.stage(StageName::SmartTriage).unwrap();

        assert_eq!(
            triage.source,
            StageSource::Fallback {
                reason: FallbackReason::CollaboratorUnavailable
            }
        );
        assert_eq!(client.requests_for(StageName::SmartTriage).len(), 2);
        assert_eq!(client.remaining_replies(), 1);
    }

    #[tokio::test]
    async fn test_answer_contradicting_tie_break_is_rejected() {
        let client = Arc::new(MockReasoningClient::new().with_reply(
            StageName::CoveragePolicyQuery,
            MockReply::json(json!({
                "covered": false,
                "policy_section": "PART D - COLLISION COVERAGE",
                "exclusion": "Vehicle used for delivery",
            })),
        ));

        let decision = pipeline_with(&client).process_value(pizza_delivery_claim()).await.unwrap();
        let coverage = decision.stage(StageName::CoveragePolicyQuery).unwrap();

        assert_eq!(
            coverage.source,
            StageSource::Fallback {
                reason: FallbackReason::SchemaMismatch
            }
        );
        assert!(coverage.coverage().unwrap().covered);
        assert_ne!(decision.determination, Determination::Denied);
    }

    #[tokio::test]
    async fn test_answer_with_wrong_deductible_is_rejected() {
        let client = Arc::new(MockReasoningClient::new().with_reply(
            StageName::CoveragePolicyQuery,
            MockReply::json(json!({
                "covered": true,
                "policy_section": "PART D - COLLISION COVERAGE",
                "deductible": 0,
            })),
        ));

        let decision = pipeline_with(&client).process_value(rear_end_claim()).await.unwrap();
        let coverage = decision.stage(StageName::CoveragePolicyQuery).unwrap();

        assert_eq!(
            coverage.source,
            StageSource::Fallback {
                reason: FallbackReason::SchemaMismatch
            }
        );
        assert_eq!(coverage.coverage().unwrap().deductible.amount(), dec!(500));
        assert_eq!(decision.recommended_payout.amount(), dec!(2700));
    }

    #[tokio::test]
    async fn test_answer_citing_endorsement_keeps_tie_break() {
        let client = Arc::new(MockReasoningClient::new().with_reply(
            StageName::CoveragePolicyQuery,
            MockReply::json(json!({
                "covered": true,
                "policy_section": "PP 03 06 Commercial Use Endorsement",
                "deductible": 1000,
                "rationale": "Delivery is a covered activity",
            })),
        ));

        let decision = pipeline_with(&client).process_value(pizza_delivery_claim()).await.unwrap();
        let coverage = decision.stage(StageName::CoveragePolicyQuery).unwrap();

        assert!(matches!(coverage.source, StageSource::Collaborator { .. }));
        assert!(coverage.rationale.contains("Tie-break:"));
        assert_eq!(coverage.coverage().unwrap().recommended_payout.amount(), dec!(3500));
    }
}

// ============================================================================
// Cancellation Tests
// ============================================================================

mod cancellation_tests {
    use super::*;

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();

        let err = pipeline()
            .process_with_cancellation(load(rear_end_claim()), &token)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_inflight_call() {
        let client = Arc::new(
            MockReasoningClient::new().with_reply(StageName::FnolIntelligence, MockReply::Hang),
        );
        let pipeline = pipeline_with(&client);
        let token = CancellationToken::new();
        token.cancel_after(Duration::from_millis(20));

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            pipeline.process_with_cancellation(load(rear_end_claim()), &token),
        )
        .await
        .expect("cancellation should end the hung call");

        match result {
            Err(PipelineError::Cancelled(at)) => assert_eq!(at, "fnol_intelligence"),
            other => panic!("expected cancellation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pipeline_shared_across_tasks() {
        let pipeline = Arc::new(pipeline());
        let handles: Vec<_> = [rear_end_claim(), pizza_delivery_claim(), courier_claim()]
            .into_iter()
            .map(|claim| {
                let pipeline = pipeline.clone();
                tokio::spawn(async move { pipeline.process_value(claim).await })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
    }
}

// ============================================================================
// Decision Formatter Tests
// ============================================================================

mod formatter_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_stage_is_incomplete() {
        let decision = pipeline().process_value(rear_end_claim()).await.unwrap();
        let context = context_for(ALICE_DECLARATIONS);
        let mut stages = decision.stages.clone();
        stages.pop();

        let err = DecisionFormatter::format(decision.claim.clone(), &context, stages).unwrap_err();
        assert!(matches!(err, PipelineError::Incomplete(_)));
    }

    #[tokio::test]
    async fn test_out_of_order_stages_are_incomplete() {
        let decision = pipeline().process_value(rear_end_claim()).await.unwrap();
        let context = context_for(ALICE_DECLARATIONS);
        let mut stages = decision.stages.clone();
        stages.swap(0, 1);

        let err = DecisionFormatter::format(decision.claim.clone(), &context, stages).unwrap_err();
        assert!(matches!(err, PipelineError::Incomplete(_)));
    }

    #[tokio::test]
    async fn test_state_tracks_next_stage_in_order() {
        let decision = pipeline().process_value(rear_end_claim()).await.unwrap();
        let mut state = PipelineState::new(decision.claim.clone(), context_for(ALICE_DECLARATIONS));

        for (expected, result) in StageName::ORDER.iter().zip(decision.stages.clone()) {
            assert_eq!(state.next_stage(), Some(*expected));
            state = state.with_result(result);
        }
        assert_eq!(state.next_stage(), None);
    }

    #[tokio::test]
    async fn test_decision_serializes_with_rationales() {
        let decision = pipeline().process_value(rear_end_claim()).await.unwrap();
        let json = serde_json::to_value(&decision).unwrap();

        assert_eq!(json["determination"], "approved");
        assert_eq!(json["stages"].as_array().unwrap().len(), 5);
        assert_eq!(json["stages"][0]["stage"], "fnol_intelligence");
        assert_eq!(json["stages"][0]["source"]["kind"], "fallback");
        assert!(json["stages"][4]["rationale"].as_str().unwrap().contains("2700"));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn fraud_fallback(amount: u32, lag: i64, words: usize) -> domain_adjudication::FraudAssessment {
        let date_of_loss = chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let reported = date_of_loss + chrono::Duration::days(lag);
        let claim = load(json!({
            "claim_number": "CLM-PROP",
            "policy_number": "CAPA-100200",
            "claimant_name": "Prop Test",
            "date_of_loss": date_of_loss.to_string(),
            "reported_date": reported.to_string(),
            "loss_description": vec!["dented"; words.max(1)].join(" "),
            "estimated_repair_cost": amount,
        }));
        let state = PipelineState::new(claim, context_for(ALICE_DECLARATIONS));
        let evidence = StageEvidence::default();
        let verdict = FraudStage::new(PipelineConfig::default()).fallback(StageInput {
            state: &state,
            evidence: &evidence,
        });
        match verdict.outcome {
            domain_adjudication::StageOutcome::Fraud(assessment) => assessment,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn fraud_score_is_bounded(amount in 0u32..200_000, lag in -30i64..400, words in 1usize..20) {
            let assessment = fraud_fallback(amount, lag, words);
            prop_assert!(assessment.risk_score >= Decimal::ZERO);
            prop_assert!(assessment.risk_score <= Decimal::ONE);
            prop_assert!(assessment.flags.iter().all(|f| f.chars().all(|c| c.is_ascii_lowercase() || c == '-')));
        }

        #[test]
        fn fraud_fallback_is_idempotent(amount in 0u32..200_000, lag in -30i64..400, words in 1usize..20) {
            prop_assert_eq!(fraud_fallback(amount, lag, words), fraud_fallback(amount, lag, words));
        }
    }
}
