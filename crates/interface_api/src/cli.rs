//! `claim-decide` command line
//!
//! Runs claim documents through the pipeline and prints one decision per
//! claim. Collaborators are configured from the same `CLAIMS_` environment
//! as the server; the declarations directory comes from the command line.

use std::fmt::Write as _;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::{error, info};

use domain_adjudication::{ClaimDecision, ClaimPipeline};

/// Decide auto insurance claims from the command line
#[derive(Parser, Debug)]
#[command(
    name = "claim-decide",
    about = "Run auto insurance claims through the adjudication pipeline",
    version,
    long_about = "Loads each claim document, resolves its policy declarations and runs \
                  the five adjudication stages, printing one decision per claim.\n\n\
                  Examples:\n  \
                  claim-decide data/john.json --declarations data/declarations\n  \
                  claim-decide data/*.json -d data/declarations --format json"
)]
pub struct CliArgs {
    #[arg(value_name = "CLAIM", required = true, help = "Claim JSON documents to decide")]
    pub claims: Vec<PathBuf>,

    #[arg(
        short = 'd',
        long,
        value_name = "DIR",
        help = "Directory of declarations documents (defaults to CLAIMS_DECLARATIONS_DIR)"
    )]
    pub declarations: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(long, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Human,
    Json,
}

/// Renders a decision the way the demo report reads
pub fn render_human(decision: &ClaimDecision) -> String {
    let claim = &decision.claim;
    let mut out = String::new();
    let _ = writeln!(out, "Claim Number: {}", claim.claim_number);
    let _ = writeln!(out, "Claimant: {}", claim.claimant_name);
    let _ = writeln!(out, "Policy: {} ({})", decision.policy.policy_number, decision.policy.named_insured);
    let _ = writeln!(out, "Claimed: {}", claim.claimed_amount);
    let _ = writeln!(out, "Results:");
    let _ = writeln!(out, "  Determination: {}", decision.determination.as_str().to_uppercase());
    let _ = writeln!(
        out,
        "  Coverage: {}",
        if decision.covered { "COVERED" } else { "NOT COVERED" }
    );
    let _ = writeln!(out, "  Deductible: {}", decision.deductible);
    let _ = writeln!(out, "  Payout: {}", decision.recommended_payout);
    let _ = writeln!(out, "  Fraud risk: {}", decision.fraud_risk_score);
    if decision.review_required {
        let _ = writeln!(out, "  Review required: SIU");
    }
    for note in &decision.notes {
        let _ = writeln!(out, "  Note: {}", note);
    }
    let _ = writeln!(out, "Stages:");
    for result in &decision.stages {
        let _ = writeln!(out, "  {} [{}]: {}", result.stage, result.source, result.rationale);
    }
    out
}

/// Decides every claim in order and returns the process exit code
///
/// A claim that fails is reported and the remaining claims still run; the
/// exit code is 1 if any claim failed.
pub async fn run(pipeline: &ClaimPipeline, args: &CliArgs) -> i32 {
    let mut failures = 0usize;
    let mut decisions = Vec::new();

    for path in &args.claims {
        match pipeline.process_path(path).await {
            Ok(decision) => {
                info!(
                    path = %path.display(),
                    determination = %decision.determination,
                    "Claim decided"
                );
                if args.format == OutputFormatArg::Human {
                    println!("Processing: {}", path.display());
                    println!("{}", render_human(&decision));
                }
                decisions.push(decision);
            }
            Err(e) => {
                failures += 1;
                error!(path = %path.display(), error = %e, "Claim could not be decided");
                eprintln!("Error processing {}: {}", path.display(), e);
            }
        }
    }

    if args.format == OutputFormatArg::Json {
        match serde_json::to_string_pretty(&decisions) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize decisions: {}", e);
                return 1;
            }
        }
    }

    if failures > 0 {
        1
    } else {
        0
    }
}
