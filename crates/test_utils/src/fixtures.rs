//! Pre-built Test Fixtures
//!
//! Two policies and the claims that exercise them:
//!
//! - `CAPA-781234` (John Smith) carries the PP 03 06 commercial use
//!   endorsement for food and pizza delivery with a $1,000 deductible
//! - `CAPA-100200` (Alice Johnson) is a plain personal auto policy with a
//!   $500 collision deductible

use std::path::Path;

use serde_json::{json, Value};
use tempfile::TempDir;

use core_kernel::PolicyNumber;

pub const JOHN_POLICY: &str = "CAPA-781234";
pub const ALICE_POLICY: &str = "CAPA-100200";

/// Declarations for the endorsed delivery driver
pub const JOHN_DECLARATIONS: &str = "\
PERSONAL AUTO POLICY DECLARATIONS
Policy Number: CAPA-781234
Named Insured: John Smith
Policy Period: 2025-01-01 to 2025-12-31

SCHEDULED VEHICLES
- 2021 Honda Civic VIN 2HGFC2F59MH000001

COVERAGES AND PREMIUMS
Bodily Injury Liability | Limit: $100,000/$300,000 | Premium: $520
Collision | Limit: Actual Cash Value | Deductible: $500 | Premium: $412
Comprehensive | Limit: Actual Cash Value | Deductible: $250 | Premium: $188

FORMS AND ENDORSEMENTS
- PP 03 06 Commercial Use Endorsement

COMMERCIAL USE ENDORSEMENT
Form: PP 03 06
Covered Activities: food delivery, pizza delivery
Deductible: $1,000
";

/// Declarations for the plain personal policy
pub const ALICE_DECLARATIONS: &str = "\
PERSONAL AUTO POLICY DECLARATIONS
Policy Number: CAPA-100200
Named Insured: Alice Johnson
Policy Period: 2025-03-01 to 2026-02-28

COVERAGES AND PREMIUMS
Collision | Limit: Actual Cash Value | Deductible: $500 | Premium: $390
";

pub struct PolicyFixtures;

impl PolicyFixtures {
    pub fn john() -> PolicyNumber {
        PolicyNumber::new(JOHN_POLICY).expect("fixture policy number")
    }

    pub fn alice() -> PolicyNumber {
        PolicyNumber::new(ALICE_POLICY).expect("fixture policy number")
    }

    /// Writes both declarations pages into `dir`
    pub fn write_declarations(dir: &Path) {
        std::fs::write(dir.join("john.md"), JOHN_DECLARATIONS).expect("write john declarations");
        std::fs::write(dir.join("alice.md"), ALICE_DECLARATIONS).expect("write alice declarations");
    }

    /// A temporary declarations directory holding both policies
    pub fn declarations_dir() -> TempDir {
        let dir = TempDir::new().expect("create declarations dir");
        Self::write_declarations(dir.path());
        dir
    }
}

pub struct ClaimFixtures;

impl ClaimFixtures {
    /// Ordinary personal collision: $3,200 less $500 = $2,700 approved
    pub fn rear_end() -> Value {
        json!({
            "claim_number": "CLM-2025-0001",
            "policy_number": ALICE_POLICY,
            "claimant_name": "Alice Johnson",
            "date_of_loss": "2025-06-15",
            "reported_date": "2025-06-16",
            "loss_description": "Rear-ended at a stop light by another vehicle on Main Street",
            "estimated_repair_cost": 3200,
        })
    }

    /// Endorsed delivery loss: $4,500 less the $1,000 endorsement deductible
    pub fn pizza_delivery() -> Value {
        json!({
            "claim_number": "CLM-2025-0002",
            "policy_number": JOHN_POLICY,
            "claimant_name": "John Smith",
            "date_of_loss": "2025-07-10",
            "reported_date": "2025-07-11",
            "loss_description": "Collided with a parked van while delivering pizzas for Tony's Pizzeria",
            "estimated_repair_cost": 4500,
        })
    }

    /// Commercial activity with no endorsement: excluded
    pub fn courier() -> Value {
        json!({
            "claim_number": "CLM-2025-0003",
            "policy_number": ALICE_POLICY,
            "claimant_name": "Alice Johnson",
            "date_of_loss": "2025-06-20",
            "loss_description": "Backed into a pole while delivering packages for a courier service",
            "estimated_repair_cost": 2800,
        })
    }

    /// Late, high-value, sparse and soon after inception
    pub fn suspicious() -> Value {
        json!({
            "claim_number": "CLM-2025-0004",
            "policy_number": ALICE_POLICY,
            "claimant_name": "Alice Johnson",
            "date_of_loss": "2025-03-10",
            "reported_date": "2025-05-20",
            "loss_description": "Car damaged.",
            "estimated_repair_cost": 22000,
        })
    }

    /// A claim against a policy no store knows
    pub fn unknown_policy() -> Value {
        let mut claim = Self::rear_end();
        claim["policy_number"] = json!("CAPA-000000");
        claim
    }

    /// Writes `claim` to `dir/name` and returns the path
    pub fn write(dir: &Path, name: &str, claim: &Value) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, claim.to_string()).expect("write claim fixture");
        path
    }
}
