//! Claim record

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{ClaimNumber, Money, PolicyNumber};

/// How the vehicle was being used at the time of loss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageType {
    /// Private passenger use
    #[default]
    Personal,
    /// Carrying persons or property for compensation, deliveries, business use
    Commercial,
}

impl UsageType {
    /// Accepted spellings, used in validation messages
    pub const ACCEPTED: &'static [&'static str] = &["personal", "commercial"];

    pub fn as_str(&self) -> &'static str {
        match self {
            UsageType::Personal => "personal",
            UsageType::Commercial => "commercial",
        }
    }
}

impl fmt::Display for UsageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UsageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "personal" | "private" => Ok(UsageType::Personal),
            "commercial" | "business" => Ok(UsageType::Commercial),
            other => Err(format!(
                "unknown usage type '{}', expected one of {}",
                other,
                Self::ACCEPTED.join(", ")
            )),
        }
    }
}

/// Narrative cues that a vehicle was in for-hire or business use
const COMMERCIAL_ACTIVITY_CUES: &[&str] = &[
    "delivery",
    "delivering",
    "rideshare",
    "ride-share",
    "uber",
    "lyft",
    "doordash",
    "courier",
    "for hire",
    "livery",
    "passenger fare",
];

/// A validated, immutable auto claim
///
/// Built only by [`crate::loader::ClaimLoader`]; every later stage of the
/// pipeline reads it without modification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    /// Claim number as filed
    pub claim_number: ClaimNumber,
    /// Policy the claim is filed against
    pub policy_number: PolicyNumber,
    /// Claimant identity
    pub claimant_name: String,
    /// Date the loss occurred
    pub date_of_loss: NaiveDate,
    /// Incident narrative
    pub loss_description: String,
    /// Claimed loss (estimated repair cost)
    pub claimed_amount: Money,
    /// Declared vehicle usage
    pub usage_type: UsageType,
    /// Vehicle description
    pub vehicle_details: Option<String>,
    /// Where the incident happened
    pub loss_location: Option<String>,
    /// When the loss was first reported to the carrier
    pub reported_date: Option<NaiveDate>,
}

impl ClaimRecord {
    /// True when the narrative describes for-hire or delivery activity
    pub fn indicates_commercial_activity(&self) -> bool {
        let narrative = self.loss_description.to_ascii_lowercase();
        COMMERCIAL_ACTIVITY_CUES.iter().any(|cue| narrative.contains(cue))
    }

    /// True when the vehicle was in commercial use, declared or evident
    pub fn is_commercial_use(&self) -> bool {
        self.usage_type == UsageType::Commercial || self.indicates_commercial_activity()
    }

    /// Days between the loss and its first report, if a report date is known
    ///
    /// Negative when the report predates the loss.
    pub fn reporting_lag_days(&self) -> Option<i64> {
        self.reported_date
            .map(|reported| (reported - self.date_of_loss).num_days())
    }

    /// True when the narrative contains any of the given cues
    pub fn narrative_mentions(&self, cues: &[&str]) -> bool {
        let narrative = self.loss_description.to_ascii_lowercase();
        cues.iter().any(|cue| narrative.contains(cue))
    }
}
