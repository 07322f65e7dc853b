//! Policy declarations
//!
//! The declarations page is the per-policy summary of who is insured, what
//! vehicles are scheduled, which coverages were bought and which endorsement
//! forms amend the base policy. Once parsed it is read-only.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::PolicyNumber;

use crate::coverage::{Coverage, CoverageType};
use crate::endorsement::Endorsement;

/// Inclusive policy term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PolicyPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Days from inception to `date`; negative before inception
    pub fn days_since_inception(&self, date: NaiveDate) -> i64 {
        (date - self.start).num_days()
    }
}

/// Lienholder or lessor with an interest in a scheduled vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LossPayee {
    pub name: String,
    pub details: Option<String>,
}

/// A parsed declarations page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDeclarations {
    pub policy_number: PolicyNumber,
    pub named_insured: String,
    pub policy_period: Option<PolicyPeriod>,
    pub vehicles: Vec<String>,
    pub coverages: Vec<Coverage>,
    pub discounts: Vec<String>,
    pub endorsements: Vec<Endorsement>,
    pub loss_payee: Option<LossPayee>,
    pub special_provisions: Vec<String>,
    /// Source text the declarations were parsed from
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub raw_text: String,
}

impl PolicyDeclarations {
    /// Creates declarations with nothing scheduled
    pub fn new(policy_number: PolicyNumber, named_insured: impl Into<String>) -> Self {
        Self {
            policy_number,
            named_insured: named_insured.into(),
            policy_period: None,
            vehicles: Vec::new(),
            coverages: Vec::new(),
            discounts: Vec::new(),
            endorsements: Vec::new(),
            loss_payee: None,
            special_provisions: Vec::new(),
            raw_text: String::new(),
        }
    }

    /// The purchased coverage of the given type, if any
    pub fn coverage(&self, coverage_type: CoverageType) -> Option<&Coverage> {
        self.coverages
            .iter()
            .find(|c| c.coverage_type == coverage_type)
    }

    pub fn has_coverage(&self, coverage_type: CoverageType) -> bool {
        self.coverage(coverage_type).is_some()
    }

    /// Commercial-use endorsements on the policy
    pub fn commercial_endorsements(&self) -> impl Iterator<Item = &Endorsement> {
        self.endorsements.iter().filter(|e| e.is_commercial_use())
    }

    pub fn has_commercial_use_endorsement(&self) -> bool {
        self.commercial_endorsements().next().is_some()
    }

    /// True when the date falls within the policy term
    ///
    /// A policy with no recorded term is treated as in force.
    pub fn in_force_on(&self, date: NaiveDate) -> bool {
        self.policy_period
            .map(|period| period.contains(date))
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_bounds_are_inclusive() {
        let period = PolicyPeriod::new(date(2025, 1, 1), date(2025, 12, 31));
        assert!(period.contains(date(2025, 1, 1)));
        assert!(period.contains(date(2025, 12, 31)));
        assert!(!period.contains(date(2026, 1, 1)));
        assert_eq!(period.days_since_inception(date(2025, 1, 11)), 10);
    }

    #[test]
    fn test_no_period_is_in_force() {
        let declarations =
            PolicyDeclarations::new(PolicyNumber::new("P-1").unwrap(), "Alice Johnson");
        assert!(declarations.in_force_on(date(1999, 1, 1)));
        assert!(!declarations.has_commercial_use_endorsement());
    }
}
