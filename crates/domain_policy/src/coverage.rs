//! Coverage types and value objects
//!
//! This module defines the personal auto coverages that can appear on a
//! declarations page, together with the policy form section each one maps to.

use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::Money;

/// Types of auto coverage listed on a declarations page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageType {
    /// Bodily injury and property damage liability
    Liability,
    /// Collision with another object or upset of the vehicle
    Collision,
    /// Other than collision: theft, fire, glass, weather, animals
    Comprehensive,
    /// Medical payments
    Medical,
    /// Transportation expenses / rental reimbursement
    Rental,
    /// Towing and labor costs
    Towing,
}

impl CoverageType {
    pub const ALL: [CoverageType; 6] = [
        CoverageType::Liability,
        CoverageType::Collision,
        CoverageType::Comprehensive,
        CoverageType::Medical,
        CoverageType::Rental,
        CoverageType::Towing,
    ];

    /// Policy form section for this coverage in the base personal auto policy
    pub fn base_section(&self) -> &'static str {
        match self {
            CoverageType::Liability => "PART A - LIABILITY COVERAGE",
            CoverageType::Medical => "PART B - MEDICAL PAYMENTS COVERAGE",
            CoverageType::Collision => "PART D - COLLISION COVERAGE",
            CoverageType::Comprehensive => "PART D - COMPREHENSIVE (OTHER THAN COLLISION) COVERAGE",
            CoverageType::Rental => "PART D - TRANSPORTATION EXPENSES",
            CoverageType::Towing => "PART D - TOWING AND LABOR COSTS",
        }
    }

    /// Recognizes a coverage from the label written on a declarations page
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.to_ascii_lowercase();
        if label.contains("other than collision") || label.contains("comprehensive") {
            Some(CoverageType::Comprehensive)
        } else if label.contains("collision") {
            Some(CoverageType::Collision)
        } else if label.contains("medical") {
            Some(CoverageType::Medical)
        } else if label.contains("rental") || label.contains("transportation") {
            Some(CoverageType::Rental)
        } else if label.contains("towing") || label.contains("roadside") {
            Some(CoverageType::Towing)
        } else if label.contains("liability")
            || label.contains("bodily injury")
            || label.contains("property damage")
        {
            Some(CoverageType::Liability)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageType::Liability => "liability",
            CoverageType::Collision => "collision",
            CoverageType::Comprehensive => "comprehensive",
            CoverageType::Medical => "medical",
            CoverageType::Rental => "rental",
            CoverageType::Towing => "towing",
        }
    }
}

impl fmt::Display for CoverageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coverage line from the declarations page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    /// Type of coverage
    pub coverage_type: CoverageType,
    /// Label as written on the declarations page
    pub label: String,
    /// Limit of liability; `None` means actual cash value
    pub limit: Option<Money>,
    /// Per-loss deductible, if any
    pub deductible: Option<Money>,
    /// Premium charged for the coverage
    pub premium: Option<Money>,
}

impl Coverage {
    /// Creates a coverage with no limit, deductible or premium recorded
    pub fn new(coverage_type: CoverageType, label: impl Into<String>) -> Self {
        Self {
            coverage_type,
            label: label.into(),
            limit: None,
            deductible: None,
            premium: None,
        }
    }

    pub fn with_limit(mut self, limit: Money) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_deductible(mut self, deductible: Money) -> Self {
        self.deductible = Some(deductible);
        self
    }

    /// Section of the base policy form this coverage is written under
    pub fn section(&self) -> &'static str {
        self.coverage_type.base_section()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label() {
        assert_eq!(CoverageType::from_label("Collision"), Some(CoverageType::Collision));
        assert_eq!(
            CoverageType::from_label("Other Than Collision (Comprehensive)"),
            Some(CoverageType::Comprehensive)
        );
        assert_eq!(
            CoverageType::from_label("Bodily Injury Liability"),
            Some(CoverageType::Liability)
        );
        assert_eq!(CoverageType::from_label("Uninsured Motorist"), None);
    }

    #[test]
    fn test_collision_section() {
        let coverage = Coverage::new(CoverageType::Collision, "Collision");
        assert_eq!(coverage.section(), "PART D - COLLISION COVERAGE");
    }
}
