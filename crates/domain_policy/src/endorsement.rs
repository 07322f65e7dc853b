//! Policy endorsements
//!
//! An endorsement amends the base personal auto form. The one the claim
//! pipeline cares about is the commercial-use endorsement, which restores
//! coverage for named business activities that the base form excludes.

use serde::{Deserialize, Serialize};

use core_kernel::Money;

use crate::coverage::CoverageType;

/// Broad classification of an endorsement form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndorsementKind {
    /// Extends coverage to business or for-hire use of the vehicle
    CommercialUse,
    /// Any other amendment
    Other,
}

impl EndorsementKind {
    /// Classifies a form by its title
    pub fn from_title(title: &str) -> Self {
        let title = title.to_ascii_lowercase();
        if title.contains("commercial use")
            || title.contains("business use")
            || title.contains("delivery")
            || title.contains("rideshare")
        {
            EndorsementKind::CommercialUse
        } else {
            EndorsementKind::Other
        }
    }
}

/// An endorsement attached to a policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endorsement {
    /// Form number, e.g. `PP 03 06`
    pub form_number: String,
    /// Form title as printed
    pub title: String,
    pub kind: EndorsementKind,
    /// Activities the endorsement covers, lowercased
    pub covered_activities: Vec<String>,
    /// Coverages the endorsement amends; empty means all physical damage
    pub applies_to: Vec<CoverageType>,
    /// Deductible that replaces the declared one for endorsed losses
    pub deductible_override: Option<Money>,
    /// Limit that replaces the declared one for endorsed losses
    pub limit_override: Option<Money>,
    /// Whether the endorsement lifts the for-compensation exclusion
    pub waives_exclusions: bool,
    /// Free text of the endorsement block
    pub text: String,
}

/// Longer words in an activity phrase are matched on this many leading
/// characters so that "delivery" matches "delivering".
const STEM_LEN: usize = 6;
const MIN_STEM_WORD_LEN: usize = 5;
/// Shorter words ("uber", "taxi") must appear as whole words
const MIN_WORD_LEN: usize = 3;
const STOP_WORDS: &[&str] = &["and", "any", "for", "the", "use", "with"];

impl Endorsement {
    pub fn new(form_number: impl Into<String>, title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            form_number: form_number.into(),
            kind: EndorsementKind::from_title(&title),
            title,
            covered_activities: Vec::new(),
            applies_to: Vec::new(),
            deductible_override: None,
            limit_override: None,
            waives_exclusions: true,
            text: String::new(),
        }
    }

    pub fn with_activities<I, S>(mut self, activities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.covered_activities = activities
            .into_iter()
            .map(|a| a.as_ref().trim().to_ascii_lowercase())
            .filter(|a| !a.is_empty())
            .collect();
        self
    }

    pub fn with_deductible(mut self, deductible: Money) -> Self {
        self.deductible_override = Some(deductible);
        self
    }

    pub fn is_commercial_use(&self) -> bool {
        self.kind == EndorsementKind::CommercialUse
    }

    /// Section name used when citing this endorsement
    pub fn section_name(&self) -> String {
        if self.form_number.is_empty() {
            self.title.to_ascii_uppercase()
        } else {
            format!("{} {}", self.form_number, self.title.to_ascii_uppercase())
        }
    }

    /// True when the endorsement amends the given coverage
    pub fn amends(&self, coverage: CoverageType) -> bool {
        if self.applies_to.is_empty() {
            matches!(coverage, CoverageType::Collision | CoverageType::Comprehensive)
        } else {
            self.applies_to.contains(&coverage)
        }
    }

    /// True when the narrative describes one of the covered activities
    ///
    /// An endorsement with no listed activities covers any business use.
    pub fn covers_activity(&self, narrative: &str) -> bool {
        if self.covered_activities.is_empty() {
            return true;
        }
        let narrative = narrative.to_ascii_lowercase();
        let narrative_words: Vec<&str> = words(&narrative).collect();
        self.covered_activities.iter().any(|activity| {
            words(activity)
                .filter(|word| word.len() >= MIN_WORD_LEN && !STOP_WORDS.contains(word))
                .any(|word| {
                    if word.len() >= MIN_STEM_WORD_LEN {
                        narrative.contains(&word[..word.len().min(STEM_LEN)])
                    } else {
                        narrative_words.contains(&word)
                    }
                })
        })
    }

    /// True when this endorsement restores coverage for a commercial-use loss
    pub fn applies_to_commercial_loss(&self, coverage: CoverageType, narrative: &str) -> bool {
        self.is_commercial_use()
            && self.waives_exclusions
            && self.amends(coverage)
            && self.covers_activity(narrative)
    }
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery_endorsement() -> Endorsement {
        Endorsement::new("PP 03 06", "Commercial Use Endorsement")
            .with_activities(["Food Delivery", "pizza delivery"])
    }

    #[test]
    fn test_kind_from_title() {
        assert_eq!(
            EndorsementKind::from_title("Commercial Use Endorsement"),
            EndorsementKind::CommercialUse
        );
        assert_eq!(
            EndorsementKind::from_title("Towing and Labor Costs"),
            EndorsementKind::Other
        );
    }

    #[test]
    fn test_activity_matches_inflected_narrative() {
        let endorsement = delivery_endorsement();
        assert!(endorsement.covers_activity("While delivering pizzas I rear-ended a car"));
        assert!(!endorsement.covers_activity("Driving a rideshare passenger downtown"));
    }

    #[test]
    fn test_short_activity_names_match_whole_words() {
        let endorsement = Endorsement::new("PP 03 06", "Commercial Use Endorsement")
            .with_activities(["Uber", "Lyft", "taxi service"]);
        assert!(endorsement.covers_activity("Rear-ended while driving for Uber with a passenger"));
        assert!(endorsement.covers_activity("Picked up a fare as a taxi downtown"));
        assert!(!endorsement.covers_activity("Hit a tuber truck while delivering groceries"));
        assert!(!endorsement.covers_activity("Delivering food for a restaurant"));
    }

    #[test]
    fn test_not_waiving_endorsement_does_not_apply() {
        let mut endorsement = delivery_endorsement();
        endorsement.waives_exclusions = false;
        assert!(!endorsement.applies_to_commercial_loss(
            CoverageType::Collision,
            "delivering pizzas"
        ));
    }

    #[test]
    fn test_section_name() {
        assert_eq!(
            delivery_endorsement().section_name(),
            "PP 03 06 COMMERCIAL USE ENDORSEMENT"
        );
    }
}
