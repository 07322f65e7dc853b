//! Test Data Builders
//!
//! Builders let a test state only the fields it cares about; everything
//! else defaults to an ordinary personal collision claim.

use serde_json::{json, Map, Value};

use crate::fixtures::ALICE_POLICY;

/// Builder for claim documents as submitted to the loader
pub struct ClaimJsonBuilder {
    fields: Map<String, Value>,
}

impl Default for ClaimJsonBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimJsonBuilder {
    /// Creates a builder with every required field present
    pub fn new() -> Self {
        let mut fields = Map::new();
        fields.insert("claim_number".into(), json!("CLM-TEST-0001"));
        fields.insert("policy_number".into(), json!(ALICE_POLICY));
        fields.insert("claimant_name".into(), json!("Alice Johnson"));
        fields.insert("date_of_loss".into(), json!("2025-06-15"));
        fields.insert(
            "loss_description".into(),
            json!("Rear-ended at a stop light by another vehicle on Main Street"),
        );
        fields.insert("estimated_repair_cost".into(), json!(3200));
        Self { fields }
    }

    pub fn claim_number(self, value: &str) -> Self {
        self.with("claim_number", json!(value))
    }

    pub fn policy_number(self, value: &str) -> Self {
        self.with("policy_number", json!(value))
    }

    pub fn date_of_loss(self, value: &str) -> Self {
        self.with("date_of_loss", json!(value))
    }

    pub fn reported_date(self, value: &str) -> Self {
        self.with("reported_date", json!(value))
    }

    pub fn description(self, value: &str) -> Self {
        self.with("loss_description", json!(value))
    }

    pub fn repair_cost(self, value: u64) -> Self {
        self.with("estimated_repair_cost", json!(value))
    }

    pub fn usage_type(self, value: &str) -> Self {
        self.with("usage_type", json!(value))
    }

    /// Sets an arbitrary field, including unknown or malformed ones
    pub fn with(mut self, field: &str, value: Value) -> Self {
        self.fields.insert(field.to_string(), value);
        self
    }

    pub fn without(mut self, field: &str) -> Self {
        self.fields.remove(field);
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Builder for declarations pages in the text format the parser reads
pub struct DeclarationsTextBuilder {
    policy_number: String,
    named_insured: String,
    period: String,
    coverages: Vec<String>,
    endorsements: Vec<String>,
    commercial_block: Option<String>,
}

impl DeclarationsTextBuilder {
    pub fn new(policy_number: &str) -> Self {
        Self {
            policy_number: policy_number.to_string(),
            named_insured: "Test Insured".to_string(),
            period: "2025-01-01 to 2025-12-31".to_string(),
            coverages: Vec::new(),
            endorsements: Vec::new(),
            commercial_block: None,
        }
    }

    pub fn named_insured(mut self, name: &str) -> Self {
        self.named_insured = name.to_string();
        self
    }

    pub fn period(mut self, period: &str) -> Self {
        self.period = period.to_string();
        self
    }

    /// Adds an actual-cash-value coverage line
    pub fn coverage(mut self, label: &str, deductible: u32) -> Self {
        self.coverages.push(format!(
            "{} | Limit: Actual Cash Value | Deductible: ${}",
            label, deductible
        ));
        self
    }

    /// Lists an endorsement form, e.g. `PP 03 06 Commercial Use Endorsement`
    pub fn endorsement(mut self, item: &str) -> Self {
        self.endorsements.push(item.to_string());
        self
    }

    /// Adds the commercial use block that names activities and a deductible
    pub fn commercial_use(mut self, form: &str, activities: &[&str], deductible: u32) -> Self {
        self.commercial_block = Some(format!(
            "COMMERCIAL USE ENDORSEMENT\nForm: {}\nCovered Activities: {}\nDeductible: ${}\n",
            form,
            activities.join(", "),
            deductible
        ));
        self
    }

    pub fn build(self) -> String {
        let mut text = format!(
            "PERSONAL AUTO POLICY DECLARATIONS\nPolicy Number: {}\nNamed Insured: {}\nPolicy Period: {}\n",
            self.policy_number, self.named_insured, self.period
        );
        if !self.coverages.is_empty() {
            text.push_str("\nCOVERAGES AND PREMIUMS\n");
            for line in &self.coverages {
                text.push_str(line);
                text.push('\n');
            }
        }
        if !self.endorsements.is_empty() {
            text.push_str("\nFORMS AND ENDORSEMENTS\n");
            for item in &self.endorsements {
                text.push_str("- ");
                text.push_str(item);
                text.push('\n');
            }
        }
        if let Some(block) = self.commercial_block {
            text.push('\n');
            text.push_str(&block);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_claims::ClaimLoader;
    use domain_policy::DeclarationsParser;

    #[test]
    fn test_default_claim_loads() {
        let claim = ClaimLoader::from_value(ClaimJsonBuilder::new().build()).unwrap();
        assert_eq!(claim.claim_number.as_str(), "CLM-TEST-0001");
    }

    #[test]
    fn test_without_field_is_rejected() {
        let err = ClaimLoader::from_value(ClaimJsonBuilder::new().without("date_of_loss").build())
            .unwrap_err();
        assert_eq!(err.field(), Some("date_of_loss"));
    }

    #[test]
    fn test_declarations_text_parses() {
        let text = DeclarationsTextBuilder::new("CAPA-424242")
            .named_insured("Dana Reyes")
            .coverage("Collision", 750)
            .endorsement("PP 03 06 Commercial Use Endorsement")
            .commercial_use("PP 03 06", &["grocery delivery"], 1000)
            .build();

        let declarations = DeclarationsParser::parse(&text).unwrap();
        assert_eq!(declarations.named_insured, "Dana Reyes");
        assert!(declarations.has_commercial_use_endorsement());
    }
}
