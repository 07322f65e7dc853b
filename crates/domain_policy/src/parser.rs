//! Declarations page parser
//!
//! Declarations pages arrive as semi-structured text: labeled section headers
//! (plain, upper-case or markdown headings), `Key: value` header fields,
//! `|`-separated coverage lines or tables, bulleted endorsement lists and an
//! optional commercial-use endorsement block. The parser is line based and
//! tolerant: lines it does not recognize are skipped, and only a missing
//! policy number is fatal.
//!
//! ```text
//! Policy Number: CAPA-781234
//! Named Insured: John Smith
//! Policy Period: 2025-01-01 to 2025-12-31
//!
//! COVERAGES AND PREMIUMS
//! Collision | Limit: Actual Cash Value | Deductible: $500 | Premium: $412
//!
//! FORMS AND ENDORSEMENTS
//! - PP 03 06 Commercial Use Endorsement
//!
//! COMMERCIAL USE ENDORSEMENT
//! Form: PP 03 06
//! Covered Activities: food delivery, pizza delivery
//! Deductible: $1,000
//! ```

use chrono::NaiveDate;
use tracing::{debug, warn};

use core_kernel::{Currency, Money, PolicyNumber};

use crate::coverage::{Coverage, CoverageType};
use crate::declarations::{LossPayee, PolicyDeclarations, PolicyPeriod};
use crate::endorsement::{Endorsement, EndorsementKind};
use crate::error::PolicyError;

const BULLETS: &[&str] = &["- ", "* ", "+ ", "• "];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y"];
const PERIOD_SEPARATORS: &[&str] = &[" to ", " through ", " thru ", " - ", " – "];
const NOT_PURCHASED: &[&str] = &["not covered", "rejected", "declined", "not purchased", "excluded"];
const ABSENT_VALUES: &[&str] = &["", "none", "n/a", "na", "-", "—", "nil"];
const WAIVER_WITHHELD: &[&str] = &["does not waive", "exclusion still applies", "exclusion remains"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    NamedInsured,
    Vehicles,
    Coverages,
    Discounts,
    Endorsements,
    LossPayee,
    SpecialProvisions,
    CommercialUse,
    Other,
}

/// A source line with markdown decoration removed
struct CleanLine {
    text: String,
    heading: bool,
    bullet: bool,
}

impl CleanLine {
    fn new(raw: &str) -> Self {
        let without_bold = raw.replace("**", "");
        let trimmed = without_bold.trim();
        let heading = trimmed.starts_with('#');
        let trimmed = trimmed.trim_start_matches('#').trim();
        let (text, bullet) = BULLETS
            .iter()
            .find_map(|b| trimmed.strip_prefix(b))
            .map(|rest| (rest.trim(), true))
            .unwrap_or((trimmed, false));
        Self {
            text: text.to_string(),
            heading,
            bullet,
        }
    }

    fn is_blank(&self) -> bool {
        self.text.is_empty()
    }

    fn is_table_row(&self) -> bool {
        self.text.contains('|')
    }

    /// `Key: value` split with a lowercased key, if the line has that shape
    fn key_value(&self) -> Option<(String, &str)> {
        if self.is_table_row() {
            return None;
        }
        let (key, value) = self.text.split_once(':')?;
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        if key.is_empty() || value.is_empty() || key.split_whitespace().count() > 4 {
            return None;
        }
        Some((key, value))
    }

    fn section_header(&self, current: Section) -> Option<Section> {
        if self.bullet || self.is_blank() || self.is_table_row() {
            return None;
        }
        let colon_terminated = self.text.ends_with(':');
        if self.text.contains(':') && !colon_terminated {
            return None;
        }
        let text = self.text.trim_end_matches(':').trim();
        if !text.chars().any(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        let all_caps = !text.chars().any(|c| c.is_ascii_lowercase());
        if !(self.heading || all_caps || colon_terminated) {
            return None;
        }

        let upper = text.to_ascii_uppercase();
        let section = if upper.contains("COMMERCIAL USE ENDORSEMENT")
            || upper.contains("BUSINESS USE ENDORSEMENT")
        {
            Section::CommercialUse
        } else if upper.starts_with("FORMS")
            || upper.starts_with("POLICY FORMS")
            || upper.starts_with("ENDORSEMENTS")
        {
            Section::Endorsements
        } else if upper.starts_with("NAMED INSURED") {
            Section::NamedInsured
        } else if upper.starts_with("VEHICLE")
            || upper.starts_with("INSURED VEHICLE")
            || upper.starts_with("SCHEDULED VEHICLE")
        {
            Section::Vehicles
        } else if upper.starts_with("COVERAGE") {
            Section::Coverages
        } else if upper.starts_with("DISCOUNT") {
            Section::Discounts
        } else if upper.starts_with("LOSS PAYEE") || upper.starts_with("LIENHOLDER") {
            Section::LossPayee
        } else if upper.starts_with("SPECIAL PROVISION") {
            Section::SpecialProvisions
        } else if self.heading || colon_terminated {
            Section::Other
        } else {
            return None;
        };

        // Items of an endorsement list may themselves be upper-case form titles
        if current == Section::Endorsements
            && section == Section::CommercialUse
            && !self.heading
            && text.chars().any(|c| c.is_ascii_digit())
            && !upper.starts_with("COMMERCIAL")
        {
            return None;
        }

        Some(section)
    }
}

/// Column positions learned from a coverage table header row
#[derive(Debug, Default)]
struct CoverageColumns {
    limit: Option<usize>,
    deductible: Option<usize>,
    premium: Option<usize>,
}

#[derive(Debug, Default)]
struct CommercialBlock {
    form_number: Option<String>,
    title: Option<String>,
    activities: Vec<String>,
    applies_to: Vec<CoverageType>,
    deductible: Option<Money>,
    limit: Option<Money>,
    text: Vec<String>,
}

#[derive(Default)]
struct ParseState {
    policy_number: Option<String>,
    named_insured: Option<String>,
    policy_period: Option<PolicyPeriod>,
    vehicles: Vec<String>,
    coverages: Vec<Coverage>,
    discounts: Vec<String>,
    endorsements: Vec<Endorsement>,
    loss_payee: Vec<String>,
    special_provisions: Vec<String>,
    columns: CoverageColumns,
    commercial_blocks: Vec<CommercialBlock>,
}

/// Parses declarations page text into [`PolicyDeclarations`]
pub struct DeclarationsParser;

impl DeclarationsParser {
    /// Parses a declarations document
    ///
    /// # Errors
    ///
    /// `MalformedDeclarations` when the document carries no usable
    /// `Policy Number:` line.
    pub fn parse(text: &str) -> Result<PolicyDeclarations, PolicyError> {
        let mut state = ParseState::default();
        let mut section = Section::Preamble;

        for raw in text.lines() {
            let line = CleanLine::new(raw);
            if line.is_blank() {
                continue;
            }

            if let Some(next) = line.section_header(section) {
                if next == Section::CommercialUse {
                    state.commercial_blocks.push(CommercialBlock {
                        form_number: form_prefix(&line.text),
                        ..CommercialBlock::default()
                    });
                }
                section = next;
                continue;
            }

            if state.header_field(&line) {
                continue;
            }

            match section {
                Section::NamedInsured => {
                    if state.named_insured.is_none() {
                        let name = line
                            .key_value()
                            .filter(|(key, _)| key == "name")
                            .map(|(_, value)| value.to_string())
                            .unwrap_or_else(|| line.text.clone());
                        state.named_insured = Some(name);
                    }
                }
                Section::Vehicles => {
                    if let Some(vehicle) = list_item(&line) {
                        state.vehicles.push(vehicle);
                    }
                }
                Section::Coverages => state.coverage_line(&line),
                Section::Discounts => {
                    if let Some(discount) = list_item(&line) {
                        state.discounts.push(discount);
                    }
                }
                Section::Endorsements => {
                    if let Some(endorsement) = endorsement_item(&line.text) {
                        state.endorsements.push(endorsement);
                    }
                }
                Section::LossPayee => state.loss_payee.push(line.text.clone()),
                Section::SpecialProvisions => state.special_provisions.push(line.text.clone()),
                Section::CommercialUse => {
                    if let Some(block) = state.commercial_blocks.last_mut() {
                        block.line(&line);
                    }
                }
                Section::Preamble | Section::Other => {}
            }
        }

        state.finish(text)
    }
}

impl ParseState {
    /// Handles the header fields that may appear anywhere on the page
    fn header_field(&mut self, line: &CleanLine) -> bool {
        let Some((key, value)) = line.key_value() else {
            return false;
        };
        match key.as_str() {
            "policy number" | "policy no" | "policy no." | "policy #" => {
                self.policy_number = Some(value.to_string());
            }
            "named insured" | "insured" => {
                self.named_insured = Some(value.to_string());
            }
            "policy period" | "policy term" | "effective period" => {
                self.policy_period = parse_period(value);
                if self.policy_period.is_none() {
                    warn!(value, "Unrecognized policy period");
                }
            }
            _ => return false,
        }
        true
    }

    fn coverage_line(&mut self, line: &CleanLine) {
        if !line.is_table_row() {
            return;
        }
        let cells = table_cells(&line.text);
        if cells
            .iter()
            .all(|c| c.chars().all(|ch| matches!(ch, '-' | ':' | ' ')))
        {
            return;
        }

        let label = cells[0];
        let Some(coverage_type) = CoverageType::from_label(label) else {
            if cells.iter().skip(1).any(|c| {
                let c = c.to_ascii_lowercase();
                c.contains("limit") || c.contains("deductible")
            }) {
                self.columns = learn_columns(&cells);
            } else {
                debug!(label, "Skipping unrecognized coverage line");
            }
            return;
        };

        if cells
            .iter()
            .skip(1)
            .any(|c| NOT_PURCHASED.iter().any(|np| c.to_ascii_lowercase().contains(np)))
        {
            debug!(label, "Coverage not purchased");
            return;
        }

        let mut coverage = Coverage::new(coverage_type, label);
        for (index, cell) in cells.iter().enumerate().skip(1) {
            let (column, value) = match cell.split_once(':') {
                Some((key, value)) => (column_of(key), value.trim()),
                None => (self.columns.column_at(index), *cell),
            };
            match column {
                Some(Column::Limit) => coverage.limit = limit_amount(value),
                Some(Column::Deductible) => coverage.deductible = optional_amount(value),
                Some(Column::Premium) => coverage.premium = optional_amount(value),
                None => {}
            }
        }

        if self.coverages.iter().any(|c| c.coverage_type == coverage_type) {
            debug!(coverage = %coverage_type, "Duplicate coverage line ignored");
            return;
        }
        self.coverages.push(coverage);
    }

    fn finish(mut self, raw_text: &str) -> Result<PolicyDeclarations, PolicyError> {
        let policy_number = self
            .policy_number
            .take()
            .ok_or_else(|| PolicyError::malformed("declarations carry no Policy Number line"))?;
        let policy_number =
            PolicyNumber::new(&policy_number).map_err(|e| PolicyError::malformed(e.to_string()))?;

        for block in std::mem::take(&mut self.commercial_blocks) {
            merge_commercial_block(&mut self.endorsements, block);
        }

        let loss_payee = if self.loss_payee.is_empty() {
            None
        } else {
            let mut lines = self.loss_payee.into_iter();
            let name = lines.next().unwrap_or_default();
            let rest: Vec<String> = lines.collect();
            Some(LossPayee {
                name,
                details: (!rest.is_empty()).then(|| rest.join(", ")),
            })
        };

        let declarations = PolicyDeclarations {
            policy_number,
            named_insured: self.named_insured.unwrap_or_default(),
            policy_period: self.policy_period,
            vehicles: self.vehicles,
            coverages: self.coverages,
            discounts: self.discounts,
            endorsements: self.endorsements,
            loss_payee,
            special_provisions: self.special_provisions,
            raw_text: raw_text.to_string(),
        };

        debug!(
            policy_number = %declarations.policy_number,
            coverages = declarations.coverages.len(),
            endorsements = declarations.endorsements.len(),
            "Declarations parsed"
        );

        Ok(declarations)
    }
}

impl CommercialBlock {
    fn line(&mut self, line: &CleanLine) {
        if let Some((key, value)) = line.key_value() {
            match key.as_str() {
                "form" | "form number" | "form no" => {
                    self.form_number = Some(normalize_form(value));
                    return;
                }
                "title" => {
                    self.title = Some(value.to_string());
                    return;
                }
                "covered activities" | "activities" | "covered uses" | "permitted use" => {
                    self.activities = split_list(value);
                    return;
                }
                "applies to" | "coverages" => {
                    self.applies_to = split_list(value)
                        .iter()
                        .filter_map(|c| CoverageType::from_label(c))
                        .collect();
                    return;
                }
                "deductible" => {
                    self.deductible = optional_amount(value);
                    return;
                }
                "limit" => {
                    self.limit = limit_amount(value);
                    return;
                }
                _ => {}
            }
        }
        self.text.push(line.text.clone());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Limit,
    Deductible,
    Premium,
}

impl CoverageColumns {
    fn column_at(&self, index: usize) -> Option<Column> {
        if self.limit == Some(index) {
            Some(Column::Limit)
        } else if self.deductible == Some(index) {
            Some(Column::Deductible)
        } else if self.premium == Some(index) {
            Some(Column::Premium)
        } else {
            None
        }
    }
}

fn column_of(key: &str) -> Option<Column> {
    let key = key.trim().to_ascii_lowercase();
    if key.contains("deductible") {
        Some(Column::Deductible)
    } else if key.contains("limit") {
        Some(Column::Limit)
    } else if key.contains("premium") {
        Some(Column::Premium)
    } else {
        None
    }
}

fn learn_columns(cells: &[&str]) -> CoverageColumns {
    let mut columns = CoverageColumns::default();
    for (index, cell) in cells.iter().enumerate() {
        match column_of(cell) {
            Some(Column::Limit) => columns.limit = Some(index),
            Some(Column::Deductible) => columns.deductible = Some(index),
            Some(Column::Premium) => columns.premium = Some(index),
            None => {}
        }
    }
    columns
}

fn table_cells(text: &str) -> Vec<&str> {
    let text = text.trim();
    let text = text.strip_prefix('|').unwrap_or(text);
    let text = text.strip_suffix('|').unwrap_or(text);
    text.split('|').map(str::trim).collect()
}

fn list_item(line: &CleanLine) -> Option<String> {
    if line.is_table_row() {
        let cells = table_cells(&line.text);
        if cells
            .iter()
            .all(|c| c.chars().all(|ch| matches!(ch, '-' | ':' | ' ')))
        {
            return None;
        }
        let joined = cells
            .into_iter()
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        return (!joined.is_empty()).then_some(joined);
    }
    Some(line.text.clone())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split([',', ';'])
        .flat_map(|part| part.split(" and "))
        .map(|part| part.trim().trim_end_matches('.').to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

fn is_absent(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    ABSENT_VALUES.contains(&value.as_str())
}

/// First money-like token in the text
fn amount_in(text: &str) -> Option<Money> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let token: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let token = token.trim_end_matches([',', '.']);
    Money::parse(token, Currency::USD).ok()
}

fn optional_amount(value: &str) -> Option<Money> {
    if is_absent(value) {
        return None;
    }
    amount_in(value)
}

/// Limit of a coverage line; split limits report the last (per-accident) figure
fn limit_amount(value: &str) -> Option<Money> {
    let lower = value.to_ascii_lowercase();
    if is_absent(value) || lower.contains("actual cash value") || lower.trim() == "acv" {
        return None;
    }
    value.rsplit('/').find_map(amount_in)
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim().trim_end_matches('.');
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

fn parse_period(value: &str) -> Option<PolicyPeriod> {
    PERIOD_SEPARATORS.iter().find_map(|separator| {
        let (start, end) = value.split_once(separator)?;
        Some(PolicyPeriod::new(parse_date(start)?, parse_date(end)?))
    })
}

fn normalize_form(form: &str) -> String {
    form.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

fn is_form_token(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit())
        || (token.len() <= 4
            && token
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-'))
}

/// Form number printed before a title, e.g. `PP 03 06` in `PP 03 06 Commercial Use`
fn form_prefix(text: &str) -> Option<String> {
    let tokens: Vec<&str> = text
        .split_whitespace()
        .take_while(|token| is_form_token(token))
        .collect();
    let form = tokens.join(" ");
    form.chars()
        .any(|c| c.is_ascii_digit())
        .then(|| normalize_form(&form))
}

fn endorsement_item(text: &str) -> Option<Endorsement> {
    let text = text.trim();
    if text.is_empty() || text.chars().all(|c| matches!(c, '-' | '|' | ':' | ' ')) {
        return None;
    }

    let split = text
        .split_once('|')
        .or_else(|| text.split_once(" - "))
        .or_else(|| text.split_once(" – "))
        .map(|(form, title)| (form.trim(), title.trim().trim_matches('|').trim()))
        .filter(|(form, _)| form.chars().any(|c| c.is_ascii_digit()));

    let (form, title) = match split {
        Some((form, title)) => (normalize_form(form), title.to_string()),
        None => match form_prefix(text) {
            Some(form) => {
                let consumed = text
                    .split_whitespace()
                    .take_while(|token| is_form_token(token))
                    .count();
                let title = text
                    .split_whitespace()
                    .skip(consumed)
                    .collect::<Vec<_>>()
                    .join(" ");
                (form, title)
            }
            None => (String::new(), text.to_string()),
        },
    };

    let title = if title.is_empty() { form.clone() } else { title };
    Some(Endorsement::new(form, title))
}

fn merge_commercial_block(endorsements: &mut Vec<Endorsement>, block: CommercialBlock) {
    let position = endorsements.iter().position(|e| match &block.form_number {
        Some(form) => normalize_form(&e.form_number) == *form,
        None => e.is_commercial_use(),
    });
    let index = match position {
        Some(index) => index,
        None => {
            endorsements.push(Endorsement::new(
                block.form_number.clone().unwrap_or_default(),
                block
                    .title
                    .clone()
                    .unwrap_or_else(|| "Commercial Use Endorsement".to_string()),
            ));
            endorsements.len() - 1
        }
    };

    let endorsement = &mut endorsements[index];
    let text = block.text.join("\n");
    let lowered = text.to_ascii_lowercase();
    endorsement.kind = EndorsementKind::CommercialUse;
    if !block.activities.is_empty() {
        endorsement.covered_activities = block
            .activities
            .iter()
            .map(|a| a.to_ascii_lowercase())
            .collect();
    }
    endorsement.applies_to = block.applies_to;
    endorsement.deductible_override = block.deductible;
    endorsement.limit_override = block.limit;
    endorsement.waives_exclusions = !WAIVER_WITHHELD.iter().any(|w| lowered.contains(w));
    endorsement.text = text;
}
