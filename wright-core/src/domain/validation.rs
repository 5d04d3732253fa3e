// wright-core/src/domain/validation.rs
//
// Static consistency checks over a mart config. Reports everything it finds
// and never repairs the config.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::generator::pre_aggregation::ambiguous_pairs;
use crate::domain::mart::{FormulaOp, MartConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationEntry {
    pub severity: Severity,
    pub message: String,
}

/// Findings in the order they were detected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub entries: Vec<ValidationEntry>,
}

impl ValidationResult {
    fn error(&mut self, message: impl Into<String>) {
        self.entries.push(ValidationEntry {
            severity: Severity::Error,
            message: message.into(),
        });
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.entries.push(ValidationEntry {
            severity: Severity::Warning,
            message: message.into(),
        });
    }

    pub fn is_valid(&self) -> bool {
        !self.entries.iter().any(|e| e.severity == Severity::Error)
    }

    fn messages(&self, severity: Severity) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.severity == severity)
            .map(|e| e.message.as_str())
            .collect()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.messages(Severity::Error)
    }

    pub fn warnings(&self) -> Vec<&str> {
        self.messages(Severity::Warning)
    }

    pub fn report(&self) -> ValidationReport {
        ValidationReport {
            is_valid: self.is_valid(),
            errors: self.errors().into_iter().map(String::from).collect(),
            warnings: self.warnings().into_iter().map(String::from).collect(),
        }
    }
}

/// External shape of a validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

pub fn validate(config: &MartConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if config.project_name.trim().is_empty() {
        result.error("project_name is empty");
    }
    for (field, value) in [
        ("hierarchy_table", &config.hierarchy_table),
        ("mapping_table", &config.mapping_table),
        ("fact_table", &config.fact_table),
    ] {
        if value.trim().is_empty() {
            result.error(format!("{} is empty", field));
        }
    }
    if config.hierarchy_depth == 0 {
        result.error("hierarchy_depth must be at least 1");
    }

    if config.join_patterns.is_empty() {
        result.error("no join patterns defined; the pre-aggregation layer needs at least one");
    }
    for pattern in &config.join_patterns {
        if !pattern.keys_balanced() {
            result.error(format!(
                "join pattern '{}' has {} join key(s) but {} fact key(s)",
                pattern.name,
                pattern.join_keys.len(),
                pattern.fact_keys.len()
            ));
        } else if pattern.join_keys.is_empty() {
            result.error(format!("join pattern '{}' has no keys", pattern.name));
        }
    }

    for (first, second) in ambiguous_pairs(&config.join_patterns) {
        result.warning(format!(
            "join patterns '{}' and '{}' share join keys without a distinguishing filter; fact rows matching both are counted twice",
            first, second
        ));
    }

    if config.has_sign_change && !config.join_patterns.iter().any(|p| p.invert_sign) {
        result.warning("has_sign_change is set but no join pattern is designated for inversion");
    }

    check_formula(config, &mut result);
    result
}

fn check_formula(config: &MartConfig, result: &mut ValidationResult) {
    let rules = &config.formula_rules;
    if rules.is_empty() {
        return;
    }

    for rule in rules {
        if rule.measure.trim().is_empty() {
            result.error(format!(
                "formula rule at precedence {} has no measure",
                rule.precedence
            ));
        }
    }

    let mut seen: BTreeMap<u32, usize> = BTreeMap::new();
    for rule in rules {
        *seen.entry(rule.precedence).or_default() += 1;
    }
    for (precedence, count) in &seen {
        if *count > 1 {
            result.warning(format!(
                "{} formula rules share precedence {}; they apply in declaration order",
                count, precedence
            ));
        }
    }

    if let Some(first) = rules.iter().min_by_key(|r| r.precedence)
        && first.operation != FormulaOp::Sum
    {
        result.warning(format!(
            "first formula rule is {:?}, not SUM; it only establishes the running total",
            first.operation
        ));
    }
}
