// wright-core/src/domain/mart/config.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Declarative description of one hierarchical financial mart.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct MartConfig {
    #[validate(length(min = 1, message = "project_name cannot be empty"))]
    pub project_name: String,

    #[validate(length(min = 1, message = "report_type cannot be empty"))]
    pub report_type: String,

    pub hierarchy_table: String,
    pub mapping_table: String,
    pub fact_table: String,

    /// Keeps only mapping rows of this segment when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_segment: Option<String>,

    /// Falls back to `report_type` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure_prefix: Option<String>,

    #[serde(default)]
    pub has_sign_change: bool,
    #[serde(default)]
    pub has_exclusions: bool,
    #[serde(default)]
    pub has_group_filter_precedence: bool,

    #[serde(default)]
    pub target_database: String,
    #[serde(default)]
    pub target_schema: String,

    #[serde(default)]
    pub description: String,

    /// Fact-side measure column summed by every branch.
    #[serde(default = "default_measure_column")]
    pub measure_column: String,

    /// Number of LEVEL_n columns in the hierarchy table.
    #[serde(default = "default_hierarchy_depth")]
    pub hierarchy_depth: usize,

    #[validate(nested)]
    #[serde(default)]
    pub join_patterns: Vec<JoinPattern>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formula_rules: Vec<FormulaRule>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula_result_name: Option<String>,

    /// Extra discriminators on top of the canonical set (discriminator -> column).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub id_source_columns: BTreeMap<String, String>,
}

fn default_measure_column() -> String {
    "AMOUNT".to_string()
}

fn default_hierarchy_depth() -> usize {
    10
}

impl MartConfig {
    pub fn new(
        project_name: impl Into<String>,
        report_type: impl Into<String>,
        hierarchy_table: impl Into<String>,
        mapping_table: impl Into<String>,
        fact_table: impl Into<String>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            report_type: report_type.into(),
            hierarchy_table: hierarchy_table.into(),
            mapping_table: mapping_table.into(),
            fact_table: fact_table.into(),
            account_segment: None,
            measure_prefix: None,
            has_sign_change: false,
            has_exclusions: false,
            has_group_filter_precedence: false,
            target_database: String::new(),
            target_schema: String::new(),
            description: String::new(),
            measure_column: default_measure_column(),
            hierarchy_depth: default_hierarchy_depth(),
            join_patterns: Vec::new(),
            formula_rules: Vec::new(),
            formula_result_name: None,
            id_source_columns: BTreeMap::new(),
        }
    }

    pub fn with_target(mut self, database: impl Into<String>, schema: impl Into<String>) -> Self {
        self.target_database = database.into();
        self.target_schema = schema.into();
        self
    }

    pub fn with_pattern(mut self, pattern: JoinPattern) -> Self {
        self.join_patterns.push(pattern);
        self
    }

    /// Store key. Object names are upper-cased, so two names differing only
    /// by case would collide in the warehouse.
    pub fn key(&self) -> String {
        config_key(&self.project_name)
    }

    pub fn effective_measure_prefix(&self) -> String {
        self.measure_prefix
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(&self.report_type)
            .trim()
            .to_uppercase()
    }

    /// Name of the measure column produced by the pre-aggregation layer.
    pub fn measure_name(&self) -> String {
        format!("{}_AMOUNT", self.effective_measure_prefix())
    }

    pub fn formula_result_column(&self) -> String {
        self.formula_result_name
            .as_deref()
            .map(|n| n.trim().to_uppercase())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("{}_FORMULA_RESULT", self.effective_measure_prefix()))
    }

    pub fn find_pattern(&self, name: &str) -> Option<&JoinPattern> {
        self.join_patterns.iter().find(|p| p.name == name)
    }
}

pub fn config_key(project_name: &str) -> String {
    project_name.trim().to_uppercase()
}

/// One UNION ALL branch of the pre-aggregation layer.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct JoinPattern {
    #[validate(length(min = 1, message = "join pattern name cannot be empty"))]
    pub name: String,

    /// Column references into the granularity table.
    pub join_keys: Vec<String>,

    /// Column references into the fact table, paired by position with `join_keys`.
    pub fact_keys: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_invert_sign")]
    pub invert_sign: bool,

    /// Overrides the predicate driving the -1 multiplier for this branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_predicate: Option<String>,
}

fn default_invert_sign() -> bool {
    true
}

impl JoinPattern {
    pub fn new<K, F>(name: impl Into<String>, join_keys: K, fact_keys: F) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        Self {
            name: name.into(),
            join_keys: join_keys.into_iter().map(Into::into).collect(),
            fact_keys: fact_keys.into_iter().map(Into::into).collect(),
            filter: None,
            description: String::new(),
            invert_sign: default_invert_sign(),
            sign_predicate: None,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn keys_balanced(&self) -> bool {
        self.join_keys.len() == self.fact_keys.len()
    }

    /// Filter text used to tell two branches apart; blank filters count as none.
    pub fn normalized_filter(&self) -> Option<String> {
        self.filter
            .as_deref()
            .map(|f| f.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|f| !f.is_empty())
    }

    pub fn normalized_join_keys(&self) -> Vec<String> {
        self.join_keys
            .iter()
            .map(|k| k.trim().to_uppercase())
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum FormulaOp {
    Sum,
    Subtract,
    Multiply,
    Divide,
    Average,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FormulaRule {
    pub operation: FormulaOp,
    /// Source measure: a pre-aggregation column or a scalar SQL expression.
    pub measure: String,
    pub precedence: u32,
}

impl FormulaRule {
    pub fn new(operation: FormulaOp, measure: impl Into<String>, precedence: u32) -> Self {
        Self {
            operation,
            measure: measure.into(),
            precedence,
        }
    }
}
