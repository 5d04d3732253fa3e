// wright-core/src/domain/generator/mod.rs
//
// The four layer generators. Each one is a pure function of the mart config
// and the output of the layer before it; none of them touches a database.

pub mod data_mart;
pub mod granularity;
pub mod pre_aggregation;
pub mod translation;
pub mod warning;

pub use data_mart::{DataMartOutput, surrogate_key};
pub use granularity::GranularityOutput;
pub use pre_aggregation::PreAggregationOutput;
pub use translation::TranslationOutput;
pub use warning::GenerationWarning;

use crate::domain::error::DomainError;
use crate::domain::mart::Layer;

/// Column names of the mapping source and of the intermediate layers.
pub mod columns {
    pub const HIERARCHY_ID: &str = "HIERARCHY_ID";
    pub const ID_SOURCE: &str = "ID_SOURCE";
    pub const ID: &str = "ID";
    pub const FILTER_GROUP: &str = "FILTER_GROUP";
    pub const PRECEDENCE_GROUP: &str = "PRECEDENCE_GROUP";
    pub const EXCLUSION_FLAG: &str = "EXCLUSION_FLAG";
    pub const SIGN_CHANGE_FLAG: &str = "SIGN_CHANGE_FLAG";
    pub const ACCOUNT_SEGMENT: &str = "ACCOUNT_SEGMENT";
    pub const RESOLVED_VALUE: &str = "RESOLVED_VALUE";
    pub const LEVEL_NUMBER: &str = "LEVEL_NUMBER";
    pub const LEVEL_VALUE: &str = "LEVEL_VALUE";
    pub const SURROGATE_KEY: &str = "SURROGATE_KEY";

    pub fn level(n: usize) -> String {
        format!("LEVEL_{}", n)
    }
}

const INDENT: &str = "    ";

/// Single-quoted SQL string literal.
pub(crate) fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Prefixes bare column names with `alias`; dotted references pass through.
pub(crate) fn qualify(alias: &str, column: &str) -> String {
    let column = column.trim();
    if column.contains('.') || column.contains('(') {
        column.to_string()
    } else {
        format!("{}.{}", alias, column.to_uppercase())
    }
}

/// Strips the alias of a column reference (`GRAN.ACCOUNT_CODE` -> `ACCOUNT_CODE`).
pub(crate) fn bare_column(column: &str) -> String {
    column
        .trim()
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_uppercase()
}

/// Joins lines with a newline, each prefixed by `depth` indentation levels.
pub(crate) fn indent_lines<S: AsRef<str>>(lines: &[S], depth: usize) -> String {
    let pad = INDENT.repeat(depth);
    lines
        .iter()
        .map(|l| format!("{}{}", pad, l.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Comma-separated projection list, one column per line.
pub(crate) fn projection<S: AsRef<str>>(items: &[S], depth: usize) -> String {
    let pad = INDENT.repeat(depth);
    items
        .iter()
        .map(|i| format!("{}{}", pad, i.as_ref()))
        .collect::<Vec<_>>()
        .join(",\n")
}

/// Wraps a query body into the layer's CREATE statement.
pub(crate) fn create_statement(layer: Layer, qualified_name: &str, body: &str) -> String {
    format!(
        "CREATE OR REPLACE {} {} AS\n{};\n",
        layer.object_kind(),
        qualified_name,
        body
    )
}

/// Rejects empty or multi-statement identifiers before they reach DDL text.
pub(crate) fn require_identifier(
    layer: Layer,
    field: &str,
    value: &str,
) -> Result<String, DomainError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::InvalidConfig {
            layer: layer.to_string(),
            reason: format!("{} is empty", field),
        });
    }
    if value.contains(';') || value.contains(char::is_whitespace) {
        return Err(DomainError::InvalidConfig {
            layer: layer.to_string(),
            reason: format!("{} '{}' is not a table or column reference", field, value),
        });
    }
    Ok(value.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_literal_escapes_quotes() {
        assert_eq!(sql_literal("O'BRIEN"), "'O''BRIEN'");
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("GRAN", "account_code"), "GRAN.ACCOUNT_CODE");
        assert_eq!(qualify("GRAN", "X.ACCOUNT_CODE"), "X.ACCOUNT_CODE");
        assert_eq!(bare_column("GRAN.account_code"), "ACCOUNT_CODE");
    }

    #[test]
    fn test_require_identifier() {
        assert!(require_identifier(Layer::DataMart, "fact_table", "DB.S.T").is_ok());
        assert!(require_identifier(Layer::DataMart, "fact_table", " ").is_err());
        assert!(require_identifier(Layer::DataMart, "fact_table", "T; DROP").is_err());
    }
}
