// wright-core/src/domain/generator/data_mart.rs
//
// Layer 3 (DT_3): the reporting grain. Groups the pre-aggregated branches by
// every dimension key, adds a hashed surrogate key and the optional formula.

use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use super::columns;
use super::pre_aggregation::PreAggregationOutput;
use super::{create_statement, projection, qualify, sql_literal};
use crate::domain::error::DomainError;
use crate::domain::mart::{FormulaOp, FormulaRule, GeneratedObject, Layer, MartConfig};

const PRE: &str = "PRE";
const KEY_SEPARATOR: &str = "|";
const NULL_MARKER: &str = "~";

#[derive(Debug, Clone)]
pub struct DataMartOutput {
    pub object: GeneratedObject,
    pub dimension_keys: Vec<String>,
    pub measure_name: String,
    /// Set when the config carries formula rules.
    pub formula_column: Option<String>,
}

/// Rust-side mirror of the SURROGATE_KEY expression: lowercase hex SHA-256
/// of the encoded dimension values joined by `|`. A value is encoded as
/// `<char count>:<value>` and NULL as a bare `~`, so the encoding is
/// injective: separators inside values and a literal `~` cannot collide.
pub fn surrogate_key(values: &[Option<&str>]) -> String {
    let joined = values
        .iter()
        .map(|v| match v {
            Some(value) => format!("{}:{}", value.chars().count(), value),
            None => NULL_MARKER.to_string(),
        })
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR);
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn surrogate_key_expression(dimension_keys: &[String]) -> String {
    let parts = dimension_keys
        .iter()
        .map(|k| {
            let text = format!("CAST({}.{} AS VARCHAR)", PRE, k);
            // `||` propagates NULL, so only a NULL value falls through to the marker
            format!(
                "COALESCE(LENGTH({t}) || ':' || {t}, {marker})",
                t = text,
                marker = sql_literal(NULL_MARKER)
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SHA2(CONCAT_WS({}, {}), 256) AS {}",
        sql_literal(KEY_SEPARATOR),
        parts,
        columns::SURROGATE_KEY
    )
}

/// Column references are summed; numeric literals and other scalar
/// expressions apply once to the aggregated result.
fn formula_operand(measure: &str) -> String {
    if is_numeric_literal(measure) {
        measure.to_string()
    } else if is_column_reference(measure) {
        format!("SUM({})", qualify(PRE, measure))
    } else {
        format!("({})", measure)
    }
}

fn is_numeric_literal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1
}

fn is_column_reference(text: &str) -> bool {
    text.split('.').all(|part| {
        let mut chars = part.chars();
        chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// Reduces the rules left to right in ascending precedence. Each rule
/// combines its measure with the running result, never with the raw operands.
pub fn formula_expression(rules: &[FormulaRule]) -> Result<Option<String>, DomainError> {
    let mut ordered: Vec<&FormulaRule> = rules.iter().collect();
    ordered.sort_by_key(|r| r.precedence);

    let mut running: Option<String> = None;
    for rule in ordered {
        let measure = rule.measure.trim();
        if measure.is_empty() {
            return Err(DomainError::InvalidConfig {
                layer: Layer::DataMart.to_string(),
                reason: format!("formula rule at precedence {} has no measure", rule.precedence),
            });
        }
        let operand = formula_operand(measure);

        running = Some(match running {
            None => operand,
            Some(acc) => match rule.operation {
                FormulaOp::Sum => format!("({} + {})", acc, operand),
                FormulaOp::Subtract => format!("({} - {})", acc, operand),
                FormulaOp::Multiply => format!("({} * {})", acc, operand),
                FormulaOp::Divide => format!("({} / NULLIF({}, 0))", acc, operand),
                FormulaOp::Average => format!("(({} + {}) / 2)", acc, operand),
            },
        });
    }
    Ok(running)
}

#[instrument(skip_all, fields(project = %config.project_name))]
pub fn generate(
    config: &MartConfig,
    pre_aggregation: &PreAggregationOutput,
) -> Result<DataMartOutput, DomainError> {
    let layer = Layer::DataMart;
    let dims = &pre_aggregation.dimension_keys;
    if dims.is_empty() {
        return Err(DomainError::InvalidConfig {
            layer: layer.to_string(),
            reason: "no dimension keys to group by".to_string(),
        });
    }

    let measure_name = pre_aggregation.measure_name.clone();

    let mut items = vec![surrogate_key_expression(dims)];
    items.extend(dims.iter().map(|k| format!("{}.{}", PRE, k)));
    items.push(format!("SUM({}.{}) AS {}", PRE, measure_name, measure_name));

    let mut output_columns = vec![columns::SURROGATE_KEY.to_string()];
    output_columns.extend(dims.iter().cloned());
    output_columns.push(measure_name.clone());

    let formula_column = match formula_expression(&config.formula_rules)? {
        Some(expression) => {
            let column = config.formula_result_column();
            items.push(format!("{} AS {}", expression, column));
            output_columns.push(column.clone());
            Some(column)
        }
        None => None,
    };

    let group_by = dims
        .iter()
        .map(|k| format!("{}.{}", PRE, k))
        .collect::<Vec<_>>()
        .join(", ");
    let body = format!(
        "SELECT\n{}\nFROM {} AS {}\nGROUP BY {}",
        projection(&items, 1),
        pre_aggregation.object.qualified_name,
        PRE,
        group_by
    );

    let qualified_name = layer.qualified_name(config);
    debug!(
        rules = config.formula_rules.len(),
        "Data mart generated"
    );

    Ok(DataMartOutput {
        object: GeneratedObject {
            layer,
            ddl_text: create_statement(layer, &qualified_name, &body),
            qualified_name,
            columns: output_columns,
        },
        dimension_keys: dims.clone(),
        measure_name,
        formula_column,
    })
}
