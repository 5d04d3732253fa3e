// wright-core/src/domain/generator/translation.rs
//
// Layer 1 (VW_1): translates each mapping row's generic ID_SOURCE tag into the
// physical column its ID is matched against.

use std::collections::BTreeSet;
use tracing::{debug, instrument};

use super::columns;
use super::warning::GenerationWarning;
use super::{create_statement, projection, require_identifier, sql_literal};
use crate::domain::error::DomainError;
use crate::domain::mart::{GeneratedObject, GenerationInputs, Layer, MartConfig};
use crate::domain::resolver::{IdSource, IdSourceResolver, Resolution};

const ALIAS: &str = "MAPPING";

#[derive(Debug, Clone)]
pub struct TranslationOutput {
    pub object: GeneratedObject,
    pub resolutions: Vec<Resolution>,
    pub warnings: Vec<GenerationWarning>,
}

impl TranslationOutput {
    /// Distinct physical columns, sorted. Each becomes a pivoted join column
    /// in the granularity table.
    pub fn resolved_columns(&self) -> Vec<String> {
        self.resolutions
            .iter()
            .filter_map(|r| r.column().map(str::to_string))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[instrument(skip_all, fields(project = %config.project_name))]
pub fn generate(
    config: &MartConfig,
    resolver: &IdSourceResolver,
    inputs: &GenerationInputs,
) -> Result<TranslationOutput, DomainError> {
    let layer = Layer::TranslationView;
    let mapping_table = require_identifier(layer, "mapping_table", &config.mapping_table)?;

    let resolutions = resolver.resolve_all(&inputs.id_sources);
    let mut warnings = Vec::new();

    let resolved_value = if resolutions.is_empty() {
        warnings.push(GenerationWarning::NoIdSources);
        format!("CAST(NULL AS VARCHAR) AS {}", columns::RESOLVED_VALUE)
    } else {
        let mut lines = vec!["CASE".to_string()];
        for resolution in &resolutions {
            let then = match resolution.column() {
                Some(column) => sql_literal(column),
                None => "NULL".to_string(),
            };
            lines.push(format!(
                "        WHEN {}.{} = {} THEN {}",
                ALIAS,
                columns::ID_SOURCE,
                sql_literal(&resolution.raw),
                then
            ));

            if let Some(correction) = &resolution.correction {
                warnings.push(GenerationWarning::CorrectedIdSource {
                    raw: resolution.raw.clone(),
                    corrected_to: correction.corrected_to.clone(),
                    similarity: correction.similarity,
                });
            }
            if let IdSource::Unknown { raw, suggestions } = &resolution.source {
                warnings.push(GenerationWarning::UnresolvedIdSource {
                    raw: raw.clone(),
                    suggestions: suggestions.clone(),
                });
            }
        }
        lines.push("        ELSE NULL".to_string());
        lines.push(format!("    END AS {}", columns::RESOLVED_VALUE));
        lines.join("\n")
    };

    let passthrough = [
        columns::HIERARCHY_ID,
        columns::ID_SOURCE,
        columns::ID,
        columns::FILTER_GROUP,
        columns::PRECEDENCE_GROUP,
        columns::EXCLUSION_FLAG,
        columns::SIGN_CHANGE_FLAG,
    ];
    let mut select_items: Vec<String> = passthrough
        .iter()
        .map(|c| format!("{}.{}", ALIAS, c))
        .collect();
    select_items.push(resolved_value);

    let mut body = format!(
        "SELECT\n{}\nFROM {} AS {}",
        projection(&select_items, 1),
        mapping_table,
        ALIAS
    );
    if let Some(segment) = config
        .account_segment
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        body.push_str(&format!(
            "\nWHERE {}.{} = {}",
            ALIAS,
            columns::ACCOUNT_SEGMENT,
            sql_literal(segment)
        ));
    }

    let qualified_name = layer.qualified_name(config);
    let mut output_columns: Vec<String> = passthrough.iter().map(|c| c.to_string()).collect();
    output_columns.push(columns::RESOLVED_VALUE.to_string());

    debug!(branches = resolutions.len(), "Translation view generated");

    Ok(TranslationOutput {
        object: GeneratedObject {
            layer,
            ddl_text: create_statement(layer, &qualified_name, &body),
            qualified_name,
            columns: output_columns,
        },
        resolutions,
        warnings,
    })
}
