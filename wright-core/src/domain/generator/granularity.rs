// wright-core/src/domain/generator/granularity.rs
//
// Layer 2 (DT_2): unpivots the hierarchy levels into one row per (node, level)
// and attaches the translated mapping rows as pivoted join columns.

use tracing::{debug, instrument};

use super::columns;
use super::translation::TranslationOutput;
use super::warning::GenerationWarning;
use super::{create_statement, indent_lines, projection, require_identifier, sql_literal};
use crate::domain::error::DomainError;
use crate::domain::mart::{GeneratedObject, GenerationInputs, Layer, MartConfig};

const LEVELS: &str = "LVL";
const HIERARCHY: &str = "HIER";
const MAPPED: &str = "MAPPED";
const VIEW: &str = "VW";
const EXCLUDED: &str = "EXC";
const PREVIOUS: &str = "PREV";
const REFINEMENT: &str = "REFINE";

#[derive(Debug, Clone)]
pub struct GranularityOutput {
    pub object: GeneratedObject,
    /// Grain of the mart: every downstream layer groups by these.
    pub dimension_keys: Vec<String>,
    /// One pivoted column per resolved physical column.
    pub join_columns: Vec<String>,
    pub warnings: Vec<GenerationWarning>,
}

impl GranularityOutput {
    pub fn has_column(&self, column: &str) -> bool {
        self.object.columns.iter().any(|c| c == column)
    }
}

pub fn dimension_keys() -> Vec<String> {
    [
        columns::HIERARCHY_ID,
        columns::LEVEL_NUMBER,
        columns::LEVEL_VALUE,
        columns::FILTER_GROUP,
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

#[instrument(skip_all, fields(project = %config.project_name))]
pub fn generate(
    config: &MartConfig,
    translation: &TranslationOutput,
    inputs: &GenerationInputs,
) -> Result<GranularityOutput, DomainError> {
    let layer = Layer::GranularityTable;
    let hierarchy_table = require_identifier(layer, "hierarchy_table", &config.hierarchy_table)?;
    if config.hierarchy_depth == 0 {
        return Err(DomainError::InvalidConfig {
            layer: layer.to_string(),
            reason: "hierarchy_depth must be at least 1".to_string(),
        });
    }

    let mut warnings = Vec::new();
    if !config.has_exclusions && !inputs.exclusion_values.is_empty() {
        warnings.push(GenerationWarning::IgnoredExclusionValues {
            count: inputs.exclusion_values.len(),
        });
    }

    let join_columns = translation.resolved_columns();
    let rows = MappingRows {
        view: &translation.object.qualified_name,
        join_columns: &join_columns,
        exclusions: config.has_exclusions,
        exclusion_values: inputs.exclusion_values.iter().collect(),
    };

    let (with_clause, mapping_source) = if config.has_group_filter_precedence {
        let (ctes, last) = precedence_ctes(&rows, inputs);
        (Some(ctes), format!("{} AS {}", last, MAPPED))
    } else {
        (
            None,
            format!("(\n{}\n) AS {}", indent_block(&rows.select(None), 1), MAPPED),
        )
    };

    let mut select_items = vec![
        format!("{}.{}", LEVELS, columns::HIERARCHY_ID),
        format!("{}.{}", LEVELS, columns::LEVEL_NUMBER),
        format!("{}.{}", LEVELS, columns::LEVEL_VALUE),
        format!("{}.{}", MAPPED, columns::FILTER_GROUP),
        format!("{}.{}", MAPPED, columns::PRECEDENCE_GROUP),
        format!("{}.{}", MAPPED, columns::SIGN_CHANGE_FLAG),
    ];
    select_items.extend(join_columns.iter().map(|c| format!("{}.{}", MAPPED, c)));

    let mut body = String::new();
    if let Some(ctes) = with_clause {
        body.push_str(&ctes);
        body.push('\n');
    }
    body.push_str(&format!(
        "SELECT\n{}\nFROM (\n{}\n) AS {}\nINNER JOIN {}\n    ON {}.{} = {}.{}",
        projection(&select_items, 1),
        unpivot(&hierarchy_table, config.hierarchy_depth),
        LEVELS,
        mapping_source,
        MAPPED,
        columns::HIERARCHY_ID,
        LEVELS,
        columns::HIERARCHY_ID
    ));

    let mut output_columns = vec![
        columns::HIERARCHY_ID.to_string(),
        columns::LEVEL_NUMBER.to_string(),
        columns::LEVEL_VALUE.to_string(),
        columns::FILTER_GROUP.to_string(),
        columns::PRECEDENCE_GROUP.to_string(),
        columns::SIGN_CHANGE_FLAG.to_string(),
    ];
    output_columns.extend(join_columns.iter().cloned());

    let qualified_name = layer.qualified_name(config);
    debug!(
        join_columns = join_columns.len(),
        precedence = config.has_group_filter_precedence,
        exclusions = config.has_exclusions,
        "Granularity table generated"
    );

    Ok(GranularityOutput {
        object: GeneratedObject {
            layer,
            ddl_text: create_statement(layer, &qualified_name, &body),
            qualified_name,
            columns: output_columns,
        },
        dimension_keys: dimension_keys(),
        join_columns,
        warnings,
    })
}

/// One branch per level, skipping levels the node does not reach.
fn unpivot(hierarchy_table: &str, depth: usize) -> String {
    let branches: Vec<String> = (1..=depth)
        .map(|n| {
            let level = columns::level(n);
            format!(
                "SELECT {h}.{id}, {n} AS {num}, {h}.{level} AS {value} FROM {table} AS {h} WHERE {h}.{level} IS NOT NULL",
                h = HIERARCHY,
                id = columns::HIERARCHY_ID,
                num = columns::LEVEL_NUMBER,
                value = columns::LEVEL_VALUE,
                table = hierarchy_table,
            )
        })
        .collect();
    indent_block(&branches.join("\nUNION ALL\n"), 1)
}

fn indent_block(text: &str, depth: usize) -> String {
    indent_lines(&text.lines().collect::<Vec<_>>(), depth)
}

/// Translated mapping rows collapsed to one row per (node, filter group,
/// precedence group), with one pivoted column per resolved physical column.
/// Keys of a multi-column join pattern therefore land on the same row.
struct MappingRows<'a> {
    view: &'a str,
    join_columns: &'a [String],
    exclusions: bool,
    exclusion_values: Vec<&'a String>,
}

impl MappingRows<'_> {
    fn select(&self, precedence: Option<u32>) -> String {
        let group_by = [
            columns::HIERARCHY_ID,
            columns::FILTER_GROUP,
            columns::PRECEDENCE_GROUP,
        ]
        .iter()
        .map(|c| format!("{}.{}", VIEW, c))
        .collect::<Vec<_>>();

        let mut items = group_by.clone();
        items.push(format!(
            "MAX(CAST({}.{} AS INTEGER)) AS {}",
            VIEW,
            columns::SIGN_CHANGE_FLAG,
            columns::SIGN_CHANGE_FLAG
        ));
        items.extend(self.join_columns.iter().map(|column| {
            format!(
                "MAX(CASE WHEN {v}.{rv} = {lit} THEN {v}.{id} END) AS {column}",
                v = VIEW,
                rv = columns::RESOLVED_VALUE,
                lit = sql_literal(column),
                id = columns::ID,
            )
        }));

        let mut conditions = vec![format!("{}.{} IS NOT NULL", VIEW, columns::RESOLVED_VALUE)];
        if let Some(value) = precedence {
            conditions.push(format!("{}.{} = {}", VIEW, columns::PRECEDENCE_GROUP, value));
        }
        if self.exclusions {
            conditions.push(format!(
                "COALESCE({}.{}, FALSE) = FALSE",
                VIEW,
                columns::EXCLUSION_FLAG
            ));
            conditions.push(self.not_excluded());
            if !self.exclusion_values.is_empty() {
                let values: Vec<String> =
                    self.exclusion_values.iter().map(|v| sql_literal(v)).collect();
                conditions.push(format!(
                    "{}.{} NOT IN ({})",
                    VIEW,
                    columns::ID,
                    values.join(", ")
                ));
            }
        }

        format!(
            "SELECT\n{}\nFROM {} AS {}\nWHERE {}\nGROUP BY {}",
            projection(&items, 1),
            self.view,
            VIEW,
            conditions.join("\n    AND "),
            group_by.join(", ")
        )
    }

    /// Anti-join on the natural key (node, resolved column, value).
    fn not_excluded(&self) -> String {
        let natural_key = [columns::HIERARCHY_ID, columns::RESOLVED_VALUE, columns::ID]
            .iter()
            .map(|c| format!("        AND {e}.{c} = {v}.{c}", e = EXCLUDED, v = VIEW, c = c))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "NOT EXISTS (\n        SELECT 1\n        FROM {view} AS {e}\n        WHERE {e}.{flag} = TRUE\n{key}\n    )",
            view = self.view,
            e = EXCLUDED,
            flag = columns::EXCLUSION_FLAG,
            key = natural_key
        )
    }
}

fn cte_name(precedence: u32) -> String {
    format!("PRECEDENCE_{}", precedence)
}

/// One CTE per precedence value, ascending. The lowest value defines the
/// primary rows; each later CTE refines its predecessor, so only the last
/// one is read by the final select.
fn precedence_ctes(rows: &MappingRows<'_>, inputs: &GenerationInputs) -> (String, String) {
    let mut levels: Vec<u32> = inputs.precedence_groups.iter().copied().collect();
    if levels.is_empty() {
        levels.push(1);
    }

    let mut ctes = Vec::with_capacity(levels.len());
    let mut previous: Option<String> = None;

    for level in levels {
        let name = cte_name(level);
        let body = match &previous {
            None => rows.select(Some(level)),
            Some(prev) => refine(rows, prev, level),
        };
        ctes.push(format!("{} AS (\n{}\n)", name, indent_block(&body, 1)));
        previous = Some(name);
    }

    let last = previous.unwrap_or_else(|| cte_name(1));
    (format!("WITH {}", ctes.join(",\n")), last)
}

/// Both sides hold one row per (node, filter group), so the join is 1:1 and
/// the refinement never multiplies rows.
fn refine(rows: &MappingRows<'_>, previous: &str, level: u32) -> String {
    let coalesced = |column: &str| {
        format!(
            "COALESCE({r}.{c}, {p}.{c}) AS {c}",
            r = REFINEMENT,
            p = PREVIOUS,
            c = column
        )
    };

    let mut items = vec![
        format!("{}.{}", PREVIOUS, columns::HIERARCHY_ID),
        format!("{}.{}", PREVIOUS, columns::FILTER_GROUP),
        coalesced(columns::PRECEDENCE_GROUP),
        coalesced(columns::SIGN_CHANGE_FLAG),
    ];
    items.extend(rows.join_columns.iter().map(|c| coalesced(c.as_str())));

    format!(
        "SELECT\n{}\nFROM {} AS {}\nLEFT JOIN (\n{}\n) AS {}\n    ON {r}.{id} = {p}.{id}\n    AND {r}.{fg} = {p}.{fg}",
        projection(&items, 1),
        previous,
        PREVIOUS,
        indent_block(&rows.select(Some(level)), 1),
        REFINEMENT,
        r = REFINEMENT,
        p = PREVIOUS,
        id = columns::HIERARCHY_ID,
        fg = columns::FILTER_GROUP,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::generator::translation;
    use crate::domain::resolver::IdSourceResolver;
    use anyhow::Result;
    use regex::Regex;

    fn config() -> MartConfig {
        let mut config = MartConfig::new("gl_mart", "gl", "SRC.HIER", "SRC.MAPPING", "SRC.FACT")
            .with_target("finance", "marts");
        config.hierarchy_depth = 3;
        config
    }

    fn build(config: &MartConfig, inputs: &GenerationInputs) -> Result<GranularityOutput> {
        let vw = translation::generate(config, &IdSourceResolver::for_config(config), inputs)?;
        Ok(generate(config, &vw, inputs)?)
    }

    #[test]
    fn test_unpivots_every_level() -> Result<()> {
        let inputs = GenerationInputs::default().with_id_sources(["ACCOUNT_CODE"]);
        let out = build(&config(), &inputs)?;
        let ddl = &out.object.ddl_text;

        assert!(ddl.starts_with("CREATE OR REPLACE TABLE FINANCE.MARTS.GL_MART_DT_2 AS\n"));
        for n in 1..=3 {
            assert!(ddl.contains(&format!("{} AS LEVEL_NUMBER, HIER.LEVEL_{} AS LEVEL_VALUE", n, n)));
        }
        assert!(!ddl.contains("LEVEL_4"));
        assert_eq!(ddl.matches("UNION ALL").count(), 2);
        assert!(ddl.contains("FROM FINANCE.MARTS.GL_MART_VW_1 AS VW"));
        assert!(!ddl.contains("WITH"));
        assert!(!ddl.contains("NOT EXISTS"));
        Ok(())
    }

    #[test]
    fn test_resolved_columns_become_join_columns() -> Result<()> {
        let inputs =
            GenerationInputs::default().with_id_sources(["PRODUCT_CODE", "ACCOUNT_CODE", "BOGUS"]);
        let out = build(&config(), &inputs)?;

        assert_eq!(out.join_columns, vec!["ACCOUNT_CODE", "PRODUCT_CODE"]);
        assert_eq!(
            out.dimension_keys,
            vec!["HIERARCHY_ID", "LEVEL_NUMBER", "LEVEL_VALUE", "FILTER_GROUP"]
        );
        assert!(out.has_column("PRODUCT_CODE"));
        assert!(
            out.object
                .ddl_text
                .contains("MAX(CASE WHEN VW.RESOLVED_VALUE = 'ACCOUNT_CODE' THEN VW.ID END) AS ACCOUNT_CODE")
        );
        Ok(())
    }

    #[test]
    fn test_exclusions_add_anti_join() -> Result<()> {
        let mut cfg = config();
        cfg.has_exclusions = true;
        let inputs = GenerationInputs::default()
            .with_id_sources(["ACCOUNT_CODE"])
            .with_exclusions(["4999", "4000"]);
        let out = build(&cfg, &inputs)?;
        let ddl = &out.object.ddl_text;

        assert!(ddl.contains("NOT EXISTS ("));
        assert!(ddl.contains("WHERE EXC.EXCLUSION_FLAG = TRUE"));
        assert!(ddl.contains("AND EXC.RESOLVED_VALUE = VW.RESOLVED_VALUE"));
        assert!(ddl.contains("VW.ID NOT IN ('4000', '4999')"));
        assert!(out.warnings.is_empty());
        Ok(())
    }

    #[test]
    fn test_exclusion_values_ignored_without_flag() -> Result<()> {
        let inputs = GenerationInputs::default()
            .with_id_sources(["ACCOUNT_CODE"])
            .with_exclusions(["4000"]);
        let out = build(&config(), &inputs)?;

        assert!(!out.object.ddl_text.contains("NOT IN"));
        assert_eq!(
            out.warnings,
            vec![GenerationWarning::IgnoredExclusionValues { count: 1 }]
        );
        Ok(())
    }

    #[test]
    fn test_precedence_emits_one_cte_per_level_in_order() -> Result<()> {
        let mut cfg = config();
        cfg.has_group_filter_precedence = true;
        let inputs = GenerationInputs::default()
            .with_id_sources(["ACCOUNT_CODE", "PRODUCT_CODE"])
            .with_precedence_groups([3, 1, 2]);
        let ddl = build(&cfg, &inputs)?.object.ddl_text;

        let cte = Regex::new(r"PRECEDENCE_\d+ AS \(").unwrap();
        assert_eq!(cte.find_iter(&ddl).count(), 3);
        assert_eq!(ddl.matches("WITH ").count(), 1);

        let first = ddl.find("PRECEDENCE_1 AS (").unwrap();
        let second = ddl.find("PRECEDENCE_2 AS (").unwrap();
        let third = ddl.find("PRECEDENCE_3 AS (").unwrap();
        assert!(first < second && second < third);

        // Each level refines the one before it
        assert!(ddl.contains("FROM PRECEDENCE_1 AS PREV"));
        assert!(ddl.contains("FROM PRECEDENCE_2 AS PREV"));
        assert!(ddl.contains("INNER JOIN PRECEDENCE_3 AS MAPPED"));
        assert!(ddl.contains("COALESCE(REFINE.ACCOUNT_CODE, PREV.ACCOUNT_CODE) AS ACCOUNT_CODE"));
        assert!(ddl.contains("AND VW.PRECEDENCE_GROUP = 3"));
        Ok(())
    }

    #[test]
    fn test_precedence_without_profile_uses_single_level() -> Result<()> {
        let mut cfg = config();
        cfg.has_group_filter_precedence = true;
        let inputs = GenerationInputs::default().with_id_sources(["ACCOUNT_CODE"]);
        let ddl = build(&cfg, &inputs)?.object.ddl_text;

        assert!(ddl.contains("WITH PRECEDENCE_1 AS ("));
        assert!(!ddl.contains("PREV"));
        assert!(ddl.contains("INNER JOIN PRECEDENCE_1 AS MAPPED"));
        Ok(())
    }

    #[test]
    fn test_zero_depth_is_rejected() -> Result<()> {
        let mut cfg = config();
        cfg.hierarchy_depth = 0;
        let vw = translation::generate(&cfg, &IdSourceResolver::new(), &GenerationInputs::default())?;
        let result = generate(&cfg, &vw, &GenerationInputs::default());
        assert!(matches!(result, Err(DomainError::InvalidConfig { .. })));
        Ok(())
    }
}
