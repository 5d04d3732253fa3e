// wright-core/src/domain/generator/pre_aggregation.rs
//
// Layer 3a (DT_3A): one SELECT per join pattern against the fact table,
// stacked with UNION ALL in declaration order.

use tracing::{debug, instrument, warn};

use super::granularity::GranularityOutput;
use super::warning::GenerationWarning;
use super::{bare_column, create_statement, projection, qualify, require_identifier};
use crate::domain::error::DomainError;
use crate::domain::mart::{GeneratedObject, JoinPattern, Layer, MartConfig};

const GRAIN: &str = "GRAN";
const FACT: &str = "FACT";

#[derive(Debug, Clone)]
pub struct PreAggregationOutput {
    pub object: GeneratedObject,
    pub measure_name: String,
    pub dimension_keys: Vec<String>,
    pub warnings: Vec<GenerationWarning>,
}

/// Pattern pairs sharing a join key tuple with no filter telling them apart.
/// Fact rows matching both are counted twice.
pub fn ambiguous_pairs(patterns: &[JoinPattern]) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    for (i, first) in patterns.iter().enumerate() {
        for second in &patterns[i + 1..] {
            if first.normalized_join_keys() == second.normalized_join_keys()
                && first.normalized_filter() == second.normalized_filter()
            {
                pairs.push((first.name.as_str(), second.name.as_str()));
            }
        }
    }
    pairs
}

#[instrument(skip_all, fields(project = %config.project_name))]
pub fn generate(
    config: &MartConfig,
    granularity: &GranularityOutput,
) -> Result<PreAggregationOutput, DomainError> {
    let layer = Layer::PreAggregation;
    let fact_table = require_identifier(layer, "fact_table", &config.fact_table)?;
    let measure_column = require_identifier(layer, "measure_column", &config.measure_column)?;

    if config.join_patterns.is_empty() {
        return Err(DomainError::InvalidConfig {
            layer: layer.to_string(),
            reason: "at least one join pattern is required".to_string(),
        });
    }

    let mut warnings = Vec::new();
    for (first, second) in ambiguous_pairs(&config.join_patterns) {
        warn!(first, second, "Join patterns overlap");
        warnings.push(GenerationWarning::AmbiguousPattern {
            first: first.to_string(),
            second: second.to_string(),
        });
    }

    let measure_name = config.measure_name();
    let measure = qualify(FACT, &measure_column);
    let source = &granularity.object.qualified_name;

    let mut branches = Vec::with_capacity(config.join_patterns.len());
    for pattern in &config.join_patterns {
        check_pattern(layer, pattern)?;

        for key in &pattern.join_keys {
            let key = key.trim();
            if !key.contains('.') && !key.contains('(') && !granularity.has_column(&bare_column(key)) {
                warnings.push(GenerationWarning::UnknownJoinKey {
                    pattern: pattern.name.clone(),
                    key: key.to_string(),
                });
            }
        }

        let amount = if config.has_sign_change && pattern.invert_sign {
            let predicate = pattern
                .sign_predicate
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}.SIGN_CHANGE_FLAG = 1", GRAIN));
            format!(
                "{} * CASE WHEN {} THEN -1 ELSE 1 END AS {}",
                measure, predicate, measure_name
            )
        } else {
            format!("{} AS {}", measure, measure_name)
        };

        let mut items: Vec<String> = granularity
            .dimension_keys
            .iter()
            .map(|k| format!("{}.{}", GRAIN, k))
            .collect();
        items.push(amount);

        let on = pattern
            .join_keys
            .iter()
            .zip(&pattern.fact_keys)
            .map(|(g, f)| format!("{} = {}", qualify(GRAIN, g), qualify(FACT, f)))
            .collect::<Vec<_>>()
            .join("\n    AND ");

        let mut branch = format!(
            "-- {}\nSELECT\n{}\nFROM {} AS {}\nINNER JOIN {} AS {}\n    ON {}",
            pattern.name.replace('\n', " "),
            projection(&items, 1),
            source,
            GRAIN,
            fact_table,
            FACT,
            on
        );
        if let Some(filter) = pattern.normalized_filter() {
            branch.push_str(&format!("\nWHERE ({})", filter));
        }
        branches.push(branch);
    }

    let body = branches.join("\nUNION ALL\n");
    let qualified_name = layer.qualified_name(config);

    let mut output_columns = granularity.dimension_keys.clone();
    output_columns.push(measure_name.clone());

    debug!(
        branches = branches.len(),
        sign_change = config.has_sign_change,
        "Pre-aggregation fact generated"
    );

    Ok(PreAggregationOutput {
        object: GeneratedObject {
            layer,
            ddl_text: create_statement(layer, &qualified_name, &body),
            qualified_name,
            columns: output_columns,
        },
        measure_name,
        dimension_keys: granularity.dimension_keys.clone(),
        warnings,
    })
}

fn check_pattern(layer: Layer, pattern: &JoinPattern) -> Result<(), DomainError> {
    if pattern.join_keys.is_empty() {
        return Err(DomainError::InvalidConfig {
            layer: layer.to_string(),
            reason: format!("join pattern '{}' has no join keys", pattern.name),
        });
    }
    if !pattern.keys_balanced() {
        return Err(DomainError::InvalidConfig {
            layer: layer.to_string(),
            reason: format!(
                "join pattern '{}' pairs {} join key(s) with {} fact key(s)",
                pattern.name,
                pattern.join_keys.len(),
                pattern.fact_keys.len()
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::generator::{granularity, translation};
    use crate::domain::mart::GenerationInputs;
    use crate::domain::resolver::IdSourceResolver;
    use anyhow::Result;

    fn config() -> MartConfig {
        MartConfig::new("gl_mart", "gl", "SRC.HIER", "SRC.MAPPING", "SRC.FACT")
            .with_target("finance", "marts")
            .with_pattern(JoinPattern::new("by_account", ["ACCOUNT_CODE"], ["ACCT_CD"]))
    }

    fn build(config: &MartConfig) -> Result<PreAggregationOutput> {
        let inputs = GenerationInputs::default().with_id_sources(["ACCOUNT_CODE", "PRODUCT_CODE"]);
        let vw = translation::generate(config, &IdSourceResolver::new(), &inputs)?;
        let dt2 = granularity::generate(config, &vw, &inputs)?;
        Ok(generate(config, &dt2)?)
    }

    #[test]
    fn test_single_pattern_has_one_select() -> Result<()> {
        let out = build(&config())?;

        insta::assert_snapshot!(out.object.ddl_text.trim_end(), @r#"
        CREATE OR REPLACE TABLE FINANCE.MARTS.GL_MART_DT_3A AS
        -- by_account
        SELECT
            GRAN.HIERARCHY_ID,
            GRAN.LEVEL_NUMBER,
            GRAN.LEVEL_VALUE,
            GRAN.FILTER_GROUP,
            FACT.AMOUNT AS GL_AMOUNT
        FROM FINANCE.MARTS.GL_MART_DT_2 AS GRAN
        INNER JOIN SRC.FACT AS FACT
            ON GRAN.ACCOUNT_CODE = FACT.ACCT_CD;
        "#);
        assert_eq!(out.object.ddl_text.matches("SELECT").count(), 1);
        assert!(!out.object.ddl_text.contains("UNION ALL"));
        assert_eq!(out.measure_name, "GL_AMOUNT");
        assert!(out.warnings.is_empty());
        Ok(())
    }

    #[test]
    fn test_branches_follow_declaration_order() -> Result<()> {
        let cfg = config()
            .with_pattern(
                JoinPattern::new(
                    "by_product",
                    ["ACCOUNT_CODE", "PRODUCT_CODE"],
                    ["ACCT_CD", "PROD_CD"],
                )
                .with_filter("FACT.CHANNEL = 'RETAIL'"),
            )
            .with_pattern(JoinPattern::new("by_minor", ["PRODUCT_CODE"], ["PROD_CD"]));
        let ddl = build(&cfg)?.object.ddl_text;

        assert_eq!(ddl.matches("UNION ALL").count(), 2);
        let a = ddl.find("-- by_account").unwrap();
        let p = ddl.find("-- by_product").unwrap();
        let m = ddl.find("-- by_minor").unwrap();
        assert!(a < p && p < m);
        assert!(ddl.contains("ON GRAN.ACCOUNT_CODE = FACT.ACCT_CD\n    AND GRAN.PRODUCT_CODE = FACT.PROD_CD"));
        assert!(ddl.contains("WHERE (FACT.CHANNEL = 'RETAIL')"));
        Ok(())
    }

    #[test]
    fn test_sign_change_toggles_multiplier() -> Result<()> {
        let mut cfg = config();
        cfg.has_sign_change = true;
        let on = build(&cfg)?.object.ddl_text;
        assert!(on.contains(
            "FACT.AMOUNT * CASE WHEN GRAN.SIGN_CHANGE_FLAG = 1 THEN -1 ELSE 1 END AS GL_AMOUNT"
        ));

        cfg.has_sign_change = false;
        let off = build(&cfg)?.object.ddl_text;
        assert!(!off.contains("CASE WHEN"));
        assert!(!off.contains("-1"));
        assert!(!off.contains("* 1"));
        Ok(())
    }

    #[test]
    fn test_sign_change_respects_pattern_designation() -> Result<()> {
        let mut excluded = JoinPattern::new("by_product", ["PRODUCT_CODE"], ["PROD_CD"]);
        excluded.invert_sign = false;
        let mut custom = JoinPattern::new("by_minor", ["ACCOUNT_CODE"], ["ACCT_CD"])
            .with_filter("FACT.KIND = 'M'");
        custom.sign_predicate = Some("FACT.DIRECTION = 'CR'".into());

        let mut cfg = config().with_pattern(excluded).with_pattern(custom);
        cfg.has_sign_change = true;
        let ddl = build(&cfg)?.object.ddl_text;

        assert_eq!(ddl.matches("THEN -1 ELSE 1 END").count(), 2);
        assert!(ddl.contains("CASE WHEN FACT.DIRECTION = 'CR' THEN -1 ELSE 1 END"));
        Ok(())
    }

    #[test]
    fn test_overlapping_patterns_warn() -> Result<()> {
        let cfg = config()
            .with_pattern(JoinPattern::new("again", ["account_code "], ["ACCT_CD"]))
            .with_pattern(
                JoinPattern::new("filtered", ["ACCOUNT_CODE"], ["ACCT_CD"]).with_filter("X = 1"),
            );
        let out = build(&cfg)?;

        assert_eq!(
            out.warnings,
            vec![GenerationWarning::AmbiguousPattern {
                first: "by_account".into(),
                second: "again".into(),
            }]
        );
        Ok(())
    }

    #[test]
    fn test_unknown_join_key_warns() -> Result<()> {
        let cfg = config().with_pattern(JoinPattern::new("by_cc", ["COST_CENTER_CODE"], ["CC"]));
        let out = build(&cfg)?;
        assert!(out.warnings.contains(&GenerationWarning::UnknownJoinKey {
            pattern: "by_cc".into(),
            key: "COST_CENTER_CODE".into(),
        }));
        Ok(())
    }

    #[test]
    fn test_invalid_patterns_are_rejected() -> Result<()> {
        let mut cfg = config();
        cfg.join_patterns.clear();
        assert!(matches!(build(&cfg), Err(e) if e.to_string().contains("at least one join pattern")));

        let cfg = config().with_pattern(JoinPattern::new("broken", ["A", "B"], ["A"]));
        let err = build(&cfg).unwrap_err();
        assert!(err.to_string().contains("broken"));
        Ok(())
    }
}
