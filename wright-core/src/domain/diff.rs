// wright-core/src/domain/diff.rs
//
// Structural comparison of a generated object against a baseline DDL.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::domain::compiler::{ParsedDdl, parse_ddl};
use crate::domain::error::DomainError;
use crate::domain::mart::Layer;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredicateChanges {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl PredicateChanges {
    fn between(generated: &BTreeSet<String>, baseline: &BTreeSet<String>) -> Self {
        Self {
            added: generated.difference(baseline).cloned().collect(),
            removed: baseline.difference(generated).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    pub layer: Layer,
    /// 1.0 for structurally identical statements.
    pub similarity: f64,
    pub added_columns: Vec<String>,
    pub removed_columns: Vec<String>,
    /// Columns present on both sides with a different expression.
    pub modified_columns: Vec<String>,
    pub join_changes: PredicateChanges,
    pub where_changes: PredicateChanges,
    /// A baseline column disappeared; downstream consumers may break.
    pub is_breaking: bool,
}

impl DiffResult {
    pub fn is_identical(&self) -> bool {
        self.added_columns.is_empty()
            && self.removed_columns.is_empty()
            && self.modified_columns.is_empty()
            && self.join_changes.is_empty()
            && self.where_changes.is_empty()
    }
}

pub fn compare(layer: Layer, generated_ddl: &str, baseline_ddl: &str) -> Result<DiffResult, DomainError> {
    let generated = parse_ddl(layer, generated_ddl)?;
    let baseline = parse_ddl(layer, baseline_ddl)?;

    let generated_names: BTreeSet<&str> = generated.columns.iter().map(|c| c.name.as_str()).collect();
    let baseline_names: BTreeSet<&str> = baseline.columns.iter().map(|c| c.name.as_str()).collect();

    // Column lists keep the generated (or baseline) select order
    let added_columns: Vec<String> = generated
        .columns
        .iter()
        .filter(|c| !baseline_names.contains(c.name.as_str()))
        .map(|c| c.name.clone())
        .collect();
    let removed_columns: Vec<String> = baseline
        .columns
        .iter()
        .filter(|c| !generated_names.contains(c.name.as_str()))
        .map(|c| c.name.clone())
        .collect();
    let modified_columns: Vec<String> = generated
        .columns
        .iter()
        .filter(|c| {
            baseline
                .column(&c.name)
                .is_some_and(|b| b.expression != c.expression)
        })
        .map(|c| c.name.clone())
        .collect();

    let result = DiffResult {
        layer,
        similarity: similarity(&generated, &baseline),
        is_breaking: !removed_columns.is_empty(),
        added_columns,
        removed_columns,
        modified_columns,
        join_changes: PredicateChanges::between(&generated.join_predicates, &baseline.join_predicates),
        where_changes: PredicateChanges::between(
            &generated.where_predicates,
            &baseline.where_predicates,
        ),
    };
    debug!(%layer, similarity = result.similarity, breaking = result.is_breaking, "Layer compared");
    Ok(result)
}

fn elements(parsed: &ParsedDdl) -> BTreeSet<String> {
    parsed
        .columns
        .iter()
        .map(|c| format!("column:{}={}", c.name, c.expression))
        .chain(parsed.join_predicates.iter().map(|p| format!("join:{}", p)))
        .chain(parsed.where_predicates.iter().map(|p| format!("where:{}", p)))
        .collect()
}

/// Dice coefficient over columns and predicates.
fn similarity(generated: &ParsedDdl, baseline: &ParsedDdl) -> f64 {
    let a = elements(generated);
    let b = elements(baseline);
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let common = a.intersection(&b).count();
    (2 * common) as f64 / total as f64
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;

    const BASELINE: &str = "CREATE OR REPLACE TABLE DB.S.P_DT_3 AS\n\
        SELECT PRE.HIERARCHY_ID, PRE.LEVEL_VALUE, SUM(PRE.GL_AMOUNT) AS GL_AMOUNT\n\
        FROM DB.S.P_DT_3A AS PRE\n\
        GROUP BY PRE.HIERARCHY_ID, PRE.LEVEL_VALUE;\n";

    #[test]
    fn test_identical_statements() -> Result<()> {
        let diff = compare(Layer::DataMart, BASELINE, BASELINE)?;
        assert!(diff.is_identical());
        assert_eq!(diff.similarity, 1.0);
        assert!(!diff.is_breaking);
        Ok(())
    }

    #[test]
    fn test_added_column_is_not_breaking() -> Result<()> {
        let generated = BASELINE.replace(
            "PRE.LEVEL_VALUE, SUM",
            "PRE.LEVEL_VALUE, PRE.FILTER_GROUP, SUM",
        );
        let diff = compare(Layer::DataMart, &generated, BASELINE)?;

        assert_eq!(diff.added_columns, vec!["FILTER_GROUP"]);
        assert!(diff.removed_columns.is_empty());
        assert!(!diff.is_breaking);
        assert!(diff.similarity < 1.0 && diff.similarity > 0.5);
        Ok(())
    }

    #[test]
    fn test_removed_column_is_breaking() -> Result<()> {
        let generated = BASELINE.replace("PRE.LEVEL_VALUE, SUM", "SUM");
        let diff = compare(Layer::DataMart, &generated, BASELINE)?;

        assert_eq!(diff.removed_columns, vec!["LEVEL_VALUE"]);
        assert!(diff.is_breaking);
        Ok(())
    }

    #[test]
    fn test_modified_column_and_predicates() -> Result<()> {
        let baseline = "CREATE VIEW V AS SELECT A.X AS X FROM T AS A JOIN U AS B ON A.K = B.K WHERE A.F = 1";
        let generated = "CREATE VIEW V AS SELECT A.Y AS X FROM T AS A JOIN U AS B ON A.K = B.K AND A.J = B.J WHERE A.F = 2";
        let diff = compare(Layer::TranslationView, generated, baseline)?;

        assert_eq!(diff.modified_columns, vec!["X"]);
        assert_eq!(diff.join_changes.added, vec!["A.J = B.J"]);
        assert!(diff.join_changes.removed.is_empty());
        assert_eq!(diff.where_changes.added, vec!["A.F = 2"]);
        assert_eq!(diff.where_changes.removed, vec!["A.F = 1"]);
        assert!(!diff.is_breaking);
        Ok(())
    }

    #[test]
    fn test_malformed_baseline_aborts_layer() {
        let result = compare(Layer::DataMart, BASELINE, "DROP TABLE X");
        assert!(matches!(result, Err(DomainError::DiffComparison { .. })));
    }
}
