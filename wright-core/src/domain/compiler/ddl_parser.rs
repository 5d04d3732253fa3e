// wright-core/src/domain/compiler/ddl_parser.rs
//
// Reads back the narrow DDL grammar the generators emit:
// `CREATE [OR REPLACE] VIEW|TABLE <name> AS <query>`.

use regex::Regex;
use sqlparser::ast::{
    BinaryOperator, Expr, JoinConstraint, JoinOperator, Query, Select, SelectItem, SetExpr,
    Statement, TableFactor,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::domain::error::DomainError;
use crate::domain::mart::Layer;

fn re_header() -> Result<&'static Regex, &'static regex::Error> {
    static RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)^\s*CREATE\s+(?:OR\s+REPLACE\s+)?(?:VIEW|TABLE)\s+\S+\s+AS\s+")
    })
    .as_ref()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedColumn {
    /// Output name, upper-cased.
    pub name: String,
    /// Normalized expression text.
    pub expression: String,
}

/// Structural view of one DDL statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDdl {
    /// Output columns of the outermost select, in order.
    pub columns: Vec<ParsedColumn>,
    /// ON conjuncts of every join, CTEs and derived tables included.
    pub join_predicates: BTreeSet<String>,
    /// WHERE conjuncts of every select.
    pub where_predicates: BTreeSet<String>,
}

impl ParsedDdl {
    pub fn column(&self, name: &str) -> Option<&ParsedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

pub fn parse_ddl(layer: Layer, ddl: &str) -> Result<ParsedDdl, DomainError> {
    let fail = |reason: String| DomainError::DiffComparison {
        layer: layer.to_string(),
        reason,
    };

    let header = re_header()
        .map_err(|e| fail(format!("header pattern: {}", e)))?
        .find(ddl)
        .ok_or_else(|| fail("missing CREATE VIEW/TABLE ... AS header".to_string()))?;
    let body = &ddl[header.end()..];

    let dialect = GenericDialect {};
    let statements = Parser::parse_sql(&dialect, body).map_err(|e| fail(e.to_string()))?;

    let query = match statements.as_slice() {
        [Statement::Query(query)] => query,
        [] => return Err(fail("empty statement".to_string())),
        [_] => return Err(fail("body is not a query".to_string())),
        _ => return Err(fail(format!("expected one statement, found {}", statements.len()))),
    };

    let mut parsed = ParsedDdl {
        columns: output_columns(&query.body),
        ..Default::default()
    };
    collect_query(query, &mut parsed);
    Ok(parsed)
}

/// Leftmost select decides the output shape of a set operation.
fn output_columns(body: &SetExpr) -> Vec<ParsedColumn> {
    match body {
        SetExpr::Select(select) => select.projection.iter().map(column_of).collect(),
        SetExpr::SetOperation { left, .. } => output_columns(left),
        SetExpr::Query(query) => output_columns(&query.body),
        _ => Vec::new(),
    }
}

fn column_of(item: &SelectItem) -> ParsedColumn {
    match item {
        SelectItem::ExprWithAlias { expr, alias } => ParsedColumn {
            name: alias.value.to_uppercase(),
            expression: expr.to_string(),
        },
        SelectItem::UnnamedExpr(expr) => {
            let name = match expr {
                Expr::Identifier(ident) => ident.value.clone(),
                Expr::CompoundIdentifier(idents) => idents
                    .last()
                    .map(|i| i.value.clone())
                    .unwrap_or_else(|| expr.to_string()),
                _ => expr.to_string(),
            };
            ParsedColumn {
                name: name.to_uppercase(),
                expression: expr.to_string(),
            }
        }
        other => ParsedColumn {
            name: other.to_string(),
            expression: other.to_string(),
        },
    }
}

fn collect_query(query: &Query, parsed: &mut ParsedDdl) {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            collect_query(&cte.query, parsed);
        }
    }
    collect_set_expr(&query.body, parsed);
}

fn collect_set_expr(set_expr: &SetExpr, parsed: &mut ParsedDdl) {
    match set_expr {
        SetExpr::Select(select) => collect_select(select, parsed),
        SetExpr::SetOperation { left, right, .. } => {
            collect_set_expr(left, parsed);
            collect_set_expr(right, parsed);
        }
        SetExpr::Query(query) => collect_query(query, parsed),
        _ => {}
    }
}

fn collect_select(select: &Select, parsed: &mut ParsedDdl) {
    for table in &select.from {
        collect_table_factor(&table.relation, parsed);
        for join in &table.joins {
            collect_table_factor(&join.relation, parsed);
            let constraint = match &join.join_operator {
                JoinOperator::Join(c)
                | JoinOperator::Inner(c)
                | JoinOperator::Left(c)
                | JoinOperator::LeftOuter(c)
                | JoinOperator::Right(c)
                | JoinOperator::RightOuter(c)
                | JoinOperator::FullOuter(c) => Some(c),
                _ => None,
            };
            if let Some(JoinConstraint::On(expr)) = constraint {
                split_conjuncts(expr, &mut parsed.join_predicates);
            }
        }
    }

    if let Some(selection) = &select.selection {
        split_conjuncts(selection, &mut parsed.where_predicates);
    }
}

fn collect_table_factor(factor: &TableFactor, parsed: &mut ParsedDdl) {
    if let TableFactor::Derived { subquery, .. } = factor {
        collect_query(subquery, parsed);
    }
}

fn split_conjuncts(expr: &Expr, into: &mut BTreeSet<String>) {
    match expr {
        Expr::BinaryOp {
            left,
            op: BinaryOperator::And,
            right,
        } => {
            split_conjuncts(left, into);
            split_conjuncts(right, into);
        }
        other => {
            into.insert(other.to_string());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_header_pattern_compiles() {
        assert!(re_header().is_ok());
    }

    #[test]
    fn test_parses_columns_and_predicates() -> Result<()> {
        let ddl = "CREATE OR REPLACE TABLE DB.S.X_DT_3A AS\n\
                   -- branch\n\
                   SELECT GRAN.HIERARCHY_ID, FACT.AMOUNT AS GL_AMOUNT\n\
                   FROM DB.S.X_DT_2 AS GRAN\n\
                   INNER JOIN SRC.FACT AS FACT ON GRAN.A = FACT.A AND GRAN.B = FACT.B\n\
                   WHERE (FACT.KIND = 'X')\n\
                   UNION ALL\n\
                   SELECT GRAN.HIERARCHY_ID, FACT.AMOUNT AS GL_AMOUNT\n\
                   FROM DB.S.X_DT_2 AS GRAN\n\
                   LEFT JOIN SRC.FACT AS FACT ON GRAN.C = FACT.C;\n";
        let parsed = parse_ddl(Layer::PreAggregation, ddl)?;

        let names: Vec<&str> = parsed.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["HIERARCHY_ID", "GL_AMOUNT"]);
        assert_eq!(parsed.column("GL_AMOUNT").unwrap().expression, "FACT.AMOUNT");
        assert_eq!(parsed.join_predicates.len(), 3);
        assert!(parsed.join_predicates.contains("GRAN.C = FACT.C"));
        assert_eq!(parsed.where_predicates.len(), 1);
        Ok(())
    }

    #[test]
    fn test_walks_ctes_and_derived_tables() -> Result<()> {
        let ddl = "CREATE TABLE T AS WITH P1 AS (SELECT A FROM V WHERE V.K = 1) \
                   SELECT L.A FROM (SELECT A FROM H WHERE H.L IS NOT NULL) AS L \
                   INNER JOIN P1 AS M ON M.A = L.A";
        let parsed = parse_ddl(Layer::GranularityTable, ddl)?;

        assert_eq!(parsed.columns.len(), 1);
        assert!(parsed.where_predicates.contains("V.K = 1"));
        assert!(parsed.where_predicates.contains("H.L IS NOT NULL"));
        assert!(parsed.join_predicates.contains("M.A = L.A"));
        Ok(())
    }

    #[test]
    fn test_rejects_input_outside_the_grammar() {
        assert!(matches!(
            parse_ddl(Layer::DataMart, "SELECT 1"),
            Err(DomainError::DiffComparison { .. })
        ));
        assert!(parse_ddl(Layer::DataMart, "CREATE VIEW V AS SELEC FROM").is_err());
        assert!(parse_ddl(Layer::DataMart, "CREATE VIEW V AS SELECT 1; SELECT 2").is_err());
    }
}
