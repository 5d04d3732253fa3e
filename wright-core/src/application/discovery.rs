// wright-core/src/application/discovery.rs
//
// Live paths: profile the mapping table into `GenerationInputs` and check
// that the source tables expose the columns the generated SQL reads.

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{info, instrument};

use crate::domain::generator::columns;
use crate::domain::mart::{GenerationInputs, MartConfig};
use crate::error::WrightError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::metadata::MetadataSource;

async fn with_timeout<T, F>(operation: &str, timeout: Duration, fut: F) -> Result<T, WrightError>
where
    F: Future<Output = Result<T, WrightError>>,
{
    tokio::time::timeout(timeout, fut).await.map_err(|_| {
        WrightError::Infrastructure(InfrastructureError::RemoteQuery {
            operation: operation.to_string(),
            reason: format!("timed out after {:?}", timeout),
        })
    })?
}

/// Segment filter applied to every profiling query.
fn segment_filter(config: &MartConfig) -> Option<String> {
    config
        .account_segment
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("{} = '{}'", columns::ACCOUNT_SEGMENT, s.replace('\'', "''")))
}

fn and_filter(base: Option<&str>, extra: &str) -> String {
    match base {
        Some(base) => format!("({}) AND ({})", base, extra),
        None => extra.to_string(),
    }
}

#[instrument(skip(source, config), fields(project = %config.project_name))]
pub async fn discover_inputs(
    source: &dyn MetadataSource,
    config: &MartConfig,
    timeout: Duration,
) -> Result<GenerationInputs, WrightError> {
    let table = config.mapping_table.as_str();
    let segment = segment_filter(config);

    let id_sources = with_timeout(
        "discover id_sources",
        timeout,
        source.distinct_values(table, columns::ID_SOURCE, segment.as_deref()),
    )
    .await?;

    let mut precedence_groups = Vec::new();
    if config.has_group_filter_precedence {
        let raw = with_timeout(
            "discover precedence_groups",
            timeout,
            source.distinct_values(table, columns::PRECEDENCE_GROUP, segment.as_deref()),
        )
        .await?;
        for value in raw {
            let parsed = value.trim().parse::<u32>().map_err(|_| {
                WrightError::Infrastructure(InfrastructureError::RemoteQuery {
                    operation: "discover precedence_groups".to_string(),
                    reason: format!("'{}' is not a precedence number", value),
                })
            })?;
            precedence_groups.push(parsed);
        }
    }

    let mut exclusion_values = Vec::new();
    if config.has_exclusions {
        let filter = and_filter(
            segment.as_deref(),
            &format!("{} = TRUE", columns::EXCLUSION_FLAG),
        );
        exclusion_values = with_timeout(
            "discover exclusion_values",
            timeout,
            source.distinct_values(table, columns::ID, Some(&filter)),
        )
        .await?;
    }

    info!(
        id_sources = id_sources.len(),
        precedence_groups = precedence_groups.len(),
        exclusions = exclusion_values.len(),
        "Mapping profile discovered"
    );

    Ok(GenerationInputs::default()
        .with_id_sources(id_sources)
        .with_exclusions(exclusion_values)
        .with_precedence_groups(precedence_groups))
}

/// Columns a source table lacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCheck {
    pub table: String,
    pub missing_columns: Vec<String>,
}

impl SourceCheck {
    pub fn is_ok(&self) -> bool {
        self.missing_columns.is_empty()
    }
}

fn required_columns(config: &MartConfig) -> Vec<(String, Vec<String>)> {
    let hierarchy: Vec<String> = std::iter::once(columns::HIERARCHY_ID.to_string())
        .chain((1..=config.hierarchy_depth).map(columns::level))
        .collect();

    let mut mapping: Vec<String> = [
        columns::HIERARCHY_ID,
        columns::ID_SOURCE,
        columns::ID,
        columns::FILTER_GROUP,
        columns::PRECEDENCE_GROUP,
        columns::EXCLUSION_FLAG,
        columns::SIGN_CHANGE_FLAG,
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();
    if segment_filter(config).is_some() {
        mapping.push(columns::ACCOUNT_SEGMENT.to_string());
    }

    let mut fact: Vec<String> = vec![config.measure_column.trim().to_uppercase()];
    for pattern in &config.join_patterns {
        for key in &pattern.fact_keys {
            let key = key.trim();
            // Expressions and references to other aliases are not checked
            let bare = key.strip_prefix("FACT.").unwrap_or(key);
            if !bare.contains('.') && !bare.contains('(') {
                fact.push(bare.to_uppercase());
            }
        }
    }
    fact.sort();
    fact.dedup();

    vec![
        (config.hierarchy_table.clone(), hierarchy),
        (config.mapping_table.clone(), mapping),
        (config.fact_table.clone(), fact),
    ]
}

/// Checks the three source tables concurrently.
#[instrument(skip(source, config), fields(project = %config.project_name))]
pub async fn verify_sources(
    source: &dyn MetadataSource,
    config: &MartConfig,
    timeout: Duration,
) -> Result<Vec<SourceCheck>, WrightError> {
    let checks = required_columns(config).into_iter().map(|(table, required)| async move {
        let actual = with_timeout("verify sources", timeout, source.table_columns(&table)).await?;
        let missing_columns = required
            .into_iter()
            .filter(|c| !actual.iter().any(|a| a.eq_ignore_ascii_case(c)))
            .collect();
        Ok::<_, WrightError>(SourceCheck {
            table,
            missing_columns,
        })
    });

    try_join_all(checks).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::mart::JoinPattern;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockSource {
        values: HashMap<String, Vec<String>>,
        tables: HashMap<String, Vec<String>>,
        delay: Option<Duration>,
        filters: Mutex<Vec<Option<String>>>,
    }

    impl MockSource {
        fn new() -> Self {
            let mut values = HashMap::new();
            values.insert(
                "ID_SOURCE".to_string(),
                vec!["ACCOUNT_CODE".to_string(), "PRODUCT_CODE".to_string()],
            );
            values.insert("PRECEDENCE_GROUP".to_string(), vec!["1".into(), "2".into()]);
            values.insert("ID".to_string(), vec!["4999".to_string()]);

            let mut tables = HashMap::new();
            tables.insert(
                "SRC.HIER".to_string(),
                vec!["HIERARCHY_ID".into(), "LEVEL_1".into(), "LEVEL_2".into()],
            );
            tables.insert(
                "SRC.MAPPING".to_string(),
                [
                    "HIERARCHY_ID",
                    "ID_SOURCE",
                    "ID",
                    "FILTER_GROUP",
                    "PRECEDENCE_GROUP",
                    "EXCLUSION_FLAG",
                    "SIGN_CHANGE_FLAG",
                ]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            );
            tables.insert("SRC.FACT".to_string(), vec!["amount".into()]);

            Self {
                values,
                tables,
                delay: None,
                filters: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MetadataSource for MockSource {
        async fn distinct_values(
            &self,
            _table: &str,
            column: &str,
            filter: Option<&str>,
        ) -> Result<Vec<String>, WrightError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.filters.lock().unwrap().push(filter.map(String::from));
            Ok(self.values.get(column).cloned().unwrap_or_default())
        }

        async fn table_columns(&self, table: &str) -> Result<Vec<String>, WrightError> {
            self.tables.get(table).cloned().ok_or_else(|| {
                WrightError::Infrastructure(InfrastructureError::RemoteQuery {
                    operation: "table_columns".into(),
                    reason: format!("no table {}", table),
                })
            })
        }
    }

    fn config() -> MartConfig {
        let mut config = MartConfig::new("gl_mart", "gl", "SRC.HIER", "SRC.MAPPING", "SRC.FACT")
            .with_pattern(JoinPattern::new("by_account", ["ACCOUNT_CODE"], ["FACT.ACCT_CD"]));
        config.hierarchy_depth = 2;
        config
    }

    #[tokio::test]
    async fn test_discover_inputs_respects_flags() -> Result<()> {
        let source = MockSource::new();

        let plain = discover_inputs(&source, &config(), Duration::from_secs(1)).await?;
        assert_eq!(plain.id_sources.len(), 2);
        assert!(plain.precedence_groups.is_empty());
        assert!(plain.exclusion_values.is_empty());

        let mut cfg = config();
        cfg.has_exclusions = true;
        cfg.has_group_filter_precedence = true;
        cfg.account_segment = Some("GROSS".into());
        let full = discover_inputs(&source, &cfg, Duration::from_secs(1)).await?;
        assert_eq!(full.precedence_groups.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert!(full.exclusion_values.contains("4999"));

        let filters = source.filters.lock().unwrap();
        assert_eq!(
            filters.last().unwrap().as_deref(),
            Some("(ACCOUNT_SEGMENT = 'GROSS') AND (EXCLUSION_FLAG = TRUE)")
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_timeout_is_remote_query_error() -> Result<()> {
        let mut source = MockSource::new();
        source.delay = Some(Duration::from_millis(200));

        let err = discover_inputs(&source, &config(), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert!(err.is_retryable());
        Ok(())
    }

    #[tokio::test]
    async fn test_slow_duckdb_query_times_out() -> Result<()> {
        use crate::infrastructure::adapters::duckdb::DuckDBMetadataSource;

        let source = DuckDBMetadataSource::new(":memory:")?;
        source.execute_batch(
            "CREATE SCHEMA SRC;
             CREATE VIEW SRC.MAPPING AS
             SELECT CAST(a.range * 100000 + b.range AS VARCHAR) AS ID_SOURCE
             FROM range(100000) a, range(100000) b;",
        )?;

        let started = std::time::Instant::now();
        let err = discover_inputs(&source, &config(), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(matches!(
            err,
            WrightError::Infrastructure(InfrastructureError::RemoteQuery { .. })
        ));
        assert!(err.to_string().contains("timed out"));
        Ok(())
    }

    #[tokio::test]
    async fn test_verify_sources_reports_missing_columns() -> Result<()> {
        let source = MockSource::new();
        let checks = verify_sources(&source, &config(), Duration::from_secs(1)).await?;

        assert_eq!(checks.len(), 3);
        assert!(checks[0].is_ok());
        assert!(checks[1].is_ok());
        assert_eq!(checks[2].table, "SRC.FACT");
        assert_eq!(checks[2].missing_columns, vec!["ACCT_CD"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_verify_sources_missing_table() {
        let source = MockSource::new();
        let mut cfg = config();
        cfg.fact_table = "SRC.NOPE".into();
        assert!(verify_sources(&source, &cfg, Duration::from_secs(1)).await.is_err());
    }
}
