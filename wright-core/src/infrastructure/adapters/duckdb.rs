// wright-core/src/infrastructure/adapters/duckdb.rs

use async_trait::async_trait;
use duckdb::{Config, Connection, InterruptHandle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::WrightError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::metadata::MetadataSource;

/// Profiles mapping and fact tables held in a DuckDB database.
///
/// Queries run on the blocking pool. Dropping a query future before it
/// completes (e.g. on timeout) interrupts the statement so the connection
/// is released.
pub struct DuckDBMetadataSource {
    conn: Arc<Mutex<Connection>>,
    interrupt: Arc<InterruptHandle>,
}

/// Interrupts the running statement unless disarmed.
struct CancelOnDrop {
    interrupt: Arc<InterruptHandle>,
    cancelled: Arc<AtomicBool>,
    armed: bool,
}

impl CancelOnDrop {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.cancelled.store(true, Ordering::SeqCst);
            self.interrupt.interrupt();
        }
    }
}

fn poisoned() -> WrightError {
    WrightError::Infrastructure(InfrastructureError::Io(std::io::Error::other(
        "DuckDB Mutex Poisoned",
    )))
}

fn lock_conn(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, WrightError> {
    conn.lock().map_err(|_| poisoned())
}

impl DuckDBMetadataSource {
    pub fn new(db_path: &str) -> Result<Self, InfrastructureError> {
        let config = Config::default();
        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(db_path, config)?
        };
        let interrupt = conn.interrupt_handle();

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt,
        })
    }

    /// Runs a batch of statements, e.g. to seed a local profile database.
    pub fn execute_batch(&self, sql: &str) -> Result<(), WrightError> {
        let conn = lock_conn(&self.conn)?;
        conn.execute_batch(sql)
            .map_err(|e| WrightError::Infrastructure(InfrastructureError::from(e)))
    }

    async fn run_blocking<T, F>(&self, operation: &'static str, query: F) -> Result<T, WrightError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, WrightError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let cancelled = Arc::new(AtomicBool::new(false));
        let guard = CancelOnDrop {
            interrupt: Arc::clone(&self.interrupt),
            cancelled: Arc::clone(&cancelled),
            armed: true,
        };

        let task = tokio::task::spawn_blocking(move || {
            let conn = lock_conn(&conn)?;
            if cancelled.load(Ordering::SeqCst) {
                return Err(remote(operation, "cancelled before start"));
            }
            query(&conn)
        });

        let result = task.await.map_err(|e| remote(operation, e));
        guard.disarm();
        result?
    }
}

fn remote(operation: &str, err: impl std::fmt::Display) -> WrightError {
    WrightError::Infrastructure(InfrastructureError::RemoteQuery {
        operation: operation.to_string(),
        reason: err.to_string(),
    })
}

fn check_reference(operation: &str, value: &str) -> Result<(), WrightError> {
    if value.trim().is_empty() || value.contains(';') {
        return Err(remote(operation, format!("invalid reference '{}'", value)));
    }
    Ok(())
}

#[async_trait]
impl MetadataSource for DuckDBMetadataSource {
    async fn distinct_values(
        &self,
        table: &str,
        column: &str,
        filter: Option<&str>,
    ) -> Result<Vec<String>, WrightError> {
        const OP: &str = "distinct_values";
        check_reference(OP, table)?;
        check_reference(OP, column)?;

        let mut query = format!(
            "SELECT DISTINCT CAST({col} AS VARCHAR) FROM {table} WHERE {col} IS NOT NULL",
            col = column,
            table = table
        );
        if let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) {
            query.push_str(&format!(" AND ({})", filter));
        }
        query.push_str(" ORDER BY 1");

        self.run_blocking(OP, move |conn| {
            let mut stmt = conn.prepare(&query).map_err(|e| remote(OP, e))?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| remote(OP, e))?;

            let mut values = Vec::new();
            for row in rows {
                values.push(row.map_err(|e| remote(OP, e))?);
            }
            Ok(values)
        })
        .await
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>, WrightError> {
        const OP: &str = "table_columns";
        check_reference(OP, table)?;

        let pragma = format!("PRAGMA table_info('{}')", table.replace('\'', "''"));
        self.run_blocking(OP, move |conn| {
            let mut stmt = conn.prepare(&pragma).map_err(|e| remote(OP, e))?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>("name"))
                .map_err(|e| remote(OP, e))?;

            let mut columns = Vec::new();
            for row in rows {
                columns.push(row.map_err(|e| remote(OP, e))?.to_uppercase());
            }
            Ok(columns)
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::time::Duration;

    fn seeded() -> Result<DuckDBMetadataSource> {
        let source = DuckDBMetadataSource::new(":memory:")?;
        source.execute_batch(
            "CREATE TABLE mapping (hierarchy_id VARCHAR, id_source VARCHAR, id VARCHAR, precedence_group INTEGER, exclusion_flag BOOLEAN);
             INSERT INTO mapping VALUES
               ('H1', 'ACCOUNT_CODE', '4000', 1, FALSE),
               ('H1', 'PRODUCT_CODE', 'P1', 2, FALSE),
               ('H2', 'ACCOUNT_CODE', '4999', 1, TRUE),
               ('H2', NULL, 'X', 1, FALSE);",
        )?;
        Ok(source)
    }

    #[tokio::test]
    async fn test_distinct_values() -> Result<()> {
        let source = seeded()?;

        let sources = source.distinct_values("mapping", "id_source", None).await?;
        assert_eq!(sources, vec!["ACCOUNT_CODE", "PRODUCT_CODE"]);

        let groups = source
            .distinct_values("mapping", "precedence_group", None)
            .await?;
        assert_eq!(groups, vec!["1", "2"]);

        let excluded = source
            .distinct_values("mapping", "id", Some("exclusion_flag"))
            .await?;
        assert_eq!(excluded, vec!["4999"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_table_columns() -> Result<()> {
        let source = seeded()?;
        let columns = source.table_columns("mapping").await?;
        assert_eq!(columns[0], "HIERARCHY_ID");
        assert_eq!(columns.len(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_failures_are_remote_query_errors() -> Result<()> {
        let source = seeded()?;
        let err = source.table_columns("missing_table").await.unwrap_err();
        assert!(err.is_retryable());

        let err = source
            .distinct_values("mapping; DROP TABLE mapping", "id", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WrightError::Infrastructure(InfrastructureError::RemoteQuery { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_timed_out_query_is_interrupted() -> Result<()> {
        let source = seeded()?;
        source.execute_batch(
            "CREATE VIEW slow AS
             SELECT a.range * 100000 + b.range AS id FROM range(100000) a, range(100000) b;",
        )?;

        let timed_out = tokio::time::timeout(
            Duration::from_millis(300),
            source.distinct_values("slow", "id", None),
        )
        .await;
        assert!(timed_out.is_err());

        // The interrupted statement gives the connection back.
        let columns = tokio::time::timeout(Duration::from_secs(10), source.table_columns("mapping"))
            .await??;
        assert_eq!(columns.len(), 5);
        Ok(())
    }
}
