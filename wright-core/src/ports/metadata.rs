// wright-core/src/ports/metadata.rs

// What the live paths need from a warehouse. Generation itself never calls
// this; it only feeds `GenerationInputs` and source verification.

use crate::error::WrightError;
use async_trait::async_trait;

#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Distinct non-null values of `column`, rendered as text and sorted.
    async fn distinct_values(
        &self,
        table: &str,
        column: &str,
        filter: Option<&str>,
    ) -> Result<Vec<String>, WrightError>;

    /// Column names of `table`, upper-cased.
    async fn table_columns(&self, table: &str) -> Result<Vec<String>, WrightError>;
}
