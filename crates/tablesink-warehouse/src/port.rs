//! The narrow port a warehouse backend implements

use async_trait::async_trait;
use tablesink_core::{Record, TableReference, TableSchema, TimePartition};
use thiserror::Error;

/// Everything the adaptor hands over to create a table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableSpec {
    /// Projected schema, order preserved
    pub schema: TableSchema,

    /// Time partition, at most one
    pub partition: Option<TimePartition>,

    /// Clustering columns in priority order
    pub clustering: Vec<String>,

    /// Expiry instant in unix milliseconds
    pub expires_at_ms: Option<i64>,
}

impl TableSpec {
    /// Create a spec carrying only a schema
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            partition: None,
            clustering: Vec::new(),
            expires_at_ms: None,
        }
    }

    /// Set the time partition
    pub fn with_partition(mut self, partition: Option<TimePartition>) -> Self {
        self.partition = partition;
        self
    }

    /// Set the clustering columns
    pub fn with_clustering(mut self, clustering: Vec<String>) -> Self {
        self.clustering = clustering;
        self
    }

    /// Set the expiry instant
    pub fn with_expiration(mut self, expires_at_ms: Option<i64>) -> Self {
        self.expires_at_ms = expires_at_ms;
        self
    }
}

/// One rejected row of a bulk insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// Zero-based row index within the submitted batch
    pub index: usize,

    /// Backend's rejection message
    pub message: String,
}

/// Outcome of a bulk insert that reached the backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    /// Row-level rejections; empty means every row landed
    pub row_errors: Vec<RowError>,
}

impl InsertOutcome {
    /// An outcome with no row errors
    pub fn clean() -> Self {
        Self::default()
    }

    /// True when every row landed
    pub fn is_clean(&self) -> bool {
        self.row_errors.is_empty()
    }
}

/// Errors a backend call can surface
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The dataset or table does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The dataset or table already exists
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The backend rejected the request as malformed
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication or permission failure
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Transport failure or deadline hit
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend is not usable as configured
    #[error("configuration error: {0}")]
    Config(String),
}

/// The seven calls any warehouse must offer the adaptor.
///
/// The port stays dumb on purpose: creating something that exists raises
/// [`BackendError::AlreadyExists`], deleting something missing raises
/// [`BackendError::NotFound`]. The idempotent-intent interpretation of
/// those conditions belongs to the adaptor, not the backend.
#[async_trait]
pub trait WarehouseBackend: Send + Sync {
    /// Backend name (e.g. "BigQuery")
    fn name(&self) -> &'static str;

    /// Project from the ambient execution identity, fixed at connect time
    fn default_project(&self) -> &str;

    /// Create a dataset
    async fn create_dataset(
        &self,
        project: &str,
        dataset: &str,
        location: Option<&str>,
    ) -> Result<(), BackendError>;

    /// Create a table from a spec
    async fn create_table(
        &self,
        table: &TableReference,
        spec: &TableSpec,
    ) -> Result<(), BackendError>;

    /// Fetch a table's current schema
    async fn get_table_schema(&self, table: &TableReference)
        -> Result<TableSchema, BackendError>;

    /// Replace a table's schema, returning the schema the backend now holds
    async fn update_table_schema(
        &self,
        table: &TableReference,
        schema: &TableSchema,
    ) -> Result<TableSchema, BackendError>;

    /// Delete a table
    async fn delete_table(&self, table: &TableReference) -> Result<(), BackendError>;

    /// Bulk-insert rows, reporting row-level rejections in the outcome
    async fn insert_rows(
        &self,
        table: &TableReference,
        rows: &[Record],
    ) -> Result<InsertOutcome, BackendError>;

    /// Run a DML statement, discarding any result rows
    async fn run_sql(&self, sql: &str) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablesink_core::{ColumnDef, StorageType};

    #[test]
    fn outcome_cleanliness() {
        assert!(InsertOutcome::clean().is_clean());
        let outcome = InsertOutcome {
            row_errors: vec![RowError {
                index: 3,
                message: "no such field".to_string(),
            }],
        };
        assert!(!outcome.is_clean());
    }

    #[test]
    fn spec_builders() {
        let schema = TableSchema::from_columns(vec![ColumnDef::new("id", StorageType::Integer)]);
        let spec = TableSpec::new(schema)
            .with_clustering(vec!["id".to_string()])
            .with_expiration(Some(1_900_000_000_000));
        assert_eq!(spec.clustering, vec!["id"]);
        assert_eq!(spec.expires_at_ms, Some(1_900_000_000_000));
        assert!(spec.partition.is_none());
    }

    #[test]
    fn error_display() {
        assert_eq!(
            BackendError::NotFound("p.d.t".to_string()).to_string(),
            "not found: p.d.t"
        );
        assert_eq!(
            BackendError::AlreadyExists("p.d".to_string()).to_string(),
            "already exists: p.d"
        );
    }
}
