//! Mock warehouse backend for testing
//!
//! Stores datasets, tables and rows in memory and records every insert
//! attempt and executed statement, so tests can assert on chunking
//! behavior and generated SQL without real credentials. Failures are
//! injected per table: a planned rejection for `create_table`, and a
//! planned fault or row-level rejection for the n-th insert call.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tablesink_warehouse::{MockWarehouse, WarehouseBackend};
//!
//! let backend = MockWarehouse::new();
//! backend.reject_rows_on_call("mock-project.zone.events", 2).await;
//! // ... drive the adaptor, then:
//! assert_eq!(backend.insert_batches("mock-project.zone.events").await, vec![10_000, 10_000]);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use async_trait::async_trait;
use tablesink_core::{Record, TableReference, TableSchema};

use crate::port::{BackendError, InsertOutcome, RowError, TableSpec, WarehouseBackend};

#[derive(Debug, Clone)]
struct MockTable {
    spec: TableSpec,
    rows: Vec<Record>,
}

#[derive(Debug, Clone, Copy)]
enum InsertFault {
    /// The n-th insert call (1-indexed) fails with a request fault
    Request(usize),

    /// The n-th insert call (1-indexed) reports one row-level error
    RowErrors(usize),
}

#[derive(Default)]
struct MockState {
    /// "project.dataset" keys
    datasets: HashSet<String>,

    /// Tables by FQN
    tables: HashMap<String, MockTable>,

    /// Sizes of every attempted insert call, by FQN
    insert_attempts: HashMap<String, Vec<usize>>,

    /// Every statement passed to run_sql, in order
    executed_sql: Vec<String>,

    /// Planned create_table rejections by FQN
    create_rejections: HashMap<String, BackendError>,

    /// Planned insert failures by FQN
    insert_faults: HashMap<String, InsertFault>,
}

/// In-memory warehouse backend
pub struct MockWarehouse {
    state: Arc<RwLock<MockState>>,
    project: String,
}

impl MockWarehouse {
    /// Create an empty mock with the default ambient project
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MockState::default())),
            project: "mock-project".to_string(),
        }
    }

    /// Use a different ambient project
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    /// Plan a rejection for create_table on the given FQN
    pub async fn reject_create(&self, fqn: &str, error: BackendError) {
        self.state
            .write()
            .await
            .create_rejections
            .insert(fqn.to_string(), error);
    }

    /// Plan a request fault for the n-th insert call (1-indexed)
    pub async fn fail_insert_call(&self, fqn: &str, call: usize) {
        self.state
            .write()
            .await
            .insert_faults
            .insert(fqn.to_string(), InsertFault::Request(call));
    }

    /// Plan a row-level rejection for the n-th insert call (1-indexed)
    pub async fn reject_rows_on_call(&self, fqn: &str, call: usize) {
        self.state
            .write()
            .await
            .insert_faults
            .insert(fqn.to_string(), InsertFault::RowErrors(call));
    }

    /// Seed a table directly, bypassing create_table
    pub async fn seed_table(&self, table: &TableReference, spec: TableSpec) {
        let mut state = self.state.write().await;
        state
            .datasets
            .insert(format!("{}.{}", table.project, table.dataset));
        state.tables.insert(
            table.fqn(),
            MockTable {
                spec,
                rows: Vec::new(),
            },
        );
    }

    /// True when the dataset exists
    pub async fn has_dataset(&self, project: &str, dataset: &str) -> bool {
        self.state
            .read()
            .await
            .datasets
            .contains(&format!("{project}.{dataset}"))
    }

    /// True when the table exists
    pub async fn has_table(&self, fqn: &str) -> bool {
        self.state.read().await.tables.contains_key(fqn)
    }

    /// The spec the table was created with
    pub async fn table_spec(&self, fqn: &str) -> Option<TableSpec> {
        self.state.read().await.tables.get(fqn).map(|t| t.spec.clone())
    }

    /// The table's current schema
    pub async fn table_schema(&self, fqn: &str) -> Option<TableSchema> {
        self.state
            .read()
            .await
            .tables
            .get(fqn)
            .map(|t| t.spec.schema.clone())
    }

    /// Committed rows for a table
    pub async fn rows(&self, fqn: &str) -> Vec<Record> {
        self.state
            .read()
            .await
            .tables
            .get(fqn)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Committed row count for a table
    pub async fn row_count(&self, fqn: &str) -> usize {
        self.state
            .read()
            .await
            .tables
            .get(fqn)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }

    /// Sizes of every attempted insert call for a table, in order
    pub async fn insert_batches(&self, fqn: &str) -> Vec<usize> {
        self.state
            .read()
            .await
            .insert_attempts
            .get(fqn)
            .cloned()
            .unwrap_or_default()
    }

    /// Every statement run_sql received, in order
    pub async fn executed_sql(&self) -> Vec<String> {
        self.state.read().await.executed_sql.clone()
    }
}

impl Default for MockWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockWarehouse {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            project: self.project.clone(),
        }
    }
}

#[async_trait]
impl WarehouseBackend for MockWarehouse {
    fn name(&self) -> &'static str {
        "Mock"
    }

    fn default_project(&self) -> &str {
        &self.project
    }

    async fn create_dataset(
        &self,
        project: &str,
        dataset: &str,
        _location: Option<&str>,
    ) -> Result<(), BackendError> {
        let key = format!("{project}.{dataset}");
        let mut state = self.state.write().await;
        if !state.datasets.insert(key.clone()) {
            return Err(BackendError::AlreadyExists(key));
        }
        Ok(())
    }

    async fn create_table(
        &self,
        table: &TableReference,
        spec: &TableSpec,
    ) -> Result<(), BackendError> {
        let fqn = table.fqn();
        let mut state = self.state.write().await;
        if let Some(error) = state.create_rejections.get(&fqn) {
            return Err(error.clone());
        }
        if !state
            .datasets
            .contains(&format!("{}.{}", table.project, table.dataset))
        {
            return Err(BackendError::NotFound(format!(
                "{}.{}",
                table.project, table.dataset
            )));
        }
        if state.tables.contains_key(&fqn) {
            return Err(BackendError::AlreadyExists(fqn));
        }
        state.tables.insert(
            fqn,
            MockTable {
                spec: spec.clone(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    async fn get_table_schema(
        &self,
        table: &TableReference,
    ) -> Result<TableSchema, BackendError> {
        let state = self.state.read().await;
        state
            .tables
            .get(&table.fqn())
            .map(|t| t.spec.schema.clone())
            .ok_or_else(|| BackendError::NotFound(table.fqn()))
    }

    async fn update_table_schema(
        &self,
        table: &TableReference,
        schema: &TableSchema,
    ) -> Result<TableSchema, BackendError> {
        let mut state = self.state.write().await;
        let entry = state
            .tables
            .get_mut(&table.fqn())
            .ok_or_else(|| BackendError::NotFound(table.fqn()))?;
        entry.spec.schema = schema.clone();
        Ok(entry.spec.schema.clone())
    }

    async fn delete_table(&self, table: &TableReference) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        state
            .tables
            .remove(&table.fqn())
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(table.fqn()))
    }

    async fn insert_rows(
        &self,
        table: &TableReference,
        rows: &[Record],
    ) -> Result<InsertOutcome, BackendError> {
        let fqn = table.fqn();
        let mut state = self.state.write().await;

        let call = {
            let attempts = state.insert_attempts.entry(fqn.clone()).or_default();
            attempts.push(rows.len());
            attempts.len()
        };

        match state.insert_faults.get(&fqn) {
            Some(InsertFault::Request(n)) if *n == call => {
                return Err(BackendError::InvalidRequest(format!(
                    "planned fault on insert call {call} for {fqn}"
                )));
            }
            Some(InsertFault::RowErrors(n)) if *n == call => {
                return Ok(InsertOutcome {
                    row_errors: vec![RowError {
                        index: 0,
                        message: format!("planned row rejection on insert call {call}"),
                    }],
                });
            }
            _ => {}
        }

        let entry = state
            .tables
            .get_mut(&fqn)
            .ok_or_else(|| BackendError::NotFound(fqn.clone()))?;
        entry.rows.extend(rows.iter().cloned());
        Ok(InsertOutcome::clean())
    }

    async fn run_sql(&self, sql: &str) -> Result<(), BackendError> {
        self.state.write().await.executed_sql.push(sql.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablesink_core::{ColumnDef, StorageType, TableSchema};

    fn spec() -> TableSpec {
        TableSpec::new(TableSchema::from_columns(vec![ColumnDef::new(
            "id",
            StorageType::Integer,
        )]))
    }

    fn record(id: i64) -> Record {
        let mut row = Record::new();
        row.insert("id".to_string(), serde_json::json!(id));
        row
    }

    #[tokio::test]
    async fn create_requires_dataset() {
        let backend = MockWarehouse::new();
        let table = TableReference::new("p", "d", "t");

        let err = backend.create_table(&table, &spec()).await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));

        backend.create_dataset("p", "d", None).await.unwrap();
        backend.create_table(&table, &spec()).await.unwrap();
        assert!(backend.has_table("p.d.t").await);
    }

    #[tokio::test]
    async fn duplicate_creation_raises_already_exists() {
        let backend = MockWarehouse::new();
        let table = TableReference::new("p", "d", "t");
        backend.create_dataset("p", "d", None).await.unwrap();
        backend.create_table(&table, &spec()).await.unwrap();

        let err = backend.create_dataset("p", "d", None).await.unwrap_err();
        assert!(matches!(err, BackendError::AlreadyExists(_)));

        let err = backend.create_table(&table, &spec()).await.unwrap_err();
        assert!(matches!(err, BackendError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn delete_missing_table_raises_not_found() {
        let backend = MockWarehouse::new();
        let table = TableReference::new("p", "d", "gone");
        let err = backend.delete_table(&table).await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn inserts_commit_and_record_attempts() {
        let backend = MockWarehouse::new();
        let table = TableReference::new("p", "d", "t");
        backend.seed_table(&table, spec()).await;

        let outcome = backend
            .insert_rows(&table, &[record(1), record(2)])
            .await
            .unwrap();
        assert!(outcome.is_clean());
        assert_eq!(backend.row_count("p.d.t").await, 2);
        assert_eq!(backend.insert_batches("p.d.t").await, vec![2]);
    }

    #[tokio::test]
    async fn planned_row_rejection_hits_the_chosen_call() {
        let backend = MockWarehouse::new();
        let table = TableReference::new("p", "d", "t");
        backend.seed_table(&table, spec()).await;
        backend.reject_rows_on_call("p.d.t", 2).await;

        assert!(backend.insert_rows(&table, &[record(1)]).await.unwrap().is_clean());
        let outcome = backend.insert_rows(&table, &[record(2)]).await.unwrap();
        assert_eq!(outcome.row_errors.len(), 1);
        // rejected chunk does not commit
        assert_eq!(backend.row_count("p.d.t").await, 1);
    }

    #[tokio::test]
    async fn schema_updates_replace_in_place() {
        let backend = MockWarehouse::new();
        let table = TableReference::new("p", "d", "t");
        backend.seed_table(&table, spec()).await;

        let mut schema = backend.get_table_schema(&table).await.unwrap();
        schema.columns.push(ColumnDef::new("name", StorageType::String));
        let updated = backend.update_table_schema(&table, &schema).await.unwrap();
        assert_eq!(updated.len(), 2);
        assert_eq!(backend.table_schema("p.d.t").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn run_sql_is_recorded_in_order() {
        let backend = MockWarehouse::new();
        backend.run_sql("DELETE FROM `p.d.t` WHERE true").await.unwrap();
        backend.run_sql("SELECT 1").await.unwrap();
        let sql = backend.executed_sql().await;
        assert_eq!(sql.len(), 2);
        assert!(sql[0].starts_with("DELETE"));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let backend = MockWarehouse::new();
        let table = TableReference::new("p", "d", "t");
        backend.seed_table(&table, spec()).await;

        let cloned = backend.clone();
        assert!(cloned.has_table("p.d.t").await);
    }
}
