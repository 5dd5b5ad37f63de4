//! The generic adaptor over any warehouse backend

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, warn};

use async_trait::async_trait;
use tablesink_core::{
    escape_column_name, project_schema, ColumnDef, FieldDescriptor, Record, SegmentPredicate,
    SinkConfig, TableKind, TableMetadata, TablePath, TableReference, TimePartition,
    FALLBACK_DATASET,
};
use tablesink_warehouse::{BackendError, TableSpec, WarehouseBackend};

use crate::adaptor::{Adaptor, AdaptorResult};
use crate::sql;

/// Rows per bulk-insert call; the backend's payload limit sets this
pub const INSERT_CHUNK_SIZE: usize = 10_000;

/// Schema-write adaptor: projects framework schemas onto a warehouse and
/// dispatches record batches in fixed-size chunks.
///
/// Stateless between calls apart from construction-time configuration:
/// the default project resolved from the backend's ambient identity, the
/// fallback dataset, a location hint, and the two capability flags.
pub struct SchemaWriteAdaptor<B> {
    backend: B,

    /// Project substituted when a table path omits one
    default_project: String,

    /// Dataset substituted when a table path omits one
    fallback_dataset: String,

    /// Location hint for dataset creation
    location: Option<String>,

    /// Whether add_column may contact the backend
    pub support_add_column: bool,

    /// Whether alter_column may report success
    pub support_alter_column: bool,
}

impl<B: WarehouseBackend> SchemaWriteAdaptor<B> {
    /// Wrap a backend, resolving the default project from its ambient
    /// identity once.
    pub fn new(backend: B) -> Self {
        let default_project = backend.default_project().to_string();
        Self {
            backend,
            default_project,
            fallback_dataset: FALLBACK_DATASET.to_string(),
            location: None,
            support_add_column: true,
            support_alter_column: true,
        }
    }

    /// Wrap a backend and apply a parsed configuration.
    pub fn from_config(backend: B, config: &SinkConfig) -> Self {
        let mut adaptor = Self::new(backend);
        if let Some(project) = &config.project {
            adaptor.default_project = project.clone();
        }
        adaptor.fallback_dataset = config.dataset.clone();
        adaptor.location = config.location.clone();
        adaptor.support_add_column = config.support_add_column;
        adaptor.support_alter_column = config.support_alter_column;
        adaptor
    }

    /// Set the location hint for dataset creation
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Use a different fallback dataset
    pub fn with_fallback_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.fallback_dataset = dataset.into();
        self
    }

    /// The wrapped backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn resolve(&self, table_path: &str) -> Option<TableReference> {
        match TablePath::parse(table_path) {
            Ok(path) => Some(path.resolve(&self.default_project, &self.fallback_dataset)),
            Err(e) => {
                warn!(table_path, error = %e, "malformed table path");
                None
            }
        }
    }

    fn escape_record(record: &Record) -> Record {
        record
            .iter()
            .map(|(key, value)| (escape_column_name(key), value.clone()))
            .collect()
    }

    fn ingestion_stamp() -> String {
        Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }

    fn key_field_names(fields: &[FieldDescriptor]) -> Vec<String> {
        fields
            .iter()
            .filter(|f| f.key_flag)
            .map(|f| f.field_name.clone())
            .collect()
    }

    /// Submit records in fixed-size chunks, in order, stopping at the
    /// first chunk the backend faults on or rejects rows from. Chunks
    /// already committed stay committed.
    async fn dispatch_chunks(
        &self,
        table: &TableReference,
        records: &[Record],
        stamp_ingestion: bool,
    ) -> bool {
        for (chunk_no, chunk) in records.chunks(INSERT_CHUNK_SIZE).enumerate() {
            let rows: Vec<Record> = if stamp_ingestion {
                let stamp = Self::ingestion_stamp();
                chunk
                    .iter()
                    .map(|record| {
                        // stamp first, escape after
                        let mut stamped = record.clone();
                        stamped.insert("_DT".to_string(), Value::String(stamp.clone()));
                        Self::escape_record(&stamped)
                    })
                    .collect()
            } else {
                chunk.iter().map(Self::escape_record).collect()
            };

            match self.backend.insert_rows(table, &rows).await {
                Ok(outcome) if outcome.is_clean() => {
                    debug!(table = %table, chunk = chunk_no + 1, rows = rows.len(), "chunk committed");
                }
                Ok(outcome) => {
                    warn!(
                        table = %table,
                        chunk = chunk_no + 1,
                        rejected = outcome.row_errors.len(),
                        first = outcome.row_errors.first().map(|e| e.message.as_str()),
                        "bulk insert rejected rows, aborting"
                    );
                    return false;
                }
                Err(e) => {
                    warn!(table = %table, chunk = chunk_no + 1, error = %e, "bulk insert failed, aborting");
                    return false;
                }
            }
        }
        true
    }
}

#[async_trait]
impl<B: WarehouseBackend> Adaptor for SchemaWriteAdaptor<B> {
    async fn create_table(
        &self,
        table_path: &str,
        meta: &TableMetadata,
        fields: &[FieldDescriptor],
        kind: TableKind,
    ) -> AdaptorResult {
        let Some(table) = self.resolve(table_path) else {
            return Ok(false);
        };

        let schema = project_schema(fields, kind).map_err(|e| {
            error!(table = %table, error = %e, "schema projection failed");
            e
        })?;

        match self
            .backend
            .create_dataset(&table.project, &table.dataset, self.location.as_deref())
            .await
        {
            Ok(()) => debug!(project = %table.project, dataset = %table.dataset, "dataset created"),
            Err(BackendError::AlreadyExists(_)) => {}
            Err(e) => {
                warn!(table = %table, error = %e, "dataset creation failed");
                return Ok(false);
            }
        }

        let partition = meta.time_partition().map(|p| TimePartition {
            field: escape_column_name(&p.field),
            granularity: p.granularity,
        });
        let clustering = meta
            .clustering_fields()
            .iter()
            .map(|f| escape_column_name(f))
            .collect();
        let spec = TableSpec::new(schema)
            .with_partition(partition)
            .with_clustering(clustering)
            .with_expiration(
                meta.expiration_after(Utc::now())
                    .map(|t| t.timestamp_millis()),
            );

        match self.backend.create_table(&table, &spec).await {
            Ok(()) => {
                debug!(table = %table, kind = %kind, "table created");
                Ok(true)
            }
            Err(BackendError::AlreadyExists(_)) => {
                debug!(table = %table, "table already exists");
                Ok(true)
            }
            Err(e) => {
                warn!(table = %table, error = %e, "create table failed");
                Ok(false)
            }
        }
    }

    async fn drop_table(&self, table_path: &str) -> AdaptorResult {
        let Some(table) = self.resolve(table_path) else {
            return Ok(false);
        };

        match self.backend.delete_table(&table).await {
            Ok(()) | Err(BackendError::NotFound(_)) => Ok(true),
            Err(e) => {
                warn!(table = %table, error = %e, "drop table failed");
                Ok(false)
            }
        }
    }

    async fn add_column(&self, table_path: &str, field: &FieldDescriptor) -> AdaptorResult {
        if !self.support_add_column {
            warn!(table_path, "add_column disabled by configuration");
            return Ok(false);
        }
        let Some(table) = self.resolve(table_path) else {
            return Ok(false);
        };

        let column = ColumnDef::from_field(field).map_err(|e| {
            error!(table = %table, error = %e, "column projection failed");
            e
        })?;

        let current = match self.backend.get_table_schema(&table).await {
            Ok(schema) => schema,
            Err(e) => {
                warn!(table = %table, error = %e, "schema fetch failed");
                return Ok(false);
            }
        };

        let expected = current.len() + 1;
        let mut next = current;
        next.columns.push(column);

        match self.backend.update_table_schema(&table, &next).await {
            Ok(updated) if updated.len() == expected => Ok(true),
            Ok(updated) => {
                warn!(
                    table = %table,
                    expected,
                    actual = updated.len(),
                    "schema length mismatch after add_column"
                );
                Ok(false)
            }
            Err(e) => {
                warn!(table = %table, error = %e, "schema update failed");
                Ok(false)
            }
        }
    }

    async fn alter_column(
        &self,
        table_path: &str,
        old_field: &FieldDescriptor,
        new_field: &FieldDescriptor,
    ) -> AdaptorResult {
        if !self.support_alter_column {
            warn!(table_path, "alter_column disabled by configuration");
            return Ok(false);
        }

        // conservative policy: an alteration is storable in place only
        // when the storage type is unchanged, and even then the backend
        // is left untouched
        let old_type = old_field.storage_type().map_err(|e| {
            error!(table_path, error = %e, "old column type unresolvable");
            e
        })?;
        let new_type = new_field.storage_type().map_err(|e| {
            error!(table_path, error = %e, "new column type unresolvable");
            e
        })?;

        Ok(old_type == new_type)
    }

    async fn append_log_data(
        &self,
        table_path: &str,
        fields: &[FieldDescriptor],
        records: &[Record],
    ) -> AdaptorResult {
        let Some(table) = self.resolve(table_path) else {
            return Ok(false);
        };
        debug!(table = %table, fields = fields.len(), records = records.len(), "appending log data");
        Ok(self.dispatch_chunks(&table, records, true).await)
    }

    async fn append_normal_data(
        &self,
        table_path: &str,
        fields: &[FieldDescriptor],
        records: &[Record],
        kind: TableKind,
    ) -> AdaptorResult {
        let Some(table) = self.resolve(table_path) else {
            return Ok(false);
        };
        debug!(
            table = %table,
            kind = %kind,
            fields = fields.len(),
            records = records.len(),
            "appending normal data"
        );
        Ok(self.dispatch_chunks(&table, records, false).await)
    }

    async fn load_log_data(
        &self,
        log_table_path: &str,
        table_path: &str,
        fields: &[FieldDescriptor],
        _meta: &TableMetadata,
        start_age: u64,
        end_age: u64,
    ) -> AdaptorResult {
        let Some(log_table) = self.resolve(log_table_path) else {
            return Ok(false);
        };
        let Some(table) = self.resolve(table_path) else {
            return Ok(false);
        };

        let key_columns: Vec<String> = fields
            .iter()
            .filter(|f| f.key_flag)
            .map(|f| escape_column_name(&f.field_name))
            .collect();
        if key_columns.is_empty() {
            warn!(table = %table, "log compaction needs at least one key field");
            return Ok(false);
        }
        let user_columns: Vec<String> = fields
            .iter()
            .map(|f| escape_column_name(&f.field_name))
            .collect();

        let merge = sql::compaction_merge_sql(
            &log_table,
            &table,
            &key_columns,
            &user_columns,
            start_age,
            end_age,
        );
        if let Err(e) = self.backend.run_sql(&merge).await {
            warn!(table = %table, error = %e, "log compaction failed");
            return Ok(false);
        }

        // the compacted window leaves the log; no compensation if this
        // half fails, same at-least-once stance as chunked appends
        let cleanup = sql::age_window_delete_sql(&log_table, start_age, end_age);
        match self.backend.run_sql(&cleanup).await {
            Ok(()) => {
                debug!(log_table = %log_table, table = %table, start_age, end_age, "log window compacted");
                Ok(true)
            }
            Err(e) => {
                warn!(log_table = %log_table, error = %e, "compacted window cleanup failed");
                Ok(false)
            }
        }
    }

    async fn upsert_data(
        &self,
        table_path: &str,
        fields: &[FieldDescriptor],
        records: &[Record],
    ) -> AdaptorResult {
        let Some(table) = self.resolve(table_path) else {
            return Ok(false);
        };

        let key_fields = Self::key_field_names(fields);
        if key_fields.is_empty() {
            warn!(table = %table, "upsert needs at least one key field");
            return Ok(false);
        }

        for (chunk_no, chunk) in records.chunks(INSERT_CHUNK_SIZE).enumerate() {
            let Some(delete) = sql::delete_matching_sql(&table, &key_fields, chunk) else {
                warn!(table = %table, chunk = chunk_no + 1, "chunk has unrenderable key values");
                return Ok(false);
            };
            if let Err(e) = self.backend.run_sql(&delete).await {
                warn!(table = %table, chunk = chunk_no + 1, error = %e, "upsert delete failed");
                return Ok(false);
            }

            let rows: Vec<Record> = chunk
                .iter()
                .filter(|record| record.get("_OP").and_then(Value::as_str) != Some("D"))
                .map(Self::escape_record)
                .collect();
            if rows.is_empty() {
                continue;
            }

            match self.backend.insert_rows(&table, &rows).await {
                Ok(outcome) if outcome.is_clean() => {}
                Ok(outcome) => {
                    warn!(
                        table = %table,
                        chunk = chunk_no + 1,
                        rejected = outcome.row_errors.len(),
                        "upsert insert rejected rows, aborting"
                    );
                    return Ok(false);
                }
                Err(e) => {
                    warn!(table = %table, chunk = chunk_no + 1, error = %e, "upsert insert failed");
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    async fn purge_segment(
        &self,
        table_path: &str,
        meta: &TableMetadata,
        predicate: Option<&SegmentPredicate>,
    ) -> AdaptorResult {
        let Some(table) = self.resolve(table_path) else {
            return Ok(false);
        };

        let Some(statement) = sql::purge_sql(&table, meta.segment.as_ref(), predicate) else {
            warn!(table = %table, "purge predicate cannot be rendered");
            return Ok(false);
        };

        match self.backend.run_sql(&statement).await {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(table = %table, error = %e, "segment purge failed");
                Ok(false)
            }
        }
    }
}
