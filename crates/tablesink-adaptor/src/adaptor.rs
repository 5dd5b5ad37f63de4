//! The capability contract a storage plugin offers the pipeline

use async_trait::async_trait;
use tablesink_core::{
    FieldDescriptor, Record, SegmentPredicate, TableKind, TableMetadata, UnsupportedTypeError,
};

/// Outcome of one adaptor operation.
///
/// `Ok(false)` is an operational failure the caller may handle or retry at
/// its own layer; `Err` is reserved for fatal conditions, currently only an
/// unresolvable type chain. The split is part of the upstream contract and
/// is deliberately not unified.
pub type AdaptorResult = Result<bool, UnsupportedTypeError>;

/// The operations the pipeline orchestrator drives a storage plugin with.
///
/// Table paths are logical `[project.]dataset.table` strings; omitted or
/// empty segments fall back to the adaptor's defaults. All operations are
/// synchronous from the caller's view: they return once the backend has
/// accepted or rejected the work, and nothing is retried here.
#[async_trait]
pub trait Adaptor: Send + Sync {
    /// Create a table of the given kind, ensuring its dataset exists.
    /// An already existing dataset or table counts as success.
    async fn create_table(
        &self,
        table_path: &str,
        meta: &TableMetadata,
        fields: &[FieldDescriptor],
        kind: TableKind,
    ) -> AdaptorResult;

    /// Delete a table. A missing table counts as success.
    async fn drop_table(&self, table_path: &str) -> AdaptorResult;

    /// Append exactly one column to the table's schema.
    /// Fails fast without a backend call when the capability is off.
    async fn add_column(&self, table_path: &str, field: &FieldDescriptor) -> AdaptorResult;

    /// Report whether a column alteration is storable in place: success
    /// iff the old and new descriptors resolve to the same storage type.
    /// The backend is never mutated; incompatible changes require a full
    /// table rewrite by the caller.
    async fn alter_column(
        &self,
        table_path: &str,
        old_field: &FieldDescriptor,
        new_field: &FieldDescriptor,
    ) -> AdaptorResult;

    /// Append change-data-capture rows, stamping each with an ingestion
    /// timestamp, in fixed-size chunks.
    async fn append_log_data(
        &self,
        table_path: &str,
        fields: &[FieldDescriptor],
        records: &[Record],
    ) -> AdaptorResult;

    /// Append plain rows in fixed-size chunks.
    async fn append_normal_data(
        &self,
        table_path: &str,
        fields: &[FieldDescriptor],
        records: &[Record],
        kind: TableKind,
    ) -> AdaptorResult;

    /// Compact an age window of log rows into a point-in-time table,
    /// then drop the compacted window from the log.
    async fn load_log_data(
        &self,
        log_table_path: &str,
        table_path: &str,
        fields: &[FieldDescriptor],
        meta: &TableMetadata,
        start_age: u64,
        end_age: u64,
    ) -> AdaptorResult;

    /// Replace-then-append rows by key, in fixed-size chunks.
    async fn upsert_data(
        &self,
        table_path: &str,
        fields: &[FieldDescriptor],
        records: &[Record],
    ) -> AdaptorResult;

    /// Delete the rows a segment predicate selects; no predicate purges
    /// the whole table.
    async fn purge_segment(
        &self,
        table_path: &str,
        meta: &TableMetadata,
        predicate: Option<&SegmentPredicate>,
    ) -> AdaptorResult;
}
