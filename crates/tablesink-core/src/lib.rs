//! Tablesink core
//!
//! Framework-neutral domain model for the schema-write adaptor: field
//! descriptors and storage-type resolution, column-name escaping, table
//! kinds with their system columns, ordered schema projection, per-table
//! metadata (partitioning, clustering, segments, expiry), and the
//! configuration schema.

pub mod config;
pub mod error;
pub mod field;
pub mod kind;
pub mod meta;
pub mod naming;
pub mod schema;

pub use config::{ConfigError, SinkConfig};
pub use error::UnsupportedTypeError;
pub use field::{FieldDescriptor, StorageType};
pub use kind::TableKind;
pub use meta::{
    ClusterRule, PartitionGranularity, PartitionRule, SegmentMeta, SegmentPredicate,
    TableMetadata, TimePartition,
};
pub use naming::{
    escape_column_name, TablePath, TablePathError, TableReference, FALLBACK_DATASET,
    MAX_COLUMN_NAME_LEN,
};
pub use schema::{project_schema, ColumnDef, ColumnMode, Record, TableSchema};
