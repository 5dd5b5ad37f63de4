//! Test fixtures for adaptor integration tests
//!
//! A small person table, the kind of shape upstream pipelines actually
//! ship: one key field, a few payload fields, and the metadata a
//! change-log table is created with.

use serde_json::json;
use tablesink_core::{FieldDescriptor, Record, TableMetadata};

/// Five user fields of a simple person table
pub fn person_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("id", &["int", "i_8"]).with_key_flag(true),
        FieldDescriptor::new("first_name", &["char", "c_32"]),
        FieldDescriptor::new("last_name", &["char", "c_32"]),
        FieldDescriptor::new("height", &["real"]),
        FieldDescriptor::new("birthday", &["date"]),
    ]
}

/// One person record
pub fn person_record(id: i64) -> Record {
    json!({
        "id": id,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "height": 1.65,
        "birthday": "1815-12-10"
    })
    .as_object()
    .unwrap()
    .clone()
}

/// A batch of person records with sequential ids
pub fn person_records(count: usize) -> Vec<Record> {
    (0..count).map(|i| person_record(i as i64)).collect()
}

/// Metadata a change-log table is created with: day partitioning on the
/// ingestion stamp
pub fn log_table_meta() -> TableMetadata {
    serde_json::from_value(json!({
        "partition": {"_DT": {"type": "time", "criteria": "day"}}
    }))
    .unwrap()
}
