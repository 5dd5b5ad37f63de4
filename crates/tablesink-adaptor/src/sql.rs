//! SQL generation for compaction, upsert and purge
//!
//! Statements run against fully-qualified backtick-quoted table names.
//! Values are rendered as literals from JSON scalars; anything without a
//! literal form makes the whole statement unrenderable (`None`), which the
//! adaptor reports as an operational failure instead of shipping broken
//! SQL.

use serde_json::Value;
use tablesink_core::{escape_column_name, Record, SegmentMeta, SegmentPredicate, TableReference};

/// Render a JSON scalar as a SQL literal. Arrays and objects have no
/// literal form and yield `None`.
pub fn sql_literal(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("NULL".to_string()),
        Value::Bool(true) => Some("TRUE".to_string()),
        Value::Bool(false) => Some("FALSE".to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(quote_string(s)),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn quote_string(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('\'');
    for c in s.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            _ => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

fn quoted_table(table: &TableReference) -> String {
    format!("`{}`", table.fqn())
}

/// WHERE clause matching any of the given records' key tuples.
///
/// `None` when a record is missing a key value or carries a non-scalar
/// one. Key fields are looked up by their unescaped name and rendered as
/// escaped column names.
pub fn key_match_predicate(key_fields: &[String], records: &[Record]) -> Option<String> {
    let mut alternatives = Vec::with_capacity(records.len());
    for record in records {
        let mut clauses = Vec::with_capacity(key_fields.len());
        for field in key_fields {
            let literal = sql_literal(record.get(field)?)?;
            clauses.push(format!("{} = {}", escape_column_name(field), literal));
        }
        alternatives.push(format!("({})", clauses.join(" AND ")));
    }
    Some(alternatives.join(" OR "))
}

/// DELETE of every row whose key tuple matches one of the records.
pub fn delete_matching_sql(
    table: &TableReference,
    key_fields: &[String],
    records: &[Record],
) -> Option<String> {
    let predicate = key_match_predicate(key_fields, records)?;
    Some(format!(
        "DELETE FROM {} WHERE {}",
        quoted_table(table),
        predicate
    ))
}

/// MERGE compacting an age window of log rows into a point-in-time table.
///
/// The source reduces the window to the newest row per key, ordered by
/// `_AGE` then `_NO` descending. A matched `_OP = 'D'` row deletes its
/// target row, any other match updates the non-key columns, and unmatched
/// non-delete rows insert. Column names must already be escaped.
pub fn compaction_merge_sql(
    log_table: &TableReference,
    target_table: &TableReference,
    key_columns: &[String],
    user_columns: &[String],
    start_age: u64,
    end_age: u64,
) -> String {
    let partition_keys = key_columns.join(", ");
    let on_clause = key_columns
        .iter()
        .map(|k| format!("target.{k} = source.{k}"))
        .collect::<Vec<_>>()
        .join(" AND ");
    let update_set = user_columns
        .iter()
        .filter(|c| !key_columns.contains(c))
        .map(|c| format!("{c} = source.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    let insert_columns = user_columns.join(", ");
    let insert_values = user_columns
        .iter()
        .map(|c| format!("source.{c}"))
        .collect::<Vec<_>>()
        .join(", ");

    // all-key tables have nothing to update on match
    let update_branch = if update_set.is_empty() {
        String::new()
    } else {
        format!(" WHEN MATCHED THEN UPDATE SET {update_set}")
    };

    format!(
        "MERGE {target} AS target USING (\
         SELECT * EXCEPT (_keep_rank) FROM (\
         SELECT *, ROW_NUMBER() OVER (PARTITION BY {partition_keys} \
         ORDER BY _AGE DESC, _NO DESC) AS _keep_rank \
         FROM {log} WHERE _AGE BETWEEN {start_age} AND {end_age}\
         ) WHERE _keep_rank = 1\
         ) AS source ON {on_clause} \
         WHEN MATCHED AND source._OP = 'D' THEN DELETE\
         {update_branch} \
         WHEN NOT MATCHED AND source._OP != 'D' \
         THEN INSERT ({insert_columns}) VALUES ({insert_values})",
        target = quoted_table(target_table),
        log = quoted_table(log_table),
    )
}

/// DELETE of a compacted age window from the log table.
pub fn age_window_delete_sql(log_table: &TableReference, start_age: u64, end_age: u64) -> String {
    format!(
        "DELETE FROM {} WHERE _AGE BETWEEN {start_age} AND {end_age}",
        quoted_table(log_table)
    )
}

/// DELETE for a segment purge.
///
/// No predicate purges the whole table. A value predicate without a
/// configured segment field has nothing to bind to and is unrenderable.
pub fn purge_sql(
    table: &TableReference,
    segment: Option<&SegmentMeta>,
    predicate: Option<&SegmentPredicate>,
) -> Option<String> {
    let clause = match (segment, predicate) {
        (_, None) => "true".to_string(),
        (None, Some(_)) => return None,
        (Some(segment), Some(predicate)) => {
            let column = escape_column_name(&segment.field_name);
            match predicate {
                SegmentPredicate::Value(value) => {
                    format!("{column} = {}", sql_literal(value)?)
                }
                SegmentPredicate::Range { ge, lt } => format!(
                    "{column} >= {} AND {column} < {}",
                    sql_literal(ge)?,
                    sql_literal(lt)?
                ),
                SegmentPredicate::List(values) => {
                    if values.is_empty() {
                        return None;
                    }
                    let rendered = values
                        .iter()
                        .map(sql_literal)
                        .collect::<Option<Vec<_>>>()?;
                    format!("{column} IN ({})", rendered.join(", "))
                }
                SegmentPredicate::Default => match &segment.default {
                    Some(value) if !value.is_null() => {
                        format!("{column} = {}", sql_literal(value)?)
                    }
                    _ => format!("{column} IS NULL"),
                },
            }
        }
    };
    Some(format!(
        "DELETE FROM {} WHERE {}",
        quoted_table(table),
        clause
    ))
}
