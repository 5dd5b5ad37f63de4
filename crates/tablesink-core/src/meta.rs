//! Per-table metadata: partitioning, clustering, segments and expiry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Granularity of a time-based partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionGranularity {
    Hour,
    Day,
    Month,
}

impl PartitionGranularity {
    /// Parse a partition criteria value; anything else is ignored.
    pub fn from_criteria(criteria: &str) -> Option<Self> {
        match criteria {
            "hour" => Some(Self::Hour),
            "day" => Some(Self::Day),
            "month" => Some(Self::Month),
            _ => None,
        }
    }

    /// Granularity name as the warehouse spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hour => "HOUR",
            Self::Day => "DAY",
            Self::Month => "MONTH",
        }
    }
}

impl fmt::Display for PartitionGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of the partition map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionRule {
    /// Partition type hint, passed through untouched
    #[serde(rename = "type", default)]
    pub rule_type: Option<String>,

    /// Time granularity: hour, day or month
    #[serde(default)]
    pub criteria: Option<String>,
}

/// One entry of the cluster map; currently carries nothing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRule {}

/// The dimension purge operations scope their predicates to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMeta {
    /// Field the segment is keyed on
    pub field_name: String,

    /// Segment value rows carry when the caller never set one
    #[serde(default)]
    pub default: Option<Value>,
}

/// Row selection for a segment purge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentPredicate {
    /// Rows whose segment field equals the value
    Value(Value),

    /// Rows with `ge <= field < lt`
    Range { ge: Value, lt: Value },

    /// Rows whose segment field is any of the values
    List(Vec<Value>),

    /// Rows carrying the segment's default value
    Default,
}

/// A time partition the adaptor applies at table creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePartition {
    /// Partition field
    pub field: String,

    /// Partition granularity
    pub granularity: PartitionGranularity,
}

/// Table-level metadata supplied per call by the framework
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Candidate partition fields; at most one is applied
    #[serde(default)]
    pub partition: BTreeMap<String, PartitionRule>,

    /// Clustering fields
    #[serde(default)]
    pub cluster: BTreeMap<String, ClusterRule>,

    /// Segment dimension for purge scoping
    #[serde(default)]
    pub segment: Option<SegmentMeta>,

    /// Unix seconds after which the table expires
    #[serde(default)]
    pub expires_at: Option<f64>,
}

impl TableMetadata {
    /// The single time partition to apply: the first map entry with a
    /// recognized criteria. Multiple entries are a caller ambiguity; map
    /// order decides, nothing more is promised.
    pub fn time_partition(&self) -> Option<TimePartition> {
        self.partition.iter().find_map(|(field, rule)| {
            rule.criteria
                .as_deref()
                .and_then(PartitionGranularity::from_criteria)
                .map(|granularity| TimePartition {
                    field: field.clone(),
                    granularity,
                })
        })
    }

    /// Clustering columns: the segment field first, then cluster keys.
    pub fn clustering_fields(&self) -> Vec<String> {
        let mut fields = Vec::with_capacity(self.cluster.len() + 1);
        if let Some(segment) = &self.segment {
            fields.push(segment.field_name.clone());
        }
        fields.extend(self.cluster.keys().cloned());
        fields
    }

    /// Expiry instant, only when it is numeric and still in the future.
    pub fn expiration_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let secs = self.expires_at?;
        if !secs.is_finite() {
            return None;
        }
        let when = DateTime::<Utc>::from_timestamp_millis((secs * 1000.0) as i64)?;
        if when > now {
            Some(when)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn time_partition_takes_first_recognized_entry() {
        let meta: TableMetadata = serde_json::from_value(json!({
            "partition": {
                "created_at": {"type": "time", "criteria": "day"},
                "updated_at": {"type": "time", "criteria": "hour"}
            }
        }))
        .unwrap();

        // BTreeMap order: "created_at" sorts first
        let partition = meta.time_partition().unwrap();
        assert_eq!(partition.field, "created_at");
        assert_eq!(partition.granularity, PartitionGranularity::Day);
    }

    #[test]
    fn unrecognized_criteria_is_skipped() {
        let meta: TableMetadata = serde_json::from_value(json!({
            "partition": {
                "a_field": {"criteria": "fortnight"},
                "b_field": {"criteria": "month"}
            }
        }))
        .unwrap();

        let partition = meta.time_partition().unwrap();
        assert_eq!(partition.field, "b_field");
        assert_eq!(partition.granularity, PartitionGranularity::Month);

        let meta: TableMetadata = serde_json::from_value(json!({
            "partition": {"a_field": {"criteria": "fortnight"}}
        }))
        .unwrap();
        assert!(meta.time_partition().is_none());
    }

    #[test]
    fn clustering_puts_segment_field_first() {
        let meta: TableMetadata = serde_json::from_value(json!({
            "segment": {"field_name": "region"},
            "cluster": {"city": {}, "area": {}}
        }))
        .unwrap();

        assert_eq!(meta.clustering_fields(), vec!["region", "area", "city"]);
    }

    #[test]
    fn clustering_without_segment() {
        let meta: TableMetadata = serde_json::from_value(json!({
            "cluster": {"city": {}}
        }))
        .unwrap();
        assert_eq!(meta.clustering_fields(), vec!["city"]);
        assert!(TableMetadata::default().clustering_fields().is_empty());
    }

    #[test]
    fn expiration_only_applies_in_the_future() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        let future = TableMetadata {
            expires_at: Some(now.timestamp() as f64 + 600.0),
            ..Default::default()
        };
        let when = future.expiration_after(now).unwrap();
        assert!(when > now);

        let past = TableMetadata {
            expires_at: Some(now.timestamp() as f64 - 1.0),
            ..Default::default()
        };
        assert!(past.expiration_after(now).is_none());

        let exact = TableMetadata {
            expires_at: Some(now.timestamp() as f64),
            ..Default::default()
        };
        assert!(exact.expiration_after(now).is_none());

        assert!(TableMetadata::default().expiration_after(now).is_none());
    }

    #[test]
    fn expiration_rejects_non_finite_values() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let meta = TableMetadata {
            expires_at: Some(f64::NAN),
            ..Default::default()
        };
        assert!(meta.expiration_after(now).is_none());
    }

    #[test]
    fn segment_predicate_round_trips_through_serde() {
        let predicate = SegmentPredicate::Range {
            ge: json!(10),
            lt: json!(20),
        };
        let raw = serde_json::to_string(&predicate).unwrap();
        let back: SegmentPredicate = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, predicate);
    }
}
