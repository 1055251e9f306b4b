//! Flat grouping of records by a single field
//!
//! Groups exactly the records it is handed; children are never pulled in.
//! Duration statistics stay `None` until the first record with a numeric
//! duration shows up, so "no data" is distinguishable from an actual zero.

use crate::ReportRecord;
use serde::Serialize;
use std::collections::BTreeMap;

/// Statistics for one group of records sharing a field value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub count: u64,
    pub success: u64,
    pub skipped: u64,
    pub fail: u64,
    pub undefined: u64,
    /// Records carrying an exception message or stacktrace
    pub exceptions: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_sum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_avg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_max: Option<f64>,
}

/// Group records by a field and compute per-group statistics.
///
/// Records where the field is empty or unsupported are skipped, so an
/// unknown field name yields an empty map rather than an error. The
/// average is recomputed from sum and count in a batch pass on every call,
/// never carried over between calls.
pub fn group_by<'a, I>(records: I, field: &str) -> BTreeMap<String, GroupStats>
where
    I: IntoIterator<Item = &'a ReportRecord>,
{
    let mut groups: BTreeMap<String, GroupStats> = BTreeMap::new();

    for record in records {
        let Some(key) = field_value(record, field) else {
            continue;
        };
        let stats = groups.entry(key).or_default();

        stats.count += 1;
        match record.status {
            crate::RecordStatus::Success => stats.success += 1,
            crate::RecordStatus::Skipped => stats.skipped += 1,
            crate::RecordStatus::Fail => stats.fail += 1,
            crate::RecordStatus::None => stats.undefined += 1,
        }
        if record.has_exception() {
            stats.exceptions += 1;
        }

        if let Some(duration) = record.duration {
            match stats.duration_sum {
                None => {
                    stats.duration_sum = Some(duration);
                    stats.duration_min = Some(duration);
                    stats.duration_max = Some(duration);
                }
                Some(sum) => {
                    stats.duration_sum = Some(sum + duration);
                    stats.duration_min = stats.duration_min.map(|m| m.min(duration));
                    stats.duration_max = stats.duration_max.map(|m| m.max(duration));
                }
            }
        }
    }

    for stats in groups.values_mut() {
        stats.duration_avg = stats.duration_sum.map(|sum| sum / stats.count as f64);
    }

    groups
}

/// The grouping key a record contributes for a field. Empty identity
/// fields count as "field not present".
fn field_value(record: &ReportRecord, field: &str) -> Option<String> {
    let non_empty = |s: &str| {
        if s.is_empty() {
            None
        } else {
            Some(s.to_string())
        }
    };
    match field {
        "test" => non_empty(&record.test),
        "usecase" => non_empty(&record.usecase),
        "path" => non_empty(&record.path),
        "name" => non_empty(&record.name),
        "code" => non_empty(&record.code),
        "type" => Some(record.record_type.to_string()),
        "status" => Some(record.status.to_string()),
        _ => None,
    }
}
