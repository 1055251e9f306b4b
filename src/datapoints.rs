//! Expansion of per-record series into chart-ready datapoints
//!
//! A record's series stores parallel arrays (one slot per aggregation
//! interval). Charting wants one row per timestamp, so `expand` explodes
//! the series into [`Datapoint`] tuples joined back to the record by
//! `stats_id`. The source record is never mutated.

use crate::ReportRecord;
use serde::Serialize;
use std::collections::BTreeMap;

/// One time slot of a record's series, flattened to scalars
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Datapoint {
    /// Join key back to the source record
    pub stats_id: String,
    #[serde(rename = "type")]
    pub record_type: crate::RecordType,
    pub test: String,
    pub usecase: String,
    pub path: String,
    pub name: String,
    pub code: String,
    /// Epoch millis of this slot
    pub time: i64,
    /// `ok_<metric>` / `nok_<metric>` scalars; `None` where the source
    /// array had no value (never coerced to zero)
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<f64>>,
}

/// Explode a record's series into one datapoint per time slot, preserving
/// chronological array order.
///
/// When the parallel arrays disagree on length, the expansion truncates to
/// the shortest one and records a warning. Records without a series expand
/// to nothing.
pub fn expand(record: &ReportRecord, warnings: &mut Vec<String>) -> Vec<Datapoint> {
    let Some(series) = &record.series else {
        return Vec::new();
    };

    let mut slots = series.time.len();
    let mut mismatched = false;
    for values in series.ok.values().chain(series.nok.values()) {
        if values.len() != series.time.len() {
            mismatched = true;
        }
        slots = slots.min(values.len());
    }
    if mismatched {
        warnings.push(format!(
            "series arrays of record '{}' disagree on length, truncating to {} slots",
            record.name, slots
        ));
    }

    let mut datapoints = Vec::with_capacity(slots);
    for i in 0..slots {
        let mut values = BTreeMap::new();
        for (metric, array) in &series.ok {
            values.insert(format!("ok_{}", metric), array[i]);
        }
        for (metric, array) in &series.nok {
            values.insert(format!("nok_{}", metric), array[i]);
        }
        datapoints.push(Datapoint {
            stats_id: record.stats_id.clone(),
            record_type: record.record_type,
            test: record.test.clone(),
            usecase: record.usecase.clone(),
            path: record.path.clone(),
            name: record.name.clone(),
            code: record.code.clone(),
            time: series.time[i],
            values,
        });
    }
    datapoints
}
