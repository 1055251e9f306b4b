//! Table view models for external renderers
//!
//! A view model is plain data: header labels plus rows of rendered cell
//! strings in the requested field order. Renderers (terminal tables, CSV
//! consumers, web frontends) draw it without knowing anything about
//! records. Field-specific rendering hooks are passed in as customizers.

use crate::classifier::display_number;
use crate::stats::derive;
use crate::{format_percent, Metric, ReportRecord};
use chrono::DateTime;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// What the caller wants to see
#[derive(Debug, Clone, Default)]
pub struct ViewQuery {
    /// Fields to project, in display order
    pub fields: Vec<String>,
    /// Substring filters on the record type; one token like "Message"
    /// keeps MessageInfo, MessageWarn and MessageError. Empty keeps all.
    pub type_filter: Vec<String>,
    /// Fields to sort by, highest priority first. Ties keep input order.
    pub sort_fields: Vec<String>,
}

/// A rendered table: one header row plus data rows
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableViewModel {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Hook for field-specific rendering: (record, rendered value, field name)
/// to the final cell text.
pub type Customizer = fn(&ReportRecord, &str, &str) -> String;

/// Builds [`TableViewModel`]s from records and a [`ViewQuery`]
#[derive(Debug, Clone, Default)]
pub struct ViewBuilder {
    labels: BTreeMap<String, String>,
    customizers: BTreeMap<String, Customizer>,
}

impl ViewBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field name to column label mapping; unmapped fields use the field
    /// name itself.
    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_customizer(mut self, field: &str, customizer: Customizer) -> Self {
        self.customizers.insert(field.to_string(), customizer);
        self
    }

    /// Filter, sort and project records into a table view model. An empty
    /// result after filtering is a valid, empty view.
    pub fn build(&self, records: &[&ReportRecord], query: &ViewQuery) -> TableViewModel {
        let mut selected: Vec<&ReportRecord> = records
            .iter()
            .copied()
            .filter(|r| matches_type_filter(r, &query.type_filter))
            .collect();

        // sort_by is stable, so ties keep input order
        selected.sort_by(|a, b| {
            for field in &query.sort_fields {
                let ordering = compare_field(a, b, field);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        let headers = query
            .fields
            .iter()
            .map(|f| self.labels.get(f).cloned().unwrap_or_else(|| f.clone()))
            .collect();
        let rows = selected
            .iter()
            .map(|record| {
                query
                    .fields
                    .iter()
                    .map(|field| {
                        let value = field_text(record, field);
                        match self.customizers.get(field) {
                            Some(customizer) => customizer(record, &value, field),
                            None => value,
                        }
                    })
                    .collect()
            })
            .collect();

        TableViewModel { headers, rows }
    }
}

fn matches_type_filter(record: &ReportRecord, filter: &[String]) -> bool {
    if filter.is_empty() {
        return true;
    }
    let type_name = record.record_type.to_string();
    filter.iter().any(|token| type_name.contains(token.as_str()))
}

/// Numeric values compare numerically, everything else lexically; absent
/// values sort first.
fn compare_field(a: &ReportRecord, b: &ReportRecord, field: &str) -> Ordering {
    let va = field_text(a, field);
    let vb = field_text(b, field);
    match (va.parse::<f64>(), vb.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => va.cmp(&vb),
    }
}

/// Render one field of a record as text. Unknown fields render blank,
/// absent durations render "-", absent metrics render blank.
pub fn field_text(record: &ReportRecord, field: &str) -> String {
    if let Some(metric_name) = field.strip_prefix("ok_") {
        return match metric(metric_name) {
            Some(m) => format_number(record.ok.get(m)),
            None => String::new(),
        };
    }
    if let Some(metric_name) = field.strip_prefix("nok_") {
        return match metric(metric_name) {
            Some(m) => format_number(record.nok.get(m)),
            None => String::new(),
        };
    }

    match field {
        "type" => record.record_type.to_string(),
        "status" => record.status.to_string(),
        "test" => record.test.clone(),
        "usecase" => record.usecase.clone(),
        "path" => record.path.clone(),
        "name" => record.name.clone(),
        "code" => record.code.clone(),
        "level" => record.level.to_string(),
        "statsId" => record.stats_id.clone(),
        "itemNumber" => display_number(record.item_number),
        "duration" => match record.duration {
            Some(d) => format_number(Some(d)),
            None => "-".to_string(),
        },
        "time" => record
            .time
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3f").to_string())
            .unwrap_or_default(),
        "all" => record.status_count.all.to_string(),
        "success" => record.status_count.success.to_string(),
        "skipped" => record.status_count.skipped.to_string(),
        "fail" => record.status_count.fail.to_string(),
        "undefined" => record.status_count.undefined.to_string(),
        "percentSuccess" => format_percent(record.percent_success()),
        "percentSkipped" => format_percent(record.percent_skipped()),
        "percentFail" => format_percent(record.percent_fail()),
        "percentUndefined" => format_percent(record.percent_undefined()),
        "range" => format_number(derive(record).range),
        "iqr" => format_number(derive(record).iqr),
        "totalCount" => format_number(derive(record).total_count),
        "failrate" => format_number(derive(record).failrate),
        "sla" => derive(record).sla.label().to_string(),
        _ => String::new(),
    }
}

fn metric(name: &str) -> Option<Metric> {
    Metric::ALL.into_iter().find(|m| m.name() == name)
}

/// Whole numbers render without a decimal point, everything else with the
/// shortest round-trip representation.
fn format_number(value: Option<f64>) -> String {
    match value {
        None => String::new(),
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        Some(v) => format!("{}", v),
    }
}

/// Global minimum of `ok_min` and maximum of `ok_max` across the given
/// records, for normalized box-plot scales. Count-like records and records
/// without both bounds are skipped. One O(N) scan.
pub fn extremes<'a, I>(records: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = &'a ReportRecord>,
{
    let mut result: Option<(f64, f64)> = None;
    for record in records {
        if record.record_type.is_count() {
            continue;
        }
        let (Some(min), Some(max)) = (record.ok.min, record.ok.max) else {
            continue;
        };
        result = Some(match result {
            None => (min, max),
            Some((lo, hi)) => (lo.min(min), hi.max(max)),
        });
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use serde_json::json;

    fn records() -> Vec<ReportRecord> {
        aggregate(
            &[
                json!({"type": "Step", "status": "Success", "name": "beta", "duration": 200}),
                json!({"type": "Step", "status": "Fail", "name": "alpha", "duration": 50}),
                json!({"type": "MessageInfo", "name": "note"}),
                json!({"type": "MessageWarn", "name": "careful"}),
                json!({"type": "Assert", "status": "Success", "name": "alpha", "duration": 50}),
            ],
            None,
        )
        .records
    }

    fn refs(records: &[ReportRecord]) -> Vec<&ReportRecord> {
        records.iter().collect()
    }

    #[test]
    fn projects_fields_in_requested_order() {
        let records = records();
        let view = ViewBuilder::new().build(
            &refs(&records),
            &ViewQuery {
                fields: vec!["name".into(), "status".into(), "duration".into()],
                ..ViewQuery::default()
            },
        );
        assert_eq!(view.headers, vec!["name", "status", "duration"]);
        assert_eq!(view.rows[0], vec!["beta", "Success", "200"]);
        // missing duration renders as "-"
        assert_eq!(view.rows[2], vec!["note", "None", "-"]);
    }

    #[test]
    fn substring_type_filter_matches_families() {
        let records = records();
        let view = ViewBuilder::new().build(
            &refs(&records),
            &ViewQuery {
                fields: vec!["type".into()],
                type_filter: vec!["Message".into()],
                ..ViewQuery::default()
            },
        );
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.rows[0], vec!["MessageInfo"]);
        assert_eq!(view.rows[1], vec!["MessageWarn"]);
    }

    #[test]
    fn filtered_out_everything_is_an_empty_view() {
        let records = records();
        let view = ViewBuilder::new().build(
            &refs(&records),
            &ViewQuery {
                fields: vec!["name".into()],
                type_filter: vec!["Gauge".into()],
                ..ViewQuery::default()
            },
        );
        assert!(view.rows.is_empty());
        assert_eq!(view.headers, vec!["name"]);
    }

    #[test]
    fn multi_key_sort_is_stable() {
        let records = records();
        let view = ViewBuilder::new().build(
            &refs(&records),
            &ViewQuery {
                fields: vec!["name".into(), "type".into()],
                sort_fields: vec!["name".into()],
                ..ViewQuery::default()
            },
        );
        // two "alpha" records keep input order (Step before Assert)
        assert_eq!(view.rows[0], vec!["alpha", "Step"]);
        assert_eq!(view.rows[1], vec!["alpha", "Assert"]);
        assert_eq!(view.rows[2], vec!["beta", "Step"]);
    }

    #[test]
    fn numeric_fields_sort_numerically() {
        let records = aggregate(
            &[
                json!({"type": "Step", "name": "a", "duration": 1000}),
                json!({"type": "Step", "name": "b", "duration": 200}),
                json!({"type": "Step", "name": "c", "duration": 30}),
            ],
            None,
        )
        .records;
        let view = ViewBuilder::new().build(
            &refs(&records),
            &ViewQuery {
                fields: vec!["name".into()],
                sort_fields: vec!["duration".into()],
                ..ViewQuery::default()
            },
        );
        assert_eq!(view.rows, vec![vec!["c"], vec!["b"], vec!["a"]]);
    }

    #[test]
    fn labels_and_customizers_apply() {
        let records = records();
        let mut labels = BTreeMap::new();
        labels.insert("name".to_string(), "Item".to_string());
        let view = ViewBuilder::new()
            .with_labels(labels)
            .with_customizer("status", |_, value, _| format!("[{}]", value))
            .build(
                &refs(&records),
                &ViewQuery {
                    fields: vec!["name".into(), "status".into()],
                    ..ViewQuery::default()
                },
            );
        assert_eq!(view.headers, vec!["Item", "status"]);
        assert_eq!(view.rows[0][1], "[Success]");
    }

    #[test]
    fn renders_metric_and_derived_fields() {
        let records = aggregate(
            &[json!({
                "type": "Metric", "name": "m",
                "ok_count": 95.0, "ok_min": 10.0, "ok_max": 50.0,
                "ok_p25": 20.0, "ok_p75": 40.0,
                "nok_count": 5.0, "failed": 5.0, "ok_sla": 1.0,
            })],
            None,
        )
        .records;
        let r = &records[0];
        assert_eq!(field_text(r, "ok_count"), "95");
        assert_eq!(field_text(r, "nok_count"), "5");
        assert_eq!(field_text(r, "ok_p50"), "");
        assert_eq!(field_text(r, "range"), "40");
        assert_eq!(field_text(r, "iqr"), "20");
        assert_eq!(field_text(r, "failrate"), "5");
        assert_eq!(field_text(r, "sla"), "OK");
        assert_eq!(field_text(r, "noSuchField"), "");
    }

    #[test]
    fn extremes_skip_count_records_and_missing_bounds() {
        let records = aggregate(
            &[
                json!({"type": "Metric", "name": "a", "ok_min": 10.0, "ok_max": 50.0}),
                json!({"type": "Metric", "name": "b", "ok_min": 5.0, "ok_max": 30.0}),
                json!({"type": "Count", "name": "c", "ok_min": 1.0, "ok_max": 999.0}),
                json!({"type": "Metric", "name": "d", "ok_min": 1.0}),
            ],
            None,
        )
        .records;
        assert_eq!(extremes(&records), Some((5.0, 50.0)));
        let empty: Vec<ReportRecord> = Vec::new();
        assert_eq!(extremes(&empty), None);
    }
}
