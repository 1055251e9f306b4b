//! Integration tests: full pipeline from JSON sources to aggregated output

use hierastats::datapoints::expand;
use hierastats::reporter::{CsvReporter, JsonReporter};
use hierastats::stats::{derive, group_by, SlaStatus};
use hierastats::view::{ViewBuilder, ViewQuery};
use hierastats::{analyze_sources, AnalyzedReport, RecordStatus, RecordType};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_source(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn nightly_report(dir: &TempDir) -> AnalyzedReport {
    let envelope = write_source(
        dir,
        "report.json",
        r#"{
            "test": "nightly",
            "properties": {"env": "staging"},
            "records": [
                {
                    "type": "Group", "name": "checkout", "usecase": "shop",
                    "children": [
                        {"type": "Step", "status": "Success", "name": "add to cart", "duration": 120},
                        {"type": "Step", "status": "Fail", "name": "pay",
                         "duration": 300, "exceptionMessage": "card declined"},
                        {"type": "Assert", "status": "Success", "name": "order total"}
                    ]
                }
            ]
        }"#,
    );
    let metrics = write_source(
        dir,
        "metrics.json",
        r#"[
            {
                "type": "Metric", "name": "response time", "test": "nightly",
                "ok_count": 95.0, "nok_count": 5.0, "failed": 5.0,
                "ok_min": 10.0, "ok_max": 50.0, "ok_p25": 20.0, "ok_p75": 40.0,
                "ok_sla": 1.0,
                "series": {
                    "time": [1000, 2000, 3000],
                    "ok": {"avg": [20.0, 25.0, 30.0]},
                    "nok": {"count": [0.0, 1.0, null]}
                }
            }
        ]"#,
    );
    analyze_sources(&[envelope, metrics]).unwrap()
}

#[test]
fn full_pipeline_aggregates_both_sources() {
    let dir = TempDir::new().unwrap();
    let report = nightly_report(&dir);

    assert_eq!(report.test.as_deref(), Some("nightly"));
    assert_eq!(report.properties["env"], "staging");
    assert!(report.warnings.is_empty());

    // 4 records from the envelope tree + 1 metric record
    assert_eq!(report.index.len(), 5);
    assert_eq!(report.index.roots.len(), 2);

    let root = &report.index.records[report.index.roots[0]];
    assert_eq!(root.status_count.all, 4);
    assert_eq!(root.status_count.success, 2);
    assert_eq!(root.status_count.fail, 1);
    // envelope test name backfills records without one
    assert_eq!(root.test, "nightly");

    assert_eq!(report.index.exceptions.len(), 1);
    assert_eq!(report.index.of_type(RecordType::Step).len(), 2);
    assert_eq!(
        report
            .index
            .of_type_status(RecordType::Step, RecordStatus::Fail)
            .len(),
        1
    );
}

#[test]
fn derived_metrics_and_datapoints_join_on_stats_id() {
    let dir = TempDir::new().unwrap();
    let report = nightly_report(&dir);

    let metric_idx = report.index.of_type(RecordType::Metric)[0];
    let metric = &report.index.records[metric_idx];

    let derived = derive(metric);
    assert_eq!(derived.range, Some(40.0));
    assert_eq!(derived.iqr, Some(20.0));
    assert_eq!(derived.total_count, Some(100.0));
    assert_eq!(derived.failrate, Some(5.0));
    assert_eq!(derived.sla, SlaStatus::Ok);

    let mut warnings = Vec::new();
    let points = expand(metric, &mut warnings);
    assert!(warnings.is_empty());
    assert_eq!(points.len(), 3);
    assert_eq!(points[0].time, 1000);
    assert_eq!(points[1].values["ok_avg"], Some(25.0));
    assert_eq!(points[2].values["nok_count"], None);
    for point in &points {
        assert_eq!(point.stats_id, metric.stats_id);
    }
}

#[test]
fn grouped_statistics_over_the_index() {
    let dir = TempDir::new().unwrap();
    let report = nightly_report(&dir);

    let by_type = group_by(&report.index.records, "type");
    assert_eq!(by_type["Step"].count, 2);
    assert_eq!(by_type["Step"].fail, 1);
    assert_eq!(by_type["Step"].duration_sum, Some(420.0));
    assert_eq!(by_type["Step"].duration_avg, Some(210.0));
    assert_eq!(by_type["Assert"].duration_sum, None);
}

#[test]
fn table_view_from_the_index() {
    let dir = TempDir::new().unwrap();
    let report = nightly_report(&dir);

    let records: Vec<_> = report.index.records.iter().collect();
    let view = ViewBuilder::new().build(
        &records,
        &ViewQuery {
            fields: vec!["name".into(), "status".into(), "duration".into()],
            type_filter: vec!["Step".into()],
            sort_fields: vec!["duration".into()],
        },
    );

    assert_eq!(view.rows.len(), 2);
    assert_eq!(view.rows[0], vec!["add to cart", "Success", "120"]);
    assert_eq!(view.rows[1], vec!["pay", "Fail", "300"]);
}

#[test]
fn exports_stay_consistent_with_the_index() {
    let dir = TempDir::new().unwrap();
    let report = nightly_report(&dir);

    let json_text = JsonReporter::new().report(&report.index);
    let parsed: serde_json::Value = serde_json::from_str(&json_text).unwrap();
    let roots = parsed.as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["statusCount"]["all"], 4);
    assert!(roots[0].get("parent").is_none());
    assert_eq!(roots[0]["children"].as_array().unwrap().len(), 3);

    let csv = CsvReporter::new().report(&report.index);
    // header + 5 records
    assert_eq!(csv.lines().count(), 6);
    assert!(csv.lines().nth(1).unwrap().starts_with("checkout;Group;None"));
}

#[test]
fn broken_source_warns_but_does_not_stop_the_run() {
    let dir = TempDir::new().unwrap();
    let good = write_source(
        &dir,
        "good.json",
        r#"[{"type": "Step", "status": "Success", "name": "a"}]"#,
    );
    let broken = write_source(&dir, "broken.json", "{nope");
    let missing = dir.path().join("missing.json");

    let report = analyze_sources(&[broken, missing, good]).unwrap();
    assert_eq!(report.index.len(), 1);
    assert_eq!(report.warnings.len(), 2);
}

#[test]
fn unknown_vocabulary_degrades_to_defaults_with_warnings() {
    let dir = TempDir::new().unwrap();
    let source = write_source(
        &dir,
        "odd.json",
        r#"[{"type": "Banana", "status": "Sideways", "name": "odd one"}]"#,
    );

    let report = analyze_sources(&[source]).unwrap();
    assert_eq!(report.index.len(), 1);
    let record = &report.index.records[0];
    assert_eq!(record.record_type, RecordType::Unknown);
    assert_eq!(record.status, RecordStatus::None);
    assert_eq!(report.warnings.len(), 2);
}
