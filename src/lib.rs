//! Hierastats: statistics aggregation for hierarchical test reports
//!
//! This library turns nested test-execution records (JSON trees produced by
//! test runners) into flat indexes, rollup counts, grouped statistics and
//! table view models ready for rendering.

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod datapoints;
pub mod loader;
pub mod reporter;
pub mod stats;
pub mod view;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Hard errors raised by the library. Most bad input is tolerated and
/// reported as warnings; these are the exceptions.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The top-level payload of a source was valid JSON but neither a
    /// record array nor a report object.
    #[error("invalid payload in {}: expected a record array or a report object", path.display())]
    InvalidPayload { path: PathBuf },
}

/// The kind of a report record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordType {
    Group,
    Step,
    Wait,
    Assert,
    Exception,
    Metric,
    Count,
    Gauge,
    User,
    MessageInfo,
    MessageWarn,
    MessageError,
    Unknown,
}

impl RecordType {
    /// Every variant, in display order
    pub const ALL: [RecordType; 13] = [
        RecordType::Group,
        RecordType::Step,
        RecordType::Wait,
        RecordType::Assert,
        RecordType::Exception,
        RecordType::Metric,
        RecordType::Count,
        RecordType::Gauge,
        RecordType::User,
        RecordType::MessageInfo,
        RecordType::MessageWarn,
        RecordType::MessageError,
        RecordType::Unknown,
    ];

    /// Parse the wire spelling; `None` for anything unrecognized
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Group" => Some(RecordType::Group),
            "Step" => Some(RecordType::Step),
            "Wait" => Some(RecordType::Wait),
            "Assert" => Some(RecordType::Assert),
            "Exception" => Some(RecordType::Exception),
            "Metric" => Some(RecordType::Metric),
            "Count" => Some(RecordType::Count),
            "Gauge" => Some(RecordType::Gauge),
            "User" => Some(RecordType::User),
            "MessageInfo" => Some(RecordType::MessageInfo),
            "MessageWarn" => Some(RecordType::MessageWarn),
            "MessageError" => Some(RecordType::MessageError),
            "Unknown" => Some(RecordType::Unknown),
            _ => None,
        }
    }

    /// Count-like records carry a single tally instead of a duration
    /// distribution; range/IQR/box plots do not apply to them.
    pub fn is_count(&self) -> bool {
        !matches!(
            self,
            RecordType::Group | RecordType::Step | RecordType::Wait | RecordType::Metric
        )
    }

    /// Gauge-like records report a level that can go up and down
    pub fn is_gauge(&self) -> bool {
        matches!(self, RecordType::Gauge | RecordType::User)
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RecordType::Group => "Group",
            RecordType::Step => "Step",
            RecordType::Wait => "Wait",
            RecordType::Assert => "Assert",
            RecordType::Exception => "Exception",
            RecordType::Metric => "Metric",
            RecordType::Count => "Count",
            RecordType::Gauge => "Gauge",
            RecordType::User => "User",
            RecordType::MessageInfo => "MessageInfo",
            RecordType::MessageWarn => "MessageWarn",
            RecordType::MessageError => "MessageError",
            RecordType::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordStatus {
    Success,
    Skipped,
    Fail,
    /// No outcome reported (informational records, unfinished runs)
    None,
}

impl RecordStatus {
    /// Every variant, in display order
    pub const ALL: [RecordStatus; 4] = [
        RecordStatus::Success,
        RecordStatus::Skipped,
        RecordStatus::Fail,
        RecordStatus::None,
    ];

    /// Parse the wire spelling; `None` for anything unrecognized
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Success" => Some(RecordStatus::Success),
            "Skipped" => Some(RecordStatus::Skipped),
            "Fail" => Some(RecordStatus::Fail),
            "None" => Some(RecordStatus::None),
            _ => None,
        }
    }

    /// Collapse the four statuses into the two-sided ok/nok split used by
    /// the metric series.
    pub fn state(&self) -> RecordState {
        match self {
            RecordStatus::Success | RecordStatus::None => RecordState::Ok,
            RecordStatus::Fail | RecordStatus::Skipped => RecordState::Nok,
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RecordStatus::Success => "Success",
            RecordStatus::Skipped => "Skipped",
            RecordStatus::Fail => "Fail",
            RecordStatus::None => "None",
        };
        write!(f, "{}", name)
    }
}

/// Two-sided split of metric values: ok (passing side) vs nok (failing side)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    Ok,
    Nok,
}

impl std::fmt::Display for RecordState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordState::Ok => write!(f, "ok"),
            RecordState::Nok => write!(f, "nok"),
        }
    }
}

/// The metric columns carried per state (count plus distribution stats)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Count,
    Min,
    Avg,
    Max,
    Stdev,
    P25,
    P50,
    P75,
    P90,
    P95,
    P99,
}

impl Metric {
    /// Every metric, in wire order
    pub const ALL: [Metric; 11] = [
        Metric::Count,
        Metric::Min,
        Metric::Avg,
        Metric::Max,
        Metric::Stdev,
        Metric::P25,
        Metric::P50,
        Metric::P75,
        Metric::P90,
        Metric::P95,
        Metric::P99,
    ];

    /// Lowercase wire name, the suffix of the `ok_*`/`nok_*` fields
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Count => "count",
            Metric::Min => "min",
            Metric::Avg => "avg",
            Metric::Max => "max",
            Metric::Stdev => "stdev",
            Metric::P25 => "p25",
            Metric::P50 => "p50",
            Metric::P75 => "p75",
            Metric::P90 => "p90",
            Metric::P95 => "p95",
            Metric::P99 => "p99",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Per-state metric values. `None` means "no data" and is never rendered
/// or computed as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StateStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdev: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p25: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p50: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p75: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p90: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p95: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p99: Option<f64>,
}

impl StateStats {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Count => self.count,
            Metric::Min => self.min,
            Metric::Avg => self.avg,
            Metric::Max => self.max,
            Metric::Stdev => self.stdev,
            Metric::P25 => self.p25,
            Metric::P50 => self.p50,
            Metric::P75 => self.p75,
            Metric::P90 => self.p90,
            Metric::P95 => self.p95,
            Metric::P99 => self.p99,
        }
    }

    pub fn is_empty(&self) -> bool {
        Metric::ALL.iter().all(|m| self.get(*m).is_none())
    }
}

/// Pre-aggregated outcome tallies a record may carry on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusTallies {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub none: Option<f64>,
}

/// Time series attached to a record: parallel arrays, one slot per
/// aggregation interval. This compact shape exists only at the
/// serialization boundary; in-memory consumers get [`crate::datapoints::Datapoint`]
/// tuples instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Epoch millis, chronological
    #[serde(default)]
    pub time: Vec<i64>,
    /// Per-metric value arrays for the ok side
    #[serde(default)]
    pub ok: BTreeMap<String, Vec<Option<f64>>>,
    /// Per-metric value arrays for the nok side
    #[serde(default)]
    pub nok: BTreeMap<String, Vec<Option<f64>>>,
}

/// Rollup of record outcomes: the record itself plus everything below it.
///
/// Invariant after aggregation: `all == 1 + sum(children.all)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub all: u64,
    pub success: u64,
    pub skipped: u64,
    pub fail: u64,
    pub undefined: u64,
}

impl StatusCount {
    /// The count a single record contributes before children are added
    pub fn for_status(status: RecordStatus) -> Self {
        let mut count = StatusCount {
            all: 1,
            ..StatusCount::default()
        };
        *count.bucket_mut(status) += 1;
        count
    }

    pub fn bucket_mut(&mut self, status: RecordStatus) -> &mut u64 {
        match status {
            RecordStatus::Success => &mut self.success,
            RecordStatus::Skipped => &mut self.skipped,
            RecordStatus::Fail => &mut self.fail,
            RecordStatus::None => &mut self.undefined,
        }
    }

    pub fn add(&mut self, other: &StatusCount) {
        self.all += other.all;
        self.success += other.success;
        self.skipped += other.skipped;
        self.fail += other.fail;
        self.undefined += other.undefined;
    }

    /// Share of `part` in `all` as a percentage; `None` when `all` is zero
    /// (an empty total has no meaningful percentage).
    pub fn percent(&self, part: u64) -> Option<f64> {
        if self.all == 0 {
            None
        } else {
            Some(part as f64 * 100.0 / self.all as f64)
        }
    }
}

/// Render a percentage to one decimal; blank when there is no value
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}", v),
        None => String::new(),
    }
}

/// The tolerant wire shape of a single record. Everything is optional;
/// the classifier turns this into a [`ReportRecord`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub status: Option<String>,
    pub test: Option<String>,
    pub usecase: Option<String>,
    pub path: Option<String>,
    /// Older sources spell this `title`
    #[serde(alias = "title")]
    pub name: Option<String>,
    pub code: Option<String>,
    /// Epoch millis or an ISO-8601 string; older sources spell it `timestamp`
    #[serde(alias = "timestamp")]
    pub time: Option<serde_json::Value>,
    /// Milliseconds; non-numeric placeholders like "-" mean absent
    pub duration: Option<serde_json::Value>,
    #[serde(rename = "itemNumber")]
    pub item_number: Option<serde_json::Value>,
    #[serde(rename = "exceptionMessage")]
    pub exception_message: Option<String>,
    #[serde(rename = "exceptionStacktrace")]
    pub exception_stacktrace: Option<String>,

    pub ok_count: Option<f64>,
    pub ok_min: Option<f64>,
    pub ok_avg: Option<f64>,
    pub ok_max: Option<f64>,
    pub ok_stdev: Option<f64>,
    pub ok_p25: Option<f64>,
    pub ok_p50: Option<f64>,
    pub ok_p75: Option<f64>,
    pub ok_p90: Option<f64>,
    pub ok_p95: Option<f64>,
    pub ok_p99: Option<f64>,

    pub nok_count: Option<f64>,
    pub nok_min: Option<f64>,
    pub nok_avg: Option<f64>,
    pub nok_max: Option<f64>,
    pub nok_stdev: Option<f64>,
    pub nok_p25: Option<f64>,
    pub nok_p50: Option<f64>,
    pub nok_p75: Option<f64>,
    pub nok_p90: Option<f64>,
    pub nok_p95: Option<f64>,
    pub nok_p99: Option<f64>,

    pub success: Option<f64>,
    pub failed: Option<f64>,
    pub skipped: Option<f64>,
    pub aborted: Option<f64>,
    pub none: Option<f64>,

    /// 1 = ok-side SLA met
    pub ok_sla: Option<f64>,
    /// 1 = nok-side SLA violated
    pub nok_sla: Option<f64>,

    pub series: Option<Series>,

    /// Child nodes, kept as raw JSON so one malformed child cannot poison
    /// its siblings.
    pub children: Vec<serde_json::Value>,
}

impl RawRecord {
    pub fn ok_stats(&self) -> StateStats {
        StateStats {
            count: self.ok_count,
            min: self.ok_min,
            avg: self.ok_avg,
            max: self.ok_max,
            stdev: self.ok_stdev,
            p25: self.ok_p25,
            p50: self.ok_p50,
            p75: self.ok_p75,
            p90: self.ok_p90,
            p95: self.ok_p95,
            p99: self.ok_p99,
        }
    }

    pub fn nok_stats(&self) -> StateStats {
        StateStats {
            count: self.nok_count,
            min: self.nok_min,
            avg: self.nok_avg,
            max: self.nok_max,
            stdev: self.nok_stdev,
            p25: self.nok_p25,
            p50: self.nok_p50,
            p75: self.nok_p75,
            p90: self.nok_p90,
            p95: self.nok_p95,
            p99: self.nok_p99,
        }
    }

    pub fn tallies(&self) -> StatusTallies {
        StatusTallies {
            success: self.success,
            failed: self.failed,
            skipped: self.skipped,
            aborted: self.aborted,
            none: self.none,
        }
    }
}

/// A fully classified record inside the arena built by
/// [`aggregator::aggregate`]. Identity fields never change after
/// construction; `parent`/`children` are arena indices and are never
/// serialized (the JSON dump rebuilds nesting instead, so no cycles).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub status: RecordStatus,
    pub test: String,
    pub usecase: String,
    pub path: String,
    pub name: String,
    pub code: String,
    /// Epoch millis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    /// Milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_stacktrace: Option<String>,
    pub ok: StateStats,
    pub nok: StateStats,
    #[serde(flatten)]
    pub tallies: StatusTallies,
    #[serde(rename = "ok_sla", skip_serializing_if = "Option::is_none")]
    pub ok_sla: Option<f64>,
    #[serde(rename = "nok_sla", skip_serializing_if = "Option::is_none")]
    pub nok_sla: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<Series>,
    /// Arena index of the parent; root records have none
    #[serde(skip)]
    pub parent: Option<usize>,
    /// Arena indices of direct children, in input order
    #[serde(skip)]
    pub children: Vec<usize>,
    /// Depth in the tree, root = 0
    pub level: u32,
    pub status_count: StatusCount,
    /// SHA-256 over the identity tuple; join key between a record and its
    /// exploded datapoints
    pub stats_id: String,
}

impl ReportRecord {
    pub fn state(&self) -> RecordState {
        self.status.state()
    }

    pub fn has_exception(&self) -> bool {
        self.exception_message.is_some() || self.exception_stacktrace.is_some()
    }

    pub fn percent_success(&self) -> Option<f64> {
        self.status_count.percent(self.status_count.success)
    }

    pub fn percent_skipped(&self) -> Option<f64> {
        self.status_count.percent(self.status_count.skipped)
    }

    pub fn percent_fail(&self) -> Option<f64> {
        self.status_count.percent(self.status_count.fail)
    }

    pub fn percent_undefined(&self) -> Option<f64> {
        self.status_count.percent(self.status_count.undefined)
    }
}

/// Stable identity hash of a record: SHA-256 hex over the identity tuple.
/// A NUL byte terminates each field so adjacent fields cannot collide
/// ("ab","c" vs "a","bc").
pub fn compute_stats_id(
    record_type: RecordType,
    test: &str,
    usecase: &str,
    path: &str,
    name: &str,
    code: &str,
) -> String {
    let mut hasher = Sha256::new();
    for part in [
        record_type.to_string().as_str(),
        test,
        usecase,
        path,
        name,
        code,
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

/// Everything produced by one full analysis run
#[derive(Debug)]
pub struct AnalyzedReport {
    /// Test name from the first report envelope that carried one
    pub test: Option<String>,
    /// Properties from the report envelopes, merged first-wins
    pub properties: BTreeMap<String, String>,
    pub index: aggregator::RecordIndex,
    /// Non-fatal problems, load warnings first, then classification warnings
    pub warnings: Vec<String>,
}

/// Public API: load the given JSON sources and aggregate them into a
/// record index. Used by the CLI and programmatic consumers.
pub fn analyze_sources(paths: &[PathBuf]) -> anyhow::Result<AnalyzedReport> {
    let loaded = loader::load_sources(paths)?;
    let mut index = aggregator::aggregate(&loaded.roots, loaded.test.as_deref());
    let mut warnings = loaded.warnings;
    warnings.append(&mut index.warnings);
    Ok(AnalyzedReport {
        test: loaded.test,
        properties: loaded.properties,
        index,
        warnings,
    })
}
