//! Tree and list aggregation
//!
//! One depth-first pre-order walk over the raw record trees builds an
//! arena of [`ReportRecord`]s, per-type/per-status index buckets, the
//! exception index, and the bottom-up status rollups. The pass is pure:
//! every call produces a fresh index, and non-fatal problems are collected
//! into `warnings` instead of being printed.

use crate::classifier::classify;
use crate::{
    compute_stats_id, RawRecord, RecordStatus, RecordType, ReportRecord, StatusCount,
};
use std::collections::BTreeMap;

/// Per-type index bucket: all records of the type, plus per-status slices
#[derive(Debug, Clone, Default)]
pub struct StatusBuckets {
    pub all: Vec<usize>,
    pub success: Vec<usize>,
    pub skipped: Vec<usize>,
    pub fail: Vec<usize>,
    pub undefined: Vec<usize>,
}

impl StatusBuckets {
    fn push(&mut self, status: RecordStatus, idx: usize) {
        self.all.push(idx);
        match status {
            RecordStatus::Success => self.success.push(idx),
            RecordStatus::Skipped => self.skipped.push(idx),
            RecordStatus::Fail => self.fail.push(idx),
            RecordStatus::None => self.undefined.push(idx),
        }
    }

    pub fn for_status(&self, status: RecordStatus) -> &[usize] {
        match status {
            RecordStatus::Success => &self.success,
            RecordStatus::Skipped => &self.skipped,
            RecordStatus::Fail => &self.fail,
            RecordStatus::None => &self.undefined,
        }
    }
}

/// Outcome shares within one record type, for the percentage table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypePercentages {
    pub success: Option<f64>,
    pub skipped: Option<f64>,
    pub fail: Option<f64>,
    pub undefined: Option<f64>,
}

/// Flat, indexed view of every record from every loaded source
#[derive(Debug, Default)]
pub struct RecordIndex {
    /// The arena; `parent`/`children` fields refer into this vector
    pub records: Vec<ReportRecord>,
    /// Arena indices of the top-level records, in input order
    pub roots: Vec<usize>,
    /// Arena indices of records carrying an exception message or stacktrace
    pub exceptions: Vec<usize>,
    /// Non-fatal classification problems, in walk order
    pub warnings: Vec<String>,
    by_type: BTreeMap<RecordType, StatusBuckets>,
}

impl RecordIndex {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records of a type, in walk order
    pub fn of_type(&self, record_type: RecordType) -> &[usize] {
        self.by_type
            .get(&record_type)
            .map(|b| b.all.as_slice())
            .unwrap_or(&[])
    }

    /// Records of a type with a specific status
    pub fn of_type_status(&self, record_type: RecordType, status: RecordStatus) -> &[usize] {
        self.by_type
            .get(&record_type)
            .map(|b| b.for_status(status))
            .unwrap_or(&[])
    }

    /// Types that actually occurred, in enum order
    pub fn seen_types(&self) -> impl Iterator<Item = RecordType> + '_ {
        self.by_type.keys().copied()
    }

    /// Outcome shares within one type; fields are `None` when the type
    /// never occurred.
    pub fn type_percentages(&self, record_type: RecordType) -> TypePercentages {
        let count = StatusCount {
            all: self.of_type(record_type).len() as u64,
            success: self.of_type_status(record_type, RecordStatus::Success).len() as u64,
            skipped: self.of_type_status(record_type, RecordStatus::Skipped).len() as u64,
            fail: self.of_type_status(record_type, RecordStatus::Fail).len() as u64,
            undefined: self.of_type_status(record_type, RecordStatus::None).len() as u64,
        };
        TypePercentages {
            success: count.percent(count.success),
            skipped: count.percent(count.skipped),
            fail: count.percent(count.fail),
            undefined: count.percent(count.undefined),
        }
    }
}

/// Aggregate raw record trees into a fresh [`RecordIndex`].
///
/// `default_test` backfills records that carry no test name of their own
/// (the report envelope's test name).
pub fn aggregate(roots: &[serde_json::Value], default_test: Option<&str>) -> RecordIndex {
    let mut index = RecordIndex::default();
    for root in roots {
        if let Some(idx) = walk(&mut index, root, None, 0, default_test) {
            index.roots.push(idx);
        }
    }
    index
}

/// Recursive walk: classify the node, insert it into the arena and the
/// buckets, recurse into children, then roll the children's counts up.
/// Returns `None` for nodes that are skipped.
///
/// Recursion depth equals tree depth, which stays in the low hundreds for
/// real reports.
fn walk(
    index: &mut RecordIndex,
    value: &serde_json::Value,
    parent: Option<usize>,
    level: u32,
    default_test: Option<&str>,
) -> Option<usize> {
    // Only objects that carry at least one field are records.
    if !value.as_object().is_some_and(|map| !map.is_empty()) {
        return None;
    }

    let raw: RawRecord = match serde_json::from_value(value.clone()) {
        Ok(raw) => raw,
        Err(err) => {
            index.warnings.push(format!("skipping malformed record: {}", err));
            return None;
        }
    };

    let classified = classify(&raw, &mut index.warnings);
    let test = raw
        .test
        .clone()
        .filter(|t| !t.is_empty())
        .or_else(|| default_test.map(str::to_string))
        .unwrap_or_default();
    let usecase = raw.usecase.clone().unwrap_or_default();
    let path = raw.path.clone().unwrap_or_default();
    let name = raw.name.clone().unwrap_or_default();
    let code = raw.code.clone().unwrap_or_default();
    let stats_id = compute_stats_id(
        classified.record_type,
        &test,
        &usecase,
        &path,
        &name,
        &code,
    );

    let record = ReportRecord {
        record_type: classified.record_type,
        status: classified.status,
        test,
        usecase,
        path,
        name,
        code,
        time: classified.time,
        duration: classified.duration,
        item_number: classified.item_number,
        exception_message: raw.exception_message.clone(),
        exception_stacktrace: raw.exception_stacktrace.clone(),
        ok: raw.ok_stats(),
        nok: raw.nok_stats(),
        tallies: raw.tallies(),
        ok_sla: raw.ok_sla,
        nok_sla: raw.nok_sla,
        series: raw.series.clone(),
        parent,
        children: Vec::new(),
        level,
        status_count: StatusCount::for_status(classified.status),
        stats_id,
    };

    let idx = index.records.len();
    index.records.push(record);
    index
        .by_type
        .entry(classified.record_type)
        .or_default()
        .push(classified.status, idx);
    if index.records[idx].has_exception() {
        index.exceptions.push(idx);
    }

    let mut rollup = StatusCount::default();
    for child_value in &raw.children {
        if let Some(child_idx) = walk(index, child_value, Some(idx), level + 1, default_test) {
            index.records[idx].children.push(child_idx);
            rollup.add(&index.records[child_idx].status_count);
        }
    }
    // Totals are final only after every child has returned.
    index.records[idx].status_count.add(&rollup);

    Some(idx)
}
