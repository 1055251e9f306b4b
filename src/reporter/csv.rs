//! CSV export of the record tree
//!
//! One header row, then one row per record in depth-first pre-order, so
//! the file reads top-to-bottom like the tree. Separator occurrences
//! inside values are replaced so the column count stays fixed.

use crate::aggregator::RecordIndex;
use crate::{format_percent, ReportRecord};

const COLUMNS: [&str; 13] = [
    "Name",
    "Type",
    "Status",
    "Duration(ms)",
    "#Total",
    "#Success",
    "#Skipped",
    "#Fail",
    "#Undefined",
    "Success(%)",
    "Skipped(%)",
    "Fail(%)",
    "Undefined(%)",
];

/// Reporter for CSV output
pub struct CsvReporter {
    separator: String,
}

impl CsvReporter {
    /// Create a new CSV reporter with the default ";" separator
    pub fn new() -> Self {
        Self {
            separator: ";".to_string(),
        }
    }

    pub fn with_separator(mut self, separator: &str) -> Self {
        self.separator = separator.to_string();
        self
    }

    /// Export the whole record tree
    pub fn report(&self, index: &RecordIndex) -> String {
        let mut lines = vec![COLUMNS.join(&self.separator)];
        for &root in &index.roots {
            self.push_rows(index, root, &mut lines);
        }
        lines.join("\n")
    }

    fn push_rows(&self, index: &RecordIndex, idx: usize, lines: &mut Vec<String>) {
        lines.push(self.row(&index.records[idx]));
        for &child in &index.records[idx].children {
            self.push_rows(index, child, lines);
        }
    }

    fn row(&self, record: &ReportRecord) -> String {
        let duration = match record.duration {
            Some(d) => format!("{}", d),
            None => "-".to_string(),
        };
        let count = &record.status_count;
        [
            self.sanitize(&record.name),
            record.record_type.to_string(),
            record.status.to_string(),
            duration,
            count.all.to_string(),
            count.success.to_string(),
            count.skipped.to_string(),
            count.fail.to_string(),
            count.undefined.to_string(),
            format_percent(record.percent_success()),
            format_percent(record.percent_skipped()),
            format_percent(record.percent_fail()),
            format_percent(record.percent_undefined()),
        ]
        .join(&self.separator)
    }

    /// Keep the column count intact: separators and newlines inside values
    /// are replaced.
    fn sanitize(&self, value: &str) -> String {
        value.replace(&self.separator, "_").replace('\n', " ")
    }
}

impl Default for CsvReporter {
    fn default() -> Self {
        Self::new()
    }
}
