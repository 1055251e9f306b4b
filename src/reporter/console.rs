//! Console reporter with colored output

use crate::aggregator::RecordIndex;
use crate::stats::{derive, GroupStats, SlaStatus};
use crate::{format_percent, AnalyzedReport, RecordStatus, ReportRecord};
use colored::Colorize;
use std::collections::BTreeMap;

/// Reporter for terminal output
pub struct ConsoleReporter {
    /// Whether to use colors
    use_colors: bool,
    /// Whether to show verbose output
    verbose: bool,
}

impl ConsoleReporter {
    /// Create a new console reporter
    pub fn new() -> Self {
        Self {
            use_colors: true,
            verbose: false,
        }
    }

    /// Disable colors
    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    /// Enable verbose output
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Print the full report summary
    pub fn report(&self, report: &AnalyzedReport) {
        self.print_header(report);
        self.print_count_table(&report.index);
        self.print_percentage_table(&report.index);
        self.print_metric_summary(&report.index);
        self.print_exceptions(&report.index);
    }

    /// Print a warning line in the standard style
    pub fn warn(&self, message: &str) {
        if self.use_colors {
            eprintln!("{}: {}", "Warning".yellow(), message);
        } else {
            eprintln!("Warning: {}", message);
        }
    }

    fn print_header(&self, report: &AnalyzedReport) {
        println!();
        let title = match &report.test {
            Some(test) => format!("📊 Test Report Statistics: {}", test),
            None => "📊 Test Report Statistics".to_string(),
        };
        println!("{}", self.bold(&title));
        println!(
            "   Records: {} | Roots: {} | Exceptions: {}",
            report.index.len(),
            report.index.roots.len(),
            report.index.exceptions.len()
        );
        for (key, value) in &report.properties {
            println!("   {}: {}", key, value);
        }
        println!();
    }

    fn print_count_table(&self, index: &RecordIndex) {
        println!("   {}", self.bold("Counts by type and status:"));
        println!(
            "   {:<14} {:>8} {:>8} {:>8} {:>8} {:>10}",
            "Type", "All", "Success", "Skipped", "Fail", "Undefined"
        );
        for record_type in index.seen_types() {
            let fail = index.of_type_status(record_type, RecordStatus::Fail).len();
            let success = index
                .of_type_status(record_type, RecordStatus::Success)
                .len();
            println!(
                "   {:<14} {:>8} {:>8} {:>8} {:>8} {:>10}",
                record_type.to_string(),
                index.of_type(record_type).len(),
                self.green_if(success.to_string(), success > 0),
                index
                    .of_type_status(record_type, RecordStatus::Skipped)
                    .len(),
                self.red_if(fail.to_string(), fail > 0),
                index.of_type_status(record_type, RecordStatus::None).len(),
            );
        }
        println!();
    }

    fn print_percentage_table(&self, index: &RecordIndex) {
        println!("   {}", self.bold("Percentages by type:"));
        println!(
            "   {:<14} {:>10} {:>10} {:>10} {:>12}",
            "Type", "Success%", "Skipped%", "Fail%", "Undefined%"
        );
        for record_type in index.seen_types() {
            let pct = index.type_percentages(record_type);
            println!(
                "   {:<14} {:>10} {:>10} {:>10} {:>12}",
                record_type.to_string(),
                format_percent(pct.success),
                format_percent(pct.skipped),
                self.red_if(format_percent(pct.fail), pct.fail.unwrap_or(0.0) > 0.0),
                format_percent(pct.undefined),
            );
        }
        println!();
    }

    /// Derived metrics for records that carry pre-aggregated stats
    fn print_metric_summary(&self, index: &RecordIndex) {
        let metric_records: Vec<&ReportRecord> = index
            .records
            .iter()
            .filter(|r| !r.ok.is_empty() || !r.nok.is_empty())
            .collect();
        if metric_records.is_empty() {
            return;
        }

        println!("   {}", self.bold("Metrics:"));
        println!(
            "   {:<24} {:>10} {:>10} {:>10} {:>10} {:>6}",
            "Name", "Total", "Failrate", "Range", "IQR", "SLA"
        );
        for record in metric_records {
            let derived = derive(record);
            let sla = match derived.sla {
                SlaStatus::Ok => self.green_if("OK".to_string(), true),
                SlaStatus::Nok => self.red_if("NOK".to_string(), true),
                SlaStatus::NotEvaluated => String::new(),
            };
            println!(
                "   {:<24} {:>10} {:>10} {:>10} {:>10} {:>6}",
                record.name,
                number(derived.total_count),
                number(derived.failrate),
                number(derived.range),
                number(derived.iqr),
                sla,
            );
        }
        println!();
    }

    fn print_exceptions(&self, index: &RecordIndex) {
        if index.exceptions.is_empty() {
            return;
        }
        println!(
            "   {}",
            self.bold(&format!("Exceptions ({}):", index.exceptions.len()))
        );
        for &idx in &index.exceptions {
            let record = &index.records[idx];
            let message = record.exception_message.as_deref().unwrap_or("");
            println!(
                "   {} {} {}",
                self.red_if("✗".to_string(), true),
                record.name,
                message
            );
            if self.verbose {
                if let Some(ref stacktrace) = record.exception_stacktrace {
                    for line in stacktrace.lines() {
                        println!("       {}", line);
                    }
                }
            }
        }
        println!();
    }

    /// Print one grouped-statistics table
    pub fn print_group_stats(&self, field: &str, groups: &BTreeMap<String, GroupStats>) {
        println!("   {}", self.bold(&format!("Statistics by {}:", field)));
        println!(
            "   {:<24} {:>6} {:>8} {:>6} {:>6} {:>9} {:>9} {:>9} {:>9}",
            field, "Count", "Success", "Fail", "Exc", "Sum(ms)", "Min(ms)", "Avg(ms)", "Max(ms)"
        );
        for (key, stats) in groups {
            println!(
                "   {:<24} {:>6} {:>8} {:>6} {:>6} {:>9} {:>9} {:>9} {:>9}",
                key,
                stats.count,
                stats.success,
                self.red_if(stats.fail.to_string(), stats.fail > 0),
                stats.exceptions,
                number(stats.duration_sum),
                number(stats.duration_min),
                number(stats.duration_avg),
                number(stats.duration_max),
            );
        }
        println!();
    }

    fn bold(&self, text: &str) -> String {
        if self.use_colors {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn green_if(&self, text: String, condition: bool) -> String {
        if self.use_colors && condition {
            text.green().to_string()
        } else {
            text
        }
    }

    fn red_if(&self, text: String, condition: bool) -> String {
        if self.use_colors && condition {
            text.red().to_string()
        } else {
            text
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn number(value: Option<f64>) -> String {
    match value {
        None => "-".to_string(),
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{}", v as i64),
        Some(v) => format!("{:.1}", v),
    }
}
