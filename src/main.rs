//! Hierastats: test report statistics CLI

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use hierastats::config::load_config;
use hierastats::reporter::{ConsoleReporter, CsvReporter, JsonReporter};
use hierastats::stats::group_by;
use hierastats::view::{ViewBuilder, ViewQuery};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Hierastats: statistics aggregation for hierarchical test reports
#[derive(Parser, Debug)]
#[command(name = "hierastats")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON data sources, loaded in the given order (duplicates ignored)
    #[arg(required = true)]
    sources: Vec<PathBuf>,

    /// Output the aggregated record tree as JSON
    #[arg(long, short)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Export the record tree as CSV
    #[arg(long)]
    csv: bool,

    /// CSV column separator (default from config, then ";")
    #[arg(long, value_name = "SEP")]
    separator: Option<String>,

    /// Print a table view instead of the summary
    #[arg(long)]
    table: bool,

    /// Comma-separated fields for the table view
    #[arg(long, value_name = "FIELDS")]
    fields: Option<String>,

    /// Comma-separated sort fields for the table view
    #[arg(long, value_name = "FIELDS")]
    sort: Option<String>,

    /// Keep only record types containing this text (repeatable)
    #[arg(long = "filter-type", value_name = "TEXT")]
    filter_type: Vec<String>,

    /// Print grouped statistics for a record field (e.g. name, type, test)
    #[arg(long, value_name = "FIELD")]
    group_by: Option<String>,

    /// Quiet mode (suppress warnings)
    #[arg(long, short)]
    quiet: bool,

    /// Verbose output
    #[arg(long, short)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Path to config file (default: search .hierastatsrc.json in current dir and parents)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = Args::parse();

    // Config search starts next to the first data source
    let work_dir = args.sources[0]
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let config = load_config(work_dir, args.config.as_deref())?;

    let report = hierastats::analyze_sources(&args.sources)?;

    let mut console = ConsoleReporter::new();
    if args.no_color {
        console = console.without_colors();
    }
    if args.verbose {
        console = console.verbose();
    }

    if !args.quiet {
        for warning in &report.warnings {
            console.warn(warning);
        }
    }

    if report.index.is_empty() {
        console.warn("no records found in the given sources");
        return Ok(ExitCode::from(2));
    }

    if args.json {
        let mut reporter = JsonReporter::new();
        if args.pretty {
            reporter = reporter.pretty();
        }
        println!("{}", reporter.report(&report.index));
        return Ok(ExitCode::SUCCESS);
    }

    if args.csv {
        let separator = args
            .separator
            .as_deref()
            .unwrap_or_else(|| config.separator());
        println!(
            "{}",
            CsvReporter::new()
                .with_separator(separator)
                .report(&report.index)
        );
        return Ok(ExitCode::SUCCESS);
    }

    if args.table {
        let query = ViewQuery {
            fields: args
                .fields
                .as_deref()
                .map(split_list)
                .unwrap_or_else(|| config.view_fields()),
            type_filter: if args.filter_type.is_empty() {
                config.type_filter.clone()
            } else {
                args.filter_type.clone()
            },
            sort_fields: args
                .sort
                .as_deref()
                .map(split_list)
                .unwrap_or_else(|| config.sort.clone()),
        };
        let records: Vec<_> = report.index.records.iter().collect();
        let view = ViewBuilder::new()
            .with_labels(config.labels.clone())
            .build(&records, &query);
        print_table(&view.headers, &view.rows);
        return Ok(ExitCode::SUCCESS);
    }

    console.report(&report);
    if let Some(ref field) = args.group_by {
        console.print_group_stats(field, &group_by(&report.index.records, field));
    }
    Ok(ExitCode::SUCCESS)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Plain fixed-width table, sized to the widest cell per column
fn print_table(headers: &[String], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths.get(i).copied().unwrap_or(0)))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", line(headers));
    println!("{}", "-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));
    for row in rows {
        println!("{}", line(row));
    }
}
