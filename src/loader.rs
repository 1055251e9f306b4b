//! Loading of JSON data sources
//!
//! Sources are deduplicated by path and loaded strictly in the order given,
//! so the record append order is deterministic. A source that cannot be
//! read or parsed contributes nothing and the chain keeps going; only a
//! payload that is valid JSON but neither an array nor an object stops the
//! run.

use crate::ReportError;
use anyhow::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Report envelope: metadata plus the record array
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawReport {
    pub test: Option<String>,
    pub properties: BTreeMap<String, String>,
    pub records: Vec<serde_json::Value>,
}

/// Everything collected from the configured sources, in load order
#[derive(Debug, Default)]
pub struct LoadedSources {
    /// Test name from the first envelope that carried one
    pub test: Option<String>,
    /// Envelope properties, merged first-wins
    pub properties: BTreeMap<String, String>,
    /// Top-level record values from every source, in load order
    pub roots: Vec<serde_json::Value>,
    /// Sources that failed to load or parse
    pub warnings: Vec<String>,
}

/// Load all sources. Duplicated paths are loaded once (first occurrence
/// wins the position).
pub fn load_sources(paths: &[PathBuf]) -> Result<LoadedSources> {
    let mut loaded = LoadedSources::default();
    let mut seen: Vec<&Path> = Vec::new();

    for path in paths {
        if seen.contains(&path.as_path()) {
            continue;
        }
        seen.push(path.as_path());
        load_one(path, &mut loaded)?;
    }
    Ok(loaded)
}

fn load_one(path: &Path, loaded: &mut LoadedSources) -> Result<()> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            loaded
                .warnings
                .push(format!("could not load '{}': {}", path.display(), err));
            return Ok(());
        }
    };

    let payload: serde_json::Value = match serde_json::from_str(&content) {
        Ok(payload) => payload,
        Err(err) => {
            loaded
                .warnings
                .push(format!("could not parse '{}': {}", path.display(), err));
            return Ok(());
        }
    };

    match payload {
        serde_json::Value::Array(records) => loaded.roots.extend(records),
        serde_json::Value::Object(_) => {
            let report: RawReport = match serde_json::from_value(payload) {
                Ok(report) => report,
                Err(err) => {
                    loaded.warnings.push(format!(
                        "invalid report envelope in '{}': {}",
                        path.display(),
                        err
                    ));
                    return Ok(());
                }
            };
            if loaded.test.is_none() {
                loaded.test = report.test;
            }
            for (key, value) in report.properties {
                loaded.properties.entry(key).or_insert(value);
            }
            loaded.roots.extend(report.records);
        }
        _ => {
            return Err(ReportError::InvalidPayload {
                path: path.to_path_buf(),
            }
            .into())
        }
    }
    Ok(())
}
