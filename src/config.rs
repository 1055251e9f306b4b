//! Configuration loading for hierastats

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = ".hierastatsrc.json";

/// Project configuration. Every field is optional; CLI flags override
/// whatever the file says.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// CSV column separator (default ";")
    pub csv_separator: Option<String>,
    /// Default fields for table views
    pub fields: Option<Vec<String>>,
    /// Field name to column label mapping for table views
    pub labels: BTreeMap<String, String>,
    /// Default sort fields for table views
    pub sort: Vec<String>,
    /// Default record type filter for table views
    pub type_filter: Vec<String>,
}

impl Config {
    pub fn separator(&self) -> &str {
        self.csv_separator.as_deref().unwrap_or(";")
    }

    /// Fields shown when neither the config nor the CLI names any
    pub fn default_fields() -> Vec<String> {
        ["name", "type", "status", "duration", "all", "percentSuccess", "percentFail"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn view_fields(&self) -> Vec<String> {
        self.fields.clone().unwrap_or_else(Config::default_fields)
    }
}

/// Find and load the config file. Searches the working directory and its
/// parents unless an explicit path is given.
pub fn load_config(work_dir: &Path, custom_path: Option<&Path>) -> Result<Config> {
    let path = if let Some(p) = custom_path {
        let path = if p.is_absolute() {
            p.to_path_buf()
        } else {
            work_dir.join(p)
        };
        if path.exists() {
            Some(path)
        } else {
            anyhow::bail!("Config file not found: {}", path.display());
        }
    } else {
        find_config_in_parents(work_dir)
    };

    match path {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in config: {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}

/// Search for the config file in a directory and its parents
fn find_config_in_parents(mut dir: &Path) -> Option<PathBuf> {
    loop {
        let candidate = dir.join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
}
