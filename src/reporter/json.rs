//! JSON reporter for machine-readable output
//!
//! The dump rebuilds the record nesting from the arena, so the emitted
//! objects carry a `children` array but never a `parent` back-reference
//! (the output must stay cycle-free).

use crate::aggregator::RecordIndex;
use crate::format_percent;
use serde_json::json;

/// Reporter for JSON output
pub struct JsonReporter {
    /// Whether to pretty-print JSON
    pretty: bool,
}

impl JsonReporter {
    /// Create a new JSON reporter
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Enable pretty-printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Dump the whole record tree as a JSON array of nested records
    pub fn report(&self, index: &RecordIndex) -> String {
        let roots: Vec<serde_json::Value> = index
            .roots
            .iter()
            .map(|&idx| record_value(index, idx))
            .collect();

        if self.pretty {
            serde_json::to_string_pretty(&roots).unwrap_or_else(|_| "[]".to_string())
        } else {
            serde_json::to_string(&roots).unwrap_or_else(|_| "[]".to_string())
        }
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn record_value(index: &RecordIndex, idx: usize) -> serde_json::Value {
    let record = &index.records[idx];
    let mut value = serde_json::to_value(record).unwrap_or_else(|_| json!({}));

    if let serde_json::Value::Object(map) = &mut value {
        map.insert(
            "percentSuccess".to_string(),
            json!(format_percent(record.percent_success())),
        );
        map.insert(
            "percentSkipped".to_string(),
            json!(format_percent(record.percent_skipped())),
        );
        map.insert(
            "percentFail".to_string(),
            json!(format_percent(record.percent_fail())),
        );
        map.insert(
            "percentUndefined".to_string(),
            json!(format_percent(record.percent_undefined())),
        );
        let children: Vec<serde_json::Value> = record
            .children
            .iter()
            .map(|&child| record_value(index, child))
            .collect();
        map.insert("children".to_string(), serde_json::Value::Array(children));
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use serde_json::json;

    fn index() -> RecordIndex {
        aggregate(
            &[json!({
                "type": "Group", "name": "suite",
                "children": [
                    {"type": "Step", "status": "Success", "name": "a", "duration": 100},
                    {"type": "Step", "status": "Fail", "name": "b"},
                ],
            })],
            None,
        )
    }

    #[test]
    fn nests_children_and_omits_parent() {
        let json_text = JsonReporter::new().report(&index());
        let parsed: serde_json::Value = serde_json::from_str(&json_text).unwrap();

        let root = &parsed.as_array().unwrap()[0];
        assert_eq!(root["name"], "suite");
        assert!(root.get("parent").is_none());

        let children = root["children"].as_array().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0]["name"], "a");
        assert!(children[0].get("parent").is_none());
        assert!(children[0]["children"].as_array().unwrap().is_empty());
    }

    #[test]
    fn includes_rollups_and_percentages() {
        let json_text = JsonReporter::new().report(&index());
        let parsed: serde_json::Value = serde_json::from_str(&json_text).unwrap();

        let root = &parsed.as_array().unwrap()[0];
        assert_eq!(root["statusCount"]["all"], 3);
        assert_eq!(root["percentFail"], "33.3");
        assert_eq!(root["statsId"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn pretty_output_is_indented() {
        let json_text = JsonReporter::new().pretty().report(&index());
        assert!(json_text.contains('\n'));
        assert!(json_text.contains("  "));
    }

    #[test]
    fn empty_index_is_an_empty_array() {
        let index = aggregate(&[], None);
        assert_eq!(JsonReporter::new().report(&index), "[]");
    }
}
