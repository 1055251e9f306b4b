//! Normalization of raw wire values into the fixed record vocabulary
//!
//! Raw records arrive with free-form strings and mixed-type fields. The
//! classifier maps them onto [`RecordType`]/[`RecordStatus`] and explicit
//! `Option` values, collecting a warning for anything it had to discard.

use crate::{RawRecord, RecordStatus, RecordType};
use chrono::{DateTime, NaiveDateTime};

/// Result of classifying one raw record
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub record_type: RecordType,
    pub status: RecordStatus,
    /// Epoch millis
    pub time: Option<i64>,
    /// Milliseconds
    pub duration: Option<f64>,
    pub item_number: Option<u32>,
}

/// Classify the free-form fields of a raw record. Idempotent: feeding
/// already-canonical values back in yields the same classification and no
/// new warnings.
pub fn classify(raw: &RawRecord, warnings: &mut Vec<String>) -> Classification {
    let record_type = match raw.record_type.as_deref() {
        None | Some("") => RecordType::Unknown,
        Some(value) => match RecordType::parse(value) {
            Some(rt) => rt,
            None => {
                warnings.push(format!(
                    "unknown record type '{}' in record '{}', treated as Unknown",
                    value,
                    raw.name.as_deref().unwrap_or("")
                ));
                RecordType::Unknown
            }
        },
    };

    let status = match raw.status.as_deref() {
        None | Some("") => RecordStatus::None,
        Some(value) => match RecordStatus::parse(value) {
            Some(status) => status,
            None => {
                warnings.push(format!(
                    "unknown status '{}' in record '{}', treated as None",
                    value,
                    raw.name.as_deref().unwrap_or("")
                ));
                RecordStatus::None
            }
        },
    };

    let time = match &raw.time {
        None => None,
        Some(value) => match parse_time(value) {
            Some(millis) => Some(millis),
            None => {
                warnings.push(format!(
                    "unparseable time '{}' in record '{}'",
                    value,
                    raw.name.as_deref().unwrap_or("")
                ));
                None
            }
        },
    };

    Classification {
        record_type,
        status,
        time,
        duration: raw.duration.as_ref().and_then(parse_number),
        item_number: raw
            .item_number
            .as_ref()
            .and_then(parse_number)
            .filter(|n| *n >= 0.0)
            .map(|n| n as u32),
    }
}

/// Epoch millis from either a JSON number or an ISO-8601 string (with or
/// without a zone offset).
fn parse_time(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.timestamp_millis());
            }
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.and_utc().timestamp_millis())
        }
        _ => None,
    }
}

/// Numeric value from a JSON number or a numeric string. Placeholders like
/// "-" come back as `None`.
fn parse_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Fixed-width item number for list rendering: zero-padded to 4 digits,
/// blank when absent.
pub fn display_number(item_number: Option<u32>) -> String {
    match item_number {
        Some(n) => format!("{:04}", n),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn missing_fields_get_defaults() {
        let mut warnings = Vec::new();
        let c = classify(&raw(json!({})), &mut warnings);
        assert_eq!(c.record_type, RecordType::Unknown);
        assert_eq!(c.status, RecordStatus::None);
        assert_eq!(c.duration, None);
        assert_eq!(c.item_number, None);
        assert_eq!(c.time, None);
        assert!(warnings.is_empty());
    }

    #[test]
    fn unknown_type_warns_and_falls_back() {
        let mut warnings = Vec::new();
        let c = classify(
            &raw(json!({"type": "Sprocket", "name": "widget"})),
            &mut warnings,
        );
        assert_eq!(c.record_type, RecordType::Unknown);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Sprocket"));
        assert!(warnings[0].contains("widget"));
    }

    #[test]
    fn unknown_status_warns_and_falls_back() {
        let mut warnings = Vec::new();
        let c = classify(&raw(json!({"status": "Exploded"})), &mut warnings);
        assert_eq!(c.status, RecordStatus::None);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn classification_is_idempotent() {
        let input = raw(json!({
            "type": "Step",
            "status": "Success",
            "duration": 120.5,
            "itemNumber": 7,
            "time": 1700000000000i64,
        }));
        let mut warnings = Vec::new();
        let first = classify(&input, &mut warnings);

        let normalized = raw(json!({
            "type": first.record_type.to_string(),
            "status": first.status.to_string(),
            "duration": first.duration,
            "itemNumber": first.item_number,
            "time": first.time,
        }));
        let second = classify(&normalized, &mut warnings);
        assert_eq!(first, second);
        assert!(warnings.is_empty());
    }

    #[test]
    fn duration_placeholder_means_absent() {
        let mut warnings = Vec::new();
        let c = classify(&raw(json!({"duration": "-"})), &mut warnings);
        assert_eq!(c.duration, None);
        assert!(warnings.is_empty());

        let c = classify(&raw(json!({"duration": "250"})), &mut warnings);
        assert_eq!(c.duration, Some(250.0));
    }

    #[test]
    fn parses_iso_and_epoch_times() {
        let mut warnings = Vec::new();

        let c = classify(&raw(json!({"time": 1700000000000i64})), &mut warnings);
        assert_eq!(c.time, Some(1700000000000));

        let c = classify(
            &raw(json!({"timestamp": "2017-07-04T07:07:22.333"})),
            &mut warnings,
        );
        assert_eq!(c.time, Some(1499152042333));
        assert!(warnings.is_empty());

        let c = classify(&raw(json!({"time": "yesterday-ish"})), &mut warnings);
        assert_eq!(c.time, None);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn display_number_pads_to_four_digits() {
        assert_eq!(display_number(None), "");
        assert_eq!(display_number(Some(7)), "0007");
        assert_eq!(display_number(Some(42)), "0042");
        assert_eq!(display_number(Some(12345)), "12345");
    }
}
