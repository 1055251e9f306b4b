//! Per-record derived metrics: range, IQR, total count, failrate and SLA

use crate::ReportRecord;
use serde::Serialize;

/// SLA evaluation outcome. "Not evaluated" is a real third state and must
/// never collapse into pass or fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SlaStatus {
    Ok,
    Nok,
    #[default]
    NotEvaluated,
}

impl SlaStatus {
    /// Short display label; blank when the SLA was not evaluated
    pub fn label(&self) -> &'static str {
        match self {
            SlaStatus::Ok => "OK",
            SlaStatus::Nok => "NOK",
            SlaStatus::NotEvaluated => "",
        }
    }
}

/// Values derived from a record's pre-aggregated metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    /// `ok_max - ok_min`; absent for count-like records or missing operands
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<f64>,
    /// `ok_p75 - ok_p25`; same absence rules as `range`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iqr: Option<f64>,
    /// `ok_count + nok_count`; a missing side counts as zero only when the
    /// other side is present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<f64>,
    /// `failed * 100 / total_count`, absent when the denominator is zero
    /// or unknown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failrate: Option<f64>,
    pub sla: SlaStatus,
}

/// Compute the derived metrics for one record. Never panics on missing
/// values; anything that cannot be computed comes back as `None`.
pub fn derive(record: &ReportRecord) -> DerivedMetrics {
    // Count-like records have no duration distribution, so spread metrics
    // do not apply.
    let (range, iqr) = if record.record_type.is_count() {
        (None, None)
    } else {
        (
            sub(record.ok.max, record.ok.min),
            sub(record.ok.p75, record.ok.p25),
        )
    };

    let total_count = match (record.ok.count, record.nok.count) {
        (None, None) => None,
        (ok, nok) => Some(ok.unwrap_or(0.0) + nok.unwrap_or(0.0)),
    };

    let failrate = match (record.tallies.failed, total_count) {
        (Some(failed), Some(total)) if total > 0.0 => Some(failed * 100.0 / total),
        _ => None,
    };

    let sla = if record.ok_sla == Some(1.0) {
        SlaStatus::Ok
    } else if record.nok_sla == Some(1.0) {
        SlaStatus::Nok
    } else {
        SlaStatus::NotEvaluated
    };

    DerivedMetrics {
        range,
        iqr,
        total_count,
        failrate,
        sla,
    }
}

fn sub(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a - b),
        _ => None,
    }
}
