//! Status normalization for results written by any producer

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical status used in summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportStatus {
    Pass,
    Fail,
    Warn,
    Unknown,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pass => "PASS",
            ReportStatus::Fail => "FAIL",
            ReportStatus::Warn => "WARN",
            ReportStatus::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalizer for loosely typed result records
pub struct Normalizer;

impl Normalizer {
    /// Map a producer status onto the canonical set
    ///
    /// `ERROR` counts as a failure here: a check that could not be evaluated
    /// needs the same attention as one that failed.
    pub fn normalize_status(value: Option<&Value>) -> ReportStatus {
        let Some(text) = value.and_then(Self::text) else {
            return ReportStatus::Unknown;
        };

        match text.trim().to_uppercase().as_str() {
            "PASS" | "PASSED" | "SUCCESS" => ReportStatus::Pass,
            "FAIL" | "FAILED" | "ERROR" => ReportStatus::Fail,
            "WARN" | "WARNING" => ReportStatus::Warn,
            _ => ReportStatus::Unknown,
        }
    }

    /// String form of a JSON value, `None` for null and empty values
    pub fn text(value: &Value) -> Option<String> {
        match value {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::Array(a) if a.is_empty() => None,
            Value::Object(o) if o.is_empty() => None,
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}
