//! Result aggregation
//!
//! Folds a flat list of result records into status counts, per-document
//! breakdowns, and a bounded list of the failures most worth reading.
//! All maps are ordered so the same input always serializes identically.

use crate::normalize::{Normalizer, ReportStatus};
use kubecis_core::{CheckResult, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Maximum entries in `top_failed`
pub const TOP_FAILED_LIMIT: usize = 20;

/// Line results kept on each top failure
pub const LINE_RESULTS_PREVIEW: usize = 8;

const UNKNOWN_SOURCE: &str = "unknown";

/// Counts keyed by canonical status
pub type StatusCounts = BTreeMap<ReportStatus, usize>;

/// A failed check, reduced to what a reviewer needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopFailure {
    pub check_id: Value,
    pub description: Value,
    pub status: ReportStatus,
    pub reason: Value,
    pub remediation: Value,
    #[serde(rename = "_source_file")]
    pub source_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_results: Option<Vec<Value>>,
}

impl TopFailure {
    fn sort_key(&self) -> (u8, String) {
        let tier = if self.line_results.is_some() { 0 } else { 1 };
        (tier, Normalizer::text(&self.check_id).unwrap_or_default())
    }
}

/// Summary of a results artifact
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub total_checks: usize,
    pub counts_by_status: StatusCounts,
    pub per_source_file: BTreeMap<String, StatusCounts>,
    pub top_failed: Vec<TopFailure>,
}

/// Where a processed summary was read from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMeta {
    pub source_path: String,
}

/// Headline totals, as read by dashboard clients
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTotals {
    pub total_checks: usize,
    pub counts: StatusCounts,
}

/// Aggregate report annotated with its source artifact
///
/// `summary` and `per_file` repeat the report's totals under the keys
/// dashboard clients read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedSummary {
    pub summary: SummaryTotals,
    pub per_file: BTreeMap<String, StatusCounts>,
    #[serde(flatten)]
    pub report: AggregateReport,
    pub meta: SummaryMeta,
}

impl ProcessedSummary {
    pub fn new(report: AggregateReport, source_path: impl Into<String>) -> Self {
        Self {
            summary: SummaryTotals {
                total_checks: report.total_checks,
                counts: report.counts_by_status.clone(),
            },
            per_file: report.per_source_file.clone(),
            report,
            meta: SummaryMeta {
                source_path: source_path.into(),
            },
        }
    }
}

/// Aggregate lenient records; entries that are not objects are ignored
pub fn aggregate(records: &[Value]) -> AggregateReport {
    let mut report = AggregateReport::default();
    let mut failures = Vec::new();

    for record in records.iter().filter_map(Value::as_object) {
        report.total_checks += 1;

        let status = Normalizer::normalize_status(record.get("status"));
        *report.counts_by_status.entry(status).or_insert(0) += 1;

        let source = source_of(record);
        *report
            .per_source_file
            .entry(source.clone())
            .or_default()
            .entry(status)
            .or_insert(0) += 1;

        if status == ReportStatus::Fail {
            failures.push(top_failure(record, status, source));
        }
    }

    // stable: equal keys keep input order
    failures.sort_by_key(TopFailure::sort_key);
    failures.truncate(TOP_FAILED_LIMIT);
    report.top_failed = failures;

    report
}

/// Aggregate typed results straight from an audit run
pub fn aggregate_results(results: &[CheckResult]) -> Result<AggregateReport> {
    let records = results
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(aggregate(&records))
}

fn source_of(record: &Map<String, Value>) -> String {
    ["_source_file", "source"]
        .iter()
        .find_map(|key| record.get(*key).and_then(Normalizer::text))
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
}

fn top_failure(record: &Map<String, Value>, status: ReportStatus, source: String) -> TopFailure {
    let field = |key: &str| record.get(key).cloned().unwrap_or(Value::Null);

    let line_results = match record.get("line_results") {
        Some(Value::Array(lines)) => {
            Some(lines.iter().take(LINE_RESULTS_PREVIEW).cloned().collect())
        }
        _ => None,
    };

    TopFailure {
        check_id: field("check_id"),
        description: field("description"),
        status,
        reason: field("reason"),
        remediation: field("remediation"),
        source_file: source,
        line_results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubecis_core::Status;
    use serde_json::json;

    fn record(id: &str, status: &str, source: &str) -> Value {
        json!({
            "check_id": id,
            "description": format!("check {}", id),
            "status": status,
            "reason": "r",
            "remediation": "fix",
            "_source_file": source,
        })
    }

    #[test]
    fn test_counts_and_sources() {
        let records = vec![
            record("1.1.1", "PASS", "master.yaml"),
            record("1.1.2", "FAIL", "master.yaml"),
            record("4.1.1", "ERROR", "node.yaml"),
            json!({"check_id": "x", "status": "skipped", "source": "alt.yaml"}),
            json!({"check_id": "y"}),
            json!("not a record"),
        ];
        let report = aggregate(&records);

        assert_eq!(report.total_checks, 5);
        assert_eq!(report.counts_by_status[&ReportStatus::Pass], 1);
        assert_eq!(report.counts_by_status[&ReportStatus::Fail], 2);
        assert_eq!(report.counts_by_status[&ReportStatus::Unknown], 2);
        assert!(!report.counts_by_status.contains_key(&ReportStatus::Warn));

        assert_eq!(report.per_source_file["master.yaml"][&ReportStatus::Fail], 1);
        assert_eq!(report.per_source_file["node.yaml"][&ReportStatus::Fail], 1);
        assert_eq!(report.per_source_file["alt.yaml"][&ReportStatus::Unknown], 1);
        assert_eq!(report.per_source_file["unknown"][&ReportStatus::Unknown], 1);

        // ERROR is reported under its canonical status
        assert_eq!(report.top_failed[1].status, ReportStatus::Fail);
    }

    #[test]
    fn test_top_failed_ordering_and_limit() {
        let mut records = Vec::new();
        // 22 single-line failures, inserted in reverse id order
        for i in (0..22).rev() {
            records.push(record(&format!("2.{:02}", i), "FAIL", "etcd.yaml"));
        }
        // 3 multi-line failures with high ids
        for i in [9, 7, 8] {
            let mut r = record(&format!("9.{}", i), "FAIL", "master.yaml");
            let lines: Vec<Value> = (0..12)
                .map(|n| json!({"line": format!("l{}", n), "status": "FAIL", "reason": "r"}))
                .collect();
            r["line_results"] = Value::Array(lines);
            records.push(r);
        }

        let report = aggregate(&records);
        assert_eq!(report.top_failed.len(), TOP_FAILED_LIMIT);

        let ids: Vec<String> = report
            .top_failed
            .iter()
            .map(|f| f.check_id.as_str().unwrap().to_string())
            .collect();
        assert_eq!(&ids[..3], &["9.7", "9.8", "9.9"]);
        assert_eq!(ids[3], "2.00");
        assert_eq!(ids[19], "2.16");

        let preview = report.top_failed[0].line_results.as_ref().unwrap();
        assert_eq!(preview.len(), LINE_RESULTS_PREVIEW);
        assert!(report.top_failed[3].line_results.is_none());
    }

    #[test]
    fn test_mixed_id_types_sort_as_strings() {
        let records = vec![
            json!({"check_id": 10, "status": "FAIL"}),
            json!({"check_id": "9", "status": "FAIL"}),
            json!({"status": "FAIL", "reason": "no id"}),
        ];
        let report = aggregate(&records);
        let ids: Vec<&Value> = report.top_failed.iter().map(|f| &f.check_id).collect();
        assert_eq!(ids, vec![&Value::Null, &json!(10), &json!("9")]);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let records = vec![
            record("b", "FAIL", "z.yaml"),
            record("a", "WARN", "a.yaml"),
            record("a", "FAIL", "m.yaml"),
        ];
        let first = serde_json::to_string(&aggregate(&records)).unwrap();
        let second = serde_json::to_string(&aggregate(&records)).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("\"counts_by_status\":{\"FAIL\":2,\"WARN\":1}"));
    }

    #[test]
    fn test_aggregate_results() {
        let results = vec![
            CheckResult::builder(Status::Fail, "bad")
                .check_id(Some("1.2.3".into()))
                .source_file("master.yaml")
                .build(),
            CheckResult::document_error("broken.yaml", "YAML file is empty or invalid"),
        ];
        let report = aggregate_results(&results).unwrap();
        assert_eq!(report.total_checks, 2);
        assert_eq!(report.counts_by_status[&ReportStatus::Fail], 2);
        assert_eq!(report.top_failed[0].check_id, Value::Null);
        assert_eq!(report.top_failed[1].source_file, "master.yaml");
    }
}
