//! kubecis Report - Reading and summarizing audit results
//!
//! This crate provides:
//! - Raw loading of a results artifact, whatever wrapper it was written in
//! - Status normalization across producers
//! - `aggregate`: counts by status and source document plus the top failures
//!
//! # Example
//!
//! ```no_run
//! # async fn run() -> kubecis_core::Result<()> {
//! let summary = kubecis_report::summarize_file("/output/results.json").await?;
//! println!("{} checks, {} top failures", summary.report.total_checks, summary.report.top_failed.len());
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod normalize;
pub mod raw;

pub use aggregate::{
    aggregate, aggregate_results, AggregateReport, ProcessedSummary, StatusCounts, SummaryMeta,
    SummaryTotals, TopFailure,
};
pub use normalize::{Normalizer, ReportStatus};
pub use raw::{extract_records, load_raw};

use kubecis_core::Result;
use std::path::Path;

/// Load a results artifact and build its processed summary
pub async fn summarize_file(path: impl AsRef<Path>) -> Result<ProcessedSummary> {
    let path = path.as_ref();
    let records = load_raw(path).await?;
    Ok(ProcessedSummary::new(
        aggregate(&records),
        path.display().to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_summarize_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("results.json");
        std::fs::write(
            &path,
            r#"[
                {"check_id": "1.1.1", "status": "FAIL", "_source_file": "master.yaml"},
                {"check_id": "1.1.2", "status": "PASS", "_source_file": "master.yaml"},
                {"check_id": "4.1.1", "status": "WARN", "_source_file": "node.yaml"}
            ]"#,
        )
        .unwrap();

        let summary = summarize_file(&path).await.unwrap();
        assert_eq!(summary.report.total_checks, 3);
        assert_eq!(summary.meta.source_path, path.display().to_string());

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(
            json["summary"],
            serde_json::json!({
                "total_checks": 3,
                "counts": {"PASS": 1, "FAIL": 1, "WARN": 1},
            })
        );
        assert_eq!(
            json["per_file"],
            serde_json::json!({
                "master.yaml": {"PASS": 1, "FAIL": 1},
                "node.yaml": {"WARN": 1},
            })
        );
        assert_eq!(json["counts_by_status"], json["summary"]["counts"]);
        assert_eq!(json["total_checks"], 3);
        assert_eq!(json["meta"]["source_path"], path.display().to_string());
        assert_eq!(json["top_failed"][0]["_source_file"], "master.yaml");
        assert_eq!(json["top_failed"].as_array().unwrap().len(), 1);
    }
}
