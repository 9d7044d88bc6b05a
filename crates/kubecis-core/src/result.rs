//! Check results - the records that make up the audit output artifact

use crate::status::{Status, Verdict};
use serde::{Deserialize, Serialize};

/// Verdict for one line of a multi-line audit output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineResult {
    pub line: String,
    pub status: Status,
    pub reason: String,
}

impl LineResult {
    pub fn new(line: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            line: line.into(),
            status: verdict.status,
            reason: verdict.reason,
        }
    }
}

/// Outcome of auditing a single benchmark check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Check identifier (display label, not guaranteed unique)
    pub check_id: Option<String>,

    /// Check description text
    pub description: Option<String>,

    /// Final verdict
    pub status: Status,
    pub reason: String,

    /// Audit command as declared in the benchmark
    #[serde(default)]
    pub audit_command: Option<String>,

    /// Text produced by the command execution layer
    #[serde(default)]
    pub audit_output: Option<String>,

    /// Per-line verdicts, present only for multi-line checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_results: Option<Vec<LineResult>>,

    #[serde(default)]
    pub remediation: String,

    /// Benchmark document this result came from
    #[serde(rename = "_source_file", default)]
    pub source_file: Option<String>,
}

impl CheckResult {
    /// Create a new result builder
    pub fn builder(status: Status, reason: impl Into<String>) -> CheckResultBuilder {
        CheckResultBuilder::new(status, reason)
    }

    /// Synthetic result standing in for a benchmark document that could not be processed
    pub fn document_error(source: impl Into<String>, message: impl std::fmt::Display) -> Self {
        let source = source.into();
        Self::builder(
            Status::Error,
            format!("Failed to process {}: {}", source, message),
        )
        .source_file(source)
        .build()
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::new(self.status, self.reason.clone())
    }

    pub fn is_multi_line(&self) -> bool {
        self.line_results.is_some()
    }
}

/// Builder for constructing check results
pub struct CheckResultBuilder {
    result: CheckResult,
}

impl CheckResultBuilder {
    pub fn new(status: Status, reason: impl Into<String>) -> Self {
        Self {
            result: CheckResult {
                check_id: None,
                description: None,
                status,
                reason: reason.into(),
                audit_command: None,
                audit_output: None,
                line_results: None,
                remediation: String::new(),
                source_file: None,
            },
        }
    }

    pub fn check_id(mut self, id: Option<String>) -> Self {
        self.result.check_id = id;
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.result.description = description;
        self
    }

    pub fn audit_command(mut self, command: Option<String>) -> Self {
        self.result.audit_command = command;
        self
    }

    pub fn audit_output(mut self, output: impl Into<String>) -> Self {
        self.result.audit_output = Some(output.into());
        self
    }

    pub fn line_results(mut self, lines: Vec<LineResult>) -> Self {
        self.result.line_results = Some(lines);
        self
    }

    pub fn remediation(mut self, remediation: impl Into<String>) -> Self {
        self.result.remediation = remediation.into();
        self
    }

    pub fn source_file(mut self, source: impl Into<String>) -> Self {
        self.result.source_file = Some(source.into());
        self
    }

    pub fn build(self) -> CheckResult {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_builder() {
        let result = CheckResult::builder(Status::Pass, "All lines passed")
            .check_id(Some("1.1.1".into()))
            .description(Some("Ensure that the API server pod specification file permissions are set to 600 or more restrictive".into()))
            .audit_command(Some("stat -c permissions=%a /etc/kubernetes/manifests/kube-apiserver.yaml".into()))
            .audit_output("permissions=600")
            .line_results(vec![LineResult::new(
                "permissions=600",
                Verdict::pass("Permissions 0o600 <= 0o600"),
            )])
            .remediation("chmod 600 /etc/kubernetes/manifests/kube-apiserver.yaml")
            .source_file("cis-1.11/master.yaml")
            .build();

        assert_eq!(result.status, Status::Pass);
        assert!(result.is_multi_line());
        assert_eq!(result.source_file.as_deref(), Some("cis-1.11/master.yaml"));
    }

    #[test]
    fn test_serialized_shape() {
        let result = CheckResult::builder(Status::Warn, "Manual Check")
            .check_id(Some("1.2.1".into()))
            .source_file("cis-1.11/master.yaml")
            .build();

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "WARN");
        assert_eq!(value["_source_file"], "cis-1.11/master.yaml");
        assert!(value.get("line_results").is_none());
        assert!(value["audit_output"].is_null());
    }

    #[test]
    fn test_document_error() {
        let result = CheckResult::document_error("cis-1.11/broken.yaml", "YAML file is empty");
        assert_eq!(result.status, Status::Error);
        assert!(result.check_id.is_none());
        assert_eq!(
            result.reason,
            "Failed to process cis-1.11/broken.yaml: YAML file is empty"
        );
    }
}
