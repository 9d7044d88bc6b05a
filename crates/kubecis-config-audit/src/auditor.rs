//! Benchmark auditor - orchestrates check execution

use crate::executor::{CommandRunner, ShellExecutor};
use futures::stream::{self, StreamExt};
use kubecis_checks::{
    discover_documents, evaluate, load_document, BenchmarkDefinition, Check, CheckEntry,
    CheckKind, InvalidCheck, TestSpec,
};
use kubecis_common::AuditConfig;
use kubecis_core::{CheckResult, LineResult, Result, Status, Verdict};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const MANUAL_REASON: &str =
    "Manual Check, Please verify the recommendation and follow the remediation if needed";

/// Runs benchmark documents against the local node
pub struct BenchmarkAuditor {
    runner: Arc<dyn CommandRunner>,
    max_concurrent_documents: usize,
}

/// Result of a full audit run
#[derive(Debug, Clone)]
pub struct AuditRun {
    /// All check results, in document then declaration order
    pub results: Vec<CheckResult>,
    /// Summary statistics
    pub summary: AuditSummary,
}

/// Summary of audit results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    /// Documents processed
    pub documents: usize,
    /// Results produced, including synthetic document errors
    pub total_checks: usize,
    pub passed: usize,
    pub failed: usize,
    pub warned: usize,
    pub errors: usize,
}

impl AuditSummary {
    pub fn from_results(documents: usize, results: &[CheckResult]) -> Self {
        let mut summary = AuditSummary {
            documents,
            total_checks: results.len(),
            ..Default::default()
        };
        for result in results {
            match result.status {
                Status::Pass => summary.passed += 1,
                Status::Fail => summary.failed += 1,
                Status::Warn => summary.warned += 1,
                Status::Error => summary.errors += 1,
            }
        }
        summary
    }
}

impl BenchmarkAuditor {
    /// Create an auditor around any command runner
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            max_concurrent_documents: 1,
        }
    }

    /// Create an auditor that runs commands through the configured shell
    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(Arc::new(ShellExecutor::from_config(config)))
            .with_concurrency(config.max_concurrent_documents)
    }

    /// Documents audited at the same time (results keep input order)
    pub fn with_concurrency(mut self, documents: usize) -> Self {
        self.max_concurrent_documents = documents.max(1);
        self
    }

    /// Audit a single check
    pub async fn run_check(&self, check: &Check, source: &str) -> CheckResult {
        let id = check.id.as_deref().unwrap_or("<unnamed>");
        debug!("Executing check: {} from {}", id, source);

        let builder = |verdict: Verdict| {
            CheckResult::builder(verdict.status, verdict.reason)
                .check_id(check.id.clone())
                .description(check.text.clone())
                .audit_command(check.audit.clone())
                .remediation(check.remediation_text())
                .source_file(source)
        };

        if check.kind() == CheckKind::Manual {
            return builder(Verdict::warn(MANUAL_REASON)).build();
        }

        let output = self
            .runner
            .execute(check.audit.as_deref().unwrap_or_default())
            .await;

        if check.use_multiple_values {
            let lines = evaluate_lines(&output, &check.tests);
            let verdict = fold_lines(&lines);
            builder(verdict)
                .audit_output(output)
                .line_results(lines)
                .build()
        } else {
            let verdict = evaluate(&output, &check.tests);
            builder(verdict).audit_output(output).build()
        }
    }

    /// Audit every check in a parsed document, in declared order
    ///
    /// An unreadable check yields an `ERROR` result in its place.
    pub async fn run_benchmark(
        &self,
        definition: &BenchmarkDefinition,
        source: &str,
    ) -> Vec<CheckResult> {
        let mut results = Vec::with_capacity(definition.check_count());
        for entry in definition.entries() {
            let result = match entry {
                CheckEntry::Valid(check) => self.run_check(check, source).await,
                CheckEntry::Invalid(invalid) => invalid_check_result(invalid, source),
            };
            results.push(result);
        }
        results
    }

    /// Load and audit one document; a load failure becomes one `ERROR` result
    pub async fn audit_document(&self, path: &Path) -> Vec<CheckResult> {
        let source = path.display().to_string();

        match load_document(path) {
            Ok(definition) => {
                let results = self.run_benchmark(&definition, &source).await;
                info!("Audited {} checks from {}", results.len(), source);
                results
            }
            Err(e) => {
                warn!(code = e.code(), "Failed to process {}: {}", source, e);
                vec![CheckResult::document_error(source, e)]
            }
        }
    }

    /// Audit documents, emitting results in input order
    pub async fn audit_paths(&self, paths: &[PathBuf]) -> AuditRun {
        info!(
            "Starting benchmark audit of {} documents ({} at a time)",
            paths.len(),
            self.max_concurrent_documents
        );

        let per_document: Vec<Vec<CheckResult>> = stream::iter(paths)
            .map(|path| self.audit_document(path))
            .buffered(self.max_concurrent_documents)
            .collect()
            .await;

        let results: Vec<CheckResult> = per_document.into_iter().flatten().collect();
        let summary = AuditSummary::from_results(paths.len(), &results);

        info!(
            "Audit complete: {} passed, {} failed, {} warnings, {} errors",
            summary.passed, summary.failed, summary.warned, summary.errors
        );

        AuditRun { results, summary }
    }

    /// Discover documents under a directory or file and audit them
    pub async fn audit_source(&self, source: impl AsRef<Path>) -> Result<AuditRun> {
        let paths = discover_documents(source)?;
        Ok(self.audit_paths(&paths).await)
    }
}

fn invalid_check_result(invalid: &InvalidCheck, source: &str) -> CheckResult {
    let id = invalid.id.as_deref().unwrap_or("<unnamed>");
    warn!("Skipping unreadable check {} in {}: {}", id, source, invalid.message);

    CheckResult::builder(
        Status::Error,
        format!("Invalid check definition: {}", invalid.message),
    )
    .check_id(invalid.id.clone())
    .description(invalid.text.clone())
    .source_file(source)
    .build()
}

/// Evaluate each non-empty trimmed line on its own
fn evaluate_lines(output: &str, tests: &TestSpec) -> Vec<LineResult> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| LineResult::new(line, evaluate(line, tests)))
        .collect()
}

fn fold_lines(lines: &[LineResult]) -> Verdict {
    if lines.is_empty() {
        Verdict::warn("No output lines found (possibly manual check)")
    } else if lines.iter().any(|l| l.status.is_fail()) {
        Verdict::fail("One or more lines failed")
    } else if lines.iter().all(|l| l.status.is_pass()) {
        Verdict::pass("All lines passed")
    } else {
        Verdict::warn("No definitive PASS or FAIL")
    }
}
