//! kubecis Config Audit - Runs benchmark checks against the local node
//!
//! This crate provides:
//! - `ShellExecutor`: runs audit commands with a hard timeout and falls back to
//!   reading `/proc` and file metadata when `ps` or `stat` are missing
//! - `BenchmarkAuditor`: walks benchmark documents, executes each check's audit
//!   command, and folds the output into `CheckResult`s
//!
//! # Example
//!
//! ```no_run
//! use kubecis_common::AuditConfig;
//! use kubecis_config_audit::BenchmarkAuditor;
//!
//! # async fn run() -> kubecis_core::Result<()> {
//! let config = AuditConfig::default();
//! let auditor = BenchmarkAuditor::from_config(&config);
//!
//! let run = auditor.audit_source(&config.benchmark_source).await?;
//! println!("Passed: {}", run.summary.passed);
//! println!("Failed: {}", run.summary.failed);
//! # Ok(())
//! # }
//! ```

pub mod auditor;
pub mod executor;

#[cfg(unix)]
pub mod linux;

pub use auditor::{AuditRun, AuditSummary, BenchmarkAuditor};
pub use executor::{CommandRunner, ShellExecutor};
