//! kubecis Common - Shared utilities: logging and configuration
//!
//! This crate provides common functionality used across all kubecis crates.

pub mod config;
pub mod logging;

pub use config::{AuditConfig, Config, ConfigBuilder, ReportConfig, RuntimeConfig};
pub use logging::init_logging;
