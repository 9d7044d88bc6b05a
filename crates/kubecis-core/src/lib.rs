//! kubecis Core - Foundation types and error handling
//!
//! This crate provides the core abstractions shared by every kubecis crate:
//! - `Status` / `Verdict`: the outcome vocabulary of the evaluation engine
//! - `CheckResult`: one audited benchmark check, the unit of the output artifact
//! - `Severity`: coarse tiers for runtime security events
//! - `Error` / `Result`: the crate-wide error type

pub mod error;
pub mod result;
pub mod severity;
pub mod status;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use result::{CheckResult, CheckResultBuilder, LineResult};
pub use severity::Severity;
pub use status::{Status, Verdict};
