//! kubecis Checks - Benchmark documents and the test evaluation engine
//!
//! This crate provides:
//! - `BenchmarkDefinition`: the parsed kube-bench style document model
//! - Document discovery and loading
//! - `evaluate`: the DSL interpreter that turns command output into a verdict

pub mod definition;
pub mod evaluator;
pub mod loader;

pub use definition::{
    BenchmarkDefinition, BinOp, Check, CheckEntry, CheckKind, Compare, CompareOp, Group,
    InvalidCheck, TestItem, TestSpec,
};
pub use evaluator::{evaluate, try_evaluate};
pub use loader::{discover_documents, load_document};
