//! Document loader - finds and parses benchmark documents

use crate::definition::{BenchmarkDefinition, DefinitionError};
use kubecis_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// List the benchmark documents under a source path
///
/// A file is returned as-is. A directory yields its `.yaml`/`.yml` entries
/// (non-recursive) sorted by file name.
pub fn discover_documents(source: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let source = source.as_ref();

    if source.is_file() {
        return Ok(vec![source.to_path_buf()]);
    }
    if !source.is_dir() {
        return Err(Error::DocumentNotFound {
            path: source.display().to_string(),
        });
    }

    let mut documents = Vec::new();
    for entry in std::fs::read_dir(source)? {
        let path = entry?.path();
        if path.is_file() && is_yaml(&path) {
            documents.push(path);
        }
    }
    documents.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    info!(
        "Discovered {} benchmark documents in {}",
        documents.len(),
        source.display()
    );
    Ok(documents)
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_lowercase().as_str(), "yaml" | "yml"))
        .unwrap_or(false)
}

/// Read and parse a single benchmark document
pub fn load_document(path: impl AsRef<Path>) -> Result<BenchmarkDefinition> {
    let path = path.as_ref();
    let shown = path.display().to_string();

    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::DocumentNotFound {
            path: shown.clone(),
        },
        _ => Error::InvalidDocument {
            path: shown.clone(),
            message: e.to_string(),
        },
    })?;

    let definition = BenchmarkDefinition::from_yaml(&content).map_err(|e| match e {
        DefinitionError::Empty => Error::EmptyDocument {
            path: shown.clone(),
        },
        other => Error::InvalidDocument {
            path: shown.clone(),
            message: other.to_string(),
        },
    })?;

    debug!(
        "Loaded {} checks in {} groups from {}",
        definition.check_count(),
        definition.groups.len(),
        shown
    );
    Ok(definition)
}
