//! Raw results loading
//!
//! Results documents come either as a bare list of records or as an object
//! wrapping that list. Both shapes are resolved here into a plain record list.

use kubecis_core::{Error, Result};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info};

/// Keys checked, in order, when the document is a wrapper object
const WRAPPER_KEYS: [&str; 3] = ["findings", "results", "checks"];

/// Load a results document and extract its record list
pub async fn load_raw(path: impl AsRef<Path>) -> Result<Vec<Value>> {
    let path = path.as_ref();
    info!("Loading results from: {}", path.display());

    let unavailable = |message: String| Error::ResultsUnavailable {
        path: path.display().to_string(),
        message,
    };

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| unavailable(e.to_string()))?;
    let document: Value =
        serde_json::from_str(&content).map_err(|e| unavailable(e.to_string()))?;

    let records = extract_records(document);
    debug!("Extracted {} records", records.len());
    Ok(records)
}

/// Resolve a results document to its record list
pub fn extract_records(document: Value) -> Vec<Value> {
    match document {
        Value::Array(records) => records,
        Value::Object(map) => unwrap_object(map),
        _ => Vec::new(),
    }
}

fn unwrap_object(mut map: Map<String, Value>) -> Vec<Value> {
    for key in WRAPPER_KEYS {
        if matches!(map.get(key), Some(Value::Array(_))) {
            if let Some(Value::Array(records)) = map.remove(key) {
                return records;
            }
        }
    }

    map.into_iter()
        .find_map(|(_, value)| match value {
            Value::Array(records) => Some(records),
            _ => None,
        })
        .unwrap_or_default()
}
