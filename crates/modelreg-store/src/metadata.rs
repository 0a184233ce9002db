use crate::StoreError;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Package metadata document (`model_meta.json`): arbitrary caller fields plus
/// engine defaults.
pub type Metadata = Map<String, Value>;

/// Fill `task`, `model_name`, `version` and `created_at` where the caller left
/// them out. Caller-supplied values are never overridden.
pub fn merge_defaults(
    mut meta: Metadata,
    task: &str,
    model_name: &str,
    version: &str,
    created_at: &str,
) -> Metadata {
    for (key, value) in [
        ("task", task),
        ("model_name", model_name),
        ("version", version),
        ("created_at", created_at),
    ] {
        meta.entry(key)
            .or_insert_with(|| Value::String(value.to_owned()));
    }
    meta
}

/// Pretty JSON with a trailing newline.
pub fn render_document(meta: &Metadata) -> Result<String, StoreError> {
    let mut s = serde_json::to_string_pretty(meta)?;
    s.push('\n');
    Ok(s)
}

pub fn read_metadata(path: &Path) -> Result<Metadata, StoreError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
