//! Append-only promotion audit log (`audit/promotions.jsonl`).

use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// One promotion, as recorded in the audit log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromotionEvent {
    pub task: String,
    pub model_name: String,
    pub alias: String,
    pub version: String,
    pub actor: Option<String>,
    pub reason: Option<String>,
    pub ts_utc: String,
}

/// Current time as an ISO-8601 UTC timestamp with microsecond precision.
pub fn now_utc_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, false)
}

/// Append `event` as a single JSON line.
///
/// The line is emitted with one `write_all` on an `O_APPEND` handle; there is
/// no cross-process locking.
pub fn append_event(log_path: &Path, event: &PromotionEvent) -> Result<(), StoreError> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut line = serde_json::to_string(event)?;
    line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    file.write_all(line.as_bytes())?;
    file.sync_data()?;
    Ok(())
}

/// Read every event in file order. A missing log yields no events.
pub fn read_events(log_path: &Path) -> Result<Vec<PromotionEvent>, StoreError> {
    if !log_path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(log_path)?;
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).map_err(StoreError::from))
        .collect()
}
