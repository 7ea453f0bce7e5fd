//! Append-only JSONL run event log.

use crate::core::types::{RunEvent, TimestampedEvent};
use chrono::{SecondsFormat, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};

/// RFC 3339 UTC timestamp for log entries.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Generate a run id from the clock.
pub fn generate_run_id() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("r-{:012x}", (nanos as u64) & 0xFFFF_FFFF_FFFF)
}

/// Event log path within the state directory.
pub fn event_log_path(state_dir: &Path) -> PathBuf {
    state_dir.join("events.jsonl")
}

/// Append one event to the run log.
pub fn append_event(state_dir: &Path, event: RunEvent) -> Result<(), String> {
    let path = event_log_path(state_dir);
    std::fs::create_dir_all(state_dir)
        .map_err(|e| format!("cannot create state dir {}: {}", state_dir.display(), e))?;

    let entry = TimestampedEvent {
        ts: now_rfc3339(),
        event,
    };
    let json =
        serde_json::to_string(&entry).map_err(|e| format!("JSON serialize error: {}", e))?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("cannot open event log {}: {}", path.display(), e))?;
    writeln!(file, "{}", json).map_err(|e| format!("event log write error: {}", e))?;

    Ok(())
}
