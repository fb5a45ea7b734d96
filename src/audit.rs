//! Audit trail
//!
//! Appends one JSON line per event to `<config_dir>/logs/audit.jsonl`.
//! Sequence numbers are process-wide so entries from concurrent sessions
//! still sort correctly. Write failures never reach the caller.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::{AgentResult, CommandContext};

/// Global sequence counter for ordering events
static SEQUENCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// File name of the trail inside the logs directory
pub const AUDIT_FILE: &str = "audit.jsonl";

/// One line of the trail
#[derive(Debug, Serialize)]
struct AuditEvent<'a, T: Serialize> {
    sequence: u64,
    timestamp: DateTime<Utc>,
    event_type: &'a str,
    session_id: &'a str,
    data: T,
}

#[derive(Debug, Serialize)]
struct CommandData<'a> {
    user_input: &'a str,
    platform: &'a str,
    tools_used: &'a [String],
    success: bool,
    error: Option<&'a str>,
    execution_time_ms: u128,
}

#[derive(Debug, Serialize)]
struct PermissionData<'a> {
    permission: &'a str,
    granted: bool,
}

/// Append-only JSONL audit log
pub struct AuditLog {
    path: PathBuf,
    enabled: bool,
}

impl AuditLog {
    /// Log appending to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            enabled: true,
        }
    }

    /// Log writing to `audit.jsonl` inside `logs_dir`
    pub fn in_dir(logs_dir: &Path) -> Self {
        Self::new(logs_dir.join(AUDIT_FILE))
    }

    /// Create a disabled log (no-op)
    pub fn disabled() -> Self {
        Self {
            path: PathBuf::new(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record one `process_command` call
    pub fn record_command(&self, ctx: &CommandContext, result: &AgentResult) {
        let data = CommandData {
            user_input: &ctx.user_input,
            platform: ctx.platform.as_str(),
            tools_used: &result.tools_used,
            success: result.success,
            error: result.error.as_deref(),
            execution_time_ms: result.execution_time.as_millis(),
        };
        self.write_or_warn("command", &ctx.session_id, data);
    }

    /// Record a grant or revoke
    pub fn record_permission(&self, session_id: &str, permission: &str, granted: bool) {
        let data = PermissionData { permission, granted };
        self.write_or_warn("permission", session_id, data);
    }

    fn write_or_warn<T: Serialize>(&self, event_type: &str, session_id: &str, data: T) {
        if let Err(e) = self.write_event(event_type, session_id, data) {
            tracing::warn!("[Audit] Could not write {} event: {:#}", event_type, e);
        }
    }

    fn write_event<T: Serialize>(&self, event_type: &str, session_id: &str, data: T) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let event = AuditEvent {
            sequence: SEQUENCE_COUNTER.fetch_add(1, Ordering::SeqCst),
            timestamp: Utc::now(),
            event_type,
            session_id,
            data,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(&event)?)?;

        tracing::debug!("[Audit] {} event written", event_type);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::Value;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn read_lines(path: &Path) -> Vec<Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_appends_command_events() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::in_dir(&dir.path().join("logs"));
        let ctx = CommandContext::new("show me cpu usage", BTreeMap::new(), Arc::new(Config::new()), "s-1");

        let result = AgentResult::success("ok")
            .with_tools(vec!["system_info_tool".into()])
            .timed(Duration::from_millis(12));
        log.record_command(&ctx, &result);
        log.record_permission("s-1", "file_access", false);

        let events = read_lines(log.path());
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["event_type"], "command");
        assert_eq!(events[0]["session_id"], "s-1");
        assert_eq!(events[0]["data"]["tools_used"][0], "system_info_tool");
        assert_eq!(events[0]["data"]["execution_time_ms"], 12);
        assert_eq!(events[1]["data"]["permission"], "file_access");
        assert!(events[1]["sequence"].as_u64().unwrap() > events[0]["sequence"].as_u64().unwrap());
    }

    #[test]
    fn test_disabled_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::disabled();
        log.record_permission("s", "file_access", true);
        assert!(!log.is_enabled());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unwritable_path_is_swallowed() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file").unwrap();

        let log = AuditLog::new(blocker.join("audit.jsonl"));
        log.record_permission("s", "file_access", true);
    }
}
