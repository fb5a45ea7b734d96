//! Per-command context

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Host operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    MacOs,
    Linux,
    Windows,
    Unknown,
}

impl Platform {
    /// Platform the binary was compiled for
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::MacOs => "macos",
            Platform::Linux => "linux",
            Platform::Windows => "windows",
            Platform::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything known about one command when it enters the pipeline
///
/// Built once per `process_command` call and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub user_input: String,
    pub platform: Platform,
    /// Grant state at the moment the command arrived
    pub permissions: BTreeMap<String, bool>,
    pub config: Arc<Config>,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

impl CommandContext {
    pub fn new(
        user_input: impl Into<String>,
        permissions: BTreeMap<String, bool>,
        config: Arc<Config>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            user_input: user_input.into(),
            platform: Platform::current(),
            permissions,
            config,
            session_id: session_id.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_current() {
        let platform = Platform::current();
        #[cfg(target_os = "linux")]
        assert_eq!(platform, Platform::Linux);
        assert!(!platform.as_str().is_empty());
    }

    #[test]
    fn test_context_snapshot() {
        let mut permissions = BTreeMap::new();
        permissions.insert("file_access".to_string(), true);

        let ctx = CommandContext::new("list files", permissions, Arc::new(Config::new()), "abc");
        assert_eq!(ctx.user_input, "list files");
        assert_eq!(ctx.permissions.get("file_access"), Some(&true));
        assert_eq!(ctx.session_id, "abc");
    }
}
