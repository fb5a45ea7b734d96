//! Command-level result envelope

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of one `process_command` call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentResult {
    pub success: bool,
    pub message: String,
    /// Merged data of every tool that ran
    pub data: Map<String, Value>,
    pub error: Option<String>,
    /// Wall time of the whole command
    pub execution_time: Duration,
    /// Tools in invocation order
    pub tools_used: Vec<String>,
}

impl AgentResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Map::new(),
            error: None,
            execution_time: Duration::ZERO,
            tools_used: Vec::new(),
        }
    }

    pub fn failure(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: Map::new(),
            error: Some(error.into()),
            execution_time: Duration::ZERO,
            tools_used: Vec::new(),
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools_used = tools;
        self
    }

    pub fn timed(mut self, elapsed: Duration) -> Self {
        self.execution_time = elapsed;
        self
    }
}
