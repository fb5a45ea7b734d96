//! Error types for the dispatch core

use thiserror::Error;

/// Errors raised inside the command pipeline
///
/// None of these escape `Agent::process_command`; they are folded into a
/// failure `AgentResult` at the boundary.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Input matched the destructive-pattern denylist
    #[error("Dangerous command detected")]
    DangerousCommand,

    /// The LLM provider call itself failed
    #[error("LLM provider error: {0}")]
    Provider(String),

    /// The LLM answered, but not with a usable plan
    #[error("Invalid LLM plan: {0}")]
    InvalidPlan(String),
}

impl AgentError {
    /// Create a provider error from anything displayable
    pub fn provider(err: impl std::fmt::Display) -> Self {
        AgentError::Provider(err.to_string())
    }
}

/// Errors a handler reports from its action body
#[derive(Error, Debug)]
pub enum ToolError {
    /// The action string does not name one of the handler's actions
    #[error("Unsupported action '{action}' for {tool}")]
    UnsupportedAction { tool: String, action: String },

    /// A parameter was missing or had the wrong shape
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The handler ran and reported failure
    #[error("{error}")]
    Failed { message: String, error: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Create a handler failure with a human message and a machine error
    pub fn failed(message: impl Into<String>, error: impl Into<String>) -> Self {
        ToolError::Failed {
            message: message.into(),
            error: error.into(),
        }
    }

    /// Create an invalid-parameter error
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Human-readable message for the failure `ToolResult`
    pub fn message(&self) -> String {
        match self {
            ToolError::UnsupportedAction { action, .. } => format!("Unknown action: {}", action),
            ToolError::Failed { message, .. } => message.clone(),
            other => format!("Tool execution failed: {}", other),
        }
    }
}

/// Errors from registry mutation
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// A handler with this name is already registered
    #[error("Tool name conflict: '{0}' already exists")]
    DuplicateTool(String),
}

/// Result type alias for pipeline operations
pub type AgentResultOf<T> = Result<T, AgentError>;
