//! SysAgent: natural-language OS automation
//!
//! Free text goes in through [`Agent::process_command`] and comes back as an
//! [`AgentResult`]. In between, a denylist gate, an optional LLM planner with
//! a keyword-rule fallback, and a permission-checked tool executor.

pub mod agent;
pub mod audit;
pub mod cli;
pub mod config;
pub mod core;
pub mod llm;
pub mod logging;
pub mod permissions;
pub mod tools;

pub use agent::{Agent, ToolExecutor};
pub use config::Config;
pub use core::{AgentError, AgentResult, CommandContext, Platform, ToolError};
pub use permissions::PermissionManager;
pub use tools::{Tool, ToolRegistry, ToolResult};
