//! Core types shared by every layer
//!
//! - `CommandContext` - per-command snapshot
//! - `AgentResult` - command-level envelope
//! - `AgentError` / `ToolError` / `RegistryError` - typed failures

pub mod context;
pub mod error;
pub mod result;

pub use context::{CommandContext, Platform};
pub use error::{AgentError, AgentResultOf, RegistryError, ToolError};
pub use result::AgentResult;
