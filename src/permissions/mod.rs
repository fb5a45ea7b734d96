//! Permission system for tool execution
//!
//! A permission is a named boolean gate such as `file_access`. Grants live
//! in a JSON file under the per-user config directory and are flushed on
//! every mutation.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sysagent::permissions::PermissionManager;
//!
//! let manager = PermissionManager::new("/tmp/sysagent/permissions.json");
//! if manager.request_permission("file_access", None) {
//!     // run the file handler
//! }
//! ```

mod manager;
mod prompt;
mod store;

pub use manager::{describe_permission, GrantTier, PermissionLevel, PermissionManager, PermissionRequest};
pub use prompt::{is_affirmative, ConsentPrompt, ConsolePrompt, DenyPrompt};
pub use store::{PermissionStore, DEFAULT_PERMISSIONS};

use crate::tools::ToolMetadata;

/// Gate consulted before a handler body runs
pub trait PermissionCheck: Send + Sync {
    /// Whether every permission `tool` declares is (or can be) granted
    fn check_tool_permissions(&self, tool: &ToolMetadata) -> bool;
}
