//! Tool system for the dispatch core
//!
//! This module provides:
//! - `Tool` trait - typed interface handlers implement
//! - `Handler` trait - object-safe view with the permission gate
//! - `ToolResult` - uniform result of a handler call
//! - `ToolRegistry` - name -> handler map with loose lookup
//! - `common` - built-in handlers (file, system info)

mod registry;
mod tool;

/// Common/built-in tools
pub mod common;

pub use registry::ToolRegistry;
pub use tool::{
    parse_params, Handler, Params, Tool, ToolAction, ToolCategory, ToolHandler, ToolMetadata,
    ToolOutput, ToolResult,
};

pub use common::{register_defaults, FileTool, SystemInfoTool};
