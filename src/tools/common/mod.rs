//! Common/built-in tools
//!
//! Reference handlers that keep the rule ladder usable end to end:
//! - `FileTool` - list, search, clean up, organize and inspect files
//! - `SystemInfoTool` - CPU, memory, disk, network, process and hardware reports

pub mod file_tool;
pub mod system_info_tool;

pub use file_tool::{FileAction, FileTool};
pub use system_info_tool::{SystemInfoAction, SystemInfoTool};

use super::ToolRegistry;

/// Register every built-in handler
pub fn register_defaults(registry: &mut ToolRegistry) {
    registry.register(FileTool::new());
    registry.register(SystemInfoTool::new());
}
