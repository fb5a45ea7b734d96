//! Command pipeline: safety gate, resolution, execution

pub mod executor;
pub mod pipeline;
pub mod plan;
pub mod rules;
pub mod safety;

pub use executor::ToolExecutor;
pub use pipeline::Agent;
pub use plan::{parse_plan, Plan, PlannedCall};
pub use rules::{classify, Intent, PermissionTarget};
pub use safety::{check_input, find_dangerous_pattern};
