//! Tool system for function calling.

pub mod registry;
pub mod tool;
pub mod validation;

pub use registry::{tool_id, ToolSet};
pub use tool::{FunctionTool, Tool, ToolContext};
