//! Convenience re-exports for common use.

pub use crate::ask::{AskContext, AskOptions, AskResponse, Client, ParserEngine};
pub use crate::config::ClientConfig;
pub use crate::error::{AskflowError, Result};
pub use crate::graph::{AiNode, FnNode, Graph, Node, NodeScope, Transition};
pub use crate::hooks::HookPipeline;
pub use crate::provider::{ChatRequest, ChatResponse, ChatTransport};
pub use crate::schema::{Field, OutputSchema, Shape};
pub use crate::tools::{FunctionTool, Tool, ToolContext};
pub use crate::trace::{LogTracer, TraceContext, TraceHook, Tracer};
pub use crate::types::{Attachment, Message, ReasoningEffort, Role, SamplingSettings, Usage};
pub use crate::util::RetryPolicy;
