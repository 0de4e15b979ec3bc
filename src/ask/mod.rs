//! The conversation driver.
//!
//! One ask call may span many model turns: the driver sends the request,
//! runs any tool calls the model asks for, feeds their results back and
//! repeats until a turn answers without tool calls. Whether the final answer
//! is free text or a structured value is decided once, by which [`Client`]
//! method is called.

mod client;
mod context;
mod driver;
mod options;
mod tool_round;

pub use client::Client;
pub use context::AskContext;
pub use options::{AskOptions, ParserEngine};

use crate::types::{Message, Usage};

/// An ask result together with what it cost.
#[derive(Debug, Clone)]
pub struct AskResponse<T> {
    pub value: T,
    /// Usage summed over every model turn of the call.
    pub usage: Usage,
    /// Number of model turns (1 when no tool round happened).
    pub turns: u32,
    /// Full message history, ending with the final assistant message.
    pub messages: Vec<Message>,
}

impl<T> AskResponse<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AskResponse<U> {
        AskResponse {
            value: f(self.value),
            usage: self.usage,
            turns: self.turns,
            messages: self.messages,
        }
    }
}
