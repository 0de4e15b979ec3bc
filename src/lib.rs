//! askflow drives a chat-completion model to an answer.
//!
//! One ask call turns a prompt into either free text or a typed value,
//! running any tool calls the model requests along the way and retrying
//! transient transport failures. A small graph engine strings such calls
//! (or any other async step) into multi-step workflows.
//!
//! # Quick Start
//!
//! ```no_run
//! use askflow::prelude::*;
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, JsonSchema)]
//! struct Capital {
//!     capital: String,
//! }
//!
//! # async fn example() -> askflow::error::Result<()> {
//! let client = Client::from_env()?;
//! let answer: Capital = client
//!     .ask(AskOptions::new("What is the capital of France?").with_model("gpt-4o-mini"))
//!     .await?;
//! println!("{}", answer.capital);
//! # Ok(())
//! # }
//! ```

pub mod ask;
pub mod config;
pub mod error;
pub mod graph;
pub mod hooks;
pub mod prelude;
pub mod provider;
pub mod schema;
pub mod tools;
pub mod trace;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
