//! Core types for askflow.

pub mod attachment;
pub mod generation;
pub mod message;
pub mod usage;

pub use attachment::*;
pub use generation::*;
pub use message::*;
pub use usage::*;
