//! Utility modules: retry.

pub mod retry;

pub use retry::RetryPolicy;
