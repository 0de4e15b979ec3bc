//! Before/after request interceptors.
//!
//! A [`HookPipeline`] holds two ordered lists. Before-hooks see the initial
//! request of an ask call once and may rewrite it; after-hooks see every
//! model turn's outcome (response or terminal error) and may replace the
//! response. Hooks run in registration order and never abort the call: a
//! hook that fails is logged and skipped, and the value it was given flows
//! on unchanged.

use std::sync::Arc;

use tracing::warn;

use crate::ask::AskContext;
use crate::error::AskflowError;
use crate::provider::{ChatRequest, ChatResponse};

/// Rewrites the outgoing request.
pub type BeforeRequestHook =
    Arc<dyn Fn(&mut AskContext, ChatRequest) -> Result<ChatRequest, AskflowError> + Send + Sync>;

/// Observes a turn's outcome. Returning `Ok(Some(response))` replaces the
/// response; `Ok(None)` keeps it. Exactly one of response and error is set.
pub type AfterRequestHook = Arc<
    dyn Fn(&mut AskContext, Option<&ChatResponse>, Option<&AskflowError>) -> Result<Option<ChatResponse>, AskflowError>
        + Send
        + Sync,
>;

/// Ordered interceptor chain.
#[derive(Clone, Default)]
pub struct HookPipeline {
    before: Vec<BeforeRequestHook>,
    after: Vec<AfterRequestHook>,
}

impl std::fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookPipeline")
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}

impl HookPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a before-hook.
    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut AskContext, ChatRequest) -> Result<ChatRequest, AskflowError> + Send + Sync + 'static,
    {
        self.before.push(Arc::new(hook));
        self
    }

    /// Append an after-hook.
    pub fn after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut AskContext, Option<&ChatResponse>, Option<&AskflowError>) -> Result<Option<ChatResponse>, AskflowError>
            + Send
            + Sync
            + 'static,
    {
        self.after.push(Arc::new(hook));
        self
    }

    pub fn push_before(&mut self, hook: BeforeRequestHook) {
        self.before.push(hook);
    }

    pub fn push_after(&mut self, hook: AfterRequestHook) {
        self.after.push(hook);
    }

    /// Append all of `other`'s hooks after this pipeline's own.
    pub fn extend(&mut self, other: &HookPipeline) {
        self.before.extend(other.before.iter().cloned());
        self.after.extend(other.after.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    /// Run the before-stage over `request`.
    pub fn run_before(&self, ctx: &mut AskContext, mut request: ChatRequest) -> ChatRequest {
        for (index, hook) in self.before.iter().enumerate() {
            match hook(ctx, request.clone()) {
                Ok(rewritten) => match rewritten.validate() {
                    Ok(()) => request = rewritten,
                    Err(e) => warn!(hook = index, stage = "before", error = %e, "hook dropped a required field; keeping previous request"),
                },
                Err(e) => warn!(hook = index, stage = "before", error = %e, "hook failed"),
            }
        }
        request
    }

    /// Run the after-stage over one turn's outcome.
    ///
    /// On the failure path the error is passed through untouched and any
    /// replacement response is ignored.
    pub fn run_after(
        &self,
        ctx: &mut AskContext,
        outcome: Result<ChatResponse, AskflowError>,
    ) -> Result<ChatResponse, AskflowError> {
        match outcome {
            Ok(mut response) => {
                for (index, hook) in self.after.iter().enumerate() {
                    match hook(ctx, Some(&response), None) {
                        Ok(Some(replacement)) => response = replacement,
                        Ok(None) => {}
                        Err(e) => warn!(hook = index, stage = "after", error = %e, "hook failed"),
                    }
                }
                Ok(response)
            }
            Err(err) => {
                for (index, hook) in self.after.iter().enumerate() {
                    if let Err(e) = hook(ctx, None, Some(&err)) {
                        warn!(hook = index, stage = "after", error = %e, "hook failed");
                    }
                }
                Err(err)
            }
        }
    }
}
