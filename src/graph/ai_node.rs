//! Graph node backed by a structured ask call.

use std::marker::PhantomData;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use super::{Node, NodeScope, Transition};
use crate::ask::{AskOptions, Client};
use crate::error::AskflowError;

type PromptFn<C> = dyn Fn(&C) -> Result<String, AskflowError> + Send + Sync;
type HandleFn<C, O> = dyn Fn(O, C) -> Result<(C, Transition), AskflowError> + Send + Sync;

/// A node that asks the model for a value of type `O`.
///
/// Each run renders a prompt from the context, performs one structured ask
/// call and hands the decoded output plus the context to a callback that
/// returns the updated context and the next transition. The call is traced
/// under the node's span and canceled with the run.
pub struct AiNode<C, O> {
    name: String,
    client: Client,
    options: AskOptions,
    prompt: Box<PromptFn<C>>,
    handle: Box<HandleFn<C, O>>,
    _output: PhantomData<fn() -> O>,
}

impl<C, O> AiNode<C, O>
where
    C: Send + 'static,
    O: DeserializeOwned + JsonSchema + Send + 'static,
{
    pub fn new<P, H>(name: impl Into<String>, client: Client, prompt: P, handle: H) -> Self
    where
        P: Fn(&C) -> Result<String, AskflowError> + Send + Sync + 'static,
        H: Fn(O, C) -> Result<(C, Transition), AskflowError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            client,
            options: AskOptions::default(),
            prompt: Box::new(prompt),
            handle: Box::new(handle),
            _output: PhantomData,
        }
    }

    /// Base options (model, system prompt, tools, ...) for every call; the
    /// prompt is filled in per run.
    pub fn with_options(mut self, options: AskOptions) -> Self {
        self.options = options;
        self
    }

    pub fn boxed(self) -> Box<dyn Node<C>> {
        Box::new(self)
    }
}

#[async_trait]
impl<C, O> Node<C> for AiNode<C, O>
where
    C: Send + 'static,
    O: DeserializeOwned + JsonSchema + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, scope: &NodeScope, ctx: C) -> Result<(C, Transition), AskflowError> {
        let prompt = (self.prompt)(&ctx).map_err(|e| AskflowError::PromptGeneration(Box::new(e)))?;

        let mut options = self.options.clone();
        options.prompt = prompt;
        if options.trace.is_none() {
            options.trace = Some(scope.trace.clone());
        }
        if options.cancel.is_none() {
            options.cancel = Some(scope.cancel.clone());
        }
        if options.generation_name.is_none() {
            options.generation_name = Some(self.name.clone());
        }

        let output = self.client.ask::<O>(options).await?;
        (self.handle)(output, ctx)
    }
}

impl<C, O> std::fmt::Debug for AiNode<C, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiNode")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish()
    }
}
