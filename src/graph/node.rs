//! Graph node contract and the closure-based node.

use std::future::Future;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use super::Transition;
use crate::error::AskflowError;
use crate::trace::TraceContext;

/// What a node knows about the run executing it.
#[derive(Debug, Clone)]
pub struct NodeScope {
    pub graph: String,
    pub node: String,
    /// How many times this node has run in a row, counting this run (1 on
    /// first entry, incremented by each `Retry`).
    pub attempt: u32,
    /// Linkage for observations made by the node (e.g. ask calls).
    pub trace: TraceContext,
    pub cancel: CancellationToken,
}

/// One step of a graph over context type `C`.
///
/// A node receives the context by value and hands back the (possibly
/// modified) context together with the transition to take.
#[async_trait]
pub trait Node<C: Send + 'static>: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, scope: &NodeScope, ctx: C) -> Result<(C, Transition), AskflowError>;
}

type NodeFn<C> = dyn Fn(NodeScope, C) -> BoxFuture<'static, Result<(C, Transition), AskflowError>> + Send + Sync;

/// Node backed by an async closure.
pub struct FnNode<C> {
    name: String,
    run: Box<NodeFn<C>>,
}

impl<C: Send + 'static> FnNode<C> {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(NodeScope, C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(C, Transition), AskflowError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            run: Box::new(move |scope: NodeScope, ctx: C| -> BoxFuture<'static, Result<(C, Transition), AskflowError>> {
                Box::pin(f(scope, ctx))
            }),
        }
    }

    pub fn boxed(self) -> Box<dyn Node<C>> {
        Box::new(self)
    }
}

#[async_trait]
impl<C: Send + 'static> Node<C> for FnNode<C> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, scope: &NodeScope, ctx: C) -> Result<(C, Transition), AskflowError> {
        (self.run)(scope.clone(), ctx).await
    }
}

impl<C> std::fmt::Debug for FnNode<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnNode").field("name", &self.name).finish()
    }
}
