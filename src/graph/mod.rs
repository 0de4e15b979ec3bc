//! Named-node state machine for multi-step workflows.
//!
//! A [`Graph`] owns its nodes and starts every run at the first node it was
//! built with. Each node returns the updated context and a [`Transition`]:
//! jump to a named node, run the same node again, or finish. Nodes run one
//! at a time; the engine keeps only the most recently returned context.
//! No cycle detection is performed.

mod ai_node;
mod node;

pub use ai_node::AiNode;
pub use node::{FnNode, Node, NodeScope};

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::AskflowError;
use crate::trace::{SpanHandle, TraceContext, Tracer};

/// Where a graph run goes after a node completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Continue with the named node.
    Next(String),
    /// Run the same node again with the context it just returned.
    Retry,
    /// Finish the run; the context just returned is the result.
    Exit,
}

impl Transition {
    pub fn to(node: impl Into<String>) -> Self {
        Self::Next(node.into())
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Next(node) => write!(f, "next:{node}"),
            Self::Retry => f.write_str("retry"),
            Self::Exit => f.write_str("exit"),
        }
    }
}

/// A validated graph over context type `C`.
pub struct Graph<C: Send + 'static> {
    name: String,
    entry: String,
    nodes: HashMap<String, Box<dyn Node<C>>>,
    tracer: Option<Arc<dyn Tracer>>,
}

impl<C: Send + 'static> std::fmt::Debug for Graph<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("entry", &self.entry)
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<C: Send + 'static> Graph<C> {
    /// Build a graph whose entry is the first node. Fails when `nodes` is
    /// empty or two nodes share a name.
    pub fn new(name: impl Into<String>, nodes: Vec<Box<dyn Node<C>>>) -> Result<Self, AskflowError> {
        let name = name.into();
        let entry = nodes
            .first()
            .map(|n| n.name().to_string())
            .ok_or_else(|| AskflowError::InvalidGraph(format!("graph '{name}' must have at least one node")))?;

        let mut map = HashMap::with_capacity(nodes.len());
        for node in nodes {
            let node_name = node.name().to_string();
            if node_name.is_empty() {
                return Err(AskflowError::InvalidGraph(format!("graph '{name}' has a node without a name")));
            }
            if map.insert(node_name.clone(), node).is_some() {
                return Err(AskflowError::InvalidGraph(format!(
                    "duplicate node name found in graph '{name}': {node_name}"
                )));
            }
        }

        Ok(Self {
            name,
            entry,
            nodes: map,
            tracer: None,
        })
    }

    /// Record each run as a trace named `graph_<name>` with one span per
    /// node execution.
    pub fn with_tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn contains(&self, node: &str) -> bool {
        self.nodes.contains_key(node)
    }

    /// Run from the entry node with a fresh context.
    pub async fn run(&self, initial: C) -> Result<C, AskflowError> {
        self.run_with(initial, TraceContext::default(), CancellationToken::new())
            .await
    }

    /// Run nested under `trace`, stopping with [`AskflowError::Canceled`]
    /// before the next node once `cancel` fires.
    pub async fn run_with(
        &self,
        initial: C,
        trace: TraceContext,
        cancel: CancellationToken,
    ) -> Result<C, AskflowError> {
        let trace = self.open_trace(trace);
        let result = self.run_nodes(initial, &trace, &cancel).await;

        if let (Some(tracer), Some(trace_id)) = (&self.tracer, &trace.trace_id) {
            let output = match &result {
                Ok(_) => json!({ "status": "ok" }),
                Err(e) => json!({ "status": "error", "error": e.to_string() }),
            };
            if let Err(e) = tracer.end_trace(trace_id, &output) {
                warn!(graph = %self.name, error = %e, "failed to close graph trace");
            }
        }
        result
    }

    async fn run_nodes(
        &self,
        initial: C,
        trace: &TraceContext,
        cancel: &CancellationToken,
    ) -> Result<C, AskflowError> {
        let mut current = self.entry.clone();
        let mut ctx = initial;
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(AskflowError::Canceled);
            }
            let node = self.nodes.get(&current).ok_or_else(|| AskflowError::GraphNodeNotFound {
                graph: self.name.clone(),
                node: current.clone(),
            })?;
            attempt += 1;

            let span = self.start_node_span(trace, &current, attempt);
            let scope = NodeScope {
                graph: self.name.clone(),
                node: current.clone(),
                attempt,
                trace: match &span {
                    Some(span) => trace.child_of(span),
                    None => trace.clone(),
                }
                .with_observation_name(current.clone()),
                cancel: cancel.child_token(),
            };

            debug!(graph = %self.name, node = %current, attempt, "running node");
            let outcome = node.run(&scope, ctx).await;
            self.end_node_span(span, &outcome);

            let (next_ctx, transition) = outcome.map_err(|e| {
                error!(graph = %self.name, node = %current, error = %e, "Node execution failed");
                AskflowError::GraphNode {
                    graph: self.name.clone(),
                    node: current.clone(),
                    source: Box::new(e),
                }
            })?;
            ctx = next_ctx;

            match transition {
                Transition::Exit => return Ok(ctx),
                Transition::Retry => {}
                Transition::Next(next) => {
                    current = next;
                    attempt = 0;
                }
            }
        }
    }

    fn open_trace(&self, trace: TraceContext) -> TraceContext {
        let Some(tracer) = &self.tracer else {
            return trace;
        };
        if trace.trace_id.is_some() {
            return trace;
        }
        match tracer.start_trace(&format!("graph_{}", self.name), &json!({ "graph": self.name })) {
            Ok(trace_id) => TraceContext::in_trace(trace_id),
            Err(e) => {
                warn!(graph = %self.name, error = %e, "failed to open graph trace");
                trace
            }
        }
    }

    fn start_node_span(&self, trace: &TraceContext, node: &str, attempt: u32) -> Option<SpanHandle> {
        let tracer = self.tracer.as_ref()?;
        trace.trace_id.as_ref()?;
        tracer
            .start_span(trace, node, &json!({ "attempt": attempt }))
            .map_err(|e| warn!(graph = %self.name, node, error = %e, "failed to open node span"))
            .ok()
    }

    fn end_node_span(&self, span: Option<SpanHandle>, outcome: &Result<(C, Transition), AskflowError>) {
        let (Some(tracer), Some(span)) = (&self.tracer, span) else {
            return;
        };
        let output = match outcome {
            Ok((_, transition)) => json!({ "transition": transition.to_string() }),
            Err(e) => json!({ "error": e.to_string() }),
        };
        if let Err(e) = tracer.end_span(&span, &output, None) {
            warn!(graph = %self.name, node = %span.name, error = %e, "failed to close node span");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Counter {
        count: u32,
        visited: Vec<String>,
    }

    fn counting(name: &'static str, next: impl Fn(&Counter) -> Transition + Send + Sync + 'static) -> Box<dyn Node<Counter>> {
        FnNode::new(name, move |_scope, mut ctx: Counter| {
            ctx.count += 1;
            ctx.visited.push(name.to_string());
            let transition = next(&ctx);
            async move { Ok((ctx, transition)) }
        })
        .boxed()
    }

    #[test]
    fn empty_graph_is_invalid() {
        let err = Graph::<Counter>::new("empty", Vec::new()).unwrap_err();
        assert!(matches!(err, AskflowError::InvalidGraph(_)));
    }

    #[test]
    fn transition_display() {
        assert_eq!(Transition::to("b").to_string(), "next:b");
        assert_eq!(Transition::Retry.to_string(), "retry");
        assert_eq!(Transition::Exit.to_string(), "exit");
    }

    #[tokio::test]
    async fn follows_named_transitions_to_exit() {
        let graph = Graph::new(
            "chain",
            vec![
                counting("a", |_| Transition::to("b")),
                counting("b", |_| Transition::to("c")),
                counting("c", |_| Transition::Exit),
            ],
        )
        .unwrap();

        let out = graph.run(Counter::default()).await.unwrap();
        assert_eq!(out.count, 3);
        assert_eq!(out.visited, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn scope_counts_consecutive_attempts() {
        let graph = Graph::new(
            "retry",
            vec![FnNode::new("only", |scope: NodeScope, mut ctx: Counter| async move {
                ctx.count = scope.attempt;
                let next = if scope.attempt < 2 { Transition::Retry } else { Transition::Exit };
                Ok((ctx, next))
            })
            .boxed()],
        )
        .unwrap();

        assert_eq!(graph.run(Counter::default()).await.unwrap().count, 2);
    }

    #[tokio::test]
    async fn canceled_run_stops_before_next_node() {
        let graph = Graph::new("c", vec![counting("a", |_| Transition::Retry)]).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = graph
            .run_with(Counter::default(), TraceContext::default(), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AskflowError::Canceled));
    }
}
