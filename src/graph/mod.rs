//! The planning pipeline as a dashflow [`StateGraph`] over [`ConversationState`].
//!
//! Steps implement [`Node`] and declare the fields they read and write.
//! [`Pipeline`] registers each step as a dashflow node under its
//! [`FailurePolicy`], checks the declarations against the wiring, and
//! compiles with state merging so parallel branches join back into one
//! state.

pub mod state;

pub use dashflow::END;
pub use state::{ConversationState, Field, FieldValue, StateUpdate};

use crate::event::{PlannerEvent, RunContext};
use crate::llm::LlmError;
use crate::search::SearchError;
use dashflow::StateGraph;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::Instrument;

/// A single step of the pipeline.
#[async_trait::async_trait]
pub trait Node: Send + Sync {
    /// Unique node identifier (e.g. "google_search")
    fn id(&self) -> &str;

    /// State fields this node reads
    fn reads(&self) -> &[Field];

    /// State fields this node writes; updates may not touch anything else
    fn writes(&self) -> &[Field];

    async fn run(&self, state: &ConversationState, ctx: &RunContext) -> Result<StateUpdate, NodeError>;

    /// Update merged instead of the node's output when it fails under
    /// [`FailurePolicy::Degrade`].
    fn fallback(&self) -> StateUpdate {
        StateUpdate::default()
    }
}

/// What the pipeline does when a node returns an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log, emit [`PlannerEvent::NodeDegraded`], merge [`Node::fallback`]
    Degrade,
    /// Fail the whole run
    Abort,
}

/// Errors returned by node implementations
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error("Missing input field: {0}")]
    MissingInput(Field),

    #[error("Wrote undeclared field '{0}'")]
    UndeclaredWrite(Field),

    #[error("Field '{0}' written twice")]
    FieldRewritten(Field),
}

/// Wiring and execution errors
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("Graph contains a cycle")]
    Cycle,

    #[error("Field '{field}' has two writers: '{first}' and '{second}'")]
    DuplicateWriter {
        field: Field,
        first: String,
        second: String,
    },

    #[error("Node '{node}' writes input field '{field}'")]
    WritesInput { node: String, field: Field },

    #[error("Node '{node}' reads '{field}' but no upstream node writes it")]
    UnsatisfiedRead { node: String, field: Field },

    #[error("Node '{node}' failed: {source}")]
    NodeFailed {
        node: String,
        #[source]
        source: NodeError,
    },

    #[error("Graph engine error: {0}")]
    Engine(#[from] dashflow::Error),
}

/// First aborting node of a run, kept so the typed cause survives the engine.
type AbortSlot = Arc<Mutex<Option<(String, NodeError)>>>;

/// One registered step, invoked by dashflow with an owned state.
struct NodeRunner {
    node: Arc<dyn Node>,
    policy: FailurePolicy,
    ctx: RunContext,
    aborted: AbortSlot,
}

impl NodeRunner {
    async fn execute(&self, mut state: ConversationState) -> dashflow::Result<ConversationState> {
        let id = self.node.id();
        self.ctx.emit(PlannerEvent::NodeStarted { node: id.to_string() });
        tracing::debug!(node = id, "node started");
        let started = Instant::now();

        let update = match self.node.run(&state, &self.ctx).await {
            Ok(update) => update,
            Err(err) => match self.policy {
                FailurePolicy::Degrade => {
                    tracing::warn!(node = id, error = %err, "node failed, using fallback");
                    self.ctx.emit(PlannerEvent::NodeDegraded {
                        node: id.to_string(),
                        error: err.to_string(),
                    });
                    self.node.fallback()
                }
                FailurePolicy::Abort => {
                    tracing::error!(node = id, error = %err, "node failed, aborting run");
                    return Err(self.abort(err));
                }
            },
        };

        if let Some(field) = update.fields().find(|f| !self.node.writes().contains(f)) {
            return Err(self.abort(NodeError::UndeclaredWrite(field)));
        }
        if let Err(field) = state.apply(update) {
            return Err(self.abort(NodeError::FieldRewritten(field)));
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::debug!(node = id, elapsed_ms, "node finished");
        self.ctx.emit(PlannerEvent::NodeFinished {
            node: id.to_string(),
            elapsed_ms,
        });
        Ok(state)
    }

    fn abort(&self, err: NodeError) -> dashflow::Error {
        let id = self.node.id().to_string();
        let message = format!("Node '{id}' failed: {err}");
        if let Ok(mut slot) = self.aborted.lock() {
            slot.get_or_insert((id.clone(), err));
        }
        dashflow::Error::NodeExecution {
            node: id,
            source: Box::new(dashflow::Error::InternalExecutionError(message)),
        }
    }
}

/// Pipeline steps wired into a dashflow graph for one run.
pub struct Pipeline {
    graph: StateGraph<ConversationState>,
    nodes: Vec<Arc<dyn Node>>,
    duplicate: Option<String>,
    ctx: RunContext,
    aborted: AbortSlot,
}

impl Pipeline {
    /// Empty pipeline whose nodes report to `ctx`.
    pub fn new(ctx: RunContext) -> Self {
        Self {
            graph: StateGraph::new(),
            nodes: Vec::new(),
            duplicate: None,
            ctx,
            aborted: Arc::new(Mutex::new(None)),
        }
    }

    pub fn add_node(mut self, node: impl Node + 'static, policy: FailurePolicy) -> Self {
        let node: Arc<dyn Node> = Arc::new(node);
        let id = node.id().to_string();
        if self.nodes.iter().any(|n| n.id() == id) {
            self.duplicate.get_or_insert(id);
            return self;
        }

        let runner = Arc::new(NodeRunner {
            node: node.clone(),
            policy,
            ctx: self.ctx.clone(),
            aborted: self.aborted.clone(),
        });
        let span_run_id = self.ctx.run_id;
        let span_node = id.clone();
        self.graph.add_node_from_fn(id, move |state| {
            let runner = runner.clone();
            let span = tracing::info_span!("node", run_id = %span_run_id, node = %span_node);
            Box::pin(async move { runner.execute(state).await }.instrument(span))
        });
        self.nodes.push(node);
        self
    }

    pub fn set_entry(mut self, id: &str) -> Self {
        self.graph.set_entry_point(id);
        self
    }

    /// `to` runs only after `from` completed; use [`END`] to finish.
    pub fn add_edge(mut self, from: &str, to: &str) -> Self {
        self.graph.add_edge(from, to);
        self
    }

    /// Run every node in `to` concurrently on the state left by `from`.
    pub fn add_parallel_edges(mut self, from: &str, to: &[&str]) -> Self {
        let targets = to.iter().map(|t| t.to_string()).collect();
        self.graph.add_parallel_edges(from, targets);
        self
    }

    /// Check the wiring and return node ids in a valid execution order.
    pub fn validate(&self) -> Result<Vec<String>, GraphError> {
        if let Some(id) = &self.duplicate {
            return Err(GraphError::DuplicateNode(id.clone()));
        }
        self.graph.clone().compile_with_merge()?;
        let order = self.graph.topological_sort().ok_or(GraphError::Cycle)?;
        self.check_fields(&order)?;
        Ok(order)
    }

    /// Single writer per field, and every read has a writer scheduled before it.
    fn check_fields(&self, order: &[String]) -> Result<(), GraphError> {
        let position: HashMap<&str, usize> =
            order.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();

        let mut writer_of: HashMap<Field, &str> = HashMap::new();
        for node in &self.nodes {
            for &field in node.writes() {
                if field == Field::UserQuestion {
                    return Err(GraphError::WritesInput {
                        node: node.id().to_string(),
                        field,
                    });
                }
                if field.is_append_only() {
                    continue;
                }
                if let Some(first) = writer_of.insert(field, node.id()) {
                    return Err(GraphError::DuplicateWriter {
                        field,
                        first: first.to_string(),
                        second: node.id().to_string(),
                    });
                }
            }
        }

        for node in &self.nodes {
            for &field in node.reads() {
                if field.is_input() {
                    continue;
                }
                let satisfied = writer_of
                    .get(&field)
                    .and_then(|w| position.get(w))
                    .zip(position.get(node.id()))
                    .is_some_and(|(w, r)| w < r);
                if !satisfied {
                    return Err(GraphError::UnsatisfiedRead {
                        node: node.id().to_string(),
                        field,
                    });
                }
            }
        }
        Ok(())
    }

    /// Validate, compile and run the graph once.
    pub async fn invoke(self, state: ConversationState) -> Result<ConversationState, GraphError> {
        self.validate()?;
        let Self {
            graph, ctx, aborted, ..
        } = self;
        let app = graph.compile_with_merge()?;

        let span = tracing::info_span!("graph_run", run_id = %ctx.run_id);
        match app.invoke(state).instrument(span).await {
            Ok(result) => Ok(result.final_state),
            Err(err) => {
                let cause = aborted.lock().ok().and_then(|mut slot| slot.take());
                Err(match cause {
                    Some((node, source)) => GraphError::NodeFailed { node, source },
                    None => GraphError::Engine(err),
                })
            }
        }
    }
}
