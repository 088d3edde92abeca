use tokio::sync::mpsc;
use uuid::Uuid;

/// Progress events emitted while a question moves through the graph.
///
/// UI-agnostic: the CLI prints them, the HTTP server ignores them.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerEvent {
    /// A node was scheduled
    NodeStarted { node: String },
    /// A node finished and its update was merged
    NodeFinished { node: String, elapsed_ms: u64 },
    /// A node failed and its fallback (empty) update was used instead
    NodeDegraded { node: String, error: String },
    /// Human-readable status line from inside a node
    Progress { node: String, message: String },
}

/// Per-run context handed to every node.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    events: Option<mpsc::UnboundedSender<PlannerEvent>>,
}

impl RunContext {
    pub fn new(events: Option<mpsc::UnboundedSender<PlannerEvent>>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            events,
        }
    }

    /// Send an event; a dropped receiver is not an error.
    pub fn emit(&self, event: PlannerEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    pub fn progress(&self, node: &str, message: impl Into<String>) {
        self.emit(PlannerEvent::Progress {
            node: node.to_string(),
            message: message.into(),
        });
    }
}
