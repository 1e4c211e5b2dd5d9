use flowforge_api::{ApiClient, SaveWorkflowRequest, WorkflowBackend};
use flowforge_core::{
    Graph, GraphIssue, NodeKind, NodePatch, Position, SchemaEnvelope, Selection, codec,
    validate_graph,
};
use serde_json::Value;
use tokio::sync::mpsc::Sender;
use tracing::{error, info, warn};

/// Lifecycle of one editing session.
///
/// `LoadFailed` is terminal: the host tears the session down and builds a
/// new one to retry. Everything after a successful load happens in `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Loading,
    Ready,
    LoadFailed,
}

/// Notifications sent to the host UI.
#[derive(Debug, Clone)]
pub enum EditorEvent {
    ModeChanged(EditorMode),
    Saved { id: String },
    SaveFailed(String),
    Imported,
    ImportFailed(String),
    ValidationFailed(String),
}

/// Drives one workflow through load, editing, and persistence.
///
/// The graph stays fully interactive while a request is in flight; save
/// payloads are encoded synchronously at call time, so later edits can
/// never leak into a pending request. Persistence failures leave the
/// in-memory graph untouched; it is the source of truth for the session.
pub struct EditorSession<B: WorkflowBackend = ApiClient> {
    backend: B,
    workflow_id: Option<String>,
    workflow_name: String,
    mode: EditorMode,
    graph: Graph,
    event_tx: Sender<EditorEvent>,
}

impl<B: WorkflowBackend> EditorSession<B> {
    pub fn new(backend: B, workflow_id: Option<String>, event_tx: Sender<EditorEvent>) -> Self {
        Self {
            backend,
            workflow_id,
            workflow_name: String::new(),
            mode: EditorMode::Loading,
            graph: Graph::new(),
            event_tx,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn workflow_id(&self) -> Option<&str> {
        self.workflow_id.as_deref()
    }

    pub fn workflow_name(&self) -> &str {
        &self.workflow_name
    }

    pub fn set_workflow_name(&mut self, name: impl Into<String>) {
        self.workflow_name = name.into();
    }

    /// Fetches and decodes the workflow, or seeds a fresh one when the
    /// session has no id yet. Runs once; later calls are ignored.
    pub async fn load(&mut self) {
        if self.mode != EditorMode::Loading {
            return;
        }
        match self.workflow_id.clone() {
            Some(id) => match self.backend.fetch_workflow(&id).await {
                Ok(document) => {
                    self.graph = codec::decode(&document.schema);
                    self.workflow_name = document.name;
                    info!("Loaded workflow {}", id);
                    self.set_mode(EditorMode::Ready);
                }
                Err(err) => {
                    warn!("Failed to load workflow {}: {}", id, err);
                    self.set_mode(EditorMode::LoadFailed);
                }
            },
            None => {
                self.graph
                    .add_node(NodeKind::Start, Some(Position { x: 50.0, y: 250.0 }));
                self.set_mode(EditorMode::Ready);
            }
        }
    }

    // ----- gestures ---------------------------------------------------

    pub fn add_node(&mut self, kind: NodeKind) -> String {
        self.graph.add_node(kind, None)
    }

    pub fn update_node(&mut self, id: &str, patch: NodePatch) -> bool {
        self.graph.update_node(id, patch)
    }

    /// A drag-connection between two nodes. Handle resolution and all
    /// validation live in the store; an invalid gesture simply does not
    /// materialize.
    pub fn connect(&mut self, source: &str, target: &str, handle: Option<&str>) -> bool {
        self.graph.connect(source, target, handle).is_some()
    }

    pub fn select_node(&mut self, id: &str) {
        self.graph.select_node(id);
    }

    pub fn select_edge(&mut self, id: &str) {
        self.graph.select_edge(id);
    }

    pub fn clear_selection(&mut self) {
        self.graph.clear_selection();
    }

    /// The Delete-key gesture: a selected edge wins over a selected node;
    /// with nothing selected, nothing happens.
    pub fn delete_selected(&mut self) {
        match self.graph.selection().cloned() {
            Some(Selection::Edge(id)) => self.graph.remove_edge(&id),
            Some(Selection::Node(id)) => self.graph.remove_node(&id),
            None => {}
        }
        self.graph.clear_selection();
    }

    // ----- persistence ------------------------------------------------

    /// Advisory structural check the host can surface before saving.
    pub fn validate(&self) -> Result<(), GraphIssue> {
        validate_graph(&self.graph)
    }

    /// Persists the current graph: create on first save, update after.
    ///
    /// A blank name aborts before the backend is touched. Failures are
    /// reported and leave both the graph and the session id unchanged.
    pub async fn save(&mut self) {
        if self.workflow_name.trim().is_empty() {
            self.emit(EditorEvent::ValidationFailed(
                "Workflow name cannot be empty".to_string(),
            ));
            return;
        }

        let request = SaveWorkflowRequest {
            name: self.workflow_name.trim().to_string(),
            schema: codec::encode(&self.graph),
        };

        let result = match self.workflow_id.clone() {
            Some(id) => self.backend.update_workflow(&id, &request).await,
            None => self.backend.create_workflow(&request).await,
        };

        match result {
            Ok(document) => {
                self.workflow_id = Some(document.id.clone());
                info!("Saved workflow {}", document.id);
                self.emit(EditorEvent::Saved { id: document.id });
            }
            Err(err) => {
                warn!("Failed to save workflow: {}", err);
                self.emit(EditorEvent::SaveFailed(err.to_string()));
            }
        }
    }

    /// Replaces the whole graph with the schema from an external document.
    /// The current graph is discarded, not merged.
    pub fn import(&mut self, document: &Value) {
        match serde_json::from_value::<SchemaEnvelope>(document.clone()) {
            Ok(envelope) => {
                self.graph = codec::decode(&envelope.schema);
                info!("Imported schema with {} steps", envelope.schema.len());
                self.emit(EditorEvent::Imported);
            }
            Err(err) => {
                self.emit(EditorEvent::ImportFailed(format!(
                    "Invalid workflow file: {}",
                    err
                )));
            }
        }
    }

    /// The current graph as a standalone download document.
    pub fn export(&self) -> SchemaEnvelope {
        SchemaEnvelope {
            schema: codec::encode(&self.graph),
        }
    }

    fn set_mode(&mut self, mode: EditorMode) {
        self.mode = mode;
        self.emit(EditorEvent::ModeChanged(mode));
    }

    fn emit(&self, event: EditorEvent) {
        if let Err(err) = self.event_tx.try_send(event) {
            error!("Failed to send editor event: {}", err);
        }
    }
}
