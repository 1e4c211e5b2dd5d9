use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// Source handle carried by every edge leaving a `Start` node.
pub const START_HANDLE: &str = "out";

/// Condition label seeded onto a freshly created `Decision` node.
pub const DEFAULT_CONDITION: &str = "Condition 1";

/// Horizontal gap between the rightmost node and a newly placed one.
const PLACEMENT_GAP: f64 = 180.0;

/// Where the first node lands in an empty graph.
const FIRST_NODE_POSITION: Position = Position { x: 50.0, y: 250.0 };

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Start,
    Process,
    Decision,
    Function,
    Response,
    End,
    /// A step type this client does not recognize. The original wire string
    /// is preserved so the step survives an edit/save cycle untouched.
    Unknown(String),
}

impl NodeKind {
    pub fn default_label(&self) -> String {
        match self {
            NodeKind::Start => "Start".to_string(),
            NodeKind::Process => "Process".to_string(),
            NodeKind::Decision => "Decision".to_string(),
            NodeKind::Function => "Function".to_string(),
            NodeKind::Response => "Response".to_string(),
            NodeKind::End => "End".to_string(),
            NodeKind::Unknown(ty) => ty.clone(),
        }
    }

    /// The `type` string this kind serializes to.
    pub fn wire_type(&self) -> &str {
        match self {
            NodeKind::Start => "start",
            NodeKind::Process => "process",
            NodeKind::Decision => "decision",
            NodeKind::Function => "function",
            NodeKind::Response => "response",
            NodeKind::End => "end",
            NodeKind::Unknown(ty) => ty,
        }
    }

    /// Maps a wire `type` string to a kind. `action` is the legacy collapsed
    /// spelling of the linear sub-kinds and reads back as `Process`.
    pub fn from_wire_type(ty: &str) -> Self {
        match ty {
            "start" => NodeKind::Start,
            "process" | "action" => NodeKind::Process,
            "decision" => NodeKind::Decision,
            "function" => NodeKind::Function,
            "response" => NodeKind::Response,
            "end" => NodeKind::End,
            other => NodeKind::Unknown(other.to_string()),
        }
    }

    pub fn is_decision(&self) -> bool {
        matches!(self, NodeKind::Decision)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// One step of the workflow as the editor holds it.
///
/// `conditions` is only populated for `Decision` nodes; every mutation path
/// keeps it blank-free and duplicate-free, and empty for all other kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub description: Option<String>,
    pub position: Position,
    pub conditions: Vec<String>,
}

/// A directed connection between two nodes.
///
/// `target` is `None` for a decision condition that has not been wired to a
/// destination yet. `source_handle` is the condition label for decision
/// sources, [`START_HANDLE`] for start sources, and `None` otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub source_handle: Option<String>,
    pub target: Option<String>,
}

/// What the user currently has selected. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Node(String),
    Edge(String),
}

/// Partial update applied to a node by [`Graph::update_node`].
#[derive(Debug, Clone, Default)]
pub struct NodePatch {
    pub label: Option<String>,
    pub description: Option<String>,
    pub position: Option<Position>,
    pub conditions: Option<Vec<String>>,
}

/// In-memory workflow graph and the only place its invariants are enforced.
///
/// Structural requests that would break an invariant are rejected silently
/// (logged, no edge/node created). The store never panics or errors, so a
/// bad gesture can never take the editor down.
#[derive(Debug, Default)]
pub struct Graph {
    pub(crate) nodes: Vec<Node>,
    pub(crate) edges: Vec<Edge>,
    selection: Option<Selection>,
    edge_seq: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes in insertion order. Encoding relies on this order being stable.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// All edges leaving `id`, wired or not.
    pub fn outgoing(&self, id: &str) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.source == id)
    }

    /// Adds a node of the given kind and returns its id.
    ///
    /// Without an explicit position the node lands to the right of the
    /// current rightmost node; the first node lands at a fixed origin.
    pub fn add_node(&mut self, kind: NodeKind, position: Option<Position>) -> String {
        let id = Uuid::new_v4().to_string();
        let position = position.unwrap_or_else(|| self.next_free_position());
        let conditions = if kind.is_decision() {
            vec![DEFAULT_CONDITION.to_string()]
        } else {
            Vec::new()
        };
        self.nodes.push(Node {
            id: id.clone(),
            label: kind.default_label(),
            kind,
            description: None,
            position,
            conditions,
        });
        id
    }

    /// Merges `patch` into the node. Returns `false` (and changes nothing)
    /// for an unknown id.
    ///
    /// Supplying `conditions` on a `Decision` node reconciles its edges:
    /// edges whose handle left the list are removed, each condition without
    /// an edge gets a fresh unwired one, everything else is untouched.
    /// `conditions` on any other kind is ignored.
    pub fn update_node(&mut self, id: &str, patch: NodePatch) -> bool {
        let Some(index) = self.nodes.iter().position(|n| n.id == id) else {
            debug!("update_node ignored: no node '{}'", id);
            return false;
        };

        if let Some(label) = patch.label {
            self.nodes[index].label = label;
        }
        if let Some(description) = patch.description {
            self.nodes[index].description = Some(description);
        }
        if let Some(position) = patch.position {
            self.nodes[index].position = position;
        }
        if let Some(raw) = patch.conditions {
            if self.nodes[index].kind.is_decision() {
                let conditions = normalize_conditions(raw);
                let node_id = self.nodes[index].id.clone();
                self.reconcile_condition_edges(&node_id, &conditions);
                self.nodes[index].conditions = conditions;
            } else {
                debug!("update_node: conditions ignored on non-decision node '{}'", id);
            }
        }
        true
    }

    /// Removes a node and every edge touching it. No-op for an unknown id.
    pub fn remove_node(&mut self, id: &str) {
        self.nodes.retain(|n| n.id != id);
        self.edges
            .retain(|e| e.source != id && e.target.as_deref() != Some(id));
        self.drop_stale_selection();
    }

    /// Removes one edge by id. No-op for an unknown id.
    pub fn remove_edge(&mut self, id: &str) {
        self.edges.retain(|e| e.id != id);
        self.drop_stale_selection();
    }

    /// Wires `source` to `target`, validating the request first.
    ///
    /// Rules, by source kind:
    /// - `Decision`: `handle` must name one of its current conditions and
    ///   that condition must not already be wired; an unwired edge for the
    ///   condition is filled in place.
    /// - `Start`: the handle is forced to [`START_HANDLE`].
    /// - anything else: at most one outgoing edge.
    ///
    /// A rejected request returns `None` and logs the reason; nothing in the
    /// graph changes.
    pub fn connect(&mut self, source: &str, target: &str, handle: Option<&str>) -> Option<&Edge> {
        let Some(source_node) = self.node(source) else {
            warn!("connect rejected: no source node '{}'", source);
            return None;
        };
        if self.node(target).is_none() {
            warn!("connect rejected: no target node '{}'", target);
            return None;
        }

        let resolved = match &source_node.kind {
            NodeKind::Decision => {
                let Some(handle) = handle else {
                    warn!("connect rejected: decision '{}' needs a condition handle", source);
                    return None;
                };
                if !source_node.conditions.iter().any(|c| c == handle) {
                    warn!(
                        "connect rejected: '{}' is not a condition of decision '{}'",
                        handle, source
                    );
                    return None;
                }
                Some(handle.to_string())
            }
            NodeKind::Start => {
                if self.outgoing(source).next().is_some() {
                    warn!("connect rejected: start node '{}' is already wired", source);
                    return None;
                }
                Some(START_HANDLE.to_string())
            }
            _ => {
                if self.outgoing(source).next().is_some() {
                    warn!("connect rejected: node '{}' is already wired", source);
                    return None;
                }
                None
            }
        };

        // A decision condition may already own an unwired edge; fill it
        // instead of growing the edge set.
        if let Some(handle) = resolved.as_deref() {
            if let Some(index) = self
                .edges
                .iter()
                .position(|e| e.source == source && e.source_handle.as_deref() == Some(handle))
            {
                if self.edges[index].target.is_some() {
                    warn!(
                        "connect rejected: condition '{}' of '{}' is already wired",
                        handle, source
                    );
                    return None;
                }
                self.edges[index].target = Some(target.to_string());
                return self.edges.get(index);
            }
        }

        let edge = Edge {
            id: self.next_edge_id(source, resolved.as_deref()),
            source: source.to_string(),
            source_handle: resolved,
            target: Some(target.to_string()),
        };
        self.edges.push(edge);
        self.edges.last()
    }

    /// Selects a node, displacing any edge selection. No-op for unknown ids.
    pub fn select_node(&mut self, id: &str) {
        if self.node(id).is_some() {
            self.selection = Some(Selection::Node(id.to_string()));
        }
    }

    /// Selects an edge, displacing any node selection. No-op for unknown ids.
    pub fn select_edge(&mut self, id: &str) {
        if self.edge(id).is_some() {
            self.selection = Some(Selection::Edge(id.to_string()));
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub(crate) fn next_edge_id(&mut self, source: &str, handle: Option<&str>) -> String {
        self.edge_seq += 1;
        match handle {
            Some(handle) => format!("edge-{}-{}-{}", source, handle, self.edge_seq),
            None => format!("edge-{}-{}", source, self.edge_seq),
        }
    }

    fn next_free_position(&self) -> Position {
        match self
            .nodes
            .iter()
            .max_by(|a, b| a.position.x.total_cmp(&b.position.x))
        {
            Some(rightmost) => Position {
                x: rightmost.position.x + PLACEMENT_GAP,
                y: rightmost.position.y,
            },
            None => FIRST_NODE_POSITION,
        }
    }

    /// Re-aligns a decision node's edges with a new condition list.
    fn reconcile_condition_edges(&mut self, node_id: &str, conditions: &[String]) {
        self.edges.retain(|e| {
            e.source != node_id
                || e.source_handle
                    .as_deref()
                    .is_some_and(|h| conditions.iter().any(|c| c == h))
        });
        for condition in conditions {
            let exists = self
                .edges
                .iter()
                .any(|e| e.source == node_id && e.source_handle.as_deref() == Some(condition));
            if !exists {
                let id = self.next_edge_id(node_id, Some(condition));
                self.edges.push(Edge {
                    id,
                    source: node_id.to_string(),
                    source_handle: Some(condition.clone()),
                    target: None,
                });
            }
        }
        self.drop_stale_selection();
    }

    fn drop_stale_selection(&mut self) {
        let stale = match &self.selection {
            Some(Selection::Node(id)) => self.node(id).is_none(),
            Some(Selection::Edge(id)) => self.edge(id).is_none(),
            None => false,
        };
        if stale {
            self.selection = None;
        }
    }
}

/// Drops blank entries and duplicates, keeping first occurrences in order.
pub(crate) fn normalize_conditions(raw: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for label in raw {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !out.iter().any(|c| c == trimmed) {
            out.push(trimmed.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch_conditions(conditions: &[&str]) -> NodePatch {
        NodePatch {
            conditions: Some(conditions.iter().map(|c| c.to_string()).collect()),
            ..Default::default()
        }
    }

    #[test]
    fn first_node_lands_at_origin_then_to_the_right() {
        let mut graph = Graph::new();
        let first = graph.add_node(NodeKind::Start, None);
        let second = graph.add_node(NodeKind::Process, None);

        let first = graph.node(&first).unwrap();
        let second = graph.node(&second).unwrap();
        assert_eq!(first.position, Position { x: 50.0, y: 250.0 });
        assert_eq!(second.position, Position { x: 230.0, y: 250.0 });
    }

    #[test]
    fn decision_node_seeds_a_default_condition() {
        let mut graph = Graph::new();
        let id = graph.add_node(NodeKind::Decision, None);
        assert_eq!(
            graph.node(&id).unwrap().conditions,
            vec![DEFAULT_CONDITION.to_string()]
        );

        let other = graph.add_node(NodeKind::Response, None);
        assert!(graph.node(&other).unwrap().conditions.is_empty());
    }

    #[test]
    fn non_decision_node_allows_a_single_outgoing_edge() {
        let mut graph = Graph::new();
        let a = graph.add_node(NodeKind::Process, None);
        let b = graph.add_node(NodeKind::Process, None);
        let c = graph.add_node(NodeKind::Process, None);

        assert!(graph.connect(&a, &b, None).is_some());
        assert!(graph.connect(&a, &c, None).is_none());
        assert_eq!(graph.outgoing(&a).count(), 1);
    }

    #[test]
    fn start_node_gets_the_canonical_handle() {
        let mut graph = Graph::new();
        let start = graph.add_node(NodeKind::Start, None);
        let next = graph.add_node(NodeKind::Process, None);

        let edge = graph.connect(&start, &next, None).unwrap();
        assert_eq!(edge.source_handle.as_deref(), Some(START_HANDLE));

        // Still bound by single fan-out.
        let other = graph.add_node(NodeKind::Process, None);
        assert!(graph.connect(&start, &other, None).is_none());
    }

    #[test]
    fn decision_connect_requires_a_known_condition() {
        let mut graph = Graph::new();
        let decision = graph.add_node(NodeKind::Decision, None);
        let target = graph.add_node(NodeKind::End, None);
        graph.update_node(&decision, patch_conditions(&["yes", "no"]));

        assert!(graph.connect(&decision, &target, None).is_none());
        assert!(graph.connect(&decision, &target, Some("maybe")).is_none());
        assert!(graph.connect(&decision, &target, Some("yes")).is_some());
    }

    #[test]
    fn decision_connect_fills_the_unwired_edge_in_place() {
        let mut graph = Graph::new();
        let decision = graph.add_node(NodeKind::Decision, None);
        let target = graph.add_node(NodeKind::End, None);
        graph.update_node(&decision, patch_conditions(&["yes", "no"]));

        let placeholder_id = graph
            .outgoing(&decision)
            .find(|e| e.source_handle.as_deref() == Some("yes"))
            .unwrap()
            .id
            .clone();

        let edge = graph.connect(&decision, &target, Some("yes")).unwrap();
        assert_eq!(edge.id, placeholder_id);
        assert_eq!(edge.target.as_deref(), Some(target.as_str()));

        // One edge per condition, so a second wire on "yes" is rejected.
        let other = graph.add_node(NodeKind::End, None);
        assert!(graph.connect(&decision, &other, Some("yes")).is_none());
        assert_eq!(graph.outgoing(&decision).count(), 2);
    }

    #[test]
    fn changing_conditions_reconciles_edges() {
        let mut graph = Graph::new();
        let decision = graph.add_node(NodeKind::Decision, None);
        let target = graph.add_node(NodeKind::End, None);
        graph.update_node(&decision, patch_conditions(&["A", "B"]));
        graph.connect(&decision, &target, Some("A"));
        graph.connect(&decision, &target, Some("B"));

        graph.update_node(&decision, patch_conditions(&["B", "C"]));

        let handles: Vec<_> = graph
            .outgoing(&decision)
            .map(|e| {
                (
                    e.source_handle.clone().unwrap_or_default(),
                    e.target.is_some(),
                )
            })
            .collect();
        assert!(!handles.iter().any(|(h, _)| h == "A"));
        assert!(handles.contains(&("B".to_string(), true)));
        assert!(handles.contains(&("C".to_string(), false)));
        assert_eq!(handles.len(), 2);
    }

    #[test]
    fn blank_and_duplicate_conditions_are_dropped() {
        let mut graph = Graph::new();
        let decision = graph.add_node(NodeKind::Decision, None);
        graph.update_node(&decision, patch_conditions(&["ok", "", "  ", "ok", "fail"]));
        assert_eq!(
            graph.node(&decision).unwrap().conditions,
            vec!["ok".to_string(), "fail".to_string()]
        );
    }

    #[test]
    fn conditions_on_non_decision_nodes_are_ignored() {
        let mut graph = Graph::new();
        let id = graph.add_node(NodeKind::Process, None);
        graph.update_node(&id, patch_conditions(&["ok"]));
        assert!(graph.node(&id).unwrap().conditions.is_empty());
        assert_eq!(graph.edges().len(), 0);
    }

    #[test]
    fn removing_a_node_removes_every_touching_edge() {
        let mut graph = Graph::new();
        let start = graph.add_node(NodeKind::Start, None);
        let middle = graph.add_node(NodeKind::Process, None);
        let end = graph.add_node(NodeKind::End, None);
        graph.connect(&start, &middle, None);
        graph.connect(&middle, &end, None);

        graph.remove_node(&middle);

        assert!(graph.node(&middle).is_none());
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn removals_are_idempotent() {
        let mut graph = Graph::new();
        let id = graph.add_node(NodeKind::Start, None);

        graph.remove_node("no-such-node");
        graph.remove_edge("no-such-edge");
        assert_eq!(graph.nodes().len(), 1);

        graph.remove_node(&id);
        graph.remove_node(&id);
        assert!(graph.nodes().is_empty());
    }

    #[test]
    fn update_of_unknown_node_reports_false() {
        let mut graph = Graph::new();
        assert!(!graph.update_node("ghost", NodePatch::default()));
    }

    #[test]
    fn selection_is_mutually_exclusive_and_dropped_with_its_item() {
        let mut graph = Graph::new();
        let a = graph.add_node(NodeKind::Start, None);
        let b = graph.add_node(NodeKind::End, None);
        let edge_id = graph.connect(&a, &b, None).unwrap().id.clone();

        graph.select_node(&a);
        assert_eq!(graph.selection(), Some(&Selection::Node(a.clone())));

        graph.select_edge(&edge_id);
        assert_eq!(graph.selection(), Some(&Selection::Edge(edge_id.clone())));

        graph.remove_edge(&edge_id);
        assert_eq!(graph.selection(), None);

        graph.select_node(&b);
        graph.remove_node(&b);
        assert_eq!(graph.selection(), None);
    }

    #[test]
    fn patch_merges_only_supplied_fields() {
        let mut graph = Graph::new();
        let id = graph.add_node(NodeKind::Process, None);
        graph.update_node(
            &id,
            NodePatch {
                label: Some("Summarize".to_string()),
                ..Default::default()
            },
        );

        let node = graph.node(&id).unwrap();
        assert_eq!(node.label, "Summarize");
        assert_eq!(node.description, None);
        assert_eq!(node.position, Position { x: 50.0, y: 250.0 });
    }
}
