//! Conversion between the backend's flat step list and the in-memory graph.
//!
//! `decode` never fails: malformed pieces (blank or duplicate condition
//! labels, unrecognized step types) are normalized or passed through so a
//! schema written by a newer backend still opens in the editor.

use crate::graph::normalize_conditions;
use crate::{ConditionBinding, Edge, Graph, Node, NodeKind, Position, START_HANDLE, Step};

const LAYOUT_ORIGIN_X: f64 = 50.0;
const LAYOUT_ORIGIN_Y: f64 = 250.0;
const LAYOUT_SPACING_X: f64 = 200.0;

/// Builds a graph from the backend step list.
///
/// One node per step, `end` and unrecognized steps included. Steps without a
/// stored position are laid out left to right by step index.
pub fn decode(steps: &[Step]) -> Graph {
    let mut graph = Graph::new();

    for (index, step) in steps.iter().enumerate() {
        let kind = NodeKind::from_wire_type(&step.step_type);
        let position = step.position.unwrap_or(Position {
            x: LAYOUT_ORIGIN_X + LAYOUT_SPACING_X * index as f64,
            y: LAYOUT_ORIGIN_Y,
        });

        let conditions = match (&kind, &step.conditions) {
            (NodeKind::Decision, Some(bindings)) => {
                normalize_conditions(bindings.iter().map(|b| b.label.clone()).collect())
            }
            _ => Vec::new(),
        };

        match &kind {
            NodeKind::Decision => {
                // Only the first binding of each surviving label wires an edge.
                if let Some(bindings) = &step.conditions {
                    let mut wired: Vec<&str> = Vec::new();
                    for binding in bindings {
                        let label = binding.label.trim();
                        if !conditions.iter().any(|c| c == label) || wired.contains(&label) {
                            continue;
                        }
                        wired.push(label);
                        if let Some(next) = &binding.next {
                            push_edge(&mut graph, &step.id, Some(label), next);
                        }
                    }
                }
            }
            NodeKind::End => {}
            NodeKind::Start => {
                if let Some(Some(next)) = &step.next {
                    push_edge(&mut graph, &step.id, Some(START_HANDLE), next);
                }
            }
            _ => {
                if let Some(Some(next)) = &step.next {
                    push_edge(&mut graph, &step.id, None, next);
                }
            }
        }

        graph.nodes.push(Node {
            id: step.id.clone(),
            kind,
            label: step.label.clone(),
            description: step.description.clone(),
            position,
            conditions,
        });
    }

    graph
}

/// Flattens the graph back into the backend step list, one step per node in
/// insertion order.
///
/// Sub-kinds keep their own `type` strings; the legacy collapsed `action`
/// spelling is accepted by [`decode`] but never produced here. Decision
/// conditions are emitted in the node's condition order, `next: null` for
/// branches that are not wired.
pub fn encode(graph: &Graph) -> Vec<Step> {
    graph
        .nodes()
        .iter()
        .map(|node| {
            let mut step = Step {
                id: node.id.clone(),
                label: node.label.clone(),
                step_type: node.kind.wire_type().to_string(),
                description: node.description.clone(),
                position: Some(node.position),
                next: None,
                conditions: None,
            };
            match &node.kind {
                NodeKind::Decision => {
                    step.conditions = Some(
                        node.conditions
                            .iter()
                            .map(|label| ConditionBinding {
                                label: label.clone(),
                                next: graph
                                    .edges()
                                    .iter()
                                    .find(|e| {
                                        e.source == node.id
                                            && e.source_handle.as_deref() == Some(label.as_str())
                                    })
                                    .and_then(|e| e.target.clone()),
                            })
                            .collect(),
                    );
                }
                NodeKind::End => {}
                _ => {
                    step.next = Some(
                        graph
                            .edges()
                            .iter()
                            .find(|e| e.source == node.id)
                            .and_then(|e| e.target.clone()),
                    );
                }
            }
            step
        })
        .collect()
}

fn push_edge(graph: &mut Graph, source: &str, handle: Option<&str>, target: &str) {
    let id = graph.next_edge_id(source, handle);
    graph.edges.push(Edge {
        id,
        source: source.to_string(),
        source_handle: handle.map(|h| h.to_string()),
        target: Some(target.to_string()),
    });
}
