use thiserror::Error;

use crate::{Graph, NodeKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphIssue {
    #[error("Workflow has no steps")]
    Empty,

    #[error("Workflow has no start step")]
    NoStart,

    #[error("Workflow has more than one start step")]
    MultipleStarts,

    #[error("Step '{0}' has multiple outgoing connections (only one allowed)")]
    MultipleOutgoing(String),

    #[error("Step '{node}' connects through unknown condition '{handle}'")]
    UnknownCondition { node: String, handle: String },

    #[error("Connection '{0}' references a step that does not exist")]
    DanglingEdge(String),
}

/// Structural health check, reporting the first problem found.
///
/// Advisory only: the editor surfaces issues before a save but keeps the
/// graph fully editable. The store itself cannot produce most of these;
/// they guard against schemas arriving from elsewhere.
pub fn validate_graph(graph: &Graph) -> Result<(), GraphIssue> {
    if graph.nodes().is_empty() {
        return Err(GraphIssue::Empty);
    }

    let starts = graph
        .nodes()
        .iter()
        .filter(|n| n.kind == NodeKind::Start)
        .count();
    if starts == 0 {
        return Err(GraphIssue::NoStart);
    }
    if starts > 1 {
        return Err(GraphIssue::MultipleStarts);
    }

    for edge in graph.edges() {
        if graph.node(&edge.source).is_none() {
            return Err(GraphIssue::DanglingEdge(edge.id.clone()));
        }
        if let Some(target) = &edge.target {
            if graph.node(target).is_none() {
                return Err(GraphIssue::DanglingEdge(edge.id.clone()));
            }
        }
    }

    for node in graph.nodes() {
        if node.kind.is_decision() {
            for edge in graph.outgoing(&node.id) {
                let handle = edge.source_handle.as_deref().unwrap_or("");
                if !node.conditions.iter().any(|c| c == handle) {
                    return Err(GraphIssue::UnknownCondition {
                        node: node.label.clone(),
                        handle: handle.to_string(),
                    });
                }
            }
            for condition in &node.conditions {
                let wired = graph
                    .outgoing(&node.id)
                    .filter(|e| e.source_handle.as_deref() == Some(condition.as_str()))
                    .count();
                if wired > 1 {
                    return Err(GraphIssue::MultipleOutgoing(node.label.clone()));
                }
            }
        } else if graph.outgoing(&node.id).count() > 1 {
            return Err(GraphIssue::MultipleOutgoing(node.label.clone()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NodePatch, Position};

    #[test]
    fn empty_graph_is_reported() {
        assert_eq!(validate_graph(&Graph::new()), Err(GraphIssue::Empty));
    }

    #[test]
    fn start_step_is_required_and_unique() {
        let mut graph = Graph::new();
        graph.add_node(NodeKind::Process, None);
        assert_eq!(validate_graph(&graph), Err(GraphIssue::NoStart));

        graph.add_node(NodeKind::Start, None);
        assert_eq!(validate_graph(&graph), Ok(()));

        graph.add_node(NodeKind::Start, Some(Position { x: 0.0, y: 0.0 }));
        assert_eq!(validate_graph(&graph), Err(GraphIssue::MultipleStarts));
    }

    #[test]
    fn store_built_graphs_pass() {
        let mut graph = Graph::new();
        let start = graph.add_node(NodeKind::Start, None);
        let decision = graph.add_node(NodeKind::Decision, None);
        let end = graph.add_node(NodeKind::End, None);
        graph.update_node(
            &decision,
            NodePatch {
                conditions: Some(vec!["yes".to_string(), "no".to_string()]),
                ..Default::default()
            },
        );
        graph.connect(&start, &decision, None);
        graph.connect(&decision, &end, Some("yes"));

        assert_eq!(validate_graph(&graph), Ok(()));
    }

    #[test]
    fn dangling_edges_are_reported() {
        // A decoded schema can reference steps the list never defined.
        let steps = vec![crate::Step {
            id: "1".to_string(),
            label: "Start".to_string(),
            step_type: "start".to_string(),
            description: None,
            position: None,
            next: Some(Some("missing".to_string())),
            conditions: None,
        }];
        let graph = crate::codec::decode(&steps);
        assert!(matches!(
            validate_graph(&graph),
            Err(GraphIssue::DanglingEdge(_))
        ));
    }
}
