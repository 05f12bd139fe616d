use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rillcore::{EngineError, WorkflowEdge, WorkflowNode};
use std::collections::HashMap;
use uuid::Uuid;

/// In-memory representation of a workflow as a directed graph.
///
/// Nodes and edges live in the petgraph arena; lookups go through the
/// id → index map. The graph is read-only once built: the engine never
/// mutates node or edge records.
#[derive(Debug)]
pub struct WorkflowGraph {
    graph: DiGraph<WorkflowNode, WorkflowEdge>,
    index_of: HashMap<Uuid, NodeIndex>,
}

impl WorkflowGraph {
    /// Build the graph from persisted node and edge records. Fails if
    /// an edge references a node that is not part of the workflow.
    pub fn build(
        nodes: Vec<WorkflowNode>,
        edges: Vec<WorkflowEdge>,
    ) -> Result<Self, EngineError> {
        let mut graph = DiGraph::with_capacity(nodes.len(), edges.len());
        let mut index_of = HashMap::with_capacity(nodes.len());

        for node in nodes {
            let id = node.id;
            let idx = graph.add_node(node);
            index_of.insert(id, idx);
        }

        for edge in edges {
            let source = *index_of.get(&edge.source_node_id).ok_or(
                EngineError::UnknownNode {
                    edge_id: edge.id,
                    node_id: edge.source_node_id,
                },
            )?;
            let target = *index_of.get(&edge.target_node_id).ok_or(
                EngineError::UnknownNode {
                    edge_id: edge.id,
                    node_id: edge.target_node_id,
                },
            )?;
            graph.add_edge(source, target, edge);
        }

        Ok(Self { graph, index_of })
    }

    pub fn node(&self, idx: NodeIndex) -> &WorkflowNode {
        &self.graph[idx]
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Nodes that are never the target of any edge; these seed the
    /// traversal work list.
    pub fn start_nodes(&self) -> Vec<NodeIndex> {
        self.graph.externals(Direction::Incoming).collect()
    }

    /// Edges arriving at the node, in insertion order.
    pub fn incoming_edges(&self, idx: NodeIndex) -> Vec<&WorkflowEdge> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .collect();
        // petgraph iterates most-recently-added first; restore edge-list order
        edges.reverse();
        edges.into_iter().map(|e| e.weight()).collect()
    }

    /// Targets of outgoing edges, gated by the triggered handle: when a
    /// handle is given only edges whose source handle matches it fire,
    /// otherwise every outgoing edge fires.
    pub fn next_nodes(&self, idx: NodeIndex, triggered: Option<&str>) -> Vec<NodeIndex> {
        let mut next: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| match triggered {
                Some(handle) => e.weight().source_handle == handle,
                None => true,
            })
            .map(|e| e.target())
            .collect();
        next.reverse();
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(workflow_id: Uuid) -> WorkflowNode {
        WorkflowNode {
            id: Uuid::new_v4(),
            workflow_id,
            template_id: Uuid::new_v4(),
            position_x: 0.0,
            position_y: 0.0,
            data: json!({"type": "set_data"}).as_object().unwrap().clone(),
        }
    }

    fn edge(workflow_id: Uuid, source: Uuid, target: Uuid, handle: &str) -> WorkflowEdge {
        WorkflowEdge {
            id: Uuid::new_v4(),
            workflow_id,
            source_node_id: source,
            target_node_id: target,
            source_handle: handle.to_string(),
            target_handle: "input".to_string(),
        }
    }

    #[test]
    fn start_nodes_are_nodes_without_incoming_edges() {
        let wf = Uuid::new_v4();
        let a = node(wf);
        let b = node(wf);
        let c = node(wf);
        let edges = vec![edge(wf, a.id, b.id, "output"), edge(wf, b.id, c.id, "output")];
        let a_id = a.id;

        let graph = WorkflowGraph::build(vec![a, b, c], edges).unwrap();
        let starts = graph.start_nodes();
        assert_eq!(starts.len(), 1);
        assert_eq!(graph.node(starts[0]).id, a_id);
    }

    #[test]
    fn next_nodes_respect_the_handle_gate() {
        let wf = Uuid::new_v4();
        let a = node(wf);
        let b = node(wf);
        let c = node(wf);
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        let edges = vec![
            edge(wf, a_id, b_id, "output_true"),
            edge(wf, a_id, c_id, "output_false"),
        ];

        let graph = WorkflowGraph::build(vec![a, b, c], edges).unwrap();
        let a_idx = graph.start_nodes()[0];

        let gated = graph.next_nodes(a_idx, Some("output_true"));
        assert_eq!(gated.len(), 1);
        assert_eq!(graph.node(gated[0]).id, b_id);

        let all = graph.next_nodes(a_idx, None);
        assert_eq!(all.len(), 2);
        assert_eq!(graph.node(all[0]).id, b_id);
        assert_eq!(graph.node(all[1]).id, c_id);
    }

    #[test]
    fn build_rejects_edges_to_unknown_nodes() {
        let wf = Uuid::new_v4();
        let a = node(wf);
        let a_id = a.id;
        let stray = edge(wf, a_id, Uuid::new_v4(), "output");

        let err = WorkflowGraph::build(vec![a], vec![stray]).unwrap_err();
        assert!(matches!(err, EngineError::UnknownNode { .. }));
    }
}
