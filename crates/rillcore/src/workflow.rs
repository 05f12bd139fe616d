use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Node configuration as authored in the canvas editor.
///
/// Arbitrary JSON by design; the engine only interprets the reserved
/// `type` key, executors parse the subset they care about and ignore
/// the rest.
pub type NodeData = serde_json::Map<String, Value>;

/// A single operation in a workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: Uuid,
    pub workflow_id: Uuid,
    /// Design-time template reference; never consulted during execution.
    pub template_id: Uuid,
    pub position_x: f64,
    pub position_y: f64,
    pub data: NodeData,
}

impl WorkflowNode {
    /// The executor type key, if the node carries one.
    pub fn type_key(&self) -> Option<&str> {
        self.data.get("type").and_then(Value::as_str)
    }
}

/// A handle-to-handle connection between two nodes.
///
/// An edge only fires when its `source_handle` matches the handle the
/// source node's result triggered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEdge {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub source_node_id: Uuid,
    pub target_node_id: Uuid,
    pub source_handle: String,
    pub target_handle: String,
}
