use crate::NodeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Outcome status of a single executor invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Completed,
    Failed,
    Cancelled,
}

/// The in-memory result an executor hands back to the engine.
///
/// `triggered_handle` names the output handle that fires; downstream
/// edges are only followed when their source handle matches it. A
/// result without a triggered handle fires every outgoing edge.
#[derive(Debug, Clone)]
pub struct NodeResult {
    pub status: ResultStatus,
    pub triggered_handle: Option<String>,
    pub log: String,
    pub output: serde_json::Map<String, Value>,
}

impl NodeResult {
    /// Successful completion firing the given handle.
    pub fn completed(handle: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Completed,
            triggered_handle: Some(handle.into()),
            log: String::new(),
            output: serde_json::Map::new(),
        }
    }

    /// Soft failure: the operation ran but did not succeed. Fires the
    /// `output_error` handle so error branches keep executing; the run
    /// itself continues.
    pub fn soft_error(log: impl Into<String>, error: impl Into<String>) -> Self {
        let mut output = serde_json::Map::new();
        output.insert("error".to_string(), Value::String(error.into()));
        Self {
            status: ResultStatus::Failed,
            triggered_handle: Some("output_error".to_string()),
            log: log.into(),
            output,
        }
    }

    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = log.into();
        self
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.output.insert(key.into(), value.into());
        self
    }

    pub fn with_outputs(mut self, outputs: serde_json::Map<String, Value>) -> Self {
        self.output = outputs;
        self
    }
}

/// Request-scoped context passed to every executor invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Cancellation signal from the caller driving the run. Executors
    /// that block (timers, network, processes) race their work against
    /// this token.
    pub cancellation: CancellationToken,
}

impl ExecutionContext {
    pub fn new(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }
}

/// A stateless implementation of one node type.
///
/// The input blob is a JSON object: the node's static configuration
/// flattened, plus a reserved `input` key mapping each target handle to
/// the value routed to it across the matching edge.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Type key this executor is registered under (e.g. `http_request`).
    fn type_key(&self) -> &str;

    async fn execute(
        &self,
        ctx: &ExecutionContext,
        input: &[u8],
    ) -> Result<NodeResult, NodeError>;
}
