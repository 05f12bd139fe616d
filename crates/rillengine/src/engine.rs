use crate::{ExecutorRegistry, WorkflowGraph};
use chrono::Utc;
use petgraph::graph::NodeIndex;
use rillcore::{
    EngineError, ExecutionContext, LogRepository, LogStatus, LogUpdate, NodeError,
    ResultStatus, RunRepository, RunStatus, WorkflowEdge, WorkflowNode,
};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Drives one workflow run from its start nodes to a terminal status.
///
/// Traversal is a FIFO work list seeded with the nodes that have no
/// incoming edges; a visited set guarantees termination on graphs with
/// cycles. Each executed node gets exactly one log row, created as
/// `running` before dispatch and finalized once when the executor
/// returns.
pub struct RunEngine {
    graph: WorkflowGraph,
    run_id: Uuid,
    workflow_id: Uuid,
    run_repo: Arc<dyn RunRepository>,
    log_repo: Arc<dyn LogRepository>,
    registry: Arc<ExecutorRegistry>,
    // Written by completing nodes, read when resolving downstream
    // inputs. Today a single worker drives the run; the guard keeps the
    // table safe for future parallel-branch execution.
    node_outputs: RwLock<HashMap<Uuid, Map<String, Value>>>,
}

impl RunEngine {
    pub fn new(
        nodes: Vec<WorkflowNode>,
        edges: Vec<WorkflowEdge>,
        run_id: Uuid,
        workflow_id: Uuid,
        log_repo: Arc<dyn LogRepository>,
        run_repo: Arc<dyn RunRepository>,
        registry: Arc<ExecutorRegistry>,
    ) -> Result<Self, EngineError> {
        let graph = WorkflowGraph::build(nodes, edges)?;
        Ok(Self {
            graph,
            run_id,
            workflow_id,
            run_repo,
            log_repo,
            registry,
            node_outputs: RwLock::new(HashMap::new()),
        })
    }

    /// Walk the graph to completion, advancing the run row as a side
    /// effect. Returns `Ok(())` on a clean drain; on abort the run is
    /// left in `failed` (or `cancelled`) and the cause is returned.
    pub async fn execute(&self, cancellation: CancellationToken) -> rillcore::Result<()> {
        let started = Instant::now();
        self.run_repo
            .update_status(self.run_id, RunStatus::Running, None)
            .await?;

        tracing::info!(
            run_id = %self.run_id,
            workflow_id = %self.workflow_id,
            nodes = self.graph.node_count(),
            "starting workflow run"
        );

        let start_nodes = self.graph.start_nodes();
        if start_nodes.is_empty() {
            self.finish_run(RunStatus::Failed).await;
            return Err(EngineError::NoStartNodes);
        }

        let mut queue: VecDeque<NodeIndex> = start_nodes.into();
        let mut visited: HashSet<NodeIndex> = HashSet::new();

        while let Some(idx) = queue.pop_front() {
            if !visited.insert(idx) {
                continue;
            }

            if cancellation.is_cancelled() {
                self.finish_run(RunStatus::Cancelled).await;
                return Err(EngineError::Cancelled);
            }

            let triggered = match self.process_node(idx, &cancellation).await {
                Ok(triggered) => triggered,
                Err(EngineError::Cancelled) => {
                    self.finish_run(RunStatus::Cancelled).await;
                    return Err(EngineError::Cancelled);
                }
                Err(err) => {
                    self.finish_run(RunStatus::Failed).await;
                    return Err(err);
                }
            };

            queue.extend(self.graph.next_nodes(idx, triggered.as_deref()));
        }

        self.run_repo
            .update_status(self.run_id, RunStatus::Completed, Some(Utc::now()))
            .await?;

        tracing::info!(
            run_id = %self.run_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "workflow run completed"
        );
        Ok(())
    }

    /// Execute a single node and return the handle its result triggered.
    async fn process_node(
        &self,
        idx: NodeIndex,
        cancellation: &CancellationToken,
    ) -> Result<Option<String>, EngineError> {
        let node = self.graph.node(idx);
        let node_id = node.id;

        let log = self
            .log_repo
            .create(self.run_id, node_id, LogStatus::Running)
            .await?;

        let input_blob = self.build_input_blob(idx).await;

        let type_key = match node.type_key() {
            Some(key) => key.to_string(),
            None => {
                let err = NodeError::Config("node type not found in data".to_string());
                self.finalize_log_failed(log.id, &err).await;
                return Err(EngineError::Node {
                    node_id,
                    source: err,
                });
            }
        };

        let executor = match self.registry.get(&type_key) {
            Ok(executor) => executor,
            Err(err) => {
                self.finalize_log_failed(log.id, &err).await;
                return Err(EngineError::Node {
                    node_id,
                    source: err,
                });
            }
        };

        let input_bytes = match serde_json::to_vec(&Value::Object(input_blob)) {
            Ok(bytes) => bytes,
            Err(err) => {
                let err = NodeError::Input(err);
                self.finalize_log_failed(log.id, &err).await;
                return Err(EngineError::Node {
                    node_id,
                    source: err,
                });
            }
        };

        tracing::debug!(run_id = %self.run_id, node_id = %node_id, %type_key, "executing node");
        let node_started = Instant::now();
        let ctx = ExecutionContext::new(cancellation.clone());

        let result = match executor.execute(&ctx, &input_bytes).await {
            Ok(result) => result,
            Err(NodeError::Cancelled) => {
                self.finalize_log_failed(log.id, &NodeError::Cancelled).await;
                return Err(EngineError::Cancelled);
            }
            Err(err) => {
                self.finalize_log_failed(log.id, &err).await;
                return Err(EngineError::Node {
                    node_id,
                    source: err,
                });
            }
        };

        if result.status == ResultStatus::Cancelled {
            self.finalize_log_failed(log.id, &NodeError::Cancelled).await;
            return Err(EngineError::Cancelled);
        }

        self.node_outputs
            .write()
            .await
            .insert(node_id, result.output);

        let status = match result.status {
            ResultStatus::Failed => LogStatus::Failed,
            _ => LogStatus::Completed,
        };

        // Log finalization is best-effort; the run row is authoritative.
        if let Err(err) = self
            .log_repo
            .update(
                log.id,
                LogUpdate::status(status).with_log_output(result.log),
            )
            .await
        {
            tracing::warn!(run_id = %self.run_id, node_id = %node_id, %err, "failed to update node log");
        }

        tracing::info!(
            run_id = %self.run_id,
            node_id = %node_id,
            %type_key,
            status = %status,
            elapsed_ms = node_started.elapsed().as_millis() as u64,
            "node finished"
        );

        Ok(result.triggered_handle)
    }

    /// Assemble the executor input: the node's configuration plus the
    /// `input` map of values routed across incoming edges. An edge
    /// carries `source_output[source_handle]` when that key exists,
    /// otherwise the whole upstream output map.
    async fn build_input_blob(&self, idx: NodeIndex) -> Map<String, Value> {
        let node = self.graph.node(idx);
        let mut blob = node.data.clone();

        let outputs = self.node_outputs.read().await;
        let mut upstream = Map::new();
        for edge in self.graph.incoming_edges(idx) {
            if let Some(source_output) = outputs.get(&edge.source_node_id) {
                let value = source_output
                    .get(&edge.source_handle)
                    .cloned()
                    .unwrap_or_else(|| Value::Object(source_output.clone()));
                upstream.insert(edge.target_handle.clone(), value);
            }
        }
        drop(outputs);

        blob.insert("input".to_string(), Value::Object(upstream));
        blob
    }

    async fn finalize_log_failed(&self, log_id: Uuid, err: &NodeError) {
        if let Err(update_err) = self
            .log_repo
            .update(
                log_id,
                LogUpdate::status(LogStatus::Failed).with_error_msg(err.to_string()),
            )
            .await
        {
            tracing::warn!(run_id = %self.run_id, %update_err, "failed to update node log");
        }
    }

    /// Move the run to a terminal status, best-effort: the caller is
    /// already unwinding with the primary error.
    async fn finish_run(&self, status: RunStatus) {
        if let Err(err) = self
            .run_repo
            .update_status(self.run_id, status, Some(Utc::now()))
            .await
        {
            tracing::warn!(run_id = %self.run_id, %err, "failed to update run status");
        }
    }
}
