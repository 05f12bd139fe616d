use crate::{
    LogStatus, NodeRunLog, RunStatus, StoreError, WorkflowEdge, WorkflowNode, WorkflowRun,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Partial update applied to a node run log when its executor returns.
///
/// Empty fields mean "leave unchanged". The store stamps `finished_at`
/// itself when the new status is terminal.
#[derive(Debug, Clone, Default)]
pub struct LogUpdate {
    pub status: Option<LogStatus>,
    pub log_output: String,
    pub error_msg: String,
}

impl LogUpdate {
    pub fn status(status: LogStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_log_output(mut self, log_output: impl Into<String>) -> Self {
        self.log_output = log_output.into();
        self
    }

    pub fn with_error_msg(mut self, error_msg: impl Into<String>) -> Self {
        self.error_msg = error_msg.into();
        self
    }
}

/// Storage contract for workflow runs.
#[async_trait]
pub trait RunRepository: Send + Sync {
    /// Create a run for the workflow, already in `running` state.
    async fn create(&self, workflow_id: Uuid) -> Result<WorkflowRun, StoreError>;

    async fn get(&self, id: Uuid) -> Result<WorkflowRun, StoreError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: RunStatus,
        finished_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    /// Page of runs for a workflow plus the total count.
    async fn list_by_workflow(
        &self,
        workflow_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<WorkflowRun>, i64), StoreError>;
}

/// Storage contract for per-node run logs.
#[async_trait]
pub trait LogRepository: Send + Sync {
    async fn create(
        &self,
        run_id: Uuid,
        node_id: Uuid,
        status: LogStatus,
    ) -> Result<NodeRunLog, StoreError>;

    async fn get(&self, id: Uuid) -> Result<NodeRunLog, StoreError>;

    /// Logs for a run, ordered by `started_at` ascending.
    async fn list_by_run(&self, run_id: Uuid) -> Result<Vec<NodeRunLog>, StoreError>;

    async fn update(&self, id: Uuid, update: LogUpdate) -> Result<(), StoreError>;
}

/// Read-only view of a workflow's nodes, as the engine consumes them.
#[async_trait]
pub trait NodeRepository: Send + Sync {
    async fn list_by_workflow(&self, workflow_id: Uuid) -> Result<Vec<WorkflowNode>, StoreError>;
}

/// Read-only view of a workflow's edges, as the engine consumes them.
#[async_trait]
pub trait EdgeRepository: Send + Sync {
    async fn list_by_workflow(&self, workflow_id: Uuid) -> Result<Vec<WorkflowEdge>, StoreError>;
}
