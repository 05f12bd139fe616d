use async_trait::async_trait;
use chrono::Utc;
use rillcore::{
    EdgeRepository, LogRepository, LogStatus, LogUpdate, NodeRepository, NodeRunLog,
    RunRepository, RunStatus, StoreError, WorkflowEdge, WorkflowNode, WorkflowRun,
};
use std::sync::Mutex;
use uuid::Uuid;

/// In-memory implementation of every repository contract.
///
/// Mirrors the relational store's observable semantics, including
/// server-side `finished_at` stamping on terminal transitions. Backs
/// the CLI and the engine test suite.
#[derive(Default)]
pub struct MemoryStore {
    nodes: Mutex<Vec<WorkflowNode>>,
    edges: Mutex<Vec<WorkflowEdge>>,
    runs: Mutex<Vec<WorkflowRun>>,
    logs: Mutex<Vec<NodeRunLog>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&self, node: WorkflowNode) {
        self.nodes.lock().unwrap().push(node);
    }

    pub fn add_edge(&self, edge: WorkflowEdge) {
        self.edges.lock().unwrap().push(edge);
    }
}

#[async_trait]
impl NodeRepository for MemoryStore {
    async fn list_by_workflow(&self, workflow_id: Uuid) -> Result<Vec<WorkflowNode>, StoreError> {
        Ok(self
            .nodes
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.workflow_id == workflow_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EdgeRepository for MemoryStore {
    async fn list_by_workflow(&self, workflow_id: Uuid) -> Result<Vec<WorkflowEdge>, StoreError> {
        Ok(self
            .edges
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.workflow_id == workflow_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RunRepository for MemoryStore {
    async fn create(&self, workflow_id: Uuid) -> Result<WorkflowRun, StoreError> {
        let now = Utc::now();
        let run = WorkflowRun {
            id: Uuid::new_v4(),
            workflow_id,
            status: RunStatus::Running,
            started_at: now,
            finished_at: None,
            created_at: now,
            updated_at: now,
        };
        self.runs.lock().unwrap().push(run.clone());
        Ok(run)
    }

    async fn get(&self, id: Uuid) -> Result<WorkflowRun, StoreError> {
        self.runs
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::NotFound("workflow run"))
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: RunStatus,
        finished_at: Option<chrono::DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut runs = self.runs.lock().unwrap();
        let run = runs
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound("workflow run"))?;
        run.status = status;
        run.finished_at = finished_at;
        run.updated_at = Utc::now();
        Ok(())
    }

    async fn list_by_workflow(
        &self,
        workflow_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<WorkflowRun>, i64), StoreError> {
        let runs = self.runs.lock().unwrap();
        let mut matching: Vec<_> = runs
            .iter()
            .filter(|r| r.workflow_id == workflow_id)
            .cloned()
            .collect();
        let total = matching.len() as i64;
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));

        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }
}

#[async_trait]
impl LogRepository for MemoryStore {
    async fn create(
        &self,
        run_id: Uuid,
        node_id: Uuid,
        status: LogStatus,
    ) -> Result<NodeRunLog, StoreError> {
        let now = Utc::now();
        let log = NodeRunLog {
            id: Uuid::new_v4(),
            run_id,
            node_id,
            status,
            log_output: String::new(),
            error_msg: String::new(),
            started_at: now,
            finished_at: None,
            created_at: now,
            updated_at: now,
        };
        self.logs.lock().unwrap().push(log.clone());
        Ok(log)
    }

    async fn get(&self, id: Uuid) -> Result<NodeRunLog, StoreError> {
        self.logs
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or(StoreError::NotFound("node run log"))
    }

    async fn list_by_run(&self, run_id: Uuid) -> Result<Vec<NodeRunLog>, StoreError> {
        // Insertion order matches started_at order for a sequential run
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.run_id == run_id)
            .cloned()
            .collect())
    }

    async fn update(&self, id: Uuid, update: LogUpdate) -> Result<(), StoreError> {
        let mut logs = self.logs.lock().unwrap();
        let log = logs
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(StoreError::NotFound("node run log"))?;

        if let Some(status) = update.status {
            log.status = status;
            if status.is_terminal() && log.finished_at.is_none() {
                log.finished_at = Some(Utc::now());
            }
        }
        if !update.log_output.is_empty() {
            log.log_output = update.log_output;
        }
        if !update.error_msg.is_empty() {
            log.error_msg = update.error_msg;
        }
        log.updated_at = Utc::now();
        Ok(())
    }
}
