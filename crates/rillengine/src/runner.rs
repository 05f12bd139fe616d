use crate::{ExecutorRegistry, RunEngine};
use rillcore::{
    EdgeRepository, LogRepository, NodeRepository, RunRepository, WorkflowRun,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Facade over the repositories and registry for launching runs.
///
/// `start_run` creates the run row and hands back a prepared engine;
/// the caller decides whether to drive it inline or on a background
/// task. `execute_run` drives a run whose row was created elsewhere.
pub struct Runner {
    node_repo: Arc<dyn NodeRepository>,
    edge_repo: Arc<dyn EdgeRepository>,
    run_repo: Arc<dyn RunRepository>,
    log_repo: Arc<dyn LogRepository>,
    registry: Arc<ExecutorRegistry>,
}

impl Runner {
    pub fn new(
        node_repo: Arc<dyn NodeRepository>,
        edge_repo: Arc<dyn EdgeRepository>,
        run_repo: Arc<dyn RunRepository>,
        log_repo: Arc<dyn LogRepository>,
        registry: Arc<ExecutorRegistry>,
    ) -> Self {
        Self {
            node_repo,
            edge_repo,
            run_repo,
            log_repo,
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<ExecutorRegistry> {
        &self.registry
    }

    /// Create a run for the workflow and build the engine that will
    /// drive it.
    pub async fn start_run(
        &self,
        workflow_id: Uuid,
    ) -> rillcore::Result<(WorkflowRun, RunEngine)> {
        let nodes = self.node_repo.list_by_workflow(workflow_id).await?;
        let edges = self.edge_repo.list_by_workflow(workflow_id).await?;

        let run = self.run_repo.create(workflow_id).await?;
        tracing::info!(run_id = %run.id, %workflow_id, "created workflow run");

        let engine = RunEngine::new(
            nodes,
            edges,
            run.id,
            workflow_id,
            Arc::clone(&self.log_repo),
            Arc::clone(&self.run_repo),
            Arc::clone(&self.registry),
        )?;

        Ok((run, engine))
    }

    /// Drive an already-created run to completion. Assumes the run row
    /// exists and is fresh.
    pub async fn execute_run(
        &self,
        run_id: Uuid,
        cancellation: CancellationToken,
    ) -> rillcore::Result<()> {
        let run = self.run_repo.get(run_id).await?;
        let nodes = self.node_repo.list_by_workflow(run.workflow_id).await?;
        let edges = self.edge_repo.list_by_workflow(run.workflow_id).await?;

        let engine = RunEngine::new(
            nodes,
            edges,
            run.id,
            run.workflow_id,
            Arc::clone(&self.log_repo),
            Arc::clone(&self.run_repo),
            Arc::clone(&self.registry),
        )?;

        engine.execute(cancellation).await
    }
}
