//! End-to-end traversal tests driving real executors through the
//! engine against the in-memory store.

use rillcore::{
    EngineError, LogRepository, LogStatus, RunRepository, RunStatus, WorkflowEdge,
    WorkflowNode, WorkflowRun,
};
use rillengine::Runner;
use rillstore::MemoryStore;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn node(workflow_id: Uuid, data: serde_json::Value) -> WorkflowNode {
    WorkflowNode {
        id: Uuid::new_v4(),
        workflow_id,
        template_id: Uuid::new_v4(),
        position_x: 0.0,
        position_y: 0.0,
        data: data.as_object().cloned().unwrap_or_default(),
    }
}

fn edge(source: &WorkflowNode, source_handle: &str, target: &WorkflowNode) -> WorkflowEdge {
    WorkflowEdge {
        id: Uuid::new_v4(),
        workflow_id: source.workflow_id,
        source_node_id: source.id,
        target_node_id: target.id,
        source_handle: source_handle.to_string(),
        target_handle: "input".to_string(),
    }
}

fn edge_to(
    source: &WorkflowNode,
    source_handle: &str,
    target: &WorkflowNode,
    target_handle: &str,
) -> WorkflowEdge {
    WorkflowEdge {
        target_handle: target_handle.to_string(),
        ..edge(source, source_handle, target)
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    runner: Runner,
    workflow_id: Uuid,
}

fn harness(nodes: &[WorkflowNode], edges: &[WorkflowEdge], workflow_id: Uuid) -> Harness {
    let store = Arc::new(MemoryStore::new());
    for node in nodes {
        store.add_node(node.clone());
    }
    for edge in edges {
        store.add_edge(edge.clone());
    }

    let runner = Runner::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(rillnodes::builtin_registry()),
    );

    Harness {
        store,
        runner,
        workflow_id,
    }
}

impl Harness {
    async fn execute(&self) -> (WorkflowRun, rillcore::Result<()>) {
        self.execute_with(CancellationToken::new()).await
    }

    async fn execute_with(
        &self,
        token: CancellationToken,
    ) -> (WorkflowRun, rillcore::Result<()>) {
        let (run, engine) = self.runner.start_run(self.workflow_id).await.unwrap();
        let outcome = engine.execute(token).await;
        let run = RunRepository::get(self.store.as_ref(), run.id)
            .await
            .unwrap();
        (run, outcome)
    }

    async fn logs(&self, run_id: Uuid) -> Vec<rillcore::NodeRunLog> {
        self.store.list_by_run(run_id).await.unwrap()
    }
}

#[tokio::test]
async fn linear_flow_executes_both_nodes_in_order() {
    let wf = Uuid::new_v4();
    let a = node(wf, json!({"type": "set_data", "data": {"foo": "bar"}}));
    let b = node(wf, json!({"type": "set_data", "data": {"baz": "qux"}}));
    let edges = [edge(&a, "output", &b)];

    let h = harness(&[a.clone(), b.clone()], &edges, wf);
    let (run, outcome) = h.execute().await;

    assert!(outcome.is_ok());
    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.finished_at.is_some());

    let logs = h.logs(run.id).await;
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].node_id, a.id);
    assert_eq!(logs[1].node_id, b.id);
    assert!(logs[0].started_at <= logs[1].started_at);
    for log in &logs {
        assert_eq!(log.status, LogStatus::Completed);
        assert!(log.finished_at.is_some());
    }
}

#[tokio::test]
async fn conditional_branch_touches_only_the_matching_edge() {
    let wf = Uuid::new_v4();
    let cond = node(
        wf,
        json!({"type": "condition", "value1": 10, "operator": ">", "value2": 5}),
    );
    let then_branch = node(wf, json!({"type": "log", "message": "true branch"}));
    let else_branch = node(wf, json!({"type": "log", "message": "false branch"}));
    let edges = [
        edge(&cond, "output_true", &then_branch),
        edge(&cond, "output_false", &else_branch),
    ];

    let h = harness(
        &[cond.clone(), then_branch.clone(), else_branch.clone()],
        &edges,
        wf,
    );
    let (run, outcome) = h.execute().await;

    assert!(outcome.is_ok());
    assert_eq!(run.status, RunStatus::Completed);

    let logs = h.logs(run.id).await;
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().any(|l| l.node_id == cond.id));
    assert!(logs.iter().any(|l| l.node_id == then_branch.id));
    assert!(logs.iter().all(|l| l.node_id != else_branch.id));
}

#[tokio::test]
async fn soft_failure_routes_down_the_error_branch_only() {
    let wf = Uuid::new_v4();
    let http = node(
        wf,
        json!({"type": "http_request", "url": "http://unresolvable.invalid/x"}),
    );
    let on_error = node(wf, json!({"type": "log", "message": "handled"}));
    let on_success = node(wf, json!({"type": "log", "message": "unreachable"}));
    let edges = [
        edge(&http, "output_error", &on_error),
        edge(&http, "output_success", &on_success),
    ];

    let h = harness(
        &[http.clone(), on_error.clone(), on_success.clone()],
        &edges,
        wf,
    );
    let (run, outcome) = h.execute().await;

    // The run recovers through the error branch
    assert!(outcome.is_ok());
    assert_eq!(run.status, RunStatus::Completed);

    let logs = h.logs(run.id).await;
    assert_eq!(logs.len(), 2);

    let http_log = logs.iter().find(|l| l.node_id == http.id).unwrap();
    assert_eq!(http_log.status, LogStatus::Failed);
    assert!(http_log.finished_at.is_some());

    let error_log = logs.iter().find(|l| l.node_id == on_error.id).unwrap();
    assert_eq!(error_log.status, LogStatus::Completed);

    assert!(logs.iter().all(|l| l.node_id != on_success.id));
}

#[tokio::test]
async fn unknown_node_type_aborts_the_run() {
    let wf = Uuid::new_v4();
    let bad = node(wf, json!({"type": "not_a_real_type"}));
    let downstream = node(wf, json!({"type": "log", "message": "never"}));
    let edges = [edge(&bad, "output", &downstream)];

    let h = harness(&[bad.clone(), downstream.clone()], &edges, wf);
    let (run, outcome) = h.execute().await;

    assert!(matches!(outcome, Err(EngineError::Node { .. })));
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.finished_at.is_some());

    let logs = h.logs(run.id).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].node_id, bad.id);
    assert_eq!(logs[0].status, LogStatus::Failed);
    assert!(logs[0].error_msg.contains("not_a_real_type"));
}

#[tokio::test]
async fn missing_type_key_aborts_the_run() {
    let wf = Uuid::new_v4();
    let bad = node(wf, json!({"note": "no type here"}));

    let h = harness(&[bad.clone()], &[], wf);
    let (run, outcome) = h.execute().await;

    assert!(matches!(outcome, Err(EngineError::Node { .. })));
    assert_eq!(run.status, RunStatus::Failed);

    let logs = h.logs(run.id).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, LogStatus::Failed);
}

#[tokio::test]
async fn cancelling_mid_wait_cancels_the_run() {
    let wf = Uuid::new_v4();
    let wait = node(wf, json!({"type": "wait", "duration": 10, "unit": "s"}));
    let downstream = node(wf, json!({"type": "log", "message": "never"}));
    let edges = [edge(&wait, "output", &downstream)];

    let h = harness(&[wait.clone(), downstream.clone()], &edges, wf);

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let (run, outcome) = h.execute_with(token).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(outcome, Err(EngineError::Cancelled)));
    assert_eq!(run.status, RunStatus::Cancelled);
    assert!(run.finished_at.is_some());

    let logs = h.logs(run.id).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].node_id, wait.id);
    assert_eq!(logs[0].status, LogStatus::Failed);
}

#[tokio::test]
async fn cyclic_workflow_fails_with_no_start_nodes() {
    let wf = Uuid::new_v4();
    let a = node(wf, json!({"type": "set_data", "data": {}}));
    let b = node(wf, json!({"type": "set_data", "data": {}}));
    let edges = [edge(&a, "output", &b), edge(&b, "output", &a)];

    let h = harness(&[a, b], &edges, wf);
    let (run, outcome) = h.execute().await;

    assert!(matches!(outcome, Err(EngineError::NoStartNodes)));
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.finished_at.is_some());
    assert!(h.logs(run.id).await.is_empty());
}

#[tokio::test]
async fn merge_executes_exactly_once_for_multiple_branches() {
    let wf = Uuid::new_v4();
    let a = node(wf, json!({"type": "set_data", "data": {"from": "a"}}));
    let b = node(wf, json!({"type": "set_data", "data": {"from": "b"}}));
    let merge = node(wf, json!({"type": "merge"}));
    let edges = [edge(&a, "output", &merge), edge(&b, "output", &merge)];

    let h = harness(&[a, b, merge.clone()], &edges, wf);
    let (run, outcome) = h.execute().await;

    assert!(outcome.is_ok());
    assert_eq!(run.status, RunStatus::Completed);

    let logs = h.logs(run.id).await;
    assert_eq!(logs.len(), 3);
    let merge_logs: Vec<_> = logs.iter().filter(|l| l.node_id == merge.id).collect();
    assert_eq!(merge_logs.len(), 1);
    assert_eq!(merge_logs[0].status, LogStatus::Completed);
}

#[tokio::test]
async fn outputs_route_across_matching_handles() {
    let wf = Uuid::new_v4();
    let producer = node(wf, json!({"type": "set_data", "data": {"result": 5}}));
    // The producer's output map has a "result" key, so the edge routes
    // exactly that value onto the consumer's "value" handle.
    let consumer = node(
        wf,
        json!({"type": "code_js", "code": "console.log(String(input.value)); ({seen: true})"}),
    );
    let edges = [edge_to(&producer, "result", &consumer, "value")];

    let h = harness(&[producer, consumer.clone()], &edges, wf);
    let (run, outcome) = h.execute().await;

    assert!(outcome.is_ok());
    assert_eq!(run.status, RunStatus::Completed);

    let logs = h.logs(run.id).await;
    let consumer_log = logs.iter().find(|l| l.node_id == consumer.id).unwrap();
    assert_eq!(consumer_log.status, LogStatus::Completed);
    assert!(
        consumer_log.log_output.contains('5'),
        "routed value missing from: {}",
        consumer_log.log_output
    );
}

#[tokio::test]
async fn whole_output_map_routes_when_the_source_handle_is_absent() {
    let wf = Uuid::new_v4();
    let producer = node(wf, json!({"type": "set_data", "data": {"greeting": "hi"}}));
    // "output" is not a key of the producer's output map, so the whole
    // map is routed onto the consumer's "payload" handle.
    let consumer = node(
        wf,
        json!({"type": "code_js", "code": "console.log(input.payload.greeting); ({seen: true})"}),
    );
    let edges = [edge_to(&producer, "output", &consumer, "payload")];

    let h = harness(&[producer, consumer.clone()], &edges, wf);
    let (run, outcome) = h.execute().await;

    assert!(outcome.is_ok());
    assert_eq!(run.status, RunStatus::Completed);

    let logs = h.logs(run.id).await;
    let consumer_log = logs.iter().find(|l| l.node_id == consumer.id).unwrap();
    assert!(
        consumer_log.log_output.contains("hi"),
        "routed map missing from: {}",
        consumer_log.log_output
    );
}
