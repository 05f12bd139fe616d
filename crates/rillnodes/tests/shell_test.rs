#![cfg(unix)]

use rillcore::{ExecutionContext, NodeError, NodeExecutor, ResultStatus};
use rillnodes::ShellCommandExecutor;
use serde_json::json;

fn blob(value: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&value).unwrap()
}

#[tokio::test]
async fn successful_command_trims_output() {
    let executor = ShellCommandExecutor;
    let ctx = ExecutionContext::default();

    let result = executor
        .execute(&ctx, &blob(json!({"command": "echo", "args": ["hello"]})))
        .await
        .unwrap();

    assert_eq!(result.status, ResultStatus::Completed);
    assert_eq!(result.triggered_handle.as_deref(), Some("output_success"));
    assert_eq!(result.output["output"], json!("hello"));
}

#[tokio::test]
async fn non_zero_exit_is_a_soft_failure() {
    let executor = ShellCommandExecutor;
    let ctx = ExecutionContext::default();

    let result = executor
        .execute(
            &ctx,
            &blob(json!({"command": "sh", "args": ["-c", "echo boom >&2; exit 3"]})),
        )
        .await
        .unwrap();

    assert_eq!(result.status, ResultStatus::Failed);
    assert_eq!(result.triggered_handle.as_deref(), Some("output_error"));
    assert!(result.output["output"].as_str().unwrap().contains("boom"));
    assert!(result.output.contains_key("error"));
}

#[tokio::test]
async fn missing_binary_is_a_soft_failure() {
    let executor = ShellCommandExecutor;
    let ctx = ExecutionContext::default();

    let result = executor
        .execute(
            &ctx,
            &blob(json!({"command": "definitely-not-a-real-binary-rill"})),
        )
        .await
        .unwrap();

    assert_eq!(result.status, ResultStatus::Failed);
    assert_eq!(result.triggered_handle.as_deref(), Some("output_error"));
}

#[tokio::test]
async fn missing_command_is_a_hard_failure() {
    let executor = ShellCommandExecutor;
    let ctx = ExecutionContext::default();

    let err = executor.execute(&ctx, &blob(json!({}))).await.unwrap_err();
    assert!(matches!(err, NodeError::Config(_)));
}

#[tokio::test]
async fn dir_sets_the_working_directory() {
    let executor = ShellCommandExecutor;
    let ctx = ExecutionContext::default();

    let result = executor
        .execute(&ctx, &blob(json!({"command": "pwd", "dir": "/tmp"})))
        .await
        .unwrap();

    assert_eq!(result.status, ResultStatus::Completed);
    let output = result.output["output"].as_str().unwrap();
    assert!(output.ends_with("tmp"), "unexpected cwd: {output}");
}
