use rillcore::{ExecutionContext, NodeError, NodeExecutor, ResultStatus};
use rillnodes::{FileReadExecutor, FileWriteExecutor};
use serde_json::json;
use uuid::Uuid;

fn blob(value: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&value).unwrap()
}

fn scratch_path() -> std::path::PathBuf {
    std::env::temp_dir()
        .join("rill-file-tests")
        .join(Uuid::new_v4().to_string())
        .join("out.txt")
}

#[tokio::test]
async fn write_then_read_round_trip() {
    let path = scratch_path();
    let write = FileWriteExecutor;
    let read = FileReadExecutor;
    let ctx = ExecutionContext::default();

    let result = write
        .execute(
            &ctx,
            &blob(json!({"path": path, "content": "hello rill"})),
        )
        .await
        .unwrap();
    assert_eq!(result.status, ResultStatus::Completed);
    assert_eq!(result.triggered_handle.as_deref(), Some("output_success"));
    assert_eq!(result.output["bytes_written"], json!(10));

    let result = read
        .execute(&ctx, &blob(json!({"path": path})))
        .await
        .unwrap();
    assert_eq!(result.status, ResultStatus::Completed);
    assert_eq!(result.output["content"], json!("hello rill"));
    assert_eq!(result.output["size"], json!(10));
}

#[tokio::test]
async fn append_extends_the_file() {
    let path = scratch_path();
    let write = FileWriteExecutor;
    let read = FileReadExecutor;
    let ctx = ExecutionContext::default();

    write
        .execute(&ctx, &blob(json!({"path": path, "content": "one"})))
        .await
        .unwrap();
    write
        .execute(
            &ctx,
            &blob(json!({"path": path, "content": "two", "append": true})),
        )
        .await
        .unwrap();

    let result = read
        .execute(&ctx, &blob(json!({"path": path})))
        .await
        .unwrap();
    assert_eq!(result.output["content"], json!("onetwo"));
}

#[tokio::test]
async fn missing_path_is_a_hard_failure() {
    let ctx = ExecutionContext::default();

    let err = FileReadExecutor
        .execute(&ctx, &blob(json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::Config(_)));

    let err = FileWriteExecutor
        .execute(&ctx, &blob(json!({"content": "x"})))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::Config(_)));
}

#[tokio::test]
async fn reading_a_missing_file_is_a_soft_failure() {
    let ctx = ExecutionContext::default();

    let result = FileReadExecutor
        .execute(&ctx, &blob(json!({"path": scratch_path()})))
        .await
        .unwrap();

    assert_eq!(result.status, ResultStatus::Failed);
    assert_eq!(result.triggered_handle.as_deref(), Some("output_error"));
    assert!(result.output.contains_key("error"));
}
