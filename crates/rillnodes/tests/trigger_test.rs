use chrono::DateTime;
use rillcore::{ExecutionContext, NodeExecutor, ResultStatus};
use rillnodes::{CronExecutor, WebhookExecutor};
use serde_json::json;

#[tokio::test]
async fn webhook_echoes_the_raw_payload() {
    let executor = WebhookExecutor;
    let ctx = ExecutionContext::default();
    let input = serde_json::to_vec(&json!({"type": "webhook", "input": {}})).unwrap();

    let result = executor.execute(&ctx, &input).await.unwrap();
    assert_eq!(result.status, ResultStatus::Completed);
    assert_eq!(result.triggered_handle.as_deref(), Some("output"));

    let payload = result.output["payload"].as_str().unwrap();
    assert_eq!(payload.as_bytes(), input.as_slice());
}

#[tokio::test]
async fn cron_emits_an_rfc3339_timestamp() {
    let executor = CronExecutor;
    let ctx = ExecutionContext::default();

    let result = executor.execute(&ctx, b"{}").await.unwrap();
    assert_eq!(result.triggered_handle.as_deref(), Some("output"));

    let timestamp = result.output["timestamp"].as_str().unwrap();
    assert!(
        DateTime::parse_from_rfc3339(timestamp).is_ok(),
        "not RFC 3339: {timestamp}"
    );
}
