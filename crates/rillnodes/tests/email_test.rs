use rillcore::{ExecutionContext, NodeError, NodeExecutor, ResultStatus};
use rillnodes::EmailSmtpExecutor;
use serde_json::json;

fn blob(value: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&value).unwrap()
}

#[tokio::test]
async fn transport_failure_is_a_soft_failure() {
    let executor = EmailSmtpExecutor;
    let ctx = ExecutionContext::default();

    // Port 1 on loopback is refused immediately
    let result = executor
        .execute(
            &ctx,
            &blob(json!({
                "host": "127.0.0.1",
                "port": 1,
                "from": "sender@example.com",
                "to": ["receiver@example.com"],
                "subject": "hi",
                "body": "hello"
            })),
        )
        .await
        .unwrap();

    assert_eq!(result.status, ResultStatus::Failed);
    assert_eq!(result.triggered_handle.as_deref(), Some("output_error"));
    assert!(result.output.contains_key("error"));
}

#[tokio::test]
async fn empty_recipient_list_does_not_abort() {
    let executor = EmailSmtpExecutor;
    let ctx = ExecutionContext::default();

    let result = executor
        .execute(
            &ctx,
            &blob(json!({
                "host": "127.0.0.1",
                "port": 1,
                "from": "sender@example.com",
                "to": [],
                "subject": "hi",
                "body": "hello"
            })),
        )
        .await
        .unwrap();

    assert_eq!(result.status, ResultStatus::Failed);
    assert_eq!(result.triggered_handle.as_deref(), Some("output_error"));
}

#[tokio::test]
async fn malformed_from_address_is_a_hard_failure() {
    let executor = EmailSmtpExecutor;
    let ctx = ExecutionContext::default();

    let err = executor
        .execute(
            &ctx,
            &blob(json!({
                "host": "127.0.0.1",
                "port": 1,
                "from": "not an address",
                "to": ["receiver@example.com"]
            })),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, NodeError::Config(_)));
}

#[tokio::test]
async fn malformed_recipient_is_a_hard_failure() {
    let executor = EmailSmtpExecutor;
    let ctx = ExecutionContext::default();

    let err = executor
        .execute(
            &ctx,
            &blob(json!({
                "host": "127.0.0.1",
                "port": 1,
                "from": "sender@example.com",
                "to": ["not an address"]
            })),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, NodeError::Config(_)));
}
