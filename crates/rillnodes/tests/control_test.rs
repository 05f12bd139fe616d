use rillcore::{ExecutionContext, NodeError, NodeExecutor, ResultStatus};
use rillnodes::{ConditionExecutor, LoopExecutor, MergeExecutor};
use serde_json::json;

fn blob(value: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&value).unwrap()
}

#[tokio::test]
async fn condition_operator_table() {
    let executor = ConditionExecutor;
    let ctx = ExecutionContext::default();

    let cases = [
        (json!({"value1": 10, "operator": "==", "value2": 10}), "output_true", true),
        (json!({"value1": 10, "operator": "==", "value2": 20}), "output_false", false),
        (json!({"value1": 20, "operator": ">", "value2": 10}), "output_true", true),
        (json!({"value1": 5, "operator": "<", "value2": 3}), "output_false", false),
        (json!({"value1": 7, "operator": ">=", "value2": 7}), "output_true", true),
        (json!({"value1": 7, "operator": "<=", "value2": 6}), "output_false", false),
        (json!({"value1": "apple", "operator": "==", "value2": "apple"}), "output_true", true),
        (json!({"value1": "banana", "operator": ">", "value2": "apple"}), "output_true", true),
    ];

    for (data, handle, expected) in cases {
        let result = executor.execute(&ctx, &blob(data.clone())).await.unwrap();
        assert_eq!(result.status, ResultStatus::Completed, "case {data}");
        assert_eq!(result.triggered_handle.as_deref(), Some(handle), "case {data}");
        assert_eq!(result.output["result"], json!(expected), "case {data}");
    }
}

#[tokio::test]
async fn condition_compares_numbers_numerically() {
    let executor = ConditionExecutor;
    let ctx = ExecutionContext::default();

    // "9" > "10" lexically, but numeric operands compare as numbers
    let result = executor
        .execute(&ctx, &blob(json!({"value1": 9, "operator": ">", "value2": 10})))
        .await
        .unwrap();
    assert_eq!(result.triggered_handle.as_deref(), Some("output_false"));
}

#[tokio::test]
async fn condition_unknown_operator_is_a_hard_failure() {
    let executor = ConditionExecutor;
    let ctx = ExecutionContext::default();

    let err = executor
        .execute(&ctx, &blob(json!({"value1": 1, "operator": "~=", "value2": 2})))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::Config(_)));
}

#[tokio::test]
async fn loop_passes_arrays_through() {
    let executor = LoopExecutor;
    let ctx = ExecutionContext::default();

    let result = executor
        .execute(&ctx, &blob(json!({"items": [1, 2, 3]})))
        .await
        .unwrap();
    assert_eq!(result.status, ResultStatus::Completed);
    assert_eq!(result.triggered_handle.as_deref(), Some("output_item"));
    assert_eq!(result.output["items"], json!([1, 2, 3]));
}

#[tokio::test]
async fn loop_parses_json_encoded_arrays() {
    let executor = LoopExecutor;
    let ctx = ExecutionContext::default();

    let result = executor
        .execute(&ctx, &blob(json!({"items": "[\"a\", \"b\"]"})))
        .await
        .unwrap();
    assert_eq!(result.output["items"], json!(["a", "b"]));
}

#[tokio::test]
async fn loop_missing_items_yields_empty_array() {
    let executor = LoopExecutor;
    let ctx = ExecutionContext::default();

    let result = executor.execute(&ctx, &blob(json!({}))).await.unwrap();
    assert_eq!(result.output["items"], json!([]));
}

#[tokio::test]
async fn loop_rejects_non_array_items() {
    let executor = LoopExecutor;
    let ctx = ExecutionContext::default();

    let err = executor
        .execute(&ctx, &blob(json!({"items": 42})))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::Config(_)));

    let err = executor
        .execute(&ctx, &blob(json!({"items": "not json"})))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::Config(_)));
}

#[tokio::test]
async fn merge_always_fires_output() {
    let executor = MergeExecutor;
    let ctx = ExecutionContext::default();

    let result = executor.execute(&ctx, &blob(json!({}))).await.unwrap();
    assert_eq!(result.status, ResultStatus::Completed);
    assert_eq!(result.triggered_handle.as_deref(), Some("output"));
    assert_eq!(result.output["merged"], json!(true));
}
