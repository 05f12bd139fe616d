use async_trait::async_trait;
use rillcore::{ExecutionContext, NodeError, NodeExecutor, NodeResult};
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;

/// Compare two values and branch on the outcome.
pub struct ConditionExecutor;

#[derive(Deserialize)]
struct ConditionData {
    #[serde(default)]
    value1: Value,
    #[serde(default)]
    operator: String,
    #[serde(default)]
    value2: Value,
}

#[async_trait]
impl NodeExecutor for ConditionExecutor {
    fn type_key(&self) -> &str {
        "condition"
    }

    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        input: &[u8],
    ) -> Result<NodeResult, NodeError> {
        let data: ConditionData = serde_json::from_slice(input)?;

        let result = match data.operator.as_str() {
            "==" => data.value1 == data.value2,
            "!=" => data.value1 != data.value2,
            ">" => compare(&data.value1, &data.value2) == Ordering::Greater,
            "<" => compare(&data.value1, &data.value2) == Ordering::Less,
            ">=" => compare(&data.value1, &data.value2) != Ordering::Less,
            "<=" => compare(&data.value1, &data.value2) != Ordering::Greater,
            other => {
                return Err(NodeError::Config(format!("unknown operator: {other}")));
            }
        };

        let handle = if result { "output_true" } else { "output_false" };
        Ok(NodeResult::completed(handle)
            .with_log(format!("condition evaluated to {result}"))
            .with_output("result", result))
    }
}

/// Numeric comparison when both operands are numbers, lexical string
/// comparison otherwise.
fn compare(v1: &Value, v2: &Value) -> Ordering {
    if let (Some(f1), Some(f2)) = (v1.as_f64(), v2.as_f64()) {
        return f1.partial_cmp(&f2).unwrap_or(Ordering::Equal);
    }
    comparable_string(v1).cmp(&comparable_string(v2))
}

fn comparable_string(v: &Value) -> String {
    match v.as_str() {
        Some(s) => s.to_string(),
        None => v.to_string(),
    }
}

/// Normalize a sequence for downstream iteration.
///
/// Fires `output_item` once with the whole array; the engine does not
/// fan out per item.
pub struct LoopExecutor;

#[derive(Deserialize)]
struct LoopData {
    #[serde(default)]
    items: Value,
}

#[async_trait]
impl NodeExecutor for LoopExecutor {
    fn type_key(&self) -> &str {
        "loop"
    }

    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        input: &[u8],
    ) -> Result<NodeResult, NodeError> {
        let data: LoopData = serde_json::from_slice(input)?;
        let items = normalize_items(data.items)?;

        Ok(NodeResult::completed("output_item")
            .with_log(format!("looping over {} items", items.len()))
            .with_output("items", Value::Array(items)))
    }
}

fn normalize_items(items: Value) -> Result<Vec<Value>, NodeError> {
    match items {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        Value::String(s) => serde_json::from_str::<Vec<Value>>(&s).map_err(|_| {
            NodeError::Config("items is not an array or a valid JSON array".to_string())
        }),
        _ => Err(NodeError::Config(
            "items is not an array or a valid JSON array".to_string(),
        )),
    }
}

/// Join point after multiple branches.
///
/// Fires as soon as the first incoming branch delivers; the traversal's
/// visited set drops later deliveries.
pub struct MergeExecutor;

#[async_trait]
impl NodeExecutor for MergeExecutor {
    fn type_key(&self) -> &str {
        "merge"
    }

    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        _input: &[u8],
    ) -> Result<NodeResult, NodeError> {
        Ok(NodeResult::completed("output")
            .with_log("merge point reached")
            .with_output("merged", true))
    }
}
