use async_trait::async_trait;
use rillcore::{ExecutionContext, NodeError, NodeExecutor, NodeResult};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Emit a literal object authored on the node.
pub struct SetDataExecutor;

#[derive(Deserialize)]
struct SetDataData {
    #[serde(default)]
    data: Map<String, Value>,
}

#[async_trait]
impl NodeExecutor for SetDataExecutor {
    fn type_key(&self) -> &str {
        "set_data"
    }

    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        input: &[u8],
    ) -> Result<NodeResult, NodeError> {
        let data: SetDataData = serde_json::from_slice(input)?;
        Ok(NodeResult::completed("output")
            .with_log("data set")
            .with_outputs(data.data))
    }
}

/// Write a diagnostic line through the process logger.
pub struct LogExecutor;

#[derive(Deserialize)]
struct LogData {
    #[serde(default)]
    message: String,
    #[serde(default)]
    level: String,
}

#[async_trait]
impl NodeExecutor for LogExecutor {
    fn type_key(&self) -> &str {
        "log"
    }

    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        input: &[u8],
    ) -> Result<NodeResult, NodeError> {
        let data: LogData = serde_json::from_slice(input)?;

        match data.level.as_str() {
            "warn" => tracing::warn!("{}", data.message),
            "error" => tracing::error!("{}", data.message),
            _ => tracing::info!("{}", data.message),
        }

        Ok(NodeResult::completed("output")
            .with_log(format!("[{}] {}", data.level, data.message))
            .with_output("logged", true))
    }
}
