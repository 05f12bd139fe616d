use async_trait::async_trait;
use rillcore::{ExecutionContext, NodeError, NodeExecutor, NodeResult};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;

/// Sleep for a configured duration, racing the wait against the
/// caller's cancellation signal.
pub struct WaitExecutor;

#[derive(Deserialize)]
struct WaitData {
    #[serde(default)]
    duration: u64,
    #[serde(default)]
    unit: String,
}

#[async_trait]
impl NodeExecutor for WaitExecutor {
    fn type_key(&self) -> &str {
        "wait"
    }

    async fn execute(
        &self,
        ctx: &ExecutionContext,
        input: &[u8],
    ) -> Result<NodeResult, NodeError> {
        let data: WaitData = serde_json::from_slice(input)?;

        let duration = match data.unit.as_str() {
            "s" => Duration::from_secs(data.duration),
            "m" => Duration::from_secs(data.duration * 60),
            "h" => Duration::from_secs(data.duration * 3600),
            // milliseconds by default
            _ => Duration::from_millis(data.duration),
        };

        tokio::select! {
            _ = sleep(duration) => Ok(NodeResult::completed("output")
                .with_log(format!("waited for {duration:?}"))
                .with_output("waited", true)),
            _ = ctx.cancellation.cancelled() => Err(NodeError::Cancelled),
        }
    }
}
