use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rillcore::{ExecutionContext, NodeError, NodeExecutor, NodeResult};

/// Passive entry point for externally-initiated runs. Echoes the raw
/// input bytes through as the payload.
pub struct WebhookExecutor;

#[async_trait]
impl NodeExecutor for WebhookExecutor {
    fn type_key(&self) -> &str {
        "webhook"
    }

    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        input: &[u8],
    ) -> Result<NodeResult, NodeError> {
        Ok(NodeResult::completed("output")
            .with_log("webhook triggered")
            .with_output("payload", String::from_utf8_lossy(input).into_owned()))
    }
}

/// Passive entry point for scheduled runs. Emits the trigger time.
pub struct CronExecutor;

#[async_trait]
impl NodeExecutor for CronExecutor {
    fn type_key(&self) -> &str {
        "cron"
    }

    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        _input: &[u8],
    ) -> Result<NodeResult, NodeError> {
        Ok(NodeResult::completed("output")
            .with_log("cron triggered")
            .with_output(
                "timestamp",
                Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            ))
    }
}
