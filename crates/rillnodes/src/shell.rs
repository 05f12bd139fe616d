use async_trait::async_trait;
use rillcore::{ExecutionContext, NodeError, NodeExecutor, NodeResult};
use serde::Deserialize;
use tokio::process::Command;

/// Run an external program and capture its combined output.
pub struct ShellCommandExecutor;

#[derive(Deserialize)]
struct ShellData {
    #[serde(default)]
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    dir: String,
}

#[async_trait]
impl NodeExecutor for ShellCommandExecutor {
    fn type_key(&self) -> &str {
        "shell_command"
    }

    async fn execute(
        &self,
        ctx: &ExecutionContext,
        input: &[u8],
    ) -> Result<NodeResult, NodeError> {
        let data: ShellData = serde_json::from_slice(input)?;

        if data.command.is_empty() {
            return Err(NodeError::Config("command is required".to_string()));
        }

        let mut command = Command::new(&data.command);
        command.args(&data.args).kill_on_drop(true);
        if !data.dir.is_empty() {
            command.current_dir(&data.dir);
        }

        let output = tokio::select! {
            output = command.output() => output,
            _ = ctx.cancellation.cancelled() => return Err(NodeError::Cancelled),
        };

        let output = match output {
            Ok(output) => output,
            Err(err) => {
                return Ok(NodeResult::soft_error(
                    format!("command failed: {err}"),
                    err.to_string(),
                ));
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Ok(NodeResult::soft_error(
                format!("command failed: {}\noutput: {}", output.status, combined),
                output.status.to_string(),
            )
            .with_output("output", combined));
        }

        Ok(NodeResult::completed("output_success")
            .with_log(format!(
                "command executed successfully, output length: {}",
                combined.len()
            ))
            .with_output("output", combined.trim().to_string()))
    }
}
