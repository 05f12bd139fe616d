use async_trait::async_trait;
use rillcore::{ExecutionContext, NodeError, NodeExecutor, NodeResult};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Read a local file into the output map.
pub struct FileReadExecutor;

#[derive(Deserialize)]
struct FileReadData {
    #[serde(default)]
    path: String,
}

#[async_trait]
impl NodeExecutor for FileReadExecutor {
    fn type_key(&self) -> &str {
        "file_read"
    }

    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        input: &[u8],
    ) -> Result<NodeResult, NodeError> {
        let data: FileReadData = serde_json::from_slice(input)?;

        if data.path.is_empty() {
            return Err(NodeError::Config("path is required".to_string()));
        }

        let content = match fs::read(&data.path).await {
            Ok(content) => content,
            Err(err) => {
                return Ok(NodeResult::soft_error(
                    format!("failed to read file: {err}"),
                    err.to_string(),
                ));
            }
        };

        let size = content.len();
        Ok(NodeResult::completed("output_success")
            .with_log(format!("read {} bytes from {}", size, data.path))
            .with_output("content", String::from_utf8_lossy(&content).into_owned())
            .with_output("size", size))
    }
}

/// Write a local file, creating parent directories as needed.
pub struct FileWriteExecutor;

#[derive(Deserialize)]
struct FileWriteData {
    #[serde(default)]
    path: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    append: bool,
}

#[async_trait]
impl NodeExecutor for FileWriteExecutor {
    fn type_key(&self) -> &str {
        "file_write"
    }

    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        input: &[u8],
    ) -> Result<NodeResult, NodeError> {
        let data: FileWriteData = serde_json::from_slice(input)?;

        if data.path.is_empty() {
            return Err(NodeError::Config("path is required".to_string()));
        }

        if let Some(parent) = Path::new(&data.path).parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(err) = fs::create_dir_all(parent).await {
                    return Ok(NodeResult::soft_error(
                        format!("failed to create directory: {err}"),
                        err.to_string(),
                    ));
                }
            }
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true);
        if data.append {
            options.append(true);
        } else {
            options.truncate(true);
        }

        let mut file = match options.open(&data.path).await {
            Ok(file) => file,
            Err(err) => {
                return Ok(NodeResult::soft_error(
                    format!("failed to open file: {err}"),
                    err.to_string(),
                ));
            }
        };

        if let Err(err) = file.write_all(data.content.as_bytes()).await {
            return Ok(NodeResult::soft_error(
                format!("failed to write to file: {err}"),
                err.to_string(),
            ));
        }

        let bytes_written = data.content.len();
        Ok(NodeResult::completed("output_success")
            .with_log(format!("wrote {} bytes to {}", bytes_written, data.path))
            .with_output("bytes_written", bytes_written))
    }
}
