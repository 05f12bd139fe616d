use async_trait::async_trait;
use rillcore::{ExecutionContext, NodeError, NodeExecutor, NodeResult};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Perform an HTTP call.
///
/// Any network-level response is a success, whatever its status code;
/// only transport failures take the error branch.
pub struct HttpRequestExecutor {
    client: reqwest::Client,
}

impl HttpRequestExecutor {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpRequestExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct HttpData {
    #[serde(default)]
    url: String,
    #[serde(default)]
    method: String,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    body: Option<Value>,
}

#[async_trait]
impl NodeExecutor for HttpRequestExecutor {
    fn type_key(&self) -> &str {
        "http_request"
    }

    async fn execute(
        &self,
        ctx: &ExecutionContext,
        input: &[u8],
    ) -> Result<NodeResult, NodeError> {
        let data: HttpData = serde_json::from_slice(input)?;

        if data.url.is_empty() {
            return Err(NodeError::Config("url is required".to_string()));
        }

        let method = if data.method.is_empty() {
            reqwest::Method::GET
        } else {
            reqwest::Method::from_bytes(data.method.to_uppercase().as_bytes())
                .map_err(|_| NodeError::Config(format!("invalid method: {}", data.method)))?
        };

        let mut request = self.client.request(method, &data.url);
        let mut has_content_type = false;
        for (key, value) in &data.headers {
            if key.eq_ignore_ascii_case("content-type") {
                has_content_type = true;
            }
            request = request.header(key, value);
        }

        if let Some(body) = &data.body {
            let bytes = serde_json::to_vec(body)?;
            if !has_content_type {
                request = request.header(reqwest::header::CONTENT_TYPE, "application/json");
            }
            request = request.body(bytes);
        }

        let response = tokio::select! {
            response = request.send() => response,
            _ = ctx.cancellation.cancelled() => return Err(NodeError::Cancelled),
        };

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                return Ok(NodeResult::soft_error(
                    format!("request failed: {err}"),
                    err.to_string(),
                ));
            }
        };

        let status = response.status().as_u16();
        let headers: Map<String, Value> = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.to_string(),
                    Value::String(v.to_str().unwrap_or_default().to_string()),
                )
            })
            .collect();

        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                return Ok(NodeResult::soft_error(
                    format!("failed to read response: {err}"),
                    err.to_string(),
                ));
            }
        };

        // Parse the body as JSON when possible, keep the raw text otherwise
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(NodeResult::completed("output_success")
            .with_log(format!(
                "request to {} completed with status {}",
                data.url, status
            ))
            .with_output("status", status)
            .with_output("body", body)
            .with_output("headers", Value::Object(headers)))
    }
}

/// Post a message to a Slack-compatible incoming webhook.
pub struct SlackExecutor {
    client: reqwest::Client,
}

impl SlackExecutor {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for SlackExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct SlackData {
    #[serde(default)]
    webhook_url: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    channel: String,
}

#[async_trait]
impl NodeExecutor for SlackExecutor {
    fn type_key(&self) -> &str {
        "slack"
    }

    async fn execute(
        &self,
        ctx: &ExecutionContext,
        input: &[u8],
    ) -> Result<NodeResult, NodeError> {
        let data: SlackData = serde_json::from_slice(input)?;

        if data.webhook_url.is_empty() {
            return Err(NodeError::Config("webhook_url is required".to_string()));
        }

        let mut payload = json!({ "text": data.message });
        if !data.channel.is_empty() {
            payload["channel"] = Value::String(data.channel.clone());
        }

        let response = tokio::select! {
            response = self.client.post(&data.webhook_url).json(&payload).send() => response,
            _ = ctx.cancellation.cancelled() => return Err(NodeError::Cancelled),
        };

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                return Ok(NodeResult::soft_error(
                    format!("failed to send slack message: {err}"),
                    err.to_string(),
                ));
            }
        };

        let status = response.status().as_u16();
        if status >= 400 {
            return Ok(NodeResult::soft_error(
                format!("slack webhook returned status {status}"),
                format!("slack webhook returned status {status}"),
            )
            .with_output("status", status));
        }

        Ok(NodeResult::completed("output_success")
            .with_log("slack message sent")
            .with_output("sent", true))
    }
}
