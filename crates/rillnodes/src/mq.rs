use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Connection, ConnectionProperties};
use rillcore::{ExecutionContext, NodeError, NodeExecutor, NodeResult};
use serde::Deserialize;

/// Publish a message to a RabbitMQ broker.
pub struct RabbitmqPublishExecutor;

#[derive(Deserialize)]
struct RabbitmqData {
    #[serde(default)]
    url: String,
    #[serde(default)]
    queue: String,
    #[serde(default)]
    exchange: String,
    #[serde(default)]
    routing_key: String,
    #[serde(default)]
    message: String,
}

#[async_trait]
impl NodeExecutor for RabbitmqPublishExecutor {
    fn type_key(&self) -> &str {
        "mq_rabbitmq_publish"
    }

    async fn execute(
        &self,
        ctx: &ExecutionContext,
        input: &[u8],
    ) -> Result<NodeResult, NodeError> {
        let data: RabbitmqData = serde_json::from_slice(input)?;

        let publish = async {
            let connection =
                match Connection::connect(&data.url, ConnectionProperties::default()).await {
                    Ok(connection) => connection,
                    Err(err) => {
                        return Ok(NodeResult::soft_error(
                            format!("failed to connect to broker: {err}"),
                            err.to_string(),
                        ));
                    }
                };

            let outcome = async {
                let channel = connection.create_channel().await?;
                if !data.queue.is_empty() {
                    channel
                        .queue_declare(
                            &data.queue,
                            QueueDeclareOptions::default(),
                            FieldTable::default(),
                        )
                        .await?;
                }

                let routing_key = if data.routing_key.is_empty() {
                    &data.queue
                } else {
                    &data.routing_key
                };

                channel
                    .basic_publish(
                        &data.exchange,
                        routing_key,
                        BasicPublishOptions::default(),
                        data.message.as_bytes(),
                        BasicProperties::default(),
                    )
                    .await?
                    .await?;
                Ok::<_, lapin::Error>(())
            }
            .await;

            let _ = connection.close(0, "").await;

            match outcome {
                Ok(()) => Ok(NodeResult::completed("output_success")
                    .with_log(format!(
                        "published message to exchange '{}' queue '{}'",
                        data.exchange, data.queue
                    ))
                    .with_output("published", true)),
                Err(err) => Ok(NodeResult::soft_error(
                    format!("failed to publish message: {err}"),
                    err.to_string(),
                )),
            }
        };

        tokio::select! {
            result = publish => result,
            _ = ctx.cancellation.cancelled() => Err(NodeError::Cancelled),
        }
    }
}
