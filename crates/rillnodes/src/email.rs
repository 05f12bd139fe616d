use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use rillcore::{ExecutionContext, NodeError, NodeExecutor, NodeResult};
use serde::Deserialize;

/// Send an email over SMTP.
pub struct EmailSmtpExecutor;

#[derive(Deserialize)]
struct EmailData {
    #[serde(default)]
    host: String,
    #[serde(default)]
    port: u16,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: Vec<String>,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    body: String,
}

#[async_trait]
impl NodeExecutor for EmailSmtpExecutor {
    fn type_key(&self) -> &str {
        "email_smtp"
    }

    async fn execute(
        &self,
        ctx: &ExecutionContext,
        input: &[u8],
    ) -> Result<NodeResult, NodeError> {
        let data: EmailData = serde_json::from_slice(input)?;

        let from: Mailbox = data
            .from
            .parse()
            .map_err(|_| NodeError::Config(format!("invalid from address: {}", data.from)))?;

        let mut builder = Message::builder().from(from).subject(data.subject.as_str());
        for recipient in &data.to {
            let to: Mailbox = recipient
                .parse()
                .map_err(|_| NodeError::Config(format!("invalid recipient: {recipient}")))?;
            builder = builder.to(to);
        }

        // An unbuildable message (e.g. no recipients) is an operational
        // failure, not malformed configuration
        let message = match builder.body(data.body.clone()) {
            Ok(message) => message,
            Err(err) => {
                return Ok(NodeResult::soft_error(
                    format!("failed to build message: {err}"),
                    err.to_string(),
                ));
            }
        };

        let port = if data.port == 0 { 25 } else { data.port };
        let mut transport =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(data.host.as_str()).port(port);
        if !data.username.is_empty() {
            transport = transport
                .credentials(Credentials::new(data.username.clone(), data.password.clone()));
        }
        let mailer = transport.build();

        let sent = tokio::select! {
            sent = mailer.send(message) => sent,
            _ = ctx.cancellation.cancelled() => return Err(NodeError::Cancelled),
        };

        match sent {
            Ok(_) => Ok(NodeResult::completed("output_success")
                .with_log(format!("email sent to {:?}", data.to))
                .with_output("sent", true)),
            Err(err) => Ok(NodeResult::soft_error(
                format!("failed to send email: {err}"),
                err.to_string(),
            )),
        }
    }
}
