// repairdesk_server/src/services/messaging.rs

use super::error_chain;
use crate::config::MessagingConfig;
use async_trait::async_trait;
use repairdesk::notify::{Messenger, NotifyError};
use reqwest::Client;
use serde::Serialize;
use tracing::{info, instrument};

#[derive(Debug, Serialize)]
struct TextBody<'a> {
  body: &'a str,
}

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
  from: &'a str,
  to: &'a str,
  #[serde(rename = "type")]
  kind: &'static str,
  text: TextBody<'a>,
}

/// Sends plain-text messages through a chat provider's `POST /messages` endpoint.
pub struct HttpMessenger {
  client: Client,
  config: MessagingConfig,
}

impl HttpMessenger {
  pub fn new(client: Client, config: MessagingConfig) -> Self {
    Self { client, config }
  }
}

#[async_trait]
impl Messenger for HttpMessenger {
  #[instrument(name = "messaging::send_text", skip(self, body))]
  async fn send_text(&self, recipient: &str, body: &str) -> Result<(), NotifyError> {
    let message = OutboundMessage {
      from: &self.config.sender_id,
      to: recipient,
      kind: "text",
      text: TextBody { body },
    };
    let response = self
      .client
      .post(format!("{}/messages", self.config.api_url.trim_end_matches('/')))
      .bearer_auth(&self.config.api_token)
      .json(&message)
      .send()
      .await
      .map_err(|e| NotifyError::Request(error_chain(&e)))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(NotifyError::Rejected {
        status: status.as_u16(),
        body,
      });
    }
    info!("Message accepted by provider.");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn outbound_message_shape() {
    let message = OutboundMessage {
      from: "desk",
      to: "905551112233",
      kind: "text",
      text: TextBody { body: "hello" },
    };
    assert_eq!(
      serde_json::to_value(&message).unwrap(),
      serde_json::json!({"from": "desk", "to": "905551112233", "type": "text", "text": {"body": "hello"}})
    );
  }
}
