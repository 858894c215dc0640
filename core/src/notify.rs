// repairdesk/src/notify.rs

//! Outbound customer messages. Failures here never undo an order.

use crate::order::Order;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum NotifyError {
  #[error("Recipient is empty")]
  NoRecipient,

  #[error("Messaging request failed: {0}")]
  Request(String),

  #[error("Messaging provider rejected the message (status {status}): {body}")]
  Rejected { status: u16, body: String },
}

#[async_trait]
pub trait Messenger: Send + Sync {
  async fn send_text(&self, recipient: &str, body: &str) -> Result<(), NotifyError>;
}

/// Composes order messages and hands them to a [`Messenger`].
#[derive(Clone)]
pub struct Notifier {
  messenger: Arc<dyn Messenger>,
  business_name: String,
}

impl std::fmt::Debug for Notifier {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Notifier")
      .field("business_name", &self.business_name)
      .finish_non_exhaustive()
  }
}

impl Notifier {
  pub fn new(messenger: Arc<dyn Messenger>, business_name: impl Into<String>) -> Self {
    Self {
      messenger,
      business_name: business_name.into(),
    }
  }

  pub fn creation_message(&self, order: &Order, tracking_link: &str) -> String {
    format!(
      "{}: your {} has been registered. Receipt code: {}. Access code: {}. Track your repair at {}",
      self.business_name, order.device.device_type, order.receipt_code, order.access_code, tracking_link
    )
  }

  /// Sends `message` to `recipient`. Whitespace in phone numbers is dropped.
  #[instrument(name = "notify::send", skip(self, message))]
  pub async fn notify(&self, recipient: &str, message: &str) -> Result<(), NotifyError> {
    let recipient: String = recipient.chars().filter(|c| !c.is_whitespace()).collect();
    if recipient.is_empty() {
      return Err(NotifyError::NoRecipient);
    }
    self.messenger.send_text(&recipient, message).await
  }
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogMessenger;

#[async_trait]
impl Messenger for LogMessenger {
  async fn send_text(&self, recipient: &str, body: &str) -> Result<(), NotifyError> {
    info!(%recipient, %body, "Outbound message (not sent, no messaging backend configured).");
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
  pub recipient: String,
  pub body: String,
}

/// Records messages in memory; failures can be queued with [`MemoryMessenger::fail_next`].
#[derive(Debug, Default)]
pub struct MemoryMessenger {
  sent: Mutex<Vec<SentMessage>>,
  failures: Mutex<VecDeque<NotifyError>>,
}

impl MemoryMessenger {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn fail_next(&self, error: NotifyError) {
    self.failures.lock().push_back(error);
  }

  pub fn sent(&self) -> Vec<SentMessage> {
    self.sent.lock().clone()
  }
}

#[async_trait]
impl Messenger for MemoryMessenger {
  async fn send_text(&self, recipient: &str, body: &str) -> Result<(), NotifyError> {
    if let Some(error) = self.failures.lock().pop_front() {
      return Err(error);
    }
    self.sent.lock().push(SentMessage {
      recipient: recipient.to_string(),
      body: body.to_string(),
    });
    Ok(())
  }
}
