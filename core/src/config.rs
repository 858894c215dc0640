// repairdesk/src/config.rs

use std::time::Duration;

/// Retry policy for document uploads: `max_attempts` tries in total, sleeping
/// `attempt * backoff_step` after each transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub backoff_step: Duration,
}

impl RetryPolicy {
  pub fn delay_after(&self, attempt: u32) -> Duration {
    self.backoff_step * attempt
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      backoff_step: Duration::from_millis(500),
    }
  }
}

#[derive(Debug, Clone)]
pub struct DeskConfig {
  /// First segment of receipt codes, `SRV` in `SRV-2026-04817`.
  pub receipt_prefix: String,
  /// Upper bound on receipt-code samples before creation fails.
  pub max_receipt_code_attempts: u32,
  pub upload_retry: RetryPolicy,
  /// Customer tracking endpoint; links carry `?code=<receipt>&access=<access>`.
  pub tracking_base_url: String,
  /// Printed at the top of receipts and used in notifications.
  pub business_name: String,
}

impl Default for DeskConfig {
  fn default() -> Self {
    Self {
      receipt_prefix: "SRV".to_string(),
      max_receipt_code_attempts: 20,
      upload_retry: RetryPolicy::default(),
      tracking_base_url: "http://localhost:8080/track".to_string(),
      business_name: "Repair Desk".to_string(),
    }
  }
}

impl DeskConfig {
  /// The link a customer follows to see their order. It carries both codes,
  /// since tracking answers only when they match the same order.
  pub fn tracking_link(&self, receipt_code: &str, access_code: &str) -> String {
    format!(
      "{}?code={}&access={}",
      self.tracking_base_url.trim_end_matches('/'),
      receipt_code,
      access_code
    )
  }
}
