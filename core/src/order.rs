// repairdesk/src/order.rs

//! Keyed order records. Column positions exist only in [`crate::store::schema`].

use crate::policy::ReturnReason;
use crate::status::Status;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredAddress {
  pub region: Option<String>,
  pub district: Option<String>,
  pub neighborhood: Option<String>,
  pub street: Option<String>,
  pub building: Option<String>,
  pub unit: Option<String>,
}

/// Intake accepts either a single free-text line or the structured parts.
/// Either way the stored form is one formatted line (see [`AddressFormatter`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Address {
  Structured(StructuredAddress),
  FreeText(String),
}

impl Default for Address {
  fn default() -> Self {
    Address::FreeText(String::new())
  }
}

/// Turns an intake address into the single line that is stored and printed.
pub trait AddressFormatter: Send + Sync {
  fn format(&self, address: &Address) -> String;
}

/// Joins the non-empty structured parts, most specific last:
/// `"Kadıköy, Moda Mah., Bahariye Cd., No 12, D 4, İstanbul"`.
#[derive(Debug, Clone, Default)]
pub struct CommaAddressFormatter;

impl AddressFormatter for CommaAddressFormatter {
  fn format(&self, address: &Address) -> String {
    match address {
      Address::FreeText(text) => text.split_whitespace().collect::<Vec<_>>().join(" "),
      Address::Structured(parts) => {
        let present = |part: &Option<String>| {
          part
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
        };
        [
          present(&parts.district),
          present(&parts.neighborhood),
          present(&parts.street),
          present(&parts.building).map(|b| format!("No {}", b)),
          present(&parts.unit).map(|u| format!("D {}", u)),
          present(&parts.region),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ")
      }
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
  pub name: String,
  pub phone: String,
  pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
  pub device_type: String,
  pub serial_number: Option<String>,
  pub accessories: Vec<String>,
  pub issue: String,
}

/// Input to order creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrder {
  pub customer_name: String,
  pub customer_phone: String,
  #[serde(default)]
  pub address: Address,
  pub device_type: String,
  #[serde(default)]
  pub serial_number: Option<String>,
  #[serde(default)]
  pub accessories: Vec<String>,
  pub issue: String,
  #[serde(default)]
  pub estimated_cost: Option<Decimal>,
}

impl NewOrder {
  /// Names of required fields that are missing or blank.
  pub fn missing_fields(&self) -> Vec<&'static str> {
    [
      ("customer_name", &self.customer_name),
      ("customer_phone", &self.customer_phone),
      ("device_type", &self.device_type),
      ("issue", &self.issue),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect()
  }
}

/// The in-memory projection of one stored row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
  pub sequence_id: String,
  pub receipt_code: String,
  pub access_code: String,
  pub customer: Customer,
  pub device: Device,
  pub estimated_cost: Option<Decimal>,
  pub extra_cost: Option<Decimal>,
  pub diagnosis_note: Option<String>,
  pub status: Status,
  pub return_reason: Option<ReturnReason>,
  pub document_url: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Extra fields persisted together with a forced status change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionMetadata {
  #[serde(default)]
  pub diagnosis_note: Option<String>,
  #[serde(default)]
  pub extra_cost: Option<Decimal>,
  #[serde(default)]
  pub return_reason: Option<ReturnReason>,
}

impl TransitionMetadata {
  pub fn with_reason(reason: ReturnReason) -> Self {
    Self {
      return_reason: Some(reason),
      ..Self::default()
    }
  }
}

/// What a customer sees when tracking with receipt code + access code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackingView {
  pub receipt_code: String,
  pub device_type: String,
  pub status: Status,
  pub status_label: &'static str,
  pub estimated_cost: Option<Decimal>,
  pub extra_cost: Option<Decimal>,
  pub diagnosis_note: Option<String>,
  pub return_reason: Option<ReturnReason>,
  pub document_url: Option<String>,
  pub updated_at: DateTime<Utc>,
}

impl From<&Order> for TrackingView {
  fn from(order: &Order) -> Self {
    Self {
      receipt_code: order.receipt_code.clone(),
      device_type: order.device.device_type.clone(),
      status: order.status,
      status_label: order.status.label(),
      estimated_cost: order.estimated_cost,
      extra_cost: order.extra_cost,
      diagnosis_note: order.diagnosis_note.clone(),
      return_reason: order.return_reason,
      document_url: order.document_url.clone(),
      updated_at: order.updated_at,
    }
  }
}
