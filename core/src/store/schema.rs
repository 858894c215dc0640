// repairdesk/src/store/schema.rs

//! The one place that knows which column holds which field.
//!
//! Rows are fixed-position tuples. Writers and readers both go through
//! [`encode_order`] / [`decode_order`], so a column change is a change to this
//! file only.

use crate::order::{Customer, Device, Order};
use crate::policy::ReturnReason;
use crate::status::normalize;
use crate::store::Row;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
  SequenceId,
  ReceiptCode,
  AccessCode,
  CreatedAt,
  UpdatedAt,
  CustomerName,
  CustomerPhone,
  Address,
  DeviceType,
  SerialNumber,
  Accessories,
  Issue,
  EstimatedCost,
  ExtraCost,
  DiagnosisNote,
  Status,
  ReturnReason,
  DocumentUrl,
}

/// Stored column order.
pub const COLUMNS: [Column; 18] = [
  Column::SequenceId,
  Column::ReceiptCode,
  Column::AccessCode,
  Column::CreatedAt,
  Column::UpdatedAt,
  Column::CustomerName,
  Column::CustomerPhone,
  Column::Address,
  Column::DeviceType,
  Column::SerialNumber,
  Column::Accessories,
  Column::Issue,
  Column::EstimatedCost,
  Column::ExtraCost,
  Column::DiagnosisNote,
  Column::Status,
  Column::ReturnReason,
  Column::DocumentUrl,
];

impl Column {
  /// Variants are declared in [`COLUMNS`] order.
  pub fn index(self) -> usize {
    self as usize
  }

  pub fn header(self) -> &'static str {
    match self {
      Column::SequenceId => "ID",
      Column::ReceiptCode => "Receipt Code",
      Column::AccessCode => "Access Code",
      Column::CreatedAt => "Created At",
      Column::UpdatedAt => "Updated At",
      Column::CustomerName => "Customer Name",
      Column::CustomerPhone => "Customer Phone",
      Column::Address => "Address",
      Column::DeviceType => "Device",
      Column::SerialNumber => "Serial Number",
      Column::Accessories => "Accessories",
      Column::Issue => "Issue",
      Column::EstimatedCost => "Estimated Cost",
      Column::ExtraCost => "Extra Cost",
      Column::DiagnosisNote => "Diagnosis Note",
      Column::Status => "Status",
      Column::ReturnReason => "Return Reason",
      Column::DocumentUrl => "Document URL",
    }
  }

  /// Spreadsheet-style column letter: 0 -> "A", 25 -> "Z", 26 -> "AA".
  pub fn letter(self) -> String {
    column_letter(self.index())
  }
}

pub fn column_letter(index: usize) -> String {
  let mut n = index + 1;
  let mut letters = Vec::new();
  while n > 0 {
    let rem = (n - 1) % 26;
    letters.push(char::from(b'A' + rem as u8));
    n = (n - 1) / 26;
  }
  letters.iter().rev().collect()
}

pub fn header_row() -> Row {
  COLUMNS.iter().map(|c| c.header().to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
  #[error("column '{column}' is empty")]
  Missing { column: &'static str },

  #[error("column '{column}' holds unreadable value '{value}'")]
  Unreadable { column: &'static str, value: String },
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
  ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn format_money(amount: Option<Decimal>) -> String {
  amount.map(|a| a.normalize().to_string()).unwrap_or_default()
}

pub fn encode_order(order: &Order) -> Row {
  COLUMNS
    .iter()
    .map(|column| match column {
      Column::SequenceId => order.sequence_id.clone(),
      Column::ReceiptCode => order.receipt_code.clone(),
      Column::AccessCode => order.access_code.clone(),
      Column::CreatedAt => format_timestamp(order.created_at),
      Column::UpdatedAt => format_timestamp(order.updated_at),
      Column::CustomerName => order.customer.name.clone(),
      Column::CustomerPhone => order.customer.phone.clone(),
      Column::Address => order.customer.address.clone(),
      Column::DeviceType => order.device.device_type.clone(),
      Column::SerialNumber => order.device.serial_number.clone().unwrap_or_default(),
      Column::Accessories => order.device.accessories.join(", "),
      Column::Issue => order.device.issue.clone(),
      Column::EstimatedCost => format_money(order.estimated_cost),
      Column::ExtraCost => format_money(order.extra_cost),
      Column::DiagnosisNote => order.diagnosis_note.clone().unwrap_or_default(),
      Column::Status => order.status.as_str().to_string(),
      Column::ReturnReason => order.return_reason.map(|r| r.as_str().to_string()).unwrap_or_default(),
      Column::DocumentUrl => order.document_url.clone().unwrap_or_default(),
    })
    .collect()
}

/// Reads one cell. Row stores drop trailing empty cells, so a short row reads
/// as empty strings.
pub fn cell(row: &Row, column: Column) -> &str {
  row.get(column.index()).map(|s| s.trim()).unwrap_or("")
}

fn optional(row: &Row, column: Column) -> Option<String> {
  let value = cell(row, column);
  (!value.is_empty()).then(|| value.to_string())
}

fn required(row: &Row, column: Column) -> Result<String, SchemaError> {
  optional(row, column).ok_or(SchemaError::Missing {
    column: column.header(),
  })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(raw)
    .map(|ts| ts.with_timezone(&Utc))
    .ok()
    .or_else(|| {
      NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%d.%m.%Y %H:%M:%S"))
        .map(|naive| naive.and_utc())
        .ok()
    })
}

fn timestamp(row: &Row, column: Column) -> Result<Option<DateTime<Utc>>, SchemaError> {
  match optional(row, column) {
    None => Ok(None),
    Some(raw) => parse_timestamp(&raw).map(Some).ok_or(SchemaError::Unreadable {
      column: column.header(),
      value: raw,
    }),
  }
}

/// Accepts `1500`, `1500.50`, `1500,50`, `1.500 TL` style amounts.
fn money(row: &Row, column: Column) -> Result<Option<Decimal>, SchemaError> {
  let Some(raw) = optional(row, column) else {
    return Ok(None);
  };
  let cleaned: String = raw
    .chars()
    .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
    .collect();
  let candidate = match (cleaned.contains('.'), cleaned.contains(',')) {
    (false, true) => cleaned.replace(',', "."),
    (true, true) => cleaned.replace('.', "").replace(',', "."),
    _ => cleaned,
  };
  Decimal::from_str(&candidate)
    .map(Some)
    .map_err(|_| SchemaError::Unreadable {
      column: column.header(),
      value: raw,
    })
}

/// Decodes a stored row. The status cell goes through [`normalize`], which is
/// where legacy free-text statuses become canonical.
pub fn decode_order(row: &Row) -> Result<Order, SchemaError> {
  let created_at = timestamp(row, Column::CreatedAt)?.ok_or(SchemaError::Missing {
    column: Column::CreatedAt.header(),
  })?;
  let updated_at = timestamp(row, Column::UpdatedAt)?.unwrap_or(created_at).max(created_at);

  let return_reason = optional(row, Column::ReturnReason).map(|raw| {
    ReturnReason::from_str(&raw).unwrap_or_else(|_| {
      warn!(value = %raw, "Unrecognized return reason in store, reading as 'other'.");
      ReturnReason::Other
    })
  });

  Ok(Order {
    sequence_id: required(row, Column::SequenceId)?,
    receipt_code: required(row, Column::ReceiptCode)?,
    access_code: cell(row, Column::AccessCode).to_string(),
    customer: Customer {
      name: cell(row, Column::CustomerName).to_string(),
      phone: cell(row, Column::CustomerPhone).to_string(),
      address: cell(row, Column::Address).to_string(),
    },
    device: Device {
      device_type: cell(row, Column::DeviceType).to_string(),
      serial_number: optional(row, Column::SerialNumber),
      accessories: cell(row, Column::Accessories)
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect(),
      issue: cell(row, Column::Issue).to_string(),
    },
    estimated_cost: money(row, Column::EstimatedCost)?,
    extra_cost: money(row, Column::ExtraCost)?,
    diagnosis_note: optional(row, Column::DiagnosisNote),
    status: normalize(cell(row, Column::Status)),
    return_reason,
    document_url: optional(row, Column::DocumentUrl),
    created_at,
    updated_at,
  })
}
