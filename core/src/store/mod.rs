// repairdesk/src/store/mod.rs

//! The row-store boundary.
//!
//! [`RowStore`] is the raw, position-addressed table (a spreadsheet, in
//! production). [`OrderStore`] sits on top of it and is the only thing the rest
//! of the crate talks to: it speaks [`Order`] and hides column positions.

pub mod memory;
pub mod schema;

use crate::order::{Order, TransitionMetadata};
use crate::status::Status;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use schema::{decode_order, encode_order, format_money, format_timestamp, Column};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

pub use memory::MemoryRowStore;

/// One stored row, cell values in column order. Trailing empty cells may be absent.
pub type Row = Vec<String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
  pub column: Column,
  pub value: String,
}

impl CellUpdate {
  pub fn new(column: Column, value: impl Into<String>) -> Self {
    Self {
      column,
      value: value.into(),
    }
  }
}

/// How [`RowStore::find_by_key`] compares a cell to the wanted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMatch {
  Exact,
  /// `"7"`, `"07"` and `"7.0"` all match `7`.
  NumericCoerced,
}

impl KeyMatch {
  pub fn matches(self, cell: &str, wanted: &str) -> bool {
    let (cell, wanted) = (cell.trim(), wanted.trim());
    if cell == wanted {
      return true;
    }
    match self {
      KeyMatch::Exact => false,
      KeyMatch::NumericCoerced => match (cell.parse::<f64>(), wanted.parse::<f64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
      },
    }
  }
}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("Row store request failed: {0}")]
  Request(#[source] anyhow::Error),

  #[error("Row store rejected the request (status {status}): {message}")]
  Rejected { status: u16, message: String },

  #[error("Row {index} does not exist")]
  RowOutOfRange { index: usize },

  #[error("Unexpected row store response: {0}")]
  InvalidResponse(String),
}

/// Position-addressed, append-only table. Rows are indexed from 0, header excluded.
#[async_trait]
pub trait RowStore: Send + Sync {
  /// Appends a row and returns its index.
  async fn append(&self, row: Row) -> Result<usize, StoreError>;

  /// Every data row, header excluded.
  async fn scan_all(&self) -> Result<Vec<Row>, StoreError>;

  async fn read_row(&self, index: usize) -> Result<Option<Row>, StoreError>;

  /// Writes all `updates` to one row in a single call.
  async fn update_cells(&self, index: usize, updates: &[CellUpdate]) -> Result<(), StoreError>;

  /// Linear scan for the first row whose `column` matches `value`.
  async fn find_by_key(
    &self,
    column: Column,
    value: &str,
    mode: KeyMatch,
  ) -> Result<Option<(usize, Row)>, StoreError> {
    let rows = self.scan_all().await?;
    Ok(
      rows
        .into_iter()
        .enumerate()
        .find(|(_, row)| mode.matches(schema::cell(row, column), value)),
    )
  }
}

/// An order together with where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredOrder {
  pub row_index: usize,
  pub order: Order,
}

/// Result of a guarded status write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
  Written(StoredOrder),
  /// The row changed since it was read; nothing was written.
  Stale { current: Option<StoredOrder> },
}

#[derive(Clone)]
pub struct OrderStore {
  rows: Arc<dyn RowStore>,
}

impl std::fmt::Debug for OrderStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OrderStore").finish_non_exhaustive()
  }
}

impl OrderStore {
  pub fn new(rows: Arc<dyn RowStore>) -> Self {
    Self { rows }
  }

  pub fn rows(&self) -> &Arc<dyn RowStore> {
    &self.rows
  }

  #[instrument(name = "store::append_order", skip_all, fields(receipt_code = %order.receipt_code))]
  pub async fn append_order(&self, order: &Order) -> Result<StoredOrder, StoreError> {
    let row_index = self.rows.append(encode_order(order)).await?;
    debug!(row_index, "Order row appended.");
    Ok(StoredOrder {
      row_index,
      order: order.clone(),
    })
  }

  /// Every readable order. Rows that fail to decode are logged and skipped.
  pub async fn scan_orders(&self) -> Result<Vec<StoredOrder>, StoreError> {
    let rows = self.rows.scan_all().await?;
    Ok(
      rows
        .iter()
        .enumerate()
        .filter_map(|(row_index, row)| decode_at(row_index, row))
        .collect(),
    )
  }

  /// First readable row whose `column` matches. Matching rows that fail to
  /// decode are skipped, so a later valid row with the same key is still found.
  async fn find(&self, column: Column, value: &str, mode: KeyMatch) -> Result<Option<StoredOrder>, StoreError> {
    let rows = self.rows.scan_all().await?;
    Ok(
      rows
        .iter()
        .enumerate()
        .filter(|(_, row)| mode.matches(schema::cell(row, column), value))
        .find_map(|(row_index, row)| decode_at(row_index, row)),
    )
  }

  pub async fn find_by_sequence_id(&self, id: &str) -> Result<Option<StoredOrder>, StoreError> {
    self.find(Column::SequenceId, id, KeyMatch::NumericCoerced).await
  }

  pub async fn find_by_receipt_code(&self, code: &str) -> Result<Option<StoredOrder>, StoreError> {
    self.find(Column::ReceiptCode, code, KeyMatch::Exact).await
  }

  /// First order carrying `code`. Access codes are not unique; callers pair
  /// this with a receipt code.
  pub async fn find_by_access_code(&self, code: &str) -> Result<Option<StoredOrder>, StoreError> {
    self.find(Column::AccessCode, code, KeyMatch::Exact).await
  }

  pub async fn receipt_code_exists(&self, code: &str) -> Result<bool, StoreError> {
    Ok(
      self
        .rows
        .find_by_key(Column::ReceiptCode, code, KeyMatch::Exact)
        .await?
        .is_some(),
    )
  }

  /// Highest numeric sequence id, falling back to the row count when no id is numeric.
  pub async fn max_sequence_id(&self) -> Result<u64, StoreError> {
    let rows = self.rows.scan_all().await?;
    let max = rows
      .iter()
      .filter_map(|row| schema::cell(row, Column::SequenceId).parse::<u64>().ok())
      .max();
    Ok(max.unwrap_or(rows.len() as u64))
  }

  /// Re-reads `seen`'s row and writes the new status only if the row is still
  /// the one the caller read (same id, same `updated_at`). Status, timestamp and
  /// metadata go out in one update call. The new `updated_at` is never earlier
  /// than the old one plus a millisecond.
  #[instrument(
    name = "store::write_status",
    skip_all,
    fields(sequence_id = %seen.order.sequence_id, to = %status)
  )]
  pub async fn write_status(
    &self,
    seen: &StoredOrder,
    status: Status,
    metadata: &TransitionMetadata,
    now: DateTime<Utc>,
  ) -> Result<WriteOutcome, StoreError> {
    let current = self
      .rows
      .read_row(seen.row_index)
      .await?
      .and_then(|row| decode_at(seen.row_index, &row));

    let unchanged = current.as_ref().is_some_and(|c| {
      c.order.sequence_id == seen.order.sequence_id && c.order.updated_at == seen.order.updated_at
    });
    if !unchanged {
      warn!("Row changed since it was read, refusing status write.");
      return Ok(WriteOutcome::Stale { current });
    }

    // `updated_at` is the concurrency token, so it must move on every write.
    let updated_at = now.max(seen.order.updated_at + Duration::milliseconds(1));
    let mut updates = vec![
      CellUpdate::new(Column::Status, status.as_str()),
      CellUpdate::new(Column::UpdatedAt, format_timestamp(updated_at)),
    ];
    if let Some(note) = &metadata.diagnosis_note {
      updates.push(CellUpdate::new(Column::DiagnosisNote, note.clone()));
    }
    if metadata.extra_cost.is_some() {
      updates.push(CellUpdate::new(Column::ExtraCost, format_money(metadata.extra_cost)));
    }
    if let Some(reason) = metadata.return_reason {
      updates.push(CellUpdate::new(Column::ReturnReason, reason.as_str()));
    }
    self.rows.update_cells(seen.row_index, &updates).await?;

    let mut order = seen.order.clone();
    order.status = status;
    order.updated_at = updated_at;
    if metadata.diagnosis_note.is_some() {
      order.diagnosis_note = metadata.diagnosis_note.clone();
    }
    if metadata.extra_cost.is_some() {
      order.extra_cost = metadata.extra_cost;
    }
    if metadata.return_reason.is_some() {
      order.return_reason = metadata.return_reason;
    }
    Ok(WriteOutcome::Written(StoredOrder {
      row_index: seen.row_index,
      order,
    }))
  }

  pub async fn set_document_url(&self, row_index: usize, url: &str) -> Result<(), StoreError> {
    self
      .rows
      .update_cells(row_index, &[CellUpdate::new(Column::DocumentUrl, url)])
      .await
  }
}

fn decode_at(row_index: usize, row: &Row) -> Option<StoredOrder> {
  match decode_order(row) {
    Ok(order) => Some(StoredOrder { row_index, order }),
    Err(e) => {
      warn!(row_index, error = %e, "Skipping unreadable order row.");
      None
    }
  }
}
