// repairdesk/src/codes.rs

//! Sequence ids, receipt codes and access codes.

use crate::error::{DeskError, DeskResult};
use crate::store::OrderStore;
use chrono::{Datelike, Utc};
use rand::Rng;
use tracing::{debug, instrument};

const RECEIPT_SUFFIX_RANGE: std::ops::Range<u32> = 10_000..100_000;
const ACCESS_CODE_RANGE: std::ops::Range<u32> = 100_000..1_000_000;

/// Identifiers handed out for one new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifiers {
  pub sequence_id: String,
  pub receipt_code: String,
  pub access_code: String,
}

#[derive(Debug, Clone)]
pub struct CodeGenerator {
  prefix: String,
  max_attempts: u32,
}

impl CodeGenerator {
  pub fn new(prefix: impl Into<String>, max_attempts: u32) -> Self {
    Self {
      prefix: prefix.into(),
      max_attempts: max_attempts.max(1),
    }
  }

  pub fn compose_receipt_code(&self, year: i32, suffix: u32) -> String {
    format!("{}-{}-{:05}", self.prefix, year, suffix)
  }

  /// Next id after the highest numeric id in the store. Not race-free on its
  /// own; callers hold the desk's write gate until the row is appended.
  pub async fn next_sequence_id(&self, store: &OrderStore) -> DeskResult<String> {
    let max = store.max_sequence_id().await?;
    let next = max.checked_add(1).ok_or(DeskError::SequenceIdOverflow { max })?;
    Ok(next.to_string())
  }

  /// Samples receipt codes until one is free, up to `max_attempts` lookups.
  #[instrument(name = "codes::receipt_code", skip_all)]
  pub async fn unique_receipt_code(&self, store: &OrderStore) -> DeskResult<String> {
    let year = Utc::now().year();
    for attempt in 1..=self.max_attempts {
      let suffix = rand::thread_rng().gen_range(RECEIPT_SUFFIX_RANGE);
      let code = self.compose_receipt_code(year, suffix);
      if !store.receipt_code_exists(&code).await? {
        return Ok(code);
      }
      debug!(attempt, %code, "Receipt code collision, sampling again.");
    }
    Err(DeskError::CodeSpaceExhausted {
      attempts: self.max_attempts,
    })
  }

  /// Uniform 6-digit number. Not checked for uniqueness.
  pub fn access_code(&self) -> String {
    rand::thread_rng().gen_range(ACCESS_CODE_RANGE).to_string()
  }

  pub async fn generate(&self, store: &OrderStore) -> DeskResult<Identifiers> {
    Ok(Identifiers {
      sequence_id: self.next_sequence_id(store).await?,
      receipt_code: self.unique_receipt_code(store).await?,
      access_code: self.access_code(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::schema::{Column, COLUMNS};
  use crate::store::MemoryRowStore;
  use std::sync::Arc;

  fn store_with_ids(ids: &[&str]) -> OrderStore {
    let rows = ids
      .iter()
      .map(|id| {
        let mut row = vec![String::new(); COLUMNS.len()];
        row[Column::SequenceId.index()] = id.to_string();
        row
      })
      .collect();
    OrderStore::new(Arc::new(MemoryRowStore::with_rows(rows)))
  }

  #[tokio::test]
  async fn next_sequence_id_follows_the_highest_numeric_id() {
    let generator = CodeGenerator::new("SRV", 5);
    let store = store_with_ids(&["3", "legacy", "9"]);
    assert_eq!(generator.next_sequence_id(&store).await.unwrap(), "10");
  }

  #[tokio::test]
  async fn next_sequence_id_refuses_to_overflow() {
    let generator = CodeGenerator::new("SRV", 5);
    let store = store_with_ids(&["1", &u64::MAX.to_string()]);
    let err = generator.next_sequence_id(&store).await.unwrap_err();
    assert!(matches!(err, DeskError::SequenceIdOverflow { max } if max == u64::MAX));
  }

  #[test]
  fn receipt_code_shape() {
    let generator = CodeGenerator::new("SRV", 5);
    assert_eq!(generator.compose_receipt_code(2026, 42), "SRV-2026-00042");
    assert_eq!(generator.compose_receipt_code(2026, 98765), "SRV-2026-98765");
  }

  #[test]
  fn access_codes_are_six_digits() {
    let generator = CodeGenerator::new("SRV", 5);
    for _ in 0..200 {
      let code = generator.access_code();
      assert_eq!(code.len(), 6);
      assert!(code.chars().all(|c| c.is_ascii_digit()));
    }
  }
}
