// repairdesk/src/store/memory.rs

use super::{CellUpdate, Row, RowStore, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Process-local [`RowStore`]. Used by tests, benches and the server when no
/// remote store is configured.
#[derive(Debug, Default)]
pub struct MemoryRowStore {
  rows: Mutex<Vec<Row>>,
  writes: AtomicUsize,
}

impl MemoryRowStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Seeds the table with pre-existing rows, e.g. legacy data.
  pub fn with_rows(rows: Vec<Row>) -> Self {
    Self {
      rows: Mutex::new(rows),
      writes: AtomicUsize::new(0),
    }
  }

  /// Number of append and update calls served so far.
  pub fn write_count(&self) -> usize {
    self.writes.load(Ordering::SeqCst)
  }

  pub fn len(&self) -> usize {
    self.rows.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn snapshot(&self) -> Vec<Row> {
    self.rows.lock().clone()
  }
}

#[async_trait]
impl RowStore for MemoryRowStore {
  async fn append(&self, row: Row) -> Result<usize, StoreError> {
    let mut rows = self.rows.lock();
    rows.push(row);
    self.writes.fetch_add(1, Ordering::SeqCst);
    Ok(rows.len() - 1)
  }

  async fn scan_all(&self) -> Result<Vec<Row>, StoreError> {
    Ok(self.rows.lock().clone())
  }

  async fn read_row(&self, index: usize) -> Result<Option<Row>, StoreError> {
    Ok(self.rows.lock().get(index).cloned())
  }

  async fn update_cells(&self, index: usize, updates: &[CellUpdate]) -> Result<(), StoreError> {
    let mut rows = self.rows.lock();
    let row = rows.get_mut(index).ok_or(StoreError::RowOutOfRange { index })?;
    for update in updates {
      let position = update.column.index();
      if row.len() <= position {
        row.resize(position + 1, String::new());
      }
      row[position] = update.value.clone();
    }
    self.writes.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}
