// tests/common/mod.rs
#![allow(dead_code)] // Each test binary uses a different subset.

use async_trait::async_trait;
use bytes::Bytes;
use repairdesk::config::{DeskConfig, RetryPolicy};
use repairdesk::desk::OrderDesk;
use repairdesk::notify::MemoryMessenger;
use repairdesk::receipt::{ReceiptData, ReceiptRenderer, RenderError};
use repairdesk::store::schema::Column;
use repairdesk::store::{CellUpdate, KeyMatch, MemoryRowStore, Row, RowStore, StoreError};
use repairdesk::upload::MemoryDocumentStorage;
use repairdesk::{ContextData, NewOrder, PipelineControl, PipelineError};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

// --- Pipeline test context ---
#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub should_stop_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Pipeline error: {0}")]
  Pipeline(String), // PipelineError is not PartialEq

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<PipelineError> for TestError {
  fn from(e: PipelineError) -> Self {
    TestError::Pipeline(format!("{:?}", e))
  }
}

pub type TestFuture = Pin<Box<dyn Future<Output = Result<PipelineControl, TestError>> + Send>>;

pub fn create_simple_handler(
  step_name: &'static str,
  message_to_append: &'static str,
) -> impl Fn(ContextData<TestContext>) -> TestFuture + Send + Sync + 'static {
  move |ctx: ContextData<TestContext>| -> TestFuture {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.message.push_str(message_to_append);
      guard.steps_executed.push(step_name.to_string());
      tracing::debug!(target: "test_handlers", step = %step_name, "executed, counter: {}", guard.counter);
      if guard.should_stop_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  }
}

pub fn create_failing_handler(
  step_name: &'static str,
  error_message: &'static str,
) -> impl Fn(ContextData<TestContext>) -> TestFuture + Send + Sync + 'static {
  move |ctx: ContextData<TestContext>| -> TestFuture {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      tracing::warn!(target: "test_handlers", step = %step_name, "failing with: '{}'", error_message);
      Err(TestError::Handler(error_message.to_string()))
    })
  }
}

// --- Tracing ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Desk fixtures ---

pub fn test_config() -> DeskConfig {
  DeskConfig {
    upload_retry: RetryPolicy {
      max_attempts: 3,
      backoff_step: Duration::from_millis(1),
    },
    ..DeskConfig::default()
  }
}

pub fn sample_order() -> NewOrder {
  NewOrder {
    customer_name: "Ali".into(),
    customer_phone: "555".into(),
    device_type: "X1".into(),
    issue: "no power".into(),
    ..NewOrder::default()
  }
}

pub struct Harness {
  pub desk: OrderDesk,
  pub rows: Arc<MemoryRowStore>,
  pub storage: Arc<MemoryDocumentStorage>,
  pub messenger: Arc<MemoryMessenger>,
}

pub fn harness() -> Harness {
  harness_with_rows(Arc::new(MemoryRowStore::new()))
}

pub fn harness_with_rows(rows: Arc<MemoryRowStore>) -> Harness {
  let storage = Arc::new(MemoryDocumentStorage::default());
  let messenger = Arc::new(MemoryMessenger::new());
  let desk = OrderDesk::builder(rows.clone())
    .document_storage(storage.clone())
    .messenger(messenger.clone())
    .config(test_config())
    .build();
  Harness {
    desk,
    rows,
    storage,
    messenger,
  }
}

/// Renderer that always fails.
pub struct FailingRenderer;

impl ReceiptRenderer for FailingRenderer {
  fn render(&self, _data: &ReceiptData) -> Result<Bytes, RenderError> {
    Err(RenderError::Failed(anyhow::anyhow!("font table missing")))
  }
}

/// Row store where every receipt code is already taken.
#[derive(Default)]
pub struct FullCodeSpaceRowStore {
  pub inner: MemoryRowStore,
}

#[async_trait]
impl RowStore for FullCodeSpaceRowStore {
  async fn append(&self, row: Row) -> Result<usize, StoreError> {
    self.inner.append(row).await
  }

  async fn scan_all(&self) -> Result<Vec<Row>, StoreError> {
    self.inner.scan_all().await
  }

  async fn read_row(&self, index: usize) -> Result<Option<Row>, StoreError> {
    self.inner.read_row(index).await
  }

  async fn update_cells(&self, index: usize, updates: &[CellUpdate]) -> Result<(), StoreError> {
    self.inner.update_cells(index, updates).await
  }

  async fn find_by_key(&self, column: Column, value: &str, mode: KeyMatch) -> Result<Option<(usize, Row)>, StoreError> {
    if column == Column::ReceiptCode {
      return Ok(Some((0, vec![String::new(), value.to_string()])));
    }
    self.inner.find_by_key(column, value, mode).await
  }
}

/// Row store whose appends or updates can be switched to fail.
#[derive(Default)]
pub struct SwitchableRowStore {
  pub inner: MemoryRowStore,
  pub fail_appends: AtomicBool,
  pub fail_updates: AtomicBool,
}

impl SwitchableRowStore {
  fn unavailable() -> StoreError {
    StoreError::Request(anyhow::anyhow!("connection reset by peer"))
  }
}

#[async_trait]
impl RowStore for SwitchableRowStore {
  async fn append(&self, row: Row) -> Result<usize, StoreError> {
    if self.fail_appends.load(Ordering::SeqCst) {
      return Err(Self::unavailable());
    }
    self.inner.append(row).await
  }

  async fn scan_all(&self) -> Result<Vec<Row>, StoreError> {
    self.inner.scan_all().await
  }

  async fn read_row(&self, index: usize) -> Result<Option<Row>, StoreError> {
    self.inner.read_row(index).await
  }

  async fn update_cells(&self, index: usize, updates: &[CellUpdate]) -> Result<(), StoreError> {
    if self.fail_updates.load(Ordering::SeqCst) {
      return Err(Self::unavailable());
    }
    self.inner.update_cells(index, updates).await
  }
}
