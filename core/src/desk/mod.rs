// repairdesk/src/desk/mod.rs

//! The order desk: creation pipeline, status changes and lookups over one store.

pub mod contexts;
pub mod create_pipeline;
pub mod transitions;

use crate::codes::CodeGenerator;
use crate::config::DeskConfig;
use crate::error::{DeskError, DeskResult};
use crate::notify::{LogMessenger, Messenger, Notifier};
use crate::order::{AddressFormatter, CommaAddressFormatter, NewOrder, Order, TrackingView};
use crate::pipeline::{ContextData, Pipeline, PipelineError};
use crate::policy::{allowed_actions, Action, Role};
use crate::receipt::{PdfReceiptRenderer, ReceiptRenderer};
use crate::store::{OrderStore, RowStore};
use crate::upload::{DocumentStorage, DocumentUploader, MemoryDocumentStorage};
use chrono::{DateTime, SubsecRound, Utc};
use contexts::{CreateOrderCtx, CreatedOrder};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};

pub use transitions::Transition;

/// Current time at the precision rows store.
pub(crate) fn now_millis() -> DateTime<Utc> {
  Utc::now().trunc_subsecs(3)
}

/// Collaborators shared by every desk operation.
pub struct DeskServices {
  pub store: OrderStore,
  pub codes: CodeGenerator,
  pub renderer: Arc<dyn ReceiptRenderer>,
  pub uploader: DocumentUploader,
  pub notifier: Notifier,
  pub address_formatter: Arc<dyn AddressFormatter>,
  pub config: DeskConfig,
  /// Serializes id reservation + append, and status read-modify-write.
  pub write_gate: Arc<Mutex<()>>,
}

impl std::fmt::Debug for DeskServices {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DeskServices")
      .field("codes", &self.codes)
      .field("uploader", &self.uploader)
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}

/// An order as listed for a role, with what that role may do to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderListing {
  pub order: Order,
  pub actions: BTreeSet<Action>,
}

pub struct OrderDeskBuilder {
  rows: Arc<dyn RowStore>,
  storage: Option<Arc<dyn DocumentStorage>>,
  messenger: Option<Arc<dyn Messenger>>,
  renderer: Option<Arc<dyn ReceiptRenderer>>,
  address_formatter: Option<Arc<dyn AddressFormatter>>,
  config: DeskConfig,
}

impl OrderDeskBuilder {
  pub fn document_storage(mut self, storage: Arc<dyn DocumentStorage>) -> Self {
    self.storage = Some(storage);
    self
  }

  pub fn messenger(mut self, messenger: Arc<dyn Messenger>) -> Self {
    self.messenger = Some(messenger);
    self
  }

  pub fn renderer(mut self, renderer: Arc<dyn ReceiptRenderer>) -> Self {
    self.renderer = Some(renderer);
    self
  }

  pub fn address_formatter(mut self, formatter: Arc<dyn AddressFormatter>) -> Self {
    self.address_formatter = Some(formatter);
    self
  }

  pub fn config(mut self, config: DeskConfig) -> Self {
    self.config = config;
    self
  }

  /// Unset collaborators default to in-memory storage, a logging messenger,
  /// the PDF renderer and the comma address formatter.
  pub fn build(self) -> OrderDesk {
    let config = self.config;
    let storage = self
      .storage
      .unwrap_or_else(|| Arc::new(MemoryDocumentStorage::default()));
    let messenger = self.messenger.unwrap_or_else(|| Arc::new(LogMessenger));
    let services = DeskServices {
      store: OrderStore::new(self.rows),
      codes: CodeGenerator::new(config.receipt_prefix.clone(), config.max_receipt_code_attempts),
      renderer: self.renderer.unwrap_or_else(|| Arc::new(PdfReceiptRenderer)),
      uploader: DocumentUploader::new(storage, config.upload_retry),
      notifier: Notifier::new(messenger, config.business_name.clone()),
      address_formatter: self
        .address_formatter
        .unwrap_or_else(|| Arc::new(CommaAddressFormatter)),
      config,
      write_gate: Arc::new(Mutex::new(())),
    };
    OrderDesk {
      services: Arc::new(services),
      create_pipeline: create_pipeline::build_create_pipeline(),
    }
  }
}

pub struct OrderDesk {
  pub(crate) services: Arc<DeskServices>,
  create_pipeline: Pipeline<CreateOrderCtx, DeskError>,
}

impl std::fmt::Debug for OrderDesk {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OrderDesk")
      .field("services", &self.services)
      .field("create_steps", &self.create_pipeline.step_names())
      .finish()
  }
}

impl OrderDesk {
  pub fn builder(rows: Arc<dyn RowStore>) -> OrderDeskBuilder {
    OrderDeskBuilder {
      rows,
      storage: None,
      messenger: None,
      renderer: None,
      address_formatter: None,
      config: DeskConfig::default(),
    }
  }

  pub fn services(&self) -> &Arc<DeskServices> {
    &self.services
  }

  pub fn store(&self) -> &OrderStore {
    &self.services.store
  }

  /// The creation pipeline, for adding hooks or extra steps.
  pub fn create_pipeline_mut(&mut self) -> &mut Pipeline<CreateOrderCtx, DeskError> {
    &mut self.create_pipeline
  }

  /// Creates an order. Fails only when validation, id assignment or the append
  /// fails; receipt, upload, URL write-back and notification failures are
  /// reported in [`CreatedOrder::degraded`].
  ///
  /// Not idempotent: the same input twice creates two orders.
  #[instrument(name = "desk::create_order", skip_all, fields(device = %input.device_type))]
  pub async fn create_order(&self, input: NewOrder) -> DeskResult<CreatedOrder> {
    let ctx = ContextData::new(CreateOrderCtx::new(self.services.clone(), input));
    let report = self.create_pipeline.run(ctx.clone()).await?;

    let created = ctx.with(|c| {
      c.stored.as_ref().map(|stored| CreatedOrder {
        sequence_id: stored.order.sequence_id.clone(),
        receipt_code: stored.order.receipt_code.clone(),
        access_code: stored.order.access_code.clone(),
        document_url: c.document.as_ref().map(|d| d.view_url.clone()),
        degraded: report.degraded.clone(),
      })
    });
    let created = created.ok_or_else(|| DeskError::from(PipelineError::Internal("creation stopped before the order was stored".to_string())))?;

    info!(
      sequence_id = %created.sequence_id,
      receipt_code = %created.receipt_code,
      has_document = created.document_url.is_some(),
      degraded = report.degraded.len(),
      "Order created."
    );
    Ok(created)
  }

  pub async fn find_order(&self, sequence_id: &str) -> DeskResult<Order> {
    self
      .services
      .store
      .find_by_sequence_id(sequence_id)
      .await?
      .map(|stored| stored.order)
      .ok_or_else(|| DeskError::NotFound(format!("order {}", sequence_id)))
  }

  /// Customer lookup. Both codes must match the same order.
  #[instrument(name = "desk::track", skip(self, access_code))]
  pub async fn track(&self, receipt_code: &str, access_code: &str) -> DeskResult<TrackingView> {
    let not_found = || DeskError::NotFound(format!("tracking code {}", receipt_code));
    if receipt_code.trim().is_empty() || access_code.trim().is_empty() {
      return Err(not_found());
    }
    let stored = self
      .services
      .store
      .find_by_receipt_code(receipt_code)
      .await?
      .ok_or_else(not_found)?;
    if stored.order.access_code != access_code.trim() {
      return Err(not_found());
    }
    Ok(TrackingView::from(&stored.order))
  }

  /// Every order `role` can see, in store order, with its allowed actions.
  pub async fn list_for_role(&self, role: Role) -> DeskResult<Vec<OrderListing>> {
    let orders = self.services.store.scan_orders().await?;
    Ok(
      orders
        .into_iter()
        .filter_map(|stored| {
          let actions = allowed_actions(role, stored.order.status);
          (!actions.is_empty()).then_some(OrderListing {
            order: stored.order,
            actions,
          })
        })
        .collect(),
    )
  }
}
