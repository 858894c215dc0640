// repairdesk/src/desk/create_pipeline.rs

//! The order-creation pipeline.
//!
//! `format_address` through `persist_order` are required: a failure there means
//! no order. Everything after the append is best-effort and can only degrade
//! the result.

use crate::desk::contexts::CreateOrderCtx;
use crate::desk::now_millis;
use crate::error::DeskError;
use crate::order::{Customer, Device, Order};
use crate::pipeline::{ContextData, Pipeline, PipelineControl, PipelineError, SkipCondition, StepPolicy};
use crate::receipt::{ReceiptData, PDF_MIME};
use crate::status::Status;
use std::sync::Arc;
use tracing::{debug, info};

pub const VALIDATE_INPUT: &str = "validate_input";
pub const FORMAT_ADDRESS: &str = "format_address";
pub const ASSIGN_IDENTIFIERS: &str = "assign_identifiers";
pub const PERSIST_ORDER: &str = "persist_order";
pub const RENDER_RECEIPT: &str = "render_receipt";
pub const UPLOAD_RECEIPT: &str = "upload_receipt";
pub const ATTACH_DOCUMENT_URL: &str = "attach_document_url";
pub const NOTIFY_CUSTOMER: &str = "notify_customer";

pub fn build_create_pipeline() -> Pipeline<CreateOrderCtx, DeskError> {
  let no_receipt: SkipCondition<CreateOrderCtx> = Arc::new(|ctx: &CreateOrderCtx| ctx.receipt.is_none());
  let no_document: SkipCondition<CreateOrderCtx> = Arc::new(|ctx: &CreateOrderCtx| ctx.document.is_none());

  let mut p = Pipeline::<CreateOrderCtx, DeskError>::new(&[
    (VALIDATE_INPUT, StepPolicy::Required, None),
    (FORMAT_ADDRESS, StepPolicy::Required, None),
    (ASSIGN_IDENTIFIERS, StepPolicy::Required, None),
    (PERSIST_ORDER, StepPolicy::Required, None),
    (RENDER_RECEIPT, StepPolicy::BestEffort, None),
    (UPLOAD_RECEIPT, StepPolicy::BestEffort, Some(no_receipt)),
    (ATTACH_DOCUMENT_URL, StepPolicy::BestEffort, Some(no_document)),
    (NOTIFY_CUSTOMER, StepPolicy::BestEffort, None),
  ]);

  p.on_root(VALIDATE_INPUT, |ctx: ContextData<CreateOrderCtx>| {
    Box::pin(async move {
      let fields = ctx.with(|c| c.input.missing_fields());
      if !fields.is_empty() {
        return Err(DeskError::Validation { fields });
      }
      Ok::<_, DeskError>(PipelineControl::Continue)
    })
  });

  p.on_root(FORMAT_ADDRESS, |ctx: ContextData<CreateOrderCtx>| {
    Box::pin(async move {
      ctx.update(|c| c.address = c.services.address_formatter.format(&c.input.address));
      Ok::<_, DeskError>(PipelineControl::Continue)
    })
  });

  // The write gate stays locked in the context until `persist_order` appends,
  // so no other writer can compute the same sequence id.
  p.on_root(ASSIGN_IDENTIFIERS, |ctx: ContextData<CreateOrderCtx>| {
    Box::pin(async move {
      let services = ctx.with(|c| c.services.clone());
      let guard = services.write_gate.clone().lock_owned().await;
      let identifiers = services.codes.generate(&services.store).await?;
      debug!(sequence_id = %identifiers.sequence_id, receipt_code = %identifiers.receipt_code, "Identifiers assigned.");
      ctx.update(|c| {
        c.identifiers = Some(identifiers);
        c.write_guard = Some(guard);
      });
      Ok::<_, DeskError>(PipelineControl::Continue)
    })
  });

  p.on_root(PERSIST_ORDER, |ctx: ContextData<CreateOrderCtx>| {
    Box::pin(async move {
      let (services, order) = {
        let c = ctx.read();
        let ids = c
          .identifiers
          .clone()
          .ok_or_else(|| DeskError::from(PipelineError::Internal("identifiers were not assigned".to_string())))?;
        let now = now_millis();
        let order = Order {
          sequence_id: ids.sequence_id,
          receipt_code: ids.receipt_code,
          access_code: ids.access_code,
          customer: Customer {
            name: c.input.customer_name.trim().to_string(),
            phone: c.input.customer_phone.trim().to_string(),
            address: c.address.clone(),
          },
          device: Device {
            device_type: c.input.device_type.trim().to_string(),
            serial_number: c
              .input
              .serial_number
              .as_deref()
              .map(str::trim)
              .filter(|s| !s.is_empty())
              .map(str::to_string),
            accessories: c
              .input
              .accessories
              .iter()
              .map(|a| a.trim())
              .filter(|a| !a.is_empty())
              .map(str::to_string)
              .collect(),
            issue: c.input.issue.trim().to_string(),
          },
          estimated_cost: c.input.estimated_cost,
          extra_cost: None,
          diagnosis_note: None,
          status: Status::PendingPickup,
          return_reason: None,
          document_url: None,
          created_at: now,
          updated_at: now,
        };
        (c.services.clone(), order)
      };

      let stored = services.store.append_order(&order).await?;
      info!(
        sequence_id = %stored.order.sequence_id,
        receipt_code = %stored.order.receipt_code,
        row_index = stored.row_index,
        "Order persisted."
      );
      ctx.update(|c| {
        c.stored = Some(stored);
        c.write_guard = None;
      });
      Ok::<_, DeskError>(PipelineControl::Continue)
    })
  });

  p.on_root(RENDER_RECEIPT, |ctx: ContextData<CreateOrderCtx>| {
    Box::pin(async move {
      let (services, data) = {
        let c = ctx.read();
        let stored = c
          .stored
          .as_ref()
          .ok_or_else(|| DeskError::from(PipelineError::Internal("order was not persisted".to_string())))?;
        let link = c
          .services
          .config
          .tracking_link(&stored.order.receipt_code, &stored.order.access_code);
        (
          c.services.clone(),
          ReceiptData::from_order(&stored.order, &c.services.config.business_name, Some(link)),
        )
      };
      let bytes = services.renderer.render(&data)?;
      debug!(size = bytes.len(), "Receipt rendered.");
      ctx.update(|c| c.receipt = Some(bytes));
      Ok::<_, DeskError>(PipelineControl::Continue)
    })
  });

  p.on_root(UPLOAD_RECEIPT, |ctx: ContextData<CreateOrderCtx>| {
    Box::pin(async move {
      let (services, name, body) = {
        let c = ctx.read();
        let name = c
          .stored
          .as_ref()
          .map(|s| format!("{}.pdf", s.order.receipt_code))
          .unwrap_or_else(|| "receipt.pdf".to_string());
        (c.services.clone(), name, c.receipt.clone().unwrap_or_default())
      };
      let document = services.uploader.upload(&name, &body, PDF_MIME).await?;
      ctx.update(|c| c.document = Some(document));
      Ok::<_, DeskError>(PipelineControl::Continue)
    })
  });

  p.on_root(ATTACH_DOCUMENT_URL, |ctx: ContextData<CreateOrderCtx>| {
    Box::pin(async move {
      let (services, row_index, url) = {
        let c = ctx.read();
        let row_index = c
          .stored
          .as_ref()
          .map(|s| s.row_index)
          .ok_or_else(|| DeskError::from(PipelineError::Internal("order was not persisted".to_string())))?;
        let url = c.document.as_ref().map(|d| d.view_url.clone()).unwrap_or_default();
        (c.services.clone(), row_index, url)
      };
      services.store.set_document_url(row_index, &url).await?;
      ctx.update(|c| {
        if let Some(stored) = c.stored.as_mut() {
          stored.order.document_url = Some(url);
        }
      });
      Ok::<_, DeskError>(PipelineControl::Continue)
    })
  });

  p.on_root(NOTIFY_CUSTOMER, |ctx: ContextData<CreateOrderCtx>| {
    Box::pin(async move {
      let (services, recipient, message) = {
        let c = ctx.read();
        let order = &c
          .stored
          .as_ref()
          .ok_or_else(|| DeskError::from(PipelineError::Internal("order was not persisted".to_string())))?
          .order;
        let link = c.services.config.tracking_link(&order.receipt_code, &order.access_code);
        (
          c.services.clone(),
          order.customer.phone.clone(),
          c.services.notifier.creation_message(order, &link),
        )
      };
      services.notifier.notify(&recipient, &message).await?;
      Ok::<_, DeskError>(PipelineControl::Continue)
    })
  });

  p
}
