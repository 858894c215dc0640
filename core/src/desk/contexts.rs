// repairdesk/src/desk/contexts.rs

//! Context carried through the order-creation pipeline.

use crate::codes::Identifiers;
use crate::desk::DeskServices;
use crate::order::NewOrder;
use crate::pipeline::DegradedStep;
use crate::store::StoredOrder;
use crate::upload::StoredDocument;
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

/// Filled in step by step; each field is `None` until its step succeeds.
#[derive(Debug)]
pub struct CreateOrderCtx {
  pub services: Arc<DeskServices>,
  pub input: NewOrder,
  /// The formatted single-line address that gets stored.
  pub address: String,
  pub identifiers: Option<Identifiers>,
  /// Held from id assignment until the row is appended.
  pub write_guard: Option<OwnedMutexGuard<()>>,
  pub stored: Option<StoredOrder>,
  pub receipt: Option<Bytes>,
  pub document: Option<StoredDocument>,
}

impl CreateOrderCtx {
  pub fn new(services: Arc<DeskServices>, input: NewOrder) -> Self {
    Self {
      services,
      input,
      address: String::new(),
      identifiers: None,
      write_guard: None,
      stored: None,
      receipt: None,
      document: None,
    }
  }
}

/// Result of a successful `create_order`. An absent `document_url` is a normal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedOrder {
  pub sequence_id: String,
  pub receipt_code: String,
  pub access_code: String,
  pub document_url: Option<String>,
  /// Best-effort steps that failed during creation.
  pub degraded: Vec<DegradedStep>,
}
