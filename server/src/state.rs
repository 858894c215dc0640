// repairdesk_server/src/state.rs

use crate::config::AppConfig;
use repairdesk::upload::MemoryDocumentStorage;
use repairdesk::OrderDesk;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub desk: Arc<OrderDesk>,
  pub config: Arc<AppConfig>,
  /// Set when receipts are kept in process memory rather than a document API.
  pub memory_documents: Option<Arc<MemoryDocumentStorage>>,
}
