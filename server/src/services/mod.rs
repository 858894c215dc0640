// repairdesk_server/src/services/mod.rs

//! HTTP-backed collaborators for the order desk, and the wiring that picks
//! them (or the in-memory defaults) from configuration.

pub mod document_storage;
pub mod messaging;
pub mod sheets_store;

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use repairdesk::notify::LogMessenger;
use repairdesk::upload::MemoryDocumentStorage;
use repairdesk::{MemoryRowStore, OrderDesk, RowStore};
use std::error::Error as StdError;
use std::sync::Arc;

pub use document_storage::HttpDocumentStorage;
pub use messaging::HttpMessenger;
pub use sheets_store::HttpRowStore;

pub fn build_http_client(config: &AppConfig) -> Result<reqwest::Client> {
  reqwest::Client::builder()
    .timeout(config.http_timeout)
    .build()
    .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Joins an error and all of its sources into one line, so the root cause
/// (`connection reset by peer`, `dns error`, ...) stays visible.
pub(crate) fn error_chain(err: &(dyn StdError + 'static)) -> String {
  let mut message = err.to_string();
  let mut source = err.source();
  while let Some(cause) = source {
    message.push_str(": ");
    message.push_str(&cause.to_string());
    source = cause.source();
  }
  message
}

/// The desk plus the in-memory document store when no document API is configured,
/// so the server can hand out the receipts it generated.
pub struct Wiring {
  pub desk: OrderDesk,
  pub memory_documents: Option<Arc<MemoryDocumentStorage>>,
}

pub fn build_desk(config: &AppConfig) -> Result<Wiring> {
  let client = build_http_client(config)?;

  let rows: Arc<dyn RowStore> = match &config.sheets {
    Some(sheets) => Arc::new(HttpRowStore::new(client.clone(), sheets.clone())),
    None => {
      tracing::warn!("SHEETS_API_URL not set; orders are kept in memory and lost on restart.");
      Arc::new(MemoryRowStore::new())
    }
  };

  let mut builder = OrderDesk::builder(rows).config(config.desk.clone());
  let mut memory_documents = None;

  builder = match &config.drive {
    Some(drive) => builder.document_storage(Arc::new(HttpDocumentStorage::new(client.clone(), drive.clone()))),
    None => {
      let storage = Arc::new(MemoryDocumentStorage::new(format!("{}/documents", config.app_base_url)));
      memory_documents = Some(storage.clone());
      builder.document_storage(storage)
    }
  };

  builder = match &config.messaging {
    Some(messaging) => builder.messenger(Arc::new(HttpMessenger::new(client, messaging.clone()))),
    None => builder.messenger(Arc::new(LogMessenger)),
  };

  Ok(Wiring {
    desk: builder.build(),
    memory_documents,
  })
}
