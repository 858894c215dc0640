// repairdesk/src/error.rs
use crate::notify::NotifyError;
use crate::pipeline::PipelineError;
use crate::receipt::RenderError;
use crate::store::StoreError;
use crate::upload::StorageError;
use thiserror::Error;

/// Errors surfaced by desk operations.
///
/// Only validation, store and code-generation failures ever reach a caller of
/// `create_order`; render, upload and notification failures are recorded as
/// degraded steps and leave the order intact.
#[derive(Debug, Error)]
pub enum DeskError {
  #[error("Validation failed: missing required fields {fields:?}")]
  Validation { fields: Vec<&'static str> },

  #[error("Invalid input: {0}")]
  InvalidInput(String),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Store error: {0}")]
  Store(#[from] StoreError),

  #[error("Sequence ids are exhausted: the store already holds id {max}")]
  SequenceIdOverflow { max: u64 },

  #[error("No unused receipt code found after {attempts} attempts")]
  CodeSpaceExhausted { attempts: u32 },

  #[error("Receipt rendering failed: {0}")]
  Render(#[from] RenderError),

  #[error("Document upload failed after {attempts} attempt(s): {source}")]
  Upload {
    attempts: u32,
    #[source]
    source: StorageError,
  },

  #[error("Notification failed: {0}")]
  Notification(#[from] NotifyError),

  #[error("Pipeline error: {0}")]
  Pipeline(#[from] PipelineError),
}

impl DeskError {
  pub fn is_validation(&self) -> bool {
    matches!(self, DeskError::Validation { .. } | DeskError::InvalidInput(_))
  }
}

pub type DeskResult<T, E = DeskError> = std::result::Result<T, E>;
