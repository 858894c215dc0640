// repairdesk/src/upload.rs

//! Document storage boundary and the retrying uploader.

use crate::config::RetryPolicy;
use crate::error::{DeskError, DeskResult};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Lowercased fragments of error messages that mark a failure as a transient
/// network condition.
const TRANSIENT_SIGNATURES: &[&str] = &[
  "econnreset",
  "connection reset",
  "connection closed",
  "etimedout",
  "timed out",
  "timeout",
  "enotfound",
  "eai_again",
  "dns error",
  "failed to lookup address",
  "socket hang up",
  "broken pipe",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
  pub file_id: String,
  pub view_url: String,
  pub download_url: String,
}

#[derive(Debug, Error)]
pub enum StorageError {
  #[error("Network error: {0}")]
  Network(String),

  #[error("Storage rejected the request (status {status}): {body}")]
  Rejected { status: u16, body: String },

  #[error("Unexpected storage response: {0}")]
  InvalidResponse(String),
}

impl StorageError {
  /// Only network errors whose message carries a known transient signature
  /// are worth retrying.
  pub fn is_transient(&self) -> bool {
    match self {
      StorageError::Network(message) => {
        let message = message.to_lowercase();
        TRANSIENT_SIGNATURES.iter().any(|sig| message.contains(sig))
      }
      _ => false,
    }
  }
}

#[async_trait]
pub trait DocumentStorage: Send + Sync {
  async fn upload(&self, name: &str, body: Bytes, mime: &str) -> Result<StoredDocument, StorageError>;

  /// Grants anyone-with-the-link read access.
  async fn make_public(&self, file_id: &str) -> Result<(), StorageError>;
}

#[derive(Clone)]
pub struct DocumentUploader {
  storage: Arc<dyn DocumentStorage>,
  retry: RetryPolicy,
}

impl std::fmt::Debug for DocumentUploader {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DocumentUploader").field("retry", &self.retry).finish_non_exhaustive()
  }
}

impl DocumentUploader {
  pub fn new(storage: Arc<dyn DocumentStorage>, retry: RetryPolicy) -> Self {
    Self { storage, retry }
  }

  /// Uploads `body` and makes it public.
  ///
  /// Transient failures are retried up to `max_attempts` in total with a linear
  /// backoff; every attempt sends a fresh handle to the same buffer. Any other
  /// failure, including a failed permission call, ends the upload.
  #[instrument(name = "upload::document", skip(self, body), fields(size = body.len()))]
  pub async fn upload(&self, name: &str, body: &Bytes, mime: &str) -> DeskResult<StoredDocument> {
    let max_attempts = self.retry.max_attempts.max(1);
    let mut attempt = 1;
    let document = loop {
      match self.storage.upload(name, body.clone(), mime).await {
        Ok(document) => break document,
        Err(e) if e.is_transient() && attempt < max_attempts => {
          let delay = self.retry.delay_after(attempt);
          warn!(attempt, error = %e, ?delay, "Transient upload failure, retrying.");
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        Err(e) => {
          return Err(DeskError::Upload {
            attempts: attempt,
            source: e,
          })
        }
      }
    };

    self
      .storage
      .make_public(&document.file_id)
      .await
      .map_err(|source| DeskError::Upload {
        attempts: attempt,
        source,
      })?;

    info!(file_id = %document.file_id, attempt, "Document uploaded.");
    Ok(document)
  }
}

/// A file held by [`MemoryDocumentStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFile {
  pub name: String,
  pub mime: String,
  pub body: Bytes,
  pub public: bool,
}

/// Process-local [`DocumentStorage`] with failure injection.
#[derive(Debug)]
pub struct MemoryDocumentStorage {
  base_url: String,
  files: Mutex<HashMap<String, MemoryFile>>,
  failures: Mutex<VecDeque<StorageError>>,
  upload_calls: AtomicU32,
}

impl Default for MemoryDocumentStorage {
  fn default() -> Self {
    Self::new("memory://documents")
  }
}

impl MemoryDocumentStorage {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url: base_url.into(),
      files: Mutex::new(HashMap::new()),
      failures: Mutex::new(VecDeque::new()),
      upload_calls: AtomicU32::new(0),
    }
  }

  /// The next upload call fails with `error` instead of storing anything.
  pub fn fail_next(&self, error: StorageError) {
    self.failures.lock().push_back(error);
  }

  pub fn upload_calls(&self) -> u32 {
    self.upload_calls.load(Ordering::SeqCst)
  }

  pub fn file(&self, file_id: &str) -> Option<MemoryFile> {
    self.files.lock().get(file_id).cloned()
  }

  pub fn file_count(&self) -> usize {
    self.files.lock().len()
  }
}

#[async_trait]
impl DocumentStorage for MemoryDocumentStorage {
  async fn upload(&self, name: &str, body: Bytes, mime: &str) -> Result<StoredDocument, StorageError> {
    self.upload_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(error) = self.failures.lock().pop_front() {
      return Err(error);
    }
    let file_id = uuid::Uuid::new_v4().simple().to_string();
    self.files.lock().insert(
      file_id.clone(),
      MemoryFile {
        name: name.to_string(),
        mime: mime.to_string(),
        body,
        public: false,
      },
    );
    Ok(StoredDocument {
      view_url: format!("{}/file/{}/view", self.base_url, file_id),
      download_url: format!("{}/uc?id={}&export=download", self.base_url, file_id),
      file_id,
    })
  }

  async fn make_public(&self, file_id: &str) -> Result<(), StorageError> {
    match self.files.lock().get_mut(file_id) {
      Some(file) => {
        file.public = true;
        Ok(())
      }
      None => Err(StorageError::Rejected {
        status: 404,
        body: format!("file {} not found", file_id),
      }),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  fn uploader(storage: Arc<MemoryDocumentStorage>) -> DocumentUploader {
    DocumentUploader::new(
      storage,
      RetryPolicy {
        max_attempts: 3,
        backoff_step: Duration::from_millis(500),
      },
    )
  }

  #[test]
  fn transient_classification() {
    assert!(StorageError::Network("read ECONNRESET".into()).is_transient());
    assert!(StorageError::Network("operation timed out".into()).is_transient());
    assert!(StorageError::Network("dns error: failed to lookup address".into()).is_transient());
    assert!(StorageError::Network("socket hang up".into()).is_transient());
    assert!(!StorageError::Network("invalid certificate".into()).is_transient());
    assert!(!StorageError::Rejected {
      status: 503,
      body: "timeout".into()
    }
    .is_transient());
  }

  #[tokio::test(start_paused = true)]
  async fn transient_failures_are_retried_with_linear_backoff() {
    let storage = Arc::new(MemoryDocumentStorage::default());
    storage.fail_next(StorageError::Network("connection reset by peer".into()));
    storage.fail_next(StorageError::Network("ETIMEDOUT".into()));

    let started = tokio::time::Instant::now();
    let body = Bytes::from_static(b"%PDF-1.4");
    let doc = uploader(storage.clone()).upload("r.pdf", &body, "application/pdf").await.unwrap();

    assert_eq!(storage.upload_calls(), 3);
    assert_eq!(started.elapsed(), Duration::from_millis(500 + 1000));
    let file = storage.file(&doc.file_id).unwrap();
    assert!(file.public);
    assert_eq!(file.body, body);
  }

  #[tokio::test(start_paused = true)]
  async fn gives_up_after_max_attempts() {
    let storage = Arc::new(MemoryDocumentStorage::default());
    for _ in 0..3 {
      storage.fail_next(StorageError::Network("socket hang up".into()));
    }
    let err = uploader(storage.clone())
      .upload("r.pdf", &Bytes::from_static(b"x"), "application/pdf")
      .await
      .unwrap_err();
    assert!(matches!(err, DeskError::Upload { attempts: 3, .. }));
    assert_eq!(storage.upload_calls(), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn permanent_failures_abort_immediately() {
    let storage = Arc::new(MemoryDocumentStorage::default());
    storage.fail_next(StorageError::Rejected {
      status: 403,
      body: "quota exceeded".into(),
    });
    let err = uploader(storage.clone())
      .upload("r.pdf", &Bytes::from_static(b"x"), "application/pdf")
      .await
      .unwrap_err();
    assert!(matches!(err, DeskError::Upload { attempts: 1, .. }));
    assert_eq!(storage.upload_calls(), 1);
    assert_eq!(storage.file_count(), 0);
  }
}
