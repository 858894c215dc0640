// repairdesk_server/src/services/document_storage.rs

//! [`DocumentStorage`] over a Drive-style files API: one multipart upload,
//! then an "anyone with the link can read" permission.

use super::error_chain;
use crate::config::DriveConfig;
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use repairdesk::upload::{DocumentStorage, StorageError, StoredDocument};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

const BOUNDARY: &str = "repairdesk-upload-boundary";

#[derive(Debug, Deserialize)]
struct UploadedFile {
  id: String,
}

pub struct HttpDocumentStorage {
  client: Client,
  config: DriveConfig,
}

impl HttpDocumentStorage {
  pub fn new(client: Client, config: DriveConfig) -> Self {
    Self { client, config }
  }

  fn api(&self, path: &str) -> String {
    format!("{}/{}", self.config.api_url.trim_end_matches('/'), path)
  }

  fn document_for(&self, file_id: String) -> StoredDocument {
    let public = self.config.public_url.trim_end_matches('/');
    StoredDocument {
      view_url: format!("{}/file/d/{}/view", public, file_id),
      download_url: format!("{}/uc?id={}&export=download", public, file_id),
      file_id,
    }
  }

  async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, StorageError> {
    let response = request
      .bearer_auth(&self.config.api_token)
      .send()
      .await
      .map_err(network_error)?;
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StorageError::Rejected {
      status: status.as_u16(),
      body,
    })
  }
}

fn network_error(err: reqwest::Error) -> StorageError {
  let chain = error_chain(&err);
  if err.is_timeout() && !chain.to_lowercase().contains("timed out") {
    StorageError::Network(format!("timeout: {}", chain))
  } else {
    StorageError::Network(chain)
  }
}

/// `multipart/related` body: JSON metadata part, then the media part.
fn related_body(metadata: &serde_json::Value, mime: &str, media: &Bytes) -> Bytes {
  let mut body = BytesMut::with_capacity(media.len() + 512);
  body.put_slice(format!("--{}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n", BOUNDARY).as_bytes());
  body.put_slice(metadata.to_string().as_bytes());
  body.put_slice(format!("\r\n--{}\r\nContent-Type: {}\r\n\r\n", BOUNDARY, mime).as_bytes());
  body.put_slice(media);
  body.put_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
  body.freeze()
}

#[async_trait]
impl DocumentStorage for HttpDocumentStorage {
  #[instrument(name = "drive::upload", skip(self, body), fields(bytes = body.len()))]
  async fn upload(&self, name: &str, body: Bytes, mime: &str) -> Result<StoredDocument, StorageError> {
    let mut metadata = json!({ "name": name, "mimeType": mime });
    if let Some(folder) = &self.config.folder_id {
      metadata["parents"] = json!([folder]);
    }

    let request = self
      .client
      .post(self.api("upload/drive/v3/files"))
      .query(&[("uploadType", "multipart"), ("fields", "id")])
      .header(
        reqwest::header::CONTENT_TYPE,
        format!("multipart/related; boundary={}", BOUNDARY),
      )
      .body(related_body(&metadata, mime, &body));
    let uploaded: UploadedFile = self
      .send(request)
      .await?
      .json()
      .await
      .map_err(|e| StorageError::InvalidResponse(e.to_string()))?;
    debug!(file_id = %uploaded.id, "Document stored.");
    Ok(self.document_for(uploaded.id))
  }

  #[instrument(name = "drive::make_public", skip(self))]
  async fn make_public(&self, file_id: &str) -> Result<(), StorageError> {
    let request = self
      .client
      .post(self.api(&format!("drive/v3/files/{}/permissions", file_id)))
      .json(&json!({ "role": "reader", "type": "anyone" }));
    self.send(request).await?;
    Ok(())
  }
}
