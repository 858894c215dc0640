// repairdesk_server/src/web/handlers/document_handlers.rs

//! Serves receipts held by the in-memory document store. With a document API
//! configured, receipts are served by that API and this route answers 404.

use actix_web::{web, HttpResponse};
use repairdesk::receipt::PDF_MIME;
use tracing::instrument;

use crate::errors::AppError;
use crate::state::AppState;

#[instrument(name = "handler::view_document", skip(app_state))]
pub async fn view_document_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let file_id = path.into_inner();
  let file = app_state
    .memory_documents
    .as_ref()
    .and_then(|storage| storage.file(&file_id))
    .filter(|file| file.public)
    .ok_or_else(|| AppError::NotFound(format!("document {}", file_id)))?;

  let mime = if file.mime.is_empty() { PDF_MIME.to_string() } else { file.mime };
  Ok(
    HttpResponse::Ok()
      .content_type(mime)
      .insert_header(("Content-Disposition", format!("inline; filename=\"{}\"", file.name)))
      .body(file.body),
  )
}
