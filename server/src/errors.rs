// repairdesk_server/src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use repairdesk::DeskError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Upstream Service Error: {0}")]
  Upstream(String),

  #[error("Order Desk Error: {source}")]
  Desk {
    #[source]
    source: DeskError,
  },
}

impl From<DeskError> for AppError {
  fn from(err: DeskError) -> Self {
    match err {
      ref e if e.is_validation() => AppError::Validation(e.to_string()),
      DeskError::NotFound(what) => AppError::NotFound(what),
      DeskError::Store(ref source) => AppError::Upstream(source.to_string()),
      other => AppError::Desk { source: other },
    }
  }
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"error": m})),
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m})),
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Upstream(m) => HttpResponse::BadGateway().json(json!({"error": "Order store unavailable", "detail": m})),
      AppError::Desk { source } => {
        tracing::error!(desk_error_source = ?source, "Desk error details");
        match source {
          DeskError::CodeSpaceExhausted { .. } => HttpResponse::ServiceUnavailable()
            .json(json!({"error": "No receipt code available", "detail": source.to_string()})),
          _ => HttpResponse::InternalServerError()
            .json(json!({"error": "Order processing error", "detail": source.to_string()})),
        }
      }
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
