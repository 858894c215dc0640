// repairdesk_server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use repairdesk::{DeskConfig, RetryPolicy};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Spreadsheet-style row store. Unset means orders live in memory.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
  pub api_url: String,
  pub spreadsheet_id: String,
  pub sheet_name: String,
  pub api_token: String,
}

/// Blob storage for receipt documents.
#[derive(Debug, Clone)]
pub struct DriveConfig {
  pub api_url: String,
  pub public_url: String,
  pub folder_id: Option<String>,
  pub api_token: String,
}

#[derive(Debug, Clone)]
pub struct MessagingConfig {
  pub api_url: String,
  pub sender_id: String,
  pub api_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Text,
  Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub app_base_url: String,
  pub log_format: LogFormat,
  pub http_timeout: Duration,

  pub desk: DeskConfig,

  pub sheets: Option<SheetsConfig>,
  pub drive: Option<DriveConfig>,
  pub messaging: Option<MessagingConfig>,
}

fn parse<T: FromStr>(name: &str, raw: String) -> Result<T>
where
  T::Err: std::fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e)))
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    let config = Self::from_lookup(|name| env::var(name).ok())?;
    tracing::info!(
      row_store = if config.sheets.is_some() { "sheets" } else { "memory" },
      document_storage = if config.drive.is_some() { "drive" } else { "memory" },
      messaging = if config.messaging.is_some() { "http" } else { "log" },
      "Application configuration loaded successfully."
    );
    Ok(config)
  }

  /// Builds the config from any variable source. A backend section is enabled
  /// when its URL variable is set; its other required variables must then be set too.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    let require = |name: &str| {
      get(name).ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", name)))
    };

    let server_host = get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parse::<u16>("SERVER_PORT", get("SERVER_PORT").unwrap_or_else(|| "8080".to_string()))?;
    let app_base_url = get("APP_BASE_URL").unwrap_or_else(|| format!("http://{}:{}", server_host, server_port));

    let log_format = match get("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase).as_deref() {
      None | Some("text") => LogFormat::Text,
      Some("json") => LogFormat::Json,
      Some(other) => return Err(AppError::Config(format!("Invalid LOG_FORMAT: '{}'", other))),
    };
    let http_timeout = Duration::from_secs(parse("HTTP_TIMEOUT_SECS", get("HTTP_TIMEOUT_SECS").unwrap_or_else(|| "30".to_string()))?);

    let defaults = DeskConfig::default();
    let default_retry = RetryPolicy::default();
    let desk = DeskConfig {
      receipt_prefix: get("RECEIPT_PREFIX").unwrap_or(defaults.receipt_prefix),
      max_receipt_code_attempts: match get("MAX_RECEIPT_CODE_ATTEMPTS") {
        Some(raw) => parse("MAX_RECEIPT_CODE_ATTEMPTS", raw)?,
        None => defaults.max_receipt_code_attempts,
      },
      upload_retry: RetryPolicy {
        max_attempts: match get("UPLOAD_MAX_ATTEMPTS") {
          Some(raw) => parse("UPLOAD_MAX_ATTEMPTS", raw)?,
          None => default_retry.max_attempts,
        },
        backoff_step: match get("UPLOAD_BACKOFF_MS") {
          Some(raw) => Duration::from_millis(parse("UPLOAD_BACKOFF_MS", raw)?),
          None => default_retry.backoff_step,
        },
      },
      tracking_base_url: get("TRACKING_BASE_URL").unwrap_or_else(|| format!("{}/api/v1/track", app_base_url)),
      business_name: get("BUSINESS_NAME").unwrap_or(defaults.business_name),
    };

    let sheets = match get("SHEETS_API_URL") {
      Some(api_url) => Some(SheetsConfig {
        api_url,
        spreadsheet_id: require("SHEETS_SPREADSHEET_ID")?,
        sheet_name: get("SHEETS_SHEET_NAME").unwrap_or_else(|| "Orders".to_string()),
        api_token: require("SHEETS_API_TOKEN")?,
      }),
      None => None,
    };

    let drive = match get("DRIVE_API_URL") {
      Some(api_url) => Some(DriveConfig {
        public_url: get("DRIVE_PUBLIC_URL").unwrap_or_else(|| "https://drive.google.com".to_string()),
        api_url,
        folder_id: get("DRIVE_FOLDER_ID"),
        api_token: require("DRIVE_API_TOKEN")?,
      }),
      None => None,
    };

    let messaging = match get("MESSAGING_API_URL") {
      Some(api_url) => Some(MessagingConfig {
        api_url,
        sender_id: require("MESSAGING_SENDER_ID")?,
        api_token: require("MESSAGING_API_TOKEN")?,
      }),
      None => None,
    };

    Ok(Self {
      server_host,
      server_port,
      app_base_url,
      log_format,
      http_timeout,
      desk,
      sheets,
      drive,
      messaging,
    })
  }
}
