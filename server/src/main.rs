// repairdesk_server/src/main.rs

mod config;
mod errors;
mod services;
mod state;
mod web;

use crate::config::{AppConfig, LogFormat};
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Text => builder.init(),
    LogFormat::Json => builder.json().init(),
  }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  // LOG_FORMAT is read before the rest of the config so config errors get logged.
  dotenvy::dotenv().ok();
  let log_format = match std::env::var("LOG_FORMAT") {
    Ok(value) if value.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
    _ => LogFormat::Text,
  };
  init_tracing(log_format);

  tracing::info!("Starting repair desk server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };

  let wiring = match services::build_desk(&app_config) {
    Ok(wiring) => wiring,
    Err(e) => {
      tracing::error!(error = %e, "Failed to set up the order desk.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };
  tracing::info!(desk = ?wiring.desk, "Order desk ready.");

  let app_state = AppState {
    desk: Arc::new(wiring.desk),
    config: app_config.clone(),
    memory_documents: wiring.memory_documents,
  };

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!(log_format = ?app_config.log_format, "Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
