// repairdesk_server/src/web/handlers/tracking_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::instrument;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct TrackQuery {
  pub code: String,
  #[serde(default)]
  pub access: String,
}

/// Public lookup. A wrong access code is indistinguishable from an unknown receipt code.
#[instrument(name = "handler::track", skip(app_state, query), fields(code = %query.code))]
pub async fn track_handler(
  app_state: web::Data<AppState>,
  query: web::Query<TrackQuery>,
) -> Result<HttpResponse, AppError> {
  let view = app_state.desk.track(&query.code, &query.access).await?;
  Ok(HttpResponse::Ok().json(view))
}
