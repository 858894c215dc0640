// repairdesk_server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use repairdesk::{NewOrder, Role, Status, Transition, TransitionMetadata};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::state::AppState;

// --- Request / Response DTOs ---

#[derive(Deserialize, Debug)]
pub struct ListOrdersQuery {
  pub role: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct AdvanceRequestPayload {
  /// The `updated_at` the caller last saw; the advance is refused if the order moved since.
  #[serde(default)]
  pub seen_updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug)]
pub struct TransitionRequestPayload {
  pub target: String,
  #[serde(default)]
  pub metadata: TransitionMetadata,
  #[serde(default)]
  pub seen_updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug)]
pub struct TransitionResponse {
  pub ok: bool,
  #[serde(flatten)]
  pub transition: Transition,
}

fn transition_response(transition: Transition) -> HttpResponse {
  let body = TransitionResponse {
    ok: transition.is_ok(),
    transition,
  };
  match &body.transition {
    Transition::Applied { .. } | Transition::Unchanged { .. } => HttpResponse::Ok().json(body),
    Transition::Rejected { refusal, .. } => {
      warn!(%refusal, "Transition refused.");
      HttpResponse::UnprocessableEntity().json(body)
    }
    Transition::Stale { .. } => {
      warn!("Transition refused, order changed since it was read.");
      HttpResponse::Conflict().json(body)
    }
  }
}

// --- Handlers ---

#[instrument(name = "handler::create_order", skip(app_state, payload), fields(device = %payload.device_type))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<NewOrder>,
) -> Result<HttpResponse, AppError> {
  let created = app_state.desk.create_order(payload.into_inner()).await?;
  if !created.degraded.is_empty() {
    warn!(
      receipt_code = %created.receipt_code,
      degraded = ?created.degraded,
      "Order created with degraded steps."
    );
  }
  Ok(HttpResponse::Created().json(created))
}

#[instrument(name = "handler::list_orders", skip(app_state))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListOrdersQuery>,
) -> Result<HttpResponse, AppError> {
  let role: Role = query
    .role
    .parse()
    .map_err(|e: repairdesk::policy::UnknownRole| AppError::Validation(e.to_string()))?;
  let listings = app_state.desk.list_for_role(role).await?;
  info!(%role, count = listings.len(), "Orders listed.");
  Ok(HttpResponse::Ok().json(listings))
}

#[instrument(name = "handler::get_order", skip(app_state))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.desk.find_order(&path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::advance_order", skip(app_state, payload))]
pub async fn advance_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  payload: Option<web::Json<AdvanceRequestPayload>>,
) -> Result<HttpResponse, AppError> {
  let sequence_id = path.into_inner();
  let seen = payload.and_then(|p| p.into_inner().seen_updated_at);
  let transition = match seen {
    Some(seen) => app_state.desk.advance_status_if_unchanged(&sequence_id, seen).await?,
    None => app_state.desk.advance_status(&sequence_id).await?,
  };
  Ok(transition_response(transition))
}

#[instrument(name = "handler::transition_order", skip(app_state, payload), fields(target = %payload.target))]
pub async fn transition_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  payload: web::Json<TransitionRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let TransitionRequestPayload {
    target,
    metadata,
    seen_updated_at,
  } = payload.into_inner();
  let target: Status = target
    .trim()
    .parse()
    .map_err(|e: repairdesk::status::UnknownStatus| AppError::Validation(e.to_string()))?;

  let transition = app_state
    .desk
    .force_transition(&path.into_inner(), target, metadata, seen_updated_at)
    .await?;
  Ok(transition_response(transition))
}
