// repairdesk_server/src/web/routes.rs

use actix_web::web;

use crate::state::AppState;
use crate::web::handlers::{document_handlers, order_handlers, tracking_handlers};

async fn health_check_handler(app_state: web::Data<AppState>) -> actix_web::HttpResponse {
  let config = &app_state.config;
  actix_web::HttpResponse::Ok().json(serde_json::json!({
    "status": "ok",
    "business": config.desk.business_name,
    "row_store": if config.sheets.is_some() { "sheets" } else { "memory" },
    "document_storage": if config.drive.is_some() { "drive" } else { "memory" },
  }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .service(
      web::scope("/api/v1")
        .route("/health", web::get().to(health_check_handler))
        .service(
          web::scope("/orders")
            .route("", web::post().to(order_handlers::create_order_handler))
            .route("", web::get().to(order_handlers::list_orders_handler))
            .route("/{sequence_id}", web::get().to(order_handlers::get_order_handler))
            .route(
              "/{sequence_id}/advance",
              web::post().to(order_handlers::advance_order_handler),
            )
            .route(
              "/{sequence_id}/transition",
              web::post().to(order_handlers::transition_order_handler),
            ),
        )
        .route("/track", web::get().to(tracking_handlers::track_handler)),
    )
    .route(
      "/documents/file/{file_id}/view",
      web::get().to(document_handlers::view_document_handler),
    );
}
