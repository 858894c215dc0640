// repairdesk_server/src/web/handlers/mod.rs

pub mod document_handlers;
pub mod order_handlers;
pub mod tracking_handlers;
