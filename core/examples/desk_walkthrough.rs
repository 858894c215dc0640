// repairdesk/examples/desk_walkthrough.rs

//! Creates one order against in-memory backends and walks it to delivery.
//!
//! `cargo run -p repairdesk --example desk_walkthrough`

use repairdesk::{Address, DeskError, MemoryRowStore, NewOrder, OrderDesk, Role, Transition};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), DeskError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  let desk = OrderDesk::builder(Arc::new(MemoryRowStore::new())).build();

  let created = desk
    .create_order(NewOrder {
      customer_name: "Ayşe Yılmaz".to_string(),
      customer_phone: "+90 555 111 22 33".to_string(),
      address: Address::FreeText("Bahariye Cd. 12, Kadıköy".to_string()),
      device_type: "Laptop".to_string(),
      issue: "Does not power on".to_string(),
      ..NewOrder::default()
    })
    .await?;
  info!(
    receipt_code = %created.receipt_code,
    access_code = %created.access_code,
    document_url = ?created.document_url,
    "Order created."
  );

  loop {
    match desk.advance_status(&created.sequence_id).await? {
      Transition::Applied { from, order } => info!(%from, to = %order.status, "Advanced."),
      Transition::Unchanged { order } => {
        info!(status = %order.status, "Nothing left to advance.");
        break;
      }
      other => {
        info!(?other, "Advance refused.");
        break;
      }
    }
  }

  let view = desk.track(&created.receipt_code, &created.access_code).await?;
  info!(status = view.status_label, "Customer tracking view.");

  for role in [Role::Courier, Role::Technician, Role::Admin] {
    let listed = desk.list_for_role(role).await?.len();
    info!(%role, listed, "Visible orders.");
  }
  Ok(())
}
