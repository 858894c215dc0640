// repairdesk/src/status.rs

//! The fixed repair-order lifecycle.
//!
//! ```text
//! pending_pickup -> picked_up -> checking -> checked_waiting_approval
//!   -> approved_repairing -> repaired_waiting_delivery -> delivered_success
//!
//! checked_waiting_approval -> return_waiting_delivery -> return_delivered
//! (any non-terminal)       -> canceled
//! ```
//!
//! Only the top line is reachable with [`next_of`]. The return branch and
//! cancellation are reached through forced transitions (see [`crate::policy`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
  PendingPickup,
  PickedUp,
  Checking,
  CheckedWaitingApproval,
  ApprovedRepairing,
  RepairedWaitingDelivery,
  DeliveredSuccess,
  Canceled,
  ReturnWaitingDelivery,
  ReturnDelivered,
}

/// The linear "happy path".
pub const FLOW: [Status; 7] = [
  Status::PendingPickup,
  Status::PickedUp,
  Status::Checking,
  Status::CheckedWaitingApproval,
  Status::ApprovedRepairing,
  Status::RepairedWaitingDelivery,
  Status::DeliveredSuccess,
];

impl Status {
  pub const ALL: [Status; 10] = [
    Status::PendingPickup,
    Status::PickedUp,
    Status::Checking,
    Status::CheckedWaitingApproval,
    Status::ApprovedRepairing,
    Status::RepairedWaitingDelivery,
    Status::DeliveredSuccess,
    Status::Canceled,
    Status::ReturnWaitingDelivery,
    Status::ReturnDelivered,
  ];

  /// Canonical identifier, as written to the store.
  pub fn as_str(self) -> &'static str {
    match self {
      Status::PendingPickup => "pending_pickup",
      Status::PickedUp => "picked_up",
      Status::Checking => "checking",
      Status::CheckedWaitingApproval => "checked_waiting_approval",
      Status::ApprovedRepairing => "approved_repairing",
      Status::RepairedWaitingDelivery => "repaired_waiting_delivery",
      Status::DeliveredSuccess => "delivered_success",
      Status::Canceled => "canceled",
      Status::ReturnWaitingDelivery => "return_waiting_delivery",
      Status::ReturnDelivered => "return_delivered",
    }
  }

  /// Customer-facing label.
  pub fn label(self) -> &'static str {
    match self {
      Status::PendingPickup => "Waiting for courier pickup",
      Status::PickedUp => "Picked up by courier",
      Status::Checking => "Inspection in progress",
      Status::CheckedWaitingApproval => "Inspected, waiting for your approval",
      Status::ApprovedRepairing => "Approved, repair in progress",
      Status::RepairedWaitingDelivery => "Repaired, waiting for delivery",
      Status::DeliveredSuccess => "Delivered",
      Status::Canceled => "Canceled",
      Status::ReturnWaitingDelivery => "Being returned, waiting for delivery",
      Status::ReturnDelivered => "Returned to customer",
    }
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a canonical status")]
pub struct UnknownStatus(pub String);

/// Strict parsing: canonical identifiers only. Use [`normalize`] for legacy data.
impl FromStr for Status {
  type Err = UnknownStatus;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Status::ALL
      .iter()
      .copied()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| UnknownStatus(s.to_string()))
  }
}

/// Next state on the linear flow, or `None` when the order cannot be advanced:
/// `delivered_success`, `canceled`, and the return branch.
pub fn next_of(status: Status) -> Option<Status> {
  let idx = FLOW.iter().position(|s| *s == status)?;
  FLOW.get(idx + 1).copied()
}

/// Status assigned to any value nothing else recognizes.
pub const FALLBACK_STATUS: Status = Status::PickedUp;

/// Exact legacy phrases, compared after trimming and lowercasing.
const LEGACY_PHRASES: &[(&str, Status)] = &[
  ("pending pickup", Status::PendingPickup),
  ("waiting for pickup", Status::PendingPickup),
  ("new", Status::PendingPickup),
  ("kurye bekleniyor", Status::PendingPickup),
  ("teslim alınacak", Status::PendingPickup),
  ("alım bekleniyor", Status::PendingPickup),
  ("yeni kayıt", Status::PendingPickup),
  ("picked up", Status::PickedUp),
  ("received", Status::PickedUp),
  ("teslim alındı", Status::PickedUp),
  ("cihaz alındı", Status::PickedUp),
  ("checking", Status::Checking),
  ("under inspection", Status::Checking),
  ("inceleniyor", Status::Checking),
  ("arıza tespiti yapılıyor", Status::Checking),
  ("kontrol ediliyor", Status::Checking),
  ("awaiting approval", Status::CheckedWaitingApproval),
  ("waiting for approval", Status::CheckedWaitingApproval),
  ("onay bekleniyor", Status::CheckedWaitingApproval),
  ("kontrol edildi - onay bekliyor", Status::CheckedWaitingApproval),
  ("repairing", Status::ApprovedRepairing),
  ("in repair", Status::ApprovedRepairing),
  ("onaylandı - tamir ediliyor", Status::ApprovedRepairing),
  ("tamirde", Status::ApprovedRepairing),
  ("ready for delivery", Status::RepairedWaitingDelivery),
  ("tamir edildi - teslimat bekliyor", Status::RepairedWaitingDelivery),
  ("teslimata hazır", Status::RepairedWaitingDelivery),
  ("delivered", Status::DeliveredSuccess),
  ("completed", Status::DeliveredSuccess),
  ("teslim edildi", Status::DeliveredSuccess),
  ("tamamlandı", Status::DeliveredSuccess),
  ("canceled", Status::Canceled),
  ("cancelled", Status::Canceled),
  ("iptal", Status::Canceled),
  ("iptal edildi", Status::Canceled),
  ("return pending", Status::ReturnWaitingDelivery),
  ("iade - teslimat bekliyor", Status::ReturnWaitingDelivery),
  ("iade bekliyor", Status::ReturnWaitingDelivery),
  ("returned", Status::ReturnDelivered),
  ("iade edildi", Status::ReturnDelivered),
  ("iade teslim edildi", Status::ReturnDelivered),
];

const RETURN_TOKENS: &[&str] = &["iade", "return"];
const CANCEL_TOKENS: &[&str] = &["iptal", "cancel"];
const INSPECTION_TOKENS: &[&str] = &["kontrol", "tespit", "incele", "inspect", "check", "diagnos"];
const REPAIR_TOKENS: &[&str] = &["tamir", "onar", "repair"];
const PICKUP_TOKENS: &[&str] = &["alındı", "alindi", "pickup", "pick up", "picked", "kurye", "courier"];
const DONE_TOKENS: &[&str] = &["edildi", "yapıldı", "tamamlandı", "bitti", "done", "completed", "finished", "repaired"];
const DELIVERED_TOKENS: &[&str] = &["teslim edildi", "delivered", "ulaştı", "iade edildi", "returned to customer"];
const WAITING_TOKENS: &[&str] = &["bekl", "wait", "pending"];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
  needles.iter().any(|needle| haystack.contains(fold(needle).as_str()))
}

/// Case-folds for comparison. Turkish dotted and dotless i both fold to a plain
/// `i`, so "İADE", "IADE" and "iade", or "alındı" and "ALINDI", compare equal.
fn fold(raw: &str) -> String {
  raw.trim().replace('İ', "i").to_lowercase().replace('ı', "i").replace("i\u{307}", "i")
}

/// Resolves a stored status value to a canonical [`Status`].
///
/// Resolution order: canonical id, then the legacy phrase dictionary and the
/// display labels, then substring heuristics. Anything unrecognized becomes [`FALLBACK_STATUS`].
/// This never fails; use it only where rows are read from the store.
pub fn normalize(raw: &str) -> Status {
  let trimmed = raw.trim();
  if let Ok(status) = trimmed.parse::<Status>() {
    return status;
  }

  let folded = fold(trimmed);
  if let Some((_, status)) = LEGACY_PHRASES.iter().find(|(phrase, _)| fold(phrase) == folded) {
    return *status;
  }

  // Display labels, as written back by hand from the tracking page.
  if let Some(status) = Status::ALL.iter().copied().find(|status| fold(status.label()) == folded) {
    return status;
  }

  // Canonical ids with different casing or spacing, e.g. "Picked_Up".
  let underscored = folded.replace([' ', '-'], "_");
  if let Ok(status) = underscored.parse::<Status>() {
    return status;
  }

  heuristic(&folded).unwrap_or(FALLBACK_STATUS)
}

fn heuristic(folded: &str) -> Option<Status> {
  if contains_any(folded, RETURN_TOKENS) {
    return Some(if contains_any(folded, DELIVERED_TOKENS) {
      Status::ReturnDelivered
    } else {
      Status::ReturnWaitingDelivery
    });
  }
  if contains_any(folded, CANCEL_TOKENS) {
    return Some(Status::Canceled);
  }
  if contains_any(folded, INSPECTION_TOKENS) {
    return Some(if contains_any(folded, DONE_TOKENS) || contains_any(folded, &["onay", "approv"]) {
      Status::CheckedWaitingApproval
    } else {
      Status::Checking
    });
  }
  if contains_any(folded, REPAIR_TOKENS) {
    return Some(if contains_any(folded, DONE_TOKENS) {
      Status::RepairedWaitingDelivery
    } else {
      Status::ApprovedRepairing
    });
  }
  if contains_any(folded, DELIVERED_TOKENS) {
    return Some(Status::DeliveredSuccess);
  }
  if contains_any(folded, PICKUP_TOKENS) {
    return Some(if contains_any(folded, WAITING_TOKENS) {
      Status::PendingPickup
    } else {
      Status::PickedUp
    });
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn next_of_walks_the_flow() {
    for pair in FLOW.windows(2) {
      assert_eq!(next_of(pair[0]), Some(pair[1]));
    }
  }

  #[test]
  fn next_of_refuses_terminal_and_side_branches() {
    assert_eq!(next_of(Status::DeliveredSuccess), None);
    assert_eq!(next_of(Status::Canceled), None);
    assert_eq!(next_of(Status::ReturnWaitingDelivery), None);
    assert_eq!(next_of(Status::ReturnDelivered), None);
  }

  #[test]
  fn strict_parse_rejects_legacy_text() {
    assert_eq!("checking".parse::<Status>(), Ok(Status::Checking));
    assert!("Teslim Alındı".parse::<Status>().is_err());
  }

  #[test]
  fn canonical_ids_round_trip_through_normalize() {
    for status in Status::ALL {
      assert_eq!(normalize(status.as_str()), status);
    }
  }

  #[test]
  fn labels_round_trip_through_normalize() {
    for status in Status::ALL {
      assert_eq!(normalize(status.label()), status, "label {:?}", status.label());
    }
    assert_eq!(normalize("Returned to customer on Monday"), Status::ReturnDelivered);
    assert_eq!(normalize("Cihaz iade edildi"), Status::ReturnDelivered);
  }

  #[test]
  fn dictionary_phrases_resolve_regardless_of_case() {
    for (phrase, expected) in LEGACY_PHRASES {
      assert_eq!(normalize(phrase), *expected, "phrase {phrase:?}");
      assert_eq!(normalize(&phrase.to_uppercase()), *expected, "upper {phrase:?}");
    }
    assert_eq!(normalize("  Teslim Alındı "), Status::PickedUp);
    assert_eq!(normalize("İptal Edildi"), Status::Canceled);
  }

  #[test]
  fn heuristics_cover_free_text() {
    assert_eq!(normalize("Arıza kontrolü yapılıyor"), Status::Checking);
    assert_eq!(normalize("Inspection in progress"), Status::Checking);
    assert_eq!(normalize("Inspection done"), Status::CheckedWaitingApproval);
    assert_eq!(normalize("İade - müşteriye teslim edildi"), Status::ReturnDelivered);
    assert_eq!(normalize("Return waiting for courier"), Status::ReturnWaitingDelivery);
    assert_eq!(normalize("Cihaz tamir edildi"), Status::RepairedWaitingDelivery);
    assert_eq!(normalize("Kuryeye verildi, alındı"), Status::PickedUp);
  }

  #[test]
  fn unknown_values_fall_back_without_failing() {
    for raw in ["", "   ", "???", "zzz", "12345", "\u{1F600}"] {
      assert_eq!(normalize(raw), FALLBACK_STATUS, "raw {raw:?}");
    }
  }
}
