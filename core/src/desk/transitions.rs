// repairdesk/src/desk/transitions.rs

//! Status changes: linear advance and forced (out-of-sequence) transitions.
//!
//! Every change runs under the desk's write gate, reads the row fresh, and
//! writes through [`OrderStore::write_status`], which refuses if the row moved
//! in the meantime.

use super::{now_millis, OrderDesk};
use crate::error::{DeskError, DeskResult};
use crate::order::{Order, TransitionMetadata};
use crate::policy::{check_forced, TransitionRefusal};
use crate::status::{next_of, Status};
use crate::store::{OrderStore, StoredOrder, WriteOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Transition {
  /// The new status was written.
  Applied { from: Status, order: Order },
  /// Nothing to do (no next status); still a success.
  Unchanged { order: Order },
  /// Not a legal transition from the current status. Nothing was written.
  Rejected {
    current: Status,
    #[serde(serialize_with = "serialize_refusal")]
    refusal: TransitionRefusal,
  },
  /// The order changed after the caller (or this operation) read it. Nothing was written.
  Stale { current: Option<Order> },
}

fn serialize_refusal<S: serde::Serializer>(refusal: &TransitionRefusal, s: S) -> Result<S::Ok, S::Error> {
  s.collect_str(refusal)
}

impl Transition {
  pub fn is_ok(&self) -> bool {
    matches!(self, Transition::Applied { .. } | Transition::Unchanged { .. })
  }

  /// Status after the operation, when known.
  pub fn status(&self) -> Option<Status> {
    match self {
      Transition::Applied { order, .. } | Transition::Unchanged { order } => Some(order.status),
      Transition::Rejected { current, .. } => Some(*current),
      Transition::Stale { current } => current.as_ref().map(|o| o.status),
    }
  }
}

fn stale_against(stored: &StoredOrder, seen_updated_at: Option<DateTime<Utc>>) -> bool {
  seen_updated_at.is_some_and(|seen| seen != stored.order.updated_at)
}

async fn write(store: &OrderStore, stored: &StoredOrder, to: Status, metadata: &TransitionMetadata) -> DeskResult<Transition> {
  let from = stored.order.status;
  match store.write_status(stored, to, metadata, now_millis()).await? {
    WriteOutcome::Written(updated) => {
      info!(sequence_id = %updated.order.sequence_id, %from, %to, "Status changed.");
      Ok(Transition::Applied {
        from,
        order: updated.order,
      })
    }
    WriteOutcome::Stale { current } => Ok(Transition::Stale {
      current: current.map(|c| c.order),
    }),
  }
}

impl OrderDesk {
  async fn load(&self, sequence_id: &str) -> DeskResult<StoredOrder> {
    self
      .services
      .store
      .find_by_sequence_id(sequence_id)
      .await?
      .ok_or_else(|| DeskError::NotFound(format!("order {}", sequence_id)))
  }

  /// Moves the order one step along the main flow. Orders with no next status
  /// come back `Unchanged`.
  pub async fn advance_status(&self, sequence_id: &str) -> DeskResult<Transition> {
    self.advance(sequence_id, None).await
  }

  /// As [`OrderDesk::advance_status`], but only if the order's `updated_at`
  /// still equals `seen_updated_at`.
  pub async fn advance_status_if_unchanged(
    &self,
    sequence_id: &str,
    seen_updated_at: DateTime<Utc>,
  ) -> DeskResult<Transition> {
    self.advance(sequence_id, Some(seen_updated_at)).await
  }

  #[instrument(name = "desk::advance_status", skip(self))]
  async fn advance(&self, sequence_id: &str, seen_updated_at: Option<DateTime<Utc>>) -> DeskResult<Transition> {
    let _gate = self.services.write_gate.lock().await;
    let stored = self.load(sequence_id).await?;
    if stale_against(&stored, seen_updated_at) {
      warn!("Caller's view of the order is out of date.");
      return Ok(Transition::Stale {
        current: Some(stored.order),
      });
    }

    match next_of(stored.order.status) {
      None => Ok(Transition::Unchanged { order: stored.order }),
      Some(next) => write(&self.services.store, &stored, next, &TransitionMetadata::default()).await,
    }
  }

  /// Applies one of the legal out-of-sequence transitions, persisting
  /// `metadata` with the status. A return reason is kept only when the target
  /// requires one.
  #[instrument(name = "desk::force_transition", skip(self, metadata))]
  pub async fn force_transition(
    &self,
    sequence_id: &str,
    target: Status,
    metadata: TransitionMetadata,
    seen_updated_at: Option<DateTime<Utc>>,
  ) -> DeskResult<Transition> {
    let _gate = self.services.write_gate.lock().await;
    let stored = self.load(sequence_id).await?;
    if stale_against(&stored, seen_updated_at) {
      warn!("Caller's view of the order is out of date.");
      return Ok(Transition::Stale {
        current: Some(stored.order),
      });
    }

    let current = stored.order.status;
    let rule = match check_forced(current, target, metadata.return_reason) {
      Ok(rule) => rule,
      Err(refusal) => {
        warn!(%current, %target, %refusal, "Forced transition refused.");
        return Ok(Transition::Rejected { current, refusal });
      }
    };

    let mut metadata = metadata;
    if !rule.requires_reason {
      metadata.return_reason = None;
    }
    write(&self.services.store, &stored, target, &metadata).await
  }
}
