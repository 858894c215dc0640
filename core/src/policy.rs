// repairdesk/src/policy.rs

//! Who may do what to an order in a given status, and which out-of-sequence
//! transitions are legal at all.

use crate::status::{next_of, Status};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Courier,
  Technician,
  /// Admin and dispatch share one view.
  #[serde(alias = "dispatch")]
  Admin,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Role::Courier => "courier",
      Role::Technician => "technician",
      Role::Admin => "admin",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
  type Err = UnknownRole;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "courier" => Ok(Role::Courier),
      "technician" => Ok(Role::Technician),
      "admin" | "dispatch" => Ok(Role::Admin),
      other => Err(UnknownRole(other.to_string())),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
  View,
  Advance,
  Approve,
  Return,
  CompleteReturn,
  Cancel,
}

/// Reason codes accepted when an order enters the return branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnReason {
  NoParts,
  CustomerDeclined,
  NotRepairable,
  CostTooHigh,
  Other,
}

impl ReturnReason {
  pub const ALL: [ReturnReason; 5] = [
    ReturnReason::NoParts,
    ReturnReason::CustomerDeclined,
    ReturnReason::NotRepairable,
    ReturnReason::CostTooHigh,
    ReturnReason::Other,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      ReturnReason::NoParts => "no_parts",
      ReturnReason::CustomerDeclined => "customer_declined",
      ReturnReason::NotRepairable => "not_repairable",
      ReturnReason::CostTooHigh => "cost_too_high",
      ReturnReason::Other => "other",
    }
  }
}

impl fmt::Display for ReturnReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown return reason '{0}'")]
pub struct UnknownReturnReason(pub String);

impl FromStr for ReturnReason {
  type Err = UnknownReturnReason;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    ReturnReason::ALL
      .iter()
      .copied()
      .find(|reason| reason.as_str() == s.trim())
      .ok_or_else(|| UnknownReturnReason(s.to_string()))
  }
}

// --- Visibility ---

const COURIER_STATES: &[Status] = &[
  Status::PendingPickup,
  Status::PickedUp,
  Status::RepairedWaitingDelivery,
  Status::DeliveredSuccess,
  Status::ReturnWaitingDelivery,
  Status::ReturnDelivered,
];

const TECHNICIAN_STATES: &[Status] = &[
  Status::PickedUp,
  Status::Checking,
  Status::CheckedWaitingApproval,
  Status::ApprovedRepairing,
];

/// Statuses from which each role may use the linear "advance".
fn advances_for(role: Role, status: Status) -> bool {
  match role {
    // Picks the device up, and delivers it back once repaired.
    Role::Courier => matches!(status, Status::PendingPickup | Status::RepairedWaitingDelivery),
    // Starts and finishes inspection, finishes repair.
    Role::Technician => matches!(
      status,
      Status::PickedUp | Status::Checking | Status::ApprovedRepairing
    ),
    Role::Admin => true,
  }
}

pub fn is_visible(role: Role, status: Status) -> bool {
  match role {
    Role::Courier => COURIER_STATES.contains(&status),
    Role::Technician => TECHNICIAN_STATES.contains(&status),
    Role::Admin => true,
  }
}

/// The actions a role is offered for an order in `status`.
///
/// An empty set means the order is not visible to that role at all.
pub fn allowed_actions(role: Role, status: Status) -> BTreeSet<Action> {
  let mut actions = BTreeSet::new();
  if !is_visible(role, status) {
    return actions;
  }
  actions.insert(Action::View);

  if next_of(status).is_some() && advances_for(role, status) {
    actions.insert(Action::Advance);
  }

  for rule in FORCED_TRANSITIONS {
    if rule.roles.contains(&role) && rule.sources.contains(&status) {
      actions.insert(rule.action);
    }
  }
  actions
}

// --- Forced transitions ---

/// One legal out-of-sequence transition.
#[derive(Debug)]
pub struct ForcedTransitionRule {
  pub action: Action,
  pub target: Status,
  pub sources: &'static [Status],
  pub roles: &'static [Role],
  pub requires_reason: bool,
}

const CANCELABLE: &[Status] = &[
  Status::PendingPickup,
  Status::PickedUp,
  Status::Checking,
  Status::CheckedWaitingApproval,
  Status::ApprovedRepairing,
  Status::RepairedWaitingDelivery,
];

pub const FORCED_TRANSITIONS: &[ForcedTransitionRule] = &[
  ForcedTransitionRule {
    action: Action::Approve,
    target: Status::ApprovedRepairing,
    sources: &[Status::CheckedWaitingApproval],
    roles: &[Role::Technician, Role::Admin],
    requires_reason: false,
  },
  ForcedTransitionRule {
    action: Action::Return,
    target: Status::ReturnWaitingDelivery,
    sources: &[Status::CheckedWaitingApproval],
    roles: &[Role::Technician, Role::Admin],
    requires_reason: true,
  },
  ForcedTransitionRule {
    action: Action::CompleteReturn,
    target: Status::ReturnDelivered,
    sources: &[Status::ReturnWaitingDelivery],
    roles: &[Role::Courier, Role::Admin],
    requires_reason: false,
  },
  ForcedTransitionRule {
    action: Action::Cancel,
    target: Status::Canceled,
    sources: CANCELABLE,
    roles: &[Role::Admin],
    requires_reason: false,
  },
];

pub fn forced_rule_for(target: Status) -> Option<&'static ForcedTransitionRule> {
  FORCED_TRANSITIONS.iter().find(|rule| rule.target == target)
}

/// Why a forced transition was refused. Nothing is written in any of these cases.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionRefusal {
  #[error("'{target}' cannot be reached by a forced transition")]
  UnsupportedTarget { target: Status },

  #[error("order is '{current}', but '{target}' requires one of {required:?}")]
  WrongSource {
    current: Status,
    target: Status,
    required: &'static [Status],
  },

  #[error("moving to '{target}' requires a return reason")]
  MissingReason { target: Status },
}

/// Checks a forced transition against the table. Pure; performs no I/O.
pub fn check_forced(
  current: Status,
  target: Status,
  reason: Option<ReturnReason>,
) -> Result<&'static ForcedTransitionRule, TransitionRefusal> {
  let rule = forced_rule_for(target).ok_or(TransitionRefusal::UnsupportedTarget { target })?;
  if !rule.sources.contains(&current) {
    return Err(TransitionRefusal::WrongSource {
      current,
      target,
      required: rule.sources,
    });
  }
  if rule.requires_reason && reason.is_none() {
    return Err(TransitionRefusal::MissingReason { target });
  }
  Ok(rule)
}
