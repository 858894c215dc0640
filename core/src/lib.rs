// src/lib.rs

//! repairdesk: lifecycle engine for device-repair orders.
//!
//! An order moves through a fixed status flow (pickup, inspection, approval,
//! repair, delivery) with a return branch and cancellation. This crate provides:
//!  - The status state machine and the per-role action policy.
//!  - A step pipeline engine with required and best-effort steps.
//!  - The order-creation pipeline: identifiers, durable append, receipt PDF,
//!    document upload with retry, customer notification.
//!  - A row-store adapter that owns the column layout.
//!
//! External collaborators (row store, document storage, messaging) are traits;
//! in-memory implementations ship with the crate.

pub mod codes;
pub mod config;
pub mod desk;
pub mod error;
pub mod notify;
pub mod order;
pub mod pipeline;
pub mod policy;
pub mod receipt;
pub mod status;
pub mod store;
pub mod upload;

// --- Re-exports for the Public API ---

pub use crate::pipeline::{
  ContextData, DegradedStep, Pipeline, PipelineControl, PipelineError, PipelineResult, RunReport, StepPolicy,
};

pub use crate::config::{DeskConfig, RetryPolicy};
pub use crate::desk::contexts::CreatedOrder;
pub use crate::desk::{OrderDesk, OrderDeskBuilder, OrderListing, Transition};
pub use crate::error::{DeskError, DeskResult};
pub use crate::order::{Address, NewOrder, Order, StructuredAddress, TrackingView, TransitionMetadata};
pub use crate::policy::{allowed_actions, Action, ReturnReason, Role, TransitionRefusal};
pub use crate::status::{next_of, normalize, Status};
pub use crate::store::{MemoryRowStore, OrderStore, RowStore};
