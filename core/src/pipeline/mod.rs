// repairdesk/src/pipeline/mod.rs

//! A small, ordered step pipeline.
//!
//! Each step has `before`, `on` and `after` handlers operating on a shared
//! [`ContextData`]. Steps run strictly one after another; a handler's future is
//! awaited to completion before the next handler starts. Steps are either
//! [`StepPolicy::Required`] (failure aborts the run) or
//! [`StepPolicy::BestEffort`] (failure is logged, recorded and skipped past).

pub mod context_data;
pub mod control;
pub mod definition;
pub mod error;
pub mod execution;
pub mod hooks;
pub mod step;

pub use context_data::ContextData;
pub use control::{DegradedStep, PipelineControl, PipelineResult, RunReport};
pub use definition::{Handler, Pipeline};
pub use error::PipelineError;
pub use step::{SkipCondition, StepDef, StepPolicy};
