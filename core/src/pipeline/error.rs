// repairdesk/src/pipeline/error.rs
use thiserror::Error;

/// Errors raised by the pipeline engine itself, as opposed to the handlers it runs.
#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for required step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Internal pipeline error: {0}")]
  Internal(String),
}
