// repairdesk/src/pipeline/control.rs

//! Flow-control signals returned by handlers and the report produced by a run.

use serde::Serialize;

/// Signal from a handler indicating whether the pipeline should continue or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  Continue,
  /// Halt the run. No further handlers in this step or later steps execute.
  Stop,
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  Completed,
  Stopped,
}

/// A best-effort step whose handler failed. The run carried on past it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DegradedStep {
  pub name: String,
  pub error: String,
}

/// Outcome of `Pipeline::run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
  pub result: PipelineResult,
  pub executed: Vec<String>,
  pub skipped: Vec<String>,
  pub degraded: Vec<DegradedStep>,
}

impl RunReport {
  pub(crate) fn new() -> Self {
    Self {
      result: PipelineResult::Completed,
      executed: Vec::new(),
      skipped: Vec::new(),
      degraded: Vec::new(),
    }
  }

  pub fn is_degraded(&self) -> bool {
    !self.degraded.is_empty()
  }

  pub fn degraded_step(&self, name: &str) -> Option<&DegradedStep> {
    self.degraded.iter().find(|d| d.name == name)
  }
}
