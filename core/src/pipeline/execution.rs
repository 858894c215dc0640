// repairdesk/src/pipeline/execution.rs

//! `Pipeline::run()`: executes steps in order and applies each step's policy
//! to handler failures.

use crate::pipeline::context_data::ContextData;
use crate::pipeline::control::{DegradedStep, PipelineControl, PipelineResult, RunReport};
use crate::pipeline::definition::{Handler, Pipeline};
use crate::pipeline::error::PipelineError;
use crate::pipeline::step::StepPolicy;
use tracing::{event, instrument, span, Instrument, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  /// Executes the pipeline against `ctx_data`.
  ///
  /// Steps run one at a time in declaration order. A failing handler in a
  /// required step aborts the run with that error. A failing handler in a
  /// best-effort step ends that step only; the failure is recorded in
  /// [`RunReport::degraded`] and the next step runs.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      pipeline_context_data_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<RunReport, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");
    let mut report = RunReport::new();

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();
      let step_span = span!(
        Level::INFO,
        "pipeline_step",
        step_name = step_name,
        step_index = step_idx,
        policy = ?step_def.policy
      );

      if step_def.should_skip(&ctx_data) {
        event!(parent: &step_span, Level::DEBUG, "Step skipped due to 'skip_if' condition.");
        report.skipped.push(step_def.name.clone());
        continue;
      }

      let has_handlers = [&self.before, &self.on, &self.after]
        .iter()
        .any(|phase| phase.get(step_name).is_some_and(|v| !v.is_empty()));

      if !has_handlers {
        match step_def.policy {
          StepPolicy::BestEffort => {
            event!(parent: &step_span, Level::DEBUG, "Best-effort step has no handlers, skipping.");
            report.skipped.push(step_def.name.clone());
            continue;
          }
          StepPolicy::Required => {
            event!(parent: &step_span, Level::ERROR, "Required step has no handlers.");
            return Err(Err::from(PipelineError::HandlerMissing {
              step_name: step_def.name.clone(),
            }));
          }
        }
      }

      let outcome = self
        .run_step_phases(step_name, &ctx_data)
        .instrument(step_span.clone())
        .await;
      report.executed.push(step_def.name.clone());

      match outcome {
        Ok(PipelineControl::Continue) => {
          event!(parent: &step_span, Level::DEBUG, "Step finished.");
        }
        Ok(PipelineControl::Stop) => {
          event!(parent: &step_span, Level::INFO, "Pipeline stopped by a handler.");
          report.result = PipelineResult::Stopped;
          return Ok(report);
        }
        Err(e) => match step_def.policy {
          StepPolicy::Required => {
            event!(parent: &step_span, Level::ERROR, error = %e, "Required step failed.");
            return Err(e);
          }
          StepPolicy::BestEffort => {
            event!(parent: &step_span, Level::WARN, error = %e, "Best-effort step failed, continuing.");
            report.degraded.push(DegradedStep {
              name: step_def.name.clone(),
              error: e.to_string(),
            });
          }
        },
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(report)
  }

  async fn run_step_phases(&self, step_name: &str, ctx_data: &ContextData<TData>) -> Result<PipelineControl, Err> {
    for (phase_name, phase) in [("before", &self.before), ("on", &self.on), ("after", &self.after)] {
      if let Some(handlers) = phase.get(step_name) {
        if Self::run_handlers(phase_name, handlers, ctx_data).await? == PipelineControl::Stop {
          return Ok(PipelineControl::Stop);
        }
      }
    }
    Ok(PipelineControl::Continue)
  }

  async fn run_handlers(
    phase_name: &'static str,
    handlers: &[Handler<TData, Err>],
    ctx_data: &ContextData<TData>,
  ) -> Result<PipelineControl, Err> {
    for (handler_idx, handler_fn) in handlers.iter().enumerate() {
      event!(Level::TRACE, phase = phase_name, handler_index = handler_idx, "Executing handler.");
      if handler_fn(ctx_data.clone()).await? == PipelineControl::Stop {
        return Ok(PipelineControl::Stop);
      }
    }
    Ok(PipelineControl::Continue)
  }
}
