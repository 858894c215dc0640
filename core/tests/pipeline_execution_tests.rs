// tests/pipeline_execution_tests.rs
mod common;

use common::*;
use repairdesk::pipeline::SkipCondition;
use repairdesk::{ContextData, Pipeline, PipelineControl, PipelineError, PipelineResult, StepPolicy};
use serial_test::serial;
use std::sync::Arc;

const REQUIRED: StepPolicy = StepPolicy::Required;
const BEST_EFFORT: StepPolicy = StepPolicy::BestEffort;

#[tokio::test]
#[serial]
async fn test_pipeline_runs_steps_in_order() {
  setup_tracing();
  let mut pipeline =
    Pipeline::<TestContext, TestError>::new(&[("step1", REQUIRED, None), ("step2", REQUIRED, None), ("step3", REQUIRED, None)]);

  pipeline.on_root("step1", create_simple_handler("step1", " S1"));
  pipeline.on_root("step2", create_simple_handler("step2", " S2"));
  pipeline.on_root("step3", create_simple_handler("step3", " S3"));

  let ctx = ContextData::new(TestContext::default());
  let report = pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(report.result, PipelineResult::Completed);
  assert_eq!(report.executed, vec!["step1", "step2", "step3"]);
  assert!(!report.is_degraded());

  let guard = ctx.read();
  assert_eq!(guard.counter, 3);
  assert_eq!(guard.message, " S1 S2 S3");
}

#[tokio::test]
#[serial]
async fn test_pipeline_stops_on_pipeline_control_stop() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("stepA", REQUIRED, None),
    ("stopStep", REQUIRED, None),
    ("stepC", REQUIRED, None),
  ]);

  pipeline.on_root("stepA", create_simple_handler("stepA", "A"));
  pipeline.on_root("stopStep", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push("stopStep".to_string());
      Ok::<PipelineControl, TestError>(PipelineControl::Stop)
    })
  });
  pipeline.on_root("stepC", create_simple_handler("stepC", "C"));

  let ctx = ContextData::new(TestContext::default());
  let report = pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(report.result, PipelineResult::Stopped);
  let guard = ctx.read();
  assert_eq!(guard.message, "A");
  assert_eq!(guard.steps_executed, vec!["stepA", "stopStep"]);
}

#[tokio::test]
#[serial]
async fn test_required_step_failure_aborts_run() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("good_step", REQUIRED, None),
    ("bad_step", REQUIRED, None),
    ("another_step", BEST_EFFORT, None),
  ]);

  pipeline.on_root("good_step", create_simple_handler("good_step", "Good"));
  pipeline.on_root("bad_step", create_failing_handler("bad_step", "I am a bad step!"));
  pipeline.on_root("another_step", create_simple_handler("another_step", "NeverRun"));

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap_err(), TestError::Handler("I am a bad step!".to_string()));
  let guard = ctx.read();
  assert_eq!(guard.message, "Good");
  assert_eq!(guard.steps_executed, vec!["good_step", "bad_step"]);
}

#[tokio::test]
#[serial]
async fn test_best_effort_failure_is_recorded_and_run_continues() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("commit", REQUIRED, None),
    ("flaky", BEST_EFFORT, None),
    ("tail", BEST_EFFORT, None),
  ]);

  pipeline.on_root("commit", create_simple_handler("commit", "C"));
  pipeline.on_root("flaky", create_failing_handler("flaky", "upstream down"));
  pipeline.after_root("flaky", create_simple_handler("flaky_after", "NeverRun"));
  pipeline.on_root("tail", create_simple_handler("tail", "T"));

  let ctx = ContextData::new(TestContext::default());
  let report = pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(report.result, PipelineResult::Completed);
  assert_eq!(report.executed, vec!["commit", "flaky", "tail"]);
  let degraded = report.degraded_step("flaky").unwrap();
  assert!(degraded.error.contains("upstream down"));
  assert_eq!(ctx.read().message, "CT");
  assert_eq!(ctx.read().steps_executed, vec!["commit", "flaky", "tail"]);
}

#[tokio::test]
#[serial]
async fn test_pipeline_skips_step_if_condition_met() {
  setup_tracing();
  let skip_when_counted: SkipCondition<TestContext> = Arc::new(|ctx: &TestContext| ctx.counter > 0);
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("step1", REQUIRED, None),
    ("step_to_skip", REQUIRED, Some(skip_when_counted)),
    ("step3", REQUIRED, None),
  ]);

  pipeline.on_root("step1", create_simple_handler("step1", " S1"));
  pipeline.on_root("step_to_skip", create_simple_handler("step_to_skip", " SKIPPED_THIS"));
  pipeline.on_root("step3", create_simple_handler("step3", " S3"));

  let ctx = ContextData::new(TestContext::default());
  let report = pipeline.run(ctx.clone()).await.unwrap();

  assert_eq!(report.skipped, vec!["step_to_skip"]);
  assert_eq!(ctx.read().message, " S1 S3");
}

#[tokio::test]
#[serial]
async fn test_required_step_missing_handler_fails() {
  setup_tracing();
  let pipeline = Pipeline::<TestContext, TestError>::new(&[("step_with_no_handler", REQUIRED, None)]);

  let result = pipeline.run(ContextData::new(TestContext::default())).await;

  match result {
    Err(TestError::Pipeline(s)) => {
      assert!(s.contains("HandlerMissing"));
      assert!(s.contains("step_with_no_handler"));
    }
    other => panic!("Expected HandlerMissing, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_best_effort_step_missing_handler_is_skipped() {
  setup_tracing();
  let pipeline = Pipeline::<TestContext, TestError>::new(&[("optional_step_no_handler", BEST_EFFORT, None)]);

  let report = pipeline.run(ContextData::new(TestContext::default())).await.unwrap();

  assert_eq!(report.result, PipelineResult::Completed);
  assert_eq!(report.skipped, vec!["optional_step_no_handler"]);
}

#[tokio::test]
#[serial]
async fn test_before_on_after_execution_order() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("main_step", REQUIRED, None)]);

  pipeline.before_root("main_step", create_simple_handler("before_main", "Before;"));
  pipeline.on_root("main_step", create_simple_handler("on_main", "On;"));
  pipeline.after_root("main_step", create_simple_handler("after_main", "After;"));

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();

  let guard = ctx.read();
  assert_eq!(guard.message, "Before;On;After;");
  assert_eq!(guard.steps_executed, vec!["before_main", "on_main", "after_main"]);
}

#[tokio::test]
#[serial]
async fn test_step_mutation() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("a", REQUIRED, None), ("c", REQUIRED, None)]);
  pipeline.insert_after_step("a", "b", BEST_EFFORT, None).unwrap();
  pipeline.insert_before_step("a", "start", REQUIRED, None).unwrap();
  assert_eq!(pipeline.step_names(), vec!["start", "a", "b", "c"]);

  assert!(matches!(
    pipeline.insert_after_step("missing", "x", REQUIRED, None),
    Err(PipelineError::StepNotFound { .. })
  ));

  pipeline.set_policy("c", BEST_EFFORT).unwrap();
  assert_eq!(pipeline.step("c").unwrap().policy, BEST_EFFORT);

  pipeline.remove_step("start");
  pipeline.remove_step("never_existed");
  for name in ["a", "b", "c"] {
    pipeline.on_root(name, create_simple_handler(name, name));
  }

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().message, "abc");
}

#[test]
#[should_panic(expected = "not found in pipeline definition")]
fn test_registering_handler_for_unknown_step_panics() {
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("only", REQUIRED, None)]);
  pipeline.on_root("typo", create_simple_handler("typo", ""));
}
