// tests/common/mod.rs
#![allow(dead_code)]

use flow::{ContextData, FlowControl, FlowError};
use once_cell::sync::Lazy;
use tracing::Level;

#[derive(Clone, Debug, Default)]
pub struct TicketTrail {
  pub visits: u32,
  pub notes: String,
  pub steps_run: Vec<String>,
  pub stop_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  // FlowError is not PartialEq, so keep its Debug text for assertions.
  #[error("flow error: {0}")]
  Flow(String),

  #[error("handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(err: FlowError) -> Self {
    TestError::Flow(format!("{:?}", err))
  }
}

/// Records the step, appends `note`, and stops if the context asks for it.
pub fn recording_handler(step: &'static str, note: &'static str) -> flow::Handler<TicketTrail, TestError> {
  Box::new(move |ctx: ContextData<TicketTrail>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.visits += 1;
      guard.notes.push_str(note);
      guard.steps_run.push(step.to_string());
      tracing::debug!(target: "test_handlers", step, visits = guard.visits, "handler ran");
      if guard.stop_at.as_deref() == Some(step) {
        return Ok(FlowControl::Stop);
      }
      Ok(FlowControl::Continue)
    })
  })
}

pub fn failing_handler(step: &'static str, message: &'static str) -> flow::Handler<TicketTrail, TestError> {
  Box::new(move |ctx: ContextData<TicketTrail>| {
    Box::pin(async move {
      ctx.write().steps_run.push(step.to_string());
      Err(TestError::Handler(message.to_string()))
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
