// src/flow/execution.rs

use crate::core::context_data::ContextData;
use crate::core::control::{FlowControl, FlowOutcome};
use crate::core::handler::Handler;
use crate::error::FlowError;
use crate::flow::definition::Flow;
use tracing::{event, instrument, span, Instrument, Level};

impl<TData, Err> Flow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step in order against `ctx_data`.
  ///
  /// A step is passed over when its skip condition holds, or when it is
  /// optional and has no handlers. A required step without handlers fails
  /// the run with [`FlowError::HandlerMissing`]. The first handler error
  /// ends the run and is returned as is.
  #[instrument(
    name = "Flow::run",
    skip_all,
    fields(
      flow = %self.name,
      context_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<FlowOutcome, Err> {
    event!(Level::DEBUG, "Flow run starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if let Some(skip_if) = &step_def.skip_if {
        if skip_if(ctx_data.clone()) {
          event!(Level::DEBUG, step = step_name, "Step skipped by its condition.");
          continue;
        }
      }

      let phases = [
        ("before", self.before.get(step_name)),
        ("on", self.on.get(step_name)),
        ("after", self.after.get(step_name)),
      ];
      let has_handlers = phases.iter().any(|(_, h)| h.map_or(false, |v| !v.is_empty()));

      if !has_handlers {
        if step_def.optional {
          event!(Level::DEBUG, step = step_name, "Optional step has no handlers, passing over it.");
          continue;
        }
        event!(Level::ERROR, step = step_name, "Required step has no handlers.");
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      let step_span = span!(
        Level::INFO,
        "flow_step",
        step = step_name,
        step_index = step_idx,
        optional = step_def.optional
      );

      for (phase, handlers) in phases {
        let Some(handlers) = handlers else { continue };
        if let Some(outcome) = run_phase(handlers, phase, &ctx_data).instrument(step_span.clone()).await? {
          return Ok(outcome);
        }
      }
    }

    event!(Level::DEBUG, "Flow run completed.");
    Ok(FlowOutcome::Completed)
  }
}

/// Runs one phase of a step. `Some(Stopped)` means a handler asked to stop.
async fn run_phase<TData, Err>(
  handlers: &[Handler<TData, Err>],
  phase: &'static str,
  ctx_data: &ContextData<TData>,
) -> Result<Option<FlowOutcome>, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  for (handler_idx, handler_fn) in handlers.iter().enumerate() {
    match handler_fn(ctx_data.clone()).await {
      Ok(FlowControl::Continue) => {}
      Ok(FlowControl::Stop) => {
        event!(Level::INFO, phase, handler_index = handler_idx, "Flow stopped by handler.");
        return Ok(Some(FlowOutcome::Stopped));
      }
      Err(e) => {
        event!(Level::ERROR, phase, handler_index = handler_idx, error = %e, "Handler failed.");
        return Err(e);
      }
    }
  }
  Ok(None)
}
