// src/core/control.rs

/// Returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
  Continue,
  /// Ends the flow right after the current handler. Remaining handlers of the
  /// step and all later steps are not run.
  Stop,
}

/// How a flow run ended when no handler failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
  /// Every step ran (or was skipped by its condition / optionality).
  Completed,
  /// A handler returned [`FlowControl::Stop`].
  Stopped,
}

