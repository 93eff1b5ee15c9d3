// src/lib.rs

//! Step pipelines for the sfdesk bot workflows.
//!
//! A [`Flow`] is an ordered list of named steps. Each step can carry
//! `before`, `on` and `after` handlers which receive a shared
//! [`ContextData`] and decide whether the flow keeps going
//! ([`FlowControl::Continue`]) or ends early ([`FlowControl::Stop`]).
//! Steps may be optional or skipped by a predicate evaluated against the
//! context. A [`FlowRegistry`] keeps one flow per context type so callers
//! only need to hand over the context to run the right workflow.

pub mod core;
pub mod error;
pub mod flow;
pub mod registry;

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{FlowControl, FlowOutcome};
pub use crate::core::handler::Handler;
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::error::{FlowError, FlowResult};
pub use crate::flow::Flow;
pub use crate::registry::FlowRegistry;
