// src/core/handler.rs

use crate::core::context_data::ContextData;
use crate::core::control::FlowControl;
use std::future::Future;
use std::pin::Pin;

/// Boxed step handler stored by a [`crate::Flow`].
///
/// Handlers get their own clone of the shared context. Lock guards taken from
/// it must be released before the handler awaits anything.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<FlowControl, Err>> + Send>> + Send + Sync,
>;
