// src/pipelines/mod.rs

//! Flows behind every bot interaction, and their registration.

use crate::errors::BotError;
use flow::FlowRegistry;

pub mod contexts;

pub mod activation_pipeline;
pub mod esim_pipeline;
pub mod resolution_pipeline;
pub mod ticket_pipeline;
pub mod verify_pipeline;

/// Registers every flow. Called once at startup.
pub fn register_all_flows(registry: &FlowRegistry<BotError>) {
  tracing::info!("Registering flows...");

  ticket_pipeline::register_ticket_flow(registry);
  verify_pipeline::register_verify_flow(registry);
  esim_pipeline::register_esim_flow(registry);
  activation_pipeline::register_activation_flow(registry);
  resolution_pipeline::register_resolution_flow(registry);

  tracing::info!(flows = registry.len(), "All flows registered.");
}
