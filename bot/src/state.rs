// src/state.rs

use crate::config::BotConfig;
use crate::errors::BotError;
use crate::services::activation_store::ActivationStore;
use crate::services::order_locks::OrderLocks;
use crate::services::order_store::OrderStore;
use flow::FlowRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn OrderStore>,
  pub flows: Arc<FlowRegistry<BotError>>,
  pub config: Arc<BotConfig>,
  pub activations: Arc<ActivationStore>,
  pub order_locks: Arc<OrderLocks>,
}

impl AppState {
  /// Fresh state with an empty flow registry; see
  /// [`crate::pipelines::register_all_flows`].
  pub fn new(store: Arc<dyn OrderStore>, config: BotConfig) -> Self {
    let activations = Arc::new(ActivationStore::new(config.activation_ttl));
    Self {
      store,
      flows: Arc::new(FlowRegistry::new()),
      config: Arc::new(config),
      activations,
      order_locks: Arc::new(OrderLocks::new()),
    }
  }
}
