// src/pipelines/contexts.rs

//! Data carried through each flow. Handlers receive these wrapped in
//! `flow::ContextData`.

use crate::interaction::{InteractionResponder, Invoker};
use crate::models::{Order, OrderStatus, Product};
use crate::services::activation_store::ActivationKey;
use crate::services::guild_gateway::GuildGateway;
use crate::services::order_locks::OrderClaim;
use crate::services::order_store::CodeClaim;
use parking_lot::Mutex;
use crate::state::AppState;
use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use std::sync::Arc;

/// The guild member a ticket is opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketMember {
  pub guild_id: GuildId,
  pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
  NoPendingOrder,
  AlreadyOpen { order_id: i64, channel_id: ChannelId },
  MissingProduct { order_id: i64, product_id: i64 },
  Opened { order_id: i64, channel_id: ChannelId },
  Failed,
}

impl ReconcileOutcome {
  /// The ticket channel for the order, whether just created or found.
  pub fn ticket_channel(&self) -> Option<ChannelId> {
    match self {
      ReconcileOutcome::AlreadyOpen { channel_id, .. } | ReconcileOutcome::Opened { channel_id, .. } => {
        Some(*channel_id)
      }
      _ => None,
    }
  }
}

pub struct TicketCtxData {
  pub app_state: AppState,
  pub gateway: Arc<dyn GuildGateway>,
  pub member: TicketMember,
  pub customer_email: String,
  pub order: Option<Order>,
  pub claim: Option<OrderClaim>,
  pub product: Option<Product>,
  pub channel_id: Option<ChannelId>,
  pub outcome: ReconcileOutcome,
}

impl TicketCtxData {
  pub fn new(app_state: AppState, gateway: Arc<dyn GuildGateway>, member: TicketMember, customer_email: String) -> Self {
    Self {
      app_state,
      gateway,
      member,
      customer_email,
      order: None,
      claim: None,
      product: None,
      channel_id: None,
      // Overwritten by whichever step finishes the flow.
      outcome: ReconcileOutcome::Failed,
    }
  }
}

pub struct VerifyCtxData {
  pub app_state: AppState,
  pub gateway: Arc<dyn GuildGateway>,
  pub responder: Arc<dyn InteractionResponder>,
  pub invoker: Invoker,
  pub code: String,
  pub customer_email: Option<String>,
  /// Held from lookup until the role is granted; dropped on failure.
  pub code_claim: Mutex<Option<Box<dyn CodeClaim>>>,
  pub ticket: Option<ReconcileOutcome>,
}

impl VerifyCtxData {
  pub fn new(
    app_state: AppState,
    gateway: Arc<dyn GuildGateway>,
    responder: Arc<dyn InteractionResponder>,
    invoker: Invoker,
    code: String,
  ) -> Self {
    Self {
      app_state,
      gateway,
      responder,
      invoker,
      code,
      customer_email: None,
      code_claim: Mutex::new(None),
      ticket: None,
    }
  }
}

pub struct EsimCtxData {
  pub app_state: AppState,
  pub responder: Arc<dyn InteractionResponder>,
  pub invoker: Invoker,
}

pub struct ActivationCtxData {
  pub app_state: AppState,
  pub responder: Arc<dyn InteractionResponder>,
  pub invoker: Invoker,
  pub activation_code: Option<String>,
  pub smdp_address: Option<String>,
  pub activation_key: Option<ActivationKey>,
  pub qr_png: Option<Vec<u8>>,
}

pub struct ResolutionCtxData {
  pub app_state: AppState,
  pub gateway: Arc<dyn GuildGateway>,
  pub responder: Arc<dyn InteractionResponder>,
  pub invoker: Invoker,
  pub target_status: OrderStatus,
  pub order_id: Option<i64>,
}
