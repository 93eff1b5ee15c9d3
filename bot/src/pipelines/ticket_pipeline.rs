// src/pipelines/ticket_pipeline.rs

//! Opens the private support channel for a member's oldest pending order.

use crate::errors::{BotError, Result as BotResult};
use crate::interaction::{TICKET_COMPLETED_BUTTON, TICKET_FAILED_BUTTON};
use crate::messages;
use crate::models::Order;
use crate::pipelines::contexts::{ReconcileOutcome, TicketCtxData, TicketMember};
use crate::services::guild_gateway::{ButtonSpec, ButtonTone, GuildGateway, OutgoingMessage};
use crate::state::AppState;
use flow::{ContextData, Flow, FlowControl, FlowRegistry};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

pub fn register_ticket_flow(registry: &FlowRegistry<BotError>) {
  let mut ticket_f = Flow::<TicketCtxData, BotError>::new(
    "ticket",
    &[
      ("find_pending_order", false, None),
      ("claim_order", false, None),
      ("check_existing_ticket", false, None),
      ("resolve_product", false, None),
      ("open_ticket_channel", false, None),
      ("post_ticket_intro", false, None),
    ],
  );

  ticket_f.on_root("find_pending_order", |ctx_data: ContextData<TicketCtxData>| {
    Box::pin(async move {
      let (store, email) = {
        let guard = ctx_data.read();
        (guard.app_state.store.clone(), guard.customer_email.clone())
      };

      match store.first_pending_order(&email).await? {
        Some(order) => {
          debug!(order_id = order.id, "Pending order found.");
          ctx_data.write().order = Some(order);
          Ok::<_, BotError>(FlowControl::Continue)
        }
        None => {
          debug!("No pending order for this customer.");
          ctx_data.write().outcome = ReconcileOutcome::NoPendingOrder;
          Ok(FlowControl::Stop)
        }
      }
    })
  });

  // Held until the flow's context releases it, so the existence check and
  // the channel creation below happen as one unit per order.
  ticket_f.on_root("claim_order", |ctx_data: ContextData<TicketCtxData>| {
    Box::pin(async move {
      let order = current_order(&ctx_data)?;
      let locks = ctx_data.read().app_state.order_locks.clone();
      let claim = locks.claim(order.id).await;
      ctx_data.write().claim = Some(claim);
      Ok::<_, BotError>(FlowControl::Continue)
    })
  });

  ticket_f.on_root("check_existing_ticket", |ctx_data: ContextData<TicketCtxData>| {
    Box::pin(async move {
      let order = current_order(&ctx_data)?;
      let (gateway, guild_id) = {
        let guard = ctx_data.read();
        (guard.gateway.clone(), guard.member.guild_id)
      };

      if let Some(channel_id) = gateway.find_channel_by_name(guild_id, &order.ticket_channel_name()).await? {
        debug!(order_id = order.id, channel_id = %channel_id, "Ticket channel already exists.");
        ctx_data.write().outcome = ReconcileOutcome::AlreadyOpen {
          order_id: order.id,
          channel_id,
        };
        return Ok(FlowControl::Stop);
      }
      Ok::<_, BotError>(FlowControl::Continue)
    })
  });

  ticket_f.on_root("resolve_product", |ctx_data: ContextData<TicketCtxData>| {
    Box::pin(async move {
      let order = current_order(&ctx_data)?;
      let store = ctx_data.with(|data| data.app_state.store.clone());

      match store.find_product(order.product_id).await? {
        Some(product) => {
          ctx_data.write().product = Some(product);
          Ok::<_, BotError>(FlowControl::Continue)
        }
        None => {
          error!(
            order_id = order.id,
            product_id = order.product_id,
            "Product not found; no ticket opened."
          );
          ctx_data.write().outcome = ReconcileOutcome::MissingProduct {
            order_id: order.id,
            product_id: order.product_id,
          };
          Ok(FlowControl::Stop)
        }
      }
    })
  });

  ticket_f.on_root("open_ticket_channel", |ctx_data: ContextData<TicketCtxData>| {
    Box::pin(async move {
      let order = current_order(&ctx_data)?;
      let (gateway, member) = {
        let guard = ctx_data.read();
        (guard.gateway.clone(), guard.member)
      };

      let channel_id = gateway
        .create_private_channel(member.guild_id, &order.ticket_channel_name(), member.user_id)
        .await?;
      ctx_data.write().channel_id = Some(channel_id);
      Ok::<_, BotError>(FlowControl::Continue)
    })
  });

  ticket_f.on_root("post_ticket_intro", |ctx_data: ContextData<TicketCtxData>| {
    Box::pin(async move {
      let (gateway, member, order, product, channel_id) = {
        let guard = ctx_data.read();
        (
          guard.gateway.clone(),
          guard.member,
          guard.order.clone(),
          guard.product.clone(),
          guard.channel_id,
        )
      };
      let (Some(order), Some(product), Some(channel_id)) = (order, product, channel_id) else {
        return Err(BotError::Internal(
          "ticket intro reached without order, product and channel".to_string(),
        ));
      };

      let message = OutgoingMessage::text(messages::ticket_intro(member.user_id, &order, &product)).with_buttons(vec![
        ButtonSpec::new(TICKET_COMPLETED_BUTTON, "Completed", ButtonTone::Success),
        ButtonSpec::new(TICKET_FAILED_BUTTON, "Failed", ButtonTone::Danger),
      ]);
      gateway.send_message(channel_id, message).await?;

      info!(
        order_id = order.id,
        channel_id = %channel_id,
        user_id = %member.user_id,
        "Ticket channel opened."
      );
      ctx_data.write().outcome = ReconcileOutcome::Opened {
        order_id: order.id,
        channel_id,
      };
      Ok(FlowControl::Continue)
    })
  });

  registry.register(ticket_f);
  tracing::info!("Ticket flow registered.");
}

fn current_order(ctx_data: &ContextData<TicketCtxData>) -> BotResult<Order> {
  ctx_data
    .read()
    .order
    .clone()
    .ok_or_else(|| BotError::Internal("ticket flow has no order in context".to_string()))
}

/// Makes sure `member` has a ticket channel for their oldest pending order.
///
/// Never fails: store and platform errors are logged and reported as
/// [`ReconcileOutcome::Failed`].
#[instrument(
  name = "ticket::reconcile",
  skip(app_state, gateway, customer_email),
  fields(guild_id = %member.guild_id, user_id = %member.user_id)
)]
pub async fn reconcile(
  app_state: &AppState,
  gateway: Arc<dyn GuildGateway>,
  member: TicketMember,
  customer_email: &str,
) -> ReconcileOutcome {
  let ctx_data = ContextData::new(TicketCtxData::new(
    app_state.clone(),
    gateway,
    member,
    customer_email.to_string(),
  ));

  let result = app_state.flows.run(ctx_data.clone()).await;
  let (outcome, claim, order_id) = ctx_data.update(|data| {
    (
      data.outcome.clone(),
      data.claim.take(),
      data.order.as_ref().map(|order| order.id),
    )
  });
  drop(claim);

  match result {
    Ok(_) => outcome,
    Err(err) => {
      error!(error = %err, order_id = ?order_id, "Ticket reconciliation failed.");
      ReconcileOutcome::Failed
    }
  }
}
