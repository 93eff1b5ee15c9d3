// src/pipelines/resolution_pipeline.rs

//! `ticket_completed` / `ticket_failed` buttons: staff write the outcome of
//! a ticket back to its order.

use crate::errors::BotError;
use crate::interaction::Reply;
use crate::messages;
use crate::models::order::order_id_from_ticket_channel;
use crate::pipelines::contexts::ResolutionCtxData;
use flow::{ContextData, Flow, FlowControl, FlowRegistry};
use tracing::{info, warn};

pub fn register_resolution_flow(registry: &FlowRegistry<BotError>) {
  let mut resolution_f = Flow::<ResolutionCtxData, BotError>::new(
    "ticket_resolution",
    &[
      ("require_staff_role", false, None),
      ("identify_ticket_order", false, None),
      ("apply_resolution", false, None),
    ],
  );

  resolution_f.on_root("require_staff_role", |ctx_data: ContextData<ResolutionCtxData>| {
    Box::pin(async move {
      let (responder, user_id, permitted) = {
        let guard = ctx_data.read();
        (
          guard.responder.clone(),
          guard.invoker.user_id,
          guard.invoker.has_role(guard.app_state.config.staff_role_id),
        )
      };

      if !permitted {
        warn!(user_id = %user_id, "Ticket button pressed without the staff role.");
        responder.reply(Reply::ephemeral(messages::MISSING_PERMISSION)).await?;
        return Ok(FlowControl::Stop);
      }
      Ok::<_, BotError>(FlowControl::Continue)
    })
  });

  resolution_f.on_root("identify_ticket_order", |ctx_data: ContextData<ResolutionCtxData>| {
    Box::pin(async move {
      let (gateway, responder, channel_id) = {
        let guard = ctx_data.read();
        (guard.gateway.clone(), guard.responder.clone(), guard.invoker.channel_id)
      };

      let channel_name = gateway.channel_name(channel_id).await?;
      match channel_name.as_deref().and_then(order_id_from_ticket_channel) {
        Some(order_id) => {
          ctx_data.write().order_id = Some(order_id);
          Ok::<_, BotError>(FlowControl::Continue)
        }
        None => {
          responder.reply(Reply::ephemeral(messages::NOT_A_TICKET_CHANNEL)).await?;
          Ok(FlowControl::Stop)
        }
      }
    })
  });

  resolution_f.on_root("apply_resolution", |ctx_data: ContextData<ResolutionCtxData>| {
    Box::pin(async move {
      let (store, responder, user_id, status, order_id) = {
        let guard = ctx_data.read();
        (
          guard.app_state.store.clone(),
          guard.responder.clone(),
          guard.invoker.user_id,
          guard.target_status,
          guard.order_id,
        )
      };
      let order_id = order_id.ok_or_else(|| BotError::Internal("resolution flow has no order id".to_string()))?;

      if store.resolve_order(order_id, status).await? {
        info!(order_id, status = %status, resolved_by = %user_id, "Ticket resolved.");
        responder
          .reply(Reply::public(messages::order_resolved(order_id, status.as_str())))
          .await?;
      } else {
        responder
          .reply(Reply::ephemeral(messages::order_already_resolved(order_id)))
          .await?;
      }
      Ok::<_, BotError>(FlowControl::Continue)
    })
  });

  registry.register(resolution_f);
  tracing::info!("Ticket resolution flow registered.");
}
