// src/pipelines/verify_pipeline.rs

//! `/verify code:<code>`: redeem the code, grant the verified role and open
//! a ticket for any pending order of the purchasing customer.
//!
//! The code stays locked but unconsumed until the role grant succeeds, so a
//! failed grant can be retried with the same code.

use crate::errors::{BotError, Result as BotResult};
use crate::interaction::Reply;
use crate::messages;
use crate::pipelines::contexts::{TicketMember, VerifyCtxData};
use crate::pipelines::ticket_pipeline;
use flow::{ContextData, Flow, FlowControl, FlowRegistry};
use poise::serenity_prelude::GuildId;
use tracing::{info, warn};

pub fn register_verify_flow(registry: &FlowRegistry<BotError>) {
  let mut verify_f = Flow::<VerifyCtxData, BotError>::new(
    "verify",
    &[
      ("acknowledge_verify", false, None),
      ("claim_verification_code", false, None),
      ("grant_verified_role", false, None),
      ("consume_verification_code", false, None),
      ("open_pending_ticket", false, None),
      ("confirm_verification", false, None),
    ],
  );

  verify_f.on_root("acknowledge_verify", |ctx_data: ContextData<VerifyCtxData>| {
    Box::pin(async move {
      let (responder, in_guild) = {
        let guard = ctx_data.read();
        (guard.responder.clone(), guard.invoker.guild_id.is_some())
      };

      if !in_guild {
        responder.reply(Reply::ephemeral(messages::GUILD_ONLY)).await?;
        return Ok(FlowControl::Stop);
      }
      // Redemption and ticket creation can outlast the interaction deadline.
      responder.defer(true).await?;
      Ok::<_, BotError>(FlowControl::Continue)
    })
  });

  verify_f.on_root("claim_verification_code", |ctx_data: ContextData<VerifyCtxData>| {
    Box::pin(async move {
      let (store, responder, code, user_id) = {
        let guard = ctx_data.read();
        (
          guard.app_state.store.clone(),
          guard.responder.clone(),
          guard.code.trim().to_string(),
          guard.invoker.user_id,
        )
      };

      let claim = if code.is_empty() {
        None
      } else {
        store.claim_verification_code(&code).await?
      };

      match claim {
        Some(claim) => {
          {
            let mut guard = ctx_data.write();
            guard.customer_email = Some(claim.customer_email().to_string());
            *guard.code_claim.get_mut() = Some(claim);
          }
          Ok::<_, BotError>(FlowControl::Continue)
        }
        None => {
          warn!(user_id = %user_id, "Verification code rejected.");
          responder.edit_reply(messages::INVALID_VERIFICATION_CODE).await?;
          Ok(FlowControl::Stop)
        }
      }
    })
  });

  verify_f.on_root("grant_verified_role", |ctx_data: ContextData<VerifyCtxData>| {
    Box::pin(async move {
      let guild_id = invoker_guild(&ctx_data)?;
      let (gateway, user_id, role_id) = {
        let guard = ctx_data.read();
        (
          guard.gateway.clone(),
          guard.invoker.user_id,
          guard.app_state.config.verified_role_id,
        )
      };

      gateway.add_role(guild_id, user_id, role_id).await?;
      info!(user_id = %user_id, role_id = %role_id, "Verified role granted.");
      Ok::<_, BotError>(FlowControl::Continue)
    })
  });

  verify_f.on_root("consume_verification_code", |ctx_data: ContextData<VerifyCtxData>| {
    Box::pin(async move {
      let (claim, user_id) = {
        let guard = ctx_data.read();
        let claim = guard.code_claim.lock().take();
        (claim, guard.invoker.user_id)
      };
      let claim = claim.ok_or_else(|| BotError::Internal("verify flow has no claimed code".to_string()))?;

      claim.consume(user_id).await?;
      Ok::<_, BotError>(FlowControl::Continue)
    })
  });

  verify_f.on_root("open_pending_ticket", |ctx_data: ContextData<VerifyCtxData>| {
    Box::pin(async move {
      let guild_id = invoker_guild(&ctx_data)?;
      let (app_state, gateway, user_id, email) = {
        let guard = ctx_data.read();
        (
          guard.app_state.clone(),
          guard.gateway.clone(),
          guard.invoker.user_id,
          guard.customer_email.clone(),
        )
      };
      let email = email.ok_or_else(|| BotError::Internal("verify flow has no customer email".to_string()))?;

      let member = TicketMember { guild_id, user_id };
      let outcome = ticket_pipeline::reconcile(&app_state, gateway, member, &email).await;
      ctx_data.write().ticket = Some(outcome);
      Ok::<_, BotError>(FlowControl::Continue)
    })
  });

  verify_f.on_root("confirm_verification", |ctx_data: ContextData<VerifyCtxData>| {
    Box::pin(async move {
      let (responder, ticket_channel) = {
        let guard = ctx_data.read();
        (
          guard.responder.clone(),
          guard.ticket.as_ref().and_then(|outcome| outcome.ticket_channel()),
        )
      };

      let text = match ticket_channel {
        Some(channel_id) => messages::verified_with_ticket(channel_id),
        None => messages::VERIFIED.to_string(),
      };
      responder.edit_reply(&text).await?;
      Ok::<_, BotError>(FlowControl::Continue)
    })
  });

  registry.register(verify_f);
  tracing::info!("Verify flow registered.");
}

fn invoker_guild(ctx_data: &ContextData<VerifyCtxData>) -> BotResult<GuildId> {
  ctx_data
    .read()
    .invoker
    .guild_id
    .ok_or_else(|| BotError::Internal("verify flow ran outside a guild".to_string()))
}
