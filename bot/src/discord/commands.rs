// src/discord/commands.rs

//! Slash commands. Both hand off to the router, which answers the
//! interaction itself; poise never responds on our behalf.

use super::gateway::SerenityGateway;
use super::responder::SerenityResponder;
use super::{Context, Data};
use crate::errors::{BotError, Result};
use crate::interaction::{CommandCall, InteractionEvent, Invoker, SlashCommand};
use poise::serenity_prelude as serenity;
use std::sync::Arc;

pub fn all() -> Vec<poise::Command<Data, BotError>> {
  vec![verify(), esim()]
}

/// Verify your account with the unique code from your email
#[poise::command(slash_command)]
pub async fn verify(
  ctx: Context<'_>,
  #[description = "Your unique verification code"] code: String,
) -> Result<()> {
  dispatch(ctx, SlashCommand::Verify { code }).await
}

/// Generate an eSIM QR code (SF role required)
#[poise::command(slash_command, default_member_permissions = "USE_APPLICATION_COMMANDS")]
pub async fn esim(ctx: Context<'_>) -> Result<()> {
  dispatch(ctx, SlashCommand::Esim).await
}

pub(crate) fn command_invoker(interaction: &serenity::CommandInteraction) -> Invoker {
  Invoker {
    user_id: interaction.user.id,
    guild_id: interaction.guild_id,
    channel_id: interaction.channel_id,
    roles: interaction
      .member
      .as_ref()
      .map(|member| member.roles.clone())
      .unwrap_or_default(),
  }
}

async fn dispatch(ctx: Context<'_>, command: SlashCommand) -> Result<()> {
  let poise::Context::Application(app_ctx) = ctx else {
    return Err(BotError::Internal("slash command invoked without an interaction".to_string()));
  };
  let serenity_ctx = ctx.serenity_context().clone();
  let data = ctx.data();

  let event = InteractionEvent::Command(CommandCall {
    invoker: command_invoker(app_ctx.interaction),
    command,
  });
  let gateway = Arc::new(SerenityGateway::new(serenity_ctx.clone(), data.bot_user_id));
  let responder = Arc::new(SerenityResponder::for_command(serenity_ctx, app_ctx.interaction.clone()));
  data.router.dispatch_interaction(event, gateway, responder).await;
  Ok(())
}
