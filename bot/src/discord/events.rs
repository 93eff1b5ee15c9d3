// src/discord/events.rs

//! Raw gateway events that are not slash commands: modal submissions,
//! button presses and plain messages.

use super::gateway::SerenityGateway;
use super::responder::SerenityResponder;
use super::Data;
use crate::errors::BotError;
use crate::interaction::{ButtonPress, InboundMessage, InteractionEvent, Invoker, ModalSubmission};
use poise::serenity_prelude as serenity;
use serenity::{ActionRowComponent, FullEvent, Interaction};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

pub fn modal_submission(interaction: &serenity::ModalInteraction) -> ModalSubmission {
  let fields: HashMap<String, String> = interaction
    .data
    .components
    .iter()
    .flat_map(|row| row.components.iter())
    .filter_map(|component| match component {
      ActionRowComponent::InputText(input) => Some((input.custom_id.clone(), input.value.clone().unwrap_or_default())),
      _ => None,
    })
    .collect();

  ModalSubmission {
    invoker: Invoker {
      user_id: interaction.user.id,
      guild_id: interaction.guild_id,
      channel_id: interaction.channel_id,
      roles: interaction.member.as_ref().map(|m| m.roles.clone()).unwrap_or_default(),
    },
    custom_id: interaction.data.custom_id.clone(),
    fields,
  }
}

pub fn button_press(interaction: &serenity::ComponentInteraction) -> ButtonPress {
  ButtonPress {
    invoker: Invoker {
      user_id: interaction.user.id,
      guild_id: interaction.guild_id,
      channel_id: interaction.channel_id,
      roles: interaction.member.as_ref().map(|m| m.roles.clone()).unwrap_or_default(),
    },
    custom_id: interaction.data.custom_id.clone(),
  }
}

pub fn inbound_message(message: &serenity::Message) -> InboundMessage {
  InboundMessage {
    message_id: message.id,
    channel_id: message.channel_id,
    guild_id: message.guild_id,
    author_id: message.author.id,
    author_is_bot: message.author.bot,
  }
}

pub async fn handle_event(
  ctx: &serenity::Context,
  event: &FullEvent,
  _framework: poise::FrameworkContext<'_, Data, BotError>,
  data: &Data,
) -> Result<(), BotError> {
  let gateway = || Arc::new(SerenityGateway::new(ctx.clone(), data.bot_user_id));

  match event {
    FullEvent::Ready { data_about_bot } => {
      info!(user = %data_about_bot.user.name, guilds = data_about_bot.guilds.len(), "Connected to Discord.");
    }
    FullEvent::InteractionCreate { interaction } => match interaction {
      Interaction::Modal(modal) => {
        let event = InteractionEvent::ModalSubmit(modal_submission(modal));
        let responder = Arc::new(SerenityResponder::for_modal(ctx.clone(), modal.clone()));
        data.router.dispatch_interaction(event, gateway(), responder).await;
      }
      Interaction::Component(component) => {
        let event = InteractionEvent::ButtonPress(button_press(component));
        let responder = Arc::new(SerenityResponder::for_component(ctx.clone(), component.clone()));
        data.router.dispatch_interaction(event, gateway(), responder).await;
      }
      // Slash commands are dispatched by poise.
      _ => {}
    },
    FullEvent::Message { new_message } => {
      data.router.dispatch_message(inbound_message(new_message), gateway()).await;
    }
    _ => {}
  }
  Ok(())
}

pub async fn on_error(error: poise::FrameworkError<'_, Data, BotError>) {
  match error {
    poise::FrameworkError::Setup { error, .. } => error!(error = %error, "Framework setup failed."),
    poise::FrameworkError::Command { error, ctx, .. } => {
      error!(command = %ctx.command().name, error = %error, "Command returned an error.");
    }
    poise::FrameworkError::EventHandler { error, event, .. } => {
      error!(event = %event.snake_case_name(), error = %error, "Event handler returned an error.");
    }
    other => {
      if let Err(e) = poise::builtins::on_error(other).await {
        error!(error = %e, "Error while handling framework error.");
      }
    }
  }
}
