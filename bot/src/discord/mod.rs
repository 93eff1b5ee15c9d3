// src/discord/mod.rs

//! Discord side of the bot: poise commands, gateway event handling, and the
//! serenity-backed implementations of [`crate::services::guild_gateway::GuildGateway`]
//! and [`crate::interaction::InteractionResponder`].

pub mod commands;
pub mod events;
pub mod gateway;
pub mod responder;

use crate::errors::BotError;
use crate::router::Router;
use poise::serenity_prelude as serenity;

/// Shared data poise hands to every command and event.
pub struct Data {
  pub router: Router,
  pub bot_user_id: serenity::UserId,
}

pub type Context<'a> = poise::Context<'a, Data, BotError>;
