// src/messages.rs

//! User-facing texts.

use crate::models::{Order, Product};
use poise::serenity_prelude::{ChannelId, Mentionable, UserId};

pub const WRONG_ESIM_CHANNEL: &str = "This command can only be used in the designated eSIM generator channel.";
pub const MISSING_PERMISSION: &str = "You do not have permission to use this command.";
pub const INVALID_VERIFICATION_CODE: &str = "That verification code is invalid or has expired.";
pub const GENERIC_FAILURE: &str = "An error occurred while processing your request. Please try again.";
pub const QR_FAILURE: &str = "An error occurred while generating the QR code. Please try again.";
pub const QR_DELIVERY: &str = "Here is your eSIM QR code:";
pub const NOT_A_TICKET_CHANNEL: &str = "This button only works inside a ticket channel.";
pub const GUILD_ONLY: &str = "This command can only be used inside the server.";
pub const VERIFIED: &str = "You're verified! Welcome to SF.";

pub fn verify_channel_prompt(author: UserId) -> String {
  format!(
    "Welcome to SF {}, please use the /verify command with your unique code to verify your account.",
    author.mention()
  )
}

/// `verify_channel` is `None` when the guild has no verify channel; the
/// mention then degrades to plain `#verify`.
pub fn welcome_channel_prompt(author: UserId, verify_channel: Option<ChannelId>) -> String {
  let pointer = match verify_channel {
    Some(channel) => channel.mention().to_string(),
    None => "#verify".to_string(),
  };
  format!(
    "{}, please use the /verify command in {} with your unique code to verify your account.",
    author.mention(),
    pointer
  )
}

pub fn ticket_intro(member: UserId, order: &Order, product: &Product) -> String {
  format!(
    "Welcome {member}! This is your ticket for Order #{id}.\n\n\
     Order Details:\n\
     - Order ID: {id}\n\
     - Product ID: {product_id}\n\
     - Product Name: {product_name}\n\
     - Status: {status}\n\
     - Created: {created}\n\n\
     A staff member will assist you shortly.",
    member = member.mention(),
    id = order.id,
    product_id = order.product_id,
    product_name = product.name,
    status = order.status,
    created = order.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
  )
}

pub fn order_resolved(order_id: i64, outcome: &str) -> String {
  format!("Order #{} marked as {}.", order_id, outcome)
}

pub fn order_already_resolved(order_id: i64) -> String {
  format!("Order #{} has already been resolved.", order_id)
}

pub fn verified_with_ticket(ticket: ChannelId) -> String {
  format!("{} Your order ticket is {}.", VERIFIED, ticket.mention())
}
