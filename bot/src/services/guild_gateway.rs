// src/services/guild_gateway.rs

//! Guild-side operations the flows need from the chat platform.

use crate::errors::Result;
use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonTone {
  Success,
  Danger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonSpec {
  pub custom_id: String,
  pub label: String,
  pub tone: ButtonTone,
}

impl ButtonSpec {
  pub fn new(custom_id: &str, label: &str, tone: ButtonTone) -> Self {
    Self {
      custom_id: custom_id.to_string(),
      label: label.to_string(),
      tone,
    }
  }
}

/// A channel message; buttons are laid out on a single row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
  pub content: String,
  pub buttons: Vec<ButtonSpec>,
}

impl OutgoingMessage {
  pub fn text(content: impl Into<String>) -> Self {
    Self {
      content: content.into(),
      buttons: Vec::new(),
    }
  }

  pub fn with_buttons(mut self, buttons: Vec<ButtonSpec>) -> Self {
    self.buttons = buttons;
    self
  }
}

#[async_trait]
pub trait GuildGateway: Send + Sync {
  /// Looks a channel up by exact name in the guild's live channel list.
  async fn find_channel_by_name(&self, guild_id: GuildId, name: &str) -> Result<Option<ChannelId>>;

  /// Name of a guild channel; `None` for DMs and unknown channels.
  async fn channel_name(&self, channel_id: ChannelId) -> Result<Option<String>>;

  /// Creates a text channel hidden from `@everyone` and readable/writable by
  /// `member` and the bot itself.
  async fn create_private_channel(&self, guild_id: GuildId, name: &str, member: UserId) -> Result<ChannelId>;

  async fn send_message(&self, channel_id: ChannelId, message: OutgoingMessage) -> Result<MessageId>;

  async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()>;

  async fn add_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<()>;
}
