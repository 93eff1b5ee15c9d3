// src/interaction.rs

//! Platform-neutral view of inbound events and of the one response an
//! interaction is allowed to produce.
//!
//! The Discord adapter classifies raw gateway events into these types; the
//! router and the flows never see serenity interaction objects directly.

use crate::errors::Result;
use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId, UserId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};

pub const ESIM_MODAL_ID: &str = "esim_details";
pub const ESIM_MODAL_TITLE: &str = "Enter eSIM Details";
pub const ACTIVATION_CODE_FIELD: &str = "activationCode";
pub const SMDP_ADDRESS_FIELD: &str = "smdpAddress";
pub const TICKET_COMPLETED_BUTTON: &str = "ticket_completed";
pub const TICKET_FAILED_BUTTON: &str = "ticket_failed";
pub const QR_ATTACHMENT_NAME: &str = "esim_qr_code.png";

/// Who triggered an interaction, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoker {
  pub user_id: UserId,
  /// `None` in direct messages.
  pub guild_id: Option<GuildId>,
  pub channel_id: ChannelId,
  /// Guild roles of the member; empty outside a guild.
  pub roles: Vec<RoleId>,
}

impl Invoker {
  pub fn has_role(&self, role: RoleId) -> bool {
    self.roles.contains(&role)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
  Verify { code: String },
  Esim,
}

impl SlashCommand {
  pub fn name(&self) -> &'static str {
    match self {
      SlashCommand::Verify { .. } => "verify",
      SlashCommand::Esim => "esim",
    }
  }
}

#[derive(Debug, Clone)]
pub struct CommandCall {
  pub invoker: Invoker,
  pub command: SlashCommand,
}

#[derive(Debug, Clone)]
pub struct ModalSubmission {
  pub invoker: Invoker,
  pub custom_id: String,
  pub fields: HashMap<String, String>,
}

impl ModalSubmission {
  pub fn field(&self, custom_id: &str) -> Option<&str> {
    self.fields.get(custom_id).map(String::as_str)
  }
}

#[derive(Debug, Clone)]
pub struct ButtonPress {
  pub invoker: Invoker,
  pub custom_id: String,
}

#[derive(Debug, Clone)]
pub enum InteractionEvent {
  Command(CommandCall),
  ModalSubmit(ModalSubmission),
  ButtonPress(ButtonPress),
}

impl InteractionEvent {
  pub fn invoker(&self) -> &Invoker {
    match self {
      InteractionEvent::Command(call) => &call.invoker,
      InteractionEvent::ModalSubmit(submission) => &submission.invoker,
      InteractionEvent::ButtonPress(press) => &press.invoker,
    }
  }

  /// Short name used in logs.
  pub fn label(&self) -> String {
    match self {
      InteractionEvent::Command(call) => format!("command:{}", call.command.name()),
      InteractionEvent::ModalSubmit(submission) => format!("modal:{}", submission.custom_id),
      InteractionEvent::ButtonPress(press) => format!("button:{}", press.custom_id),
    }
  }
}

/// A plain guild or DM message.
#[derive(Debug, Clone)]
pub struct InboundMessage {
  pub message_id: MessageId,
  pub channel_id: ChannelId,
  pub guild_id: Option<GuildId>,
  pub author_id: UserId,
  pub author_is_bot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
  pub filename: String,
  pub bytes: Vec<u8>,
}

/// Initial response to an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
  pub content: String,
  /// Visible to the invoker only.
  pub ephemeral: bool,
  pub attachment: Option<Attachment>,
}

impl Reply {
  pub fn ephemeral(content: impl Into<String>) -> Self {
    Self {
      content: content.into(),
      ephemeral: true,
      attachment: None,
    }
  }

  pub fn public(content: impl Into<String>) -> Self {
    Self {
      content: content.into(),
      ephemeral: false,
      attachment: None,
    }
  }

  pub fn with_attachment(mut self, filename: impl Into<String>, bytes: Vec<u8>) -> Self {
    self.attachment = Some(Attachment {
      filename: filename.into(),
      bytes,
    });
    self
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextField {
  pub custom_id: String,
  pub label: String,
  pub placeholder: String,
  pub required: bool,
}

/// A modal with single-line text inputs, one per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalForm {
  pub custom_id: String,
  pub title: String,
  pub fields: Vec<TextField>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseState {
  Pending = 0,
  Deferred = 1,
  Replied = 2,
  ModalShown = 3,
}

impl ResponseState {
  fn from_u8(raw: u8) -> Self {
    match raw {
      1 => ResponseState::Deferred,
      2 => ResponseState::Replied,
      3 => ResponseState::ModalShown,
      _ => ResponseState::Pending,
    }
  }

  /// Whether the initial response slot is still free.
  pub fn is_pending(self) -> bool {
    self == ResponseState::Pending
  }
}

/// Tracks how far an interaction's response has progressed.
#[derive(Debug, Default)]
pub struct ResponseLatch(AtomicU8);

impl ResponseLatch {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> ResponseState {
    ResponseState::from_u8(self.0.load(Ordering::Acquire))
  }

  pub fn set(&self, state: ResponseState) {
    self.0.store(state as u8, Ordering::Release);
  }
}

/// The response side of a single interaction.
///
/// An interaction gets one initial response (`defer`, `reply` or
/// `show_modal`); after a `defer` or `reply`, `edit_reply` rewrites it.
/// Out-of-order calls fail with [`crate::errors::BotError::AlreadyResponded`]
/// or [`crate::errors::BotError::Validation`].
#[async_trait]
pub trait InteractionResponder: Send + Sync {
  fn response_state(&self) -> ResponseState;

  async fn defer(&self, ephemeral: bool) -> Result<()>;

  async fn reply(&self, reply: Reply) -> Result<()>;

  async fn edit_reply(&self, content: &str) -> Result<()>;

  async fn show_modal(&self, form: ModalForm) -> Result<()>;
}
