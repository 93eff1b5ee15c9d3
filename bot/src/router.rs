// src/router.rs

//! Entry point for classified events: runs the matching flow and makes sure
//! every interaction ends with exactly one response.

use crate::errors::Result;
use crate::interaction::{
  ButtonPress, CommandCall, InboundMessage, InteractionEvent, InteractionResponder, ModalSubmission, Reply,
  ResponseState, SlashCommand, ACTIVATION_CODE_FIELD, ESIM_MODAL_ID, SMDP_ADDRESS_FIELD, TICKET_COMPLETED_BUTTON,
  TICKET_FAILED_BUTTON,
};
use crate::messages;
use crate::models::OrderStatus;
use crate::pipelines::contexts::{ActivationCtxData, EsimCtxData, ResolutionCtxData, VerifyCtxData};
use crate::services::guild_gateway::{GuildGateway, OutgoingMessage};
use crate::state::AppState;
use flow::ContextData;
use poise::serenity_prelude::{ChannelId, GuildId};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub const VERIFY_CHANNEL_NAME: &str = "verify";
pub const WELCOME_CHANNEL_NAME: &str = "welcome";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelPurpose {
  Verify,
  Welcome,
}

#[derive(Clone)]
pub struct Router {
  state: AppState,
}

impl Router {
  pub fn new(state: AppState) -> Self {
    Self { state }
  }

  pub fn state(&self) -> &AppState {
    &self.state
  }

  /// Runs the flow for `event`. Failures are logged and turned into the
  /// generic error response; nothing is returned to the caller.
  #[instrument(
    name = "Router::dispatch_interaction",
    skip_all,
    fields(
      event = %event.label(),
      user_id = %event.invoker().user_id,
      channel_id = %event.invoker().channel_id,
    )
  )]
  pub async fn dispatch_interaction(
    &self,
    event: InteractionEvent,
    gateway: Arc<dyn GuildGateway>,
    responder: Arc<dyn InteractionResponder>,
  ) {
    let label = event.label();
    let invoker = event.invoker().clone();

    let Err(err) = self.handle_interaction(event, gateway, responder.clone()).await else {
      return;
    };
    error!(
      event = %label,
      user_id = %invoker.user_id,
      guild_id = ?invoker.guild_id,
      channel_id = %invoker.channel_id,
      error = %err,
      "Interaction handler failed."
    );

    let delivered = match responder.response_state() {
      ResponseState::Pending => responder.reply(Reply::ephemeral(messages::GENERIC_FAILURE)).await,
      ResponseState::Deferred | ResponseState::Replied => responder.edit_reply(messages::GENERIC_FAILURE).await,
      ResponseState::ModalShown => {
        warn!(event = %label, "Interaction already answered with a modal; error not reported to the user.");
        Ok(())
      }
    };
    if let Err(reply_err) = delivered {
      error!(event = %label, user_id = %invoker.user_id, error = %reply_err, "Failed to send error response.");
    }
  }

  async fn handle_interaction(
    &self,
    event: InteractionEvent,
    gateway: Arc<dyn GuildGateway>,
    responder: Arc<dyn InteractionResponder>,
  ) -> Result<()> {
    match event {
      InteractionEvent::Command(call) => self.handle_command(call, gateway, responder).await,
      InteractionEvent::ModalSubmit(submission) => self.handle_modal(submission, responder).await,
      InteractionEvent::ButtonPress(press) => self.handle_button(press, gateway, responder).await,
    }
  }

  async fn handle_command(
    &self,
    call: CommandCall,
    gateway: Arc<dyn GuildGateway>,
    responder: Arc<dyn InteractionResponder>,
  ) -> Result<()> {
    let CommandCall { invoker, command } = call;
    match command {
      SlashCommand::Verify { code } => {
        let ctx_data = ContextData::new(VerifyCtxData::new(self.state.clone(), gateway, responder, invoker, code));
        self.state.flows.run(ctx_data).await?;
      }
      SlashCommand::Esim => {
        let ctx_data = ContextData::new(EsimCtxData {
          app_state: self.state.clone(),
          responder,
          invoker,
        });
        self.state.flows.run(ctx_data).await?;
      }
    }
    Ok(())
  }

  async fn handle_modal(&self, submission: ModalSubmission, responder: Arc<dyn InteractionResponder>) -> Result<()> {
    if submission.custom_id != ESIM_MODAL_ID {
      warn!(custom_id = %submission.custom_id, "Unknown modal submission ignored.");
      return Ok(());
    }

    let ctx_data = ContextData::new(ActivationCtxData {
      app_state: self.state.clone(),
      responder,
      activation_code: submission.field(ACTIVATION_CODE_FIELD).map(str::to_string),
      smdp_address: submission.field(SMDP_ADDRESS_FIELD).map(str::to_string),
      invoker: submission.invoker,
      activation_key: None,
      qr_png: None,
    });
    self.state.flows.run(ctx_data).await?;
    Ok(())
  }

  async fn handle_button(
    &self,
    press: ButtonPress,
    gateway: Arc<dyn GuildGateway>,
    responder: Arc<dyn InteractionResponder>,
  ) -> Result<()> {
    let target_status = match press.custom_id.as_str() {
      TICKET_COMPLETED_BUTTON => OrderStatus::Completed,
      TICKET_FAILED_BUTTON => OrderStatus::Failed,
      other => {
        warn!(custom_id = %other, "Unknown button press ignored.");
        return Ok(());
      }
    };

    let ctx_data = ContextData::new(ResolutionCtxData {
      app_state: self.state.clone(),
      gateway,
      responder,
      invoker: press.invoker,
      target_status,
      order_id: None,
    });
    self.state.flows.run(ctx_data).await?;
    Ok(())
  }

  /// Keeps the verify and welcome channels free of chatter: the message is
  /// deleted and replaced by a pointer at `/verify`. Other channels and
  /// automated authors are left alone.
  #[instrument(
    name = "Router::dispatch_message",
    skip_all,
    fields(
      message_id = %message.message_id,
      channel_id = %message.channel_id,
      author_id = %message.author_id,
    )
  )]
  pub async fn dispatch_message(&self, message: InboundMessage, gateway: Arc<dyn GuildGateway>) {
    if message.author_is_bot {
      return;
    }
    let Some(guild_id) = message.guild_id else {
      return;
    };

    let purpose = match self.channel_purpose(message.channel_id, gateway.as_ref()).await {
      Ok(Some(purpose)) => purpose,
      Ok(None) => return,
      Err(err) => {
        error!(channel_id = %message.channel_id, error = %err, "Could not resolve channel purpose.");
        return;
      }
    };

    if let Err(err) = self.clean_up_message(&message, guild_id, purpose, gateway.as_ref()).await {
      error!(
        channel_id = %message.channel_id,
        message_id = %message.message_id,
        author_id = %message.author_id,
        purpose = ?purpose,
        error = %err,
        "Failed to handle channel message."
      );
    }
  }

  /// Configured ids win; a purpose without a configured id falls back to
  /// the channel's name.
  async fn channel_purpose(&self, channel_id: ChannelId, gateway: &dyn GuildGateway) -> Result<Option<ChannelPurpose>> {
    let config = &self.state.config;
    if config.verify_channel_id == Some(channel_id) {
      return Ok(Some(ChannelPurpose::Verify));
    }
    if config.welcome_channel_id == Some(channel_id) {
      return Ok(Some(ChannelPurpose::Welcome));
    }
    if config.verify_channel_id.is_some() && config.welcome_channel_id.is_some() {
      return Ok(None);
    }

    let purpose = match gateway.channel_name(channel_id).await?.as_deref() {
      Some(VERIFY_CHANNEL_NAME) if config.verify_channel_id.is_none() => Some(ChannelPurpose::Verify),
      Some(WELCOME_CHANNEL_NAME) if config.welcome_channel_id.is_none() => Some(ChannelPurpose::Welcome),
      _ => None,
    };
    Ok(purpose)
  }

  async fn clean_up_message(
    &self,
    message: &InboundMessage,
    guild_id: GuildId,
    purpose: ChannelPurpose,
    gateway: &dyn GuildGateway,
  ) -> Result<()> {
    gateway.delete_message(message.channel_id, message.message_id).await?;

    let content = match purpose {
      ChannelPurpose::Verify => messages::verify_channel_prompt(message.author_id),
      ChannelPurpose::Welcome => {
        let verify_channel = self.verify_channel(guild_id, gateway).await;
        messages::welcome_channel_prompt(message.author_id, verify_channel)
      }
    };
    gateway
      .send_message(message.channel_id, OutgoingMessage::text(content))
      .await?;

    info!(purpose = ?purpose, author_id = %message.author_id, "Channel message replaced with /verify pointer.");
    Ok(())
  }

  async fn verify_channel(&self, guild_id: GuildId, gateway: &dyn GuildGateway) -> Option<ChannelId> {
    if let Some(channel_id) = self.state.config.verify_channel_id {
      return Some(channel_id);
    }
    match gateway.find_channel_by_name(guild_id, VERIFY_CHANNEL_NAME).await {
      Ok(found) => {
        if found.is_none() {
          debug!(guild_id = %guild_id, "Guild has no verify channel.");
        }
        found
      }
      Err(err) => {
        warn!(guild_id = %guild_id, error = %err, "Verify channel lookup failed.");
        None
      }
    }
  }
}

