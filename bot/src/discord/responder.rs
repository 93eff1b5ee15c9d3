// src/discord/responder.rs

use crate::errors::{BotError, Result};
use crate::interaction::{InteractionResponder, ModalForm, Reply, ResponseLatch, ResponseState};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use serenity::{
  CommandInteraction, ComponentInteraction, CreateActionRow, CreateAttachment, CreateInputText,
  CreateInteractionResponse, CreateInteractionResponseMessage, CreateModal, EditInteractionResponse, InputTextStyle,
  ModalInteraction,
};

enum Target {
  Command(CommandInteraction),
  Modal(ModalInteraction),
  Component(ComponentInteraction),
}

/// [`InteractionResponder`] for one serenity interaction.
pub struct SerenityResponder {
  ctx: serenity::Context,
  target: Target,
  latch: ResponseLatch,
}

impl SerenityResponder {
  fn new(ctx: serenity::Context, target: Target) -> Self {
    Self {
      ctx,
      target,
      latch: ResponseLatch::new(),
    }
  }

  pub fn for_command(ctx: serenity::Context, interaction: CommandInteraction) -> Self {
    Self::new(ctx, Target::Command(interaction))
  }

  pub fn for_modal(ctx: serenity::Context, interaction: ModalInteraction) -> Self {
    Self::new(ctx, Target::Modal(interaction))
  }

  pub fn for_component(ctx: serenity::Context, interaction: ComponentInteraction) -> Self {
    Self::new(ctx, Target::Component(interaction))
  }

  fn interaction_id(&self) -> String {
    match &self.target {
      Target::Command(i) => i.id.to_string(),
      Target::Modal(i) => i.id.to_string(),
      Target::Component(i) => i.id.to_string(),
    }
  }

  fn ensure_pending(&self) -> Result<()> {
    if self.latch.state().is_pending() {
      Ok(())
    } else {
      Err(BotError::AlreadyResponded(self.interaction_id()))
    }
  }

  async fn create(&self, response: CreateInteractionResponse) -> Result<()> {
    match &self.target {
      Target::Command(i) => i.create_response(&self.ctx, response).await?,
      Target::Modal(i) => i.create_response(&self.ctx, response).await?,
      Target::Component(i) => i.create_response(&self.ctx, response).await?,
    }
    Ok(())
  }
}

#[async_trait]
impl InteractionResponder for SerenityResponder {
  fn response_state(&self) -> ResponseState {
    self.latch.state()
  }

  async fn defer(&self, ephemeral: bool) -> Result<()> {
    self.ensure_pending()?;
    let response = CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new().ephemeral(ephemeral));
    self.create(response).await?;
    self.latch.set(ResponseState::Deferred);
    Ok(())
  }

  async fn reply(&self, reply: Reply) -> Result<()> {
    self.ensure_pending()?;
    let mut message = CreateInteractionResponseMessage::new()
      .content(reply.content)
      .ephemeral(reply.ephemeral);
    if let Some(attachment) = reply.attachment {
      message = message.add_file(CreateAttachment::bytes(attachment.bytes, attachment.filename));
    }
    self.create(CreateInteractionResponse::Message(message)).await?;
    self.latch.set(ResponseState::Replied);
    Ok(())
  }

  async fn edit_reply(&self, content: &str) -> Result<()> {
    match self.latch.state() {
      ResponseState::Deferred | ResponseState::Replied => {}
      ResponseState::Pending => {
        return Err(BotError::Validation(format!(
          "interaction {} has no response to edit",
          self.interaction_id()
        )))
      }
      ResponseState::ModalShown => return Err(BotError::AlreadyResponded(self.interaction_id())),
    }
    let edit = EditInteractionResponse::new().content(content);
    match &self.target {
      Target::Command(i) => i.edit_response(&self.ctx, edit).await?,
      Target::Modal(i) => i.edit_response(&self.ctx, edit).await?,
      Target::Component(i) => i.edit_response(&self.ctx, edit).await?,
    };
    self.latch.set(ResponseState::Replied);
    Ok(())
  }

  async fn show_modal(&self, form: ModalForm) -> Result<()> {
    self.ensure_pending()?;
    if matches!(self.target, Target::Modal(_)) {
      return Err(BotError::Validation("a modal cannot answer a modal submission".to_string()));
    }
    let rows = form
      .fields
      .into_iter()
      .map(|field| {
        CreateActionRow::InputText(
          CreateInputText::new(InputTextStyle::Short, field.label, field.custom_id)
            .placeholder(field.placeholder)
            .required(field.required),
        )
      })
      .collect();
    let modal = CreateModal::new(form.custom_id, form.title).components(rows);
    self.create(CreateInteractionResponse::Modal(modal)).await?;
    self.latch.set(ResponseState::ModalShown);
    Ok(())
  }
}
