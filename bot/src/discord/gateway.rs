// src/discord/gateway.rs

use crate::errors::Result;
use crate::services::guild_gateway::{ButtonTone, GuildGateway, OutgoingMessage};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use serenity::{
  ButtonStyle, Channel, ChannelId, ChannelType, CreateActionRow, CreateButton, CreateChannel, CreateMessage, GuildId,
  MessageId, PermissionOverwrite, PermissionOverwriteType, Permissions, RoleId, UserId,
};
use tracing::instrument;

/// [`GuildGateway`] over a live serenity client.
#[derive(Clone)]
pub struct SerenityGateway {
  ctx: serenity::Context,
  bot_user_id: UserId,
}

impl SerenityGateway {
  pub fn new(ctx: serenity::Context, bot_user_id: UserId) -> Self {
    Self { ctx, bot_user_id }
  }
}

fn ticket_overwrites(guild_id: GuildId, member: UserId, bot: UserId) -> Vec<PermissionOverwrite> {
  let participant = Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES | Permissions::READ_MESSAGE_HISTORY;
  vec![
    // The @everyone role shares the guild's id.
    PermissionOverwrite {
      allow: Permissions::empty(),
      deny: Permissions::VIEW_CHANNEL,
      kind: PermissionOverwriteType::Role(RoleId::new(guild_id.get())),
    },
    PermissionOverwrite {
      allow: participant,
      deny: Permissions::empty(),
      kind: PermissionOverwriteType::Member(member),
    },
    PermissionOverwrite {
      allow: participant,
      deny: Permissions::empty(),
      kind: PermissionOverwriteType::Member(bot),
    },
  ]
}

#[async_trait]
impl GuildGateway for SerenityGateway {
  #[instrument(name = "SerenityGateway::find_channel_by_name", skip(self), err(Display))]
  async fn find_channel_by_name(&self, guild_id: GuildId, name: &str) -> Result<Option<ChannelId>> {
    let channels = guild_id.channels(&self.ctx.http).await?;
    Ok(channels.values().find(|channel| channel.name == name).map(|channel| channel.id))
  }

  async fn channel_name(&self, channel_id: ChannelId) -> Result<Option<String>> {
    match channel_id.to_channel(&self.ctx).await? {
      Channel::Guild(channel) => Ok(Some(channel.name)),
      _ => Ok(None),
    }
  }

  #[instrument(name = "SerenityGateway::create_private_channel", skip(self), err(Display))]
  async fn create_private_channel(&self, guild_id: GuildId, name: &str, member: UserId) -> Result<ChannelId> {
    let builder = CreateChannel::new(name)
      .kind(ChannelType::Text)
      .permissions(ticket_overwrites(guild_id, member, self.bot_user_id));
    let channel = guild_id.create_channel(&self.ctx, builder).await?;
    Ok(channel.id)
  }

  #[instrument(name = "SerenityGateway::send_message", skip(self, message), err(Display))]
  async fn send_message(&self, channel_id: ChannelId, message: OutgoingMessage) -> Result<MessageId> {
    let mut builder = CreateMessage::new().content(message.content);
    if !message.buttons.is_empty() {
      let buttons = message
        .buttons
        .into_iter()
        .map(|button| {
          let style = match button.tone {
            ButtonTone::Success => ButtonStyle::Success,
            ButtonTone::Danger => ButtonStyle::Danger,
          };
          CreateButton::new(button.custom_id).label(button.label).style(style)
        })
        .collect();
      builder = builder.components(vec![CreateActionRow::Buttons(buttons)]);
    }
    let sent = channel_id.send_message(&self.ctx, builder).await?;
    Ok(sent.id)
  }

  #[instrument(name = "SerenityGateway::delete_message", skip(self), err(Display))]
  async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()> {
    channel_id.delete_message(&self.ctx.http, message_id).await?;
    Ok(())
  }

  #[instrument(name = "SerenityGateway::add_role", skip(self), err(Display))]
  async fn add_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<()> {
    self
      .ctx
      .http
      .add_member_role(guild_id, user_id, role_id, Some("Verified with /verify"))
      .await?;
    Ok(())
  }
}
