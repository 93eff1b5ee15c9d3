// src/errors.rs

use crate::services::qr::QrRenderError;
use flow::FlowError;
use poise::serenity_prelude as serenity;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Discord Error: {0}")]
  Discord(#[from] serenity::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("QR Render Error: {0}")]
  QrRender(#[from] QrRenderError),

  #[error("Validation Error: {0}")]
  Validation(String),

  /// A second terminal response was attempted for one interaction.
  #[error("Interaction {0} has already been responded to")]
  AlreadyResponded(String),

  #[error("Internal Error: {0}")]
  Internal(String),
}

// Handlers that bubble up anyhow keep the concrete error where one can be
// recovered.
impl From<anyhow::Error> for BotError {
  fn from(err: anyhow::Error) -> Self {
    let err = match err.downcast::<BotError>() {
      Ok(bot_err) => return bot_err,
      Err(err) => err,
    };
    let err = match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => return BotError::Sqlx(sqlx_err),
      Err(err) => err,
    };
    match err.downcast::<FlowError>() {
      Ok(flow_err) => BotError::Workflow { source: flow_err },
      Err(err) => BotError::Internal(format!("{:#}", err)),
    }
  }
}

pub type Result<T, E = BotError> = std::result::Result<T, E>;
