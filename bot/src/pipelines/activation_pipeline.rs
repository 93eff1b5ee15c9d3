// src/pipelines/activation_pipeline.rs

//! `esim_details` modal submission: remember the details, render the QR code
//! and hand it back as a PNG attachment.

use crate::errors::BotError;
use crate::interaction::{Reply, QR_ATTACHMENT_NAME};
use crate::messages;
use crate::pipelines::contexts::ActivationCtxData;
use crate::services::activation_store::PendingActivation;
use crate::services::qr::render_activation_qr;
use flow::{ContextData, Flow, FlowControl, FlowRegistry};
use tracing::{debug, error, info};

pub fn register_activation_flow(registry: &FlowRegistry<BotError>) {
  let mut activation_f = Flow::<ActivationCtxData, BotError>::new(
    "activation",
    &[
      ("store_activation", false, None),
      ("render_qr_code", false, None),
      ("deliver_qr_code", false, None),
    ],
  );

  activation_f.on_root("store_activation", |ctx_data: ContextData<ActivationCtxData>| {
    Box::pin(async move {
      let (activations, user_id, activation_code, smdp_address) = {
        let guard = ctx_data.read();
        (
          guard.app_state.activations.clone(),
          guard.invoker.user_id,
          guard.activation_code.clone(),
          guard.smdp_address.clone(),
        )
      };
      let (Some(activation_code), Some(smdp_address)) = (activation_code, smdp_address) else {
        return Err(BotError::Validation(
          "eSIM details submission is missing a field".to_string(),
        ));
      };

      let (key, superseded) = activations.insert(
        user_id,
        PendingActivation {
          activation_code,
          smdp_address,
        },
      );
      if superseded.is_some() {
        debug!(user_id = %user_id, "Earlier activation request superseded.");
      }
      ctx_data.write().activation_key = Some(key);
      Ok(FlowControl::Continue)
    })
  });

  activation_f.on_root("render_qr_code", |ctx_data: ContextData<ActivationCtxData>| {
    Box::pin(async move {
      let (activations, responder, user_id, key, fields) = {
        let guard = ctx_data.read();
        (
          guard.app_state.activations.clone(),
          guard.responder.clone(),
          guard.invoker.user_id,
          guard.activation_key,
          guard.activation_code.clone().zip(guard.smdp_address.clone()),
        )
      };
      let key = key.ok_or_else(|| BotError::Internal(format!("no activation request stored for user {}", user_id)))?;
      let (activation_code, smdp_address) =
        fields.ok_or_else(|| BotError::Internal("activation flow lost its submitted fields".to_string()))?;

      let span = tracing::Span::current();
      let rendered = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        render_activation_qr(&activation_code, &smdp_address)
      })
      .await;

      match rendered {
        Ok(Ok(png)) => {
          ctx_data.write().qr_png = Some(png);
          Ok::<_, BotError>(FlowControl::Continue)
        }
        Ok(Err(render_err)) => {
          error!(user_id = %user_id, error = %render_err, "QR code rendering failed.");
          activations.evict(key);
          responder.reply(Reply::public(messages::QR_FAILURE)).await?;
          Ok(FlowControl::Stop)
        }
        Err(join_err) => {
          activations.evict(key);
          Err(BotError::Internal(format!("QR rendering task failed: {}", join_err)))
        }
      }
    })
  });

  activation_f.on_root("deliver_qr_code", |ctx_data: ContextData<ActivationCtxData>| {
    Box::pin(async move {
      let (activations, responder, user_id, key, png) = {
        let mut guard = ctx_data.write();
        (
          guard.app_state.activations.clone(),
          guard.responder.clone(),
          guard.invoker.user_id,
          guard.activation_key,
          guard.qr_png.take(),
        )
      };
      let png = png.ok_or_else(|| BotError::Internal("no rendered QR code to deliver".to_string()))?;

      let sent = responder
        .reply(Reply::public(messages::QR_DELIVERY).with_attachment(QR_ATTACHMENT_NAME, png))
        .await;
      if let Some(key) = key {
        activations.evict(key);
      }
      sent?;

      info!(user_id = %user_id, "eSIM QR code delivered.");
      Ok::<_, BotError>(FlowControl::Continue)
    })
  });

  registry.register(activation_f);
  tracing::info!("Activation flow registered.");
}
