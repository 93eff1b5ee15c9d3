// src/pipelines/esim_pipeline.rs

//! `/esim`: channel gate, role gate, then the activation details modal.

use crate::errors::BotError;
use crate::interaction::{
  ModalForm, Reply, TextField, ACTIVATION_CODE_FIELD, ESIM_MODAL_ID, ESIM_MODAL_TITLE, SMDP_ADDRESS_FIELD,
};
use crate::messages;
use crate::pipelines::contexts::EsimCtxData;
use flow::{ContextData, Flow, FlowControl, FlowRegistry};
use tracing::{debug, info};

pub fn esim_details_form() -> ModalForm {
  ModalForm {
    custom_id: ESIM_MODAL_ID.to_string(),
    title: ESIM_MODAL_TITLE.to_string(),
    fields: vec![
      TextField {
        custom_id: ACTIVATION_CODE_FIELD.to_string(),
        label: "Enter the eSIM activation code".to_string(),
        placeholder: "Enter the activation code here".to_string(),
        required: true,
      },
      TextField {
        custom_id: SMDP_ADDRESS_FIELD.to_string(),
        label: "Enter the SM-DP+ address".to_string(),
        placeholder: "Enter the SM-DP+ address here".to_string(),
        required: true,
      },
    ],
  }
}

pub fn register_esim_flow(registry: &FlowRegistry<BotError>) {
  let mut esim_f = Flow::<EsimCtxData, BotError>::new(
    "esim",
    &[
      ("require_esim_channel", false, None),
      ("require_esim_role", false, None),
      ("present_activation_modal", false, None),
    ],
  );

  esim_f.on_root("require_esim_channel", |ctx_data: ContextData<EsimCtxData>| {
    Box::pin(async move {
      let (responder, channel_id, allowed) = {
        let guard = ctx_data.read();
        (
          guard.responder.clone(),
          guard.invoker.channel_id,
          guard.app_state.config.esim_channel_id,
        )
      };

      if channel_id != allowed {
        debug!(channel_id = %channel_id, "/esim used outside the eSIM channel.");
        responder.reply(Reply::ephemeral(messages::WRONG_ESIM_CHANNEL)).await?;
        return Ok(FlowControl::Stop);
      }
      Ok::<_, BotError>(FlowControl::Continue)
    })
  });

  esim_f.on_root("require_esim_role", |ctx_data: ContextData<EsimCtxData>| {
    Box::pin(async move {
      let (responder, user_id, permitted) = {
        let guard = ctx_data.read();
        (
          guard.responder.clone(),
          guard.invoker.user_id,
          guard.invoker.has_role(guard.app_state.config.esim_role_id),
        )
      };

      if !permitted {
        info!(user_id = %user_id, "/esim denied: missing eSIM role.");
        responder.reply(Reply::ephemeral(messages::MISSING_PERMISSION)).await?;
        return Ok(FlowControl::Stop);
      }
      Ok::<_, BotError>(FlowControl::Continue)
    })
  });

  esim_f.on_root("present_activation_modal", |ctx_data: ContextData<EsimCtxData>| {
    Box::pin(async move {
      let responder = ctx_data.with(|data| data.responder.clone());
      responder.show_modal(esim_details_form()).await?;
      Ok::<_, BotError>(FlowControl::Continue)
    })
  });

  registry.register(esim_f);
  tracing::info!("eSIM flow registered.");
}
