// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId, UserId};
use sfdesk::config::BotConfig;
use sfdesk::errors::{BotError, Result};
use sfdesk::interaction::{
  InteractionResponder, Invoker, ModalForm, Reply, ResponseLatch, ResponseState,
};
use sfdesk::models::{Order, OrderStatus, Product};
use sfdesk::pipelines;
use sfdesk::router::Router;
use sfdesk::services::guild_gateway::{GuildGateway, OutgoingMessage};
use sfdesk::services::order_store::{CodeClaim, OrderStore};
use sfdesk::state::AppState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::Level;

pub const GUILD: GuildId = GuildId::new(100);
pub const ESIM_CHANNEL: ChannelId = ChannelId::new(200);
pub const ESIM_ROLE: RoleId = RoleId::new(300);
pub const STAFF_ROLE: RoleId = RoleId::new(301);
pub const VERIFIED_ROLE: RoleId = RoleId::new(302);
pub const MEMBER: UserId = UserId::new(400);

// ---------------------------------------------------------------------------
// Order store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FakeCode {
  pub customer_email: String,
  pub redeemed_by: Option<UserId>,
  pub held: bool,
}

type FakeCodes = Arc<Mutex<HashMap<String, FakeCode>>>;

/// Mirrors the row lock: the code is unavailable while held and becomes
/// redeemable again if the claim is dropped unconsumed.
pub struct FakeCodeClaim {
  codes: FakeCodes,
  code: String,
  customer_email: String,
  consumed: bool,
}

#[async_trait]
impl CodeClaim for FakeCodeClaim {
  fn customer_email(&self) -> &str {
    &self.customer_email
  }

  async fn consume(mut self: Box<Self>, user_id: UserId) -> Result<()> {
    if let Some(entry) = self.codes.lock().get_mut(&self.code) {
      entry.redeemed_by = Some(user_id);
      entry.held = false;
    }
    self.consumed = true;
    Ok(())
  }
}

impl Drop for FakeCodeClaim {
  fn drop(&mut self) {
    if !self.consumed {
      if let Some(entry) = self.codes.lock().get_mut(&self.code) {
        entry.held = false;
      }
    }
  }
}

#[derive(Default)]
pub struct FakeStore {
  pub orders: Mutex<Vec<Order>>,
  pub products: Mutex<HashMap<i64, Product>>,
  pub codes: FakeCodes,
  pub fail_queries: AtomicBool,
  pub order_queries: AtomicUsize,
}

impl FakeStore {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn add_order(&self, id: i64, email: &str, product_id: i64, status: OrderStatus, minute: u32) {
    self.orders.lock().push(Order {
      id,
      customer_email: email.to_string(),
      product_id,
      status,
      created_at: at_minute(minute),
    });
  }

  pub fn add_product(&self, id: i64, name: &str) {
    self.products.lock().insert(
      id,
      Product {
        id,
        name: name.to_string(),
      },
    );
  }

  pub fn add_code(&self, code: &str, email: &str) {
    self.codes.lock().insert(
      code.to_string(),
      FakeCode {
        customer_email: email.to_string(),
        redeemed_by: None,
        held: false,
      },
    );
  }

  pub fn status_of(&self, order_id: i64) -> Option<OrderStatus> {
    self.orders.lock().iter().find(|o| o.id == order_id).map(|o| o.status)
  }

  fn check_failure(&self) -> Result<()> {
    if self.fail_queries.load(Ordering::SeqCst) {
      return Err(BotError::Sqlx(sqlx::Error::PoolTimedOut));
    }
    Ok(())
  }
}

pub fn at_minute(minute: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
}

#[async_trait]
impl OrderStore for FakeStore {
  async fn first_pending_order(&self, customer_email: &str) -> Result<Option<Order>> {
    self.order_queries.fetch_add(1, Ordering::SeqCst);
    self.check_failure()?;
    tokio::task::yield_now().await;
    Ok(
      self
        .orders
        .lock()
        .iter()
        .filter(|o| o.customer_email == customer_email && o.status == OrderStatus::Pending)
        .min_by_key(|o| (o.created_at, o.id))
        .cloned(),
    )
  }

  async fn find_product(&self, product_id: i64) -> Result<Option<Product>> {
    self.check_failure()?;
    Ok(self.products.lock().get(&product_id).cloned())
  }

  async fn resolve_order(&self, order_id: i64, status: OrderStatus) -> Result<bool> {
    self.check_failure()?;
    let mut orders = self.orders.lock();
    match orders.iter_mut().find(|o| o.id == order_id) {
      Some(order) if order.status == OrderStatus::Pending => {
        order.status = status;
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  async fn claim_verification_code(&self, code: &str) -> Result<Option<Box<dyn CodeClaim>>> {
    self.check_failure()?;
    let mut codes = self.codes.lock();
    match codes.get_mut(code) {
      Some(entry) if entry.redeemed_by.is_none() && !entry.held => {
        entry.held = true;
        let claim: Box<dyn CodeClaim> = Box::new(FakeCodeClaim {
          codes: self.codes.clone(),
          code: code.to_string(),
          customer_email: entry.customer_email.clone(),
          consumed: false,
        });
        Ok(Some(claim))
      }
      _ => Ok(None),
    }
  }
}

// ---------------------------------------------------------------------------
// Guild gateway
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FakeChannel {
  pub id: ChannelId,
  pub guild_id: GuildId,
  pub name: String,
  pub private_for: Option<UserId>,
}

#[derive(Default)]
pub struct FakeGateway {
  pub channels: Mutex<Vec<FakeChannel>>,
  pub sent: Mutex<Vec<(ChannelId, OutgoingMessage)>>,
  pub deleted: Mutex<Vec<(ChannelId, MessageId)>>,
  pub roles_added: Mutex<Vec<(GuildId, UserId, RoleId)>>,
  pub channels_created: AtomicUsize,
  pub fail_sends: AtomicBool,
  pub fail_deletes: AtomicBool,
  pub fail_roles: AtomicBool,
  next_id: AtomicU64,
}

impl FakeGateway {
  pub fn new() -> Arc<Self> {
    Arc::new(Self {
      next_id: AtomicU64::new(10_000),
      ..Default::default()
    })
  }

  fn next_id(&self) -> u64 {
    self.next_id.fetch_add(1, Ordering::SeqCst)
  }

  pub fn add_channel(&self, guild_id: GuildId, name: &str) -> ChannelId {
    let id = ChannelId::new(self.next_id());
    self.channels.lock().push(FakeChannel {
      id,
      guild_id,
      name: name.to_string(),
      private_for: None,
    });
    id
  }

  pub fn channels_named(&self, name: &str) -> Vec<FakeChannel> {
    self.channels.lock().iter().filter(|c| c.name == name).cloned().collect()
  }

  pub fn messages_in(&self, channel_id: ChannelId) -> Vec<OutgoingMessage> {
    self
      .sent
      .lock()
      .iter()
      .filter(|(id, _)| *id == channel_id)
      .map(|(_, message)| message.clone())
      .collect()
  }
}

#[async_trait]
impl GuildGateway for FakeGateway {
  async fn find_channel_by_name(&self, guild_id: GuildId, name: &str) -> Result<Option<ChannelId>> {
    // Yield so concurrent reconciles interleave between lookup and create.
    tokio::task::yield_now().await;
    Ok(
      self
        .channels
        .lock()
        .iter()
        .find(|c| c.guild_id == guild_id && c.name == name)
        .map(|c| c.id),
    )
  }

  async fn channel_name(&self, channel_id: ChannelId) -> Result<Option<String>> {
    Ok(self.channels.lock().iter().find(|c| c.id == channel_id).map(|c| c.name.clone()))
  }

  async fn create_private_channel(&self, guild_id: GuildId, name: &str, member: UserId) -> Result<ChannelId> {
    tokio::task::yield_now().await;
    let id = ChannelId::new(self.next_id());
    self.channels.lock().push(FakeChannel {
      id,
      guild_id,
      name: name.to_string(),
      private_for: Some(member),
    });
    self.channels_created.fetch_add(1, Ordering::SeqCst);
    Ok(id)
  }

  async fn send_message(&self, channel_id: ChannelId, message: OutgoingMessage) -> Result<MessageId> {
    if self.fail_sends.load(Ordering::SeqCst) {
      return Err(BotError::Internal("send rejected".to_string()));
    }
    self.sent.lock().push((channel_id, message));
    Ok(MessageId::new(self.next_id()))
  }

  async fn delete_message(&self, channel_id: ChannelId, message_id: MessageId) -> Result<()> {
    if self.fail_deletes.load(Ordering::SeqCst) {
      return Err(BotError::Internal("delete rejected".to_string()));
    }
    self.deleted.lock().push((channel_id, message_id));
    Ok(())
  }

  async fn add_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> Result<()> {
    if self.fail_roles.load(Ordering::SeqCst) {
      return Err(BotError::Internal("role grant rejected".to_string()));
    }
    self.roles_added.lock().push((guild_id, user_id, role_id));
    Ok(())
  }
}

// ---------------------------------------------------------------------------
// Interaction responder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
  Deferred { ephemeral: bool },
  Replied(Reply),
  Edited(String),
  Modal(ModalForm),
}

/// Follows the same ordering rules as the Discord responder.
#[derive(Default)]
pub struct FakeResponder {
  latch: ResponseLatch,
  pub responses: Mutex<Vec<Response>>,
  pub fail_replies: AtomicBool,
  /// Runs once when the next reply is sent, standing in for work that lands
  /// while the reply is in flight.
  pub during_reply: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl FakeResponder {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn responses(&self) -> Vec<Response> {
    self.responses.lock().clone()
  }

  /// Text the user ends up seeing.
  pub fn final_text(&self) -> Option<String> {
    self.responses.lock().iter().rev().find_map(|r| match r {
      Response::Replied(reply) => Some(reply.content.clone()),
      Response::Edited(text) => Some(text.clone()),
      _ => None,
    })
  }

  fn ensure_pending(&self) -> Result<()> {
    if self.latch.state().is_pending() {
      Ok(())
    } else {
      Err(BotError::AlreadyResponded("fake".to_string()))
    }
  }
}

#[async_trait]
impl InteractionResponder for FakeResponder {
  fn response_state(&self) -> ResponseState {
    self.latch.state()
  }

  async fn defer(&self, ephemeral: bool) -> Result<()> {
    self.ensure_pending()?;
    self.responses.lock().push(Response::Deferred { ephemeral });
    self.latch.set(ResponseState::Deferred);
    Ok(())
  }

  async fn reply(&self, reply: Reply) -> Result<()> {
    self.ensure_pending()?;
    let during = self.during_reply.lock().take();
    if let Some(during) = during {
      during();
    }
    if self.fail_replies.load(Ordering::SeqCst) {
      return Err(BotError::Internal("reply rejected".to_string()));
    }
    self.responses.lock().push(Response::Replied(reply));
    self.latch.set(ResponseState::Replied);
    Ok(())
  }

  async fn edit_reply(&self, content: &str) -> Result<()> {
    match self.latch.state() {
      ResponseState::Deferred | ResponseState::Replied => {}
      _ => return Err(BotError::Validation("nothing to edit".to_string())),
    }
    self.responses.lock().push(Response::Edited(content.to_string()));
    self.latch.set(ResponseState::Replied);
    Ok(())
  }

  async fn show_modal(&self, form: ModalForm) -> Result<()> {
    self.ensure_pending()?;
    self.responses.lock().push(Response::Modal(form));
    self.latch.set(ResponseState::ModalShown);
    Ok(())
  }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub fn test_config(extra: &[(&str, &str)]) -> BotConfig {
  let esim_channel = ESIM_CHANNEL.get().to_string();
  let esim_role = ESIM_ROLE.get().to_string();
  let staff_role = STAFF_ROLE.get().to_string();
  let verified_role = VERIFIED_ROLE.get().to_string();
  let mut vars: HashMap<String, String> = [
    ("DISCORD_BOT_TOKEN", "test-token"),
    ("DB_HOST", "localhost"),
    ("DB_USER", "sfdesk"),
    ("DB_PASS", "secret"),
    ("DB_NAME", "shop"),
    ("ESIM_CHANNEL_ID", esim_channel.as_str()),
    ("ESIM_ROLE_ID", esim_role.as_str()),
    ("STAFF_ROLE_ID", staff_role.as_str()),
    ("VERIFIED_ROLE_ID", verified_role.as_str()),
  ]
  .iter()
  .map(|(k, v)| (k.to_string(), v.to_string()))
  .collect();
  for (k, v) in extra {
    vars.insert(k.to_string(), v.to_string());
  }
  BotConfig::from_lookup(move |key| vars.get(key).cloned()).unwrap()
}

pub fn test_state_with(store: Arc<FakeStore>, config: BotConfig) -> AppState {
  let state = AppState::new(store, config);
  pipelines::register_all_flows(&state.flows);
  state
}

pub fn test_state(store: Arc<FakeStore>) -> AppState {
  test_state_with(store, test_config(&[]))
}

pub fn test_router(store: Arc<FakeStore>) -> Router {
  Router::new(test_state(store))
}

pub fn invoker(user_id: UserId, channel_id: ChannelId, roles: &[RoleId]) -> Invoker {
  Invoker {
    user_id,
    guild_id: Some(GUILD),
    channel_id,
    roles: roles.to_vec(),
  }
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
