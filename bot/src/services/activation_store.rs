// src/services/activation_store.rs

//! Activation details held between the eSIM modal submission and the QR reply.

use parking_lot::Mutex;
use poise::serenity_prelude::UserId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingActivation {
  pub activation_code: String,
  pub smdp_address: String,
}

/// Identifies one stored submission, so a flow only ever evicts its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationKey {
  pub user_id: UserId,
  seq: u64,
}

struct Entry {
  activation: PendingActivation,
  stored_at: Instant,
  seq: u64,
}

/// One entry per user. A new submission replaces the previous one, and
/// entries older than the TTL are dropped whenever something is inserted.
pub struct ActivationStore {
  ttl: Duration,
  next_seq: AtomicU64,
  entries: Mutex<HashMap<UserId, Entry>>,
}

impl ActivationStore {
  pub fn new(ttl: Duration) -> Self {
    Self {
      ttl,
      next_seq: AtomicU64::new(0),
      entries: Mutex::new(HashMap::new()),
    }
  }

  /// Returns the key of the new entry and the entry it superseded, if any.
  pub fn insert(&self, user_id: UserId, activation: PendingActivation) -> (ActivationKey, Option<PendingActivation>) {
    self.insert_at(user_id, activation, Instant::now())
  }

  fn insert_at(
    &self,
    user_id: UserId,
    activation: PendingActivation,
    now: Instant,
  ) -> (ActivationKey, Option<PendingActivation>) {
    let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
    let mut entries = self.entries.lock();
    let before = entries.len();
    entries.retain(|_, entry| now.saturating_duration_since(entry.stored_at) < self.ttl);
    let purged = before - entries.len();
    if purged > 0 {
      debug!(purged, "Expired activation entries purged.");
    }
    let superseded = entries
      .insert(
        user_id,
        Entry {
          activation,
          stored_at: now,
          seq,
        },
      )
      .map(|previous| previous.activation);
    (ActivationKey { user_id, seq }, superseded)
  }

  pub fn get(&self, user_id: UserId) -> Option<PendingActivation> {
    self.entries.lock().get(&user_id).map(|entry| entry.activation.clone())
  }

  /// Removes the entry stored under `key`. A newer submission from the same
  /// user is left in place.
  pub fn evict(&self, key: ActivationKey) -> Option<PendingActivation> {
    let mut entries = self.entries.lock();
    match entries.get(&key.user_id) {
      Some(entry) if entry.seq == key.seq => entries.remove(&key.user_id).map(|entry| entry.activation),
      _ => None,
    }
  }

  pub fn len(&self) -> usize {
    self.entries.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.lock().is_empty()
  }
}
