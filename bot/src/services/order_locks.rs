// src/services/order_locks.rs

//! Per-order mutual exclusion for the look-then-create ticket sequence.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct OrderLocks {
  locks: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

/// Held while a task owns an order. Dropping it releases the order and
/// forgets the lock once nobody else is waiting on it.
pub struct OrderClaim {
  owner: Arc<OrderLocks>,
  order_id: i64,
  guard: Option<OwnedMutexGuard<()>>,
}

impl OrderLocks {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn claim(self: &Arc<Self>, order_id: i64) -> OrderClaim {
    let lock = {
      let mut locks = self.locks.lock();
      locks.entry(order_id).or_default().clone()
    };
    let guard = lock.lock_owned().await;
    OrderClaim {
      owner: Arc::clone(self),
      order_id,
      guard: Some(guard),
    }
  }

  /// Orders with a live claim or waiter.
  pub fn tracked(&self) -> usize {
    self.locks.lock().len()
  }
}

impl std::fmt::Debug for OrderClaim {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OrderClaim").field("order_id", &self.order_id).finish()
  }
}

impl OrderClaim {
  pub fn order_id(&self) -> i64 {
    self.order_id
  }
}

impl Drop for OrderClaim {
  fn drop(&mut self) {
    let mut locks = self.owner.locks.lock();
    self.guard.take();
    // The map holds one reference; any other means a waiter still needs it.
    if let Some(lock) = locks.get(&self.order_id) {
      if Arc::strong_count(lock) == 1 {
        locks.remove(&self.order_id);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::time::Duration;

  #[tokio::test]
  async fn claims_on_one_order_are_serialized() {
    let locks = Arc::new(OrderLocks::new());
    let inside = Arc::new(AtomicUsize::new(0));
    let max_inside = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for _ in 0..8 {
      let (locks, inside, max_inside) = (locks.clone(), inside.clone(), max_inside.clone());
      tasks.push(tokio::spawn(async move {
        let _claim = locks.claim(7).await;
        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
        max_inside.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        inside.fetch_sub(1, Ordering::SeqCst);
      }));
    }
    for task in tasks {
      task.await.unwrap();
    }

    assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    assert_eq!(locks.tracked(), 0);
  }

  #[tokio::test]
  async fn different_orders_do_not_block_each_other() {
    let locks = Arc::new(OrderLocks::new());
    let first = locks.claim(1).await;
    let second = tokio::time::timeout(Duration::from_millis(100), locks.claim(2)).await;
    assert!(second.is_ok());
    assert_eq!(first.order_id(), 1);
    assert_eq!(locks.tracked(), 2);
  }
}
