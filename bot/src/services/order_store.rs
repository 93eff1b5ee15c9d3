// src/services/order_store.rs

//! Reads and the few writes this bot makes against the shop database.

use crate::errors::{BotError, Result};
use crate::models::{Order, OrderStatus, Product};
use async_trait::async_trait;
use poise::serenity_prelude::UserId;
use sqlx::{MySql, MySqlPool, Transaction};
use tracing::{info, instrument, warn};

#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Oldest pending order for `customer_email`, if any.
  async fn first_pending_order(&self, customer_email: &str) -> Result<Option<Order>>;

  async fn find_product(&self, product_id: i64) -> Result<Option<Product>>;

  /// Moves a pending order to `status`. Returns `false` when the order does
  /// not exist or is no longer pending.
  async fn resolve_order(&self, order_id: i64, status: OrderStatus) -> Result<bool>;

  /// Locks a pending, unexpired code for one redemption attempt. `None` when
  /// the code is unknown, expired or already used.
  async fn claim_verification_code(&self, code: &str) -> Result<Option<Box<dyn CodeClaim>>>;
}

/// A verification code held by one `/verify` attempt. Dropping the claim
/// without consuming it leaves the code redeemable.
#[async_trait]
pub trait CodeClaim: Send {
  fn customer_email(&self) -> &str;

  /// Marks the code as used by `user_id` and releases the claim.
  async fn consume(self: Box<Self>, user_id: UserId) -> Result<()>;
}

pub struct MySqlOrderStore {
  pool: MySqlPool,
}

impl MySqlOrderStore {
  pub fn new(pool: MySqlPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl OrderStore for MySqlOrderStore {
  #[instrument(name = "OrderStore::first_pending_order", skip(self), err(Display))]
  async fn first_pending_order(&self, customer_email: &str) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(
      "SELECT CAST(id AS SIGNED) AS id, customer_email, CAST(product_id AS SIGNED) AS product_id, \
       status, created_at \
       FROM orders WHERE customer_email = ? AND status = ? \
       ORDER BY created_at, id LIMIT 1",
    )
    .bind(customer_email)
    .bind(OrderStatus::Pending.as_str())
    .fetch_optional(&self.pool)
    .await?;
    Ok(order)
  }

  #[instrument(name = "OrderStore::find_product", skip(self), err(Display))]
  async fn find_product(&self, product_id: i64) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>("SELECT CAST(id AS SIGNED) AS id, name FROM products WHERE id = ?")
      .bind(product_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(product)
  }

  #[instrument(name = "OrderStore::resolve_order", skip(self, status), fields(status = %status), err(Display))]
  async fn resolve_order(&self, order_id: i64, status: OrderStatus) -> Result<bool> {
    if status == OrderStatus::Pending {
      return Err(BotError::Validation(format!(
        "order {} cannot be resolved back to pending",
        order_id
      )));
    }
    let result = sqlx::query("UPDATE orders SET status = ? WHERE id = ? AND status = ?")
      .bind(status.as_str())
      .bind(order_id)
      .bind(OrderStatus::Pending.as_str())
      .execute(&self.pool)
      .await?;

    let updated = result.rows_affected() == 1;
    if updated {
      info!(order_id, "Order resolved.");
    } else {
      warn!(order_id, "Order was not pending; status left unchanged.");
    }
    Ok(updated)
  }

  #[instrument(name = "OrderStore::claim_verification_code", skip(self, code), err(Display))]
  async fn claim_verification_code(&self, code: &str) -> Result<Option<Box<dyn CodeClaim>>> {
    let mut tx = self.pool.begin().await?;

    // Row lock lasts until the claim is consumed or dropped.
    let email = sqlx::query_scalar::<_, String>(
      "SELECT customer_email FROM verification_codes \
       WHERE code = ? AND status = 'pending' AND (expires_at IS NULL OR expires_at > UTC_TIMESTAMP()) \
       FOR UPDATE",
    )
    .bind(code)
    .fetch_optional(&mut *tx)
    .await?;

    match email {
      Some(customer_email) => {
        let claim: Box<dyn CodeClaim> = Box::new(MySqlCodeClaim {
          tx,
          code: code.to_string(),
          customer_email,
        });
        Ok(Some(claim))
      }
      None => {
        tx.rollback().await?;
        Ok(None)
      }
    }
  }
}

/// Holds the transaction that locked the code row. sqlx rolls the
/// transaction back when it is dropped uncommitted.
struct MySqlCodeClaim {
  tx: Transaction<'static, MySql>,
  code: String,
  customer_email: String,
}

#[async_trait]
impl CodeClaim for MySqlCodeClaim {
  fn customer_email(&self) -> &str {
    &self.customer_email
  }

  #[instrument(name = "CodeClaim::consume", skip(self, user_id), fields(user_id = %user_id), err(Display))]
  async fn consume(self: Box<Self>, user_id: UserId) -> Result<()> {
    let MySqlCodeClaim { mut tx, code, .. } = *self;
    sqlx::query(
      "UPDATE verification_codes \
       SET status = 'consumed', discord_user_id = ?, consumed_at = UTC_TIMESTAMP() \
       WHERE code = ? AND status = 'pending'",
    )
    .bind(user_id.get())
    .bind(&code)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!("Verification code redeemed.");
    Ok(())
  }
}
