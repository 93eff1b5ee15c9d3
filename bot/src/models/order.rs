// src/models/order.rs

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::fmt;
use thiserror::Error;

/// Order lifecycle as stored in `orders.status` (lowercase strings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
  Pending,
  Completed,
  Failed,
  Cancelled,
}

#[derive(Debug, Error)]
#[error("unknown order status '{0}'")]
pub struct UnknownOrderStatus(pub String);

impl OrderStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Completed => "completed",
      OrderStatus::Failed => "failed",
      OrderStatus::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl TryFrom<String> for OrderStatus {
  type Error = UnknownOrderStatus;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    match value.as_str() {
      "pending" => Ok(OrderStatus::Pending),
      "completed" => Ok(OrderStatus::Completed),
      "failed" => Ok(OrderStatus::Failed),
      "cancelled" => Ok(OrderStatus::Cancelled),
      _ => Err(UnknownOrderStatus(value)),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Order {
  pub id: i64,
  pub customer_email: String,
  pub product_id: i64,
  #[sqlx(try_from = "String")]
  pub status: OrderStatus,
  pub created_at: DateTime<Utc>,
}

impl Order {
  /// Name of the private support channel opened for this order.
  pub fn ticket_channel_name(&self) -> String {
    ticket_channel_name(self.id)
  }
}

pub fn ticket_channel_name(order_id: i64) -> String {
  format!("ticket-{}", order_id)
}

/// Inverse of [`ticket_channel_name`]. Only canonical decimal ids match.
pub fn order_id_from_ticket_channel(channel_name: &str) -> Option<i64> {
  let digits = channel_name.strip_prefix("ticket-")?;
  if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
    return None;
  }
  let id = digits.parse::<i64>().ok()?;
  (ticket_channel_name(id) == channel_name).then_some(id)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_strings_round_trip_and_reject_unknown() {
    for status in [
      OrderStatus::Pending,
      OrderStatus::Completed,
      OrderStatus::Failed,
      OrderStatus::Cancelled,
    ] {
      assert_eq!(OrderStatus::try_from(status.as_str().to_string()).unwrap(), status);
    }
    assert!(OrderStatus::try_from("PENDING".to_string()).is_err());
  }

  #[test]
  fn ticket_channel_names_parse_back() {
    assert_eq!(ticket_channel_name(42), "ticket-42");
    assert_eq!(order_id_from_ticket_channel("ticket-42"), Some(42));
    assert_eq!(order_id_from_ticket_channel("ticket-"), None);
    assert_eq!(order_id_from_ticket_channel("ticket-042"), None);
    assert_eq!(order_id_from_ticket_channel("ticket--1"), None);
    assert_eq!(order_id_from_ticket_channel("general"), None);
  }
}
