// src/models/product.rs

use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Product {
  pub id: i64,
  pub name: String,
}
