// src/models/mod.rs

//! Rows read from the shop database.

pub mod order;
pub mod product;

pub use order::{Order, OrderStatus, UnknownOrderStatus};
pub use product::Product;
