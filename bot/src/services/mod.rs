// src/services/mod.rs

pub mod activation_store;
pub mod guild_gateway;
pub mod order_locks;
pub mod order_store;
pub mod qr;
