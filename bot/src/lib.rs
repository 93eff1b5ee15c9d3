// src/lib.rs

//! sfdesk: a Discord bot that verifies customers, opens private tickets for
//! their pending orders and issues eSIM activation QR codes to staff.

pub mod config;
pub mod discord;
pub mod errors;
pub mod interaction;
pub mod messages;
pub mod models;
pub mod pipelines;
pub mod router;
pub mod services;
pub mod state;
