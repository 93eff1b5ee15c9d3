// src/flow/mod.rs

//! The [`Flow`] type: definition and step editing, hook registration, and
//! execution live in separate files.

pub mod definition;
pub mod execution;
pub mod hooks;

pub use definition::Flow;
