//! Discord Gateway connection.
//!
//! # Modules
//!
//! - [`events`] -- Gateway payload envelope, opcodes, and the
//!   INTERACTION_CREATE types
//! - [`client`] -- the long-lived WebSocket connection loop

pub mod client;
pub mod events;

pub use client::GatewayClient;
