//! embedsmith -- a Discord bot for composing rich embeds.
//!
//! Provides a single slash command, `/embed`, that builds an embed from
//! typed options (title, description, color, thumbnail, optional footer
//! and image) and presents three follow-up actions to the invoking user:
//! preview it privately, publish it to the channel, or cancel.
//!
//! # Architecture
//!
//! ```text
//! GatewayClient ──INTERACTION_CREATE──> App::handle_interaction
//!                                            │
//!                          ┌─────────────────┼──────────────────┐
//!                    /embed command     button press        anything else
//!                          │                 │                  │
//!                 EmbedRequest -> CardSpec   SessionStore       ignored
//!                          │                 │
//!                     SessionStore      preview / send / cancel
//!                          │                 │
//!                     Arc<dyn DiscordApi> (REST)
//! ```
//!
//! # Error handling
//!
//! Per-invocation failures are [`CommandError`](error::CommandError)s and
//! are converted into ephemeral replies at the dispatch boundary in
//! [`App::handle_interaction`](flow::App::handle_interaction); transport
//! failures are [`PlatformError`](error::PlatformError)s. Nothing
//! propagates far enough to take the process down.

pub mod api;
pub mod card;
pub mod color;
pub mod commands;
pub mod config;
pub mod error;
pub mod flow;
pub mod gateway;
pub mod secret;

pub use api::{ApiClient, DiscordApi};
pub use card::CardSpec;
pub use commands::EmbedRequest;
pub use config::Config;
pub use error::{CommandError, ConfigError, PlatformError};
pub use flow::App;
pub use gateway::GatewayClient;
