//! Discord Provider
//!
//! An infrastructure-as-code provider plugin that manages Discord guild
//! objects through the Discord REST API. The host spawns the plugin binary,
//! reads the handshake line from stdout and talks to it over gRPC.
//!
//! # Resources
//!
//! - `discord_channel`: guild channels of any type
//! - `discord_role`: guild roles
//! - `discord_permissions`: permission overwrites on a channel
//! - `discord_webhook`: channel webhooks
//! - `discord_role_members`: the exact member set of a role
//!
//! Every resource doubles as a data source. `discord_guild` and
//! `discord_member` are data sources only.
//!
//! # Quick Start
//!
//! ```ignore
//! use discord_provider::{init_logging, serve, DiscordProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!     serve(DiscordProvider::new()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Handshake Protocol
//!
//! ```text
//! PROVIDER_PLUGIN|1|127.0.0.1:50051
//! ```
//!
//! Format: `PROVIDER_PLUGIN|<protocol_version>|<address>`
//!
//! # Values
//!
//! State, plans and configuration travel as JSON. An attribute whose value
//! is not known until apply carries the string
//! [`UNKNOWN_SENTINEL`](value::UNKNOWN_SENTINEL).

#![warn(clippy::all)]

pub mod config;
pub mod discord;
pub mod error;
pub mod handler;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;
pub mod value;

mod data_sources;
mod resources;

#[allow(clippy::all)]
pub mod generated;

pub use error::{ProviderError, ProviderResult};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::DiscordProvider;
pub use schema::ProviderSchema;
pub use server::{serve, serve_with_options, ProviderService, ServeOptions};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
