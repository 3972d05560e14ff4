//! Discord REST layer: client, wire types, enum tables and lookups.

mod client;
pub mod enums;
mod error;
pub mod format;
pub mod lookup;
pub mod types;

#[cfg(test)]
pub mod fake;

pub use client::{DiscordApi, DiscordClient};
pub use error::{DiscordError, DiscordResult};
pub use lookup::Key;
