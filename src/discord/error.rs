//! Errors raised while talking to the Discord REST API.

use thiserror::Error;

/// Errors from the Discord client and entity lookups.
#[derive(Debug, Error)]
pub enum DiscordError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Discord answered with an error body.
    #[error("Discord API error {code} (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Discord JSON error code.
        code: i64,
        /// Discord error message.
        message: String,
    },

    /// Discord rejected the request with HTTP 429.
    #[error("Rate limited, retry after {retry_after} seconds")]
    RateLimited {
        /// Seconds Discord asked us to wait.
        retry_after: f64,
    },

    /// A lookup by ID or name matched nothing.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of entity, e.g. `channel`.
        entity: &'static str,
        /// The ID or name that was looked up.
        key: String,
    },

    /// The channel has no overwrite for the given target.
    #[error("permission overwrite not found for {kind} type {id}")]
    OverwriteNotFound {
        /// Role or member ID.
        id: String,
        /// `role` or `member`.
        kind: String,
    },

    /// An overwrite type other than `role` or `member`.
    #[error("invalid permission type: {0}")]
    InvalidPermissionType(String),

    /// A channel type name that has no Discord value.
    #[error("invalid channel type {0}")]
    InvalidChannelType(String),

    /// Fetching a channel for a guild-scoped lookup failed.
    #[error("failed to fetch channel from guild {guild_id} with id {id}: {source}")]
    ChannelFetch {
        /// Guild the channel was expected in.
        guild_id: String,
        /// Channel ID.
        id: String,
        /// Underlying failure.
        source: Box<DiscordError>,
    },
}

impl DiscordError {
    /// Shorthand for [`DiscordError::NotFound`].
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Returns true if Discord reported the entity as missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } | Self::OverwriteNotFound { .. } => true,
            Self::Api { status, .. } => *status == 404,
            _ => false,
        }
    }
}

/// Result type for Discord operations.
pub type DiscordResult<T> = Result<T, DiscordError>;
