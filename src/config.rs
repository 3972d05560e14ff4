//! Provider configuration.
//!
//! The provider block is decoded into [`ProviderConfig`]. Each key falls back
//! to an environment variable when the block leaves it null. The result is a
//! [`ClientConfig`] ready to build the REST client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::schema::{Attribute, Diagnostic, Schema};
use crate::value::Attr;

/// Discord REST API base URL.
pub const DEFAULT_API_URL: &str = "https://discord.com/api/v10";

/// Environment fallback for `access_token`.
pub const ACCESS_TOKEN_ENV: &str = "DISCORD_ACCESS_TOKEN";

/// Environment fallback for `oauth2_client_id`.
pub const OAUTH2_CLIENT_ID_ENV: &str = "DISCORD_OAUTH2_CLIENT_ID";

/// Settings for the Discord REST client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Bot token, with or without the `Bot ` prefix.
    pub access_token: String,

    /// OAuth2 application ID. Not needed by any current endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth2_client_id: Option<String>,

    /// Base URL for the Discord API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout", with = "duration_secs")]
    pub timeout: Duration,
}

impl ClientConfig {
    /// Config with default URL and timeout.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            oauth2_client_id: None,
            api_url: default_api_url(),
            timeout: default_timeout(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// The provider block as written by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub access_token: Attr<String>,
    pub oauth2_client_id: Attr<String>,
    pub api_url: Attr<String>,
    pub timeout_secs: Attr<i64>,
}

impl ProviderConfig {
    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "access_token",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("The bot access token for Discord."),
            )
            .with_attribute(
                "oauth2_client_id",
                Attribute::optional_string().with_description("The OAuth2 client ID for Discord."),
            )
            .with_attribute(
                "api_url",
                Attribute::optional_string()
                    .with_description("Base URL of the Discord REST API.")
                    .with_default(serde_json::json!(DEFAULT_API_URL)),
            )
            .with_attribute(
                "timeout_secs",
                Attribute::optional_int64()
                    .with_description("Timeout for each Discord API request, in seconds.")
                    .with_default(serde_json::json!(30)),
            )
    }

    /// Resolves the block against the process environment.
    pub fn resolve(&self) -> Result<ClientConfig, Vec<Diagnostic>> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolves the block, reading fallbacks through `env`.
    pub fn resolve_with<F>(&self, env: F) -> Result<ClientConfig, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut diagnostics = Vec::new();

        if self.access_token.is_unknown() {
            diagnostics.push(unknown_value(
                "access_token",
                "Unknown Discord access token",
                "Discord access token",
                ACCESS_TOKEN_ENV,
            ));
        }
        if self.oauth2_client_id.is_unknown() {
            diagnostics.push(unknown_value(
                "oauth2_client_id",
                "Unknown Discord OAuth2 client ID",
                "Discord OAuth2 client ID",
                OAUTH2_CLIENT_ID_ENV,
            ));
        }
        if !diagnostics.is_empty() {
            return Err(diagnostics);
        }

        let access_token = self
            .access_token
            .known()
            .cloned()
            .or_else(|| env(ACCESS_TOKEN_ENV))
            .unwrap_or_default();
        let oauth2_client_id = self
            .oauth2_client_id
            .known()
            .cloned()
            .or_else(|| env(OAUTH2_CLIENT_ID_ENV))
            .filter(|id| !id.is_empty());

        if access_token.is_empty() {
            return Err(vec![Diagnostic::error("Missing Discord access token")
                .with_detail(format!(
                    "The provider cannot create the Discord client as there is a missing or empty \
                     value for the Discord access token. Set the access_token value in the \
                     configuration or use the {ACCESS_TOKEN_ENV} environment variable. If either \
                     is already set, ensure the value is not empty."
                ))
                .with_attribute("access_token")]);
        }

        let timeout = match self.timeout_secs.known() {
            Some(&secs) if secs <= 0 => {
                return Err(vec![Diagnostic::error("Invalid Discord API timeout")
                    .with_detail(format!("timeout_secs must be positive, got {secs}"))
                    .with_attribute("timeout_secs")]);
            },
            Some(&secs) => Duration::from_secs(secs.unsigned_abs()),
            None => default_timeout(),
        };

        Ok(ClientConfig {
            access_token,
            oauth2_client_id,
            api_url: self.api_url.known().cloned().unwrap_or_else(default_api_url),
            timeout,
        })
    }
}

fn unknown_value(attribute: &str, summary: &str, what: &str, env_var: &str) -> Diagnostic {
    Diagnostic::error(summary)
        .with_detail(format!(
            "The provider cannot create the Discord client as there is an unknown configuration \
             value for the {what}. Either target apply the source of the value first, set the \
             value statically in the configuration, or use the {env_var} environment variable."
        ))
        .with_attribute(attribute)
}
