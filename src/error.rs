//! Error types for the provider layer.

use thiserror::Error;

use crate::discord::DiscordError;
use crate::schema::Diagnostic;

/// Errors raised while serving a host request.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider block could not be turned into a client.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// User-facing problems already phrased as diagnostics.
    #[error("{}", render(.0))]
    Diagnostics(Vec<Diagnostic>),

    /// A Discord call failed outside a named operation.
    #[error(transparent)]
    Discord(#[from] DiscordError),

    /// A Discord call failed during a named operation.
    #[error("{summary}: {source}")]
    Remote {
        /// Operation summary, e.g. `Failed to create channel`.
        summary: String,
        /// Underlying failure.
        source: DiscordError,
    },

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Binding or writing the handshake failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn render(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| match &d.detail {
            Some(detail) => format!("{}: {}", d.summary, detail),
            None => d.summary.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

impl ProviderError {
    /// A single-diagnostic error.
    pub fn diagnostic(diagnostic: Diagnostic) -> Self {
        Self::Diagnostics(vec![diagnostic])
    }

    /// Attaches an operation summary to a Discord failure.
    ///
    /// Produces `Failed to <action> <entity>`. Other variants pass through.
    pub fn in_operation(self, action: &str, entity: &str) -> Self {
        match self {
            Self::Discord(source) => Self::Remote {
                summary: format!("Failed to {action} {entity}"),
                source,
            },
            other => other,
        }
    }

    /// Renders the error as host diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Self::Diagnostics(diagnostics) => diagnostics.clone(),
            Self::Remote { summary, source } => {
                vec![Diagnostic::error(summary.clone()).with_detail(source.to_string())]
            },
            Self::Discord(err) => {
                vec![Diagnostic::error("Discord API request failed").with_detail(err.to_string())]
            },
            Self::Configuration(msg) => {
                vec![Diagnostic::error("Invalid provider configuration").with_detail(msg.clone())]
            },
            Self::UnknownResource(name) => vec![Diagnostic::error(format!(
                "Unknown resource type: {name}"
            ))],
            other => vec![Diagnostic::error(other.to_string())],
        }
    }
}

impl From<Vec<Diagnostic>> for ProviderError {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self::Diagnostics(diagnostics)
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            },
            ProviderError::Diagnostics(_) => tonic::Status::invalid_argument(err.to_string()),
            ProviderError::Discord(DiscordError::RateLimited { .. }) => {
                tonic::Status::resource_exhausted(err.to_string())
            },
            other => tonic::Status::internal(other.to_string()),
        }
    }
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
