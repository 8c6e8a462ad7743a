//! Client error types.

use thiserror::Error;

/// Result type for cluster client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Cluster client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid client setup. Only produced at construction time.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The target server could not be connected to at all. Carries the URL
    /// that was being dialed; failures after the connect phase surface as
    /// [`ClientError::Transport`] instead.
    #[error("Could not connect to {url}")]
    CouldNotConnect {
        /// URL of the server the connect attempt was aimed at.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Transport-level I/O failure past the connect phase (timeout, reset,
    /// stream error).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response failed to decode and its declared content type is not
    /// the protocol media type — typically an intercepting proxy answering
    /// with its own error page.
    #[error("Request {request} yielded {media_type}, should be json: {version} {status} {reason}")]
    ProtocolMismatch {
        /// Description of the request that was sent.
        request: String,
        /// The offending declared media type.
        media_type: String,
        /// HTTP version of the response.
        version: String,
        /// HTTP status code of the response.
        status: u16,
        /// Status reason phrase.
        reason: String,
    },

    /// The response failed to decode even though it claimed to be the
    /// protocol media type. Surfaced unchanged.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ClientError {
    /// Check if this is a connect-phase failure.
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::CouldNotConnect { .. })
    }

    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Check if this is a protocol mismatch.
    pub fn is_protocol_mismatch(&self) -> bool {
        matches!(self, Self::ProtocolMismatch { .. })
    }
}
