//! Error types shared across the Stocker crates.

/// Convenience alias used by every fallible Stocker API.
pub type Result<T> = std::result::Result<T, StockerError>;

/// All errors surfaced by the storage client, scheduler and crawler jobs.
#[derive(Debug, thiserror::Error)]
pub enum StockerError {
    /// The HTTP transport failed (connect, timeout, body read).
    #[error("HTTP transport error: {0}")]
    Transport(String),

    /// The gateway answered with a non-success status.
    #[error("Gateway returned HTTP {status} for {context}")]
    Protocol { status: u16, context: String },

    /// A successful response lacked a header the protocol requires.
    #[error("Gateway response for {context} is missing the {header} header")]
    MissingHeader {
        header: &'static str,
        context: String,
    },

    /// The wire payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The client or scanner has already been released.
    #[error("{0} has been disposed")]
    Disposed(&'static str),

    /// The bounded queue was closed while the operation was pending.
    #[error("Queue is closed")]
    QueueClosed,

    /// A registered task could not be constructed.
    #[error("Failed to activate task '{name}': {reason}")]
    Activation { name: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl StockerError {
    /// Build a protocol error from an HTTP status code.
    pub fn protocol(status: u16, context: impl Into<String>) -> Self {
        Self::Protocol {
            status,
            context: context.into(),
        }
    }

    /// Build a decode error from any displayable cause.
    pub fn decode(cause: impl std::fmt::Display) -> Self {
        Self::Decode(cause.to_string())
    }

    /// Whether this error came from the gateway rather than from local state.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. } | Self::MissingHeader { .. } | Self::Decode(_)
        )
    }
}
