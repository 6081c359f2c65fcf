//! Error types for hasync-client

/// Result type for hasync-client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors talking to Home Assistant
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// A WebSocket command answered with `success: false`.
    #[error("{command} failed ({code}): {message}")]
    Command {
        command: String,
        code: String,
        message: String,
    },

    #[error("Unexpected response: {message}")]
    Protocol { message: String },

    #[error("Flow for {handler} failed: {message}")]
    Flow { handler: String, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ClientError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn flow(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Flow {
            handler: handler.into(),
            message: message.into(),
        }
    }

    /// The resource asked for does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 404,
            Self::Command { code, .. } => code == "not_found" || code == "config_not_found",
            _ => false,
        }
    }

    /// The command is not registered, usually because its integration is not loaded.
    pub fn is_unknown_command(&self) -> bool {
        matches!(self, Self::Command { code, .. } if code == "unknown_command")
    }

    /// Convert into a core remote error attributed to `operation`.
    pub fn during(self, operation: impl Into<String>) -> hasync_core::Error {
        hasync_core::Error::remote(operation, self.to_string())
    }
}

impl From<ClientError> for hasync_core::Error {
    fn from(e: ClientError) -> Self {
        e.during("request")
    }
}
