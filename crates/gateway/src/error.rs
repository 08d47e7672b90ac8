use valentine_core::authz::{self, ErrorKind};

/// Errors from the content gateway.
///
/// Every variant maps to an [`ErrorKind`] via [`GatewayError::kind`];
/// callers branch on the kind rather than on message text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The connection or session has not been established yet.
    #[error("Actor not available")]
    NotReady,

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("Request failed: {0}")]
    Transport(String),

    /// The backend rejected the call. `message` is passed through verbatim.
    #[error("{message}")]
    Backend { kind: ErrorKind, message: String },

    /// The backend answered with a payload that could not be decoded.
    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// Convenience alias for gateway return values.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    /// Build a backend error from an optional structured code and the raw
    /// message. A recognized code wins; otherwise the message is classified
    /// by its legacy phrasing.
    pub fn from_backend(code: Option<&str>, message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = code
            .and_then(ErrorKind::from_code)
            .unwrap_or_else(|| authz::classify_message(&message));
        GatewayError::Backend { kind, message }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::NotReady => ErrorKind::NotReady,
            GatewayError::Transport(_) => ErrorKind::Network,
            GatewayError::Backend { kind, .. } => *kind,
            GatewayError::Decode(_) => ErrorKind::Decode,
        }
    }

    pub fn is_authorization(&self) -> bool {
        self.kind().is_authorization()
    }

    /// Short, non-technical text suitable for a toast or alert.
    pub fn friendly_message(&self) -> &'static str {
        self.kind().friendly_message()
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}
