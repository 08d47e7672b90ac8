use valentine_core::authz::ErrorKind;
use valentine_core::error::CoreError;
use valentine_gateway::GatewayError;

/// Errors surfaced by the client layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A backend call failed. Passed through unmodified.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Input was rejected before anything was sent.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A reorder stopped part-way. `applied` updates reached the backend
    /// before `source` failed; they are not rolled back.
    #[error("Reorder stopped after {applied} of {total} updates: {source}")]
    Reorder {
        applied: usize,
        total: usize,
        source: GatewayError,
    },

    /// The active version could not be read from or written to disk.
    #[error("Version store error: {0}")]
    Persistence(String),

    /// A cache entry held a different shape than its key implies.
    #[error("Unexpected cached data for {0}")]
    CacheShape(String),
}

/// Convenience alias for client return values.
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// The gateway error kind behind this failure, if any.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ClientError::Gateway(err) | ClientError::Reorder { source: err, .. } => {
                Some(err.kind())
            }
            _ => None,
        }
    }

    pub fn is_authorization(&self) -> bool {
        self.kind().is_some_and(ErrorKind::is_authorization)
    }

    /// Text for a toast or alert. Validation failures keep their detail
    /// since they describe what the user typed.
    pub fn friendly_message(&self) -> String {
        match self {
            ClientError::Core(err) => err.to_string(),
            _ => self
                .kind()
                .unwrap_or(ErrorKind::Backend)
                .friendly_message()
                .to_string(),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Persistence(err.to_string())
    }
}
