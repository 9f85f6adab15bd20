/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The attempt did not complete within its timeout.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// The server answered 401. The stored user record has been removed.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// The server answered 404 for the requested endpoint.
    #[error("endpoint not found: {endpoint}")]
    NotFound { endpoint: String },
    /// The server answered 500.
    #[error("server internal error: {0}")]
    ServerInternal(String),
    /// Any other non-success status. `message` is the server-supplied
    /// `message`/`error` field, or `HTTP <status>` when there is none.
    #[error("{message}")]
    Http { status: u16, message: String },
    /// HTML error page or a body that is not valid JSON.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    /// Every configured host failed. `last_error` is the failure of the
    /// last host tried, when one was captured.
    #[error("all {hosts_tried} API endpoints failed; last error: {last_message}")]
    AllHostsExhausted {
        hosts_tried: usize,
        last_message: String,
        #[source]
        last_error: Option<Box<ApiError>>,
    },
    /// Invalid client configuration (empty host list, bad env var).
    #[error("configuration error: {0}")]
    Config(String),
    /// Request body or header could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),
    /// The token store could not persist or remove the user record.
    #[error(transparent)]
    TokenStore(#[from] crate::TokenStoreError),
}

impl ApiError {
    /// Whether another attempt against the same host may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Transport(_) | Self::ServerInternal(_) | Self::Http { .. }
        )
    }

    /// Whether the failure must stop the whole call, fallback hosts included.
    pub(crate) fn aborts_call(&self) -> bool {
        matches!(self, Self::Authentication(_) | Self::Encode(_))
    }

    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication(_) => Some(401),
            Self::NotFound { .. } => Some(404),
            Self::ServerInternal(_) => Some(500),
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
