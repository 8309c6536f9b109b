// Error taxonomy shared by the HTTP stack, session storage and API wrappers.
use http::StatusCode;

/// Every failure the client surfaces to a caller.
///
/// The type is `Clone` because a single refresh failure has to reject every
/// request queued behind it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("failed to read session storage: {0}")]
    StorageRead(String),
    #[error("failed to write session storage: {0}")]
    StorageWrite(String),
    #[error("no refresh token available, sign in again")]
    NoRefreshToken,
    #[error("token refresh failed: {0}")]
    RefreshExchange(String),
    /// The refresh stopped without an outcome; the stored session is untouched.
    #[error("token refresh was interrupted")]
    RefreshInterrupted,
    #[error("request was rejected as unauthorized")]
    Unauthorized,
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("TLS setup failed: {0}")]
    Tls(String),
}

impl ClientError {
    /// Builds the error for a non-2xx response, preferring the backend's
    /// `message` field over the raw body.
    pub fn from_status(status: StatusCode, body: &[u8]) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            return ClientError::Unauthorized;
        }
        let message = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("message").and_then(|m| match m {
                    serde_json::Value::String(s) => Some(s.clone()),
                    // Validation errors come back as a list of messages
                    serde_json::Value::Array(items) => Some(
                        items
                            .iter()
                            .filter_map(|i| i.as_str())
                            .collect::<Vec<_>>()
                            .join("; "),
                    ),
                    _ => None,
                })
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string()
            });
        ClientError::Status {
            status: status.as_u16(),
            message,
        }
    }

    /// Errors after which the stored session is gone and the user must sign in.
    pub fn is_session_terminal(&self) -> bool {
        matches!(
            self,
            ClientError::NoRefreshToken | ClientError::RefreshExchange(_)
        )
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
