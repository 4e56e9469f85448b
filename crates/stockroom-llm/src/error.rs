use std::fmt;

use http::StatusCode;
use thiserror::Error;

/// Upstream error code the proxy returns when a spending rule blocks a request
pub const USER_RULE_EXCEEDED: &str = "USER_RULE_EXCEEDED";

/// Errors that can occur while talking to the chat model
#[derive(Debug, Error)]
pub enum LlmError {
    /// The proxy refused the credential or the account cannot pay
    #[error("{reason}")]
    Authentication { reason: AuthFailure },

    /// Network failure or non-success status from upstream
    #[error("upstream request failed: {message}")]
    Transport {
        /// HTTP status, absent for network failures
        status: Option<u16>,
        /// Machine-readable code from the upstream error body
        code: Option<String>,
        message: String,
    },

    /// Upstream answered a streaming request without a body
    #[error("upstream returned no response body")]
    StreamBodyMissing,

    /// The byte stream ended before the termination sentinel
    #[error("stream ended before the [DONE] sentinel ({pending_bytes} bytes of partial line discarded)")]
    TruncatedStream { pending_bytes: usize },

    /// A non-streaming response could not be interpreted
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),

    /// The request could not be built
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Why the proxy rejected a request at the payment layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// HTTP 402: the account balance cannot cover the request
    InsufficientFunds,
    /// HTTP 401 or 403: the API key was rejected
    InvalidCredential,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientFunds => f.write_str(
                "Your account balance is too low for this transaction. Please top-up your account to proceed.",
            ),
            Self::InvalidCredential => f.write_str("the proxy rejected the API key"),
        }
    }
}

impl LlmError {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    /// Whether the account ran out of funds
    pub const fn is_insufficient_funds(&self) -> bool {
        matches!(
            self,
            Self::Authentication {
                reason: AuthFailure::InsufficientFunds
            }
        )
    }

    /// HTTP status a front end should answer with
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Authentication {
                reason: AuthFailure::InsufficientFunds,
            } => StatusCode::PAYMENT_REQUIRED,
            Self::Authentication {
                reason: AuthFailure::InvalidCredential,
            } => StatusCode::UNAUTHORIZED,
            Self::Transport { code: Some(code), .. } if code == USER_RULE_EXCEEDED => StatusCode::TOO_MANY_REQUESTS,
            Self::Transport {
                status: Some(status), ..
            } => StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Transport { status: None, .. }
            | Self::StreamBodyMissing
            | Self::TruncatedStream { .. }
            | Self::InvalidResponse(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable category
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Authentication {
                reason: AuthFailure::InsufficientFunds,
            } => "insufficient_funds",
            Self::Authentication { .. } => "authentication_error",
            Self::Transport { .. } => "upstream_error",
            Self::StreamBodyMissing | Self::TruncatedStream { .. } => "streaming_error",
            Self::InvalidResponse(_) => "invalid_response_error",
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Message safe to show an end user
    pub fn client_message(&self) -> String {
        match self {
            Self::Transport {
                code: Some(code),
                message,
                ..
            } if code == USER_RULE_EXCEEDED => {
                if message.trim().is_empty() {
                    "A spending rule on your account blocked this request.".to_owned()
                } else {
                    message.clone()
                }
            }
            Self::Internal(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }
}

/// Why a stream line was skipped
///
/// Never surfaced to consumers; skipped lines are only logged.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The line holds no `{`
    #[error("line contains no JSON object")]
    NoJson,

    /// The text from the first `{` onward is not a valid chunk
    #[error("malformed chunk: {0}")]
    Malformed(#[from] serde_json::Error),
}
