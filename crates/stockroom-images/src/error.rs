use http::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ImageError>;

/// Image provider errors
#[derive(Debug, Error)]
pub enum ImageError {
    /// The proxy account cannot pay for the call
    #[error("Your account balance is too low for this transaction. Please top-up your account to proceed.")]
    InsufficientFunds,

    /// The proxy rejected the API key
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The provider answered with a non-success status
    #[error("Provider API error ({status}): {message}")]
    ProviderApiError { status: u16, message: String },

    /// Network or connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The provider answered with a body we could not read
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The request was refused before it was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ImageError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
            Self::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::ConnectionError(_) | Self::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
            Self::ProviderApiError { status, .. } => match *status {
                400 => StatusCode::BAD_REQUEST,
                404 => StatusCode::NOT_FOUND,
                429 => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl From<reqwest::Error> for ImageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::ConnectionError(err.to_string())
        }
    }
}
