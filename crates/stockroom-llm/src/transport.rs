//! HTTP leg to the payment proxy

use reqwest::header::HeaderName;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use stockroom_config::ProxyConfig;
use url::Url;

use crate::error::{AuthFailure, LlmError};
use crate::protocol::WireErrorBody;

/// POSTs chat completion bodies to the proxy with the API key header
#[derive(Debug, Clone)]
pub struct ProxyTransport {
    client: Client,
    url: Url,
    api_key: SecretString,
    api_key_header: HeaderName,
}

impl ProxyTransport {
    /// Create a transport for `path` on the configured proxy
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Internal` if the URL, header name, or timeout is
    /// invalid or the HTTP client cannot be built.
    pub fn new(proxy: &ProxyConfig, path: &str) -> Result<Self, LlmError> {
        let url = proxy
            .endpoint(path)
            .map_err(|e| anyhow::anyhow!("invalid chat completion URL for path '{path}': {e}"))?;

        let api_key_header = HeaderName::from_bytes(proxy.api_key_header.as_bytes())
            .map_err(|e| anyhow::anyhow!("invalid API key header name '{}': {e}", proxy.api_key_header))?;

        let client = Client::builder()
            .connect_timeout(proxy.connect_timeout()?)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;

        Ok(Self {
            client,
            url,
            api_key: proxy.api_key.clone(),
            api_key_header,
        })
    }

    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Send `body` and return the successful response
    ///
    /// # Errors
    ///
    /// Maps 402 to insufficient funds, 401/403 to an invalid credential, any
    /// other non-success status or network failure to `LlmError::Transport`.
    pub async fn post(&self, body: &serde_json::Value) -> Result<Response, LlmError> {
        let response = self
            .client
            .post(self.url.clone())
            .header(&self.api_key_header, self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(url = %self.url, error = %e, "proxy request failed");
                LlmError::transport(e.to_string())
            })?;

        check_status(response).await
    }
}

async fn check_status(response: Response) -> Result<Response, LlmError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let reason = match status {
        StatusCode::PAYMENT_REQUIRED => Some(AuthFailure::InsufficientFunds),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Some(AuthFailure::InvalidCredential),
        _ => None,
    };

    let body = response.text().await.unwrap_or_default();
    let (code, message) = parse_error_body(&body);

    // A spending-rule rejection arrives as 403 but is not a credential problem
    let rule_exceeded = code.as_deref() == Some(crate::error::USER_RULE_EXCEEDED);
    if let Some(reason) = reason
        && (reason == AuthFailure::InsufficientFunds || !rule_exceeded)
    {
        tracing::warn!(status = status.as_u16(), reason = ?reason, "proxy rejected request");
        return Err(LlmError::Authentication { reason });
    }

    tracing::warn!(status = status.as_u16(), code = ?code, "upstream returned error");

    Err(LlmError::Transport {
        status: Some(status.as_u16()),
        code,
        message: message.unwrap_or_else(|| format!("upstream returned {status}")),
    })
}

/// Extract `code` and `message` from an error body
///
/// Accepts top-level fields or an `OpenAI`-style nested `error` object.
/// Non-JSON bodies become the message verbatim.
fn parse_error_body(body: &str) -> (Option<String>, Option<String>) {
    let Ok(parsed) = serde_json::from_str::<WireErrorBody>(body) else {
        let trimmed = body.trim();
        return (None, (!trimmed.is_empty()).then(|| trimmed.to_owned()));
    };

    let nested = parsed.error.unwrap_or_default();
    let code = parsed.code.or(nested.code).map(|code| match code {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    });

    (code, parsed.message.or(nested.message))
}
