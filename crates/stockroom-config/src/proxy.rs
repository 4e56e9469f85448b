use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Header the payment proxy reads the API key from
pub const DEFAULT_API_KEY_HEADER: &str = "skyfire-api-key";

/// Metered API-key proxy that fronts both the chat model and the image provider
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    /// Base URL of the proxy (e.g. `https://api.skyfire.xyz`)
    #[serde(default = "default_base_url")]
    pub base_url: Url,
    /// API key forwarded on every request
    pub api_key: SecretString,
    /// Name of the header carrying the API key
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
    /// TCP connect timeout (e.g. "10s", "500ms")
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: String,
}

impl ProxyConfig {
    /// Create a proxy configuration with defaults for everything but the endpoint and key
    pub fn new(base_url: Url, api_key: SecretString) -> Self {
        Self {
            base_url,
            api_key,
            api_key_header: default_api_key_header(),
            connect_timeout: default_connect_timeout(),
        }
    }

    /// Parsed connect timeout
    ///
    /// # Errors
    ///
    /// Returns an error if `connect_timeout` is not a valid duration string
    pub fn connect_timeout(&self) -> anyhow::Result<Duration> {
        duration_str::parse(&self.connect_timeout)
            .map_err(|e| anyhow::anyhow!("invalid proxy.connect_timeout '{}': {e}", self.connect_timeout))
    }

    /// Join a path onto the proxy base URL
    ///
    /// Leading slashes are ignored so both `v1/events` and `/v1/events`
    /// resolve against the base path rather than replacing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined URL is invalid
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path.trim_start_matches('/'))
    }
}

fn default_base_url() -> Url {
    Url::parse("https://api.skyfire.xyz").expect("valid default proxy URL")
}

fn default_api_key_header() -> String {
    DEFAULT_API_KEY_HEADER.to_owned()
}

fn default_connect_timeout() -> String {
    "10s".to_owned()
}
