use reqwest::header::HeaderName;
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use stockroom_config::{ImagesConfig, ProxyConfig};
use url::Url;

use crate::error::{ImageError, Result};
use crate::types::{
    DownloadBody, ImageDownloadResult, PurchaseHistoryItem, PurchaseRequest, SearchPage, SearchResponse,
};

const SEARCH_PATH: &str = "v1/receivers/getty-images/search/images/creative";
const DOWNLOAD_PATH: &str = "v1/receivers/getty-images/images/download";
const EVENTS_PATH: &str = "v1/events";

/// Async HTTP client for Getty Images behind the payment proxy
#[derive(Debug, Clone)]
pub struct GettyClient {
    http: reqwest::Client,
    proxy: ProxyConfig,
    api_key_header: HeaderName,
    images: ImagesConfig,
}

impl GettyClient {
    /// Create a new client
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or timeout is invalid or the HTTP
    /// client cannot be built
    pub fn new(proxy: &ProxyConfig, images: &ImagesConfig) -> Result<Self> {
        let api_key_header = HeaderName::from_bytes(proxy.api_key_header.as_bytes())
            .map_err(|e| ImageError::InvalidRequest(format!("invalid API key header name: {e}")))?;

        let connect_timeout = proxy
            .connect_timeout()
            .map_err(|e| ImageError::InvalidRequest(e.to_string()))?;

        let http = reqwest::Client::builder().connect_timeout(connect_timeout).build()?;

        Ok(Self {
            http,
            proxy: proxy.clone(),
            api_key_header,
            images: images.clone(),
        })
    }

    /// Configured results per page
    pub const fn page_size(&self) -> u32 {
        self.images.page_size
    }

    /// Search creative images
    ///
    /// GET `v1/receivers/getty-images/search/images/creative`
    ///
    /// # Errors
    ///
    /// Returns an error if the phrase is blank, the request fails, or the
    /// proxy returns an error
    pub async fn search(&self, phrase: &str, page: u32, page_size: u32) -> Result<SearchPage> {
        let phrase = phrase.trim();
        if phrase.is_empty() {
            return Err(ImageError::InvalidRequest("search phrase must not be empty".to_owned()));
        }

        let page = page.max(1);
        let page_size = page_size.max(1);

        let request = self.http.get(self.url(SEARCH_PATH)?).query(&[
            ("phrase", phrase.to_owned()),
            ("page", page.to_string()),
            ("page_size", page_size.to_string()),
        ]);

        let response: SearchResponse = self.send(request).await?;

        tracing::debug!(phrase, page, results = response.result_count, "image search complete");

        Ok(SearchPage {
            phrase: phrase.to_owned(),
            total_pages: response.result_count.div_ceil(u64::from(page_size)),
            images: response.images,
            result_count: response.result_count,
            page,
            page_size,
        })
    }

    /// License and download one image
    ///
    /// POST `v1/receivers/getty-images/images/download`
    ///
    /// # Errors
    ///
    /// Returns `ImageError::InvalidRequest` when the terms of service have not
    /// been accepted in configuration, otherwise an error if the request
    /// fails or the proxy returns an error
    pub async fn purchase(&self, request: &PurchaseRequest) -> Result<ImageDownloadResult> {
        if !self.images.tos_confirmation {
            return Err(ImageError::InvalidRequest(
                "the image provider's terms of service have not been accepted (images.tos_confirmation)".to_owned(),
            ));
        }

        let body = DownloadBody {
            id: &request.id,
            size: &request.size,
            height: request.height.map(|h| h.to_string()),
            tos_confirmation: true,
            user_email: self.images.user_email.as_deref(),
        };

        let result: ImageDownloadResult = self
            .send(self.http.post(self.url(DOWNLOAD_PATH)?).json(&body))
            .await?;

        tracing::info!(id = %request.id, size = %request.size, "image purchased");

        Ok(result)
    }

    /// Past purchases paid to the configured destination address
    ///
    /// GET `v1/events?eventNames=Claim&trackIds=<destination>`
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the proxy returns an error
    pub async fn purchase_history(&self) -> Result<Vec<PurchaseHistoryItem>> {
        let request = self.http.get(self.url(EVENTS_PATH)?).query(&[
            ("eventNames", "Claim"),
            ("trackIds", self.images.destination_address.as_str()),
        ]);

        let items: Vec<PurchaseHistoryItem> = self.send(request).await?;

        tracing::debug!(count = items.len(), "purchase history fetched");

        Ok(items)
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.proxy
            .endpoint(path)
            .map_err(|e| ImageError::InvalidRequest(format!("invalid URL: {e}")))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .header(&self.api_key_header, self.api_key().expose_secret())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "image provider request failed");
                ImageError::from(e)
            })?;

        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ImageError::InvalidResponse(format!("failed to parse response: {e}")))
    }

    const fn api_key(&self) -> &SecretString {
        &self.proxy.api_key
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), "image provider returned error");

    match status {
        StatusCode::PAYMENT_REQUIRED => Err(ImageError::InsufficientFunds),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            let detail = if message.is_empty() { status.to_string() } else { message };
            Err(ImageError::AuthenticationFailed(detail))
        }
        _ => Err(ImageError::ProviderApiError {
            status: status.as_u16(),
            message,
        }),
    }
}
