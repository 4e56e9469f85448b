//! Getty Images payloads as relayed by the proxy
//!
//! Every field defaults so a sparse or partially populated record still
//! decodes.

use serde::{Deserialize, Serialize};

/// Purchasable rendition of an image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSize {
    pub bytes: u64,
    pub height: u32,
    pub width: u32,
    pub media_type: String,
    /// Size name passed back when purchasing (e.g. `small`, `medium`, `large`)
    pub name: String,
    pub dpi: u32,
    /// Price in micro-dollars
    pub amount: u64,
}

/// Preview rendition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySize {
    pub is_watermarked: bool,
    /// `comp`, `comp_webp`, `preview` or `thumb`
    pub name: String,
    pub uri: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaxDimensions {
    pub height: u32,
    pub width: u32,
}

/// One image in a search result page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSearchResult {
    pub id: String,
    pub asset_family: String,
    pub caption: String,
    pub collection_code: String,
    pub collection_id: u64,
    pub collection_name: String,
    pub display_sizes: Vec<DisplaySize>,
    pub download_sizes: Vec<ImageSize>,
    pub license_model: String,
    pub max_dimensions: MaxDimensions,
    pub title: String,
}

impl ImageSearchResult {
    /// Purchasable size with the given name
    pub fn download_size(&self, name: &str) -> Option<&ImageSize> {
        self.download_sizes.iter().find(|size| size.name == name)
    }

    /// Best preview to show for this image
    pub fn preview_uri(&self) -> Option<&str> {
        crate::util::highest_resolution_uri(&self.display_sizes)
    }
}

/// Raw search response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub images: Vec<ImageSearchResult>,
    pub result_count: u64,
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage {
    pub phrase: String,
    pub images: Vec<ImageSearchResult>,
    /// Total matches across all pages
    pub result_count: u64,
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

/// Image to purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub id: String,
    /// Name of one of the image's download sizes
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl PurchaseRequest {
    pub fn new(id: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            size: size.into(),
            height: None,
        }
    }
}

/// Outbound purchase body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DownloadBody<'a> {
    pub id: &'a str,
    pub size: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    pub tos_confirmation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<&'a str>,
}

/// Completed purchase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageDownloadResult {
    pub id: String,
    pub artist: String,
    pub asset_family: String,
    pub caption: String,
    pub collection_code: String,
    pub collection_id: u64,
    pub collection_name: String,
    pub display_sizes: Vec<DisplaySize>,
    pub download_sizes: Vec<ImageSize>,
    pub license_model: String,
    pub max_dimensions: MaxDimensions,
    pub title: String,
    /// Time-limited download link for the licensed file
    pub uri: String,
}

impl ImageDownloadResult {
    /// Thumbnail rendition, if the provider sent one
    pub fn thumb_uri(&self) -> Option<&str> {
        self.display_sizes
            .iter()
            .find(|size| size.name == "thumb")
            .map(|size| size.uri.as_str())
    }
}

/// Image recorded on a purchase event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurchasedImage {
    pub id: String,
    pub uri: String,
    pub title: String,
    pub caption: String,
    pub artist: String,
    pub display_sizes: Vec<DisplaySize>,
    pub download_sizes: Vec<ImageSize>,
}

/// Attributes of a purchase event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PurchaseAttributes {
    pub getty_image: Option<PurchasedImage>,
}

/// One past purchase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PurchaseHistoryItem {
    pub id: Option<String>,
    pub event_name: Option<String>,
    pub created_at: Option<String>,
    pub attributes: PurchaseAttributes,
}

impl PurchaseHistoryItem {
    pub const fn image(&self) -> Option<&PurchasedImage> {
        self.attributes.getty_image.as_ref()
    }
}
