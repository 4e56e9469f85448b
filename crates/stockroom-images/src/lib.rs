//! Getty Images access through the Skyfire payment proxy
//!
//! Every call is metered by the proxy and authenticated with the same API
//! key header the chat model uses.

#![allow(clippy::must_use_candidate)]

pub mod client;
pub mod error;
pub mod types;
pub mod util;

pub use client::GettyClient;
pub use error::{ImageError, Result};
pub use types::{
    DisplaySize, ImageDownloadResult, ImageSearchResult, ImageSize, MaxDimensions, PurchaseAttributes,
    PurchaseHistoryItem, PurchaseRequest, PurchasedImage, SearchPage,
};
