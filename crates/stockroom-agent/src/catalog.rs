use async_trait::async_trait;
use stockroom_images::{GettyClient, ImageDownloadResult, PurchaseHistoryItem, PurchaseRequest, SearchPage};

/// Image operations the assistant's tools call
#[async_trait]
pub trait ImageCatalog: Send + Sync {
    async fn search(&self, phrase: &str, page: u32, page_size: u32) -> stockroom_images::Result<SearchPage>;

    async fn purchase(&self, request: &PurchaseRequest) -> stockroom_images::Result<ImageDownloadResult>;

    async fn purchase_history(&self) -> stockroom_images::Result<Vec<PurchaseHistoryItem>>;
}

#[async_trait]
impl ImageCatalog for GettyClient {
    async fn search(&self, phrase: &str, page: u32, page_size: u32) -> stockroom_images::Result<SearchPage> {
        Self::search(self, phrase, page, page_size).await
    }

    async fn purchase(&self, request: &PurchaseRequest) -> stockroom_images::Result<ImageDownloadResult> {
        Self::purchase(self, request).await
    }

    async fn purchase_history(&self) -> stockroom_images::Result<Vec<PurchaseHistoryItem>> {
        Self::purchase_history(self).await
    }
}
