//! Tools the assistant can call and their execution

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use stockroom_images::{ImageError, PurchaseHistoryItem, PurchaseRequest};
use stockroom_llm::{ToolCall, ToolDefinition};
use thiserror::Error;

use crate::catalog::ImageCatalog;

/// The assistant's tools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    SearchImages,
    ShowHistory,
    ShowImages,
    PurchaseImages,
}

impl ToolKind {
    pub const ALL: [Self; 4] = [Self::SearchImages, Self::ShowHistory, Self::ShowImages, Self::PurchaseImages];

    /// Name the model calls the tool by
    pub const fn name(self) -> &'static str {
        match self {
            Self::SearchImages => "search_images",
            Self::ShowHistory => "show_history",
            Self::ShowImages => "show_images",
            Self::PurchaseImages => "purchase_images",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::SearchImages => "Search for stock images",
            Self::ShowHistory => "Show purchase history",
            Self::ShowImages => "Show images you are talking about",
            Self::PurchaseImages => "Purchase images",
        }
    }

    /// JSON schema of the arguments object
    pub fn parameters(self) -> Value {
        match self {
            Self::SearchImages => json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search phrase"},
                    "page": {"type": "integer", "minimum": 1, "description": "Result page, starting at 1"}
                },
                "required": ["query"]
            }),
            Self::ShowHistory => json!({"type": "object", "properties": {}}),
            Self::ShowImages => json!({
                "type": "object",
                "properties": {
                    "imageIDs": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["imageIDs"]
            }),
            Self::PurchaseImages => json!({
                "type": "object",
                "properties": {
                    "images": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "imageID": {"type": "string"},
                                "size": {"type": "string", "description": "Name of one of the image's download sizes"}
                            },
                            "required": ["imageID", "size"]
                        }
                    },
                    "confirmed": {
                        "type": "boolean",
                        "description": "True only after the user explicitly confirmed a large purchase"
                    }
                },
                "required": ["images"]
            }),
        }
    }

    /// Usage paragraph for the system prompt
    pub fn instruction(self, max_purchase_without_confirmation: usize) -> String {
        match self {
            Self::SearchImages => "\
When you need to search for images:
1. First, respond to the user acknowledging their request and informing them that you'll search for images.
2. Then, execute the \"search_images\" tool."
                .to_owned(),
            Self::ShowHistory => "\
When the user asks to see their purchase history:
1. First, respond to the user confirming that you'll retrieve their purchase history.
2. Then, execute the \"show_history\" tool."
                .to_owned(),
            Self::ShowImages => "\
Every time you talk about images from the search results or the purchase history (your favorite image, the best picture for a use case, a recent purchase, and so on):
1. First, respond to the user acknowledging their request and answering their question with details.
2. Then, execute the \"show_images\" tool with imageIDs as the parameter. Image IDs can be found in the JSON results sent earlier.
Do not display images in markdown; always show them with the \"show_images\" tool."
                .to_owned(),
            Self::PurchaseImages => format!(
                "\
When the user asks you to purchase image or images:
1. First, respond to the user acknowledging their request and informing them that you'll initiate the purchase. If the user didn't specify sizes, list the available sizes and their prices for the user to choose from.
2. If the user specified sizes, acknowledge the images and sizes you are about to purchase.
3. Then, execute the \"purchase_images\" tool with the image IDs and sizes.
Only purchase images that you and the user have just discussed. If you are purchasing more than {max_purchase_without_confirmation} images, confirm with the user first and then set \"confirmed\" to true."
            ),
        }
    }

    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_owned(),
            description: self.description().to_owned(),
            parameters: self.parameters(),
        }
    }
}

/// Declarations sent with every request
pub fn definitions() -> Vec<ToolDefinition> {
    ToolKind::ALL.into_iter().map(ToolKind::definition).collect()
}

/// Outcome of one tool call, fed back to the model as a tool message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    /// ID of the call this answers
    pub call_id: String,
    pub name: String,
    /// JSON handed to the model
    pub payload: Value,
    /// The tool could not run at all
    pub is_error: bool,
}

impl ToolResult {
    fn success(call: &ToolCall, payload: Value) -> Self {
        Self {
            call_id: call.id.clone(),
            name: call.name.clone(),
            payload,
            is_error: false,
        }
    }

    fn failure(call: &ToolCall, message: &str) -> Self {
        Self {
            call_id: call.id.clone(),
            name: call.name.clone(),
            payload: json!({"success": false, "error": message}),
            is_error: true,
        }
    }

    /// Result for a call whose execution was interrupted
    pub fn cancelled(call: &ToolCall) -> Self {
        Self::failure(call, "cancelled by the user")
    }

    /// Tool message content
    pub fn content(&self) -> String {
        self.payload.to_string()
    }
}

#[derive(Debug, Error)]
enum ToolError {
    #[error("unknown tool `{0}`")]
    Unknown(String),

    #[error("invalid arguments: {0}")]
    Arguments(#[from] serde_json::Error),

    #[error(transparent)]
    Images(#[from] ImageError),

    #[error("{0}")]
    Refused(String),
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ShowImagesArgs {
    #[serde(rename = "imageIDs")]
    image_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PurchaseArgs {
    images: Vec<PurchaseItem>,
    #[serde(default)]
    confirmed: bool,
}

#[derive(Debug, Deserialize)]
struct PurchaseItem {
    #[serde(rename = "imageID")]
    image_id: String,
    size: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseOutcome {
    id: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    partial_data: Option<PartialData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct PartialData {
    uri: String,
    preview: Option<String>,
    title: String,
}

/// Image seen earlier in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnownImage {
    pub id: String,
    pub title: String,
    pub preview: Option<String>,
}

/// Executes tool calls against the image catalog
///
/// Remembers every image returned by a search, purchase, or history lookup
/// so `show_images` can resolve IDs to titles and previews.
pub struct Toolbox {
    catalog: Arc<dyn ImageCatalog>,
    page_size: u32,
    max_purchase_without_confirmation: usize,
    known: HashMap<String, KnownImage>,
}

impl Toolbox {
    pub fn new(catalog: Arc<dyn ImageCatalog>, page_size: u32, max_purchase_without_confirmation: usize) -> Self {
        Self {
            catalog,
            page_size,
            max_purchase_without_confirmation,
            known: HashMap::new(),
        }
    }

    pub const fn max_purchase_without_confirmation(&self) -> usize {
        self.max_purchase_without_confirmation
    }

    pub fn known_image(&self, id: &str) -> Option<&KnownImage> {
        self.known.get(id)
    }

    /// Run one call
    ///
    /// Never fails: unknown tools, bad arguments, and provider errors become
    /// error payloads the model can read.
    pub async fn execute(&mut self, call: &ToolCall) -> ToolResult {
        tracing::debug!(tool = %call.name, id = %call.id, "executing tool call");

        let outcome = match ToolKind::from_name(&call.name) {
            Some(ToolKind::SearchImages) => self.search_images(call).await,
            Some(ToolKind::ShowHistory) => self.show_history().await,
            Some(ToolKind::ShowImages) => self.show_images(call),
            Some(ToolKind::PurchaseImages) => self.purchase_images(call).await,
            None => Err(ToolError::Unknown(call.name.clone())),
        };

        match outcome {
            Ok(payload) => ToolResult::success(call, payload),
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "tool call failed");
                ToolResult::failure(call, &e.to_string())
            }
        }
    }

    async fn search_images(&mut self, call: &ToolCall) -> Result<Value, ToolError> {
        let args: SearchArgs = call.parse_arguments()?;
        let page = self
            .catalog
            .search(&args.query, args.page.unwrap_or(1), self.page_size)
            .await?;

        for image in &page.images {
            self.remember(KnownImage {
                id: image.id.clone(),
                title: image.title.clone(),
                preview: image.preview_uri().map(str::to_owned),
            });
        }

        Ok(serde_json::to_value(&page)?)
    }

    async fn show_history(&mut self) -> Result<Value, ToolError> {
        let history = self.catalog.purchase_history().await?;

        for image in history.iter().filter_map(PurchaseHistoryItem::image) {
            if !image.id.is_empty() {
                self.remember(KnownImage {
                    id: image.id.clone(),
                    title: image.title.clone(),
                    preview: stockroom_images::util::highest_resolution_uri(&image.display_sizes).map(str::to_owned),
                });
            }
        }

        Ok(json!({"success": true, "history": history}))
    }

    fn show_images(&self, call: &ToolCall) -> Result<Value, ToolError> {
        let args: ShowImagesArgs = call.parse_arguments()?;
        let images: Vec<&KnownImage> = args.image_ids.iter().filter_map(|id| self.known.get(id)).collect();

        Ok(json!({"success": true, "imageIDs": args.image_ids, "images": images}))
    }

    async fn purchase_images(&mut self, call: &ToolCall) -> Result<Value, ToolError> {
        let args: PurchaseArgs = call.parse_arguments()?;

        if args.images.is_empty() {
            return Err(ToolError::Refused("no images were given to purchase".to_owned()));
        }

        if args.images.len() > self.max_purchase_without_confirmation && !args.confirmed {
            return Err(ToolError::Refused(format!(
                "purchasing {} images needs explicit confirmation; ask the user, then call purchase_images again with \"confirmed\": true",
                args.images.len()
            )));
        }

        let mut outcomes = Vec::with_capacity(args.images.len());

        for item in args.images {
            let request = PurchaseRequest::new(item.image_id.clone(), item.size);
            match self.catalog.purchase(&request).await {
                Ok(download) => {
                    let preview = download.thumb_uri().map(str::to_owned);
                    self.remember(KnownImage {
                        id: item.image_id.clone(),
                        title: download.title.clone(),
                        preview: preview.clone(),
                    });
                    outcomes.push(PurchaseOutcome {
                        id: item.image_id,
                        success: true,
                        partial_data: Some(PartialData {
                            uri: download.uri,
                            preview,
                            title: download.title,
                        }),
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::warn!(id = %item.image_id, error = %e, "image purchase failed");
                    outcomes.push(PurchaseOutcome {
                        id: item.image_id,
                        success: false,
                        partial_data: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        Ok(serde_json::to_value(outcomes)?)
    }

    fn remember(&mut self, image: KnownImage) {
        self.known.insert(image.id.clone(), image);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use stockroom_images::{
        DisplaySize, ImageDownloadResult, ImageSearchResult, PurchaseAttributes, PurchasedImage, SearchPage,
    };

    use super::*;

    /// In-memory catalog recording purchases
    #[derive(Default)]
    pub(crate) struct FakeCatalog {
        pub purchases: Mutex<Vec<PurchaseRequest>>,
        pub broke: bool,
    }

    fn display(name: &str, id: &str) -> DisplaySize {
        DisplaySize {
            is_watermarked: true,
            name: name.to_owned(),
            uri: format!("https://media.example/{id}/{name}.jpg"),
        }
    }

    #[async_trait]
    impl ImageCatalog for FakeCatalog {
        async fn search(&self, phrase: &str, page: u32, page_size: u32) -> stockroom_images::Result<SearchPage> {
            let images = ["111", "222"]
                .into_iter()
                .map(|id| ImageSearchResult {
                    id: id.to_owned(),
                    title: format!("{phrase} {id}"),
                    display_sizes: vec![display("comp", id)],
                    ..ImageSearchResult::default()
                })
                .collect();

            Ok(SearchPage {
                phrase: phrase.to_owned(),
                images,
                result_count: 2,
                page,
                page_size,
                total_pages: 1,
            })
        }

        async fn purchase(&self, request: &PurchaseRequest) -> stockroom_images::Result<ImageDownloadResult> {
            if self.broke || request.id == "missing" {
                return Err(if self.broke {
                    ImageError::InsufficientFunds
                } else {
                    ImageError::ProviderApiError {
                        status: 404,
                        message: "not found".to_owned(),
                    }
                });
            }

            self.purchases.lock().unwrap().push(request.clone());

            Ok(ImageDownloadResult {
                id: request.id.clone(),
                title: format!("Image {}", request.id),
                uri: format!("https://delivery.example/{}.jpg", request.id),
                display_sizes: vec![display("thumb", &request.id)],
                ..ImageDownloadResult::default()
            })
        }

        async fn purchase_history(&self) -> stockroom_images::Result<Vec<PurchaseHistoryItem>> {
            Ok(vec![PurchaseHistoryItem {
                id: Some("evt_1".to_owned()),
                attributes: PurchaseAttributes {
                    getty_image: Some(PurchasedImage {
                        id: "999".to_owned(),
                        title: "Old fox".to_owned(),
                        ..PurchasedImage::default()
                    }),
                },
                ..PurchaseHistoryItem::default()
            }])
        }
    }

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: format!("call_{name}"),
            name: name.to_owned(),
            arguments: arguments.to_owned(),
        }
    }

    fn toolbox(catalog: FakeCatalog) -> (Toolbox, Arc<FakeCatalog>) {
        let catalog = Arc::new(catalog);
        (Toolbox::new(catalog.clone(), 10, 5), catalog)
    }

    #[test]
    fn names_round_trip() {
        for tool in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(tool.name()), Some(tool));
        }
        assert_eq!(ToolKind::from_name("compose_email"), None);
    }

    #[test]
    fn definitions_carry_object_schemas() {
        let definitions = definitions();
        assert_eq!(definitions.len(), 4);
        assert!(definitions.iter().all(|d| d.parameters["type"] == "object"));
    }

    #[tokio::test]
    async fn search_remembers_results() {
        let (mut toolbox, _) = toolbox(FakeCatalog::default());

        let result = toolbox.execute(&call("search_images", r#"{"query":"fox"}"#)).await;
        assert!(!result.is_error);
        assert_eq!(result.call_id, "call_search_images");
        assert_eq!(result.payload["result_count"], 2);
        assert_eq!(result.payload["page_size"], 10);

        let known = toolbox.known_image("111").unwrap();
        assert_eq!(known.title, "fox 111");
        assert_eq!(known.preview.as_deref(), Some("https://media.example/111/comp.jpg"));
    }

    #[tokio::test]
    async fn show_images_resolves_known_ids() {
        let (mut toolbox, _) = toolbox(FakeCatalog::default());
        toolbox.execute(&call("search_images", r#"{"query":"fox"}"#)).await;

        let result = toolbox.execute(&call("show_images", r#"{"imageIDs":["222","nope"]}"#)).await;
        assert_eq!(result.payload["imageIDs"], json!(["222", "nope"]));
        assert_eq!(result.payload["images"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn history_lists_purchases() {
        let (mut toolbox, _) = toolbox(FakeCatalog::default());
        let result = toolbox.execute(&call("show_history", "")).await;

        assert_eq!(result.payload["success"], true);
        assert_eq!(result.payload["history"][0]["attributes"]["gettyImage"]["title"], "Old fox");
        assert!(toolbox.known_image("999").is_some());
    }

    #[tokio::test]
    async fn purchase_continues_past_failures() {
        let (mut toolbox, catalog) = toolbox(FakeCatalog::default());
        let result = toolbox
            .execute(&call(
                "purchase_images",
                r#"{"images":[{"imageID":"111","size":"small"},{"imageID":"missing","size":"small"},{"imageID":"222","size":"large"}]}"#,
            ))
            .await;

        assert!(!result.is_error);
        let outcomes = result.payload.as_array().unwrap();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0]["success"], true);
        assert_eq!(outcomes[0]["partialData"]["preview"], "https://media.example/111/thumb.jpg");
        assert_eq!(outcomes[1]["success"], false);
        assert!(outcomes[1].get("partialData").is_none());
        assert_eq!(outcomes[2]["partialData"]["uri"], "https://delivery.example/222.jpg");
        assert_eq!(catalog.purchases.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn large_purchase_needs_confirmation() {
        let (mut toolbox, catalog) = toolbox(FakeCatalog::default());
        let images: Vec<Value> = (0..6).map(|i| json!({"imageID": i.to_string(), "size": "small"})).collect();

        let refused = toolbox
            .execute(&call("purchase_images", &json!({"images": images}).to_string()))
            .await;
        assert!(refused.is_error);
        assert!(catalog.purchases.lock().unwrap().is_empty());

        let accepted = toolbox
            .execute(&call("purchase_images", &json!({"images": images, "confirmed": true}).to_string()))
            .await;
        assert!(!accepted.is_error);
        assert_eq!(catalog.purchases.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn insufficient_funds_is_reported_per_image() {
        let (mut toolbox, _) = toolbox(FakeCatalog {
            broke: true,
            ..FakeCatalog::default()
        });
        let result = toolbox
            .execute(&call("purchase_images", r#"{"images":[{"imageID":"111","size":"small"}]}"#))
            .await;

        let error = result.payload[0]["error"].as_str().unwrap();
        assert!(error.contains("balance is too low"));
    }

    #[tokio::test]
    async fn unknown_tool_and_bad_arguments_become_error_payloads() {
        let (mut toolbox, _) = toolbox(FakeCatalog::default());

        let unknown = toolbox.execute(&call("send_email", "{}")).await;
        assert!(unknown.is_error);
        assert_eq!(unknown.payload["error"], "unknown tool `send_email`");

        let malformed = toolbox.execute(&call("search_images", r#"{"query":"#)).await;
        assert!(malformed.is_error);
        assert!(malformed.payload["error"].as_str().unwrap().starts_with("invalid arguments"));
    }
}
