//! Mock payment proxy fronting both the chat model and the image provider
//!
//! Chat replies are scripted: each completion request consumes the next
//! queued body. Image endpoints return a small fixed catalog.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

pub const API_KEY: &str = "sk-integration";

/// A scripted chat reply
pub enum Reply {
    /// Raw event-stream body
    Stream(String),
    /// Non-streaming JSON body
    Json(Value),
    /// Error status with a JSON body
    Error(StatusCode, Value),
}

/// Running mock proxy
pub struct MockProxy {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<ProxyState>,
}

#[derive(Default)]
struct ProxyState {
    replies: Mutex<VecDeque<Reply>>,
    chat_requests: Mutex<Vec<Value>>,
    purchases: Mutex<Vec<Value>>,
    out_of_funds: Mutex<bool>,
}

impl MockProxy {
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(ProxyState::default());

        let app = Router::new()
            .route("/proxy/openrouter/v1/chat/completions", routing::post(handle_chat))
            .route(
                "/v1/receivers/getty-images/search/images/creative",
                routing::get(handle_search),
            )
            .route("/v1/receivers/getty-images/images/download", routing::post(handle_download))
            .route("/v1/events", routing::get(handle_events))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Queue the body returned by the next chat request
    pub fn push_reply(&self, reply: Reply) {
        self.state.replies.lock().unwrap().push_back(reply);
    }

    /// Chat request bodies received so far
    pub fn chat_requests(&self) -> Vec<Value> {
        self.state.chat_requests.lock().unwrap().clone()
    }

    /// Purchase request bodies received so far
    pub fn purchases(&self) -> Vec<Value> {
        self.state.purchases.lock().unwrap().clone()
    }

    /// Make every purchase fail with 402
    pub fn drain_wallet(&self) {
        *self.state.out_of_funds.lock().unwrap() = true;
    }
}

impl Drop for MockProxy {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("skyfire-api-key")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == API_KEY)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"code": "INVALID_API_KEY", "message": "unknown key"})),
    )
        .into_response()
}

async fn handle_chat(State(state): State<Arc<ProxyState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    state.chat_requests.lock().unwrap().push(body);

    let reply = state.replies.lock().unwrap().pop_front();
    match reply {
        Some(Reply::Stream(text)) => ([(header::CONTENT_TYPE, "text/event-stream")], text).into_response(),
        Some(Reply::Json(value)) => Json(value).into_response(),
        Some(Reply::Error(status, value)) => (status, Json(value)).into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "no scripted reply"})),
        )
            .into_response(),
    }
}

fn catalog_image(id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "caption": format!("{title} caption"),
        "display_sizes": [
            {"is_watermarked": true, "name": "thumb", "uri": format!("https://media.example/{id}/thumb.jpg")},
            {"is_watermarked": true, "name": "comp", "uri": format!("https://media.example/{id}/comp.jpg")}
        ],
        "download_sizes": [
            {"name": "small", "height": 300, "width": 400, "media_type": "image/jpeg", "amount": 1000},
            {"name": "large", "height": 3000, "width": 4000, "media_type": "image/jpeg", "amount": 12000}
        ],
        "max_dimensions": {"height": 3000, "width": 4000}
    })
}

async fn handle_search(headers: HeaderMap, Query(params): Query<Vec<(String, String)>>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    let phrase = params
        .iter()
        .find(|(key, _)| key == "phrase")
        .map_or("", |(_, value)| value.as_str());

    Json(json!({
        "result_count": 3,
        "images": [
            catalog_image("1001", &format!("{phrase} one")),
            catalog_image("1002", &format!("{phrase} two"))
        ]
    }))
    .into_response()
}

async fn handle_download(State(state): State<Arc<ProxyState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    if *state.out_of_funds.lock().unwrap() {
        return (
            StatusCode::PAYMENT_REQUIRED,
            Json(json!({"code": "INSUFFICIENT_FUNDS", "message": "wallet empty"})),
        )
            .into_response();
    }

    let id = body["id"].as_str().unwrap_or_default().to_owned();
    state.purchases.lock().unwrap().push(body);

    if id == "missing" {
        return (StatusCode::NOT_FOUND, Json(json!({"message": "no such image"}))).into_response();
    }

    let mut image = catalog_image(&id, "Purchased");
    image["uri"] = json!(format!("https://download.example/{id}.jpg"));
    Json(image).into_response()
}

async fn handle_events(headers: HeaderMap, Query(params): Query<Vec<(String, String)>>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    let claims_only = params.iter().any(|(key, value)| key == "eventNames" && value == "Claim");
    if !claims_only {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "eventNames required"}))).into_response();
    }

    Json(json!([
        {
            "id": "evt-1",
            "eventName": "Claim",
            "createdAt": "2024-05-01T12:00:00Z",
            "attributes": {
                "gettyImage": {
                    "id": "1001",
                    "uri": "https://download.example/1001.jpg",
                    "title": "fox one"
                }
            }
        }
    ]))
    .into_response()
}
