//! Test utilities for kassa-core
//!
//! A mock oracle server speaking both the OpenAI-compatible and the Ollama
//! HTTP APIs, so backends can be exercised over real HTTP.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::oneshot;

use crate::ai::heuristic_reply;

/// One scripted server reply
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Model output text, wrapped in the API's response envelope
    Text(String),
    /// Bare HTTP error status
    Status(u16),
}

#[derive(Clone, Default)]
struct ServerState {
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ServerState {
    /// Record the prompt and pick the reply for it
    fn next(&self, prompt: &str) -> ScriptedReply {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ScriptedReply::Text(heuristic_reply(prompt)))
    }
}

/// Mock oracle server for testing and development
pub struct MockOracleServer {
    addr: SocketAddr,
    state: ServerState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockOracleServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let state = ServerState::default();
        let app = Router::new()
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat_completions))
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Queue a model output for the next request
    pub fn reply(&self, text: impl Into<String>) {
        self.push(ScriptedReply::Text(text.into()));
    }

    /// Queue an HTTP error for the next request
    pub fn fail_with(&self, status: u16) {
        self.push(ScriptedReply::Status(status));
    }

    fn push(&self, reply: ScriptedReply) {
        self.state.replies.lock().unwrap().push_back(reply);
    }

    /// User prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.state.prompts.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.prompts.lock().unwrap().len()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockOracleServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
}

async fn handle_models() -> impl IntoResponse {
    Json(json!({"object": "list", "data": [{"id": "mock-model", "object": "model"}]}))
}

async fn handle_tags() -> impl IntoResponse {
    Json(json!({"models": [{"name": "llama3.2:latest", "size": 4_000_000_000u64}]}))
}

async fn handle_chat_completions(
    State(state): State<ServerState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let prompt = request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.clone())
        .unwrap_or_default();

    match state.next(&prompt) {
        ScriptedReply::Text(content) => Json(json!({
            "id": "chatcmpl-mock",
            "object": "chat.completion",
            "model": request.model,
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        }))
        .into_response(),
        ScriptedReply::Status(code) => status_response(code),
    }
}

async fn handle_generate(
    State(state): State<ServerState>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    match state.next(&request.prompt) {
        ScriptedReply::Text(response) => Json(json!({
            "model": request.model,
            "response": response,
            "done": true
        }))
        .into_response(),
        ScriptedReply::Status(code) => status_response(code),
    }
}

fn status_response(code: u16) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, "mock failure").into_response()
}
