//! HTTP API for asking questions about videos.
//!
//! `POST /chat` takes a video ID and a question and answers from that video's
//! transcript. Indices are built on first use and cached.

use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::orchestrator::Orchestrator;
use crate::rag::{OpenAICompatibleChat, RagEngine};
use crate::transcript::normalize_video_id;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

const MISSING_FIELDS: &str = "Missing video_id or question";
const TRANSCRIPT_UNAVAILABLE: &str =
    "Could not process video transcript (e.g. no captions available).";

/// Shared application state.
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub engine: RagEngine,
}

impl AppState {
    /// Wire the pipeline and answer engine from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let orchestrator = Orchestrator::new(settings)?;

        let api_key = settings.llm_api_key();
        if api_key.is_none() {
            warn!(
                "{} is not set; requests to {} will be unauthenticated",
                settings.llm.api_key_env, settings.llm.base_url
            );
        }
        let chat = OpenAICompatibleChat::from_settings(&settings.llm, api_key)?;
        info!("Answering with {}", chat.model());

        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let engine = RagEngine::new(orchestrator.embedder(), Arc::new(chat))
            .with_prompts(prompts)
            .with_top_k(settings.retrieval.top_k);

        Ok(Self {
            orchestrator,
            engine,
        })
    }
}

/// Build the application router with permissive CORS.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .route("/videos", get(list_videos))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Serialize)]
struct ChatResponse {
    answer: String,
}

#[derive(Serialize)]
struct VideoListResponse {
    videos: Vec<crate::cache::CachedVideo>,
    total: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Trimmed value of a required text field, or `None` when absent or blank.
fn required(field: Option<&String>) -> Option<&str> {
    field.map(|s| s.trim()).filter(|s| !s.is_empty())
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_videos(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let videos = state.orchestrator.cache().entries();
    let total = videos.len();
    Json(VideoListResponse { videos, total })
}

async fn chat(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let span = info_span!("chat", request_id = %Uuid::new_v4());
    handle_chat(state, payload).instrument(span).await
}

async fn handle_chat(
    state: Arc<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected chat body: {}", rejection);
            ChatRequest::default()
        }
    };

    // The question is forwarded as sent; blank only counts as missing.
    let (Some(video_id), Some(question)) = (
        required(request.video_id.as_ref()),
        request.question.as_deref().filter(|q| !q.trim().is_empty()),
    ) else {
        return error_response(StatusCode::BAD_REQUEST, MISSING_FIELDS);
    };

    let video_id = match normalize_video_id(video_id) {
        Ok(id) => id,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, MISSING_FIELDS),
    };
    info!("Question for {}: {}", video_id, question);

    let Some(index) = state.orchestrator.get_or_create(&video_id).await else {
        return error_response(StatusCode::NOT_FOUND, TRANSCRIPT_UNAVAILABLE);
    };

    match state.engine.ask(index, question).await {
        Ok(response) => Json(ChatResponse {
            answer: response.answer,
        })
        .into_response(),
        Err(e) => {
            warn!("Answer failed for {}: {}", video_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
