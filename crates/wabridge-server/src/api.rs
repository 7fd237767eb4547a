//! HTTP surface of the bridge.
//!
//! One listener serves the static auth page, the pairing endpoints used by
//! that page, and the data API. Endpoints that mutate or expose message data
//! require the shared `X-API-Key` secret; when no secret is configured
//! (local development) the check is bypassed.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use wabridge_media::Transcriber;
use wabridge_proto::{MediaKind, ProtocolClient};
use wabridge_store::{Database, RecentMessage};

use crate::auth::{self, AuthHandle, AuthStatus, AuthView};
use crate::config::BridgeConfig;
use crate::error::ApiError;
use crate::{fetch, ingest, outbound};

const AUTH_PAGE_HTML: &str = include_str!("../assets/auth.html");

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<dyn ProtocolClient>,
    pub store: Arc<Database>,
    pub auth: Arc<AuthHandle>,
    pub config: Arc<BridgeConfig>,
    pub transcriber: Arc<Transcriber>,
}

pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(auth_page))
        .route("/api/health", get(health))
        .route("/api/auth/status", get(auth_status))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/api/auth/start", post(auth_start))
        .route("/api/auth/logout", post(auth_logout))
        .route("/api/messages/recent", get(recent_messages))
        .route("/api/send", post(send))
        .route("/api/download", post(download))
        .route("/api/transcribe", post(transcribe))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ))
        .with_state(state);

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "REST API listening");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let expected = state.config.api_key.as_str();
    if expected.is_empty() {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if api_key_matches(expected, provided) {
        next.run(request).await
    } else {
        ApiError::Unauthorized.into_response()
    }
}

/// Constant-time comparison to prevent timing attacks on the shared key.
fn api_key_matches(expected: &str, provided: &str) -> bool {
    use subtle::ConstantTimeEq;

    let expected = expected.as_bytes();
    let provided = provided.as_bytes();
    expected.len() == provided.len() && expected.ct_eq(provided).unwrap_u8() == 1
}

async fn auth_page() -> Html<&'static str> {
    Html(AUTH_PAGE_HTML)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: if state.client.is_connected() {
            "connected"
        } else {
            "disconnected"
        },
    })
}

/// Current auth view, overridden to `connected` whenever the client is live
/// with a stored identity -- the stored status can go stale across a silent
/// reconnect.
async fn auth_status(State(state): State<AppState>) -> Json<AuthView> {
    let view = if state.client.is_connected() && state.client.device_id().is_some() {
        AuthView::connected()
    } else {
        state.auth.snapshot().await
    };
    Json(view)
}

async fn auth_start(State(state): State<AppState>) -> Json<serde_json::Value> {
    tokio::spawn(auth::start_qr_auth(state));
    Json(serde_json::json!({ "status": "starting" }))
}

async fn auth_logout(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.client.disconnect().await;
    if state.client.device_id().is_some() {
        if let Err(e) = state.client.logout().await {
            warn!(error = %e, "logout failed");
        }
    }
    state.auth.set_status(AuthStatus::LoggedOut).await;
    Json(serde_json::json!({ "status": "logged_out" }))
}

#[derive(Debug, Deserialize)]
struct RecentQuery {
    #[serde(default = "default_hours")]
    hours: u32,
}

fn default_hours() -> u32 {
    48
}

async fn recent_messages(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<RecentMessage>>, ApiError> {
    let hours = if query.hours == 0 { default_hours() } else { query.hours };

    let mut messages = state
        .store
        .get_recent_messages(hours)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    ingest::resolve_phone_aliases(&state, &mut messages).await;

    Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
struct SendRequest {
    recipient: Option<String>,
    #[serde(default)]
    message: String,
    media_path: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendResponse {
    success: bool,
    message: String,
}

async fn send(
    State(state): State<AppState>,
    Json(request): Json<SendRequest>,
) -> Result<Response, ApiError> {
    let recipient = request
        .recipient
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ApiError::BadRequest("recipient is required".into()))?;

    if request.message.is_empty() && request.media_path.as_deref().unwrap_or("").is_empty() {
        return Err(ApiError::BadRequest(
            "message or media path is required".into(),
        ));
    }

    let (success, message) = outbound::send_message(
        &state,
        &recipient,
        &request.message,
        request.media_path.as_deref(),
    )
    .await;

    let status = if success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(SendResponse { success, message })).into_response())
}

#[derive(Debug, Deserialize)]
struct MediaRequest {
    message_id: Option<String>,
    chat_jid: Option<String>,
}

impl MediaRequest {
    fn validated(self) -> Result<(String, String), ApiError> {
        match (
            self.message_id.filter(|id| !id.is_empty()),
            self.chat_jid.filter(|jid| !jid.is_empty()),
        ) {
            (Some(id), Some(jid)) => Ok((id, jid)),
            _ => Err(ApiError::BadRequest(
                "message_id and chat_jid are required".into(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
struct DownloadResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

async fn download(
    State(state): State<AppState>,
    Json(request): Json<MediaRequest>,
) -> Result<Response, ApiError> {
    let (message_id, chat_jid) = request.validated()?;

    let response = match fetch::download_media(&state, &message_id, &chat_jid).await {
        Ok(media) => (
            StatusCode::OK,
            Json(DownloadResponse {
                success: true,
                message: format!("Successfully downloaded {} media", media.kind.as_str()),
                filename: Some(media.filename),
                path: Some(media.path.display().to_string()),
            }),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(DownloadResponse {
                success: false,
                message: format!("Failed to download media: {e}"),
                filename: None,
                path: None,
            }),
        ),
    };

    Ok(response.into_response())
}

#[derive(Debug, Serialize)]
struct TranscribeResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    transcription: Option<String>,
}

async fn transcribe(
    State(state): State<AppState>,
    Json(request): Json<MediaRequest>,
) -> Result<Response, ApiError> {
    let (message_id, chat_jid) = request.validated()?;

    // Transcriptions are immutable once attached; serve the cached one.
    if let Ok(Some(existing)) = state.store.get_transcription(&message_id, &chat_jid) {
        return Ok((
            StatusCode::OK,
            Json(TranscribeResponse {
                success: true,
                message: "Transcription already exists".into(),
                transcription: Some(existing),
            }),
        )
            .into_response());
    }

    let media = match fetch::download_media(&state, &message_id, &chat_jid).await {
        Ok(media) => media,
        Err(e) => {
            return Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(TranscribeResponse {
                    success: false,
                    message: format!("Failed to download media: {e}"),
                    transcription: None,
                }),
            )
                .into_response());
        }
    };

    if media.kind != MediaKind::Audio {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(TranscribeResponse {
                success: false,
                message: "Message is not an audio message".into(),
                transcription: None,
            }),
        )
            .into_response());
    }

    let response = match state.transcriber.transcribe(&media.path).await {
        Ok(text) => {
            if let Err(e) = state.store.attach_transcription(&message_id, &chat_jid, &text) {
                warn!(error = %e, "failed to store transcription");
            }
            (
                StatusCode::OK,
                Json(TranscribeResponse {
                    success: true,
                    message: "Transcription completed".into(),
                    transcription: Some(text),
                }),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(TranscribeResponse {
                success: false,
                message: format!("Transcription failed: {e}"),
                transcription: None,
            }),
        ),
    };

    Ok(response.into_response())
}
