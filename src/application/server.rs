#[cfg(test)]
#[path = "server_test.rs"]
mod tests;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::bail;
use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::CompletionBackend;
use crate::infrastructure::backends::Gemini;

#[derive(Clone)]
struct AppState {
    backend: Arc<dyn CompletionBackend>,
}

#[derive(Default, Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatReply {
    reply: String,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Debug, Error)]
enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0:#}")]
    Upstream(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({
            "error": self.to_string(),
        }));

        return (status, body).into_response();
    }
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(req) = payload.map_err(|err| return ApiError::BadRequest(err.body_text()))?;

    let message = req.message.unwrap_or_default();
    if message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message is required".to_string()));
    }

    match state.backend.get_completion(&message).await {
        Ok(reply) => return Ok(Json(ChatReply { reply })),
        Err(err) => {
            tracing::error!(error = ?err, "Completion request failed");
            return Err(ApiError::Upstream(err));
        }
    }
}

async fn health() -> Json<Health> {
    return Json(Health { status: "ok" });
}

/// The proxy's HTTP surface: exactly the chat and health routes.
pub fn router(backend: Arc<dyn CompletionBackend>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    return Router::new()
        .route("/api/chat", post(chat))
        .route("/api/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { backend });
}

/// Refuses to go any further without an upstream API key.
pub fn ensure_api_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        bail!("No Gemini API key is configured. Set GEMINI_API_KEY, pass --api-key, or add api-key to the config file.");
    }

    return Ok(());
}

pub async fn start() -> Result<()> {
    ensure_api_key(&Config::get(ConfigKey::ApiKey))?;

    let backend = Gemini::from_config();
    if let Err(err) = backend.health_check().await {
        tracing::warn!(error = ?err, "Gemini health check failed, serving anyway");
    }

    let port = Config::get(ConfigKey::Port).parse::<u16>()?;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, model = Config::get(ConfigKey::Model), "Chat proxy listening");
    axum::serve(listener, router(Arc::new(backend))).await?;

    return Ok(());
}
