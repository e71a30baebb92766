// Web server — Axum JSON / multipart transport over the moderation pipeline.
//
// Caller mistakes (bad fields, unsupported formats, failed fetches) map to
// 400. Internal failures and anything else that escapes a handler map to
// 500. Provider failures never do: they are part of the verdict.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::Config;
use crate::content::ContentKind;
use crate::error::ModerationError;
use crate::pipeline::Moderator;
use crate::signals::Collaborators;

pub mod handlers;

/// Which optional collaborators loaded at start-up.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub classifier_backend: &'static str,
    pub toxicity_classifier: bool,
    pub sentiment_model: bool,
    pub cascade_detector: bool,
}

impl ServiceStatus {
    pub fn new(config: &Config, collaborators: &Collaborators) -> Self {
        Self {
            classifier_backend: config.classifier.as_str(),
            toxicity_classifier: collaborators.toxicity.is_some(),
            sentiment_model: collaborators.sentiment.is_some(),
            cascade_detector: collaborators.detector.is_some(),
        }
    }
}

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub moderator: Moderator,
    pub status: Arc<ServiceStatus>,
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(config: Config, port: u16, bind: &str) -> Result<()> {
    let collaborators = config.collaborators();
    let status = ServiceStatus::new(&config, &collaborators);
    let state = AppState {
        moderator: config.moderator_with(collaborators)?,
        status: Arc::new(status),
    };

    let app = build_router(state, config.max_fetch_bytes);

    let addr = format!("{bind}:{port}");
    info!("Sentinel moderation service listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Routes, with uploads capped at `max_upload_bytes`.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/info", get(service_info))
        .route("/moderate/text", post(handlers::moderate_text))
        .route("/moderate/image", post(handlers::moderate_image))
        .route("/moderate/batch", post(handlers::moderate_batch))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "collaborators": &*state.status,
    }))
}

async fn service_info(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.moderator.registry();
    Json(serde_json::json!({
        "service": "sentinel",
        "version": env!("CARGO_PKG_VERSION"),
        "providers": {
            "text": registry.names(ContentKind::Text),
            "image": registry.names(ContentKind::Image),
        },
        "content_types": ["text", "question", "answer", "comment"],
        "image_formats": ["jpeg", "png", "gif", "bmp", "webp"],
        "actions": ["allow", "flag", "block"],
    }))
}

/// Handler failure, split by who is at fault.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(anyhow::Error),
}

impl From<ModerationError> for ApiError {
    fn from(err: ModerationError) -> Self {
        match err {
            ModerationError::Internal(_) => ApiError::Internal(err.into()),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => api_error(StatusCode::BAD_REQUEST, &message),
            ApiError::Internal(err) => {
                error!(error = %format!("{err:#}"), "Request failed");
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_mistakes_are_bad_requests() {
        let response = ApiError::from(ModerationError::validation("no file")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_moderation_errors_are_server_errors() {
        let err = ModerationError::Internal("image decoding task failed".into());
        let api_error = ApiError::from(err);
        assert!(matches!(api_error, ApiError::Internal(_)));
        assert_eq!(
            api_error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
