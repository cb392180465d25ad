//! HTTP surface: the chat endpoint, a health probe, and CORS.
//!
//! Errors from the orchestrator are translated into JSON error bodies here;
//! only a failed generation call is expected to reach users in practice.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::error::SolarAdvisorError;
use crate::models::{ChatReply, ChatRequest};
use crate::orchestrator::DialogueOrchestrator;

/// JSON error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Request-boundary error mapped to an HTTP status
#[derive(Debug)]
pub enum ApiError {
    /// The generation service failed or was unreachable
    BadGateway(String),
    /// The session store is unavailable
    ServiceUnavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "generation_failed", msg),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<SolarAdvisorError> for ApiError {
    fn from(err: SolarAdvisorError) -> Self {
        match &err {
            SolarAdvisorError::Generation(_) | SolarAdvisorError::Http(_) => {
                ApiError::BadGateway(err.to_string())
            }
            SolarAdvisorError::Redis(_)
            | SolarAdvisorError::Pool(_)
            | SolarAdvisorError::PoolCreation(_) => ApiError::ServiceUnavailable(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

async fn chat(
    State(orchestrator): State<Arc<DialogueOrchestrator>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    match orchestrator.handle(request).await {
        Ok(reply) => Ok(Json(reply)),
        Err(e) => {
            tracing::error!("Chat request failed: {}", e);
            Err(e.into())
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin {}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
        ])
        .max_age(Duration::from_secs(3600))
}

/// Build the router serving `POST /chatbot/chat` and `GET /health`
pub fn create_router(orchestrator: Arc<DialogueOrchestrator>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/chatbot/chat", post(chat))
        .route("/health", get(health))
        .layer(cors_layer(cors_origins))
        .with_state(orchestrator)
}
