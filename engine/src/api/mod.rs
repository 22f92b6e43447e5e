//! HTTP API
//!
//! # Endpoints
//!
//! - POST /chat - Run one chat turn
//! - OPTIONS /chat - Preflight acknowledgement
//! - GET /status - Version, visible tables and provider health
//!
//! The CORS layer answers every OPTIONS request itself; [`preflight_body`]
//! gives the `/chat` preflight its JSON body on the way out.
//!
//! Each chat turn runs in its own task. A panic inside the pipeline is caught
//! at the join and reported as HTTP 500; everything else the pipeline reports
//! in-band with HTTP 200.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sdk::errors::EngineError;
use sdk::{ChatRequest, ErrorResponse, PreflightResponse, ProviderHealth, StatusResponse};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::conductor::Conductor;
use crate::config::ServerConfig;

/// Shared state for every handler
#[derive(Clone)]
pub struct ApiState {
    conductor: Arc<Conductor>,
}

impl ApiState {
    pub fn new(conductor: Arc<Conductor>) -> Self {
        Self { conductor }
    }
}

/// Build the application router.
pub fn router(state: ApiState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/status", get(status_handler))
        .with_state(state)
        .layer(cors_layer(allowed_origins))
        .layer(middleware::from_fn(preflight_body))
        .layer(TraceLayer::new_for_http())
}

/// CORS restricted to the configured origins. Origins that are not valid
/// header values are skipped.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Bind and serve until Ctrl+C.
pub async fn serve(config: &ServerConfig, conductor: Arc<Conductor>) -> Result<(), EngineError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| EngineError::Config(format!("Invalid server address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| EngineError::Network(format!("Failed to bind to {}: {}", addr, e)))?;

    let app = router(ApiState::new(conductor), &config.allowed_origins);
    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("API server shutting down gracefully");
        })
        .await
        .map_err(|e| EngineError::Network(format!("API server error: {}", e)))
}

fn error_response(status: StatusCode, error: &str, details: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            details: details.into(),
        }),
    )
        .into_response()
}

async fn chat_handler(
    State(state): State<ApiState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "Invalid request body",
                rejection.body_text(),
            );
        }
    };

    if request.message.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid request body",
            "message must not be empty",
        );
    }

    let conductor = Arc::clone(&state.conductor);
    match tokio::spawn(async move { conductor.handle(request).await }).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::error!("Chat task failed: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred while processing your request",
                e.to_string(),
            )
        }
    }
}

/// Replace the empty preflight body for `/chat` with `{"status": "ok"}`.
async fn preflight_body(request: Request, next: Next) -> Response {
    let chat_preflight = request.method() == Method::OPTIONS && request.uri().path() == "/chat";
    let response = next.run(request).await;
    if !chat_preflight || !response.status().is_success() {
        return response;
    }

    let body = match serde_json::to_vec(&PreflightResponse::default()) {
        Ok(body) => body,
        Err(_) => return response,
    };
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Response::from_parts(parts, Body::from(body))
}

async fn status_handler(State(state): State<ApiState>) -> Json<StatusResponse> {
    let tables = match state.conductor.agent().usable_table_names().await {
        Ok(tables) => tables,
        Err(e) => {
            tracing::warn!("Could not list tables: {}", e);
            Vec::new()
        }
    };

    let providers = state
        .conductor
        .router()
        .check_health()
        .await
        .into_iter()
        .map(|(name, healthy)| ProviderHealth {
            name: name.to_string(),
            healthy,
        })
        .collect();

    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        tables,
        providers,
    })
}
