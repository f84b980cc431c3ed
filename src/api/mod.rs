//! API layer for the relay server.
//!
//! This module contains the HTTP handlers, request/response models, the
//! OpenAPI document and the router that ties them together.

pub mod docs;
pub mod handlers;
pub mod models;

use crate::core::logging::REQUEST_ID_HEADER;
use crate::core::{request_id_middleware, MetricsMiddleware};
use axum::{
    extract::DefaultBodyLimit,
    http::header,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Re-export commonly used types
pub use docs::ApiDoc;
pub use handlers::{generate, health, hello, messages, metrics_handler, AppState};
pub use models::{
    ChatMessage, ChatRequest, ImageGenerationRequest, ImageGenerationResponse, ImageInstance,
    ImageParameters, ImagePrediction,
};

/// Any origin, method and header, with credentials.
///
/// `*` cannot be combined with credentials, so origin, method and request
/// headers are mirrored back instead.
pub fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers([header::HeaderName::from_static(REQUEST_ID_HEADER)])
        .max_age(std::time::Duration::from_secs(600))
}

/// Build the application router with all endpoints and middleware.
///
/// Relay bodies are not size-limited; conversations are forwarded whole.
pub fn build_router(state: Arc<AppState>) -> Router {
    let relay_routes = Router::new()
        .route("/hello", get(hello))
        .route("/messages", post(messages))
        .route("/generate", post(generate))
        .route("/health", get(health))
        .route_layer(axum::middleware::from_fn(MetricsMiddleware::track_metrics))
        .layer(DefaultBodyLimit::disable())
        .with_state(state);

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .merge(relay_routes)
        .route("/metrics", get(metrics_handler))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(permissive_cors())
        .layer(TraceLayer::new_for_http())
}
