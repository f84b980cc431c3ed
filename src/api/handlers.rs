//! HTTP request handlers for the relay API.
//!
//! This module contains the chat and image relay endpoints plus the
//! greeting, health and metrics endpoints.

use crate::api::models::*;
use crate::core::config::{AppConfig, ErrorMode};
use crate::core::logging::get_request_id;
use crate::core::{AppError, RelayEndpoint, Result};
use crate::services::{relay_chat, relay_image, AnthropicClient, ImagenClient};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;

/// Shared application state.
///
/// Provider clients are built once at startup and only read afterwards.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub anthropic: AnthropicClient,
    pub imagen: ImagenClient,
}

impl AppState {
    /// Build both provider clients on top of one pooled HTTP client.
    pub fn new(config: AppConfig, http_client: reqwest::Client) -> Self {
        let anthropic = AnthropicClient::new(http_client.clone(), &config.anthropic);
        let imagen = ImagenClient::new(http_client, &config.imagen);
        Self {
            config,
            anthropic,
            imagen,
        }
    }

    /// Render a relay failure according to the configured error mode.
    fn error_response(&self, endpoint: RelayEndpoint, err: AppError) -> Response {
        match self.config.error_mode {
            ErrorMode::Typed => err.into_response(),
            ErrorMode::Legacy => err.into_legacy_response(endpoint),
        }
    }
}

/// Greeting endpoint.
#[utoipa::path(
    get,
    path = "/hello",
    tag = "relay",
    responses(
        (status = 200, description = "Static greeting", body = HelloResponse)
    )
)]
pub async fn hello() -> Json<HelloResponse> {
    Json(HelloResponse::default())
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    tag = "relay",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Chat relay.
///
/// Forwards model, max_tokens and messages to the text-generation provider
/// and returns its message object unchanged.
#[utoipa::path(
    post,
    path = "/messages",
    tag = "relay",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Provider message object, unmodified"),
        (status = 415, description = "Body not sent as JSON", body = ErrorResponse),
        (status = 422, description = "Invalid request body", body = ErrorResponse),
        (status = 500, description = "Missing credential or internal error", body = ErrorResponse),
        (status = 502, description = "Upstream provider error", body = ErrorResponse),
        (status = 504, description = "Upstream timeout", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(request_id = %get_request_id()))]
pub async fn messages(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let result: Result<Response> = async {
        let Json(request) = payload?;
        tracing::info!(model = %request.model, "Relaying chat request");
        let message = relay_chat(&state.anthropic, &request).await?;
        Ok(Json(message).into_response())
    }
    .await;

    result.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Chat relay failed");
        state.error_response(RelayEndpoint::Messages, err)
    })
}

/// Image relay.
///
/// Uses the first instance's prompt and returns only the first generated
/// image, base64-encoded.
#[utoipa::path(
    post,
    path = "/generate",
    tag = "relay",
    request_body = ImageGenerationRequest,
    responses(
        (status = 200, description = "Envelope with exactly one prediction", body = ImageGenerationResponse),
        (status = 415, description = "Body not sent as JSON", body = ErrorResponse),
        (status = 422, description = "Invalid request body", body = ErrorResponse),
        (status = 500, description = "Missing credential or internal error", body = ErrorResponse),
        (status = 502, description = "Upstream provider error or no image generated", body = ErrorResponse),
        (status = 504, description = "Upstream timeout", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload), fields(request_id = %get_request_id()))]
pub async fn generate(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ImageGenerationRequest>, JsonRejection>,
) -> Response {
    let result: Result<Response> = async {
        let Json(request) = payload?;
        tracing::info!(
            model = %state.imagen.model(),
            instances = request.instances.len(),
            sample_count = request.parameters.sample_count,
            "Relaying image request"
        );
        let envelope = relay_image(&state.imagen, &request).await?;
        Ok(Json(envelope).into_response())
    }
    .await;

    result.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Image relay failed");
        state.error_response(RelayEndpoint::Generate, err)
    })
}

/// Prometheus metrics endpoint.
#[tracing::instrument]
pub async fn metrics_handler() -> Result<Response> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response())
}
