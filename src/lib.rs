//! genai-relay - a local REST relay for text and image generation providers
//!
//! Two relays share one axum server:
//!
//! - **Chat relay** (`POST /messages`): forwards model, token budget and
//!   messages to the Anthropic Messages API and returns its response as-is.
//! - **Image relay** (`POST /generate`): sends the first prompt to Google
//!   Imagen and returns the first image as a base64 envelope.
//!
//! # Architecture
//!
//! - [`core`]: config, errors, logging context, metrics, middleware
//! - [`api`]: HTTP handlers, models, OpenAPI document and router
//! - [`services`]: provider clients and request translation
//!
//! # Configuration
//!
//! Provider credentials come from `ANTHROPIC_API_KEY` and
//! `GOOGLE_GENAI_API_KEY`. See [`core::config`] for everything else.

pub mod api;
pub mod core;
pub mod services;

// Re-export commonly used types for convenience
pub use api::{build_router, ApiDoc, AppState, ChatRequest, ImageGenerationRequest};
pub use core::{AppConfig, AppError, ErrorMode, Result};
pub use services::{AnthropicClient, ImagenClient};
