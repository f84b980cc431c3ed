//! API request and response models.
//!
//! This module defines the inbound chat and image request schemas and the
//! envelopes returned to callers.

use crate::core::{AppError, Result};
use crate::services::imagen::GeneratedImage;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Largest `sampleCount` the image relay accepts.
pub const MAX_SAMPLE_COUNT: u32 = 8;

/// A single message in a conversation.
///
/// `role` is free-form and passed through without validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"role": "user", "content": "Hello!"}))]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat relay request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "model": "claude-sonnet-4-20250514",
    "max_tokens": 1024,
    "messages": [
        {"role": "user", "content": "Hello!"}
    ]
}))]
pub struct ChatRequest {
    /// Provider model identifier, forwarded unchanged
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Conversation messages in order
    pub messages: Vec<ChatMessage>,
}

/// One prompt entry of an image request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImageInstance {
    /// Prompt for image generation
    pub prompt: String,
}

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "16:9")]
    Landscape16x9,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "3:4")]
    Portrait3x4,
}

impl AspectRatio {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait9x16 => "9:16",
            Self::Landscape16x9 => "16:9",
            Self::Landscape4x3 => "4:3",
            Self::Portrait3x4 => "3:4",
        }
    }
}

/// Safety filter strength requested by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SafetyFilterLevel {
    BlockMost,
    #[default]
    BlockSome,
    BlockFew,
}

impl SafetyFilterLevel {
    /// Imagen `safetySetting` value for this level.
    pub const fn provider_setting(self) -> &'static str {
        match self {
            Self::BlockMost => "block_low_and_above",
            Self::BlockSome => "block_medium_and_above",
            Self::BlockFew => "block_only_high",
        }
    }
}

/// Whether generated images may depict people.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PersonGeneration {
    #[default]
    AllowAdult,
    DontAllow,
}

impl PersonGeneration {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllowAdult => "allow_adult",
            Self::DontAllow => "dont_allow",
        }
    }
}

/// Image generation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageParameters {
    /// Number of images to request (1-8)
    #[serde(default = "default_sample_count")]
    #[schema(minimum = 1, maximum = 8, default = 1)]
    pub sample_count: u32,

    #[serde(default)]
    pub aspect_ratio: AspectRatio,

    /// Accepted but only sent when safety forwarding is enabled
    #[serde(default)]
    pub safety_filter_level: SafetyFilterLevel,

    /// Accepted but only sent when safety forwarding is enabled
    #[serde(default)]
    pub person_generation: PersonGeneration,
}

impl Default for ImageParameters {
    fn default() -> Self {
        Self {
            sample_count: default_sample_count(),
            aspect_ratio: AspectRatio::default(),
            safety_filter_level: SafetyFilterLevel::default(),
            person_generation: PersonGeneration::default(),
        }
    }
}

fn default_sample_count() -> u32 {
    1
}

/// Image relay request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "instances": [{"prompt": "a cat"}],
    "parameters": {"sampleCount": 1, "aspectRatio": "1:1"}
}))]
pub struct ImageGenerationRequest {
    /// Prompts; only the first one is used
    pub instances: Vec<ImageInstance>,

    pub parameters: ImageParameters,
}

impl ImageGenerationRequest {
    /// Check the constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.instances.is_empty() {
            return Err(AppError::Validation(
                "instances must contain at least one prompt".to_string(),
            ));
        }
        let count = self.parameters.sample_count;
        if !(1..=MAX_SAMPLE_COUNT).contains(&count) {
            return Err(AppError::Validation(format!(
                "sampleCount must be between 1 and {}, got {}",
                MAX_SAMPLE_COUNT, count
            )));
        }
        Ok(())
    }

    /// Prompt of the first instance. Additional instances are ignored.
    pub fn prompt(&self) -> Option<&str> {
        self.instances.first().map(|i| i.prompt.as_str())
    }
}

/// One image in the response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImagePrediction {
    #[serde(rename = "bytesBase64Encoded")]
    pub bytes_base64_encoded: String,

    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

impl From<&GeneratedImage> for ImagePrediction {
    fn from(image: &GeneratedImage) -> Self {
        Self {
            bytes_base64_encoded: BASE64_STANDARD.encode(&image.image_bytes),
            mime_type: image.mime_type.clone(),
        }
    }
}

/// Image relay response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImageGenerationResponse {
    pub predictions: Vec<ImagePrediction>,
}

/// Greeting returned by `/hello`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HelloResponse {
    #[serde(rename = "Hello")]
    pub hello: String,
}

impl Default for HelloResponse {
    fn default() -> Self {
        Self {
            hello: "World".to_string(),
        }
    }
}

/// Liveness response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Typed error body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "detail": "Upstream error from anthropic: invalid x-api-key",
    "type": "upstream_error"
}))]
pub struct ErrorResponse {
    pub detail: String,
    #[serde(rename = "type")]
    pub error_type: String,
}
