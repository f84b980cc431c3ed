//! Request translation between the local schemas and the providers.
//!
//! Image relay keeps only the first instance's prompt and only the first
//! generated image, even when more are supplied or requested.

use crate::api::models::{
    ChatRequest, ImageGenerationRequest, ImageGenerationResponse, ImagePrediction,
};
use crate::core::{AppError, Result};
use crate::services::anthropic::AnthropicClient;
use crate::services::imagen::{GenerateImagesConfig, ImagenClient};
use serde_json::Value;

/// Forward a chat request and return the provider's message object unchanged.
pub async fn relay_chat(client: &AnthropicClient, request: &ChatRequest) -> Result<Value> {
    client.create_message(request).await
}

/// Generate an image for the first instance and wrap the first result.
pub async fn relay_image(
    client: &ImagenClient,
    request: &ImageGenerationRequest,
) -> Result<ImageGenerationResponse> {
    request.validate()?;

    let prompt = request.prompt().ok_or_else(|| {
        AppError::Validation("instances must contain at least one prompt".to_string())
    })?;
    if request.instances.len() > 1 {
        tracing::debug!(
            ignored = request.instances.len() - 1,
            "Using first instance only"
        );
    }

    let parameters = &request.parameters;
    let config = GenerateImagesConfig {
        number_of_images: parameters.sample_count,
        aspect_ratio: parameters.aspect_ratio,
        safety_filter_level: parameters.safety_filter_level,
        person_generation: parameters.person_generation,
    };

    let image = client.generate_image(prompt, &config).await?;

    Ok(ImageGenerationResponse {
        predictions: vec![ImagePrediction::from(&image)],
    })
}
