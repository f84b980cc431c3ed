//! Google Imagen `:predict` client used by the image relay.

use crate::api::models::{AspectRatio, PersonGeneration, SafetyFilterLevel};
use crate::core::config::ImagenConfig;
use crate::core::{AppError, Result};
use crate::services::upstream::{
    observe_latency, payload_error, read_error_body, status_error, transport_error,
};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub const PROVIDER_NAME: &str = "imagen";

const DEFAULT_MIME_TYPE: &str = "image/png";

/// Generation settings sent along with the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateImagesConfig {
    pub number_of_images: u32,
    pub aspect_ratio: AspectRatio,
    /// Only sent when the client was built with safety forwarding enabled
    pub safety_filter_level: SafetyFilterLevel,
    /// Only sent when the client was built with safety forwarding enabled
    pub person_generation: PersonGeneration,
}

/// Decoded image returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub image_bytes: Vec<u8>,
    pub mime_type: String,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: [PredictInstance<'a>; 1],
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    aspect_ratio: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    safety_setting: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    person_generation: Option<&'static str>,
}

#[derive(Debug, Default, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
    rai_filtered_reason: Option<String>,
}

/// Handle to the Imagen API, built once at startup.
#[derive(Clone)]
pub struct ImagenClient {
    http: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
    forward_safety_settings: bool,
}

impl ImagenClient {
    pub fn new(http: reqwest::Client, config: &ImagenConfig) -> Self {
        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            forward_safety_settings: config.forward_safety_settings,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn predict_url(&self) -> String {
        format!("{}/models/{}:predict", self.api_base, self.model)
    }

    fn build_request<'a>(
        &self,
        prompt: &'a str,
        config: &GenerateImagesConfig,
    ) -> PredictRequest<'a> {
        let (safety_setting, person_generation) = if self.forward_safety_settings {
            (
                Some(config.safety_filter_level.provider_setting()),
                Some(config.person_generation.as_str()),
            )
        } else {
            (None, None)
        };

        PredictRequest {
            instances: [PredictInstance { prompt }],
            parameters: PredictParameters {
                sample_count: config.number_of_images,
                aspect_ratio: config.aspect_ratio.as_str(),
                safety_setting,
                person_generation,
            },
        }
    }

    /// Generate images for one prompt and return the first usable one.
    ///
    /// Further samples are discarded without being decoded.
    pub async fn generate_image(
        &self,
        prompt: &str,
        config: &GenerateImagesConfig,
    ) -> Result<GeneratedImage> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AppError::MissingCredential("GOOGLE_GENAI_API_KEY"))?;
        let url = self.predict_url();

        tracing::debug!(
            provider = PROVIDER_NAME,
            model = %self.model,
            sample_count = config.number_of_images,
            aspect_ratio = config.aspect_ratio.as_str(),
            "Forwarding image request"
        );

        let start = Instant::now();
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&self.build_request(prompt, config))
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER_NAME, &url, e))?;
        observe_latency(PROVIDER_NAME, start);

        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(PROVIDER_NAME, response).await;
            return Err(status_error(PROVIDER_NAME, status, &body));
        }

        let payload: PredictResponse = response
            .json()
            .await
            .map_err(|e| payload_error(PROVIDER_NAME, format!("invalid JSON response: {}", e)))?;

        first_image(payload)
    }
}

/// Decode the first prediction that carries image bytes.
///
/// Filtered entries before it are skipped; entries after it are never
/// inspected.
fn first_image(payload: PredictResponse) -> Result<GeneratedImage> {
    let total = payload.predictions.len();
    let mut filtered_reason = None;

    for (index, prediction) in payload.predictions.into_iter().enumerate() {
        let Some(encoded) = prediction.bytes_base64_encoded else {
            if prediction.rai_filtered_reason.is_some() {
                filtered_reason = prediction.rai_filtered_reason;
            }
            continue;
        };

        let image_bytes = BASE64_STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| payload_error(PROVIDER_NAME, format!("invalid image base64: {}", e)))?;
        if index + 1 < total {
            tracing::debug!(discarded = total - index - 1, "Returning first image only");
        }

        return Ok(GeneratedImage {
            image_bytes,
            mime_type: prediction
                .mime_type
                .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
        });
    }

    let message = match filtered_reason {
        Some(reason) => format!("no images generated: {}", reason),
        None => "no images generated".to_string(),
    };
    Err(payload_error(PROVIDER_NAME, message))
}
