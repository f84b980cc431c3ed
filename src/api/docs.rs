//! OpenAPI document for the relay endpoints.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "genai-relay",
        description = "Local REST relay for text and image generation providers"
    ),
    paths(
        crate::api::handlers::hello,
        crate::api::handlers::health,
        crate::api::handlers::messages,
        crate::api::handlers::generate,
    ),
    components(
        schemas(
            crate::api::models::ChatMessage,
            crate::api::models::ChatRequest,
            crate::api::models::ImageInstance,
            crate::api::models::ImageParameters,
            crate::api::models::AspectRatio,
            crate::api::models::SafetyFilterLevel,
            crate::api::models::PersonGeneration,
            crate::api::models::ImageGenerationRequest,
            crate::api::models::ImagePrediction,
            crate::api::models::ImageGenerationResponse,
            crate::api::models::HelloResponse,
            crate::api::models::HealthResponse,
            crate::api::models::ErrorResponse,
        )
    ),
    tags(
        (name = "relay", description = "Provider relay endpoints")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_relay_paths() {
        let doc = ApiDoc::openapi();
        for path in ["/hello", "/health", "/messages", "/generate"] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn test_openapi_has_request_schemas() {
        let doc = ApiDoc::openapi();
        let schemas = doc.components.unwrap().schemas;
        assert!(schemas.contains_key("ChatRequest"));
        assert!(schemas.contains_key("ImageGenerationRequest"));
        assert!(schemas.contains_key("ImageGenerationResponse"));
    }
}
