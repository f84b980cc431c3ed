//! Provider clients and relay logic.
//!
//! Each provider client is constructed once at startup and shared read-only
//! between requests.

pub mod anthropic;
pub mod imagen;
pub mod relay;
pub mod upstream;

// Re-export commonly used types
pub use anthropic::AnthropicClient;
pub use imagen::{GenerateImagesConfig, GeneratedImage, ImagenClient};
pub use relay::{relay_chat, relay_image};
