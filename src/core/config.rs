//! Configuration management for the relay server.
//!
//! Values are layered: serde defaults, then an optional config file, then
//! environment variables (env vars take precedence).

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "RELAY_CONFIG";

/// Config file looked up in the working directory when no path is given.
const DEFAULT_CONFIG_NAME: &str = "relay";

/// Environment variable -> config key overrides.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("HOST", "server.host"),
    ("PORT", "server.port"),
    ("VERIFY_SSL", "verify_ssl"),
    ("REQUEST_TIMEOUT_SECS", "request_timeout_secs"),
    ("ERROR_MODE", "error_mode"),
    ("ANTHROPIC_API_KEY", "anthropic.api_key"),
    ("ANTHROPIC_API_BASE", "anthropic.api_base"),
    ("ANTHROPIC_VERSION", "anthropic.version"),
    ("GOOGLE_GENAI_API_KEY", "imagen.api_key"),
    ("IMAGEN_API_BASE", "imagen.api_base"),
    ("IMAGEN_MODEL", "imagen.model"),
    ("IMAGEN_FORWARD_SAFETY_SETTINGS", "imagen.forward_safety_settings"),
];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port)
    #[serde(default)]
    pub server: ServerConfig,

    /// Whether to verify SSL certificates for upstream requests
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,

    /// Request timeout in seconds for upstream providers
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// How relay failures are reported to callers
    #[serde(default)]
    pub error_mode: ErrorMode,

    /// Text-generation provider
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Image-generation provider
    #[serde(default)]
    pub imagen: ImagenConfig,
}

/// Failure signaling used by the relay endpoints.
///
/// Parsed case-insensitively, so `ERROR_MODE=Legacy` works.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Same typed status codes on every endpoint
    #[default]
    Typed,
    /// `/messages` answers 500, `/generate` answers 200 with an error body
    Legacy,
}

impl FromStr for ErrorMode {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("typed") {
            Ok(ErrorMode::Typed)
        } else if value.eq_ignore_ascii_case("legacy") {
            Ok(ErrorMode::Legacy)
        } else {
            Err(format!(
                "unknown error mode `{}`, expected `typed` or `legacy`",
                value
            ))
        }
    }
}

impl<'de> Deserialize<'de> for ErrorMode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Anthropic Messages API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_anthropic_api_base")]
    pub api_base: String,

    /// Value of the `anthropic-version` header
    #[serde(default = "default_anthropic_version")]
    pub version: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_anthropic_api_base(),
            version: default_anthropic_version(),
        }
    }
}

/// Google Imagen `:predict` settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagenConfig {
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_imagen_api_base")]
    pub api_base: String,

    #[serde(default = "default_imagen_model")]
    pub model: String,

    /// Send safetyFilterLevel/personGeneration along with the prompt
    #[serde(default)]
    pub forward_safety_settings: bool,
}

impl Default for ImagenConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_imagen_api_base(),
            model: default_imagen_model(),
            forward_safety_settings: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            verify_ssl: default_verify_ssl(),
            request_timeout_secs: default_request_timeout(),
            error_mode: ErrorMode::default(),
            anthropic: AnthropicConfig::default(),
            imagen: ImagenConfig::default(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_verify_ssl() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    300
}

fn default_anthropic_api_base() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_anthropic_version() -> String {
    "2023-06-01".to_string()
}

fn default_imagen_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_imagen_model() -> String {
    "imagen-4.0-generate-001".to_string()
}

impl AppConfig {
    /// Load configuration using `RELAY_CONFIG` as the optional file path.
    pub fn from_env() -> Result<Self> {
        let path = non_empty_env(CONFIG_PATH_ENV);
        Self::load(path.as_deref())
    }

    /// Load configuration from an optional file plus environment overrides.
    ///
    /// An explicit `path` must exist. Without one, `relay.{toml,yaml,json}`
    /// in the working directory is read if present.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use genai_relay::core::config::AppConfig;
    ///
    /// let config = AppConfig::load(Some("relay.toml")).expect("Failed to load config");
    /// ```
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        builder = match path {
            Some(path) => builder.add_source(config::File::from(Path::new(path)).required(true)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        for (env_name, key) in ENV_OVERRIDES {
            builder = builder
                .set_override_option(*key, non_empty_env(env_name))
                .with_context(|| format!("Invalid override for {}", env_name))?;
        }

        let settings = builder
            .build()
            .with_context(|| match path {
                Some(path) => format!("Failed to read config file: {}", path),
                None => "Failed to build configuration".to_string(),
            })?;

        settings
            .try_deserialize::<AppConfig>()
            .context("Failed to parse configuration")
    }

    /// Log which provider credentials are missing.
    pub fn warn_missing_credentials(&self) {
        if self.anthropic.api_key.is_none() {
            tracing::warn!("ANTHROPIC_API_KEY is not set; /messages will fail until it is");
        }
        if self.imagen.api_key.is_none() {
            tracing::warn!("GOOGLE_GENAI_API_KEY is not set; /generate will fail until it is");
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::Builder;

    fn clear_overrides() {
        for (env_name, _) in ENV_OVERRIDES {
            unsafe {
                std::env::remove_var(env_name);
            }
        }
    }

    fn write_config(extension: &str, content: &str) -> tempfile::NamedTempFile {
        let mut temp_file = Builder::new().suffix(extension).tempfile().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert!(config.verify_ssl);
        assert_eq!(config.request_timeout_secs, 300);
        assert_eq!(config.error_mode, ErrorMode::Typed);
        assert_eq!(config.anthropic.version, "2023-06-01");
        assert_eq!(config.imagen.model, "imagen-4.0-generate-001");
        assert!(!config.imagen.forward_safety_settings);
    }

    #[test]
    #[serial]
    fn test_load_without_file_uses_defaults() {
        clear_overrides();

        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.server.port, 8000);
        assert!(config.anthropic.api_key.is_none());
        assert!(config.imagen.api_key.is_none());
    }

    #[test]
    #[serial]
    fn test_load_config_from_toml_file() {
        clear_overrides();

        let temp_file = write_config(
            ".toml",
            r#"
verify_ssl = false
error_mode = "legacy"

[server]
host = "127.0.0.1"
port = 8080

[anthropic]
api_base = "http://localhost:9000"

[imagen]
model = "imagen-3.0-generate-002"
forward_safety_settings = true
"#,
        );

        let config = AppConfig::load(temp_file.path().to_str()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert!(!config.verify_ssl);
        assert_eq!(config.error_mode, ErrorMode::Legacy);
        assert_eq!(config.anthropic.api_base, "http://localhost:9000");
        assert_eq!(config.anthropic.version, "2023-06-01");
        assert_eq!(config.imagen.model, "imagen-3.0-generate-002");
        assert!(config.imagen.forward_safety_settings);
    }

    #[test]
    #[serial]
    fn test_env_var_overrides() {
        clear_overrides();
        unsafe {
            std::env::set_var("PORT", "9999");
            std::env::set_var("VERIFY_SSL", "false");
            std::env::set_var("ERROR_MODE", "legacy");
            std::env::set_var("ANTHROPIC_API_KEY", "sk-ant-test");
            std::env::set_var("GOOGLE_GENAI_API_KEY", "google-test");
        }

        let temp_file = write_config(
            ".toml",
            r#"
[server]
port = 8080
"#,
        );

        let config = AppConfig::load(temp_file.path().to_str()).unwrap();

        assert_eq!(config.server.port, 9999);
        assert!(!config.verify_ssl);
        assert_eq!(config.error_mode, ErrorMode::Legacy);
        assert_eq!(config.anthropic.api_key.as_deref(), Some("sk-ant-test"));
        assert_eq!(config.imagen.api_key.as_deref(), Some("google-test"));

        clear_overrides();
    }

    #[test]
    #[serial]
    fn test_empty_env_var_is_ignored() {
        clear_overrides();
        unsafe {
            std::env::set_var("ANTHROPIC_API_KEY", "   ");
        }

        let config = AppConfig::load(None).unwrap();
        assert!(config.anthropic.api_key.is_none());

        clear_overrides();
    }

    #[test]
    #[serial]
    fn test_load_config_missing_file() {
        clear_overrides();
        let result = AppConfig::load(Some("nonexistent_file.toml"));
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_load_config_invalid_error_mode() {
        clear_overrides();
        unsafe {
            std::env::set_var("ERROR_MODE", "loud");
        }

        let result = AppConfig::load(None);
        assert!(result.is_err());

        clear_overrides();
    }

    #[test]
    #[serial]
    fn test_error_mode_is_case_insensitive() {
        for (raw, expected) in [
            ("Legacy", ErrorMode::Legacy),
            ("LEGACY", ErrorMode::Legacy),
            ("TYPED", ErrorMode::Typed),
            (" typed ", ErrorMode::Typed),
        ] {
            clear_overrides();
            unsafe {
                std::env::set_var("ERROR_MODE", raw);
            }

            let config = AppConfig::load(None).unwrap();
            assert_eq!(config.error_mode, expected, "ERROR_MODE={raw:?}");
        }

        clear_overrides();
    }

    #[test]
    fn test_error_mode_from_str() {
        assert_eq!("legacy".parse::<ErrorMode>(), Ok(ErrorMode::Legacy));
        assert!("loud".parse::<ErrorMode>().is_err());
    }

    #[test]
    fn test_api_keys_are_not_serialized() {
        let mut config = AppConfig::default();
        config.anthropic.api_key = Some("secret".to_string());
        config.imagen.api_key = Some("secret".to_string());

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
