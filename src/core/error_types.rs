//! Shared constants for structured API errors.

use std::fmt;

pub const ERROR_TYPE_VALIDATION: &str = "validation_error";
pub const ERROR_TYPE_INVALID_REQUEST: &str = "invalid_request_error";
pub const ERROR_TYPE_UPSTREAM: &str = "upstream_error";
pub const ERROR_TYPE_TIMEOUT: &str = "timeout_error";
pub const ERROR_TYPE_CONFIGURATION: &str = "configuration_error";
pub const ERROR_TYPE_INTERNAL: &str = "internal_error";

/// Message returned by the image relay in legacy error mode.
pub const LEGACY_IMAGE_FAILURE_MESSAGE: &str = "No image was generated";

pub const PROVIDER_ERROR_KIND_STATUS: &str = "status";
pub const PROVIDER_ERROR_KIND_TIMEOUT: &str = "timeout";
pub const PROVIDER_ERROR_KIND_TRANSPORT: &str = "transport";
pub const PROVIDER_ERROR_KIND_PAYLOAD: &str = "payload";

/// Label used for `relay_provider_errors_total{kind}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Provider answered with a non-2xx status
    Status,
    /// Outbound call timed out
    Timeout,
    /// Connection or transport failure
    Transport,
    /// Provider answered 2xx but the body was unusable
    Payload,
}

impl ProviderErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Status => PROVIDER_ERROR_KIND_STATUS,
            Self::Timeout => PROVIDER_ERROR_KIND_TIMEOUT,
            Self::Transport => PROVIDER_ERROR_KIND_TRANSPORT,
            Self::Payload => PROVIDER_ERROR_KIND_PAYLOAD,
        }
    }

    /// Classify a reqwest failure that happened before a response arrived.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Payload
        } else {
            Self::Transport
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
