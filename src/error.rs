//! Domain error taxonomy.
//!
//! Every fallible operation in this crate returns a [`DomainError`]. Unlike
//! the teacher's per-subsystem error enums (`VoiceError`, `AuthError`, ...)
//! this crate has a single flat taxonomy, because the whole crate is one
//! logical subsystem — there's no HTTP layer drawing a boundary between
//! auth errors and voice errors.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Structured domain error with a stable machine-readable code.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced resource (room, participant, track, call) does not exist.
    #[error("Resource not found: {message}")]
    ResourceNotFound {
        message: String,
        context: HashMap<String, Value>,
    },

    /// A resource that must be unique already exists.
    #[error("Resource already exists: {message}")]
    ResourceExists {
        message: String,
        context: HashMap<String, Value>,
    },

    /// The operation is not valid given the current state of a resource.
    #[error("Invalid state: {message}")]
    InvalidState {
        message: String,
        context: HashMap<String, Value>,
    },

    /// Input failed validation.
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        context: HashMap<String, Value>,
    },

    /// A rate limit was exceeded; `retry_after_ms` names the backoff.
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded {
        message: String,
        context: HashMap<String, Value>,
    },

    /// Authentication failed.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        message: String,
        context: HashMap<String, Value>,
    },

    /// Caller is authenticated but not authorized for the operation.
    #[error("Authorization failed: {message}")]
    AuthorizationFailed {
        message: String,
        context: HashMap<String, Value>,
    },

    /// A transport or carrier call did not complete in time.
    #[error("Timeout: {message}")]
    Timeout {
        message: String,
        context: HashMap<String, Value>,
    },

    /// A circuit breaker is open and is rejecting calls.
    #[error("Circuit breaker open: {message}")]
    CircuitBreakerOpen {
        message: String,
        context: HashMap<String, Value>,
    },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        context: HashMap<String, Value>,
    },

    /// A media-layer operation failed (reported by the transport collaborator).
    #[error("Media error: {message}")]
    Media {
        message: String,
        context: HashMap<String, Value>,
    },

    /// A network/carrier-layer operation failed.
    #[error("Network error: {message}")]
    Network {
        message: String,
        context: HashMap<String, Value>,
    },

    /// Catch-all for foreign errors wrapped via [`DomainError::wrap`].
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        context: HashMap<String, Value>,
    },
}

impl DomainError {
    /// Stable uppercase error code, suitable for logging and wire serialization.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ResourceNotFound { .. } => "RESOURCE_NOT_FOUND",
            Self::ResourceExists { .. } => "RESOURCE_EXISTS",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::Validation { .. } => "VALIDATION",
            Self::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            Self::AuthenticationFailed { .. } => "AUTHENTICATION_FAILED",
            Self::AuthorizationFailed { .. } => "AUTHORIZATION_FAILED",
            Self::Timeout { .. } => "TIMEOUT",
            Self::CircuitBreakerOpen { .. } => "CIRCUIT_BREAKER_OPEN",
            Self::Configuration { .. } => "CONFIGURATION",
            Self::Media { .. } => "MEDIA",
            Self::Network { .. } => "NETWORK",
            Self::Internal { .. } => "INTERNAL",
        }
    }

    /// The human-readable message, independent of variant.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::ResourceNotFound { message, .. }
            | Self::ResourceExists { message, .. }
            | Self::InvalidState { message, .. }
            | Self::Validation { message, .. }
            | Self::RateLimitExceeded { message, .. }
            | Self::AuthenticationFailed { message, .. }
            | Self::AuthorizationFailed { message, .. }
            | Self::Timeout { message, .. }
            | Self::CircuitBreakerOpen { message, .. }
            | Self::Configuration { message, .. }
            | Self::Media { message, .. }
            | Self::Network { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    /// The structured context map, independent of variant.
    #[must_use]
    pub fn context(&self) -> &HashMap<String, Value> {
        match self {
            Self::ResourceNotFound { context, .. }
            | Self::ResourceExists { context, .. }
            | Self::InvalidState { context, .. }
            | Self::Validation { context, .. }
            | Self::RateLimitExceeded { context, .. }
            | Self::AuthenticationFailed { context, .. }
            | Self::AuthorizationFailed { context, .. }
            | Self::Timeout { context, .. }
            | Self::CircuitBreakerOpen { context, .. }
            | Self::Configuration { context, .. }
            | Self::Media { context, .. }
            | Self::Network { context, .. }
            | Self::Internal { context, .. } => context,
        }
    }

    /// Attach a context entry, builder-style.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let map = match &mut self {
            Self::ResourceNotFound { context, .. }
            | Self::ResourceExists { context, .. }
            | Self::InvalidState { context, .. }
            | Self::Validation { context, .. }
            | Self::RateLimitExceeded { context, .. }
            | Self::AuthenticationFailed { context, .. }
            | Self::AuthorizationFailed { context, .. }
            | Self::Timeout { context, .. }
            | Self::CircuitBreakerOpen { context, .. }
            | Self::Configuration { context, .. }
            | Self::Media { context, .. }
            | Self::Network { context, .. }
            | Self::Internal { context, .. } => context,
        };
        map.insert(key.into(), value.into());
        self
    }

    /// Construct a [`DomainError::ResourceNotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            message: message.into(),
            context: HashMap::new(),
        }
    }

    /// Construct a [`DomainError::InvalidState`].
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
            context: HashMap::new(),
        }
    }

    /// Construct a [`DomainError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            context: HashMap::new(),
        }
    }

    /// Construct a [`DomainError::RateLimitExceeded`] carrying `retry_after_ms`.
    pub fn rate_limited(message: impl Into<String>, retry_after_ms: u64) -> Self {
        let mut context = HashMap::new();
        context.insert("retryAfterMs".to_string(), Value::from(retry_after_ms));
        Self::RateLimitExceeded {
            message: message.into(),
            context,
        }
    }

    /// Construct a [`DomainError::Timeout`].
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
            context: HashMap::new(),
        }
    }

    /// Construct a [`DomainError::Network`].
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            context: HashMap::new(),
        }
    }

    /// Wrap a foreign error as [`DomainError::Internal`], naming its kind in
    /// `context.originalErrorKind`. If `err` is already a `DomainError` it is
    /// returned unchanged (mirrors `toDomainError` in spec.md §7).
    pub fn wrap(err: impl fmt::Display, kind: &str) -> Self {
        let mut context = HashMap::new();
        context.insert("originalErrorKind".to_string(), Value::from(kind));
        Self::Internal {
            message: err.to_string(),
            context,
        }
    }

    /// Serializable view matching spec.md §7's `toJSON` shape.
    #[must_use]
    pub fn to_json(&self) -> DomainErrorJson {
        DomainErrorJson {
            name: "DomainError",
            code: self.code(),
            message: self.message().to_string(),
            context: if self.context().is_empty() {
                None
            } else {
                Some(self.context().clone())
            },
        }
    }
}

/// Wire shape of a [`DomainError`], matching spec.md §7's `toJSON` contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainErrorJson {
    pub name: &'static str,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<HashMap<String, Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_matches_variant() {
        assert_eq!(DomainError::not_found("room r1").code(), "RESOURCE_NOT_FOUND");
        assert_eq!(
            DomainError::rate_limited("too fast", 500).code(),
            "RATE_LIMIT_EXCEEDED"
        );
    }

    #[test]
    fn with_context_merges_into_existing_variant() {
        let err = DomainError::not_found("room r1").with_context("roomId", "r1");
        assert_eq!(err.context().get("roomId").unwrap(), "r1");
    }

    #[test]
    fn wrap_preserves_original_kind() {
        let err = DomainError::wrap(std::io::Error::other("boom"), "io::Error");
        assert_eq!(err.code(), "INTERNAL");
        assert_eq!(
            err.context().get("originalErrorKind").unwrap(),
            "io::Error"
        );
    }

    #[test]
    fn to_json_omits_empty_context() {
        let err = DomainError::validation("bad field");
        let json = err.to_json();
        assert!(json.context.is_none());
        assert_eq!(json.code, "VALIDATION");
    }

    #[test]
    fn rate_limited_carries_retry_after() {
        let err = DomainError::rate_limited("slow down", 1200);
        assert_eq!(err.context().get("retryAfterMs").unwrap(), 1200);
    }
}
