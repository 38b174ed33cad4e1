//! Error types for the todo-me client.
//!
//! # Design
//! Failures fall into three groups. `Service` carries an error envelope
//! returned by the API (`success: false`) with its `code`, `message` and
//! opaque `details` untouched. `Transport` and `DeserializationError`
//! cover the layers below the envelope: the request never completed, or
//! the body was not the JSON we expected. `InvalidRequest` is raised
//! before any network call when the caller asks for something the client
//! can reject locally.

use serde_json::Value;
use thiserror::Error;

/// Code used when an error envelope carries no `code`.
pub const UNKNOWN_ERROR_CODE: &str = "UNKNOWN_ERROR";

/// Message used when an error envelope carries no `message`.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Errors returned by `TodoMeClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with `success: false` (or without `success`).
    #[error("{code}: {message}")]
    Service {
        code: String,
        message: String,
        details: Option<Value>,
    },

    /// The HTTP round-trip failed: connection refused, timeout, I/O error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// Rejected locally, nothing was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The client could not be configured.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Machine-readable service code, if this error came from an envelope.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code().is_some_and(|code| code.ends_with("NOT_FOUND"))
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(
            self.code(),
            Some("UNAUTHORIZED" | "INVALID_CREDENTIALS" | "AUTHENTICATION_FAILED" | "INVALID_TOKEN")
        )
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;
