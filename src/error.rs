use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::Endpoint;

/// Fallback body when even the error envelope cannot be serialized.
pub const ENCODE_FAILURE_BODY: &[u8] = b"{\"error\":true,\"message\":\"could not encode JSON\"}";

#[derive(Debug, Error)]
pub enum JsondsError {
    #[error("json decode failure: {0}")]
    Decode(String),

    #[error("bad method {0}; supported POST")]
    MethodNotAllowed(String),

    #[error("unhandled endpoint: {0}")]
    Unhandled(Endpoint),

    #[error("{0}")]
    Handler(String),

    #[error("could not encode JSON")]
    Encode(String),

    #[error("could not handle request")]
    InvalidResponse,

    #[error("number of row elements ({got}) does not match the number of table columns ({expected})")]
    RowSize { expected: usize, got: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl JsondsError {
    /// Wraps a domain failure raised by a backend handler.
    pub fn handler(message: impl Into<String>) -> Self {
        JsondsError::Handler(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            JsondsError::Decode(_) | JsondsError::MethodNotAllowed(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Renders the pretty-printed `{"error": true, "message": ...}` body.
    pub fn envelope(&self) -> Vec<u8> {
        ErrorEnvelope::new(self.to_string()).to_bytes()
    }
}

impl From<toml::de::Error> for JsondsError {
    fn from(err: toml::de::Error) -> Self {
        JsondsError::Config(err.to_string())
    }
}

impl From<std::io::Error> for JsondsError {
    fn from(err: std::io::Error) -> Self {
        JsondsError::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: bool,
    pub message: String,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec_pretty(self).unwrap_or_else(|_| ENCODE_FAILURE_BODY.to_vec())
    }
}

impl IntoResponse for JsondsError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            self.envelope(),
        )
            .into_response()
    }
}

pub type Result<T> = std::result::Result<T, JsondsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            JsondsError::Decode("eof".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            JsondsError::MethodNotAllowed("GET".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            JsondsError::Unhandled(Endpoint::Query).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            JsondsError::handler("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_envelope_carries_message() {
        let body = JsondsError::handler("backend down").envelope();
        let envelope: ErrorEnvelope = serde_json::from_slice(&body).unwrap();
        assert!(envelope.error);
        assert_eq!(envelope.message, "backend down");
    }

    #[test]
    fn test_into_response_uses_status() {
        let response = JsondsError::Decode("eof".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }

    #[test]
    fn test_unhandled_names_endpoint() {
        let err = JsondsError::Unhandled(Endpoint::TagValues);
        assert_eq!(err.to_string(), "unhandled endpoint: tag-values");
    }
}
