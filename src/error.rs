//! Chat error types with HTTP status code mapping.
//!
//! [`ChatError`] is the central error type for the crate. Errors that
//! belong to a single session (codec, transport) end that session and
//! never reach HTTP; the rest map to a status code and structured JSON
//! error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1101,
///     "message": "unauthorized: missing auth cookie",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Crate-wide error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category          | HTTP Status                 |
/// |-----------|-------------------|-----------------------------|
/// | 1000–1999 | Client / Auth     | 400 Bad Request / 401       |
/// | 2000–2999 | Session transport | 400 Bad Request             |
/// | 3000–3999 | Server            | 500 / 503                   |
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The request carries no usable identity.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// No avatar strategy could produce a URL for the user.
    #[error("unable to get an avatar URL")]
    NoAvatarUrl,

    /// A frame could not be decoded into, or encoded from, a message.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The connection failed while reading or writing.
    #[error("transport error: {0}")]
    Transport(String),

    /// The hub control loop has stopped.
    #[error("room hub is closed")]
    HubClosed,

    /// A configuration value is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ChatError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Unauthorized(_) => 1101,
            Self::NoAvatarUrl => 1201,
            Self::Codec(_) => 2001,
            Self::Transport(_) => 2002,
            Self::HubClosed => 3002,
            Self::InvalidConfig(_) => 3003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NoAvatarUrl | Self::Codec(_) | Self::Transport(_) => StatusCode::BAD_REQUEST,
            Self::HubClosed => StatusCode::SERVICE_UNAVAILABLE,
            Self::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
