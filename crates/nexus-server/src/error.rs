//! API error handling.
//!
//! Maps the core error taxonomy onto HTTP responses. Every error body is a
//! JSON object with at least a human-readable `message` (or the upstream
//! passthrough shape for provider errors).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: serde_json::Value,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "message": msg.into() }),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: json!({ "message": msg.into() }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<nexus_core::Error> for ApiError {
    fn from(err: nexus_core::Error) -> Self {
        use nexus_core::Error;
        match err {
            Error::NotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                body: json!({ "message": err.to_string() }),
            },
            Error::BadRequest(msg) => Self::bad_request(msg),
            Error::Unavailable { ref url } => Self {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: json!({
                    "message": format!(
                        "could not connect to provider at {url}; is it running?"
                    )
                }),
            },
            // Upstream status and body pass through unchanged so the
            // provider's own diagnostics reach the caller.
            Error::Upstream { status, body } => Self {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                body: json!({ "error": "provider error", "details": body }),
            },
            Error::Internal { message, trace } => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: json!({
                    "message": "internal server error",
                    "detail": message,
                    "traceback": trace,
                }),
            },
            Error::LoadFailure(_) | Error::NotInstalled(_) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: json!({ "message": err.to_string() }),
            },
        }
    }
}
