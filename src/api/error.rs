// src/api/error.rs
// Error responses for the HTTP API

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use super::validate::FieldError;

/// Standard API error response: `{ error, details?, retryAfter? }`
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status_code: StatusCode,
    pub details: Vec<FieldError>,
    pub retry_after: Option<String>,
}

impl ApiError {
    /// 401 with the given message
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: StatusCode::UNAUTHORIZED,
            details: Vec::new(),
            retry_after: None,
        }
    }

    /// 400 carrying the rejected fields
    pub fn invalid_input(details: Vec<FieldError>) -> Self {
        Self {
            message: "Invalid input".to_string(),
            status_code: StatusCode::BAD_REQUEST,
            details,
            retry_after: None,
        }
    }

    /// 400 for a body that is not a JSON object
    pub fn malformed_body(rejection: JsonRejection) -> Self {
        Self::invalid_input(vec![FieldError {
            field: "body".to_string(),
            message: rejection.body_text(),
        }])
    }

    /// 429 telling the client how long the window is
    pub fn too_many_requests(window: impl Into<String>) -> Self {
        Self {
            message: "Too many requests from this IP, please try again later.".to_string(),
            status_code: StatusCode::TOO_MANY_REQUESTS,
            details: Vec::new(),
            retry_after: Some(window.into()),
        }
    }

    pub fn not_found() -> Self {
        Self {
            message: "Not found".to_string(),
            status_code: StatusCode::NOT_FOUND,
            details: Vec::new(),
            retry_after: None,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::malformed_body(rejection)
    }
}

impl From<FieldError> for ApiError {
    fn from(err: FieldError) -> Self {
        Self::invalid_input(vec![err])
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.message });
        if !self.details.is_empty() {
            body["details"] = json!(self.details);
        }
        if let Some(retry_after) = self.retry_after {
            body["retryAfter"] = json!(retry_after);
        }
        (self.status_code, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
