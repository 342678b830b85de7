// src/api/auth.rs
// Bearer API key check for the diagnostic routes

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::error::ApiError;
use super::AppState;

pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    let Some(token) = token else {
        warn!(path = %request.uri().path(), "Missing API key");
        return Err(ApiError::unauthorized("Missing or invalid API key"));
    };

    if token != state.config.api_key {
        warn!(path = %request.uri().path(), "Invalid API key");
        return Err(ApiError::unauthorized("Invalid API key"));
    }

    Ok(next.run(request).await)
}
