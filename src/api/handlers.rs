// src/api/handlers.rs
// HTTP handlers for health, info and the diagnostic streams

use std::convert::Infallible;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{
        sse::{Event, Sse},
        Json,
    },
};
use chrono::Utc;
use futures::stream::Stream;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::error::{ApiError, ApiResult};
use super::sse::stream_run;
use super::validate;
use super::AppState;
use crate::diagnostic::{DiagnosticRequest, DiagnosticRun, ProbeParams};

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "server": state.config.server_name,
        "timestamp": Utc::now(),
        "uptime": state.started_at.elapsed().as_secs_f64(),
    }))
}

pub async fn info(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "server": state.config.server_name,
        "version": env!("CARGO_PKG_VERSION"),
        "os": state.platform.as_str(),
        "platform": std::env::consts::OS,
        "timestamp": Utc::now(),
    }))
}

/// POST /api/ping
pub async fn ping(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let Json(body) = body.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Unreadable ping body");
        ApiError::from(rejection)
    })?;
    let request = validate::ping_request(&body).map_err(|e| {
        warn!(field = %e.field, error = %e, "Invalid ping input");
        ApiError::from(e)
    })?;
    Ok(start(&state, request))
}

/// POST /api/tracert
pub async fn tracert(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let Json(body) = body.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Unreadable tracert body");
        ApiError::from(rejection)
    })?;
    let request = validate::traceroute_request(&body).map_err(|e| {
        warn!(field = %e.field, error = %e, "Invalid tracert input");
        ApiError::from(e)
    })?;
    Ok(start(&state, request))
}

fn start(
    state: &AppState,
    request: DiagnosticRequest,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + use<>> {
    match request.params() {
        ProbeParams::Count(count) => {
            info!(host = %request.target(), count, server = %state.config.server_name, "Ping test started")
        }
        ProbeParams::MaxHops(max_hops) => {
            info!(host = %request.target(), max_hops, server = %state.config.server_name, "Traceroute started")
        }
    }

    let run = DiagnosticRun::new(request)
        .on_platform(state.platform)
        .with_origin(state.config.server_name.clone());
    stream_run(run, state.config.server_name.clone())
}

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::not_found()
}
