// src/api/validate.rs
// Request body validation for the diagnostic endpoints

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::diagnostic::{DiagnosticRequest, DEFAULT_MAX_HOPS, DEFAULT_PING_COUNT};

pub const MAX_HOST_LEN: usize = 253;
pub const MAX_PING_COUNT: u32 = 10;
pub const MAX_TRACE_HOPS: u32 = 30;

static IPV4_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$")
        .expect("valid regex")
});

static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$")
        .expect("valid regex")
});

/// One rejected field, reported back to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validate a `/api/ping` body: `{ host, count? }`
pub fn ping_request(body: &Value) -> Result<DiagnosticRequest, FieldError> {
    let object = as_object(body)?;
    let host = host(object)?;
    let count = bounded(object, "count", MAX_PING_COUNT)?.unwrap_or(DEFAULT_PING_COUNT);
    reject_unknown(object, &["host", "count"])?;
    Ok(DiagnosticRequest::ping(host, Some(count)))
}

/// Validate a `/api/tracert` body: `{ host, maxHops? }`
pub fn traceroute_request(body: &Value) -> Result<DiagnosticRequest, FieldError> {
    let object = as_object(body)?;
    let host = host(object)?;
    let max_hops = bounded(object, "maxHops", MAX_TRACE_HOPS)?.unwrap_or(DEFAULT_MAX_HOPS);
    reject_unknown(object, &["host", "maxHops"])?;
    Ok(DiagnosticRequest::traceroute(host, Some(max_hops)))
}

/// Target must be a dotted-quad IPv4 address or a domain name
pub fn check_target(target: &str) -> Result<(), FieldError> {
    if target.is_empty() {
        return Err(FieldError::new("host", "\"host\" is not allowed to be empty"));
    }
    if target.len() > MAX_HOST_LEN {
        return Err(FieldError::new(
            "host",
            format!(
                "\"host\" length must be less than or equal to {} characters long",
                MAX_HOST_LEN
            ),
        ));
    }
    if !IPV4_RE.is_match(target) && !DOMAIN_RE.is_match(target) {
        return Err(FieldError::new(
            "host",
            "\"host\" must be a valid IP address or domain name",
        ));
    }
    Ok(())
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, FieldError> {
    body.as_object()
        .ok_or_else(|| FieldError::new("value", "\"value\" must be of type object"))
}

fn host(object: &Map<String, Value>) -> Result<String, FieldError> {
    match object.get("host") {
        None | Some(Value::Null) => Err(FieldError::new("host", "\"host\" is required")),
        Some(Value::String(host)) => {
            check_target(host)?;
            Ok(host.clone())
        }
        Some(_) => Err(FieldError::new("host", "\"host\" must be a string")),
    }
}

/// Optional integer in `1..=max`; numeric strings are accepted
fn bounded(object: &Map<String, Value>, field: &str, max: u32) -> Result<Option<u32>, FieldError> {
    let number = match object.get(field) {
        None => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    let number = number
        .filter(|n| n.is_finite())
        .ok_or_else(|| FieldError::new(field, format!("\"{}\" must be a number", field)))?;

    if number.fract() != 0.0 {
        return Err(FieldError::new(field, format!("\"{}\" must be an integer", field)));
    }
    if number < 1.0 {
        return Err(FieldError::new(
            field,
            format!("\"{}\" must be greater than or equal to 1", field),
        ));
    }
    if number > f64::from(max) {
        return Err(FieldError::new(
            field,
            format!("\"{}\" must be less than or equal to {}", field, max),
        ));
    }

    Ok(Some(number as u32))
}

fn reject_unknown(object: &Map<String, Value>, allowed: &[&str]) -> Result<(), FieldError> {
    match object.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(FieldError::new(key, format!("\"{}\" is not allowed", key))),
        None => Ok(()),
    }
}
