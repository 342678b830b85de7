// tests/api_test.rs
// Router-level tests: auth, validation, public endpoints, CORS

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use netprobe::api::{create_router, AppState};
use netprobe::config::ServerConfig;
use serde_json::{json, Value};
use tower::ServiceExt;

const API_KEY: &str = "test-key";

fn app() -> Router {
    let config = ServerConfig::from_lookup(|name| match name {
        "API_KEY" => Some(API_KEY.to_string()),
        "SERVER_NAME" => Some("Test Node".to_string()),
        "ALLOWED_ORIGINS" => Some("https://allowed.example".to_string()),
        _ => None,
    });
    create_router(AppState::new(config))
}

fn post_json(uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["server"], "Test Node");
    assert!(body["uptime"].is_number());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_info() {
    let response = app().oneshot(get("/api/info")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["server"], "Test Node");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["platform"], std::env::consts::OS);
}

#[tokio::test]
async fn test_missing_api_key() {
    let response = app()
        .oneshot(post_json("/api/ping", None, json!({"host": "example.com"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "Missing or invalid API key");
}

#[tokio::test]
async fn test_malformed_authorization_header() {
    let response = app()
        .oneshot(post_json("/api/ping", Some(API_KEY), json!({"host": "example.com"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "Missing or invalid API key");
}

#[tokio::test]
async fn test_wrong_api_key() {
    let response = app()
        .oneshot(post_json(
            "/api/tracert",
            Some("Bearer nope"),
            json!({"host": "example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "Invalid API key");
}

#[tokio::test]
async fn test_invalid_host_is_rejected() {
    let auth = format!("Bearer {}", API_KEY);
    let response = app()
        .oneshot(post_json(
            "/api/ping",
            Some(&auth),
            json!({"host": "example.com; reboot"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"], "Invalid input");
    assert_eq!(body["details"][0]["field"], "host");
}

#[tokio::test]
async fn test_max_hops_out_of_range() {
    let auth = format!("Bearer {}", API_KEY);
    let response = app()
        .oneshot(post_json(
            "/api/tracert",
            Some(&auth),
            json!({"host": "8.8.8.8", "maxHops": 31}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["details"][0]["field"], "maxHops");
    assert_eq!(
        body["details"][0]["message"],
        "\"maxHops\" must be less than or equal to 30"
    );
}

#[tokio::test]
async fn test_valid_request_opens_event_stream() {
    let auth = format!("Bearer {}", API_KEY);
    let response = app()
        .oneshot(post_json(
            "/api/ping",
            Some(&auth),
            json!({"host": "127.0.0.1", "count": 1}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    // Dropping the body cancels the run
}

#[tokio::test]
async fn test_unknown_route() {
    let response = app().oneshot(get("/api/nothing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Not found");
}

#[tokio::test]
async fn test_cors_preflight_for_allowed_origin() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/ping")
        .header(header::ORIGIN, "https://allowed.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
        .body(Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://allowed.example"
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
        "true"
    );
}

#[tokio::test]
async fn test_cors_ignores_unlisted_origin() {
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_api_routes_are_rate_limited_per_client() {
    let app = app();
    for _ in 0..100 {
        let response = app.clone().oneshot(get("/api/info")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["ratelimit-limit"], "100");
    }

    let response = app.clone().oneshot(get("/api/info")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(
        json_body(response).await,
        json!({
            "error": "Too many requests from this IP, please try again later.",
            "retryAfter": "15 minutes"
        })
    );

    // The key check sits behind the limiter
    let response = app
        .clone()
        .oneshot(post_json("/api/ping", None, json!({"host": "example.com"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_json_body_is_a_json_error() {
    let auth = format!("Bearer {}", API_KEY);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/ping")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, &auth)
        .body(Body::from("{\"host\": "))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );

    let body = json_body(response).await;
    assert_eq!(body["error"], "Invalid input");
    assert_eq!(body["details"][0]["field"], "body");
    assert!(!body["details"][0]["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_content_type_is_a_json_error() {
    let auth = format!("Bearer {}", API_KEY);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/tracert")
        .header(header::AUTHORIZATION, &auth)
        .body(Body::from("{\"host\": \"8.8.8.8\"}"))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["details"][0]["field"], "body");
}
