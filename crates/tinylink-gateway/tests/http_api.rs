use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tinylink_gateway::handlers::OWNER_HEADER;
use tinylink_gateway::middleware::REAL_IP_HEADER;
use tinylink_gateway::{App, AppState};
use tinylink_generator::SeqGenerator;
use tinylink_shortener::ShortenerService;
use tinylink_storage::InMemoryStore;
use tower::ServiceExt;

const BASE_URL: &str = "http://short.test";

fn test_state() -> AppState {
    let service = ShortenerService::new(InMemoryStore::new(), SeqGenerator::with_prefix("wh").unwrap());
    AppState::new(Arc::new(service), BASE_URL)
}

fn test_app() -> Router {
    App::router(test_state())
}

fn trusted_app(subnet: &str) -> Router {
    App::router(test_state().with_trusted_subnet(subnet.parse().unwrap()))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

fn post_text(uri: &str, body: &str, owner: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(owner) = owner {
        builder = builder.header(OWNER_HEADER, owner);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value, owner: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(owner) = owner {
        builder = builder.header(OWNER_HEADER, owner);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_from(uri: &str, real_ip: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(REAL_IP_HEADER, real_ip)
        .body(Body::empty())
        .unwrap()
}

fn get(uri: &str, owner: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(owner) = owner {
        builder = builder.header(OWNER_HEADER, owner);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn text_shorten_then_duplicate_conflicts() {
    let app = test_app();

    let (status, _, body) = send(&app, post_text("/", "https://example.com", Some("u1"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(String::from_utf8(body).unwrap(), "http://short.test/wh000000");

    let (status, _, body) = send(&app, post_text("/", "https://example.com", Some("u2"))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(String::from_utf8(body).unwrap(), "http://short.test/wh000000");
}

#[tokio::test]
async fn empty_text_body_is_rejected() {
    let app = test_app();

    let (status, _, _) = send(&app, post_text("/", "", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn json_shorten_returns_result() {
    let app = test_app();

    let (status, _, body) = send(
        &app,
        json_request("POST", "/api/shorten", json!({"url": "https://example.com"}), None),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["result"], "http://short.test/wh000000");
}

#[tokio::test]
async fn batch_shorten_returns_every_correlation_id() {
    let app = test_app();
    let payload = json!([
        {"correlation_id": "a", "original_url": "https://a.example"},
        {"correlation_id": "b", "original_url": "https://b.example"},
        {"correlation_id": "c", "original_url": ""},
    ]);

    let (status, _, body) = send(
        &app,
        json_request("POST", "/api/shorten/batch", payload, Some("u1")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let body: Vec<Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(body.len(), 3);
    let short_url = |id: &str| {
        body.iter()
            .find(|item| item["correlation_id"] == id)
            .map(|item| item["short_url"].as_str().unwrap().to_string())
            .unwrap()
    };
    assert!(short_url("a").starts_with("http://short.test/"));
    assert!(short_url("b").starts_with("http://short.test/"));
    assert_eq!(short_url("c"), "");
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let app = test_app();

    let (status, _, _) = send(
        &app,
        json_request("POST", "/api/shorten/batch", json!([]), Some("u1")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(
        &app,
        json_request("DELETE", "/api/user/urls", json!([]), Some("u1")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn redirect_then_gone_after_delete() {
    let app = test_app();
    send(&app, post_text("/", "https://example.com", Some("u1"))).await;

    let (status, headers, _) = send(&app, get("/wh000000", None)).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(headers[header::LOCATION], "https://example.com");

    let (status, _, _) = send(
        &app,
        json_request("DELETE", "/api/user/urls", json!(["wh000000"]), Some("u1")),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    awaitility::at_most(Duration::from_secs(5))
        .poll_interval(Duration::from_millis(10))
        .until_async(|| async {
            let (status, _, _) = send(&app, get("/wh000000", None)).await;
            status == StatusCode::GONE
        })
        .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bulk_delete_skips_malformed_codes() {
    let app = test_app();
    send(&app, post_text("/", "https://example.com", Some("u1"))).await;

    let (status, _, _) = send(
        &app,
        json_request(
            "DELETE",
            "/api/user/urls",
            json!(["../etc", "wh000000"]),
            Some("u1"),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    awaitility::at_most(Duration::from_secs(5))
        .poll_interval(Duration::from_millis(10))
        .until_async(|| async {
            let (status, _, _) = send(&app, get("/wh000000", None)).await;
            status == StatusCode::GONE
        })
        .await;

    let (status, _, _) = send(
        &app,
        json_request("DELETE", "/api/user/urls", json!(["nope"]), Some("u1")),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn unknown_code_is_not_found() {
    let app = test_app();

    let (status, _, _) = send(&app, get("/missing0", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&app, get("/not-a-valid-code", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_urls_requires_identity_and_lists_owned() {
    let app = test_app();

    let (status, _, _) = send(&app, get("/api/user/urls", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(&app, get("/api/user/urls", Some("u1"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    send(&app, post_text("/", "https://example.com", Some("u1"))).await;
    let (status, _, body) = send(&app, get("/api/user/urls", Some("u1"))).await;
    assert_eq!(status, StatusCode::OK);

    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        body,
        json!([{
            "short_url": "http://short.test/wh000000",
            "original_url": "https://example.com",
            "deleted": false
        }])
    );
}

#[tokio::test]
async fn ping_and_stats() {
    let app = trusted_app("10.0.0.0/8");

    let (status, _, body) = send(&app, get("/ping", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"pong");

    send(&app, post_text("/", "https://a.example", Some("u1"))).await;
    send(&app, post_text("/", "https://b.example", None)).await;

    let (status, _, body) = send(&app, get_from("/api/internal/stats", "10.1.2.3")).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"urls": 2, "users": 1}));
}

#[tokio::test]
async fn stats_rejects_untrusted_clients() {
    let app = trusted_app("10.0.0.0/8");

    let (status, _, _) = send(&app, get_from("/api/internal/stats", "192.168.1.7")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = send(&app, get("/api/internal/stats", None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = send(&app, get_from("/api/internal/stats", "not-an-ip")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn stats_is_closed_without_trusted_subnet() {
    let app = test_app();

    let (status, _, _) = send(&app, get_from("/api/internal/stats", "127.0.0.1")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The gate covers the internal endpoints only.
    let (status, _, _) = send(&app, get("/ping", None)).await;
    assert_eq!(status, StatusCode::OK);
}
