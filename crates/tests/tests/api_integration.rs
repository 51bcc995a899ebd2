use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use publicsphere_agents::LatencyProfile;
use publicsphere_api::{build_app, ApiConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

const API_KEY: &str = "dev-portal-key";

fn test_config() -> ApiConfig {
    ApiConfig {
        latency: LatencyProfile::instant(),
        ..ApiConfig::default()
    }
}

async fn app() -> Router {
    build_app(&test_config()).await.expect("app should build")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let response = app()
        .await
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("x-content-type-options")
            .and_then(|value| value.to_str().ok()),
        Some("nosniff")
    );
    let parsed = read_json(response).await;
    assert_eq!(parsed["storage"], "memory");
}

#[tokio::test]
async fn scenarios_list_starts_with_home() {
    let response = app()
        .await
        .oneshot(
            Request::builder()
                .uri("/v1/scenarios")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = read_json(response).await;
    let ids = parsed["scenarios"]
        .as_array()
        .unwrap()
        .iter()
        .map(|scenario| scenario["id"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["home", "tax", "vehicle", "benefits", "housing"]);
}

#[tokio::test]
async fn chat_requires_api_key() {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/chat")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "text": "vehicle registration" }).to_string()))
        .unwrap();

    let response = app().await.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(response).await["error"], "unauthorized");
}

#[tokio::test]
async fn allowed_origin_stands_in_for_api_key() {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/chat")
        .header("content-type", "application/json")
        .header("origin", "http://localhost:5173")
        .body(Body::from(json!({ "text": "hello there" }).to_string()))
        .unwrap();

    let response = app().await.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["route"]["kind"], "greeting");
}

#[tokio::test]
async fn chat_returns_category_payload_and_html() {
    let response = app()
        .await
        .oneshot(post_json(
            "/v1/chat",
            json!({ "text": "How do I renew my Vehicle registration?", "scenario": "home" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = read_json(response).await;
    assert_eq!(parsed["route"]["kind"], "category");
    assert_eq!(parsed["route"]["target"], "vehicle");
    assert_eq!(parsed["scenario"], "home");
    assert!(parsed["user_id"].as_str().unwrap().starts_with("anon-"));
    assert!(!parsed["payload"]["cards"].as_array().unwrap().is_empty());
    assert!(parsed["html"].as_str().is_some());
}

#[tokio::test]
async fn scenario_fallback_applies_to_unmatched_queries() {
    let response = app()
        .await
        .oneshot(post_json(
            "/v1/chat",
            json!({ "text": "what are the office hours", "scenario": "housing" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = read_json(response).await;
    assert_eq!(parsed["route"]["kind"], "scenario_fallback");
    assert_eq!(parsed["route"]["target"], "housing");
}

#[tokio::test]
async fn blank_and_oversized_messages_are_rejected() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(post_json("/v1/chat", json!({ "text": "   " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "empty_message");

    let response = app
        .oneshot(post_json("/v1/chat", json!({ "text": "x".repeat(2_001) })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["error"], "message_too_long");
}

#[tokio::test]
async fn session_is_seeded_then_transcript_grows_with_chat() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/session",
            json!({ "user_id": "citizen-7", "session_id": "s-1", "scenario": "Tax" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session = read_json(response).await;
    assert_eq!(session["scenario"], "tax");
    assert_eq!(session["messages"].as_array().unwrap().len(), 1);
    assert_eq!(
        session["messages"][0]["content"],
        "Welcome to the Tax Office assistant."
    );

    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/chat",
            json!({
                "user_id": "citizen-7",
                "session_id": "s-1",
                "scenario": "tax",
                "text": "Payment Schedule"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["route"]["kind"], "exact_topic");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/transcript?user_id=citizen-7&session_id=s-1&scenario=tax")
                .header("x-api-key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let transcript = read_json(response).await;
    let roles = transcript["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|message| message["role"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(roles, vec!["assistant", "user", "assistant"]);
}

#[tokio::test]
async fn render_returns_segments_and_escaped_html() {
    let response = app()
        .await
        .oneshot(post_json(
            "/v1/render",
            json!({ "text": "See [forms](https://example.gov/forms) **now** <b>" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = read_json(response).await;
    let kinds = parsed["segments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|segment| segment["kind"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(kinds, vec!["text", "link", "text", "emphasis", "text"]);
    let html = parsed["html"].as_str().unwrap();
    assert!(html.contains("<strong>now</strong>"));
    assert!(html.contains("&lt;b&gt;"));
    assert_eq!(
        parsed["plain"],
        "See forms (https://example.gov/forms) now <b>"
    );
}

#[tokio::test]
async fn rate_limit_returns_retry_after() {
    let config = ApiConfig {
        rate_limit_max: 2,
        rate_limit_window: Duration::from_secs(60),
        ..test_config()
    };
    let app = build_app(&config).await.expect("app should build");

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post_json("/v1/render", json!({ "text": "ok" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(post_json("/v1/render", json!({ "text": "ok" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get("retry-after").is_some());
    assert_eq!(read_json(response).await["error"], "rate_limited");
}
