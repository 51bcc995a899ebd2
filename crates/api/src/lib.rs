mod throttle;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Json, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{body::Body, Router};
use publicsphere_agents::{CitizenAssistant, LatencyProfile};
use publicsphere_core::{
    parse_markup, render_html, render_plain, scenario_catalog, ChatInput, ChatReply,
    MessageRecord, ScenarioId, ScenarioInfo, Segment,
};
use publicsphere_observability::AppMetrics;
use publicsphere_storage::Store;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub use crate::throttle::{RequestThrottle, ThrottleDecision};

const MAX_MESSAGE_LEN: usize = 2_000;
const MAX_RENDER_LEN: usize = 16_000;
const MAX_BODY_BYTES: usize = 64 * 1024;
const DEFAULT_API_KEY: &str = "dev-portal-key";
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind: String,
    pub database_url: Option<String>,
    pub api_key: String,
    pub allowed_origins: Vec<String>,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
    pub latency: LatencyProfile,
    pub transcript_retention: chrono::Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            database_url: None,
            api_key: DEFAULT_API_KEY.to_string(),
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 120,
            latency: LatencyProfile::default(),
            transcript_retention: chrono::Duration::hours(24 * 30),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let latency_min = env_parse("PORTAL_LATENCY_MIN_MS").unwrap_or(400);
        let latency_max = env_parse("PORTAL_LATENCY_MAX_MS").unwrap_or(800);

        Self {
            bind: env::var("PORTAL_BIND").unwrap_or(defaults.bind),
            database_url: env::var("PORTAL_DATABASE_URL")
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            api_key: env::var("PORTAL_API_KEY").unwrap_or(defaults.api_key),
            allowed_origins: parse_allowed_origins(env::var("PORTAL_ALLOWED_ORIGINS").ok())
                .unwrap_or(defaults.allowed_origins),
            rate_limit_window: Duration::from_secs(
                env_parse("PORTAL_RATE_LIMIT_WINDOW_SECONDS").unwrap_or(60),
            ),
            rate_limit_max: env_parse("PORTAL_RATE_LIMIT_MAX").unwrap_or(defaults.rate_limit_max),
            latency: LatencyProfile::from_millis(latency_min, latency_max),
            transcript_retention: retention_from_hours(env_parse(
                "PORTAL_TRANSCRIPT_RETENTION_HOURS",
            ))
            .unwrap_or(defaults.transcript_retention),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.trim().parse().ok())
}

/// Positive hour counts that fit a `TimeDelta`; anything else is rejected.
fn retention_from_hours(hours: Option<i64>) -> Option<chrono::TimeDelta> {
    hours
        .filter(|hours| *hours > 0)
        .and_then(chrono::TimeDelta::try_hours)
}

fn parse_allowed_origins(raw: Option<String>) -> Option<Vec<String>> {
    let origins = raw?
        .split(',')
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>();
    (!origins.is_empty()).then_some(origins)
}

#[derive(Clone)]
pub struct ApiState {
    pub assistant: Arc<CitizenAssistant<Store>>,
    pub metrics: Arc<AppMetrics>,
    pub api_key: String,
    pub throttle: RequestThrottle,
    pub allowed_origins: Arc<Vec<String>>,
    pub storage_backend: &'static str,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    storage: &'static str,
    metrics: publicsphere_observability::MetricsSnapshot,
}

#[derive(Debug, Serialize)]
struct ScenariosResponse {
    scenarios: Vec<ScenarioInfo>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatRequest {
    user_id: Option<String>,
    session_id: Option<String>,
    scenario: Option<String>,
    text: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    #[serde(flatten)]
    reply: ChatReply,
    html: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SessionRequest {
    user_id: Option<String>,
    session_id: Option<String>,
    scenario: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TranscriptQuery {
    user_id: String,
    session_id: String,
    scenario: Option<String>,
}

#[derive(Debug, Serialize)]
struct TranscriptResponse {
    messages: Vec<MessageRecord>,
}

#[derive(Debug, Clone, Deserialize)]
struct RenderRequest {
    text: String,
}

#[derive(Debug, Serialize)]
struct RenderResponse {
    segments: Vec<Segment>,
    html: String,
    plain: String,
}

pub async fn build_state(config: &ApiConfig) -> Result<ApiState> {
    let metrics = AppMetrics::shared();

    let store = match config.database_url.as_deref() {
        Some(database_url) => Store::sqlite(database_url)
            .await
            .context("failed to open transcript store")?,
        None => Store::memory(),
    };
    let storage_backend = store.backend_name();

    let assistant = Arc::new(CitizenAssistant::new(
        Arc::new(store),
        metrics.clone(),
        config.latency,
    ));

    Ok(ApiState {
        assistant,
        metrics,
        api_key: config.api_key.clone(),
        throttle: RequestThrottle::new(config.rate_limit_window, config.rate_limit_max),
        allowed_origins: Arc::new(config.allowed_origins.clone()),
        storage_backend,
    })
}

pub async fn build_app(config: &ApiConfig) -> Result<Router> {
    Ok(build_router(build_state(config).await?))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/scenarios", get(scenarios))
        .route("/v1/session", post(session_open))
        .route("/v1/chat", post(chat))
        .route("/v1/transcript", get(transcript))
        .route("/v1/render", post(render))
        .layer(build_cors_layer(&state.allowed_origins))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        storage: state.storage_backend,
        metrics: state.metrics.snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

async fn scenarios() -> impl IntoResponse {
    let mut scenarios = vec![ScenarioId::Home.info()];
    scenarios.extend(scenario_catalog());
    (StatusCode::OK, Json(ScenariosResponse { scenarios }))
}

async fn session_open(
    State(state): State<ApiState>,
    Json(request): Json<SessionRequest>,
) -> Response {
    match state
        .assistant
        .open_session(
            request.user_id,
            request.session_id,
            request.scenario.as_deref(),
        )
        .await
    {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => {
            error!(error = %format!("{err:#}"), "session open failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "session_failed",
                &err.to_string(),
            )
        }
    }
}

async fn chat(State(state): State<ApiState>, Json(request): Json<ChatRequest>) -> Response {
    // Blank input never reaches the responder; the widget only sends text.
    if request.text.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "empty_message",
            "message text must not be empty",
        );
    }
    if request.text.chars().count() > MAX_MESSAGE_LEN {
        return error_response(
            StatusCode::BAD_REQUEST,
            "message_too_long",
            &format!("message text must be at most {MAX_MESSAGE_LEN} characters"),
        );
    }

    let input = ChatInput {
        user_id: request.user_id,
        session_id: request.session_id,
        scenario: request.scenario,
        text: request.text,
    };

    match state.assistant.handle_chat(input).await {
        Ok(reply) => {
            let html = render_html(&reply.payload.text);
            (StatusCode::OK, Json(ChatResponse { reply, html })).into_response()
        }
        Err(err) => {
            error!(error = %format!("{err:#}"), "chat failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "chat_failed",
                &err.to_string(),
            )
        }
    }
}

async fn transcript(
    State(state): State<ApiState>,
    Query(query): Query<TranscriptQuery>,
) -> Response {
    let scenario = query.scenario.as_deref().unwrap_or("home");
    match state
        .assistant
        .transcript(&query.user_id, &query.session_id, scenario)
        .await
    {
        Ok(messages) => (StatusCode::OK, Json(TranscriptResponse { messages })).into_response(),
        Err(err) => {
            error!(error = %format!("{err:#}"), "transcript load failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "transcript_failed",
                &err.to_string(),
            )
        }
    }
}

async fn render(Json(request): Json<RenderRequest>) -> Response {
    if request.text.chars().count() > MAX_RENDER_LEN {
        return error_response(
            StatusCode::BAD_REQUEST,
            "text_too_long",
            &format!("text must be at most {MAX_RENDER_LEN} characters"),
        );
    }

    let payload = RenderResponse {
        segments: parse_markup(&request.text),
        html: render_html(&request.text),
        plain: render_plain(&request.text),
    };
    (StatusCode::OK, Json(payload)).into_response()
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": code,
            "message": message
        })),
    )
        .into_response()
}

fn is_public_endpoint(path: &str) -> bool {
    matches!(path, "/health" | "/v1/scenarios")
}

async fn api_key_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if header_key == state.api_key {
        return next.run(request).await;
    }

    // The widget runs in the browser and cannot hold a key; allowed origins
    // are accepted in its place.
    if request_origin_is_allowed(&state, request.headers()) {
        return next.run(request).await;
    }

    error_response(
        StatusCode::UNAUTHORIZED,
        "unauthorized",
        "missing or invalid x-api-key, and request origin is not allowed",
    )
}

fn request_origin_is_allowed(state: &ApiState, headers: &HeaderMap) -> bool {
    request_origin_from_headers(headers)
        .map(|origin| state.allowed_origins.iter().any(|value| value == &origin))
        .unwrap_or(false)
}

fn request_origin_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
}

fn build_cors_layer(allowed_origins: &Arc<Vec<String>>) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let origins = if origins.is_empty() {
        vec![HeaderValue::from_static(DEFAULT_ALLOWED_ORIGIN)]
    } else {
        origins
    };

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-api-key"),
        ])
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let ip = request_ip(&request);
    match state.throttle.check(&ip) {
        ThrottleDecision::Allowed => next.run(request).await,
        ThrottleDecision::Limited { retry_after } => {
            info!(client = %ip, "request throttled");
            let mut response = error_response(
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "rate limit exceeded for this client",
            );
            let seconds = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
    }
}

fn request_ip(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .split(',')
                .next()
                .unwrap_or("unknown")
                .trim()
                .to_string()
        })
        .unwrap_or_else(|| "local".to_string())
}

async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'; base-uri 'none'"),
    );

    response
}
