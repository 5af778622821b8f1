use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::Config;
use crate::dispatcher::{ActionDispatcher, ActionOutcome};
use crate::errors::AppError;
use crate::google_ads_client::AdsPlatform;
use crate::google_ads_models::ProxyRequest;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Google Ads client; tests swap in a fake.
    pub ads_client: Arc<dyn AdsPlatform>,
}

/// Platforms the proxy can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Google,
}

impl Platform {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "google" => Some(Self::Google),
            _ => None,
        }
    }
}

/// `GET /` banner.
pub async fn root() -> &'static str {
    "Ads proxy is running with live Google Ads support"
}

/// Health check endpoint. Always 200.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "online",
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        })),
    )
}

/// POST /api/proxy/:platform/:action
///
/// Validates the platform before looking at the body, so an unsupported
/// platform is a 404 even when the body is garbage.
pub async fn proxy(
    State(state): State<Arc<AppState>>,
    Path((platform, action)): Path<(String, String)>,
    payload: Result<Json<ProxyRequest>, JsonRejection>,
) -> Result<Json<ActionOutcome>, AppError> {
    tracing::info!(">>> Incoming proxy request: {}/{}", platform, action);

    match Platform::parse(&platform) {
        Some(Platform::Google) => {}
        None => {
            return Err(AppError::NotFound(format!(
                "Platform {} is not supported.",
                platform
            )))
        }
    }

    let Json(request) = payload.map_err(|rejection| {
        AppError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    let dispatcher = ActionDispatcher::new(state.ads_client.as_ref(), &state.config);
    let outcome = dispatcher.dispatch(&action, &request).await;

    if let Err(e) = &outcome {
        tracing::warn!("!!! [Proxy Error] {}/{}: {}", platform, action, e);
    }
    outcome.map(Json)
}

/// Routes that must never be rate limited.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
}

pub fn proxy_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/proxy/:platform/:action", post(proxy))
}

/// Browser hardening headers sent on every response (no CSP, the API only
/// serves JSON and plain text). Handlers may override any of them.
pub fn with_security_headers(router: Router) -> Router {
    let headers = [
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
        (header::REFERRER_POLICY, "no-referrer"),
        (header::X_DNS_PREFETCH_CONTROL, "off"),
        (header::X_XSS_PROTECTION, "0"),
        (
            header::STRICT_TRANSPORT_SECURITY,
            "max-age=15552000; includeSubDomains",
        ),
        (
            HeaderName::from_static("cross-origin-opener-policy"),
            "same-origin",
        ),
        (
            HeaderName::from_static("cross-origin-resource-policy"),
            "same-origin",
        ),
        (HeaderName::from_static("origin-agent-cluster"), "?1"),
        (HeaderName::from_static("x-download-options"), "noopen"),
        (
            HeaderName::from_static("x-permitted-cross-domain-policies"),
            "none",
        ),
    ];

    headers.into_iter().fold(router, |router, (name, value)| {
        router.layer(SetResponseHeaderLayer::if_not_present(
            name,
            HeaderValue::from_static(value),
        ))
    })
}

/// Full application without transport-level layers.
pub fn app(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .merge(public_routes())
        .merge(proxy_routes())
        .with_state(state);
    with_security_headers(router)
}
