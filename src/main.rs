use std::net::SocketAddr;
use std::sync::Arc;

use ads_proxy::config::Config;
use ads_proxy::google_ads_client::GoogleAdsRestClient;
use ads_proxy::handlers::{self, AppState};
use axum::Router;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes tracing, loads configuration, builds the Google Ads client and
/// serves the proxy routes behind CORS, body-size and rate limits.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ads_proxy=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    let ads_client = GoogleAdsRestClient::new(&config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize Google Ads client: {}", e))?;
    tracing::info!(
        "✓ Google Ads client initialized ({}s timeout)",
        config.request_timeout_secs
    );

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Rate limit values must be greater than zero"))?,
    );

    let port = config.port;
    let app_state = Arc::new(AppState {
        config,
        ads_client: Arc::new(ads_client),
    });

    let protected_routes = handlers::proxy_routes().layer(
        ServiceBuilder::new()
            // Request size limit: 1MB max payload
            .layer(RequestBodyLimitLayer::new(1024 * 1024))
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    // Health check bypasses rate limiting
    let app = Router::new()
        .merge(handlers::public_routes())
        .merge(protected_routes)
        .with_state(app_state);
    let app = handlers::with_security_headers(app)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Ads proxy is live on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
