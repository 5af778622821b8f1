use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Used when a request's credentials omit `clientId`.
    pub default_client_id: Option<String>,
    /// Used when a request's credentials omit `clientSecret`.
    pub default_client_secret: Option<String>,
    pub google_ads_base_url: String,
    pub google_ads_api_version: String,
    pub google_oauth_token_url: String,
    /// Upper bound for every call made to Google (token exchange, search, mutate).
    pub request_timeout_secs: u64,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            default_client_id: optional_var("GOOGLE_CLIENT_ID"),
            default_client_secret: optional_var("GOOGLE_CLIENT_SECRET"),
            google_ads_base_url: url_var(
                "GOOGLE_ADS_BASE_URL",
                "https://googleads.googleapis.com",
            )?,
            google_ads_api_version: optional_var("GOOGLE_ADS_API_VERSION")
                .unwrap_or_else(|| "v17".to_string()),
            google_oauth_token_url: url_var(
                "GOOGLE_OAUTH_TOKEN_URL",
                "https://oauth2.googleapis.com/token",
            )?,
            request_timeout_secs: std::env::var("ADS_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("ADS_REQUEST_TIMEOUT_SECS must be a whole number of seconds")
                })
                .and_then(|secs: u64| {
                    if secs == 0 {
                        anyhow::bail!("ADS_REQUEST_TIMEOUT_SECS must be greater than zero");
                    }
                    Ok(secs)
                })?,
            rate_limit_per_second: std::env::var("RATE_LIMIT_PER_SECOND")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("RATE_LIMIT_PER_SECOND must be a valid number"))?,
            rate_limit_burst: std::env::var("RATE_LIMIT_BURST")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("RATE_LIMIT_BURST must be a valid number"))?,
        };

        // Never log the default client secret itself
        tracing::debug!("Google Ads base URL: {}", config.google_ads_base_url);
        tracing::debug!("Google Ads API version: {}", config.google_ads_api_version);
        tracing::debug!(
            "Default OAuth client configured: {}",
            config.default_client_id.is_some() && config.default_client_secret.is_some()
        );
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

/// Reads a variable, treating unset and blank the same.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn url_var(name: &str, default: &str) -> anyhow::Result<String> {
    let url = optional_var(name).unwrap_or_else(|| default.to_string());
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(url.trim_end_matches('/').to_string())
}
