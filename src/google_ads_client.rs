use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::Config;
use crate::error_normalizer::{AdsFailure, ApiErrorDetail, ErrorCode};
use crate::errors::AppError;
use crate::google_ads_models::{AccountContext, CampaignStatus, SearchRow};

/// The operations this service needs from Google Ads.
///
/// Implementations own token refresh, transport and retries; callers only see
/// rows or an [`AdsFailure`].
#[async_trait]
pub trait AdsPlatform: Send + Sync {
    /// Runs a GAQL query against the account.
    async fn search(
        &self,
        account: &AccountContext,
        query: &str,
    ) -> Result<Vec<SearchRow>, AdsFailure>;

    /// Sets the status of the campaign identified by `resource_name`.
    async fn update_campaign_status(
        &self,
        account: &AccountContext,
        resource_name: &str,
        status: CampaignStatus,
    ) -> Result<(), AdsFailure>;
}

/// Google Ads REST client.
#[derive(Clone)]
pub struct GoogleAdsRestClient {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
    token_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchRow>,
}

impl GoogleAdsRestClient {
    /// Creates a new `GoogleAdsRestClient`.
    ///
    /// Every request, including the token exchange, is bounded by
    /// `request_timeout_secs`.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create Google Ads client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.google_ads_base_url.clone(),
            api_version: config.google_ads_api_version.clone(),
            token_url: config.google_oauth_token_url.clone(),
        })
    }

    /// Exchanges the refresh token for a short-lived access token.
    async fn access_token(&self, account: &AccountContext) -> Result<String, AdsFailure> {
        let creds = &account.credentials;
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("refresh_token", creds.refresh_token.as_str()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AdsFailure::transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failure_from_response(response).await);
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            AdsFailure::with_message(format!("Failed to parse OAuth token response: {}", e))
        })?;
        Ok(token.access_token)
    }

    fn headers(&self, account: &AccountContext, access_token: &str) -> Result<HeaderMap, AdsFailure> {
        let invalid = |name: &str| AdsFailure::with_message(format!("Invalid characters in {}", name));

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", access_token))
                .map_err(|_| invalid("access token"))?,
        );
        headers.insert(
            "developer-token",
            HeaderValue::from_str(&account.credentials.developer_token)
                .map_err(|_| invalid("developer token"))?,
        );
        if let Some(login_customer_id) = &account.login_customer_id {
            headers.insert(
                "login-customer-id",
                HeaderValue::from_str(login_customer_id)
                    .map_err(|_| invalid("login customer id"))?,
            );
        }
        Ok(headers)
    }

    fn customer_url(&self, account: &AccountContext, method: &str) -> String {
        format!(
            "{}/{}/customers/{}/{}",
            self.base_url, self.api_version, account.customer_id, method
        )
    }

    async fn post(
        &self,
        account: &AccountContext,
        method: &str,
        body: &Value,
    ) -> Result<reqwest::Response, AdsFailure> {
        let access_token = self.access_token(account).await?;
        let url = self.customer_url(account, method);
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .headers(self.headers(account, &access_token)?)
            .json(body)
            .send()
            .await
            .map_err(|e| AdsFailure::transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failure_from_response(response).await);
        }
        Ok(response)
    }
}

#[async_trait]
impl AdsPlatform for GoogleAdsRestClient {
    async fn search(
        &self,
        account: &AccountContext,
        query: &str,
    ) -> Result<Vec<SearchRow>, AdsFailure> {
        let response = self
            .post(account, "googleAds:search", &json!({ "query": query }))
            .await?;

        let parsed: SearchResponse = response.json().await.map_err(|e| {
            AdsFailure::with_message(format!("Failed to parse Google Ads search response: {}", e))
        })?;

        tracing::info!(
            "Google Ads search returned {} rows for customer {}",
            parsed.results.len(),
            account.customer_id
        );
        Ok(parsed.results)
    }

    async fn update_campaign_status(
        &self,
        account: &AccountContext,
        resource_name: &str,
        status: CampaignStatus,
    ) -> Result<(), AdsFailure> {
        let body = json!({
            "operations": [{
                "update": {
                    "resourceName": resource_name,
                    "status": status.as_platform_state(),
                },
                "updateMask": "status",
            }]
        });

        self.post(account, "campaigns:mutate", &body).await?;

        tracing::info!(
            "✓ {} set to {}",
            resource_name,
            status.as_platform_state()
        );
        Ok(())
    }
}

async fn failure_from_response(response: reqwest::Response) -> AdsFailure {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    parse_failure(status, &text)
}

/// Builds an [`AdsFailure`] from a non-success response.
///
/// Google Ads API errors look like
/// `{"error": {"code", "message", "status", "details": [{"errors": [...]}]}}`;
/// OAuth errors look like `{"error": "invalid_grant", "error_description": ...}`.
pub fn parse_failure(status: u16, text: &str) -> AdsFailure {
    let body: Value = match serde_json::from_str(text) {
        Ok(body) => body,
        Err(_) => {
            return AdsFailure {
                status_code: Some(status),
                message: Some(format!("Google returned {}: {}", status, text.trim())),
                ..Default::default()
            }
        }
    };

    let errors: Vec<ApiErrorDetail> = body
        .get("error")
        .and_then(|e| e.get("details"))
        .and_then(Value::as_array)
        .map(|details| {
            details
                .iter()
                .filter_map(|d| d.get("errors").and_then(Value::as_array))
                .flatten()
                .map(parse_api_error)
                .collect()
        })
        .unwrap_or_default();

    let message = body
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| Some(format!("Google returned status {}", status)));

    let mut extra = serde_json::Map::new();
    if let Some(platform_status) = body
        .get("error")
        .and_then(|e| e.get("status"))
        .and_then(Value::as_str)
    {
        extra.insert("status".to_string(), json!(platform_status));
    }

    AdsFailure {
        errors,
        status_code: Some(status),
        response_body: Some(body),
        details: None,
        message,
        extra,
    }
}

fn parse_api_error(error: &Value) -> ApiErrorDetail {
    let code = error
        .get("errorCode")
        .and_then(Value::as_object)
        .and_then(|codes| codes.iter().next())
        .map(|(family, value)| ErrorCode {
            family: family.clone(),
            value: scalar_text(value),
        });

    // `trigger` is a oneof value: {"stringValue": ...}, {"int64Value": ...}, ...
    let trigger = error.get("trigger").map(|t| match t {
        Value::Object(fields) => fields.values().next().map(scalar_text).unwrap_or_default(),
        other => scalar_text(other),
    });

    ApiErrorDetail {
        message: error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        code,
        trigger,
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_google_ads_failure() {
        let body = r#"{
            "error": {
                "code": 400,
                "message": "Request contains an invalid argument.",
                "status": "INVALID_ARGUMENT",
                "details": [{
                    "@type": "type.googleapis.com/google.ads.googleads.v17.errors.GoogleAdsFailure",
                    "errors": [{
                        "errorCode": { "queryError": "UNRECOGNIZED_FIELD" },
                        "message": "Unrecognized field in the query: 'campaign.foo'.",
                        "trigger": { "stringValue": "campaign.foo" }
                    }],
                    "requestId": "abc"
                }]
            }
        }"#;

        let failure = parse_failure(400, body);
        assert_eq!(failure.status_code, Some(400));
        assert_eq!(failure.errors.len(), 1);

        let first = &failure.errors[0];
        let code = first.code.as_ref().unwrap();
        assert_eq!(code.family, "queryError");
        assert_eq!(code.value, "UNRECOGNIZED_FIELD");
        assert_eq!(first.trigger.as_deref(), Some("campaign.foo"));
        assert_eq!(failure.extra["status"], "INVALID_ARGUMENT");
    }

    #[test]
    fn test_parse_oauth_failure_keeps_body() {
        let failure = parse_failure(
            400,
            r#"{"error": "invalid_grant", "error_description": "Token has been expired or revoked."}"#,
        );
        assert!(failure.errors.is_empty());
        assert_eq!(
            failure.response_body.as_ref().unwrap()["error_description"],
            "Token has been expired or revoked."
        );
    }

    #[test]
    fn test_parse_non_json_failure() {
        let failure = parse_failure(502, "<html>Bad Gateway</html>");
        assert!(failure.response_body.is_none());
        assert_eq!(
            failure.message.as_deref(),
            Some("Google returned 502: <html>Bad Gateway</html>")
        );
    }

    #[tokio::test]
    async fn test_client_creation() {
        let config = Config {
            port: 0,
            default_client_id: None,
            default_client_secret: None,
            google_ads_base_url: "https://example.com".to_string(),
            google_ads_api_version: "v17".to_string(),
            google_oauth_token_url: "https://example.com/token".to_string(),
            request_timeout_secs: 5,
            rate_limit_per_second: 10,
            rate_limit_burst: 20,
        };
        assert!(GoogleAdsRestClient::new(&config).is_ok());
    }
}
