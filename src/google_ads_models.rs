use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::errors::AppError;

/// Marks campaign ids that came from a live Google Ads account.
pub const LIVE_ID_PREFIX: &str = "live-";

/// JSON body of `POST /api/proxy/{platform}/{action}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    #[serde(default)]
    pub creds: Option<RawCredentials>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub account_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub login_customer_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Credentials exactly as the caller sent them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCredentials {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub developer_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub login_customer_id: Option<String>,
}

/// Trimmed credentials with every mandatory field present.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub developer_token: String,
    pub refresh_token: String,
}

// Secrets stay out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("developer_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Validates the caller's credentials, filling the OAuth client from the
    /// configured defaults when the request leaves it out.
    pub fn resolve(raw: Option<&RawCredentials>, config: &Config) -> Result<Self, AppError> {
        let raw = raw.ok_or_else(|| {
            AppError::BadRequest("Missing Google Ads credentials (creds)".to_string())
        })?;

        let client_id =
            non_blank(raw.client_id.as_deref()).or_else(|| config.default_client_id.clone());
        let client_secret = non_blank(raw.client_secret.as_deref())
            .or_else(|| config.default_client_secret.clone());
        let developer_token = non_blank(raw.developer_token.as_deref());
        let refresh_token = non_blank(raw.refresh_token.as_deref());

        let mut missing = Vec::new();
        if client_id.is_none() {
            missing.push("Client ID");
        }
        if client_secret.is_none() {
            missing.push("Client Secret");
        }
        if developer_token.is_none() {
            missing.push("Developer Token");
        }
        if refresh_token.is_none() {
            missing.push("Refresh Token");
        }

        match (client_id, client_secret, developer_token, refresh_token) {
            (Some(client_id), Some(client_secret), Some(developer_token), Some(refresh_token)) => {
                Ok(Self {
                    client_id,
                    client_secret,
                    developer_token,
                    refresh_token,
                })
            }
            _ => Err(AppError::BadRequest(format!(
                "Missing mandatory Google Ads credentials: {}",
                missing.join(", ")
            ))),
        }
    }
}

/// Everything needed to address one Google Ads customer.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountContext {
    pub credentials: Credentials,
    /// Customer id, digits only.
    pub customer_id: String,
    /// Manager account acting on behalf of `customer_id`.
    pub login_customer_id: Option<String>,
}

impl AccountContext {
    pub fn campaign_resource_name(&self, campaign_id: &str) -> String {
        format!("customers/{}/campaigns/{}", self.customer_id, campaign_id)
    }
}

/// Removes the `-` separators (and any whitespace) from a customer id.
pub fn strip_separators(id: &str) -> String {
    id.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect()
}

/// Normalizes an optional manager id, dropping placeholders such as
/// `"undefined"`, `"null"` or `"XXX-XXX-XXXX"`.
pub fn normalize_login_customer_id(raw: Option<&str>) -> Option<String> {
    let stripped = strip_separators(raw?);
    if stripped.is_empty() || !stripped.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if stripped.chars().all(|c| c == '0') {
        return None;
    }
    Some(stripped)
}

/// Two-valued campaign status exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CampaignStatus {
    Active,
    Paused,
}

impl CampaignStatus {
    /// Parses `Active`/`Paused`, ignoring case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Some(Self::Active),
            "paused" => Some(Self::Paused),
            _ => None,
        }
    }

    pub fn from_platform_state(state: Option<&str>) -> Self {
        if state == Some("ENABLED") {
            Self::Active
        } else {
            Self::Paused
        }
    }

    pub fn as_platform_state(&self) -> &'static str {
        match self {
            Self::Active => "ENABLED",
            Self::Paused => "PAUSED",
        }
    }
}

/// One row of a `googleAds:search` response.
///
/// Accepts both the REST camelCase field names and the snake_case names of
/// the query language.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchRow {
    pub campaign: Option<RawCampaign>,
    pub metrics: Option<RawMetrics>,
    pub customer: Option<RawCustomer>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawCampaign {
    #[serde(alias = "resource_name")]
    pub resource_name: Option<String>,
    #[serde(deserialize_with = "de_opt_string")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawMetrics {
    #[serde(alias = "cost_micros", deserialize_with = "de_opt_number")]
    pub cost_micros: Option<f64>,
    #[serde(deserialize_with = "de_opt_number")]
    pub conversions: Option<f64>,
    #[serde(alias = "conversions_value", deserialize_with = "de_opt_number")]
    pub conversions_value: Option<f64>,
    #[serde(deserialize_with = "de_opt_number")]
    pub clicks: Option<f64>,
    #[serde(deserialize_with = "de_opt_number")]
    pub impressions: Option<f64>,
    #[serde(deserialize_with = "de_opt_number")]
    pub ctr: Option<f64>,
    #[serde(alias = "average_cpc", deserialize_with = "de_opt_number")]
    pub average_cpc: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawCustomer {
    #[serde(deserialize_with = "de_opt_string")]
    pub id: Option<String>,
    #[serde(alias = "descriptive_name")]
    pub descriptive_name: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Google encodes int64 as JSON strings; callers sometimes send ids as numbers.
fn de_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn de_opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number.filter(|n| n.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_config() -> Config {
        Config {
            port: 0,
            default_client_id: Some("default-id".to_string()),
            default_client_secret: Some("default-secret".to_string()),
            google_ads_base_url: "https://googleads.googleapis.com".to_string(),
            google_ads_api_version: "v17".to_string(),
            google_oauth_token_url: "https://oauth2.googleapis.com/token".to_string(),
            request_timeout_secs: 30,
            rate_limit_per_second: 10,
            rate_limit_burst: 20,
        }
    }

    #[test]
    fn test_resolve_trims_and_uses_defaults() {
        let raw = RawCredentials {
            client_id: Some("   ".to_string()),
            client_secret: None,
            developer_token: Some("  dev-token ".to_string()),
            refresh_token: Some("\trefresh\n".to_string()),
            login_customer_id: None,
        };

        let creds = Credentials::resolve(Some(&raw), &test_config()).unwrap();
        assert_eq!(creds.client_id, "default-id");
        assert_eq!(creds.client_secret, "default-secret");
        assert_eq!(creds.developer_token, "dev-token");
        assert_eq!(creds.refresh_token, "refresh");
    }

    #[test]
    fn test_resolve_lists_missing_fields() {
        let mut config = test_config();
        config.default_client_secret = None;
        let raw = RawCredentials {
            client_id: Some("id".to_string()),
            developer_token: Some(" ".to_string()),
            refresh_token: Some("r".to_string()),
            ..Default::default()
        };

        match Credentials::resolve(Some(&raw), &config) {
            Err(AppError::BadRequest(msg)) => {
                assert!(msg.contains("Client Secret"));
                assert!(msg.contains("Developer Token"));
                assert!(!msg.contains("Refresh Token"));
            }
            other => panic!("expected BadRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_rejects_missing_creds_object() {
        assert!(matches!(
            Credentials::resolve(None, &test_config()),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials {
            client_id: "id".to_string(),
            client_secret: "very-secret".to_string(),
            developer_token: "dev".to_string(),
            refresh_token: "refresh-me".to_string(),
        };
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("very-secret"));
        assert!(!printed.contains("refresh-me"));
    }

    #[test]
    fn test_login_customer_id_normalization() {
        assert_eq!(
            normalize_login_customer_id(Some("123-456-7890")),
            Some("1234567890".to_string())
        );
        assert_eq!(normalize_login_customer_id(Some("undefined")), None);
        assert_eq!(normalize_login_customer_id(Some("XXX-XXX-XXXX")), None);
        assert_eq!(normalize_login_customer_id(Some("000-000-0000")), None);
        assert_eq!(normalize_login_customer_id(Some("  ")), None);
        assert_eq!(normalize_login_customer_id(None), None);
    }

    #[test]
    fn test_campaign_status_round_trip_to_platform() {
        assert_eq!(CampaignStatus::parse("Active"), Some(CampaignStatus::Active));
        assert_eq!(CampaignStatus::parse(" paused "), Some(CampaignStatus::Paused));
        assert_eq!(CampaignStatus::parse("REMOVED"), None);
        assert_eq!(CampaignStatus::Active.as_platform_state(), "ENABLED");
        assert_eq!(CampaignStatus::Paused.as_platform_state(), "PAUSED");
        assert_eq!(
            CampaignStatus::from_platform_state(Some("ENABLED")),
            CampaignStatus::Active
        );
        assert_eq!(
            CampaignStatus::from_platform_state(Some("REMOVED")),
            CampaignStatus::Paused
        );
    }

    #[test]
    fn test_search_row_accepts_string_encoded_int64() {
        let row: SearchRow = serde_json::from_value(json!({
            "campaign": { "resourceName": "customers/1/campaigns/42", "id": "42", "name": "Brand", "status": "ENABLED" },
            "metrics": { "costMicros": "5000000", "conversions": 2.0, "conversionsValue": 20, "clicks": "10", "ctr": 0.1 }
        }))
        .unwrap();

        let campaign = row.campaign.unwrap();
        let metrics = row.metrics.unwrap();
        assert_eq!(campaign.id.as_deref(), Some("42"));
        assert_eq!(metrics.cost_micros, Some(5_000_000.0));
        assert_eq!(metrics.clicks, Some(10.0));
        assert_eq!(metrics.impressions, None);
    }

    #[test]
    fn test_search_row_accepts_snake_case_fields() {
        let row: SearchRow = serde_json::from_value(json!({
            "campaign": { "id": 7, "name": "Shopping", "status": "PAUSED" },
            "metrics": { "cost_micros": 1000000, "conversions_value": 3.5, "average_cpc": 250000 }
        }))
        .unwrap();

        let metrics = row.metrics.unwrap();
        assert_eq!(row.campaign.unwrap().id.as_deref(), Some("7"));
        assert_eq!(metrics.cost_micros, Some(1_000_000.0));
        assert_eq!(metrics.conversions_value, Some(3.5));
        assert_eq!(metrics.average_cpc, Some(250_000.0));
    }

    #[test]
    fn test_proxy_request_accepts_numeric_ids() {
        let request: ProxyRequest = serde_json::from_value(json!({
            "creds": { "developerToken": "d" },
            "accountId": 1234567890u64,
            "campaignId": "live-9"
        }))
        .unwrap();
        assert_eq!(request.account_id.as_deref(), Some("1234567890"));
        assert_eq!(request.campaign_id.as_deref(), Some("live-9"));
    }
}
