//! Runs one proxy action against Google Ads.
//!
//! Flow for every action:
//! 1. Validate credentials (no external call on failure).
//! 2. Resolve the account (customer id, optional manager id).
//! 3. Make exactly one awaited call through [`AdsPlatform`].
//! 4. Map rows, or normalize the failure.

use serde::Serialize;
use std::str::FromStr;

use crate::campaign_mapper::{map_campaign, CampaignRecord};
use crate::config::Config;
use crate::error_normalizer::{classify, FailureKind, NormalizedError};
use crate::errors::AppError;
use crate::google_ads_client::AdsPlatform;
use crate::google_ads_models::{
    normalize_login_customer_id, strip_separators, AccountContext, CampaignStatus, Credentials,
    ProxyRequest, LIVE_ID_PREFIX,
};

pub const CONNECTION_TEST_QUERY: &str =
    "SELECT customer.id, customer.descriptive_name FROM customer LIMIT 1";

pub const CAMPAIGN_REPORT_QUERY: &str = "SELECT campaign.id, campaign.name, campaign.status, \
metrics.cost_micros, metrics.conversions, metrics.conversions_value, metrics.clicks, \
metrics.impressions, metrics.ctr, metrics.average_cpc \
FROM campaign WHERE campaign.status IN ('ENABLED', 'PAUSED') LIMIT 100";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Test,
    Fetch,
    Status,
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "test" => Ok(Self::Test),
            "fetch" => Ok(Self::Fetch),
            "status" => Ok(Self::Status),
            other => Err(AppError::BadRequest(format!("Invalid action: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionAck {
    pub success: bool,
    pub message: String,
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusAck {
    pub success: bool,
    pub campaign_id: String,
    pub new_status: CampaignStatus,
}

/// Result of a successful action, serialized as the response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionOutcome {
    Connected(ConnectionAck),
    Campaigns(Vec<CampaignRecord>),
    StatusChanged(StatusAck),
}

pub struct ActionDispatcher<'a> {
    client: &'a dyn AdsPlatform,
    config: &'a Config,
}

impl<'a> ActionDispatcher<'a> {
    pub fn new(client: &'a dyn AdsPlatform, config: &'a Config) -> Self {
        Self { client, config }
    }

    pub async fn dispatch(
        &self,
        action: &str,
        request: &ProxyRequest,
    ) -> Result<ActionOutcome, AppError> {
        let account = self.account_context(request)?;
        let action = action.parse::<Action>()?;

        tracing::info!(
            "[Google Ads] Action: {:?} | Account: {}",
            action,
            account.customer_id
        );

        match action {
            Action::Test => self.test_connection(&account).await,
            Action::Fetch => self.fetch_campaigns(&account).await,
            Action::Status => self.update_status(&account, request).await,
        }
    }

    fn account_context(&self, request: &ProxyRequest) -> Result<AccountContext, AppError> {
        let credentials = Credentials::resolve(request.creds.as_ref(), self.config)?;

        let customer_id = request
            .account_id
            .as_deref()
            .map(strip_separators)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                AppError::BadRequest("Missing Google Ads account id (accountId)".to_string())
            })?;
        // Goes into the request path and resource names.
        if !is_numeric_id(&customer_id) {
            return Err(AppError::BadRequest(
                "accountId must be a Google Ads customer id (digits and dashes only)".to_string(),
            ));
        }

        // Body-level manager id wins over the one stored with the credentials.
        let login_customer_id = normalize_login_customer_id(request.login_customer_id.as_deref())
            .or_else(|| {
                normalize_login_customer_id(
                    request
                        .creds
                        .as_ref()
                        .and_then(|c| c.login_customer_id.as_deref()),
                )
            });

        Ok(AccountContext {
            credentials,
            customer_id,
            login_customer_id,
        })
    }

    async fn test_connection(&self, account: &AccountContext) -> Result<ActionOutcome, AppError> {
        let rows = self
            .client
            .search(account, CONNECTION_TEST_QUERY)
            .await
            .map_err(|failure| {
                NormalizedError::from_failure(&failure, FailureKind::Authentication)
            })?;

        let account_name = rows
            .into_iter()
            .find_map(|row| row.customer.and_then(|c| c.descriptive_name));

        Ok(ActionOutcome::Connected(ConnectionAck {
            success: true,
            message: "Connection to Google Ads successful".to_string(),
            account_id: account.customer_id.clone(),
            account_name,
        }))
    }

    async fn fetch_campaigns(&self, account: &AccountContext) -> Result<ActionOutcome, AppError> {
        let rows = self
            .client
            .search(account, CAMPAIGN_REPORT_QUERY)
            .await
            .map_err(|failure| NormalizedError::from_failure(&failure, classify(&failure)))?;

        let campaigns: Vec<CampaignRecord> = rows.iter().map(map_campaign).collect();
        tracing::info!("Mapped {} campaigns", campaigns.len());
        Ok(ActionOutcome::Campaigns(campaigns))
    }

    async fn update_status(
        &self,
        account: &AccountContext,
        request: &ProxyRequest,
    ) -> Result<ActionOutcome, AppError> {
        let campaign_id = request
            .campaign_id
            .as_deref()
            .map(str::trim)
            .map(|id| id.strip_prefix(LIVE_ID_PREFIX).unwrap_or(id))
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::BadRequest("Missing campaignId".to_string()))?
            .to_string();
        if !is_numeric_id(&campaign_id) {
            return Err(AppError::BadRequest(
                "campaignId must be a numeric campaign id".to_string(),
            ));
        }

        let new_status = request
            .status
            .as_deref()
            .and_then(CampaignStatus::parse)
            .ok_or_else(|| {
                AppError::BadRequest("status must be either 'Active' or 'Paused'".to_string())
            })?;

        let resource_name = account.campaign_resource_name(&campaign_id);
        self.client
            .update_campaign_status(account, &resource_name, new_status)
            .await
            .map_err(|failure| NormalizedError::from_failure(&failure, classify(&failure)))?;

        Ok(ActionOutcome::StatusChanged(StatusAck {
            success: true,
            campaign_id,
            new_status,
        }))
    }
}

fn is_numeric_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
}
