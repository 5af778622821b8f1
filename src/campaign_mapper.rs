use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::google_ads_models::{CampaignStatus, RawMetrics, SearchRow, LIVE_ID_PREFIX};

const MICROS_PER_UNIT: f64 = 1_000_000.0;

/// Campaign in the stable schema returned by `fetch`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRecord {
    pub id: String,
    pub name: String,
    pub platform: String,
    pub status: CampaignStatus,
    pub spend: f64,
    pub revenue: f64,
    pub clicks: u64,
    pub conversions: f64,
    pub impressions: u64,
    /// Percentage, not a fraction.
    pub ctr: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpc: Option<f64>,
    pub cpa: f64,
    pub roas: f64,
    pub updated_at: String,
}

/// Maps one search row, stamping it with the current time.
pub fn map_campaign(row: &SearchRow) -> CampaignRecord {
    map_campaign_at(row, Utc::now())
}

pub fn map_campaign_at(row: &SearchRow, now: DateTime<Utc>) -> CampaignRecord {
    let campaign = row.campaign.clone().unwrap_or_default();
    let metrics = row.metrics.clone().unwrap_or_default();

    let cost_micros = metric(metrics.cost_micros);
    let conversions = metric(metrics.conversions);
    let revenue = metric(metrics.conversions_value);

    let spend = cost_micros / MICROS_PER_UNIT;
    let cpa = if conversions > 0.0 {
        spend / conversions
    } else {
        0.0
    };
    let roas = if spend > 0.0 { revenue / spend } else { 0.0 };

    CampaignRecord {
        id: format!(
            "{}{}",
            LIVE_ID_PREFIX,
            campaign.id.as_deref().unwrap_or_default()
        ),
        name: campaign.name.unwrap_or_default(),
        platform: "Google".to_string(),
        status: CampaignStatus::from_platform_state(campaign.status.as_deref()),
        spend,
        revenue,
        clicks: count(metrics.clicks),
        conversions,
        impressions: count(metrics.impressions),
        ctr: metric(metrics.ctr) * 100.0,
        cpc: average_cpc(&metrics),
        cpa,
        roas,
        updated_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

fn average_cpc(metrics: &RawMetrics) -> Option<f64> {
    metrics.average_cpc.map(|micros| micros / MICROS_PER_UNIT)
}

/// Missing and negative values count as zero.
fn metric(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(0.0)
}

fn count(value: Option<f64>) -> u64 {
    metric(value).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google_ads_models::RawCampaign;
    use chrono::TimeZone;

    fn row(metrics: RawMetrics) -> SearchRow {
        SearchRow {
            campaign: Some(RawCampaign {
                resource_name: Some("customers/123/campaigns/987".to_string()),
                id: Some("987".to_string()),
                name: Some("Brand - Search".to_string()),
                status: Some("ENABLED".to_string()),
            }),
            metrics: Some(metrics),
            customer: None,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_maps_identity_and_status() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let record = map_campaign_at(&row(RawMetrics::default()), now);

        assert_eq!(record.id, "live-987");
        assert_eq!(record.name, "Brand - Search");
        assert_eq!(record.platform, "Google");
        assert_eq!(record.status, CampaignStatus::Active);
        assert_eq!(record.updated_at, "2024-03-01T12:00:00.000Z");
    }

    #[test]
    fn test_spend_and_roas_from_micros() {
        let record = map_campaign(&row(RawMetrics {
            cost_micros: Some(5_000_000.0),
            conversions_value: Some(20.0),
            ..Default::default()
        }));

        assert!(close(record.spend, 5.0));
        assert!(close(record.revenue, 20.0));
        assert!(close(record.roas, 4.0));
        assert_eq!(record.cpa, 0.0);
    }

    #[test]
    fn test_zero_cost_guards_divisions() {
        let record = map_campaign(&row(RawMetrics {
            cost_micros: Some(0.0),
            conversions: Some(0.0),
            conversions_value: Some(50.0),
            ..Default::default()
        }));

        assert_eq!(record.spend, 0.0);
        assert_eq!(record.cpa, 0.0);
        assert_eq!(record.roas, 0.0);
        assert!(record.roas.is_finite());
    }

    #[test]
    fn test_ctr_percentage_and_cpc() {
        let record = map_campaign(&row(RawMetrics {
            ctr: Some(0.035),
            average_cpc: Some(1_250_000.0),
            clicks: Some(40.0),
            impressions: Some(1_000.0),
            ..Default::default()
        }));

        assert!(close(record.ctr, 3.5));
        assert_eq!(record.cpc, Some(1.25));
        assert_eq!(record.clicks, 40);
        assert_eq!(record.impressions, 1_000);
    }

    #[test]
    fn test_cpa_from_conversions() {
        let record = map_campaign(&row(RawMetrics {
            cost_micros: Some(30_000_000.0),
            conversions: Some(4.0),
            ..Default::default()
        }));
        assert!(close(record.cpa, 7.5));
    }

    #[test]
    fn test_missing_everything_defaults_to_zero() {
        let record = map_campaign(&SearchRow::default());

        assert_eq!(record.id, "live-");
        assert_eq!(record.status, CampaignStatus::Paused);
        assert_eq!(record.spend, 0.0);
        assert_eq!(record.ctr, 0.0);
        assert_eq!(record.cpc, None);
    }

    #[test]
    fn test_serialized_shape() {
        let record = map_campaign(&row(RawMetrics::default()));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["status"], "Active");
        assert!(json.get("updatedAt").is_some());
        assert!(json.get("cpc").is_none());
    }
}
