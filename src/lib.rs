//! Google Ads proxy library.
//!
//! Forwards connection tests, campaign listing and campaign status changes to
//! Google Ads and reshapes the answers into a stable schema.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Action dispatch, mapping and error normalization.
//! - `integrations`: Google Ads client and wire models.
//! - `campaign_mapper`: Raw campaign rows to `CampaignRecord`.
//! - `config`: Configuration management.
//! - `dispatcher`: `test` / `fetch` / `status` actions.
//! - `error_normalizer`: Google failures to user-facing messages.
//! - `errors`: Error handling types.
//! - `google_ads_client`: `AdsPlatform` seam and its REST implementation.
//! - `google_ads_models`: Request payload, credentials and raw rows.
//! - `handlers`: HTTP request handlers and routes.

pub mod api;
pub mod core;
pub mod integrations;

pub mod campaign_mapper;
pub mod config;
pub mod dispatcher;
pub mod error_normalizer;
pub mod errors;
pub mod google_ads_client;
pub mod google_ads_models;
pub mod handlers;
