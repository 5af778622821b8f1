//! Turns whatever Google Ads failed with into one message a user can act on.
//!
//! Google reports failures in several shapes depending on where the call
//! broke: a `GoogleAdsFailure` error list for API-level problems, an OAuth
//! JSON body for token exchange problems, a transport detail string when the
//! request never got an answer. [`AdsFailure`] keeps all of them side by side
//! and [`normalize`] probes them in a fixed order, first match wins.

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::errors::AppError;

pub const GENERIC_FAILURE_MESSAGE: &str =
    "An unexpected error occurred while contacting Google Ads.";

const INVALID_CLIENT_MESSAGE: &str = "Google rejected the OAuth client. Check that the Client ID and Client Secret are correct and belong to the same Google Cloud project.";
const INVALID_REFRESH_TOKEN_MESSAGE: &str = "The refresh token is invalid, expired or revoked. Generate a new refresh token and reconnect the account.";
const DEVELOPER_TOKEN_MESSAGE: &str = "The developer token is not approved for this account. Use a test account or apply for Basic access in the Google Ads API Center.";

/// One entry of a `GoogleAdsFailure.errors` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiErrorDetail {
    pub message: Option<String>,
    pub code: Option<ErrorCode>,
    /// The value that triggered the error, e.g. an offending field value.
    pub trigger: Option<String>,
}

/// `errorCode` is an object with a single key naming the error family,
/// e.g. `{"authenticationError": "OAUTH_TOKEN_EXPIRED"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorCode {
    pub family: String,
    pub value: String,
}

/// A failed call to Google Ads, in every shape Google can produce.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdsFailure {
    /// Structured API errors (policy, validation, auth families).
    pub errors: Vec<ApiErrorDetail>,
    /// HTTP status of the failed response, when there was one.
    pub status_code: Option<u16>,
    /// JSON body of the failed response.
    pub response_body: Option<Value>,
    /// Low-level transport detail (connect failure, timeout, ...).
    pub details: Option<String>,
    /// Plain top-level message.
    pub message: Option<String>,
    /// Anything else the failure carried.
    pub extra: Map<String, Value>,
}

impl AdsFailure {
    pub fn transport(details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            message: Some("Request to Google Ads failed".to_string()),
            ..Default::default()
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Authentication,
    Service,
}

/// A normalized message plus how the HTTP layer should report it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedError {
    pub message: String,
    pub kind: FailureKind,
}

impl NormalizedError {
    /// Logs the raw failure for operators and keeps only the normalized text.
    pub fn from_failure(failure: &AdsFailure, kind: FailureKind) -> Self {
        tracing::error!(?failure, ?kind, "Google Ads call failed");
        Self {
            message: normalize(failure),
            kind,
        }
    }
}

impl From<NormalizedError> for AppError {
    fn from(err: NormalizedError) -> Self {
        match err.kind {
            FailureKind::Authentication => AppError::Unauthorized(err.message),
            FailureKind::Service => AppError::ExternalApiError(err.message),
        }
    }
}

type Probe = fn(&AdsFailure) -> Option<String>;

const PROBES: [Probe; 4] = [
    from_api_errors,
    from_response_body,
    from_transport_details,
    from_known_patterns,
];

/// Produces a non-empty message for any failure. Never panics.
pub fn normalize(failure: &AdsFailure) -> String {
    PROBES
        .iter()
        .find_map(|probe| probe(failure).filter(|m| !m.trim().is_empty()))
        .or_else(|| non_empty(failure.message.as_deref()))
        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
}

/// Decides whether a failure means the credentials were rejected.
///
/// `test` treats every failure as an authentication problem; `fetch` and
/// `status` rely on this.
pub fn classify(failure: &AdsFailure) -> FailureKind {
    let auth_family = failure.errors.iter().any(|e| {
        e.code.as_ref().is_some_and(|c| {
            c.family == "authenticationError" || c.family == "authorizationError"
        })
    });
    if auth_family {
        return FailureKind::Authentication;
    }

    if matches!(failure.status_code, Some(401) | Some(403)) {
        return FailureKind::Authentication;
    }

    let oauth_error = failure
        .response_body
        .as_ref()
        .and_then(|body| body.get("error"))
        .and_then(Value::as_str);
    if matches!(
        oauth_error,
        Some("invalid_grant") | Some("invalid_client") | Some("unauthorized_client")
    ) {
        return FailureKind::Authentication;
    }

    if matched_pattern(&flatten(failure)).is_some() {
        return FailureKind::Authentication;
    }

    FailureKind::Service
}

fn from_api_errors(failure: &AdsFailure) -> Option<String> {
    let first = failure.errors.first()?;
    let mut message = non_empty(first.message.as_deref())
        .unwrap_or_else(|| "Google Ads API error".to_string());
    if let Some(code) = &first.code {
        message.push_str(&format!(" [Code: {}]", code.value));
    }
    if let Some(trigger) = non_empty(first.trigger.as_deref()) {
        message.push_str(&format!(" (Trigger: {})", trigger));
    }
    Some(message)
}

fn from_response_body(failure: &AdsFailure) -> Option<String> {
    let body = failure.response_body.as_ref()?;

    let description = body.get("error_description").and_then(Value::as_str);
    let nested = body
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str);
    let bare = body.get("error").and_then(Value::as_str);

    [description, nested, bare]
        .into_iter()
        .find_map(non_empty)
}

fn from_transport_details(failure: &AdsFailure) -> Option<String> {
    non_empty(failure.details.as_deref())
}

fn from_known_patterns(failure: &AdsFailure) -> Option<String> {
    matched_pattern(&flatten(failure)).map(str::to_string)
}

/// Lowercased text of every field the failure carries.
fn flatten(failure: &AdsFailure) -> String {
    serde_json::to_string(failure)
        .unwrap_or_else(|_| format!("{:?}", failure))
        .to_lowercase()
}

fn matched_pattern(blob: &str) -> Option<&'static str> {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            (
                r"invalid_client|unauthorized_client|oauth client",
                INVALID_CLIENT_MESSAGE,
            ),
            (
                r"invalid_grant|refresh.?token.{0,40}(expired|revoked|invalid)|token has been expired",
                INVALID_REFRESH_TOKEN_MESSAGE,
            ),
            (
                r"developer_token_not_approved|developer_token_prohibited|developer.?token.{0,40}not.{0,10}approved",
                DEVELOPER_TOKEN_MESSAGE,
            ),
        ]
        .into_iter()
        .filter_map(|(pattern, message)| Regex::new(pattern).ok().map(|re| (re, message)))
        .collect()
    });

    patterns
        .iter()
        .find(|(re, _)| re.is_match(blob))
        .map(|(_, message)| *message)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
