// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Withings API client.
//!
//! Handles:
//! - Token grants (refresh and authorization-code exchange)
//! - Activity, sleep and body-measurement data fetches
//! - Notification subscription management
//!
//! Every vendor call is a form POST. Errors ride inside a JSON envelope
//! `{status, body, error}`; `status == 0` means success and the token
//! endpoint reports server-side rejections as `status >= 500`.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::AppError;
use crate::services::planner::SyncWindow;

/// Daily-summary fields requested from the activity endpoint.
pub const ACTIVITY_DATA_FIELDS: &str = "steps,elevation,calories,distance,soft,moderate,\
intense,active,totalcalories,hr_average,hr_min,hr_max,hr_zone_0,hr_zone_1,hr_zone_2,hr_zone_3";

/// Intraday fields requested from the activity endpoint.
pub const ACTIVITY_INTRADAY_DATA_FIELDS: &str =
    "steps,elevation,calories,distance,stroke,pool_lap,duration,heart_rate,spo2_auto";

/// Sampled series requested with raw sleep phases.
pub const SLEEP_RAW_DATA_FIELDS: &str = "hr,rr,snoring";

/// Fields requested from the sleep summary endpoint.
pub const SLEEP_SUMMARY_DATA_FIELDS: &str = "breathing_disturbances_intensity,\
deepsleepduration,durationtosleep,durationtowakeup,hr_average,hr_max,hr_min,\
lightsleepduration,remsleepduration,rr_average,rr_max,rr_min,sleep_score,snoring,\
snoringepisodecount,wakeupcount";

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Withings API client.
#[derive(Clone)]
pub struct WithingsClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl WithingsClient {
    /// Create a new Withings client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://wbsapi.withings.net".to_string(),
            client_id,
            client_secret,
        }
    }

    /// Override the API base URL (tests, emulation).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    // ─── Token grants ────────────────────────────────────────────

    /// Refresh an access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, AppError> {
        tracing::info!("Refreshing access token");
        self.request_token(&[
            ("action", "requesttoken".to_string()),
            ("client_id", self.client_id.clone()),
            ("client_secret", self.client_secret.clone()),
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.to_string()),
        ])
        .await
    }

    /// Exchange an authorization code for the initial token grant.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenGrant, AppError> {
        tracing::info!("Exchanging authorization code for tokens");
        self.request_token(&[
            ("action", "requesttoken".to_string()),
            ("client_id", self.client_id.clone()),
            ("client_secret", self.client_secret.clone()),
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
            ("redirect_uri", redirect_uri.to_string()),
        ])
        .await
    }

    /// The token endpoint reports failures in the envelope, not the HTTP
    /// status: server-class envelope codes are authentication failures.
    async fn request_token(&self, params: &[(&str, String)]) -> Result<TokenGrant, AppError> {
        let url = format!("{}/v2/oauth2", self.base_url);
        let response = self
            .http
            .post(&url)
            .form(params)
            .send()
            .await
            .map_err(|e| AppError::Vendor(format!("token request failed: {}", e)))?;

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("token response: {}", e)))?;

        if envelope.status >= 500 {
            return Err(AppError::Authentication(format!(
                "token request rejected: {}",
                envelope.describe_error()
            )));
        }

        let body = envelope
            .body
            .ok_or_else(|| AppError::Parse("token response missing body".to_string()))?;
        serde_json::from_value(body).map_err(|e| AppError::Parse(format!("token body: {}", e)))
    }

    // ─── Data endpoints ──────────────────────────────────────────

    /// Fetch per-day activity summaries for one window.
    pub async fn get_activity_summary(
        &self,
        access_token: &str,
        window: &SyncWindow,
    ) -> Result<ActivitySummaryBody, AppError> {
        self.send_data_request(
            "/v2/measure",
            &[
                ("action", "getactivity".to_string()),
                ("startdateymd", window.start.format(DAY_FORMAT).to_string()),
                ("enddateymd", window.end.format(DAY_FORMAT).to_string()),
                ("data_fields", ACTIVITY_DATA_FIELDS.to_string()),
            ],
            access_token,
        )
        .await
    }

    /// Fetch the intraday activity series for one window.
    pub async fn get_intraday_activity(
        &self,
        access_token: &str,
        window: &SyncWindow,
    ) -> Result<IntradayActivityBody, AppError> {
        self.send_data_request(
            "/v2/measure",
            &[
                ("action", "getintradayactivity".to_string()),
                ("startdate", window.start.timestamp().to_string()),
                ("enddate", window.end.timestamp().to_string()),
                ("data_fields", ACTIVITY_INTRADAY_DATA_FIELDS.to_string()),
            ],
            access_token,
        )
        .await
    }

    /// Fetch raw sleep phases for one window.
    pub async fn get_sleep(
        &self,
        access_token: &str,
        window: &SyncWindow,
    ) -> Result<SleepBody, AppError> {
        self.send_data_request(
            "/v2/sleep",
            &[
                ("action", "get".to_string()),
                ("startdate", window.start.timestamp().to_string()),
                ("enddate", window.end.timestamp().to_string()),
                ("data_fields", SLEEP_RAW_DATA_FIELDS.to_string()),
            ],
            access_token,
        )
        .await
    }

    /// Fetch nightly sleep summaries for one window.
    pub async fn get_sleep_summary(
        &self,
        access_token: &str,
        window: &SyncWindow,
    ) -> Result<SleepBody, AppError> {
        self.send_data_request(
            "/v2/sleep",
            &[
                ("action", "getsummary".to_string()),
                ("startdateymd", window.start.format(DAY_FORMAT).to_string()),
                ("enddateymd", window.end.format(DAY_FORMAT).to_string()),
                ("data_fields", SLEEP_SUMMARY_DATA_FIELDS.to_string()),
            ],
            access_token,
        )
        .await
    }

    /// Fetch real measurements of one measure type for one window.
    pub async fn get_measurements(
        &self,
        access_token: &str,
        window: &SyncWindow,
        measure_type: i64,
    ) -> Result<MeasureBody, AppError> {
        self.send_data_request(
            "/v2/measure",
            &[
                ("action", "getmeas".to_string()),
                ("meastype", measure_type.to_string()),
                ("category", "1".to_string()),
                ("startdate", window.start.timestamp().to_string()),
                ("enddate", window.end.timestamp().to_string()),
            ],
            access_token,
        )
        .await
    }

    // ─── Notification management ─────────────────────────────────

    /// Register our callback URL for one notification category.
    pub async fn subscribe_notifications(
        &self,
        access_token: &str,
        callback_url: &str,
        appli: i32,
    ) -> Result<(), AppError> {
        self.send_envelope(
            "/notify",
            &[
                ("action", "subscribe".to_string()),
                ("callbackurl", callback_url.to_string()),
                ("appli", appli.to_string()),
            ],
            access_token,
        )
        .await?;
        tracing::info!(appli, "Notification subscription confirmed");
        Ok(())
    }

    /// List the vendor-side subscriptions for one notification category.
    pub async fn list_notifications(
        &self,
        access_token: &str,
        appli: i32,
    ) -> Result<serde_json::Value, AppError> {
        let envelope = self
            .send_envelope(
                "/notify",
                &[
                    ("action", "list".to_string()),
                    ("appli", appli.to_string()),
                ],
                access_token,
            )
            .await?;
        Ok(envelope.body.unwrap_or(serde_json::Value::Null))
    }

    // ─── Request plumbing ────────────────────────────────────────

    /// Bearer-authenticated form POST returning the checked envelope.
    async fn send_envelope(
        &self,
        path: &str,
        params: &[(&str, String)],
        access_token: &str,
    ) -> Result<Envelope, AppError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Sending vendor request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .form(params)
            .send()
            .await
            .map_err(|e| AppError::Vendor(format!("request failed: {}", e)))?;

        let status = response.status();
        if status.as_u16() > 300 {
            return Err(AppError::Vendor(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown")
            )));
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| AppError::Parse(e.to_string()))?;

        if envelope.status != 0 {
            return Err(AppError::Vendor(format!(
                "vendor status {}: {}",
                envelope.status,
                envelope.describe_error()
            )));
        }
        Ok(envelope)
    }

    /// Envelope request whose body is deserialized into `T`.
    async fn send_data_request<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(&str, String)],
        access_token: &str,
    ) -> Result<T, AppError> {
        let envelope = self.send_envelope(path, params, access_token).await?;
        let body = envelope
            .body
            .ok_or_else(|| AppError::Parse("envelope missing body".to_string()))?;
        serde_json::from_value(body).map_err(|e| AppError::Parse(e.to_string()))
    }
}

/// The vendor's `{status, body, error}` wrapper.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub status: i64,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Envelope {
    fn describe_error(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| format!("status {}", self.status))
    }
}

/// Token grant payload from the token endpoint body.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Body of `getactivity`: one entry per day per sub-device.
#[derive(Debug, Deserialize)]
pub struct ActivitySummaryBody {
    #[serde(default)]
    pub activities: Vec<serde_json::Value>,
}

/// Body of `getintradayactivity`: epoch-keyed series entries. The map is
/// ordered so windows are processed in ascending time order.
#[derive(Debug, Deserialize)]
pub struct IntradayActivityBody {
    #[serde(default)]
    pub series: BTreeMap<String, serde_json::Value>,
}

/// Body of the sleep endpoint (`get` and `getsummary` share the shape).
#[derive(Debug, Deserialize)]
pub struct SleepBody {
    #[serde(default)]
    pub series: Vec<serde_json::Value>,
    /// Device model code; `get` reports it at body level on some firmware.
    #[serde(default)]
    pub model: Option<i64>,
}

/// Body of `getmeas`: measurement groups.
#[derive(Debug, Deserialize)]
pub struct MeasureBody {
    #[serde(default)]
    pub measuregrps: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: String) -> WithingsClient {
        WithingsClient::new("cid".to_string(), "csecret".to_string()).with_base_url(base_url)
    }

    fn test_window() -> SyncWindow {
        SyncWindow {
            start: DateTime::from_timestamp(1_600_000_000, 0).unwrap(),
            end: DateTime::from_timestamp(1_600_086_400, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_refresh_token_parses_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/oauth2"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": 0,
                "body": {
                    "access_token": "new_access",
                    "refresh_token": "new_refresh",
                    "expires_in": 10800,
                    "scope": "user.metrics,user.activity",
                    "token_type": "Bearer"
                }
            })))
            .mount(&server)
            .await;

        let grant = test_client(server.uri())
            .refresh_token("old_refresh")
            .await
            .unwrap();
        assert_eq!(grant.access_token, "new_access");
        assert_eq!(grant.expires_in, 10800);
    }

    #[tokio::test]
    async fn test_refresh_token_server_class_status_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/oauth2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": 503,
                "error": "Invalid params"
            })))
            .mount(&server)
            .await;

        let err = test_client(server.uri())
            .refresh_token("old_refresh")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_refresh_token_garbage_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/oauth2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = test_client(server.uri())
            .refresh_token("old_refresh")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Parse(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_data_request_maps_vendor_envelope_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/sleep"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": 401,
                "error": "invalid access token"
            })))
            .mount(&server)
            .await;

        let err = test_client(server.uri())
            .get_sleep("token", &test_window())
            .await
            .unwrap_err();
        match err {
            AppError::Vendor(msg) => assert!(msg.contains("invalid access token")),
            other => panic!("expected vendor error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_data_request_maps_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/measure"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = test_client(server.uri())
            .get_measurements("token", &test_window(), 1)
            .await
            .unwrap_err();
        match err {
            AppError::Vendor(msg) => assert!(msg.contains("HTTP 502")),
            other => panic!("expected vendor error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_intraday_series_preserves_time_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/measure"))
            .and(body_string_contains("action=getintradayactivity"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": 0,
                "body": {
                    "series": {
                        "1600000120": {"steps": 5, "duration": 60},
                        "1600000060": {"steps": 3, "duration": 60}
                    }
                }
            })))
            .mount(&server)
            .await;

        let body = test_client(server.uri())
            .get_intraday_activity("token", &test_window())
            .await
            .unwrap();
        let keys: Vec<_> = body.series.keys().cloned().collect();
        assert_eq!(keys, vec!["1600000060", "1600000120"]);
    }
}
