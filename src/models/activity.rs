// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity records (daily summaries and intraday series points).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which indicator field classified an activity entry.
///
/// The vendor mixes step-counter and heart-rate readings in one feed;
/// `heart_rate` wins when both keys are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Steps,
    HeartRate,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Steps => "steps",
            ActivityKind::HeartRate => "heart_rate",
        }
    }
}

/// One per-day activity summary, keyed by `(measured_at, measurement_type)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub account_id: i64,
    /// Vendor `date` (Y-m-d) at UTC midnight
    pub measured_at: DateTime<Utc>,
    pub measurement_type: ActivityKind,
    /// Vendor `brand` code, stored as text
    pub device_type: String,
    /// Vendor `deviceid`; "0" when the vendor sends none
    pub device_id: String,
    pub is_tracker: bool,
    /// Step count; only set for steps records
    pub steps: Option<i64>,
    /// Meters; steps records only
    pub distance: Option<f64>,
    /// Meters climbed; steps records only
    pub elevation: Option<f64>,
    /// Active kcal; steps records only
    pub calories: Option<f64>,
    /// Seconds of soft activity
    pub soft_activities_duration: Option<i64>,
    pub moderate_activities_duration: Option<i64>,
    pub intense_activities_duration: Option<i64>,
    pub active_duration: Option<i64>,
    /// Total kcal including basal metabolism
    pub total_calories: Option<f64>,
    pub hr_average: Option<i64>,
    pub hr_min: Option<i64>,
    pub hr_max: Option<i64>,
    pub hr_zone_light_duration: Option<i64>,
    pub hr_zone_moderate_duration: Option<i64>,
    pub hr_zone_intense_duration: Option<i64>,
    pub hr_zone_max_duration: Option<i64>,
}

impl ActivitySummary {
    /// Natural-key document ID.
    pub fn document_id(&self) -> String {
        format!(
            "{}-{}-{}",
            self.account_id,
            self.measured_at.timestamp(),
            self.measurement_type.as_str()
        )
    }
}

/// One intraday series point, keyed by `(measured_at, measurement_type)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRaw {
    pub account_id: i64,
    /// Epoch key of the intraday series entry
    pub measured_at: DateTime<Utc>,
    pub measurement_type: ActivityKind,
    /// Vendor `model` name
    pub device_type: String,
    /// Vendor `model_id`
    pub device_id: i64,
    /// Seconds covered by this point; always present
    pub duration: i64,
    pub steps: Option<i64>,
    pub heart_rate: Option<i64>,
    pub distance: Option<f64>,
    pub elevation: Option<f64>,
    pub calories: Option<f64>,
}

impl ActivityRaw {
    /// Natural-key document ID.
    pub fn document_id(&self) -> String {
        format!(
            "{}-{}-{}",
            self.account_id,
            self.measured_at.timestamp(),
            self.measurement_type.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_serde() {
        let json = serde_json::to_string(&ActivityKind::HeartRate).unwrap();
        assert_eq!(json, "\"heart_rate\"");
        let kind: ActivityKind = serde_json::from_str(&json).unwrap();
        assert_eq!(kind, ActivityKind::HeartRate);
    }

    #[test]
    fn test_document_id_includes_kind() {
        let raw = ActivityRaw {
            account_id: 123,
            measured_at: DateTime::from_timestamp(1_594_768_740, 0).unwrap(),
            measurement_type: ActivityKind::Steps,
            device_type: "Activite Steel HR".to_string(),
            device_id: 55,
            duration: 60,
            steps: Some(12),
            heart_rate: None,
            distance: None,
            elevation: None,
            calories: None,
        };
        assert_eq!(raw.document_id(), "123-1594768740-steps");
    }
}
