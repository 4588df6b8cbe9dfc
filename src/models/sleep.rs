// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sleep records (nightly summaries and raw phase series).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sampled value inside a raw sleep phase (heart rate, respiration
/// rate or snoring).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub measured_at: DateTime<Utc>,
    pub value: i64,
}

/// One raw sleep phase, keyed by `(start_date, end_date)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepRaw {
    pub account_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Vendor `model` name
    pub device_type: String,
    /// Vendor `model_id`
    pub device_id: i64,
    /// awake / light / deep / rem
    pub sleep_phase: String,
    /// Vendor state code behind `sleep_phase`
    pub sleep_phase_id: i64,
    pub hr_series: Vec<SeriesPoint>,
    pub rr_series: Vec<SeriesPoint>,
    pub snoring_series: Vec<SeriesPoint>,
}

impl SleepRaw {
    /// Natural-key document ID.
    pub fn document_id(&self) -> String {
        format!(
            "{}-{}-{}",
            self.account_id,
            self.start_date.timestamp(),
            self.end_date.timestamp()
        )
    }
}

/// One nightly sleep summary, keyed by `(start_date, end_date)`.
///
/// Counter-like fields the vendor omits for older devices are stored as
/// zero; physiological readings stay absent when not measured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepSummary {
    pub account_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub device_type: String,
    pub device_id: i64,
    pub breathing_disturbances_intensity: i64,
    pub duration_to_sleep: i64,
    pub duration_to_wakeup: i64,
    pub snoring: i64,
    pub snoring_episode_count: i64,
    pub wakeup_count: i64,
    pub wakeup_duration: i64,
    pub deep_sleep_duration: Option<i64>,
    pub light_sleep_duration: Option<i64>,
    pub rem_sleep_duration: Option<i64>,
    pub hr_average: Option<i64>,
    pub hr_max: Option<i64>,
    pub hr_min: Option<i64>,
    pub rr_average: Option<i64>,
    pub rr_max: Option<i64>,
    pub rr_min: Option<i64>,
    pub sleep_score: Option<i64>,
}

impl SleepSummary {
    /// Natural-key document ID.
    pub fn document_id(&self) -> String {
        format!(
            "{}-{}-{}",
            self.account_id,
            self.start_date.timestamp(),
            self.end_date.timestamp()
        )
    }
}

/// Map a vendor sleep state code to its phase name.
pub fn sleep_phase_name(state: i64) -> Option<&'static str> {
    match state {
        0 => Some("awake"),
        1 => Some("light"),
        2 => Some("deep"),
        3 => Some("rem"),
        _ => None,
    }
}

/// Map a vendor sleep device model code to a device name.
pub fn sleep_device_name(model: i64) -> &'static str {
    match model {
        16 => "aura",
        32 => "sleep_monitor",
        _ => "unknown",
    }
}
