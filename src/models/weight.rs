// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Body measurement records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Vendor measure-type codes belonging to the `weight` measurement
/// family. Each code is fetched with its own `getmeas` call.
pub const WEIGHT_MEASURE_CODES: [i64; 10] = [1, 5, 6, 8, 11, 54, 76, 77, 88, 91];

/// One body-measurement event, keyed by `measured_at`. Sub-measurements
/// sharing the timestamp are merged into the single record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weight {
    pub account_id: i64,
    pub measured_at: DateTime<Utc>,
    /// "unknown" when the vendor sends no device id
    pub device_id: String,
    /// How the reading entered the vendor's system (device, manual, ...)
    pub source: String,
    pub weight: Option<f64>,
    pub fat_free_mass: Option<f64>,
    pub fat_ratio: Option<f64>,
    pub fat_mass_weight: Option<f64>,
    pub muscle_mass: Option<f64>,
    pub hydration: Option<f64>,
    pub bone_mass: Option<f64>,
    pub pulse_wave_velocity: Option<f64>,
    pub heart_rate: Option<f64>,
}

impl Weight {
    pub fn empty(account_id: i64, measured_at: DateTime<Utc>) -> Self {
        Self {
            account_id,
            measured_at,
            device_id: "unknown".to_string(),
            source: "unknown".to_string(),
            weight: None,
            fat_free_mass: None,
            fat_ratio: None,
            fat_mass_weight: None,
            muscle_mass: None,
            hydration: None,
            bone_mass: None,
            pulse_wave_velocity: None,
            heart_rate: None,
        }
    }

    /// Natural-key document ID.
    pub fn document_id(&self) -> String {
        format!("{}-{}", self.account_id, self.measured_at.timestamp())
    }

    /// Storage slot for a vendor measure-type code.
    ///
    /// Code 54 (SpO2) is part of the fetched family but has no stored
    /// column, so it returns `None` and the reading is dropped.
    pub fn metric_slot(&mut self, code: i64) -> Option<&mut Option<f64>> {
        match code {
            1 => Some(&mut self.weight),
            5 => Some(&mut self.fat_free_mass),
            6 => Some(&mut self.fat_ratio),
            8 => Some(&mut self.fat_mass_weight),
            11 => Some(&mut self.heart_rate),
            76 => Some(&mut self.muscle_mass),
            77 => Some(&mut self.hydration),
            88 => Some(&mut self.bone_mass),
            91 => Some(&mut self.pulse_wave_velocity),
            _ => None,
        }
    }
}

/// Map a vendor `attrib` code to a source name.
pub fn source_name(attrib: i64) -> &'static str {
    match attrib {
        0 => "device",
        1 => "device_ambiguous",
        2 => "manual",
        4 => "manual_creation",
        5 => "auto",
        7 => "confirmed",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_slots_cover_stored_codes() {
        let ts = DateTime::from_timestamp(1_600_000_000, 0).unwrap();
        let mut rec = Weight::empty(123, ts);

        *rec.metric_slot(1).unwrap() = Some(85.75);
        *rec.metric_slot(88).unwrap() = Some(3.1);
        assert_eq!(rec.weight, Some(85.75));
        assert_eq!(rec.bone_mass, Some(3.1));
        // SpO2 has no column
        assert!(rec.metric_slot(54).is_none());
    }

    #[test]
    fn test_source_names() {
        assert_eq!(source_name(0), "device");
        assert_eq!(source_name(2), "manual");
        assert_eq!(source_name(99), "unknown");
    }
}
