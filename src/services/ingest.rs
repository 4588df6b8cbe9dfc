// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fetch-and-normalize pipeline.
//!
//! `SyncService` drives one measurement family end to end: acquire a
//! credential, plan day-sized windows, fetch each window from the
//! vendor, normalize the entries into canonical records and insert them
//! if absent. Normalizers are pure functions over the vendor's JSON so
//! they can be tested without any I/O.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use futures_util::{stream, StreamExt};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;
use crate::models::sleep::{sleep_device_name, sleep_phase_name};
use crate::models::weight::{source_name, WEIGHT_MEASURE_CODES};
use crate::models::{
    ActivityKind, ActivityRaw, ActivitySummary, SeriesPoint, SleepRaw, SleepSummary, Weight,
};
use crate::services::planner::{SyncOrigin, SyncPlanner, SyncWindow};
use crate::services::token::TokenService;
use crate::services::withings::WithingsClient;
use crate::store::{RecordKind, Store};
use crate::time_utils::from_epoch_seconds;

const MAX_CONCURRENT_FETCHES: usize = 4;

/// Measurement family a sync or notification applies to.
///
/// The vendor identifies families by `appli` code in webhooks and
/// subscription calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityFamily {
    Measurements,
    Activity,
    Sleep,
}

impl EntityFamily {
    pub const ALL: [EntityFamily; 3] = [
        EntityFamily::Measurements,
        EntityFamily::Activity,
        EntityFamily::Sleep,
    ];

    pub fn from_appli(appli: i32) -> Option<Self> {
        match appli {
            1 => Some(EntityFamily::Measurements),
            16 => Some(EntityFamily::Activity),
            44 => Some(EntityFamily::Sleep),
            _ => None,
        }
    }

    pub fn appli(&self) -> i32 {
        match self {
            EntityFamily::Measurements => 1,
            EntityFamily::Activity => 16,
            EntityFamily::Sleep => 44,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityFamily::Measurements => "measurements",
            EntityFamily::Activity => "activity",
            EntityFamily::Sleep => "sleep",
        }
    }

    /// Record streams this family syncs, in fetch order: raw streams
    /// before summaries.
    pub fn record_kinds(&self) -> &'static [RecordKind] {
        match self {
            EntityFamily::Measurements => &[RecordKind::Weight],
            EntityFamily::Activity => &[RecordKind::ActivityRaw, RecordKind::ActivitySummary],
            EntityFamily::Sleep => &[RecordKind::SleepRaw, RecordKind::SleepSummary],
        }
    }
}

/// Counts of records inserted by one sync, per record stream.
#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub inserted: BTreeMap<&'static str, u64>,
}

/// Orchestrates fetch, normalization and persistence for one account.
#[derive(Clone)]
pub struct SyncService {
    store: Arc<dyn Store>,
    withings: WithingsClient,
    tokens: TokenService,
    planner: SyncPlanner,
}

impl SyncService {
    pub fn new(
        store: Arc<dyn Store>,
        withings: WithingsClient,
        tokens: TokenService,
        planner: SyncPlanner,
    ) -> Self {
        Self {
            store,
            withings,
            tokens,
            planner,
        }
    }

    /// Sync one measurement family over the windows `origin` implies.
    pub async fn sync_family(
        &self,
        account_id: i64,
        family: EntityFamily,
        origin: SyncOrigin,
    ) -> Result<SyncReport, AppError> {
        let credential = self.tokens.acquire(account_id).await?;
        let token = credential.access_token.as_str();

        let mut report = SyncReport::default();
        for &kind in family.record_kinds() {
            let inserted = self.sync_stream(account_id, token, kind, origin).await?;
            report.inserted.insert(kind.collection(), inserted);
        }

        tracing::info!(
            account_id,
            family = family.as_str(),
            inserted = ?report.inserted,
            "Sync complete"
        );
        Ok(report)
    }

    /// Drive one record stream: plan its windows, fetch and normalize
    /// each window in ascending order, insert whatever is new. Every
    /// stream shares this loop; they differ only in the vendor request
    /// and the normalizer, both dispatched on `kind`.
    async fn sync_stream(
        &self,
        account_id: i64,
        token: &str,
        kind: RecordKind,
        origin: SyncOrigin,
    ) -> Result<u64, AppError> {
        let windows = self.planner.plan(account_id, kind, origin).await?;

        let mut inserted = 0;
        let mut skipped = 0;
        for window in &windows {
            let batch = self.fetch_window(account_id, token, kind, window).await?;
            skipped += batch.skipped;
            for record in &batch.records {
                if self.insert_record(record).await? {
                    inserted += 1;
                }
            }
        }
        if skipped > 0 {
            tracing::debug!(
                account_id,
                kind = kind.as_str(),
                skipped,
                "Entries without steps or heart rate were skipped"
            );
        }
        Ok(inserted)
    }

    /// Fetch one window of `kind` from the vendor and normalize it.
    ///
    /// Weight metrics are spread across measure-type codes, so that arm
    /// fans out one fetch per code before the groups are merged by
    /// timestamp. Merge outcome does not depend on completion order:
    /// each code fills a distinct metric slot.
    async fn fetch_window(
        &self,
        account_id: i64,
        token: &str,
        kind: RecordKind,
        window: &SyncWindow,
    ) -> Result<WindowBatch, AppError> {
        let mut batch = WindowBatch::default();
        match kind {
            RecordKind::ActivitySummary => {
                let body = self.withings.get_activity_summary(token, window).await?;
                for entry in &body.activities {
                    match normalize_activity_summary(account_id, entry)? {
                        Some(record) => batch.push(IngestedRecord::ActivitySummary(record)),
                        None => batch.skipped += 1,
                    }
                }
            }
            RecordKind::ActivityRaw => {
                let body = self.withings.get_intraday_activity(token, window).await?;
                for (epoch, entry) in &body.series {
                    match normalize_activity_point(account_id, epoch, entry)? {
                        Some(record) => batch.push(IngestedRecord::ActivityRaw(record)),
                        None => batch.skipped += 1,
                    }
                }
            }
            RecordKind::SleepRaw => {
                let body = self.withings.get_sleep(token, window).await?;
                if body.series.is_empty() {
                    return Ok(batch);
                }
                let model = body.model.ok_or_else(|| {
                    AppError::Normalization("sleep response missing device model".to_string())
                })?;
                for entry in &body.series {
                    batch.push(IngestedRecord::SleepRaw(normalize_sleep_phase(
                        account_id, model, entry,
                    )?));
                }
            }
            RecordKind::SleepSummary => {
                let body = self.withings.get_sleep_summary(token, window).await?;
                for entry in &body.series {
                    batch.push(IngestedRecord::SleepSummary(normalize_sleep_summary(
                        account_id, entry,
                    )?));
                }
            }
            RecordKind::Weight => {
                let groups = stream::iter(WEIGHT_MEASURE_CODES)
                    .map(|code| self.withings.get_measurements(token, window, code))
                    .buffer_unordered(MAX_CONCURRENT_FETCHES)
                    .collect::<Vec<_>>()
                    .await
                    .into_iter()
                    .collect::<Result<Vec<_>, AppError>>()?
                    .into_iter()
                    .flat_map(|body| body.measuregrps)
                    .collect::<Vec<_>>();

                for record in merge_weight_groups(account_id, &groups)? {
                    batch.push(IngestedRecord::Weight(record));
                }
            }
        }
        Ok(batch)
    }

    async fn insert_record(&self, record: &IngestedRecord) -> Result<bool, AppError> {
        match record {
            IngestedRecord::SleepSummary(r) => self.store.insert_sleep_summary(r).await,
            IngestedRecord::SleepRaw(r) => self.store.insert_sleep_raw(r).await,
            IngestedRecord::ActivitySummary(r) => self.store.insert_activity_summary(r).await,
            IngestedRecord::ActivityRaw(r) => self.store.insert_activity_raw(r).await,
            IngestedRecord::Weight(r) => self.store.insert_weight(r).await,
        }
    }
}

/// One normalized record, addressed to its stream's collection.
enum IngestedRecord {
    SleepSummary(SleepSummary),
    SleepRaw(SleepRaw),
    ActivitySummary(ActivitySummary),
    ActivityRaw(ActivityRaw),
    Weight(Weight),
}

/// What one window's fetch produced.
#[derive(Default)]
struct WindowBatch {
    records: Vec<IngestedRecord>,
    skipped: u64,
}

impl WindowBatch {
    fn push(&mut self, record: IngestedRecord) {
        self.records.push(record);
    }
}

// ─── Normalizers ─────────────────────────────────────────────────

/// Classify an activity entry by its indicator keys. Heart rate wins
/// when both are present; `None` means the entry carries neither and
/// should be skipped.
fn classify_activity(entry: &Value) -> Option<ActivityKind> {
    if entry.get("heart_rate").is_some() {
        Some(ActivityKind::HeartRate)
    } else if entry.get("steps").is_some() {
        Some(ActivityKind::Steps)
    } else {
        None
    }
}

/// Normalize one `getactivity` entry into a daily summary record.
///
/// Returns `Ok(None)` for entries carrying neither indicator key.
/// Fields the entry must carry once classified (`date`, `brand`,
/// `deviceid`, `is_tracker`) fail normalization when absent.
pub fn normalize_activity_summary(
    account_id: i64,
    entry: &Value,
) -> Result<Option<ActivitySummary>, AppError> {
    let Some(kind) = classify_activity(entry) else {
        tracing::debug!("Activity entry without steps or heart rate, skipping");
        return Ok(None);
    };

    let day = req_str(entry, "date")?;
    let measured_at = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
        .map_err(|_| AppError::Normalization(format!("invalid activity date `{}`", day)))?
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc();

    let device_id = match req(entry, "deviceid")? {
        Value::Null => "0".to_string(),
        Value::String(s) if s.is_empty() => "0".to_string(),
        other => string_like(other)
            .ok_or_else(|| AppError::Normalization("`deviceid` is not a string".to_string()))?,
    };

    let steps_only = kind == ActivityKind::Steps;
    Ok(Some(ActivitySummary {
        account_id,
        measured_at,
        measurement_type: kind,
        device_type: req_string_like(entry, "brand")?,
        device_id,
        is_tracker: req_bool(entry, "is_tracker")?,
        steps: if steps_only { opt_i64(entry, "steps") } else { None },
        distance: if steps_only { opt_f64(entry, "distance") } else { None },
        elevation: if steps_only { opt_f64(entry, "elevation") } else { None },
        calories: if steps_only { opt_f64(entry, "calories") } else { None },
        soft_activities_duration: opt_i64(entry, "soft"),
        moderate_activities_duration: opt_i64(entry, "moderate"),
        intense_activities_duration: opt_i64(entry, "intense"),
        active_duration: opt_i64(entry, "active"),
        total_calories: opt_f64(entry, "totalcalories"),
        hr_average: opt_i64(entry, "hr_average"),
        hr_min: opt_i64(entry, "hr_min"),
        hr_max: opt_i64(entry, "hr_max"),
        hr_zone_light_duration: opt_i64(entry, "hr_zone_0"),
        hr_zone_moderate_duration: opt_i64(entry, "hr_zone_1"),
        hr_zone_intense_duration: opt_i64(entry, "hr_zone_2"),
        hr_zone_max_duration: opt_i64(entry, "hr_zone_3"),
    }))
}

/// Normalize one intraday series entry keyed by `epoch`.
pub fn normalize_activity_point(
    account_id: i64,
    epoch: &str,
    entry: &Value,
) -> Result<Option<ActivityRaw>, AppError> {
    let Some(kind) = classify_activity(entry) else {
        tracing::debug!("Intraday entry without steps or heart rate, skipping");
        return Ok(None);
    };

    let seconds = epoch
        .parse::<i64>()
        .map_err(|_| AppError::Normalization(format!("invalid series timestamp `{}`", epoch)))?;

    let steps_only = kind == ActivityKind::Steps;
    Ok(Some(ActivityRaw {
        account_id,
        measured_at: from_epoch_seconds(seconds)?,
        measurement_type: kind,
        device_type: req_string_like(entry, "model")?,
        device_id: req_i64(entry, "model_id")?,
        duration: req_i64(entry, "duration")?,
        steps: if steps_only { opt_i64(entry, "steps") } else { None },
        heart_rate: if steps_only { None } else { opt_i64(entry, "heart_rate") },
        distance: if steps_only { opt_f64(entry, "distance") } else { None },
        elevation: if steps_only { opt_f64(entry, "elevation") } else { None },
        calories: if steps_only { opt_f64(entry, "calories") } else { None },
    }))
}

/// Normalize one raw sleep phase; `model` is the device code the vendor
/// reports once per response body.
pub fn normalize_sleep_phase(
    account_id: i64,
    model: i64,
    entry: &Value,
) -> Result<SleepRaw, AppError> {
    let state = req_i64(entry, "state")?;
    let phase = sleep_phase_name(state)
        .ok_or_else(|| AppError::Normalization(format!("unknown sleep state {}", state)))?;

    Ok(SleepRaw {
        account_id,
        start_date: from_epoch_seconds(req_i64(entry, "startdate")?)?,
        end_date: from_epoch_seconds(req_i64(entry, "enddate")?)?,
        device_type: sleep_device_name(model).to_string(),
        device_id: model,
        sleep_phase: phase.to_string(),
        sleep_phase_id: state,
        hr_series: sampled_series(entry, "hr")?,
        rr_series: sampled_series(entry, "rr")?,
        snoring_series: sampled_series(entry, "snoring")?,
    })
}

/// Normalize one nightly summary entry.
///
/// Counter-like fields default to zero when the vendor omits them;
/// physiological readings pass through as absent.
pub fn normalize_sleep_summary(account_id: i64, entry: &Value) -> Result<SleepSummary, AppError> {
    let model = req_i64(entry, "model")?;
    let data = req(entry, "data")?;

    Ok(SleepSummary {
        account_id,
        start_date: from_epoch_seconds(req_i64(entry, "startdate")?)?,
        end_date: from_epoch_seconds(req_i64(entry, "enddate")?)?,
        device_type: sleep_device_name(model).to_string(),
        device_id: model,
        breathing_disturbances_intensity: opt_i64(data, "breathing_disturbances_intensity")
            .unwrap_or(0),
        duration_to_sleep: opt_i64(data, "durationtosleep").unwrap_or(0),
        duration_to_wakeup: opt_i64(data, "durationtowakeup").unwrap_or(0),
        snoring: opt_i64(data, "snoring").unwrap_or(0),
        snoring_episode_count: opt_i64(data, "snoringepisodecount").unwrap_or(0),
        wakeup_count: opt_i64(data, "wakeupcount").unwrap_or(0),
        wakeup_duration: opt_i64(data, "wakeupduration").unwrap_or(0),
        deep_sleep_duration: opt_i64(data, "deepsleepduration"),
        light_sleep_duration: opt_i64(data, "lightsleepduration"),
        rem_sleep_duration: opt_i64(data, "remsleepduration"),
        hr_average: opt_i64(data, "hr_average"),
        hr_max: opt_i64(data, "hr_max"),
        hr_min: opt_i64(data, "hr_min"),
        rr_average: opt_i64(data, "rr_average"),
        rr_max: opt_i64(data, "rr_max"),
        rr_min: opt_i64(data, "rr_min"),
        sleep_score: opt_i64(data, "sleep_score"),
    })
}

#[derive(Default)]
struct WeightDraft {
    measured_at: Option<DateTime<Utc>>,
    device_id: Option<String>,
    source: Option<String>,
    metrics: BTreeMap<i64, f64>,
}

/// Merge measurement groups (one per measure-type fetch) into weight
/// records, grouping by exact timestamp.
///
/// Groups sharing a timestamp must agree on device, source and time;
/// a disagreement means the vendor feed contradicts itself and the
/// whole batch is rejected.
pub fn merge_weight_groups(account_id: i64, groups: &[Value]) -> Result<Vec<Weight>, AppError> {
    let mut drafts: BTreeMap<i64, WeightDraft> = BTreeMap::new();

    for group in groups {
        let attrib = req_i64(group, "attrib")?;
        let epoch = req_i64(group, "date")?;
        let measured_at = from_epoch_seconds(epoch)?;
        let source = source_name(attrib);
        let device_id = group
            .get("deviceid")
            .and_then(string_like)
            .filter(|s| !s.is_empty());

        let draft = drafts.entry(epoch * 1000).or_default();
        let measures = req(group, "measures")?
            .as_array()
            .ok_or_else(|| AppError::Normalization("`measures` is not an array".to_string()))?;

        for measure in measures {
            let code = req_i64(measure, "type")?;
            let unit = req_i64(measure, "unit")?;
            let value = req_i64(measure, "value")?;

            match &draft.source {
                None => draft.source = Some(source.to_string()),
                Some(prev) if prev != source => {
                    return Err(AppError::InconsistentEntries(format!(
                        "measurement sources differ: {} != {}",
                        prev, source
                    )));
                }
                _ => {}
            }
            match &draft.device_id {
                None => draft.device_id = device_id.clone(),
                Some(prev) if device_id.as_deref() != Some(prev) => {
                    return Err(AppError::InconsistentEntries(format!(
                        "device ids differ: {} != {}",
                        prev,
                        device_id.as_deref().unwrap_or("none")
                    )));
                }
                _ => {}
            }
            match draft.measured_at {
                None => draft.measured_at = Some(measured_at),
                Some(prev) if prev != measured_at => {
                    return Err(AppError::InconsistentEntries(format!(
                        "measurement dates differ: {} != {}",
                        prev, measured_at
                    )));
                }
                _ => {}
            }

            draft.metrics.insert(code, scale_measure(value, unit));
        }
    }

    let mut records = Vec::new();
    for draft in drafts.into_values() {
        // groups without measures never anchor a timestamp
        let Some(measured_at) = draft.measured_at else {
            continue;
        };
        let mut record = Weight::empty(account_id, measured_at);
        if let Some(device_id) = draft.device_id {
            record.device_id = device_id;
        }
        if let Some(source) = draft.source {
            record.source = source;
        }
        for (code, value) in draft.metrics {
            if let Some(slot) = record.metric_slot(code) {
                *slot = Some(value);
            }
        }
        records.push(record);
    }
    Ok(records)
}

/// Apply the vendor's decimal scaling (`value * 10^unit`), rounded to
/// four decimals.
fn scale_measure(value: i64, unit: i64) -> f64 {
    let scaled = value as f64 * 10f64.powi(unit as i32);
    (scaled * 10_000.0).round() / 10_000.0
}

/// Parse an epoch-keyed sample map into a time-ordered series.
fn sampled_series(entry: &Value, key: &str) -> Result<Vec<SeriesPoint>, AppError> {
    let Some(samples) = entry.get(key).and_then(Value::as_object) else {
        return Ok(Vec::new());
    };

    let mut series = Vec::with_capacity(samples.len());
    for (epoch, value) in samples {
        let seconds = epoch.parse::<i64>().map_err(|_| {
            AppError::Normalization(format!("invalid {} sample timestamp `{}`", key, epoch))
        })?;
        let value = value.as_i64().ok_or_else(|| {
            AppError::Normalization(format!("{} sample at {} is not an integer", key, epoch))
        })?;
        series.push(SeriesPoint {
            measured_at: from_epoch_seconds(seconds)?,
            value,
        });
    }
    series.sort_by_key(|point| point.measured_at);
    Ok(series)
}

// ─── Field extraction ────────────────────────────────────────────

fn req<'a>(entry: &'a Value, key: &str) -> Result<&'a Value, AppError> {
    entry
        .get(key)
        .ok_or_else(|| AppError::Normalization(format!("entry missing `{}`", key)))
}

fn req_i64(entry: &Value, key: &str) -> Result<i64, AppError> {
    req(entry, key)?
        .as_i64()
        .ok_or_else(|| AppError::Normalization(format!("`{}` is not an integer", key)))
}

fn req_str(entry: &Value, key: &str) -> Result<String, AppError> {
    req(entry, key)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| AppError::Normalization(format!("`{}` is not a string", key)))
}

fn req_bool(entry: &Value, key: &str) -> Result<bool, AppError> {
    let value = req(entry, key)?;
    value
        .as_bool()
        .or_else(|| value.as_i64().map(|n| n != 0))
        .ok_or_else(|| AppError::Normalization(format!("`{}` is not a boolean", key)))
}

fn req_string_like(entry: &Value, key: &str) -> Result<String, AppError> {
    string_like(req(entry, key)?)
        .ok_or_else(|| AppError::Normalization(format!("`{}` is not string-like", key)))
}

/// Strings pass through; numbers render as text. The vendor switches
/// between the two for device and brand codes.
fn string_like(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn opt_i64(entry: &Value, key: &str) -> Option<i64> {
    entry.get(key).and_then(Value::as_i64)
}

fn opt_f64(entry: &Value, key: &str) -> Option<f64> {
    entry.get(key).and_then(Value::as_f64)
}
