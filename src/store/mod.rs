// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Storage layer: the `Store` trait plus Firestore and in-memory backends.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{ActivityRaw, ActivitySummary, Credential, SleepRaw, SleepSummary, Weight};

/// Collection names as constants.
pub mod collections {
    pub const CREDENTIALS: &str = "credentials";
    pub const SLEEP_SUMMARIES: &str = "sleep_summaries";
    pub const SLEEP_RAW: &str = "sleep_raw";
    pub const ACTIVITY_SUMMARIES: &str = "activity_summaries";
    pub const ACTIVITY_RAW: &str = "activity_raw";
    pub const WEIGHTS: &str = "weights";
}

/// The five ingested record kinds, used to address resume queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    SleepSummary,
    SleepRaw,
    ActivitySummary,
    ActivityRaw,
    Weight,
}

impl RecordKind {
    pub fn collection(&self) -> &'static str {
        match self {
            RecordKind::SleepSummary => collections::SLEEP_SUMMARIES,
            RecordKind::SleepRaw => collections::SLEEP_RAW,
            RecordKind::ActivitySummary => collections::ACTIVITY_SUMMARIES,
            RecordKind::ActivityRaw => collections::ACTIVITY_RAW,
            RecordKind::Weight => collections::WEIGHTS,
        }
    }

    /// Field a notification-triggered sync resumes from. Sleep records
    /// have no single measurement instant, so their end date stands in.
    pub fn time_field(&self) -> &'static str {
        match self {
            RecordKind::SleepSummary | RecordKind::SleepRaw => "end_date",
            _ => "measured_at",
        }
    }

    /// Kind name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::SleepSummary => "sleep_summary",
            RecordKind::SleepRaw => "sleep_raw",
            RecordKind::ActivitySummary => "activity_summary",
            RecordKind::ActivityRaw => "activity_raw",
            RecordKind::Weight => "weight",
        }
    }
}

/// Keyed record store backing the connector.
///
/// Entity inserts are insert-if-absent on the record's natural-key
/// document ID, atomic at the backend; they return whether a row was
/// actually created. Credentials are never deleted, only inserted and
/// status-flipped.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_credential(&self, credential: &Credential) -> Result<()>;

    /// All credentials for an account, any status, unordered.
    async fn credentials_for_account(&self, account_id: i64) -> Result<Vec<Credential>>;

    /// Credentials currently marked valid for an account, unordered.
    async fn valid_credentials(&self, account_id: i64) -> Result<Vec<Credential>>;

    async fn mark_credential_expired(&self, credential_id: &str) -> Result<()>;

    async fn insert_sleep_summary(&self, record: &SleepSummary) -> Result<bool>;
    async fn insert_sleep_raw(&self, record: &SleepRaw) -> Result<bool>;
    async fn insert_activity_summary(&self, record: &ActivitySummary) -> Result<bool>;
    async fn insert_activity_raw(&self, record: &ActivityRaw) -> Result<bool>;
    async fn insert_weight(&self, record: &Weight) -> Result<bool>;

    /// Time attribute of the most recently ingested record of `kind`,
    /// or `None` when nothing has been ingested yet.
    async fn latest_record_time(
        &self,
        account_id: i64,
        kind: RecordKind,
    ) -> Result<Option<DateTime<Utc>>>;
}
