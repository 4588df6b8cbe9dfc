// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory `Store` implementation for tests and local development.

use std::collections::{hash_map::Entry, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::models::{
    ActivityRaw, ActivitySummary, Credential, CredentialStatus, SleepRaw, SleepSummary, Weight,
};
use crate::store::{RecordKind, Store};

/// Keyed maps mirroring the Firestore collections, document ID → record.
#[derive(Default)]
pub struct MemoryStore {
    credentials: RwLock<HashMap<String, Credential>>,
    sleep_summaries: RwLock<HashMap<String, SleepSummary>>,
    sleep_raw: RwLock<HashMap<String, SleepRaw>>,
    activity_summaries: RwLock<HashMap<String, ActivitySummary>>,
    activity_raw: RwLock<HashMap<String, ActivityRaw>>,
    weights: RwLock<HashMap<String, Weight>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one account's sleep summaries, ordered by start date.
    pub async fn sleep_summaries_for(&self, account_id: i64) -> Vec<SleepSummary> {
        let mut records: Vec<_> = self
            .sleep_summaries
            .read()
            .await
            .values()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.start_date);
        records
    }

    /// Snapshot of one account's raw sleep phases, ordered by start date.
    pub async fn sleep_raw_for(&self, account_id: i64) -> Vec<SleepRaw> {
        let mut records: Vec<_> = self
            .sleep_raw
            .read()
            .await
            .values()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.start_date);
        records
    }

    /// Snapshot of one account's activity summaries, ordered by time.
    pub async fn activity_summaries_for(&self, account_id: i64) -> Vec<ActivitySummary> {
        let mut records: Vec<_> = self
            .activity_summaries
            .read()
            .await
            .values()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.measured_at);
        records
    }

    /// Snapshot of one account's intraday activity points, ordered by time.
    pub async fn activity_raw_for(&self, account_id: i64) -> Vec<ActivityRaw> {
        let mut records: Vec<_> = self
            .activity_raw
            .read()
            .await
            .values()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.measured_at);
        records
    }

    /// Snapshot of one account's weight records, ordered by time.
    pub async fn weights_for(&self, account_id: i64) -> Vec<Weight> {
        let mut records: Vec<_> = self
            .weights
            .read()
            .await
            .values()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.measured_at);
        records
    }
}

fn insert_absent<T: Clone>(map: &mut HashMap<String, T>, key: String, record: &T) -> bool {
    match map.entry(key) {
        Entry::Occupied(_) => false,
        Entry::Vacant(slot) => {
            slot.insert(record.clone());
            true
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_credential(&self, credential: &Credential) -> Result<()> {
        self.credentials
            .write()
            .await
            .insert(credential.id.clone(), credential.clone());
        Ok(())
    }

    async fn credentials_for_account(&self, account_id: i64) -> Result<Vec<Credential>> {
        Ok(self
            .credentials
            .read()
            .await
            .values()
            .filter(|c| c.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn valid_credentials(&self, account_id: i64) -> Result<Vec<Credential>> {
        Ok(self
            .credentials
            .read()
            .await
            .values()
            .filter(|c| c.account_id == account_id && c.is_valid())
            .cloned()
            .collect())
    }

    async fn mark_credential_expired(&self, credential_id: &str) -> Result<()> {
        let mut map = self.credentials.write().await;
        let credential = map
            .get_mut(credential_id)
            .ok_or_else(|| AppError::NotFound(format!("credential {credential_id}")))?;
        credential.status = CredentialStatus::Expired;
        Ok(())
    }

    async fn insert_sleep_summary(&self, record: &SleepSummary) -> Result<bool> {
        let mut map = self.sleep_summaries.write().await;
        Ok(insert_absent(&mut map, record.document_id(), record))
    }

    async fn insert_sleep_raw(&self, record: &SleepRaw) -> Result<bool> {
        let mut map = self.sleep_raw.write().await;
        Ok(insert_absent(&mut map, record.document_id(), record))
    }

    async fn insert_activity_summary(&self, record: &ActivitySummary) -> Result<bool> {
        let mut map = self.activity_summaries.write().await;
        Ok(insert_absent(&mut map, record.document_id(), record))
    }

    async fn insert_activity_raw(&self, record: &ActivityRaw) -> Result<bool> {
        let mut map = self.activity_raw.write().await;
        Ok(insert_absent(&mut map, record.document_id(), record))
    }

    async fn insert_weight(&self, record: &Weight) -> Result<bool> {
        let mut map = self.weights.write().await;
        Ok(insert_absent(&mut map, record.document_id(), record))
    }

    async fn latest_record_time(
        &self,
        account_id: i64,
        kind: RecordKind,
    ) -> Result<Option<DateTime<Utc>>> {
        let latest = match kind {
            RecordKind::SleepSummary => self
                .sleep_summaries
                .read()
                .await
                .values()
                .filter(|r| r.account_id == account_id)
                .map(|r| r.end_date)
                .max(),
            RecordKind::SleepRaw => self
                .sleep_raw
                .read()
                .await
                .values()
                .filter(|r| r.account_id == account_id)
                .map(|r| r.end_date)
                .max(),
            RecordKind::ActivitySummary => self
                .activity_summaries
                .read()
                .await
                .values()
                .filter(|r| r.account_id == account_id)
                .map(|r| r.measured_at)
                .max(),
            RecordKind::ActivityRaw => self
                .activity_raw
                .read()
                .await
                .values()
                .filter(|r| r.account_id == account_id)
                .map(|r| r.measured_at)
                .max(),
            RecordKind::Weight => self
                .weights
                .read()
                .await
                .values()
                .filter(|r| r.account_id == account_id)
                .map(|r| r.measured_at)
                .max(),
        };
        Ok(latest)
    }
}
