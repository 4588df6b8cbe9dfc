// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync window planning.
//!
//! Every fetch against the vendor is scoped to a window no wider than one
//! day, so a sync over a long range becomes a series of day-sized
//! requests. Notification-triggered syncs anchor on the newest record we
//! already hold; manual syncs use caller-provided bounds.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::error::AppError;
use crate::store::{RecordKind, Store};

/// Half-open time range `[start, end)` covered by one vendor request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// What triggered a sync, and therefore where its bounds come from.
#[derive(Debug, Clone, Copy)]
pub enum SyncOrigin {
    /// Vendor webhook: resume from the newest stored record.
    Notification,
    /// Operator request with explicit bounds.
    Manual {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Plans the day-sized windows a sync will fetch.
#[derive(Clone)]
pub struct SyncPlanner {
    store: Arc<dyn Store>,
}

impl SyncPlanner {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Resolve the sync bounds for `origin` and split them into windows.
    ///
    /// Notification syncs for an account with no stored records of the
    /// requested kind cannot be anchored and fail with a planning error.
    pub async fn plan(
        &self,
        account_id: i64,
        kind: RecordKind,
        origin: SyncOrigin,
    ) -> Result<Vec<SyncWindow>, AppError> {
        let (start, end) = match origin {
            SyncOrigin::Manual { start, end } => (start, end),
            SyncOrigin::Notification => {
                let anchor = self
                    .store
                    .latest_record_time(account_id, kind)
                    .await?
                    .ok_or_else(|| {
                        AppError::Planning(format!(
                            "no stored {} records for account {}, cannot anchor sync",
                            kind.as_str(),
                            account_id
                        ))
                    })?;
                (anchor, Utc::now())
            }
        };

        let windows = build_windows(start, end);
        tracing::debug!(
            account_id,
            kind = kind.as_str(),
            window_count = windows.len(),
            %start,
            %end,
            "Planned sync windows"
        );
        Ok(windows)
    }
}

/// Split `[start, end)` into day-long windows.
///
/// A range spanning `n` whole days yields `n` contiguous windows at
/// one-day stride from `start`; any remainder short of a full day is
/// dropped. A range shorter than a day yields a single window padded to
/// one day.
pub fn build_windows(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<SyncWindow> {
    let days = (end - start).num_days();
    if days > 0 {
        (0..days)
            .map(|i| SyncWindow {
                start: start + Duration::days(i),
                end: start + Duration::days(i + 1),
            })
            .collect()
    } else {
        vec![SyncWindow {
            start,
            end: start + Duration::days(1),
        }]
    }
}
