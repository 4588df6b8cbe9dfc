// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook route for vendor data notifications.

use crate::services::{EntityFamily, SyncOrigin};
use crate::AppState;
use axum::{
    extract::{Form, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

/// Form-encoded notification the vendor posts when new data lands.
///
/// The date bounds the vendor includes describe when the notification
/// fired, not what changed, so syncs triggered here always resume from
/// our own newest stored record instead.
#[derive(Debug, Deserialize)]
pub struct NotificationPayload {
    #[serde(default)]
    pub userid: Option<String>,
    #[serde(default)]
    pub appli: Option<i32>,
    #[serde(default)]
    pub startdate: Option<i64>,
    #[serde(default)]
    pub enddate: Option<i64>,
    #[serde(default)]
    pub date: Option<String>,
}

/// Handle `POST /`.
///
/// Acknowledges immediately and runs the sync in the background; the
/// vendor retries (and eventually drops) subscriptions whose callbacks
/// answer slowly.
pub async fn receive_notification(
    State(state): State<Arc<AppState>>,
    Form(payload): Form<NotificationPayload>,
) -> (StatusCode, &'static str) {
    tracing::debug!(?payload, "Notification received");

    let Some(appli) = payload.appli else {
        tracing::warn!("Notification without `appli`, ignoring");
        return (StatusCode::OK, "Unsupported appli.");
    };

    if state.config.disabled_applis.contains(&appli) {
        tracing::info!(appli, "Notification for disabled appli ignored");
        return (StatusCode::OK, "OK");
    }

    let Some(family) = EntityFamily::from_appli(appli) else {
        tracing::warn!(appli, "Notification for unsupported appli");
        return (StatusCode::OK, "Unsupported appli.");
    };

    let account_id = match payload.userid.as_deref().map(str::parse::<i64>) {
        Some(Ok(id)) => id,
        _ => {
            tracing::warn!(
                userid = ?payload.userid,
                "Notification without usable account id, using default"
            );
            state.config.default_account_id
        }
    };

    tracing::info!(
        appli,
        account_id,
        family = family.as_str(),
        "Notification accepted, dispatching sync"
    );

    let sync = state.sync.clone();
    tokio::spawn(async move {
        if let Err(e) = sync
            .sync_family(account_id, family, SyncOrigin::Notification)
            .await
        {
            tracing::warn!(
                error = %e,
                account_id,
                family = family.as_str(),
                "Notification-triggered sync failed"
            );
        }
    });

    (StatusCode::OK, "OK")
}
