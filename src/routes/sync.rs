// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Manual sync endpoints.
//!
//! Operators (or an external scheduler) hit these to backfill a date
//! range without waiting for a vendor notification. The sync runs
//! inline and the response reports what was inserted.

use crate::error::AppError;
use crate::services::{EntityFamily, SyncOrigin};
use crate::time_utils::resolve_manual_bounds;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Manual sync routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/check_sleep", get(check_sleep))
        .route("/check_activity", get(check_activity))
        .route("/check_measurements", get(check_measurements))
}

#[derive(Debug, Deserialize)]
pub struct CheckParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub account_id: Option<i64>,
    pub measurement_types: Option<String>,
}

#[derive(Serialize)]
pub struct CheckResponse {
    pub account_id: i64,
    pub family: &'static str,
    pub inserted: BTreeMap<&'static str, u64>,
}

async fn check_sleep(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CheckParams>,
) -> Result<Json<CheckResponse>, AppError> {
    run_check(&state, params, EntityFamily::Sleep).await
}

async fn check_activity(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CheckParams>,
) -> Result<Json<CheckResponse>, AppError> {
    run_check(&state, params, EntityFamily::Activity).await
}

async fn check_measurements(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CheckParams>,
) -> Result<Json<CheckResponse>, AppError> {
    // only the weight family is stored today; reject anything else
    // rather than silently fetching and dropping it
    match params.measurement_types.as_deref() {
        None => {
            tracing::warn!("No measurement type requested, defaulting to `weight`");
        }
        Some(requested) => {
            for kind in requested.split(',').map(str::trim) {
                if kind != "weight" {
                    return Err(AppError::BadRequest(format!(
                        "measurement type `{}` is not supported",
                        kind
                    )));
                }
            }
        }
    }
    run_check(&state, params, EntityFamily::Measurements).await
}

async fn run_check(
    state: &AppState,
    params: CheckParams,
    family: EntityFamily,
) -> Result<Json<CheckResponse>, AppError> {
    let (start, end) =
        resolve_manual_bounds(params.start_date.as_deref(), params.end_date.as_deref())?;
    let account_id = params.account_id.unwrap_or(state.config.default_account_id);

    tracing::info!(
        account_id,
        family = family.as_str(),
        %start,
        %end,
        "Manual sync requested"
    );

    let report = state
        .sync
        .sync_family(account_id, family, SyncOrigin::Manual { start, end })
        .await?;

    Ok(Json(CheckResponse {
        account_id,
        family: family.as_str(),
        inserted: report.inserted,
    }))
}
