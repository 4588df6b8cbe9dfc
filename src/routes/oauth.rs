// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth callback and subscription maintenance.
//!
//! The vendor redirects to `GET /` after the user approves access. The
//! same path doubles as a maintenance hook: calling it with
//! `code=notifupdate&appli=N` re-registers our webhook callback for one
//! notification category.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

/// Query parameters the callback endpoint understands.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub response_type: Option<String>,
    pub appli: Option<i32>,
}

/// Handle `GET /`.
pub async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, AppError> {
    if let Some(code) = params.code.as_deref() {
        if params.state.as_deref() == Some("token_request") {
            return redeem_code(&state, code).await;
        }
        if code == "notifupdate" {
            return refresh_subscription(&state, params.appli).await;
        }
    }

    // the vendor probes the callback URL with `response_type` before
    // redirecting the user
    if params.response_type.as_deref() == Some("token_request") {
        return Ok("OK".into_response());
    }

    Err(AppError::BadRequest(
        "unrecognized callback parameters".to_string(),
    ))
}

async fn redeem_code(state: &AppState, code: &str) -> Result<Response, AppError> {
    let account_id = state.config.default_account_id;
    tracing::info!(account_id, "Authorization code received");

    match state.tokens.redeem_authorization_code(account_id, code).await {
        Ok(credential) => {
            tracing::info!(
                account_id,
                credential_id = %credential.id,
                "Authorization complete"
            );
            Ok("Authorisation request was successful.".into_response())
        }
        Err(AppError::Authentication(reason))
        | Err(AppError::Vendor(reason))
        | Err(AppError::Parse(reason)) => {
            tracing::warn!(account_id, reason = %reason, "Authorization code exchange failed");
            Err(AppError::BadRequest(
                "Token retrieval was unsuccessful.".to_string(),
            ))
        }
        Err(other) => Err(other),
    }
}

async fn refresh_subscription(state: &AppState, appli: Option<i32>) -> Result<Response, AppError> {
    let appli = appli
        .ok_or_else(|| AppError::BadRequest("missing `appli` parameter".to_string()))?;
    let credential = state.tokens.acquire(state.config.default_account_id).await?;

    let subscriptions = state
        .withings
        .list_notifications(&credential.access_token, appli)
        .await?;
    tracing::debug!(appli, %subscriptions, "Current notification subscriptions");

    state
        .withings
        .subscribe_notifications(&credential.access_token, &state.config.callback_url, appli)
        .await?;

    Ok("OK".into_response())
}
