// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access-token lifecycle.
//!
//! `acquire` is the single entry point callers use to obtain a usable
//! credential. It reconciles whatever state the credential store is in
//! (none valid, exactly one valid, several valid after concurrent
//! refreshes) and only talks to the vendor when a refresh is actually
//! needed. A per-account async lock keeps concurrent callers from
//! racing each other into duplicate refreshes.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::models::Credential;
use crate::services::withings::{TokenGrant, WithingsClient};
use crate::store::Store;

/// Manages credential issuance, refresh and reconciliation per account.
#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn Store>,
    withings: WithingsClient,
    callback_url: String,
    max_refresh_attempts: u32,
    refresh_locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl TokenService {
    pub fn new(
        store: Arc<dyn Store>,
        withings: WithingsClient,
        callback_url: String,
        max_refresh_attempts: u32,
    ) -> Self {
        Self {
            store,
            withings,
            callback_url,
            max_refresh_attempts,
            refresh_locks: Arc::new(DashMap::new()),
        }
    }

    /// Return a credential holding a currently-valid access token.
    ///
    /// Store states and their outcomes:
    /// - no valid credential: refresh from stored history, newest first
    /// - one valid credential, unexpired: returned as-is, no vendor call
    /// - one valid credential, past `valid_until`: marked expired, then
    ///   refreshed
    /// - several valid credentials: the newest survives, the rest are
    ///   marked expired, and the survivor is returned without a refresh
    pub async fn acquire(&self, account_id: i64) -> Result<Credential, AppError> {
        let lock = self.account_lock(account_id);
        let _guard = lock.lock().await;

        let valid = latest_first(self.store.valid_credentials(account_id).await?);

        match valid.len() {
            0 => self.refresh_from_history(account_id).await,
            1 => {
                let credential = valid.into_iter().next().unwrap();
                if credential.is_expired_at(Utc::now()) {
                    tracing::info!(
                        account_id,
                        credential_id = %credential.id,
                        "Credential expired, refreshing"
                    );
                    self.store.mark_credential_expired(&credential.id).await?;
                    self.refresh_from_history(account_id).await
                } else {
                    Ok(credential)
                }
            }
            n => {
                tracing::warn!(account_id, count = n, "Multiple valid credentials, reconciling");
                let mut iter = valid.into_iter();
                let keeper = iter.next().unwrap();
                for stale in iter {
                    self.store.mark_credential_expired(&stale.id).await?;
                }
                Ok(keeper)
            }
        }
    }

    /// Redeem an authorization code into a fresh stored credential.
    pub async fn redeem_authorization_code(
        &self,
        account_id: i64,
        code: &str,
    ) -> Result<Credential, AppError> {
        let lock = self.account_lock(account_id);
        let _guard = lock.lock().await;

        let grant = self.withings.exchange_code(code, &self.callback_url).await?;
        self.persist_grant(account_id, grant).await
    }

    fn account_lock(&self, account_id: i64) -> Arc<Mutex<()>> {
        self.refresh_locks
            .entry(account_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Walk stored credentials newest-first and refresh with each one's
    /// refresh token until a grant succeeds or the attempt cap is hit.
    /// Only vendor rejections fall through to an older token; decode and
    /// transport failures propagate immediately.
    async fn refresh_from_history(&self, account_id: i64) -> Result<Credential, AppError> {
        let history = latest_first(self.store.credentials_for_account(account_id).await?);
        if history.is_empty() {
            return Err(AppError::Authentication(format!(
                "no credentials on file for account {}",
                account_id
            )));
        }

        let mut attempts = 0u32;
        for credential in &history {
            if attempts >= self.max_refresh_attempts {
                break;
            }
            attempts += 1;

            match self.withings.refresh_token(&credential.refresh_token).await {
                Ok(grant) => return self.persist_grant(account_id, grant).await,
                Err(AppError::Authentication(reason)) => {
                    tracing::warn!(
                        account_id,
                        credential_id = %credential.id,
                        attempt = attempts,
                        reason = %reason,
                        "Refresh rejected, falling back to older refresh token"
                    );
                }
                Err(other) => return Err(other),
            }
        }

        Err(AppError::Authentication(format!(
            "token refresh failed for account {} after {} attempts",
            account_id, attempts
        )))
    }

    async fn persist_grant(
        &self,
        account_id: i64,
        grant: TokenGrant,
    ) -> Result<Credential, AppError> {
        let credential = Credential::issue(
            account_id,
            grant.access_token,
            grant.refresh_token,
            grant.expires_in,
            grant.scope.as_deref().unwrap_or(""),
            grant.token_type.unwrap_or_else(|| "Bearer".to_string()),
            Utc::now(),
        );
        self.store.insert_credential(&credential).await?;
        tracing::info!(
            account_id,
            credential_id = %credential.id,
            valid_until = %credential.valid_until,
            "Stored new credential"
        );
        Ok(credential)
    }
}

/// Order credentials newest-first by expiry.
fn latest_first(mut credentials: Vec<Credential>) -> Vec<Credential> {
    credentials.sort_by(|a, b| b.valid_until.cmp(&a.valid_until));
    credentials
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn credential_expiring_at(offset_hours: i64) -> Credential {
        let issued = Utc.with_ymd_and_hms(2021, 3, 1, 12, 0, 0).unwrap()
            + Duration::hours(offset_hours);
        Credential::issue(
            7,
            format!("access-{}", offset_hours),
            format!("refresh-{}", offset_hours),
            10800,
            "user.metrics",
            "Bearer".to_string(),
            issued,
        )
    }

    #[test]
    fn test_latest_first_orders_by_expiry() {
        let sorted = latest_first(vec![
            credential_expiring_at(1),
            credential_expiring_at(5),
            credential_expiring_at(3),
        ]);
        assert_eq!(sorted[0].access_token, "access-5");
        assert_eq!(sorted[2].access_token, "access-1");
    }
}
