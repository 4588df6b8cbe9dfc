// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth credential records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a stored credential.
///
/// A credential flips from `Valid` to `Expired` exactly once (expiry
/// detection or reconciliation) and is never deleted or resurrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    Valid,
    Expired,
}

/// One OAuth grant for one vendor account.
///
/// Every refresh produces a new record; existing records are only ever
/// mutated to flip their status, so the chain doubles as an audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Document ID: `{account_id}-{issued_at_millis}`
    pub id: String,
    /// Withings user ID this grant belongs to
    pub account_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    /// Grant lifetime reported by the vendor, in seconds
    pub expires_in: i64,
    /// Granted scopes (comma-split from the vendor response)
    pub scope: Vec<String>,
    /// Usually "Bearer"
    pub token_type: String,
    pub issued_at: DateTime<Utc>,
    /// `issued_at + expires_in`
    pub valid_until: DateTime<Utc>,
    pub status: CredentialStatus,
}

impl Credential {
    /// Build a new `Valid` credential from a vendor token grant.
    pub fn issue(
        account_id: i64,
        access_token: String,
        refresh_token: String,
        expires_in: i64,
        scope: &str,
        token_type: String,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let scope = scope
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            id: format!("{}-{}", account_id, issued_at.timestamp_millis()),
            account_id,
            access_token,
            refresh_token,
            expires_in,
            scope,
            token_type,
            issued_at,
            valid_until: issued_at + chrono::Duration::seconds(expires_in),
            status: CredentialStatus::Valid,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == CredentialStatus::Valid
    }

    /// Whether the grant has outlived its vendor-reported lifetime.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_until < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_computes_validity_window() {
        let issued = DateTime::from_timestamp(1_600_000_000, 0).unwrap();
        let cred = Credential::issue(
            123,
            "access".to_string(),
            "refresh".to_string(),
            10_800,
            "user.metrics,user.activity",
            "Bearer".to_string(),
            issued,
        );

        assert_eq!(cred.id, "123-1600000000000");
        assert_eq!(cred.valid_until - cred.issued_at, chrono::Duration::hours(3));
        assert_eq!(cred.scope, vec!["user.metrics", "user.activity"]);
        assert!(cred.is_valid());
        assert!(!cred.is_expired_at(issued + chrono::Duration::hours(2)));
        assert!(cred.is_expired_at(issued + chrono::Duration::hours(4)));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&CredentialStatus::Expired).unwrap();
        assert_eq!(json, "\"expired\"");
    }
}
