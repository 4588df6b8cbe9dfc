// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{Duration, Utc};
use std::sync::Arc;
use withings_connector::config::Config;
use withings_connector::models::Credential;
use withings_connector::routes::create_router;
use withings_connector::services::{SyncPlanner, SyncService, TokenService, WithingsClient};
use withings_connector::store::firestore::FirestoreStore;
use withings_connector::store::memory::MemoryStore;
use withings_connector::store::Store;
use withings_connector::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test store connected to the Firestore emulator.
#[allow(dead_code)]
pub async fn test_store() -> FirestoreStore {
    FirestoreStore::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Generate a unique account ID for test isolation.
#[allow(dead_code)]
pub fn unique_account_id() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    (SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
        % 1_000_000_000_000) as i64
}

/// Credential issued `hours_ago`, valid for three hours from issuance.
#[allow(dead_code)]
pub fn credential_issued(account_id: i64, hours_ago: i64) -> Credential {
    Credential::issue(
        account_id,
        format!("access-{}", hours_ago),
        format!("refresh-{}", hours_ago),
        10800,
        "user.metrics,user.activity",
        "Bearer".to_string(),
        Utc::now() - Duration::hours(hours_ago),
    )
}

/// Wire the full application over the in-memory store, pointing the
/// vendor client at a mock server.
#[allow(dead_code)]
pub fn offline_state(vendor_url: &str, config: Config) -> (Arc<AppState>, Arc<MemoryStore>) {
    let memory = Arc::new(MemoryStore::new());
    let store: Arc<dyn Store> = memory.clone();

    let withings = WithingsClient::new(config.client_id.clone(), config.client_secret.clone())
        .with_base_url(vendor_url);
    let tokens = TokenService::new(
        store.clone(),
        withings.clone(),
        config.callback_url.clone(),
        config.max_refresh_attempts,
    );
    let planner = SyncPlanner::new(store.clone());
    let sync = SyncService::new(store.clone(), withings.clone(), tokens.clone(), planner);

    let state = Arc::new(AppState {
        config,
        store,
        withings,
        tokens,
        sync,
    });
    (state, memory)
}

/// Router over offline state. Returns the store for assertions.
#[allow(dead_code)]
pub fn offline_app(vendor_url: &str, config: Config) -> (axum::Router, Arc<MemoryStore>) {
    let (state, memory) = offline_state(vendor_url, config);
    (create_router(state), memory)
}

/// Collect a response body as text.
#[allow(dead_code)]
pub async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body read");
    String::from_utf8_lossy(&bytes).to_string()
}
