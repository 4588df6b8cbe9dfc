// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with: ./scripts/test-with-emulator.sh
//!
//! The emulator provides a clean state for each test run.

use chrono::{TimeZone, Utc};
use withings_connector::models::{ActivityKind, ActivityRaw, Credential, SleepSummary, Weight};
use withings_connector::store::{RecordKind, Store};

mod common;
use common::{test_store, unique_account_id};

fn weight_at(account_id: i64, epoch: i64) -> Weight {
    Weight {
        weight: Some(85.75),
        device_id: "dev-9".to_string(),
        source: "device".to_string(),
        ..Weight::empty(account_id, Utc.timestamp_opt(epoch, 0).single().unwrap())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CREDENTIAL TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_credential_lifecycle_roundtrip() {
    require_emulator!();

    let store = test_store().await;
    let account_id = unique_account_id();

    // Initially nothing on file
    let before = store.credentials_for_account(account_id).await.unwrap();
    assert!(before.is_empty(), "No credentials should exist initially");

    let issued = Utc.with_ymd_and_hms(2021, 3, 1, 9, 0, 0).unwrap();
    let credential = Credential::issue(
        account_id,
        "access-abc".to_string(),
        "refresh-abc".to_string(),
        10_800,
        "user.metrics,user.activity",
        "Bearer".to_string(),
        issued,
    );
    store.insert_credential(&credential).await.unwrap();

    // Verify round trip
    let all = store.credentials_for_account(account_id).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].access_token, "access-abc");
    assert_eq!(all[0].scope, vec!["user.metrics", "user.activity"]);
    assert_eq!(all[0].valid_until, issued + chrono::Duration::hours(3));

    let valid = store.valid_credentials(account_id).await.unwrap();
    assert_eq!(valid.len(), 1, "Fresh credential should be valid");

    // Expire it; the record stays on file but drops out of the valid set
    store.mark_credential_expired(&credential.id).await.unwrap();

    let valid_after = store.valid_credentials(account_id).await.unwrap();
    assert!(valid_after.is_empty(), "Expired credential should not be valid");
    let all_after = store.credentials_for_account(account_id).await.unwrap();
    assert_eq!(all_after.len(), 1, "Expired credential should stay on file");
    assert!(!all_after[0].is_valid());

    println!("✓ Credential lifecycle verified: account_id={}", account_id);
}

#[tokio::test]
async fn test_valid_credentials_filters_per_account() {
    require_emulator!();

    let store = test_store().await;
    let account_a = unique_account_id();
    let account_b = account_a + 1;

    let issued = Utc.with_ymd_and_hms(2021, 3, 1, 9, 0, 0).unwrap();
    for (account_id, token) in [(account_a, "token-a"), (account_b, "token-b")] {
        let credential = Credential::issue(
            account_id,
            token.to_string(),
            format!("{token}-refresh"),
            10_800,
            "user.metrics",
            "Bearer".to_string(),
            issued,
        );
        store.insert_credential(&credential).await.unwrap();
    }

    let valid_a = store.valid_credentials(account_a).await.unwrap();
    assert_eq!(valid_a.len(), 1);
    assert_eq!(valid_a[0].access_token, "token-a");

    println!("✓ Credential account scoping verified: account_id={}", account_a);
}

// ═══════════════════════════════════════════════════════════════════════════
// RECORD TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_record_insert_is_idempotent() {
    require_emulator!();

    let store = test_store().await;
    let account_id = unique_account_id();
    let record = weight_at(account_id, 1_594_768_740);

    let first = store.insert_weight(&record).await.unwrap();
    assert!(first, "First insert should create the document");

    let second = store.insert_weight(&record).await.unwrap();
    assert!(!second, "Second insert should be skipped (idempotent)");

    println!("✓ Idempotent insert verified: account_id={}", account_id);
}

#[tokio::test]
async fn test_latest_record_time_returns_newest() {
    require_emulator!();

    let store = test_store().await;
    let account_id = unique_account_id();

    // No history yet
    let empty = store
        .latest_record_time(account_id, RecordKind::Weight)
        .await
        .unwrap();
    assert!(empty.is_none(), "No records means no resume point");

    // Insert out of order; the resume query must pick the newest
    store
        .insert_weight(&weight_at(account_id, 1_594_768_740))
        .await
        .unwrap();
    store
        .insert_weight(&weight_at(account_id, 1_594_682_340))
        .await
        .unwrap();

    let latest = store
        .latest_record_time(account_id, RecordKind::Weight)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.timestamp(), 1_594_768_740);

    println!("✓ Resume point verified: account_id={}", account_id);
}

#[tokio::test]
async fn test_sleep_records_resume_from_end_date() {
    require_emulator!();

    let store = test_store().await;
    let account_id = unique_account_id();

    let start = Utc.with_ymd_and_hms(2020, 7, 14, 22, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2020, 7, 15, 6, 30, 0).unwrap();
    let summary = SleepSummary {
        account_id,
        start_date: start,
        end_date: end,
        device_type: "sleep_monitor".to_string(),
        device_id: 32,
        breathing_disturbances_intensity: 0,
        duration_to_sleep: 300,
        duration_to_wakeup: 120,
        snoring: 0,
        snoring_episode_count: 0,
        wakeup_count: 2,
        wakeup_duration: 480,
        deep_sleep_duration: Some(5400),
        light_sleep_duration: Some(9000),
        rem_sleep_duration: Some(3600),
        hr_average: Some(58),
        hr_max: Some(71),
        hr_min: Some(49),
        rr_average: Some(14),
        rr_max: Some(17),
        rr_min: Some(12),
        sleep_score: Some(82),
    };
    store.insert_sleep_summary(&summary).await.unwrap();

    let latest = store
        .latest_record_time(account_id, RecordKind::SleepSummary)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest, end, "Sleep records resume from their end date");

    println!("✓ Sleep resume point verified: account_id={}", account_id);
}

#[tokio::test]
async fn test_latest_record_time_scopes_by_account() {
    require_emulator!();

    let store = test_store().await;
    let account_id = unique_account_id();
    let other_account = account_id + 1;

    let point = ActivityRaw {
        account_id,
        measured_at: Utc.timestamp_opt(1_594_768_740, 0).single().unwrap(),
        measurement_type: ActivityKind::Steps,
        device_type: "Activite Steel HR".to_string(),
        device_id: 55,
        duration: 60,
        steps: Some(12),
        heart_rate: None,
        distance: None,
        elevation: None,
        calories: None,
    };
    store.insert_activity_raw(&point).await.unwrap();

    let own = store
        .latest_record_time(account_id, RecordKind::ActivityRaw)
        .await
        .unwrap();
    assert!(own.is_some());

    let foreign = store
        .latest_record_time(other_account, RecordKind::ActivityRaw)
        .await
        .unwrap();
    assert!(
        foreign.is_none(),
        "Another account's records must not provide a resume point"
    );

    println!("✓ Account scoping verified: account_id={}", account_id);
}
