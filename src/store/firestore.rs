// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed `Store` implementation.
//!
//! One collection per entity type; the document ID is the record's
//! natural key, so idempotent ingestion is a document create that
//! tolerates already-exists conflicts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::errors::FirestoreError;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{
    ActivityRaw, ActivitySummary, Credential, CredentialStatus, SleepRaw, SleepSummary, Weight,
};
use crate::store::{collections, RecordKind, Store};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Create a document keyed by its natural key; an already-existing
    /// document means the record was ingested before.
    async fn insert_if_absent<T>(
        &self,
        collection: &str,
        document_id: &str,
        record: &T,
    ) -> Result<bool, AppError>
    where
        T: Serialize + for<'de> Deserialize<'de> + Send + Sync,
    {
        let outcome: Result<(), FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collection)
            .document_id(document_id)
            .object(record)
            .execute()
            .await;

        match outcome {
            Ok(()) => Ok(true),
            Err(FirestoreError::DataConflictError(_)) => Ok(false),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }
}

/// Deserialization probe for resume queries: only the record kind's time
/// attribute is read, whichever entity shape the collection holds.
#[derive(Deserialize)]
struct TimestampProbe {
    #[serde(default)]
    measured_at: Option<DateTime<Utc>>,
    #[serde(default)]
    end_date: Option<DateTime<Utc>>,
}

#[async_trait]
impl Store for FirestoreStore {
    async fn insert_credential(&self, credential: &Credential) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::CREDENTIALS)
            .document_id(&credential.id)
            .object(credential)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn credentials_for_account(
        &self,
        account_id: i64,
    ) -> Result<Vec<Credential>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::CREDENTIALS)
            .filter(move |q| q.field("account_id").eq(account_id))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn valid_credentials(&self, account_id: i64) -> Result<Vec<Credential>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::CREDENTIALS)
            .filter(move |q| {
                q.for_all([
                    q.field("account_id").eq(account_id),
                    q.field("status").eq("valid"),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn mark_credential_expired(&self, credential_id: &str) -> Result<(), AppError> {
        let client = self.get_client()?;

        let found: Option<Credential> = client
            .fluent()
            .select()
            .by_id_in(collections::CREDENTIALS)
            .obj()
            .one(credential_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut credential = found
            .ok_or_else(|| AppError::NotFound(format!("credential {credential_id}")))?;
        credential.status = CredentialStatus::Expired;

        let _: () = client
            .fluent()
            .update()
            .in_col(collections::CREDENTIALS)
            .document_id(credential_id)
            .object(&credential)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn insert_sleep_summary(&self, record: &SleepSummary) -> Result<bool, AppError> {
        self.insert_if_absent(collections::SLEEP_SUMMARIES, &record.document_id(), record)
            .await
    }

    async fn insert_sleep_raw(&self, record: &SleepRaw) -> Result<bool, AppError> {
        self.insert_if_absent(collections::SLEEP_RAW, &record.document_id(), record)
            .await
    }

    async fn insert_activity_summary(&self, record: &ActivitySummary) -> Result<bool, AppError> {
        self.insert_if_absent(
            collections::ACTIVITY_SUMMARIES,
            &record.document_id(),
            record,
        )
        .await
    }

    async fn insert_activity_raw(&self, record: &ActivityRaw) -> Result<bool, AppError> {
        self.insert_if_absent(collections::ACTIVITY_RAW, &record.document_id(), record)
            .await
    }

    async fn insert_weight(&self, record: &Weight) -> Result<bool, AppError> {
        self.insert_if_absent(collections::WEIGHTS, &record.document_id(), record)
            .await
    }

    async fn latest_record_time(
        &self,
        account_id: i64,
        kind: RecordKind,
    ) -> Result<Option<DateTime<Utc>>, AppError> {
        let probes: Vec<TimestampProbe> = self
            .get_client()?
            .fluent()
            .select()
            .from(kind.collection())
            .filter(move |q| q.field("account_id").eq(account_id))
            .order_by([(
                kind.time_field(),
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let latest = probes.into_iter().next().and_then(|probe| match kind {
            RecordKind::SleepSummary | RecordKind::SleepRaw => probe.end_date,
            _ => probe.measured_at,
        });
        Ok(latest)
    }
}
