// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Withings Connector Server
//!
//! Receives vendor data notifications, plans sync windows and ingests
//! activity, sleep and body-measurement records into Firestore.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use withings_connector::{
    config::Config,
    services::{SyncPlanner, SyncService, TokenService, WithingsClient},
    store::firestore::FirestoreStore,
    store::Store,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Withings connector");

    // Initialize Firestore-backed record store
    let store: Arc<dyn Store> = Arc::new(
        FirestoreStore::new(&config.gcp_project_id)
            .await
            .expect("Failed to connect to Firestore"),
    );
    tracing::info!(project = %config.gcp_project_id, "Record store initialized");

    // Vendor client and token lifecycle
    let withings = WithingsClient::new(config.client_id.clone(), config.client_secret.clone())
        .with_base_url(&config.api_base_url);
    let tokens = TokenService::new(
        store.clone(),
        withings.clone(),
        config.callback_url.clone(),
        config.max_refresh_attempts,
    );

    // Sync pipeline
    let planner = SyncPlanner::new(store.clone());
    let sync = SyncService::new(store.clone(), withings.clone(), tokens.clone(), planner);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        withings,
        tokens,
        sync,
    });

    // Build router
    let app = withings_connector::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("withings_connector=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
