// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Withings connector: pull health-tracker data into Firestore.
//!
//! This crate syncs activity, sleep and body-measurement records from
//! the Withings API, keeping OAuth credentials fresh and resuming from
//! the newest stored record when the vendor notifies us of new data.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use services::{SyncService, TokenService, WithingsClient};
use store::Store;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub withings: WithingsClient,
    pub tokens: TokenService,
    pub sync: SyncService,
}
