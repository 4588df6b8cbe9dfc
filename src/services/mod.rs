// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod ingest;
pub mod planner;
pub mod token;
pub mod withings;

pub use ingest::{EntityFamily, SyncReport, SyncService};
pub use planner::{SyncOrigin, SyncPlanner, SyncWindow};
pub use token::TokenService;
pub use withings::WithingsClient;
