// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Canonical data models for the connector.

pub mod activity;
pub mod credential;
pub mod sleep;
pub mod weight;

pub use activity::{ActivityKind, ActivityRaw, ActivitySummary};
pub use credential::{Credential, CredentialStatus};
pub use sleep::{SeriesPoint, SleepRaw, SleepSummary};
pub use weight::Weight;
