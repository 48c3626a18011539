// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Meetly: backend API for the meetup application
//!
//! This crate owns the meetup lifecycle (active -> finished), the
//! participation rules (join/leave/delete/rate with their membership
//! cascades) and the identity layer, persisted in Firestore. Clients keep
//! their live-query subscriptions against the same collections; this
//! server is the single writer that those subscriptions observe.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::FirestoreDb;
use services::{LifecycleService, ParticipationService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub participation: ParticipationService,
    pub lifecycle: LifecycleService,
}
