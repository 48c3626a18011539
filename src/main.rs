// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meetly API Server
//!
//! Serves the meetup application: registration and login, meetup
//! creation and browsing, join/leave/delete/rate, and the lifecycle
//! updater that flips past-due meetups to finished.

use meetly_server::{
    config::Config,
    db::FirestoreDb,
    services::{LifecycleService, MailerService, ParticipationService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Meetly API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Initialize the mail relay (disabled when no API key is configured)
    if config.sendgrid_api_key.is_none() {
        tracing::warn!("SENDGRID_API_KEY not set, notification emails are disabled");
    }
    let mailer = MailerService::new(config.sendgrid_api_key.clone(), config.mail_from.clone());

    // Business logic services share the Firestore handle
    let participation = ParticipationService::new(db.clone(), mailer);
    let lifecycle = LifecycleService::new(db.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        participation,
        lifecycle,
    });

    // Build router
    let app = meetly_server::routes::create_router(state);

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
                .add_directive("meetly_server=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
