// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use meetly_server::config::Config;
use meetly_server::db::FirestoreDb;
use meetly_server::middleware::auth::create_jwt;
use meetly_server::models::{Category, Meetup, User};
use meetly_server::routes::create_router;
use meetly_server::services::{LifecycleService, MailerService, ParticipationService};
use meetly_server::AppState;
use std::sync::Arc;

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

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::default();
    let db = test_db_offline();
    let mailer = MailerService::new_mock();

    let participation = ParticipationService::new(db.clone(), mailer);
    let lifecycle = LifecycleService::new(db.clone());

    let state = Arc::new(AppState {
        config,
        db,
        participation,
        lifecycle,
    });

    (create_router(state.clone()), state)
}

/// Create a test app on top of a given database handle (emulator or mock).
#[allow(dead_code)]
pub fn create_app_with_db(db: FirestoreDb) -> (axum::Router, Arc<AppState>) {
    let config = Config::default();
    let participation = ParticipationService::new(db.clone(), MailerService::new_mock());
    let lifecycle = LifecycleService::new(db.clone());

    let state = Arc::new(AppState {
        config,
        db,
        participation,
        lifecycle,
    });

    (create_router(state.clone()), state)
}

/// Create a signed session token for tests.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    create_jwt(user_id, signing_key).expect("JWT creation should succeed")
}

/// Participation and lifecycle services wired to the emulator db.
#[allow(dead_code)]
pub async fn test_services() -> (FirestoreDb, ParticipationService, LifecycleService) {
    let db = test_db().await;
    let participation = ParticipationService::new(db.clone(), MailerService::new_mock());
    let lifecycle = LifecycleService::new(db.clone());
    (db, participation, lifecycle)
}

/// Helper to create a basic test user.
#[allow(dead_code)]
pub fn test_user(name: &str) -> User {
    let id = uuid::Uuid::new_v4().to_string();
    User {
        email: format!("{}-{}@example.com", name, id),
        id,
        name: name.to_string(),
        interests: vec![],
        events_attended: vec![],
        events_created: vec![],
        created_at: chrono::Utc::now(),
    }
}

/// Helper to create a basic active meetup document.
#[allow(dead_code)]
pub fn test_meetup(creator: &User, max_participants: u32) -> Meetup {
    Meetup {
        id: uuid::Uuid::new_v4().to_string(),
        title: "Evening run".to_string(),
        description: "Easy 5k around the park".to_string(),
        category: Category::Sports,
        location: "Parco Sempione".to_string(),
        coordinates: None,
        date: chrono::Utc::now() + chrono::Duration::days(7),
        max_participants,
        participants: vec![],
        creator_id: creator.id.clone(),
        creator_name: creator.name.clone(),
        is_finished: false,
        ratings: Default::default(),
        average_rating: 0.0,
        created_at: chrono::Utc::now(),
    }
}
