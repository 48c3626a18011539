// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile storage)
//! - Credentials (password hashes)
//! - Meetups (lifecycle, participation, ratings)
//!
//! Participation updates touch two documents (the meetup's participant set
//! and the user's membership lists). Each pair runs inside a Firestore
//! transaction so the relationship can never end up one-sided, and the
//! capacity check happens on the read registered by that same transaction,
//! which closes the check-then-act overbooking race.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{average_rating, Meetup, User, UserCredentials};
use firestore::{path, paths};
use futures_util::{stream, StreamExt};

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
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

        // Use ExternalJwtFunctionSource to provide a dummy token without needing async-trait
        // or a custom TokenSource implementation struct.
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

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by id.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Look up a user by email (for login and duplicate registration checks).
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let mut users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("email").eq(email.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(users.pop())
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a user profile.
    pub async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(user_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Fetch several users by id, concurrently with a limit.
    ///
    /// Ids with no matching document are skipped; result order is not
    /// guaranteed.
    pub async fn get_users_by_ids(&self, user_ids: &[String]) -> Result<Vec<User>, AppError> {
        let client = self.get_client()?;

        let users = stream::iter(user_ids.to_vec())
            .map(|user_id| async move {
                client
                    .fluent()
                    .select()
                    .by_id_in(collections::USERS)
                    .obj::<User>()
                    .one(&user_id)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<User>, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Option<User>>, AppError>>()?;

        Ok(users.into_iter().flatten().collect())
    }

    /// List all users (reconciliation scan).
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Credential Operations ───────────────────────────────────

    /// Get the stored password hash for a user.
    pub async fn get_credentials(&self, user_id: &str) -> Result<Option<UserCredentials>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CREDENTIALS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store the password hash for a user.
    pub async fn set_credentials(
        &self,
        user_id: &str,
        credentials: &UserCredentials,
    ) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CREDENTIALS)
            .document_id(user_id)
            .object(credentials)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete credentials (account deletion).
    pub async fn delete_credentials(&self, user_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::CREDENTIALS)
            .document_id(user_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Meetup Queries ──────────────────────────────────────────

    /// Get a meetup by id.
    pub async fn get_meetup(&self, meetup_id: &str) -> Result<Option<Meetup>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::MEETUPS)
            .obj()
            .one(meetup_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a meetup document as-is (seeding and backfills; normal
    /// creation goes through [`FirestoreDb::create_meetup`]).
    pub async fn upsert_meetup(&self, meetup: &Meetup) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::MEETUPS)
            .document_id(&meetup.id)
            .object(meetup)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List all meetups that have not finished yet, soonest first.
    ///
    /// Category filtering happens after the fetch, on the caller's side;
    /// the query itself only narrows on the lifecycle flag.
    pub async fn list_active_meetups(&self) -> Result<Vec<Meetup>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::MEETUPS)
            .filter(|q| q.field("is_finished").eq(false))
            .order_by([("date", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List meetups a user participates in.
    pub async fn list_meetups_for_participant(
        &self,
        user_id: &str,
    ) -> Result<Vec<Meetup>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::MEETUPS)
            .filter(move |q| q.field("participants").array_contains(user_id.clone()))
            .order_by([("date", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List meetups created by a user.
    pub async fn list_meetups_for_creator(&self, user_id: &str) -> Result<Vec<Meetup>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::MEETUPS)
            .filter(move |q| q.field("creator_id").eq(user_id.clone()))
            .order_by([("date", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List every meetup (reconciliation scan).
    pub async fn list_all_meetups(&self) -> Result<Vec<Meetup>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::MEETUPS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Atomic Participation Operations ─────────────────────────

    /// Atomically create a meetup and register the creator's membership.
    ///
    /// The meetup document and the creator's `events_attended` /
    /// `events_created` entries are written in one transaction.
    pub async fn create_meetup(&self, meetup: &Meetup) -> Result<(), AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::MEETUPS)
            .document_id(&meetup.id)
            .object(meetup)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add meetup to transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&meetup.creator_id)
            .transforms(|t| {
                t.fields([
                    t.field(path!(User::events_attended))
                        .append_missing_elements([meetup.id.clone()]),
                    t.field(path!(User::events_created))
                        .append_missing_elements([meetup.id.clone()]),
                ])
            })
            .only_transform()
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add membership to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(())
    }

    /// Atomically join a meetup.
    ///
    /// Reads the meetup inside a transaction, enforces the preconditions
    /// (exists, still active, capacity, not already a member), then adds the
    /// user to the meetup's `participants` and the meetup to the user's
    /// `events_attended` via set-add transforms. Concurrent joins conflict at
    /// commit and retry against fresh data, so `participants` can never
    /// exceed `max_participants`.
    ///
    /// Returns the meetup as it looks after the join.
    pub async fn join_meetup(&self, meetup_id: &str, user_id: &str) -> Result<Meetup, AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let meetup: Option<Meetup> = client
            .fluent()
            .select()
            .by_id_in(collections::MEETUPS)
            .obj()
            .one(meetup_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to read meetup in transaction: {}", e)))?;

        let Some(mut meetup) = meetup else {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFound(format!("Meetup {} not found", meetup_id)));
        };

        if meetup.is_finished {
            let _ = transaction.rollback().await;
            return Err(AppError::MeetupFinished);
        }
        if meetup.has_participant(user_id) {
            let _ = transaction.rollback().await;
            return Err(AppError::AlreadyJoined);
        }
        if meetup.is_full() {
            let _ = transaction.rollback().await;
            return Err(AppError::MeetupFull);
        }

        client
            .fluent()
            .update()
            .in_col(collections::MEETUPS)
            .document_id(meetup_id)
            .transforms(|t| {
                t.fields([t
                    .field(path!(Meetup::participants))
                    .append_missing_elements([user_id.to_string()])])
            })
            .only_transform()
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add participant update: {}", e))
            })?;

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(user_id)
            .transforms(|t| {
                t.fields([t
                    .field(path!(User::events_attended))
                    .append_missing_elements([meetup_id.to_string()])])
            })
            .only_transform()
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add membership update: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        meetup.participants.push(user_id.to_string());
        Ok(meetup)
    }

    /// Atomically leave a meetup.
    ///
    /// Removing a non-member is a no-op, not an error; the set-remove
    /// transform is naturally idempotent. Returns the meetup and whether a
    /// membership was actually removed.
    pub async fn leave_meetup(
        &self,
        meetup_id: &str,
        user_id: &str,
    ) -> Result<(Meetup, bool), AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let meetup: Option<Meetup> = client
            .fluent()
            .select()
            .by_id_in(collections::MEETUPS)
            .obj()
            .one(meetup_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to read meetup in transaction: {}", e)))?;

        let Some(mut meetup) = meetup else {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFound(format!("Meetup {} not found", meetup_id)));
        };

        if !meetup.has_participant(user_id) {
            let _ = transaction.rollback().await;
            return Ok((meetup, false));
        }

        client
            .fluent()
            .update()
            .in_col(collections::MEETUPS)
            .document_id(meetup_id)
            .transforms(|t| {
                t.fields([t
                    .field(path!(Meetup::participants))
                    .remove_all_from_array([user_id.to_string()])])
            })
            .only_transform()
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add participant update: {}", e))
            })?;

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(user_id)
            .transforms(|t| {
                t.fields([t
                    .field(path!(User::events_attended))
                    .remove_all_from_array([meetup_id.to_string()])])
            })
            .only_transform()
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add membership update: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        meetup.participants.retain(|id| id != user_id);
        Ok((meetup, true))
    }

    /// Atomically record a rating.
    ///
    /// Sets `ratings[user_id] = score` (an overwrite if the user rated
    /// before, never a second entry) and recomputes `average_rating` from
    /// the full map; both fields are written in one single-document update.
    pub async fn rate_meetup(
        &self,
        meetup_id: &str,
        user_id: &str,
        score: u8,
    ) -> Result<Meetup, AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let meetup: Option<Meetup> = client
            .fluent()
            .select()
            .by_id_in(collections::MEETUPS)
            .obj()
            .one(meetup_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to read meetup in transaction: {}", e)))?;

        let Some(mut meetup) = meetup else {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFound(format!("Meetup {} not found", meetup_id)));
        };

        if !meetup.is_finished {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFinished);
        }
        if !meetup.has_participant(user_id) {
            let _ = transaction.rollback().await;
            return Err(AppError::NotParticipant);
        }

        meetup.ratings.insert(user_id.to_string(), score);
        meetup.average_rating = average_rating(&meetup.ratings);

        client
            .fluent()
            .update()
            .fields(paths!(Meetup::{ratings, average_rating}))
            .in_col(collections::MEETUPS)
            .document_id(meetup_id)
            .object(&meetup)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add rating update: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(meetup)
    }

    // ─── Lifecycle Operations ────────────────────────────────────

    /// Flip a meetup to finished.
    ///
    /// Single-field update; participants and ratings are never touched, and
    /// nothing in this crate writes `is_finished = false`, so the flag is
    /// monotonic.
    pub async fn mark_meetup_finished(&self, meetup: &Meetup) -> Result<(), AppError> {
        let mut finished = meetup.clone();
        finished.is_finished = true;

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths!(Meetup::{is_finished}))
            .in_col(collections::MEETUPS)
            .document_id(&meetup.id)
            .object(&finished)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Rewrite a meetup's participant set (reconciliation repair).
    pub async fn update_meetup_participants(&self, meetup: &Meetup) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths!(Meetup::{participants}))
            .in_col(collections::MEETUPS)
            .document_id(&meetup.id)
            .object(meetup)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Meetup Deletion ─────────────────────────────────────────

    /// Delete a meetup with its membership cascade.
    ///
    /// The meetup id is removed from every participant's membership lists
    /// first, in batched transactions; the meetup document is deleted only
    /// after every per-participant update succeeded. If the cascade is
    /// interrupted the meetup document survives as a recovery anchor, so a
    /// retry can discover which references remain; deleting it first would
    /// orphan them.
    ///
    /// Returns the number of users whose lists were updated.
    pub async fn delete_meetup_cascade(&self, meetup: &Meetup) -> Result<usize, AppError> {
        let client = self.get_client()?;

        let mut members: Vec<String> = meetup.participants.clone();
        if !members.iter().any(|id| id == &meetup.creator_id) {
            // Creator is conventionally a participant, but do not rely on it
            members.push(meetup.creator_id.clone());
        }

        for chunk in members.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for user_id in chunk {
                client
                    .fluent()
                    .update()
                    .in_col(collections::USERS)
                    .document_id(user_id)
                    .transforms(|t| {
                        t.fields([
                            t.field(path!(User::events_attended))
                                .remove_all_from_array([meetup.id.clone()]),
                            t.field(path!(User::events_created))
                                .remove_all_from_array([meetup.id.clone()]),
                        ])
                    })
                    .only_transform()
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add cascade update for user {}: {}",
                            user_id, e
                        ))
                    })?;
            }

            transaction
                .commit()
                .await
                .map_err(|e| AppError::Database(format!("Failed to commit cascade batch: {}", e)))?;
        }

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::MEETUPS)
            .document_id(&meetup.id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(
            meetup_id = %meetup.id,
            members = members.len(),
            "Meetup deleted with membership cascade"
        );

        Ok(members.len())
    }
}
