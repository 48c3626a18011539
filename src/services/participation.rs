// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Participation service.
//!
//! The single place where meetups are created, joined, left, deleted and
//! rated. Every view goes through this service, so the membership rules
//! exist exactly once instead of being repeated per screen.

use chrono::{DateTime, Utc};

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{Category, Coordinates, Meetup, User};
use crate::services::MailerService;

/// Everything needed to create a meetup, already syntax-validated at the
/// request boundary.
#[derive(Debug, Clone)]
pub struct CreateMeetupInput {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub location: String,
    pub coordinates: Option<Coordinates>,
    pub date: DateTime<Utc>,
    pub max_participants: u32,
}

/// Join/leave/delete/rate operations over the meetup and user collections.
#[derive(Clone)]
pub struct ParticipationService {
    db: FirestoreDb,
    mailer: MailerService,
}

impl ParticipationService {
    pub fn new(db: FirestoreDb, mailer: MailerService) -> Self {
        Self { db, mailer }
    }

    /// Create a meetup. The creator is the first participant, and the
    /// meetup id lands in their `events_attended` and `events_created` in
    /// the same transaction that writes the meetup document.
    pub async fn create(&self, creator: &User, input: CreateMeetupInput) -> Result<Meetup> {
        let now = Utc::now();

        if input.date <= now {
            return Err(AppError::BadRequest(
                "Meetup date must be in the future".to_string(),
            ));
        }
        if input.max_participants == 0 {
            return Err(AppError::BadRequest(
                "Max participants must be a positive integer".to_string(),
            ));
        }

        let meetup = Meetup {
            id: uuid::Uuid::new_v4().to_string(),
            title: input.title,
            description: input.description,
            category: input.category,
            location: input.location,
            coordinates: input.coordinates,
            date: input.date,
            max_participants: input.max_participants,
            participants: vec![creator.id.clone()],
            creator_id: creator.id.clone(),
            creator_name: creator.name.clone(),
            is_finished: false,
            ratings: Default::default(),
            average_rating: 0.0,
            created_at: now,
        };

        self.db.create_meetup(&meetup).await?;

        tracing::info!(
            meetup_id = %meetup.id,
            creator_id = %creator.id,
            category = ?meetup.category,
            "Meetup created"
        );

        Ok(meetup)
    }

    /// Join a meetup.
    ///
    /// The capacity and membership checks run inside the database
    /// transaction; see [`FirestoreDb::join_meetup`]. The confirmation
    /// email is best-effort and never rolls back the join.
    pub async fn join(&self, meetup_id: &str, user: &User) -> Result<Meetup> {
        let meetup = self.db.join_meetup(meetup_id, &user.id).await?;

        tracing::info!(
            meetup_id,
            user_id = %user.id,
            participants = meetup.participants.len(),
            max = meetup.max_participants,
            "User joined meetup"
        );

        if let Err(e) = self.mailer.send_join_email(&user.email, &meetup.title).await {
            tracing::warn!(error = %e, user_id = %user.id, "Failed to send join confirmation email");
        }

        Ok(meetup)
    }

    /// Leave a meetup. Leaving one the user never joined is a no-op.
    pub async fn leave(&self, meetup_id: &str, user_id: &str) -> Result<Meetup> {
        let (meetup, removed) = self.db.leave_meetup(meetup_id, user_id).await?;

        if removed {
            tracing::info!(meetup_id, user_id, "User left meetup");
        } else {
            tracing::debug!(meetup_id, user_id, "Leave was a no-op (not a participant)");
        }

        Ok(meetup)
    }

    /// Delete a meetup (creator only) with the full membership cascade,
    /// then notify the other participants. Notification failures are
    /// logged per recipient and never undo the deletion.
    ///
    /// Returns the number of users whose membership lists were updated.
    pub async fn delete(&self, meetup_id: &str, caller_id: &str) -> Result<usize> {
        let meetup = self
            .db
            .get_meetup(meetup_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Meetup {} not found", meetup_id)))?;

        if meetup.creator_id != caller_id {
            return Err(AppError::Forbidden(
                "Only the creator can delete a meetup".to_string(),
            ));
        }

        // Resolve recipients before the cascade rewrites their lists
        let recipients: Vec<String> = meetup
            .participants
            .iter()
            .filter(|id| id.as_str() != caller_id)
            .cloned()
            .collect();
        let recipients = self.db.get_users_by_ids(&recipients).await?;

        let removed = self.db.delete_meetup_cascade(&meetup).await?;

        tracing::info!(
            meetup_id,
            caller_id,
            removed,
            "Meetup deleted by creator"
        );

        for user in &recipients {
            if let Err(e) = self
                .mailer
                .send_meetup_deleted_email(&user.email, &meetup.title)
                .await
            {
                tracing::warn!(
                    error = %e,
                    user_id = %user.id,
                    meetup_id,
                    "Failed to send cancellation email"
                );
            }
        }

        Ok(removed)
    }

    /// Submit a rating for a finished meetup the user took part in.
    ///
    /// A second submission by the same user overwrites their prior score;
    /// the average is recomputed from the full map either way.
    pub async fn rate(&self, meetup_id: &str, user_id: &str, score: u8) -> Result<Meetup> {
        if !(1..=5).contains(&score) {
            return Err(AppError::BadRequest(
                "Score must be between 1 and 5".to_string(),
            ));
        }

        let meetup = self.db.rate_meetup(meetup_id, user_id, score).await?;

        tracing::info!(
            meetup_id,
            user_id,
            score,
            average = meetup.average_rating,
            "Rating recorded"
        );

        Ok(meetup)
    }
}
