// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meetup routes: browsing, creation, participation, ratings, lifecycle.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Category, CategoryFilter, Coordinates, Meetup};
use crate::services::CreateMeetupInput;
use crate::AppState;

/// Meetup routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/meetups", get(list_meetups).post(create_meetup))
        .route("/api/meetups/mine", get(my_meetups))
        .route("/api/meetups/refresh", post(refresh_lifecycle))
        .route("/api/meetups/reconcile", post(reconcile))
        .route("/api/meetups/{id}", get(get_meetup).delete(delete_meetup))
        .route("/api/meetups/{id}/join", post(join_meetup))
        .route("/api/meetups/{id}/leave", post(leave_meetup))
        .route("/api/meetups/{id}/rating", post(rate_meetup))
}

// ─── Responses ───────────────────────────────────────────────

/// List entry with the view booleans every screen derives.
#[derive(Serialize)]
pub struct MeetupSummary {
    pub id: String,
    pub title: String,
    pub category: Category,
    pub location: String,
    pub coordinates: Option<Coordinates>,
    pub date: DateTime<Utc>,
    pub participants: u32,
    pub max_participants: u32,
    pub creator_id: String,
    pub creator_name: String,
    pub is_finished: bool,
    pub average_rating: f64,
    /// Current user is a participant
    pub is_member: bool,
    pub is_full: bool,
    /// Current user may still submit a rating
    pub can_rate: bool,
}

impl MeetupSummary {
    fn from_meetup(meetup: &Meetup, user_id: &str) -> Self {
        Self {
            id: meetup.id.clone(),
            title: meetup.title.clone(),
            category: meetup.category,
            location: meetup.location.clone(),
            coordinates: meetup.coordinates,
            date: meetup.date,
            participants: meetup.participants.len() as u32,
            max_participants: meetup.max_participants,
            creator_id: meetup.creator_id.clone(),
            creator_name: meetup.creator_name.clone(),
            is_finished: meetup.is_finished,
            average_rating: meetup.average_rating,
            is_member: meetup.has_participant(user_id),
            is_full: meetup.is_full(),
            can_rate: meetup.can_rate(user_id),
        }
    }
}

#[derive(Serialize)]
pub struct MeetupsResponse {
    pub meetups: Vec<MeetupSummary>,
}

/// Participant entry for the detail screen.
#[derive(Serialize)]
pub struct ParticipantSummary {
    pub id: String,
    pub name: String,
}

#[derive(Serialize)]
pub struct MeetupDetailResponse {
    #[serde(flatten)]
    pub summary: MeetupSummary,
    pub description: String,
    pub participant_list: Vec<ParticipantSummary>,
    pub ratings_count: u32,
}

/// Accordion buckets for the my-meetups screen.
#[derive(Serialize)]
pub struct MyMeetupsResponse {
    pub upcoming: Vec<MeetupSummary>,
    pub past: Vec<MeetupSummary>,
    pub created: Vec<MeetupSummary>,
}

#[derive(Serialize)]
pub struct DeleteMeetupResponse {
    pub success: bool,
    /// Users whose membership lists were updated by the cascade
    pub removed_memberships: u32,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    /// Meetups flipped to finished by this run
    pub finished: u32,
}

// ─── Browsing ────────────────────────────────────────────────

#[derive(Deserialize)]
struct ListQuery {
    /// Category name or "All"
    category: Option<String>,
}

/// List active meetups, soonest first.
///
/// Runs the lifecycle updater best-effort first, so a meetup whose date
/// passed since the last visit never shows up as active. The category
/// filter is applied to the fetched result set, not in the query.
async fn list_meetups(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ListQuery>,
) -> Result<Json<MeetupsResponse>> {
    let filter = CategoryFilter::from_param(params.category.as_deref())
        .map_err(AppError::BadRequest)?;

    if let Err(e) = state.lifecycle.finish_due(Utc::now()).await {
        tracing::warn!(error = %e, "Lifecycle refresh failed, serving stale flags");
    }

    let meetups = state.db.list_active_meetups().await?;

    let meetups = meetups
        .iter()
        .filter(|m| filter.matches(m.category))
        .map(|m| MeetupSummary::from_meetup(m, &user.user_id))
        .collect();

    Ok(Json(MeetupsResponse { meetups }))
}

/// Meetup detail with resolved participant names.
async fn get_meetup(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(meetup_id): Path<String>,
) -> Result<Json<MeetupDetailResponse>> {
    let meetup = state
        .db
        .get_meetup(&meetup_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Meetup {} not found", meetup_id)))?;

    let profiles = state.db.get_users_by_ids(&meetup.participants).await?;
    let names: HashMap<&str, &str> = profiles
        .iter()
        .map(|u| (u.id.as_str(), u.name.as_str()))
        .collect();

    let participant_list = meetup
        .participants
        .iter()
        .map(|id| ParticipantSummary {
            id: id.clone(),
            name: names.get(id.as_str()).unwrap_or(&"Unknown User").to_string(),
        })
        .collect();

    Ok(Json(MeetupDetailResponse {
        summary: MeetupSummary::from_meetup(&meetup, &user.user_id),
        description: meetup.description.clone(),
        participant_list,
        ratings_count: meetup.ratings.len() as u32,
    }))
}

/// The caller's meetups, bucketed the way the accordion shows them:
/// joined ones split by whether the date has passed, plus created ones.
async fn my_meetups(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MyMeetupsResponse>> {
    let joined = state.db.list_meetups_for_participant(&user.user_id).await?;
    let created = state.db.list_meetups_for_creator(&user.user_id).await?;

    let now = Utc::now();
    let (upcoming, past): (Vec<&Meetup>, Vec<&Meetup>) =
        joined.iter().partition(|m| m.date > now);

    Ok(Json(MyMeetupsResponse {
        upcoming: upcoming
            .iter()
            .map(|m| MeetupSummary::from_meetup(m, &user.user_id))
            .collect(),
        past: past
            .iter()
            .map(|m| MeetupSummary::from_meetup(m, &user.user_id))
            .collect(),
        created: created
            .iter()
            .map(|m| MeetupSummary::from_meetup(m, &user.user_id))
            .collect(),
    }))
}

// ─── Creation & Deletion ─────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct CreateMeetupRequest {
    #[validate(length(min = 1, max = 200))]
    title: String,
    #[validate(length(min = 1, max = 2000))]
    description: String,
    category: Category,
    #[validate(length(min = 1, max = 300))]
    location: String,
    coordinates: Option<Coordinates>,
    date: DateTime<Utc>,
    #[validate(range(min = 1))]
    max_participants: u32,
}

/// Create a meetup; the caller becomes creator and first participant.
async fn create_meetup(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateMeetupRequest>,
) -> Result<Json<MeetupSummary>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let creator = state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    let meetup = state
        .participation
        .create(
            &creator,
            CreateMeetupInput {
                title: payload.title,
                description: payload.description,
                category: payload.category,
                location: payload.location,
                coordinates: payload.coordinates,
                date: payload.date,
                max_participants: payload.max_participants,
            },
        )
        .await?;

    Ok(Json(MeetupSummary::from_meetup(&meetup, &user.user_id)))
}

/// Delete a meetup (creator only). Cascades the membership removals and
/// notifies the other participants.
async fn delete_meetup(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(meetup_id): Path<String>,
) -> Result<Json<DeleteMeetupResponse>> {
    let removed = state
        .participation
        .delete(&meetup_id, &user.user_id)
        .await?;

    Ok(Json(DeleteMeetupResponse {
        success: true,
        removed_memberships: removed as u32,
    }))
}

// ─── Participation ───────────────────────────────────────────

/// Join a meetup.
async fn join_meetup(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(meetup_id): Path<String>,
) -> Result<Json<MeetupSummary>> {
    let profile = state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    let meetup = state.participation.join(&meetup_id, &profile).await?;

    Ok(Json(MeetupSummary::from_meetup(&meetup, &user.user_id)))
}

/// Leave a meetup. Leaving one the caller never joined is a no-op.
async fn leave_meetup(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(meetup_id): Path<String>,
) -> Result<Json<MeetupSummary>> {
    let meetup = state.participation.leave(&meetup_id, &user.user_id).await?;

    Ok(Json(MeetupSummary::from_meetup(&meetup, &user.user_id)))
}

#[derive(Deserialize, Validate)]
pub struct RateRequest {
    #[validate(range(min = 1, max = 5))]
    score: u8,
}

/// Rate a finished meetup the caller took part in. A resubmission
/// overwrites the caller's prior score.
async fn rate_meetup(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(meetup_id): Path<String>,
    Json(payload): Json<RateRequest>,
) -> Result<Json<MeetupSummary>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let meetup = state
        .participation
        .rate(&meetup_id, &user.user_id, payload.score)
        .await?;

    Ok(Json(MeetupSummary::from_meetup(&meetup, &user.user_id)))
}

// ─── Lifecycle ───────────────────────────────────────────────

/// Flip past-due meetups to finished. Clients call this on screen mount;
/// re-running is a no-op for already-flipped meetups.
async fn refresh_lifecycle(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RefreshResponse>> {
    let finished = state.lifecycle.finish_due(Utc::now()).await?;
    Ok(Json(RefreshResponse { finished }))
}

/// Repair one-sided membership between meetups and users.
async fn reconcile(
    State(state): State<Arc<AppState>>,
) -> Result<Json<crate::services::ReconcileReport>> {
    let report = state.lifecycle.reconcile().await?;
    Ok(Json(report))
}
