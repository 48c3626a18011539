// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes for the current user and public profile lookups.

use axum::{
    extract::{Path, State},
    routing::{delete, get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::User;
use crate::AppState;

/// Profile routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/me/interests", put(update_interests))
        .route("/api/users/{id}", get(get_user))
        .route("/api/account", delete(delete_account))
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub interests: Vec<String>,
    pub events_attended: Vec<String>,
    pub events_created: Vec<String>,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            interests: user.interests.clone(),
            events_attended: user.events_attended.clone(),
            events_created: user.events_created.clone(),
        }
    }
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let profile = state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    Ok(Json(UserResponse::from_user(&profile)))
}

// ─── Interests ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct UpdateInterestsRequest {
    interests: Vec<String>,
}

/// Replace the caller's interest tags.
///
/// Tags are trimmed, empties dropped and duplicates removed while keeping
/// the submitted order.
async fn update_interests(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<UpdateInterestsRequest>,
) -> Result<Json<UserResponse>> {
    let mut profile = state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    profile.interests = normalize_interests(payload.interests);
    state.db.upsert_user(&profile).await?;

    Ok(Json(UserResponse::from_user(&profile)))
}

/// Trim, drop empties, dedupe preserving first occurrence.
fn normalize_interests(raw: Vec<String>) -> Vec<String> {
    let mut interests: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw {
        let tag = tag.trim();
        if tag.is_empty() || interests.iter().any(|t| t == tag) {
            continue;
        }
        interests.push(tag.to_string());
    }
    interests
}

// ─── Public Profiles ─────────────────────────────────────────

/// Public view of another user (no email, no membership lists).
#[derive(Serialize)]
pub struct PublicUserResponse {
    pub id: String,
    pub name: String,
    pub interests: Vec<String>,
}

/// Get a user's public profile.
async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<PublicUserResponse>> {
    let profile = state
        .db
        .get_user(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

    Ok(Json(PublicUserResponse {
        id: profile.id,
        name: profile.name,
        interests: profile.interests,
    }))
}

// ─── Account Deletion ────────────────────────────────────────

/// Response for account deletion.
#[derive(Serialize)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub message: String,
}

/// Delete the caller's account and all associated data.
///
/// 1. Delete credentials (blocks new logins)
/// 2. Delete every meetup the user created (full cascade + notifications)
/// 3. Leave every remaining meetup the user joined
/// 4. Delete the profile document
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DeleteAccountResponse>> {
    tracing::info!(user_id = %user.user_id, "User-initiated account deletion");

    state.db.delete_credentials(&user.user_id).await?;

    let created = state.db.list_meetups_for_creator(&user.user_id).await?;
    for meetup in &created {
        state.participation.delete(&meetup.id, &user.user_id).await?;
    }

    let joined = state.db.list_meetups_for_participant(&user.user_id).await?;
    for meetup in &joined {
        state.participation.leave(&meetup.id, &user.user_id).await?;
    }

    state.db.delete_user(&user.user_id).await?;

    tracing::info!(
        user_id = %user.user_id,
        created = created.len(),
        joined = joined.len(),
        "Account deletion complete"
    );

    Ok(Json(DeleteAccountResponse {
        success: true,
        message: "Account deleted. All memberships were removed.".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_interests_trims_and_dedupes() {
        let raw = vec![
            " hiking ".to_string(),
            "hiking".to_string(),
            "".to_string(),
            "  ".to_string(),
            "chess".to_string(),
        ];

        assert_eq!(
            normalize_interests(raw),
            vec!["hiking".to_string(), "chess".to_string()]
        );
    }

    #[test]
    fn test_normalize_interests_preserves_order() {
        let raw = vec!["b".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(normalize_interests(raw), vec!["b".to_string(), "a".to_string()]);
    }
}
