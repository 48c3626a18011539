// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration and login routes.
//!
//! Sign-out is a client-side token discard; there is no server-side
//! session to tear down.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::create_jwt;
use crate::models::{User, UserCredentials};
use crate::routes::users::UserResponse;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 8, max = 128))]
    password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

/// Session token plus the profile it belongs to.
#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Register a new account.
///
/// Creates the profile document and the bcrypt hash (separate collection)
/// and returns a session token right away.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let email = payload.email.trim().to_lowercase();

    if state.db.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::EmailTaken);
    }

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to hash password: {}", e)))?;

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name: payload.name.trim().to_string(),
        email,
        interests: vec![],
        events_attended: vec![],
        events_created: vec![],
        created_at: chrono::Utc::now(),
    };

    state.db.upsert_user(&user).await?;
    state
        .db
        .set_credentials(&user.id, &UserCredentials { password_hash })
        .await?;

    tracing::info!(user_id = %user.id, "New account registered");

    let token = create_jwt(&user.id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    Ok(Json(AuthResponse {
        token,
        user: UserResponse::from_user(&user),
    }))
}

/// Log in with email and password.
///
/// Unknown email and wrong password both map to the same 401 so the
/// endpoint cannot be used to probe which addresses are registered.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let email = payload.email.trim().to_lowercase();

    let user = state
        .db
        .get_user_by_email(&email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let credentials = state
        .db
        .get_credentials(&user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let valid = bcrypt::verify(&payload.password, &credentials.password_hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to verify password: {}", e)))?;

    if !valid {
        return Err(AppError::Unauthorized);
    }

    let token = create_jwt(&user.id, &state.config.jwt_signing_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::debug!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        token,
        user: UserResponse::from_user(&user),
    }))
}
