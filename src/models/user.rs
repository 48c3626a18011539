//! User profile and credential models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUID (also used as document ID and JWT subject)
    pub id: String,
    /// Display name
    pub name: String,
    /// Email address, unique across users
    pub email: String,
    /// Free-text interest tags, no duplicates
    #[serde(default)]
    pub interests: Vec<String>,
    /// Meetup ids the user has joined (created meetups included)
    #[serde(default)]
    pub events_attended: Vec<String>,
    /// Meetup ids the user created
    #[serde(default)]
    pub events_created: Vec<String>,
    /// When the account was registered
    pub created_at: DateTime<Utc>,
}

/// Password hash, stored in its own collection keyed by user id so profile
/// reads never carry it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCredentials {
    /// bcrypt hash
    pub password_hash: String,
}
