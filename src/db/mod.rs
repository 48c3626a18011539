//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Password hashes (keyed by user id, separate from profiles)
    pub const CREDENTIALS: &str = "credentials";
    pub const MEETUPS: &str = "meetups";
}
