// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meetup lifecycle service.
//!
//! Two jobs, both safe to re-run at any time:
//! - `finish_due` flips past-due meetups from active to finished. The
//!   transition is one-way and triggered opportunistically (clients hit the
//!   refresh endpoint on screen mount, and the list handler runs it
//!   best-effort), not by a server-side timer.
//! - `reconcile` repairs one-sided membership between the meetup and user
//!   collections. With transactional joins/leaves drift should not occur,
//!   but external writers share these collections, so the repair pass
//!   exists as an explicit tool rather than silent trust.

use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use std::collections::HashSet;

use crate::db::FirestoreDb;
use crate::error::Result;
use crate::models::{Meetup, User};

const MAX_CONCURRENT_UPDATES: usize = 50;

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct ReconcileReport {
    /// Users whose membership lists were rewritten
    pub users_repaired: u32,
    /// Meetups whose participant set was rewritten
    pub meetups_repaired: u32,
}

/// Lifecycle state management for meetups.
#[derive(Clone)]
pub struct LifecycleService {
    db: FirestoreDb,
}

impl LifecycleService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Mark every active meetup whose date has passed as finished.
    ///
    /// Each flip is an independent single-field update; if a run is
    /// interrupted partway, the next run's `is_finished == false` query
    /// no longer sees the flipped documents and simply picks up the rest.
    pub async fn finish_due(&self, now: DateTime<Utc>) -> Result<u32> {
        let meetups = self.db.list_active_meetups().await?;
        let due: Vec<Meetup> = meetups.into_iter().filter(|m| m.is_due(now)).collect();

        if due.is_empty() {
            return Ok(0);
        }

        let flipped = due.len() as u32;
        let db = &self.db;

        stream::iter(due)
            .map(|meetup| async move { db.mark_meetup_finished(&meetup).await })
            .buffer_unordered(MAX_CONCURRENT_UPDATES)
            .collect::<Vec<Result<()>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>>>()?;

        tracing::info!(flipped, "Marked past-due meetups as finished");
        Ok(flipped)
    }

    /// Scan both collections and heal one-sided membership.
    ///
    /// The meetup's `participants` array is the source of truth: users
    /// gain missing `events_attended` entries, lose entries whose meetup is
    /// gone or no longer lists them, and meetups drop participant ids with
    /// no matching user document.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let users = self.db.list_users().await?;
        let meetups = self.db.list_all_meetups().await?;
        let user_ids: HashSet<&str> = users.iter().map(|u| u.id.as_str()).collect();

        let mut report = ReconcileReport::default();

        for meetup in &meetups {
            if let Some(participants) = reconciled_participants(meetup, &user_ids) {
                tracing::warn!(
                    meetup_id = %meetup.id,
                    before = meetup.participants.len(),
                    after = participants.len(),
                    "Dropping participants with no matching user document"
                );
                let mut repaired = meetup.clone();
                repaired.participants = participants;
                self.db.update_meetup_participants(&repaired).await?;
                report.meetups_repaired += 1;
            }
        }

        for user in &users {
            if let Some((attended, created)) = reconciled_lists(user, &meetups) {
                tracing::warn!(user_id = %user.id, "Repairing one-sided membership lists");
                let mut repaired = user.clone();
                repaired.events_attended = attended;
                repaired.events_created = created;
                self.db.upsert_user(&repaired).await?;
                report.users_repaired += 1;
            }
        }

        if report.users_repaired > 0 || report.meetups_repaired > 0 {
            tracing::info!(
                users = report.users_repaired,
                meetups = report.meetups_repaired,
                "Reconciliation repaired drifted documents"
            );
        }

        Ok(report)
    }
}

/// Corrected membership lists for a user, or None if already consistent.
///
/// `events_attended` keeps its order for ids still backed by a meetup that
/// lists the user, then gains any meetup that lists the user but was
/// missing here. `events_created` is filtered to meetups that still exist
/// with this user as creator, and gains any that were missing.
fn reconciled_lists(user: &User, meetups: &[Meetup]) -> Option<(Vec<String>, Vec<String>)> {
    let mut attended: Vec<String> = user
        .events_attended
        .iter()
        .filter(|id| {
            meetups
                .iter()
                .any(|m| &m.id == *id && m.has_participant(&user.id))
        })
        .cloned()
        .collect();

    for meetup in meetups {
        if meetup.has_participant(&user.id) && !attended.contains(&meetup.id) {
            attended.push(meetup.id.clone());
        }
    }

    let mut created: Vec<String> = user
        .events_created
        .iter()
        .filter(|id| {
            meetups
                .iter()
                .any(|m| &m.id == *id && m.creator_id == user.id)
        })
        .cloned()
        .collect();

    for meetup in meetups {
        if meetup.creator_id == user.id && !created.contains(&meetup.id) {
            created.push(meetup.id.clone());
        }
    }

    if attended == user.events_attended && created == user.events_created {
        None
    } else {
        Some((attended, created))
    }
}

/// Participant set with unknown user ids dropped, or None if unchanged.
fn reconciled_participants(meetup: &Meetup, user_ids: &HashSet<&str>) -> Option<Vec<String>> {
    let participants: Vec<String> = meetup
        .participants
        .iter()
        .filter(|id| user_ids.contains(id.as_str()))
        .cloned()
        .collect();

    if participants == meetup.participants {
        None
    } else {
        Some(participants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn make_meetup(id: &str, creator: &str, participants: Vec<&str>) -> Meetup {
        Meetup {
            id: id.to_string(),
            title: format!("Meetup {}", id),
            description: "".to_string(),
            category: Category::Social,
            location: "Milano".to_string(),
            coordinates: None,
            date: Utc.with_ymd_and_hms(2025, 6, 1, 18, 0, 0).unwrap(),
            max_participants: 10,
            participants: participants.into_iter().map(String::from).collect(),
            creator_id: creator.to_string(),
            creator_name: creator.to_string(),
            is_finished: false,
            ratings: HashMap::new(),
            average_rating: 0.0,
            created_at: Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    fn make_user(id: &str, attended: Vec<&str>, created: Vec<&str>) -> User {
        User {
            id: id.to_string(),
            name: id.to_string(),
            email: format!("{}@example.com", id),
            interests: vec![],
            events_attended: attended.into_iter().map(String::from).collect(),
            events_created: created.into_iter().map(String::from).collect(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_consistent_user_needs_no_repair() {
        let meetups = vec![make_meetup("m1", "alice", vec!["alice", "bob"])];
        let alice = make_user("alice", vec!["m1"], vec!["m1"]);
        let bob = make_user("bob", vec!["m1"], vec![]);

        assert!(reconciled_lists(&alice, &meetups).is_none());
        assert!(reconciled_lists(&bob, &meetups).is_none());
    }

    #[test]
    fn test_dangling_attendance_is_dropped() {
        // m-gone was deleted but the user's list still references it
        let meetups = vec![make_meetup("m1", "alice", vec!["alice", "bob"])];
        let bob = make_user("bob", vec!["m1", "m-gone"], vec![]);

        let (attended, created) = reconciled_lists(&bob, &meetups).expect("repair expected");
        assert_eq!(attended, vec!["m1".to_string()]);
        assert!(created.is_empty());
    }

    #[test]
    fn test_missing_attendance_is_added() {
        // meetup lists bob but bob's own list lost the id
        let meetups = vec![make_meetup("m1", "alice", vec!["alice", "bob"])];
        let bob = make_user("bob", vec![], vec![]);

        let (attended, _) = reconciled_lists(&bob, &meetups).expect("repair expected");
        assert_eq!(attended, vec!["m1".to_string()]);
    }

    #[test]
    fn test_attendance_removed_when_meetup_no_longer_lists_user() {
        // meetup is the source of truth: bob left (or was removed) there
        let meetups = vec![make_meetup("m1", "alice", vec!["alice"])];
        let bob = make_user("bob", vec!["m1"], vec![]);

        let (attended, _) = reconciled_lists(&bob, &meetups).expect("repair expected");
        assert!(attended.is_empty());
    }

    #[test]
    fn test_created_list_repair() {
        let meetups = vec![make_meetup("m1", "alice", vec!["alice"])];
        let alice = make_user("alice", vec!["m1"], vec!["m-gone"]);

        let (_, created) = reconciled_lists(&alice, &meetups).expect("repair expected");
        assert_eq!(created, vec!["m1".to_string()]);
    }

    #[test]
    fn test_unknown_participants_are_dropped() {
        let meetup = make_meetup("m1", "alice", vec!["alice", "ghost"]);
        let user_ids: HashSet<&str> = ["alice"].into_iter().collect();

        let participants = reconciled_participants(&meetup, &user_ids).expect("repair expected");
        assert_eq!(participants, vec!["alice".to_string()]);

        let clean = make_meetup("m2", "alice", vec!["alice"]);
        assert!(reconciled_participants(&clean, &user_ids).is_none());
    }
}
