// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meetup model and the view state derived from it.
//!
//! Every list and detail screen computes the same three booleans from a
//! meetup + current-user pair (`has_participant`, `is_full`, `can_rate`),
//! so they live here rather than in the handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed category set. The filter-only pseudo-category "All" is not part
/// of this enum and is never stored on a meetup (see [`CategoryFilter`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Sports,
    Study,
    Social,
    Work,
    Other,
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "Sports" => Ok(Category::Sports),
            "Study" => Ok(Category::Study),
            "Social" => Ok(Category::Social),
            "Work" => Ok(Category::Work),
            "Other" => Ok(Category::Other),
            other => Err(format!("Unknown category: {}", other)),
        }
    }
}

/// Category filter applied to an already-fetched result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    /// Parse the optional `category` query parameter.
    ///
    /// `None` and the literal `"All"` both select everything.
    pub fn from_param(raw: Option<&str>) -> Result<Self, String> {
        match raw {
            None | Some("All") => Ok(CategoryFilter::All),
            Some(other) => other.parse().map(CategoryFilter::Only),
        }
    }

    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(selected) => *selected == category,
        }
    }
}

/// Geographic map pin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A user-created, time-and-place-bound group event stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meetup {
    /// UUID, also used as document ID
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    /// Display address of the venue
    pub location: String,
    /// Optional map pin
    pub coordinates: Option<Coordinates>,
    /// Scheduled start; there is no explicit end time
    pub date: DateTime<Utc>,
    /// Capacity, fixed at creation
    pub max_participants: u32,
    /// User ids, no duplicates; the creator is added at creation
    #[serde(default)]
    pub participants: Vec<String>,
    /// Denormalized creator reference
    pub creator_id: String,
    pub creator_name: String,
    /// Flipped once `date` is in the past; never reset
    #[serde(default)]
    pub is_finished: bool,
    /// Rater id -> score in [1,5], populated only after the meetup finished
    #[serde(default)]
    pub ratings: HashMap<String, u8>,
    /// Mean of `ratings` values, recomputed in full on every change
    #[serde(default)]
    pub average_rating: f64,
    pub created_at: DateTime<Utc>,
}

impl Meetup {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|id| id == user_id)
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.max_participants as usize
    }

    /// A user may rate once the meetup finished, if they took part and
    /// have not rated yet. A second submission overwrites rather than
    /// duplicates, so the UI suppresses the action based on this.
    pub fn can_rate(&self, user_id: &str) -> bool {
        self.is_finished && self.has_participant(user_id) && !self.ratings.contains_key(user_id)
    }

    /// Whether the scheduled start has passed and the active -> finished
    /// transition is due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.is_finished && self.date <= now
    }
}

/// Mean of all submitted scores, 0.0 when nobody has rated.
///
/// Always recomputed from the full map. A running average would drift when
/// a user overwrites their own prior score.
pub fn average_rating(ratings: &HashMap<String, u8>) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: u32 = ratings.values().map(|&score| u32::from(score)).sum();
    f64::from(sum) / ratings.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_meetup(max_participants: u32, participants: Vec<&str>) -> Meetup {
        Meetup {
            id: "m-1".to_string(),
            title: "Evening run".to_string(),
            description: "Easy 5k around the park".to_string(),
            category: Category::Sports,
            location: "Parco Sempione".to_string(),
            coordinates: None,
            date: Utc.with_ymd_and_hms(2025, 6, 1, 18, 0, 0).unwrap(),
            max_participants,
            participants: participants.into_iter().map(String::from).collect(),
            creator_id: "u-creator".to_string(),
            creator_name: "Creator".to_string(),
            is_finished: false,
            ratings: HashMap::new(),
            average_rating: 0.0,
            created_at: Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_average_rating_empty_map() {
        assert_eq!(average_rating(&HashMap::new()), 0.0);
    }

    #[test]
    fn test_average_rating_mean_of_values() {
        let mut ratings = HashMap::new();
        ratings.insert("a".to_string(), 5u8);
        ratings.insert("b".to_string(), 4u8);
        ratings.insert("c".to_string(), 3u8);
        assert_eq!(average_rating(&ratings), 4.0);
    }

    #[test]
    fn test_average_rating_overwrite_does_not_grow_count() {
        let mut ratings = HashMap::new();
        ratings.insert("u".to_string(), 4u8);
        ratings.insert("u".to_string(), 2u8);

        assert_eq!(ratings.len(), 1);
        assert_eq!(average_rating(&ratings), 2.0);
    }

    #[test]
    fn test_is_full() {
        let meetup = make_meetup(2, vec!["a", "b"]);
        assert!(meetup.is_full());

        let meetup = make_meetup(2, vec!["a"]);
        assert!(!meetup.is_full());
    }

    #[test]
    fn test_can_rate_requires_finished_and_membership() {
        let mut meetup = make_meetup(5, vec!["a", "b"]);
        assert!(!meetup.can_rate("a"), "active meetup cannot be rated");

        meetup.is_finished = true;
        assert!(meetup.can_rate("a"));
        assert!(!meetup.can_rate("stranger"));

        meetup.ratings.insert("a".to_string(), 4);
        assert!(!meetup.can_rate("a"), "already rated");
        assert!(meetup.can_rate("b"));
    }

    #[test]
    fn test_is_due_only_for_active_past_meetups() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 19, 0, 0).unwrap();

        let mut meetup = make_meetup(5, vec!["a"]);
        assert!(meetup.is_due(now), "date passed, still active");

        meetup.is_finished = true;
        assert!(!meetup.is_due(now), "already finished");

        let mut future = make_meetup(5, vec!["a"]);
        future.date = Utc.with_ymd_and_hms(2025, 6, 2, 18, 0, 0).unwrap();
        assert!(!future.is_due(now));
    }

    #[test]
    fn test_category_filter() {
        assert!(CategoryFilter::All.matches(Category::Work));
        assert!(CategoryFilter::Only(Category::Sports).matches(Category::Sports));
        assert!(!CategoryFilter::Only(Category::Sports).matches(Category::Study));
    }

    #[test]
    fn test_category_filter_from_param() {
        assert_eq!(CategoryFilter::from_param(None), Ok(CategoryFilter::All));
        assert_eq!(
            CategoryFilter::from_param(Some("All")),
            Ok(CategoryFilter::All)
        );
        assert_eq!(
            CategoryFilter::from_param(Some("Study")),
            Ok(CategoryFilter::Only(Category::Study))
        );
        assert!(CategoryFilter::from_param(Some("Gardening")).is_err());
    }
}
