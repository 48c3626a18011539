// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod meetup;
pub mod user;

pub use meetup::{average_rating, Category, CategoryFilter, Coordinates, Meetup};
pub use user::{User, UserCredentials};
