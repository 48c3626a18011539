// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod lifecycle;
pub mod mailer;
pub mod participation;

pub use lifecycle::{LifecycleService, ReconcileReport};
pub use mailer::MailerService;
pub use participation::{CreateMeetupInput, ParticipationService};
