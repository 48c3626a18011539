// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification emails, delivered through the SendGrid v3 mail-send API.
//!
//! Every send is best-effort: callers log a warning on failure and never
//! roll back the mutation that triggered the notification.

use crate::error::AppError;

const SENDGRID_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// SendGrid mail relay client.
#[derive(Clone)]
pub struct MailerService {
    http: reqwest::Client,
    api_url: String,
    /// When None, sends are logged and skipped (local dev, tests)
    api_key: Option<String>,
    from: String,
}

impl MailerService {
    pub fn new(api_key: Option<String>, from: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: SENDGRID_API_URL.to_string(),
            api_key,
            from,
        }
    }

    /// Create a disabled mailer for testing (no relay configured).
    pub fn new_mock() -> Self {
        Self::new(None, "noreply@meetly.com".to_string())
    }

    /// Confirmation email after a successful join.
    pub async fn send_join_email(&self, to: &str, meetup_title: &str) -> Result<(), AppError> {
        let (subject, text) = join_template(meetup_title);
        self.send(to, &subject, &text).await
    }

    /// Cancellation email after a meetup was deleted.
    pub async fn send_meetup_deleted_email(
        &self,
        to: &str,
        meetup_title: &str,
    ) -> Result<(), AppError> {
        let (subject, text) = cancellation_template(meetup_title);
        self.send(to, &subject, &text).await
    }

    async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), AppError> {
        let Some(api_key) = &self.api_key else {
            tracing::info!(to, subject, "Mail relay not configured, skipping notification");
            return Ok(());
        };

        let body = serde_json::json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.from },
            "subject": subject,
            "content": [{ "type": "text/plain", "value": text }],
        });

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Mail(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Mail(format!(
                "SendGrid returned status {}",
                response.status()
            )));
        }

        tracing::debug!(to, subject, "Notification email sent");
        Ok(())
    }
}

/// Subject and body for the join confirmation.
fn join_template(meetup_title: &str) -> (String, String) {
    (
        format!("You've joined a new meetup: {}", meetup_title),
        format!(
            "Hello,\n\nYou have successfully joined the meetup \"{}\".\n\n\
             We look forward to seeing you there!\n\nBest regards,\nThe Meetly Team",
            meetup_title
        ),
    )
}

/// Subject and body for the cancellation notice.
fn cancellation_template(meetup_title: &str) -> (String, String) {
    (
        format!("Meetup cancelled: {}", meetup_title),
        format!(
            "Hello,\n\nWe regret to inform you that the meetup \"{}\" has been cancelled.\n\n\
             We apologize for any inconvenience this may cause.\n\nBest regards,\nThe Meetly Team",
            meetup_title
        ),
    )
}
