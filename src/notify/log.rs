use async_trait::async_trait;

use super::{Notification, NotificationSink};
use crate::error::Result;

/// Writes notifications to the log. The transport-free default sink;
/// anything that actually reaches users is wired in by the embedding
/// application.
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        match notification {
            Notification::ReviewStarted {
                submission_id,
                author,
            } => {
                tracing::info!(
                    "Review started on submission {} (author {})",
                    submission_id,
                    author
                );
            }
            Notification::ReviewReceived {
                submission_id,
                author,
                score,
            } => {
                tracing::info!(
                    "Submission {} received a review scoring {:.1} (author {})",
                    submission_id,
                    score,
                    author
                );
            }
            Notification::StatusChanged {
                submission_id,
                author,
                from,
                to,
            } => {
                tracing::info!(
                    "Submission {} moved from {} to {} (author {})",
                    submission_id,
                    from,
                    to,
                    author
                );
            }
            Notification::WinnerAnnounced {
                challenge_id,
                submission_id,
                recipient,
                rank,
            } => {
                tracing::info!(
                    "Submission {} placed #{} in challenge {} (participant {})",
                    submission_id,
                    rank,
                    challenge_id,
                    recipient
                );
            }
            Notification::ResultsAnnounced {
                challenge_id,
                recipients,
                ..
            } => {
                tracing::info!(
                    "Results announced for challenge {} to {} participants",
                    challenge_id,
                    recipients.len()
                );
            }
        }
        Ok(())
    }
}
