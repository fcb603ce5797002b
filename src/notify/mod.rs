use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::SubmissionStatus;
use crate::error::Result;

pub mod log;

pub use log::LogNotificationSink;

/// Everything the workflows tell participants about. Delivery is
/// best-effort and always happens after the owning transaction committed.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    ReviewStarted {
        submission_id: Uuid,
        author: Uuid,
    },
    ReviewReceived {
        submission_id: Uuid,
        author: Uuid,
        score: f64,
    },
    StatusChanged {
        submission_id: Uuid,
        author: Uuid,
        from: SubmissionStatus,
        to: SubmissionStatus,
    },
    WinnerAnnounced {
        challenge_id: Uuid,
        submission_id: Uuid,
        recipient: Uuid,
        rank: i64,
    },
    /// One announcement to every non-winning participant of a completed
    /// challenge.
    ResultsAnnounced {
        challenge_id: Uuid,
        recipients: Vec<Uuid>,
        announcement: String,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::ReviewStarted { .. } => "review_started",
            Notification::ReviewReceived { .. } => "review_received",
            Notification::StatusChanged { .. } => "status_changed",
            Notification::WinnerAnnounced { .. } => "winner_announced",
            Notification::ResultsAnnounced { .. } => "results_announced",
        }
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;
    fn is_enabled(&self) -> bool {
        true
    }
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

pub struct Notifier {
    sinks: RwLock<Vec<Arc<dyn NotificationSink>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            sinks: RwLock::new(Vec::new()),
        }
    }

    pub async fn register(&self, sink: Arc<dyn NotificationSink>) {
        if sink.is_enabled() {
            let mut sinks = self.sinks.write().await;
            tracing::info!("Registered notification sink: {}", sink.name());
            sinks.push(sink);
        }
    }

    /// Deliver to every registered sink. A failing sink is logged and
    /// skipped; delivery never propagates errors back into a workflow.
    pub async fn dispatch(&self, notification: Notification) {
        let sinks = self.sinks.read().await;
        for sink in sinks.iter() {
            if !sink.is_enabled() {
                continue;
            }
            match sink.deliver(&notification).await {
                Ok(_) => {
                    tracing::debug!(
                        "Sink {} delivered {} notification",
                        sink.name(),
                        notification.kind()
                    );
                }
                Err(e) => {
                    tracing::error!(
                        "Sink {} failed to deliver {} notification: {:?}",
                        sink.name(),
                        notification.kind(),
                        e
                    );
                    // Keep going; the remaining sinks still get the event
                }
            }
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
