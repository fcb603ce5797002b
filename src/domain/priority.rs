use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Review urgency derived from how close a challenge's deadline is.
/// Ordering is most-urgent-first so work queues sort naturally.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReviewPriority {
    Urgent,
    High,
    Medium,
    Low,
}

impl ReviewPriority {
    /// Classify a deadline relative to `now`. A deadline within one day,
    /// including one already passed, is urgent. No deadline means nothing
    /// is pressing.
    pub fn from_deadline(now: DateTime<Utc>, deadline: Option<DateTime<Utc>>) -> Self {
        let Some(deadline) = deadline else {
            return ReviewPriority::Low;
        };
        let remaining = deadline - now;
        if remaining <= Duration::days(1) {
            ReviewPriority::Urgent
        } else if remaining <= Duration::days(3) {
            ReviewPriority::High
        } else if remaining <= Duration::days(7) {
            ReviewPriority::Medium
        } else {
            ReviewPriority::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewPriority::Urgent => "urgent",
            ReviewPriority::High => "high",
            ReviewPriority::Medium => "medium",
            ReviewPriority::Low => "low",
        }
    }
}

impl std::fmt::Display for ReviewPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
