use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub challenge_id: Uuid,
    pub submitted_by: Uuid,
    pub title: String,
    pub description: String,
    pub is_team: bool,
    /// Additional participants beyond the submitting author.
    pub team_members: Vec<Uuid>,
    pub status: SubmissionStatus,
    pub assigned_reviewer: Option<Uuid>,
    /// Mean of review scores. None until the first review lands.
    pub score: Option<f64>,
    /// Set iff status is `Winner`. 1 is first place.
    pub ranking: Option<i64>,
    pub submitted_at: DateTime<Utc>,
    pub winner_announced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    /// Everyone credited on this submission: the author plus team members.
    pub fn participants(&self) -> impl Iterator<Item = Uuid> + '_ {
        std::iter::once(self.submitted_by).chain(self.team_members.iter().copied())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SubmissionStatus {
    Draft,
    Submitted,
    UnderReview,
    Reviewed,
    NeedsRevision,
    Approved,
    Rejected,
    Winner,
    Completed,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Draft => "draft",
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::UnderReview => "under_review",
            SubmissionStatus::Reviewed => "reviewed",
            SubmissionStatus::NeedsRevision => "needs_revision",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
            SubmissionStatus::Winner => "winner",
            SubmissionStatus::Completed => "completed",
        }
    }

    /// Whether a manual status update may move a submission from `self` to
    /// `next`. `Winner` and `Completed` are reserved for winner selection,
    /// which bypasses this check inside its own transaction.
    pub fn can_transition_to(&self, next: SubmissionStatus) -> bool {
        use SubmissionStatus::*;
        matches!(
            (*self, next),
            (Draft, Submitted)
                | (Submitted, UnderReview)
                | (UnderReview, Reviewed)
                | (Reviewed, Approved)
                | (Reviewed, NeedsRevision)
                | (Reviewed, Rejected)
                | (NeedsRevision, Submitted)
        )
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubmissionRequest {
    pub title: String,
    pub description: String,
    pub team_members: Vec<Uuid>,
}
