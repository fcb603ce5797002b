use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: ChallengeCategory,
    pub prize: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    /// Weighted judging criteria. Empty means freeform judging against
    /// `judging_notes` only.
    pub criteria: Vec<JudgingCriterion>,
    pub judging_notes: Option<String>,
    pub status: ChallengeStatus,
    pub created_by: Uuid,
    pub winners_announced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Challenge {
    /// Submissions can be reviewed while the challenge runs or judges.
    pub fn is_open_for_review(&self) -> bool {
        matches!(
            self.status,
            ChallengeStatus::Active | ChallengeStatus::Judging
        )
    }

    pub fn is_accepting_submissions(&self) -> bool {
        matches!(self.status, ChallengeStatus::Active)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChallengeStatus {
    Draft,
    Active,
    Judging,
    Completed,
    Cancelled,
}

impl ChallengeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeStatus::Draft => "draft",
            ChallengeStatus::Active => "active",
            ChallengeStatus::Judging => "judging",
            ChallengeStatus::Completed => "completed",
            ChallengeStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChallengeCategory {
    Product,
    Process,
    Technology,
    Sustainability,
    Community,
    Other,
}

/// One weighted judging criterion. Weights are free-form positive numbers;
/// they do not need to sum to 100.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JudgingCriterion {
    pub name: String,
    pub weight: f64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChallengeRequest {
    pub title: String,
    pub description: String,
    pub category: ChallengeCategory,
    pub prize: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub criteria: Vec<JudgingCriterion>,
    pub judging_notes: Option<String>,
    /// Create straight into `Active` instead of `Draft`.
    pub publish: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateChallengeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<ChallengeCategory>,
    pub prize: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub criteria: Option<Vec<JudgingCriterion>>,
    pub judging_notes: Option<String>,
}
