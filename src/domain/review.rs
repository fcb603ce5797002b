use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One reviewer's evaluation of a submission. At most one per
/// (submission, reviewer) pair; re-submitting replaces the earlier scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub reviewer_id: Uuid,
    /// Overall score, 0-100. Derived from the criterion breakdown when one
    /// was supplied.
    pub score: f64,
    pub feedback: String,
    pub recommendation: Recommendation,
    /// Per-criterion breakdown. Empty when the reviewer gave a flat score.
    pub criterion_scores: Vec<CriterionScore>,
    pub strengths: Option<String>,
    pub weaknesses: Option<String>,
    pub suggestions: Option<String>,
    pub reviewed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Recommendation {
    Approve,
    Reject,
    NeedsRevision,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Approve => "approve",
            Recommendation::Reject => "reject",
            Recommendation::NeedsRevision => "needs_revision",
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CriterionScore {
    pub name: String,
    pub score: f64,
}

/// What a reviewer submits. Either `score` or a criterion breakdown must be
/// present; the service validates and computes the stored overall score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewInput {
    pub score: Option<f64>,
    pub criterion_scores: Vec<CriterionScore>,
    pub feedback: String,
    pub recommendation: Recommendation,
    pub strengths: Option<String>,
    pub weaknesses: Option<String>,
    pub suggestions: Option<String>,
}
