use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::*;
use crate::error::Result;

pub mod challenge_repository;
pub mod review_repository;
pub mod submission_repository;

pub use challenge_repository::SqliteChallengeRepository;
pub use review_repository::SqliteReviewRepository;
pub use submission_repository::SqliteSubmissionRepository;

#[async_trait]
pub trait ChallengeRepository: Send + Sync {
    async fn create(&self, challenge: Challenge) -> Result<Challenge>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Challenge>>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Challenge>>;
    /// Active challenges whose deadline has already passed.
    async fn list_expired_active(&self, now: DateTime<Utc>) -> Result<Vec<Challenge>>;
    async fn update(&self, id: Uuid, challenge: Challenge) -> Result<Challenge>;
    /// Conditional status change: applies only while the current status is
    /// one of `from`. Returns None when the precondition did not hold.
    async fn transition_status(
        &self,
        id: Uuid,
        from: &[ChallengeStatus],
        to: ChallengeStatus,
    ) -> Result<Option<Challenge>>;
    /// The winner-selection commit, one transaction: challenge to
    /// `Completed` (only from a pre-completion status), selected submissions
    /// to `Winner` ranked by position, everything else in the challenge to
    /// `Completed`. Returns false when the challenge had already left its
    /// pre-completion status, in which case nothing was changed.
    async fn complete_with_winners(
        &self,
        challenge_id: Uuid,
        winners: &[Uuid],
        announced_at: DateTime<Utc>,
    ) -> Result<bool>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn create(&self, submission: Submission) -> Result<Submission>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Submission>>;
    async fn list_by_challenge(&self, challenge_id: Uuid) -> Result<Vec<Submission>>;
    /// Review-queue candidates across open challenges: unassigned submitted
    /// entries, plus in-progress ones already held by this reviewer.
    async fn list_awaiting_review(&self, reviewer: Uuid) -> Result<Vec<Submission>>;
    /// Test-and-set assignment: succeeds iff the submission is unassigned
    /// or already held by this reviewer. Returns None when another reviewer
    /// holds it (or the row is missing; the caller distinguishes).
    async fn assign_if_unassigned(&self, id: Uuid, reviewer: Uuid) -> Result<Option<Submission>>;
    async fn set_status(&self, id: Uuid, status: SubmissionStatus) -> Result<Submission>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Upserts the review keyed by (submission, reviewer) and, in the same
    /// transaction, moves the submission to `Reviewed` and refreshes its
    /// derived average score. Either everything commits or nothing does.
    async fn record(&self, review: Review) -> Result<Review>;
    async fn find_for_reviewer(
        &self,
        submission_id: Uuid,
        reviewer_id: Uuid,
    ) -> Result<Option<Review>>;
    async fn list_by_submission(&self, submission_id: Uuid) -> Result<Vec<Review>>;
    async fn list_by_challenge(&self, challenge_id: Uuid) -> Result<Vec<Review>>;
    async fn count_for_submission(&self, submission_id: Uuid) -> Result<i64>;
}
