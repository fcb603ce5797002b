//! Eligibility predicates shared by the review and winner-selection
//! workflows. Pure; never mutate anything.

use crate::domain::{Challenge, Submission, SubmissionStatus};

/// A submission can be picked up for review while its challenge is running
/// or judging.
pub fn reviewable(challenge: &Challenge) -> bool {
    challenge.is_open_for_review()
}

/// Winner candidates must have finished review (or been approved) and carry
/// at least one review.
pub fn winner_eligible(submission: &Submission, review_count: usize) -> bool {
    matches!(
        submission.status,
        SubmissionStatus::Reviewed | SubmissionStatus::Approved
    ) && review_count > 0
}

/// Leaderboards include anything with at least one review, whatever its
/// current status.
pub fn on_leaderboard(review_count: usize) -> bool {
    review_count > 0
}
