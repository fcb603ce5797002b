use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::{AuditEntity, AuditEntry, AuditLog},
    authz::{self, AccessPolicy, Action, Entity},
    config::WorkflowConfig,
    domain::*,
    error::{AppError, Result, ValidationErrors},
    eligibility,
    notify::{Notification, Notifier},
    repository::{ChallengeRepository, ReviewRepository, SubmissionRepository},
    scoring,
};

/// One item of a reviewer's work queue, ordered by deadline urgency.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub submission: Submission,
    pub challenge_id: Uuid,
    pub challenge_title: String,
    pub deadline: Option<DateTime<Utc>>,
    pub priority: ReviewPriority,
}

/// Batch action applied per submission. `Review` carries a flat score; the
/// criterion breakdown is a single-submission affair.
#[derive(Debug, Clone)]
pub enum BulkAction {
    Approve,
    Reject,
    Review {
        score: f64,
        feedback: String,
        recommendation: Recommendation,
    },
}

impl BulkAction {
    fn label(&self) -> &'static str {
        match self {
            BulkAction::Approve => "approve",
            BulkAction::Reject => "reject",
            BulkAction::Review { .. } => "review",
        }
    }
}

#[derive(Debug)]
pub struct BulkFailure {
    pub submission_id: Uuid,
    pub error: AppError,
}

/// Best-effort batch result: one submission failing never rolls back or
/// blocks the rest.
#[derive(Debug, Default)]
pub struct BulkOutcome {
    pub applied: Vec<Uuid>,
    pub failed: Vec<BulkFailure>,
}

impl BulkOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct ReviewService {
    challenges: Arc<dyn ChallengeRepository>,
    submissions: Arc<dyn SubmissionRepository>,
    reviews: Arc<dyn ReviewRepository>,
    policy: Arc<dyn AccessPolicy>,
    notifier: Arc<Notifier>,
    audit: Arc<AuditLog>,
    workflow: WorkflowConfig,
}

impl ReviewService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        challenges: Arc<dyn ChallengeRepository>,
        submissions: Arc<dyn SubmissionRepository>,
        reviews: Arc<dyn ReviewRepository>,
        policy: Arc<dyn AccessPolicy>,
        notifier: Arc<Notifier>,
        audit: Arc<AuditLog>,
        workflow: WorkflowConfig,
    ) -> Self {
        Self {
            challenges,
            submissions,
            reviews,
            policy,
            notifier,
            audit,
            workflow,
        }
    }

    /// Submissions this reviewer could pick up (or already holds), most
    /// urgent deadline first.
    pub async fn review_queue(&self, reviewer: Uuid) -> Result<Vec<QueueEntry>> {
        let submissions = self.submissions.list_awaiting_review(reviewer).await?;
        let now = Utc::now();

        let mut challenges: HashMap<Uuid, Challenge> = HashMap::new();
        let mut entries = Vec::with_capacity(submissions.len());
        for submission in submissions {
            let challenge = match challenges.get(&submission.challenge_id) {
                Some(c) => c.clone(),
                None => {
                    let c = self
                        .challenges
                        .find_by_id(submission.challenge_id)
                        .await?
                        .ok_or_else(|| AppError::NotFound("Challenge not found".to_string()))?;
                    challenges.insert(c.id, c.clone());
                    c
                }
            };
            entries.push(QueueEntry {
                priority: ReviewPriority::from_deadline(now, challenge.deadline),
                challenge_id: challenge.id,
                challenge_title: challenge.title,
                deadline: challenge.deadline,
                submission,
            });
        }

        entries.sort_by_key(|e| {
            (
                e.priority,
                e.deadline.unwrap_or(DateTime::<Utc>::MAX_UTC),
                e.submission.submitted_at,
            )
        });
        Ok(entries)
    }

    /// Claim a submission for review. First assignment wins; the same
    /// reviewer claiming again is a no-op success.
    pub async fn assign_reviewer(&self, actor: Uuid, submission_id: Uuid) -> Result<Submission> {
        let submission = self
            .submissions
            .find_by_id(submission_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))?;
        authz::require(
            self.policy.as_ref(),
            actor,
            Action::AssignReviewer,
            Entity::Submission(submission_id),
        )
        .await?;

        let challenge = self
            .challenges
            .find_by_id(submission.challenge_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Challenge not found".to_string()))?;
        if !eligibility::reviewable(&challenge) {
            return Err(AppError::ChallengeNotOpen {
                challenge_id: challenge.id,
                status: challenge.status,
            });
        }

        match self
            .submissions
            .assign_if_unassigned(submission_id, actor)
            .await?
        {
            Some(assigned) => {
                // Only the first claim is news to the author
                if submission.status == SubmissionStatus::Submitted {
                    self.audit
                        .record(
                            AuditEntry::new(
                                actor,
                                AuditEntity::Submission(submission_id),
                                "reviewer_assigned",
                            )
                            .before(json!({ "status": submission.status.as_str() }))
                            .after(json!({ "status": assigned.status.as_str() })),
                        )
                        .await;
                    self.notifier
                        .dispatch(Notification::ReviewStarted {
                            submission_id,
                            author: assigned.submitted_by,
                        })
                        .await;
                }
                Ok(assigned)
            }
            None => {
                // The conditional update matched nothing; find out why.
                let current = self
                    .submissions
                    .find_by_id(submission_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))?;
                if let Some(held_by) = current.assigned_reviewer {
                    if held_by != actor {
                        return Err(AppError::AlreadyAssigned {
                            submission_id,
                            held_by,
                        });
                    }
                }
                Err(AppError::InvalidTransition {
                    from: current.status,
                    to: SubmissionStatus::UnderReview,
                })
            }
        }
    }

    /// Record (or replace) this reviewer's evaluation. The review row, the
    /// submission's move to `Reviewed`, and the refreshed average commit as
    /// one unit.
    pub async fn submit_review(
        &self,
        actor: Uuid,
        submission_id: Uuid,
        input: ReviewInput,
    ) -> Result<Review> {
        let submission = self
            .submissions
            .find_by_id(submission_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))?;
        authz::require(
            self.policy.as_ref(),
            actor,
            Action::SubmitReview,
            Entity::Submission(submission_id),
        )
        .await?;

        let challenge = self
            .challenges
            .find_by_id(submission.challenge_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Challenge not found".to_string()))?;
        if !eligibility::reviewable(&challenge) {
            return Err(AppError::ChallengeNotOpen {
                challenge_id: challenge.id,
                status: challenge.status,
            });
        }

        let overall = validate_review_input(&challenge, &input, self.workflow.min_feedback_len)?;

        let now = Utc::now();
        let review = Review {
            id: Uuid::new_v4(),
            submission_id,
            reviewer_id: actor,
            score: overall,
            feedback: input.feedback,
            recommendation: input.recommendation,
            criterion_scores: input.criterion_scores,
            strengths: input.strengths,
            weaknesses: input.weaknesses,
            suggestions: input.suggestions,
            reviewed_at: now,
            created_at: now,
            updated_at: now,
        };

        let stored = self.reviews.record(review).await?;

        self.audit
            .record(
                AuditEntry::new(
                    actor,
                    AuditEntity::Submission(submission_id),
                    "review_submitted",
                )
                .before(json!({ "status": submission.status.as_str() }))
                .after(json!({ "status": "reviewed", "score": stored.score })),
            )
            .await;
        self.notifier
            .dispatch(Notification::ReviewReceived {
                submission_id,
                author: submission.submitted_by,
                score: stored.score,
            })
            .await;

        Ok(stored)
    }

    /// Manual status change along the review state machine.
    pub async fn update_status(
        &self,
        actor: Uuid,
        submission_id: Uuid,
        new_status: SubmissionStatus,
    ) -> Result<Submission> {
        let submission = self
            .submissions
            .find_by_id(submission_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))?;
        authz::require(
            self.policy.as_ref(),
            actor,
            Action::UpdateStatus,
            Entity::Submission(submission_id),
        )
        .await?;

        if submission.status == new_status {
            return Ok(submission);
        }
        if !submission.status.can_transition_to(new_status) {
            return Err(AppError::InvalidTransition {
                from: submission.status,
                to: new_status,
            });
        }

        let updated = self.submissions.set_status(submission_id, new_status).await?;

        self.audit
            .record(
                AuditEntry::new(
                    actor,
                    AuditEntity::Submission(submission_id),
                    "status_updated",
                )
                .before(json!({ "status": submission.status.as_str() }))
                .after(json!({ "status": new_status.as_str() })),
            )
            .await;
        self.notifier
            .dispatch(Notification::StatusChanged {
                submission_id,
                author: updated.submitted_by,
                from: submission.status,
                to: new_status,
            })
            .await;

        Ok(updated)
    }

    /// Apply one action across many submissions, collecting failures
    /// instead of stopping on them.
    pub async fn bulk_apply(
        &self,
        actor: Uuid,
        submission_ids: &[Uuid],
        action: BulkAction,
    ) -> Result<BulkOutcome> {
        let mut outcome = BulkOutcome::default();

        for &submission_id in submission_ids {
            let result = match &action {
                BulkAction::Approve => self
                    .update_status(actor, submission_id, SubmissionStatus::Approved)
                    .await
                    .map(|_| ()),
                BulkAction::Reject => self
                    .update_status(actor, submission_id, SubmissionStatus::Rejected)
                    .await
                    .map(|_| ()),
                BulkAction::Review {
                    score,
                    feedback,
                    recommendation,
                } => self
                    .submit_review(
                        actor,
                        submission_id,
                        ReviewInput {
                            score: Some(*score),
                            criterion_scores: Vec::new(),
                            feedback: feedback.clone(),
                            recommendation: *recommendation,
                            strengths: None,
                            weaknesses: None,
                            suggestions: None,
                        },
                    )
                    .await
                    .map(|_| ()),
            };

            match result {
                Ok(()) => outcome.applied.push(submission_id),
                Err(e) => {
                    tracing::warn!(
                        "Bulk {} failed for submission {}: {}",
                        action.label(),
                        submission_id,
                        e
                    );
                    outcome.failed.push(BulkFailure {
                        submission_id,
                        error: e,
                    });
                }
            }
        }

        Ok(outcome)
    }
}

/// Checks every field and reports all violations together. Returns the
/// overall score to store: the weighted aggregate when a criterion
/// breakdown was supplied, the flat score otherwise.
fn validate_review_input(
    challenge: &Challenge,
    input: &ReviewInput,
    min_feedback_len: usize,
) -> Result<f64> {
    let mut errors = ValidationErrors::new();

    if input.feedback.trim().chars().count() < min_feedback_len {
        errors.add(
            "feedback",
            format!("must be at least {} characters", min_feedback_len),
        );
    }

    let overall = if !input.criterion_scores.is_empty() {
        if challenge.criteria.is_empty() {
            errors.add("criterion_scores", "challenge has no weighted criteria");
            0.0
        } else {
            for entry in &input.criterion_scores {
                if !(0.0..=100.0).contains(&entry.score) {
                    errors.add(
                        "criterion_scores",
                        format!("'{}': score must be between 0 and 100", entry.name),
                    );
                }
                if !challenge.criteria.iter().any(|c| c.name == entry.name) {
                    errors.add(
                        "criterion_scores",
                        format!("'{}': not a criterion of this challenge", entry.name),
                    );
                }
            }
            scoring::weighted_score(&challenge.criteria, &input.criterion_scores)
        }
    } else {
        match input.score {
            Some(score) if (0.0..=100.0).contains(&score) => score,
            Some(_) => {
                errors.add("score", "must be between 0 and 100");
                0.0
            }
            None => {
                errors.add("score", "required when no criterion scores are given");
                0.0
            }
        }
    };

    errors.into_result()?;
    Ok(overall)
}
