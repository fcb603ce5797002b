use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::{AuditEntity, AuditEntry, AuditLog},
    authz::{self, AccessPolicy, Action, Entity},
    config::WorkflowConfig,
    domain::{Challenge, Submission},
    error::{AppError, Result, ValidationErrors},
    eligibility,
    notify::{Notification, Notifier},
    repository::{ChallengeRepository, ReviewRepository, SubmissionRepository},
};

#[derive(Debug, Clone)]
pub struct SelectWinnersRequest {
    /// Ranked selection: the first id takes first place.
    pub submission_ids: Vec<Uuid>,
    pub announcement: String,
    pub notify_winners: bool,
    pub notify_participants: bool,
}

#[derive(Debug, Clone)]
pub struct WinnerAnnouncement {
    pub challenge: Challenge,
    /// In rank order.
    pub winners: Vec<Submission>,
}

pub struct WinnerService {
    challenges: Arc<dyn ChallengeRepository>,
    submissions: Arc<dyn SubmissionRepository>,
    reviews: Arc<dyn ReviewRepository>,
    policy: Arc<dyn AccessPolicy>,
    notifier: Arc<Notifier>,
    audit: Arc<AuditLog>,
    workflow: WorkflowConfig,
}

impl WinnerService {
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

    /// Rank the selected submissions, complete the challenge, and fan the
    /// news out. The state change is one transaction; either every winner
    /// is marked and the challenge completed, or nothing moved at all.
    /// Ranking follows the caller's order; scores are never consulted.
    pub async fn select_winners(
        &self,
        actor: Uuid,
        challenge_id: Uuid,
        request: SelectWinnersRequest,
    ) -> Result<WinnerAnnouncement> {
        let challenge = self
            .challenges
            .find_by_id(challenge_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Challenge not found".to_string()))?;
        authz::require(
            self.policy.as_ref(),
            actor,
            Action::SelectWinners,
            Entity::Challenge(challenge_id),
        )
        .await?;

        if !challenge.is_open_for_review() {
            return Err(AppError::AlreadyCompleted {
                challenge_id,
                status: challenge.status,
            });
        }
        let prior_status = challenge.status;
        if request.submission_ids.is_empty() {
            return Err(AppError::NoSelection);
        }
        if request.submission_ids.len() > self.workflow.max_winners {
            return Err(AppError::TooManyWinners {
                selected: request.submission_ids.len(),
                max: self.workflow.max_winners,
            });
        }

        let mut seen = HashSet::new();
        let mut errors = ValidationErrors::new();
        for id in &request.submission_ids {
            if !seen.insert(*id) {
                errors.add("submission_ids", format!("{} appears more than once", id));
            }
        }
        errors.into_result()?;

        let announcement_len = request.announcement.trim().chars().count();
        if announcement_len < self.workflow.announcement_min_len
            || announcement_len > self.workflow.announcement_max_len
        {
            return Err(AppError::InvalidAnnouncement {
                min: self.workflow.announcement_min_len,
                max: self.workflow.announcement_max_len,
                actual: announcement_len,
            });
        }

        // Eligibility over the challenge's current submissions and reviews
        let submissions = self.submissions.list_by_challenge(challenge_id).await?;
        let reviews = self.reviews.list_by_challenge(challenge_id).await?;
        let mut review_counts: HashMap<Uuid, usize> = HashMap::new();
        for review in &reviews {
            *review_counts.entry(review.submission_id).or_insert(0) += 1;
        }
        for id in &request.submission_ids {
            let submission = submissions
                .iter()
                .find(|s| s.id == *id)
                .ok_or(AppError::NotEligible { submission_id: *id })?;
            let count = review_counts.get(id).copied().unwrap_or(0);
            if !eligibility::winner_eligible(submission, count) {
                return Err(AppError::NotEligible { submission_id: *id });
            }
        }

        let announced_at = Utc::now();
        let completed = self
            .challenges
            .complete_with_winners(challenge_id, &request.submission_ids, announced_at)
            .await?;
        if !completed {
            // Lost the race to another selection
            let status = self
                .challenges
                .find_by_id(challenge_id)
                .await?
                .map(|c| c.status)
                .unwrap_or(crate::domain::ChallengeStatus::Completed);
            return Err(AppError::AlreadyCompleted {
                challenge_id,
                status,
            });
        }

        let challenge = self
            .challenges
            .find_by_id(challenge_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Challenge not found".to_string()))?;
        let mut winners = Vec::with_capacity(request.submission_ids.len());
        for id in &request.submission_ids {
            let winner = self
                .submissions
                .find_by_id(*id)
                .await?
                .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))?;
            winners.push(winner);
        }

        self.audit
            .record(
                AuditEntry::new(actor, AuditEntity::Challenge(challenge_id), "winners_selected")
                    .before(json!({ "status": prior_status.as_str() }))
                    .after(json!({
                        "status": challenge.status.as_str(),
                        "winners": request
                            .submission_ids
                            .iter()
                            .map(|id| id.to_string())
                            .collect::<Vec<_>>(),
                    })),
            )
            .await;

        // Fan-out happens strictly after the commit; a dead sink cannot
        // undo a completed challenge.
        if request.notify_winners {
            for (i, winner) in winners.iter().enumerate() {
                let rank = (i + 1) as i64;
                for recipient in winner.participants() {
                    self.notifier
                        .dispatch(Notification::WinnerAnnounced {
                            challenge_id,
                            submission_id: winner.id,
                            recipient,
                            rank,
                        })
                        .await;
                }
            }
        }
        if request.notify_participants {
            let winner_participants: HashSet<Uuid> =
                winners.iter().flat_map(|w| w.participants()).collect();
            let mut notified = HashSet::new();
            let mut recipients = Vec::new();
            for submission in &submissions {
                for participant in submission.participants() {
                    if !winner_participants.contains(&participant) && notified.insert(participant) {
                        recipients.push(participant);
                    }
                }
            }
            if !recipients.is_empty() {
                self.notifier
                    .dispatch(Notification::ResultsAnnounced {
                        challenge_id,
                        recipients,
                        announcement: request.announcement.clone(),
                    })
                    .await;
            }
        }

        Ok(WinnerAnnouncement { challenge, winners })
    }
}
