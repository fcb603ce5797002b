use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::{AuditEntity, AuditEntry, AuditLog},
    authz::{self, AccessPolicy, Action, Entity},
    domain::*,
    error::{AppError, Result, ValidationErrors},
    repository::{ChallengeRepository, SubmissionRepository},
};

pub struct ChallengeService {
    challenges: Arc<dyn ChallengeRepository>,
    submissions: Arc<dyn SubmissionRepository>,
    policy: Arc<dyn AccessPolicy>,
    audit: Arc<AuditLog>,
}

impl ChallengeService {
    pub fn new(
        challenges: Arc<dyn ChallengeRepository>,
        submissions: Arc<dyn SubmissionRepository>,
        policy: Arc<dyn AccessPolicy>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            challenges,
            submissions,
            policy,
            audit,
        }
    }

    pub async fn create_challenge(
        &self,
        actor: Uuid,
        request: CreateChallengeRequest,
    ) -> Result<Challenge> {
        let id = Uuid::new_v4();
        authz::require(
            self.policy.as_ref(),
            actor,
            Action::ManageChallenge,
            Entity::Challenge(id),
        )
        .await?;

        let now = Utc::now();
        validate_challenge_fields(
            &request.title,
            &request.description,
            request.deadline,
            &request.criteria,
            now,
        )?;

        let status = if request.publish {
            ChallengeStatus::Active
        } else {
            ChallengeStatus::Draft
        };
        let challenge = Challenge {
            id,
            title: request.title,
            description: request.description,
            category: request.category,
            prize: request.prize,
            deadline: request.deadline,
            criteria: request.criteria,
            judging_notes: request.judging_notes,
            status,
            created_by: actor,
            winners_announced_at: None,
            created_at: now,
            updated_at: now,
        };

        let created = self.challenges.create(challenge).await?;
        self.audit
            .record(
                AuditEntry::new(actor, AuditEntity::Challenge(created.id), "challenge_created")
                    .after(json!({ "status": created.status.as_str() })),
            )
            .await;
        Ok(created)
    }

    pub async fn update_challenge(
        &self,
        actor: Uuid,
        id: Uuid,
        update: UpdateChallengeRequest,
    ) -> Result<Challenge> {
        let mut challenge = self
            .challenges
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Challenge not found".to_string()))?;
        authz::require(
            self.policy.as_ref(),
            actor,
            Action::ManageChallenge,
            Entity::Challenge(id),
        )
        .await?;

        if matches!(
            challenge.status,
            ChallengeStatus::Completed | ChallengeStatus::Cancelled
        ) {
            return Err(AppError::AlreadyCompleted {
                challenge_id: id,
                status: challenge.status,
            });
        }

        if let Some(title) = update.title {
            challenge.title = title;
        }
        if let Some(description) = update.description {
            challenge.description = description;
        }
        if let Some(category) = update.category {
            challenge.category = category;
        }
        if let Some(prize) = update.prize {
            challenge.prize = Some(prize);
        }
        if let Some(deadline) = update.deadline {
            challenge.deadline = Some(deadline);
        }
        if let Some(criteria) = update.criteria {
            challenge.criteria = criteria;
        }
        if let Some(notes) = update.judging_notes {
            challenge.judging_notes = Some(notes);
        }

        validate_challenge_fields(
            &challenge.title,
            &challenge.description,
            challenge.deadline,
            &challenge.criteria,
            Utc::now(),
        )?;

        let updated = self.challenges.update(id, challenge).await?;
        self.audit
            .record(AuditEntry::new(
                actor,
                AuditEntity::Challenge(id),
                "challenge_updated",
            ))
            .await;
        Ok(updated)
    }

    pub async fn publish(&self, actor: Uuid, id: Uuid) -> Result<Challenge> {
        self.transition(actor, id, &[ChallengeStatus::Draft], ChallengeStatus::Active)
            .await
    }

    /// Manual move into judging once submissions should stop being scored
    /// as they arrive.
    pub async fn begin_judging(&self, actor: Uuid, id: Uuid) -> Result<Challenge> {
        self.transition(
            actor,
            id,
            &[ChallengeStatus::Active],
            ChallengeStatus::Judging,
        )
        .await
    }

    pub async fn cancel(&self, actor: Uuid, id: Uuid) -> Result<Challenge> {
        let challenge = self
            .challenges
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Challenge not found".to_string()))?;
        authz::require(
            self.policy.as_ref(),
            actor,
            Action::ManageChallenge,
            Entity::Challenge(id),
        )
        .await?;

        if challenge.status == ChallengeStatus::Cancelled {
            return Ok(challenge);
        }
        if challenge.status == ChallengeStatus::Completed {
            return Err(AppError::AlreadyCompleted {
                challenge_id: id,
                status: challenge.status,
            });
        }

        let cancelled = self
            .challenges
            .transition_status(
                id,
                &[
                    ChallengeStatus::Draft,
                    ChallengeStatus::Active,
                    ChallengeStatus::Judging,
                ],
                ChallengeStatus::Cancelled,
            )
            .await?
            .ok_or(AppError::AlreadyCompleted {
                challenge_id: id,
                status: ChallengeStatus::Completed,
            })?;

        self.audit
            .record(
                AuditEntry::new(actor, AuditEntity::Challenge(id), "challenge_cancelled")
                    .before(json!({ "status": challenge.status.as_str() })),
            )
            .await;
        Ok(cancelled)
    }

    /// Sweep every active challenge whose deadline has passed into judging.
    pub async fn close_expired(&self, actor: Uuid, now: DateTime<Utc>) -> Result<Vec<Challenge>> {
        let expired = self.challenges.list_expired_active(now).await?;
        let mut moved = Vec::new();

        for challenge in expired {
            match self
                .challenges
                .transition_status(
                    challenge.id,
                    &[ChallengeStatus::Active],
                    ChallengeStatus::Judging,
                )
                .await
            {
                Ok(Some(judging)) => {
                    self.audit
                        .record(AuditEntry::new(
                            actor,
                            AuditEntity::Challenge(judging.id),
                            "challenge_deadline_passed",
                        ))
                        .await;
                    moved.push(judging);
                }
                // Someone else moved it first; nothing to do
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(
                        "Failed to move expired challenge {} to judging: {}",
                        challenge.id,
                        e
                    );
                }
            }
        }

        Ok(moved)
    }

    /// Drafts that never went live can be removed outright; anything that
    /// accepted submissions must be cancelled instead.
    pub async fn delete_draft(&self, actor: Uuid, id: Uuid) -> Result<()> {
        let challenge = self
            .challenges
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Challenge not found".to_string()))?;
        authz::require(
            self.policy.as_ref(),
            actor,
            Action::ManageChallenge,
            Entity::Challenge(id),
        )
        .await?;

        if challenge.status != ChallengeStatus::Draft {
            let mut errors = ValidationErrors::new();
            errors.add("status", "only draft challenges can be deleted");
            return errors.into_result();
        }

        self.challenges.delete(id).await?;
        self.audit
            .record(AuditEntry::new(
                actor,
                AuditEntity::Challenge(id),
                "challenge_deleted",
            ))
            .await;
        Ok(())
    }

    pub async fn submit_entry(
        &self,
        actor: Uuid,
        challenge_id: Uuid,
        request: CreateSubmissionRequest,
    ) -> Result<Submission> {
        let challenge = self
            .challenges
            .find_by_id(challenge_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Challenge not found".to_string()))?;
        authz::require(
            self.policy.as_ref(),
            actor,
            Action::SubmitEntry,
            Entity::Challenge(challenge_id),
        )
        .await?;

        if !challenge.is_accepting_submissions() {
            return Err(AppError::ChallengeNotOpen {
                challenge_id,
                status: challenge.status,
            });
        }

        let mut errors = ValidationErrors::new();
        if request.title.trim().is_empty() {
            errors.add("title", "must not be empty");
        }
        if request.description.trim().is_empty() {
            errors.add("description", "must not be empty");
        }
        errors.into_result()?;

        // The author is implicit; keep the member list to everyone else,
        // without duplicates.
        let mut team_members: Vec<Uuid> = Vec::new();
        for member in request.team_members {
            if member != actor && !team_members.contains(&member) {
                team_members.push(member);
            }
        }

        let now = Utc::now();
        let submission = Submission {
            id: Uuid::new_v4(),
            challenge_id,
            submitted_by: actor,
            title: request.title,
            description: request.description,
            is_team: !team_members.is_empty(),
            team_members,
            status: SubmissionStatus::Submitted,
            assigned_reviewer: None,
            score: None,
            ranking: None,
            submitted_at: now,
            winner_announced_at: None,
            created_at: now,
            updated_at: now,
        };

        let created = self.submissions.create(submission).await?;
        self.audit
            .record(
                AuditEntry::new(
                    actor,
                    AuditEntity::Submission(created.id),
                    "entry_submitted",
                )
                .after(json!({ "challenge_id": challenge_id.to_string() })),
            )
            .await;
        Ok(created)
    }

    async fn transition(
        &self,
        actor: Uuid,
        id: Uuid,
        from: &[ChallengeStatus],
        to: ChallengeStatus,
    ) -> Result<Challenge> {
        let challenge = self
            .challenges
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Challenge not found".to_string()))?;
        authz::require(
            self.policy.as_ref(),
            actor,
            Action::ManageChallenge,
            Entity::Challenge(id),
        )
        .await?;

        if challenge.status == to {
            return Ok(challenge);
        }

        match self.challenges.transition_status(id, from, to).await? {
            Some(updated) => {
                self.audit
                    .record(
                        AuditEntry::new(actor, AuditEntity::Challenge(id), "challenge_status")
                            .before(json!({ "status": challenge.status.as_str() }))
                            .after(json!({ "status": updated.status.as_str() })),
                    )
                    .await;
                Ok(updated)
            }
            None => Err(AppError::InvalidChallengeTransition {
                from: challenge.status,
                to,
            }),
        }
    }
}

fn validate_challenge_fields(
    title: &str,
    description: &str,
    deadline: Option<DateTime<Utc>>,
    criteria: &[JudgingCriterion],
    now: DateTime<Utc>,
) -> Result<()> {
    let mut errors = ValidationErrors::new();

    if title.trim().is_empty() {
        errors.add("title", "must not be empty");
    }
    if description.trim().is_empty() {
        errors.add("description", "must not be empty");
    }
    if let Some(deadline) = deadline {
        if deadline <= now {
            errors.add("deadline", "must be in the future");
        }
    }
    for criterion in criteria {
        if criterion.name.trim().is_empty() {
            errors.add("criteria", "criterion names must not be empty");
        }
        if criterion.weight <= 0.0 {
            errors.add(
                "criteria",
                format!("criterion '{}' must have a positive weight", criterion.name),
            );
        }
    }
    let mut names: Vec<&str> = criteria.iter().map(|c| c.name.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    if names.len() != criteria.len() {
        errors.add("criteria", "criterion names must be unique");
    }

    errors.into_result()
}
