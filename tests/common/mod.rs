use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use crucible::{
    audit::AuditLog,
    authz::{AccessPolicy, Action, AllowAll, Entity},
    config::WorkflowConfig,
    domain::{
        Challenge, ChallengeCategory, CreateChallengeRequest, CreateSubmissionRequest,
        JudgingCriterion, Recommendation, Review, ReviewInput, Submission,
    },
    error::{AppError, Result},
    notify::{Notification, NotificationSink, Notifier},
    service::ServiceContext,
};
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Remembers every notification it was asked to deliver.
pub struct RecordingSink {
    delivered: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub async fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        self.delivered.lock().await.push(notification.clone());
        Ok(())
    }
}

/// Denies every capability check.
pub struct DenyAll;

#[async_trait]
impl AccessPolicy for DenyAll {
    async fn can(&self, _actor: Uuid, _action: Action, _entity: Entity) -> bool {
        false
    }
}

/// Always fails, for checking that delivery problems stay out of the
/// workflows.
pub struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    async fn deliver(&self, _notification: &Notification) -> Result<()> {
        Err(AppError::Database("sink is down".to_string()))
    }
}

pub struct TestHarness {
    pub ctx: ServiceContext,
    pub sink: Arc<RecordingSink>,
}

pub async fn setup() -> anyhow::Result<TestHarness> {
    setup_with_policy(Arc::new(AllowAll)).await
}

pub async fn setup_with_policy(policy: Arc<dyn AccessPolicy>) -> anyhow::Result<TestHarness> {
    // One connection, or every pooled connection would get its own
    // private in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let sink = Arc::new(RecordingSink::new());
    let notifier = Arc::new(Notifier::new());
    notifier.register(sink.clone()).await;
    let audit = Arc::new(AuditLog::new());

    let ctx = ServiceContext::new(pool, policy, notifier, audit, WorkflowConfig::default());
    Ok(TestHarness { ctx, sink })
}

/// An `Active` challenge with no weighted criteria, due `deadline_in` from
/// now.
pub async fn active_challenge(
    ctx: &ServiceContext,
    organizer: Uuid,
    deadline_in: Duration,
) -> anyhow::Result<Challenge> {
    let challenge = ctx
        .challenge_service
        .create_challenge(
            organizer,
            CreateChallengeRequest {
                title: "Office energy savings".to_string(),
                description: "Cut the building's energy use without hurting comfort".to_string(),
                category: ChallengeCategory::Sustainability,
                prize: None,
                deadline: Some(Utc::now() + deadline_in),
                criteria: Vec::new(),
                judging_notes: Some("Judged on measured impact".to_string()),
                publish: true,
            },
        )
        .await?;
    Ok(challenge)
}

/// An `Active` challenge carrying weighted criteria.
pub async fn criteria_challenge(
    ctx: &ServiceContext,
    organizer: Uuid,
    criteria: Vec<(&str, f64)>,
) -> anyhow::Result<Challenge> {
    let challenge = ctx
        .challenge_service
        .create_challenge(
            organizer,
            CreateChallengeRequest {
                title: "Faster onboarding".to_string(),
                description: "Halve the time from signed contract to first productive day"
                    .to_string(),
                category: ChallengeCategory::Process,
                prize: None,
                deadline: Some(Utc::now() + Duration::days(10)),
                criteria: criteria
                    .into_iter()
                    .map(|(name, weight)| JudgingCriterion {
                        name: name.to_string(),
                        weight,
                        description: None,
                    })
                    .collect(),
                judging_notes: None,
                publish: true,
            },
        )
        .await?;
    Ok(challenge)
}

pub async fn entry(
    ctx: &ServiceContext,
    author: Uuid,
    challenge_id: Uuid,
    title: &str,
) -> anyhow::Result<Submission> {
    team_entry(ctx, author, challenge_id, title, Vec::new()).await
}

pub async fn team_entry(
    ctx: &ServiceContext,
    author: Uuid,
    challenge_id: Uuid,
    title: &str,
    team_members: Vec<Uuid>,
) -> anyhow::Result<Submission> {
    let submission = ctx
        .challenge_service
        .submit_entry(
            author,
            challenge_id,
            CreateSubmissionRequest {
                title: title.to_string(),
                description: "A concrete plan with a measurable target".to_string(),
                team_members,
            },
        )
        .await?;
    Ok(submission)
}

/// Assigns the reviewer and submits a flat-scored review in one go.
pub async fn flat_review(
    ctx: &ServiceContext,
    reviewer: Uuid,
    submission_id: Uuid,
    score: f64,
) -> anyhow::Result<Review> {
    ctx.review_service
        .assign_reviewer(reviewer, submission_id)
        .await?;
    let review = ctx
        .review_service
        .submit_review(reviewer, submission_id, flat_input(score))
        .await?;
    Ok(review)
}

pub fn flat_input(score: f64) -> ReviewInput {
    ReviewInput {
        score: Some(score),
        criterion_scores: Vec::new(),
        feedback: "Solid work; the rollout plan could use more detail.".to_string(),
        recommendation: Recommendation::Approve,
        strengths: None,
        weaknesses: None,
        suggestions: None,
    }
}
