pub mod challenge_service;
pub mod review_service;
pub mod stats_service;
pub mod winner_service;

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::audit::AuditLog;
use crate::authz::AccessPolicy;
use crate::config::WorkflowConfig;
use crate::notify::Notifier;
use crate::repository::*;

pub use challenge_service::ChallengeService;
pub use review_service::{BulkAction, BulkFailure, BulkOutcome, QueueEntry, ReviewService};
pub use stats_service::StatsService;
pub use winner_service::{SelectWinnersRequest, WinnerAnnouncement, WinnerService};

pub struct ServiceContext {
    pub challenge_repo: Arc<dyn ChallengeRepository>,
    pub submission_repo: Arc<dyn SubmissionRepository>,
    pub review_repo: Arc<dyn ReviewRepository>,
    pub policy: Arc<dyn AccessPolicy>,
    pub notifier: Arc<Notifier>,
    pub audit: Arc<AuditLog>,
    pub challenge_service: Arc<ChallengeService>,
    pub review_service: Arc<ReviewService>,
    pub winner_service: Arc<WinnerService>,
    pub stats_service: Arc<StatsService>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(
        db_pool: SqlitePool,
        policy: Arc<dyn AccessPolicy>,
        notifier: Arc<Notifier>,
        audit: Arc<AuditLog>,
        workflow: WorkflowConfig,
    ) -> Self {
        let challenge_repo: Arc<dyn ChallengeRepository> =
            Arc::new(SqliteChallengeRepository::new(db_pool.clone()));
        let submission_repo: Arc<dyn SubmissionRepository> =
            Arc::new(SqliteSubmissionRepository::new(db_pool.clone()));
        let review_repo: Arc<dyn ReviewRepository> =
            Arc::new(SqliteReviewRepository::new(db_pool.clone()));

        let challenge_service = Arc::new(ChallengeService::new(
            challenge_repo.clone(),
            submission_repo.clone(),
            policy.clone(),
            audit.clone(),
        ));
        let review_service = Arc::new(ReviewService::new(
            challenge_repo.clone(),
            submission_repo.clone(),
            review_repo.clone(),
            policy.clone(),
            notifier.clone(),
            audit.clone(),
            workflow.clone(),
        ));
        let winner_service = Arc::new(WinnerService::new(
            challenge_repo.clone(),
            submission_repo.clone(),
            review_repo.clone(),
            policy.clone(),
            notifier.clone(),
            audit.clone(),
            workflow,
        ));
        let stats_service = Arc::new(StatsService::new(
            challenge_repo.clone(),
            submission_repo.clone(),
            review_repo.clone(),
        ));

        Self {
            challenge_repo,
            submission_repo,
            review_repo,
            policy,
            notifier,
            audit,
            challenge_service,
            review_service,
            winner_service,
            stats_service,
            db_pool,
        }
    }
}
