//! Capability checks. Authorization itself lives outside this crate; every
//! mutating operation names its actor explicitly and asks the injected
//! policy before touching state.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ManageChallenge,
    SubmitEntry,
    AssignReviewer,
    SubmitReview,
    UpdateStatus,
    SelectWinners,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Challenge(Uuid),
    Submission(Uuid),
}

#[async_trait]
pub trait AccessPolicy: Send + Sync {
    async fn can(&self, actor: Uuid, action: Action, entity: Entity) -> bool;
}

/// Grants everything. Wiring default; real deployments inject their own
/// policy.
pub struct AllowAll;

#[async_trait]
impl AccessPolicy for AllowAll {
    async fn can(&self, _actor: Uuid, _action: Action, _entity: Entity) -> bool {
        true
    }
}

pub async fn require(
    policy: &dyn AccessPolicy,
    actor: Uuid,
    action: Action,
    entity: Entity,
) -> Result<()> {
    if policy.can(actor, action, entity).await {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}
