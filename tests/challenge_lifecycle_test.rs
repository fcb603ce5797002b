mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{active_challenge, entry, flat_review, setup, setup_with_policy, DenyAll};
use crucible::{
    domain::{
        ChallengeCategory, ChallengeStatus, CreateChallengeRequest, CreateSubmissionRequest,
        JudgingCriterion, UpdateChallengeRequest,
    },
    error::AppError,
    repository::ChallengeRepository,
    service::SelectWinnersRequest,
};
use uuid::Uuid;

fn draft_request(title: &str) -> CreateChallengeRequest {
    CreateChallengeRequest {
        title: title.to_string(),
        description: "Find a better way to run the quarterly planning cycle".to_string(),
        category: ChallengeCategory::Process,
        prize: None,
        deadline: Some(Utc::now() + Duration::days(14)),
        criteria: Vec::new(),
        judging_notes: None,
        publish: false,
    }
}

#[tokio::test]
async fn drafts_move_through_active_to_judging() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    let organizer = Uuid::new_v4();

    let draft = ctx
        .challenge_service
        .create_challenge(organizer, draft_request("Planning"))
        .await?;
    assert_eq!(draft.status, ChallengeStatus::Draft);

    let active = ctx.challenge_service.publish(organizer, draft.id).await?;
    assert_eq!(active.status, ChallengeStatus::Active);

    let judging = ctx
        .challenge_service
        .begin_judging(organizer, draft.id)
        .await?;
    assert_eq!(judging.status, ChallengeStatus::Judging);

    // Re-running the same transition is a no-op success
    let again = ctx
        .challenge_service
        .begin_judging(organizer, draft.id)
        .await?;
    assert_eq!(again.status, ChallengeStatus::Judging);

    // But publishing a judging challenge is not a thing
    let err = ctx
        .challenge_service
        .publish(organizer, draft.id)
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            AppError::InvalidChallengeTransition {
                from: ChallengeStatus::Judging,
                to: ChallengeStatus::Active,
            }
        ),
        "got {err:?}"
    );

    Ok(())
}

#[tokio::test]
async fn deadlines_and_criteria_are_validated() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    let organizer = Uuid::new_v4();

    let mut stale = draft_request("Stale");
    stale.deadline = Some(Utc::now() - Duration::hours(1));
    let err = ctx
        .challenge_service
        .create_challenge(organizer, stale)
        .await
        .unwrap_err();
    match err {
        AppError::Validation(errors) => assert!(errors.contains("deadline")),
        other => panic!("expected validation failure, got {other:?}"),
    }

    let mut weightless = draft_request("Weightless");
    weightless.criteria = vec![JudgingCriterion {
        name: "Impact".to_string(),
        weight: 0.0,
        description: None,
    }];
    let err = ctx
        .challenge_service
        .create_challenge(organizer, weightless)
        .await
        .unwrap_err();
    match err {
        AppError::Validation(errors) => assert!(errors.contains("criteria")),
        other => panic!("expected validation failure, got {other:?}"),
    }

    // Updates revalidate the merged state
    let challenge = ctx
        .challenge_service
        .create_challenge(organizer, draft_request("Fine"))
        .await?;
    let err = ctx
        .challenge_service
        .update_challenge(
            organizer,
            challenge.id,
            UpdateChallengeRequest {
                deadline: Some(Utc::now() - Duration::days(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    Ok(())
}

#[tokio::test]
async fn cancel_is_terminal_except_for_completed() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    let organizer = Uuid::new_v4();

    let challenge = active_challenge(ctx, organizer, Duration::days(5)).await?;
    let cancelled = ctx.challenge_service.cancel(organizer, challenge.id).await?;
    assert_eq!(cancelled.status, ChallengeStatus::Cancelled);

    // Cancelling twice stays put
    let again = ctx.challenge_service.cancel(organizer, challenge.id).await?;
    assert_eq!(again.status, ChallengeStatus::Cancelled);

    // A completed challenge refuses
    let finished = active_challenge(ctx, organizer, Duration::days(5)).await?;
    let submission = entry(ctx, Uuid::new_v4(), finished.id, "Entry").await?;
    flat_review(ctx, Uuid::new_v4(), submission.id, 82.0).await?;
    ctx.winner_service
        .select_winners(
            organizer,
            finished.id,
            SelectWinnersRequest {
                submission_ids: vec![submission.id],
                announcement:
                    "The results are in; congratulations to the winning entry this quarter!"
                        .to_string(),
                notify_winners: false,
                notify_participants: false,
            },
        )
        .await?;
    let err = ctx
        .challenge_service
        .cancel(organizer, finished.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyCompleted { .. }), "got {err:?}");

    Ok(())
}

#[tokio::test]
async fn the_deadline_sweep_moves_overdue_challenges_to_judging() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    let organizer = Uuid::new_v4();

    let due_soon = active_challenge(ctx, organizer, Duration::hours(2)).await?;
    let due_later = active_challenge(ctx, organizer, Duration::days(9)).await?;

    // Run the sweep as if half a day had passed
    let moved = ctx
        .challenge_service
        .close_expired(organizer, Utc::now() + Duration::hours(12))
        .await?;
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].id, due_soon.id);
    assert_eq!(moved[0].status, ChallengeStatus::Judging);

    let untouched = ctx
        .challenge_repo
        .find_by_id(due_later.id)
        .await?
        .expect("exists");
    assert_eq!(untouched.status, ChallengeStatus::Active);

    Ok(())
}

#[tokio::test]
async fn only_drafts_can_be_deleted() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    let organizer = Uuid::new_v4();

    let draft = ctx
        .challenge_service
        .create_challenge(organizer, draft_request("Disposable"))
        .await?;
    ctx.challenge_service.delete_draft(organizer, draft.id).await?;
    assert!(ctx.challenge_repo.find_by_id(draft.id).await?.is_none());

    let live = active_challenge(ctx, organizer, Duration::days(5)).await?;
    let err = ctx
        .challenge_service
        .delete_draft(organizer, live.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    Ok(())
}

#[tokio::test]
async fn a_denying_policy_blocks_every_mutation() -> anyhow::Result<()> {
    let harness = setup_with_policy(Arc::new(DenyAll)).await?;
    let err = harness
        .ctx
        .challenge_service
        .create_challenge(Uuid::new_v4(), draft_request("Locked down"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn entries_only_land_on_active_challenges() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    let organizer = Uuid::new_v4();

    let draft = ctx
        .challenge_service
        .create_challenge(organizer, draft_request("Not yet"))
        .await?;
    let author = Uuid::new_v4();
    let err = ctx
        .challenge_service
        .submit_entry(
            author,
            draft.id,
            CreateSubmissionRequest {
                title: "Early bird".to_string(),
                description: "An entry before the gates open".to_string(),
                team_members: Vec::new(),
            },
        )
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            AppError::ChallengeNotOpen {
                status: ChallengeStatus::Draft,
                ..
            }
        ),
        "got {err:?}"
    );

    // The author never counts as their own team member
    let live = active_challenge(ctx, organizer, Duration::days(5)).await?;
    let solo = ctx
        .challenge_service
        .submit_entry(
            author,
            live.id,
            CreateSubmissionRequest {
                title: "Solo".to_string(),
                description: "Just me on this one".to_string(),
                team_members: vec![author],
            },
        )
        .await?;
    assert!(!solo.is_team);
    assert!(solo.team_members.is_empty());

    Ok(())
}
