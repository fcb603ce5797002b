mod common;

use std::sync::Arc;

use chrono::Duration;
use common::{
    active_challenge, criteria_challenge, entry, flat_input, flat_review, setup, FailingSink,
};
use crucible::{
    domain::{CriterionScore, Recommendation, ReviewInput, ReviewPriority, SubmissionStatus},
    eligibility,
    error::AppError,
    notify::Notification,
    repository::{ChallengeRepository, ReviewRepository, SubmissionRepository},
    service::BulkAction,
};
use uuid::Uuid;

#[tokio::test]
async fn assignment_is_exclusive_but_idempotent() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    let organizer = Uuid::new_v4();
    let challenge = active_challenge(ctx, organizer, Duration::days(5)).await?;
    let submission = entry(ctx, Uuid::new_v4(), challenge.id, "Entry").await?;

    let reviewer_a = Uuid::new_v4();
    let reviewer_b = Uuid::new_v4();

    let assigned = ctx
        .review_service
        .assign_reviewer(reviewer_a, submission.id)
        .await?;
    assert_eq!(assigned.status, SubmissionStatus::UnderReview);
    assert_eq!(assigned.assigned_reviewer, Some(reviewer_a));

    // Same reviewer again: no-op success
    let again = ctx
        .review_service
        .assign_reviewer(reviewer_a, submission.id)
        .await?;
    assert_eq!(again.assigned_reviewer, Some(reviewer_a));

    // A different reviewer loses
    let err = ctx
        .review_service
        .assign_reviewer(reviewer_b, submission.id)
        .await
        .unwrap_err();
    assert!(
        matches!(err, AppError::AlreadyAssigned { held_by, .. } if held_by == reviewer_a),
        "got {err:?}"
    );

    // Only the first claim told the author anything
    let review_started = harness
        .sink
        .delivered()
        .await
        .into_iter()
        .filter(|n| matches!(n, Notification::ReviewStarted { .. }))
        .count();
    assert_eq!(review_started, 1);

    Ok(())
}

#[tokio::test]
async fn second_review_by_the_same_reviewer_updates_in_place() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    let challenge = active_challenge(ctx, Uuid::new_v4(), Duration::days(5)).await?;
    let submission = entry(ctx, Uuid::new_v4(), challenge.id, "Entry").await?;
    let reviewer = Uuid::new_v4();

    flat_review(ctx, reviewer, submission.id, 70.0).await?;
    let reread = ctx
        .review_service
        .submit_review(reviewer, submission.id, flat_input(90.0))
        .await?;

    assert_eq!(reread.score, 90.0);
    assert_eq!(ctx.review_repo.count_for_submission(submission.id).await?, 1);

    // The stored row is the same one, carrying the newer score
    let row = ctx
        .review_repo
        .find_for_reviewer(submission.id, reviewer)
        .await?
        .expect("review exists");
    assert_eq!(row.score, 90.0);

    let stored = ctx
        .submission_repo
        .find_by_id(submission.id)
        .await?
        .expect("submission exists");
    assert_eq!(stored.status, SubmissionStatus::Reviewed);
    assert_eq!(stored.score, Some(90.0));

    Ok(())
}

#[tokio::test]
async fn review_validation_reports_every_bad_field() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    let challenge = active_challenge(ctx, Uuid::new_v4(), Duration::days(5)).await?;
    let submission = entry(ctx, Uuid::new_v4(), challenge.id, "Entry").await?;

    let err = ctx
        .review_service
        .submit_review(
            Uuid::new_v4(),
            submission.id,
            ReviewInput {
                score: Some(150.0),
                criterion_scores: Vec::new(),
                feedback: "too short".to_string(),
                recommendation: Recommendation::Approve,
                strengths: None,
                weaknesses: None,
                suggestions: None,
            },
        )
        .await
        .unwrap_err();

    match err {
        AppError::Validation(errors) => {
            assert_eq!(errors.errors().len(), 2);
            assert!(errors.contains("score"));
            assert!(errors.contains("feedback"));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }

    // Nothing was stored and the submission never moved
    assert_eq!(ctx.review_repo.count_for_submission(submission.id).await?, 0);
    let stored = ctx
        .submission_repo
        .find_by_id(submission.id)
        .await?
        .expect("submission exists");
    assert_eq!(stored.status, SubmissionStatus::Submitted);

    Ok(())
}

#[tokio::test]
async fn criterion_scores_produce_the_weighted_overall() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    let challenge = criteria_challenge(
        ctx,
        Uuid::new_v4(),
        vec![("Impact", 40.0), ("Feasibility", 35.0), ("Novelty", 25.0)],
    )
    .await?;
    let submission = entry(ctx, Uuid::new_v4(), challenge.id, "Entry").await?;
    let reviewer = Uuid::new_v4();

    let breakdown = |list: &[(&str, f64)]| -> Vec<CriterionScore> {
        list.iter()
            .map(|(name, score)| CriterionScore {
                name: name.to_string(),
                score: *score,
            })
            .collect()
    };

    let review = ctx
        .review_service
        .submit_review(
            reviewer,
            submission.id,
            ReviewInput {
                score: None,
                criterion_scores: breakdown(&[
                    ("Impact", 80.0),
                    ("Feasibility", 70.0),
                    ("Novelty", 60.0),
                ]),
                feedback: "Clear impact story, feasibility needs vendor quotes.".to_string(),
                recommendation: Recommendation::Approve,
                strengths: None,
                weaknesses: None,
                suggestions: None,
            },
        )
        .await?;
    assert_eq!(review.score, 71.5);

    // A breakdown naming an unknown criterion is rejected
    let err = ctx
        .review_service
        .submit_review(
            reviewer,
            submission.id,
            ReviewInput {
                score: None,
                criterion_scores: breakdown(&[("Speed", 90.0)]),
                feedback: "Scoring against the wrong rubric entirely here.".to_string(),
                recommendation: Recommendation::Approve,
                strengths: None,
                weaknesses: None,
                suggestions: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");

    Ok(())
}

#[tokio::test]
async fn manual_status_updates_follow_the_state_machine() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    let challenge = active_challenge(ctx, Uuid::new_v4(), Duration::days(5)).await?;
    let author = Uuid::new_v4();
    let submission = entry(ctx, author, challenge.id, "Entry").await?;
    let moderator = Uuid::new_v4();

    // Submitted cannot jump straight to Approved
    let err = ctx
        .review_service
        .update_status(moderator, submission.id, SubmissionStatus::Approved)
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            AppError::InvalidTransition {
                from: SubmissionStatus::Submitted,
                to: SubmissionStatus::Approved,
            }
        ),
        "got {err:?}"
    );

    flat_review(ctx, Uuid::new_v4(), submission.id, 75.0).await?;
    let approved = ctx
        .review_service
        .update_status(moderator, submission.id, SubmissionStatus::Approved)
        .await?;
    assert_eq!(approved.status, SubmissionStatus::Approved);

    // The author heard about it
    let delivered = harness.sink.delivered().await;
    assert!(delivered.iter().any(|n| matches!(
        n,
        Notification::StatusChanged {
            to: SubmissionStatus::Approved,
            author: a,
            ..
        } if *a == author
    )));

    Ok(())
}

#[tokio::test]
async fn bulk_apply_collects_failures_without_stopping() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    let challenge = active_challenge(ctx, Uuid::new_v4(), Duration::days(5)).await?;

    let reviewed_a = entry(ctx, Uuid::new_v4(), challenge.id, "A").await?;
    let reviewed_b = entry(ctx, Uuid::new_v4(), challenge.id, "B").await?;
    let untouched = entry(ctx, Uuid::new_v4(), challenge.id, "C").await?;
    flat_review(ctx, Uuid::new_v4(), reviewed_a.id, 80.0).await?;
    flat_review(ctx, Uuid::new_v4(), reviewed_b.id, 65.0).await?;

    let outcome = ctx
        .review_service
        .bulk_apply(
            Uuid::new_v4(),
            &[reviewed_a.id, untouched.id, reviewed_b.id],
            BulkAction::Approve,
        )
        .await?;

    assert_eq!(outcome.applied, vec![reviewed_a.id, reviewed_b.id]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].submission_id, untouched.id);
    assert!(!outcome.is_complete());

    // The failure changed nothing for the others
    let stored_b = ctx
        .submission_repo
        .find_by_id(reviewed_b.id)
        .await?
        .expect("exists");
    assert_eq!(stored_b.status, SubmissionStatus::Approved);

    Ok(())
}

#[tokio::test]
async fn bulk_review_scores_each_submission() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    let challenge = active_challenge(ctx, Uuid::new_v4(), Duration::days(5)).await?;
    let first = entry(ctx, Uuid::new_v4(), challenge.id, "A").await?;
    let second = entry(ctx, Uuid::new_v4(), challenge.id, "B").await?;

    let outcome = ctx
        .review_service
        .bulk_apply(
            Uuid::new_v4(),
            &[first.id, second.id],
            BulkAction::Review {
                score: 72.0,
                feedback: "Meets the bar for this round; see rubric notes.".to_string(),
                recommendation: Recommendation::Approve,
            },
        )
        .await?;
    assert!(outcome.is_complete());

    for id in [first.id, second.id] {
        let stored = ctx.submission_repo.find_by_id(id).await?.expect("exists");
        assert_eq!(stored.status, SubmissionStatus::Reviewed);
        assert_eq!(stored.score, Some(72.0));
    }

    Ok(())
}

#[tokio::test]
async fn closed_challenges_take_no_review_work() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    let organizer = Uuid::new_v4();
    let challenge = active_challenge(ctx, organizer, Duration::days(5)).await?;
    let submission = entry(ctx, Uuid::new_v4(), challenge.id, "Entry").await?;

    ctx.challenge_service.cancel(organizer, challenge.id).await?;

    let err = ctx
        .review_service
        .assign_reviewer(Uuid::new_v4(), submission.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ChallengeNotOpen { .. }), "got {err:?}");

    let err = ctx
        .review_service
        .submit_review(Uuid::new_v4(), submission.id, flat_input(70.0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ChallengeNotOpen { .. }), "got {err:?}");

    Ok(())
}

#[tokio::test]
async fn derived_score_averages_all_reviewers() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    let challenge = active_challenge(ctx, Uuid::new_v4(), Duration::days(5)).await?;
    let submission = entry(ctx, Uuid::new_v4(), challenge.id, "Entry").await?;

    flat_review(ctx, Uuid::new_v4(), submission.id, 60.0).await?;
    // A second reviewer weighs in without holding the assignment
    ctx.review_service
        .submit_review(Uuid::new_v4(), submission.id, flat_input(80.0))
        .await?;

    let stored = ctx
        .submission_repo
        .find_by_id(submission.id)
        .await?
        .expect("exists");
    assert_eq!(stored.score, Some(70.0));
    assert_eq!(ctx.review_repo.count_for_submission(submission.id).await?, 2);
    let reviews = ctx.review_repo.list_by_submission(submission.id).await?;
    assert_eq!(reviews.len(), 2);

    Ok(())
}

#[tokio::test]
async fn a_dead_sink_never_fails_the_workflow() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    ctx.notifier.register(Arc::new(FailingSink)).await;

    let challenge = active_challenge(ctx, Uuid::new_v4(), Duration::days(5)).await?;
    let submission = entry(ctx, Uuid::new_v4(), challenge.id, "Entry").await?;

    let review = flat_review(ctx, Uuid::new_v4(), submission.id, 77.0).await?;
    assert_eq!(review.score, 77.0);

    let stored = ctx
        .submission_repo
        .find_by_id(submission.id)
        .await?
        .expect("exists");
    assert_eq!(stored.status, SubmissionStatus::Reviewed);

    Ok(())
}

#[tokio::test]
async fn queue_puts_the_nearest_deadline_first() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    let organizer = Uuid::new_v4();

    let relaxed = active_challenge(ctx, organizer, Duration::days(10)).await?;
    let pressing = active_challenge(ctx, organizer, Duration::days(1)).await?;
    let slow_entry = entry(ctx, Uuid::new_v4(), relaxed.id, "Slow").await?;
    let urgent_entry = entry(ctx, Uuid::new_v4(), pressing.id, "Urgent").await?;

    let queue = ctx.review_service.review_queue(Uuid::new_v4()).await?;
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0].submission.id, urgent_entry.id);
    assert_eq!(queue[0].priority, ReviewPriority::Urgent);
    assert_eq!(queue[1].submission.id, slow_entry.id);
    assert_eq!(queue[1].priority, ReviewPriority::Low);

    Ok(())
}

#[tokio::test]
async fn eligibility_walkthrough_for_a_fresh_submission() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    let organizer = Uuid::new_v4();
    // Deadline six hours out: reviewable, and urgent in the queue
    let challenge = active_challenge(ctx, organizer, Duration::hours(6)).await?;
    let submission = entry(ctx, Uuid::new_v4(), challenge.id, "Entry").await?;

    let loaded = ctx
        .challenge_repo
        .find_by_id(challenge.id)
        .await?
        .expect("exists");
    assert!(eligibility::reviewable(&loaded));

    let count = ctx.review_repo.count_for_submission(submission.id).await? as usize;
    let stored = ctx
        .submission_repo
        .find_by_id(submission.id)
        .await?
        .expect("exists");
    assert!(!eligibility::winner_eligible(&stored, count));

    flat_review(ctx, Uuid::new_v4(), submission.id, 72.0).await?;

    let count = ctx.review_repo.count_for_submission(submission.id).await? as usize;
    let stored = ctx
        .submission_repo
        .find_by_id(submission.id)
        .await?
        .expect("exists");
    assert!(eligibility::winner_eligible(&stored, count));
    assert_eq!(stored.score, Some(72.0));

    Ok(())
}
