mod common;

use chrono::Duration;
use common::{active_challenge, entry, flat_review, setup, team_entry};
use crucible::{error::AppError, stats::ParticipantMetric};
use uuid::Uuid;

#[tokio::test]
async fn leaderboard_orders_by_average_score() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    let organizer = Uuid::new_v4();
    let challenge = active_challenge(ctx, organizer, Duration::days(7)).await?;

    let low = entry(ctx, Uuid::new_v4(), challenge.id, "Low").await?;
    let high = entry(ctx, Uuid::new_v4(), challenge.id, "High").await?;
    let mid = entry(ctx, Uuid::new_v4(), challenge.id, "Mid").await?;
    let unreviewed = entry(ctx, Uuid::new_v4(), challenge.id, "Unreviewed").await?;

    flat_review(ctx, Uuid::new_v4(), low.id, 55.0).await?;
    flat_review(ctx, Uuid::new_v4(), high.id, 92.0).await?;
    flat_review(ctx, Uuid::new_v4(), mid.id, 78.0).await?;

    let board = ctx.stats_service.leaderboard(challenge.id, 10).await?;
    let order: Vec<Uuid> = board.iter().map(|r| r.submission_id).collect();
    assert_eq!(order, vec![high.id, mid.id, low.id]);
    assert_eq!(
        board.iter().map(|r| r.rank).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(!order.contains(&unreviewed.id));

    // A tighter limit trims from the bottom
    let top_two = ctx.stats_service.leaderboard(challenge.id, 2).await?;
    assert_eq!(top_two.len(), 2);
    assert_eq!(top_two[1].submission_id, mid.id);

    Ok(())
}

#[tokio::test]
async fn team_board_and_participant_board() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    let organizer = Uuid::new_v4();
    let challenge = active_challenge(ctx, organizer, Duration::days(7)).await?;

    let prolific = Uuid::new_v4();
    let steady = Uuid::new_v4();

    let team = team_entry(ctx, prolific, challenge.id, "Team", vec![Uuid::new_v4()]).await?;
    let solo_a = entry(ctx, prolific, challenge.id, "Solo A").await?;
    let solo_b = entry(ctx, steady, challenge.id, "Solo B").await?;

    flat_review(ctx, Uuid::new_v4(), team.id, 88.0).await?;
    flat_review(ctx, Uuid::new_v4(), solo_a.id, 58.0).await?;
    flat_review(ctx, Uuid::new_v4(), solo_b.id, 75.0).await?;

    let teams = ctx.stats_service.team_leaderboard(challenge.id, 10).await?;
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].submission_id, team.id);

    // prolific: average (88+58)/2 = 73, best 88; steady: 75 both ways
    let by_average = ctx
        .stats_service
        .participant_leaderboard(challenge.id, 10, ParticipantMetric::Average)
        .await?;
    assert_eq!(by_average[0].user_id, steady);
    assert_eq!(by_average[1].user_id, prolific);
    assert_eq!(by_average[1].submissions, 2);

    let by_best = ctx
        .stats_service
        .participant_leaderboard(challenge.id, 10, ParticipantMetric::Best)
        .await?;
    assert_eq!(by_best[0].user_id, prolific);
    assert_eq!(by_best[0].score.best, 88.0);

    Ok(())
}

#[tokio::test]
async fn statistics_reflect_the_challenge() -> anyhow::Result<()> {
    let harness = setup().await?;
    let ctx = &harness.ctx;
    let organizer = Uuid::new_v4();
    let challenge = active_challenge(ctx, organizer, Duration::days(7)).await?;

    let teammate = Uuid::new_v4();
    let team = team_entry(ctx, Uuid::new_v4(), challenge.id, "Team", vec![teammate]).await?;
    let solo = entry(ctx, Uuid::new_v4(), challenge.id, "Solo").await?;
    entry(ctx, Uuid::new_v4(), challenge.id, "Quiet").await?;
    entry(ctx, Uuid::new_v4(), challenge.id, "Silent").await?;

    flat_review(ctx, Uuid::new_v4(), team.id, 90.0).await?;
    flat_review(ctx, Uuid::new_v4(), solo.id, 70.0).await?;

    let statistics = ctx.stats_service.statistics(challenge.id).await?;
    assert_eq!(statistics.total_submissions, 4);
    assert_eq!(statistics.reviewed_count, 2);
    assert_eq!(statistics.review_completion_rate, 50.0);
    assert_eq!(statistics.team_submissions, 1);
    assert_eq!(statistics.individual_submissions, 3);
    // Four authors plus the one teammate
    assert_eq!(statistics.participant_count, 5);
    assert_eq!(statistics.mean_average_score, 80.0);
    assert_eq!(statistics.max_average_score, 90.0);

    Ok(())
}

#[tokio::test]
async fn unknown_challenges_are_reported_missing() -> anyhow::Result<()> {
    let harness = setup().await?;
    let err = harness
        .ctx
        .stats_service
        .statistics(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
    Ok(())
}
