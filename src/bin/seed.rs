use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::Parser;
use crucible::{
    audit::{AuditLog, LogAuditSink},
    authz::AllowAll,
    config::Settings,
    domain::{
        ChallengeCategory, CreateChallengeRequest, CreateSubmissionRequest, CriterionScore,
        JudgingCriterion, Recommendation, ReviewInput,
    },
    notify::{LogNotificationSink, Notifier},
    repository::ChallengeRepository,
    service::{SelectWinnersRequest, ServiceContext},
};
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "seed", about = "Populate a crucible database with demo data")]
struct Args {
    /// Database URL; falls back to DATABASE_URL, then a local sqlite file
    #[arg(long)]
    database_url: Option<String>,

    /// How many participants submit entries
    #[arg(long, default_value_t = 6)]
    participants: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crucible=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });
    let database_url = args
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or(settings.database.url.clone());

    println!("🌱 Seeding demo data into {}", database_url);

    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&database_url)
        .await?;

    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    let notifier = Arc::new(Notifier::new());
    notifier.register(Arc::new(LogNotificationSink)).await;
    let audit = Arc::new(AuditLog::new());
    audit.register(Arc::new(LogAuditSink)).await;

    let ctx = ServiceContext::new(
        db_pool,
        Arc::new(AllowAll),
        notifier,
        audit,
        settings.workflow,
    );

    // An organizer opens a challenge with weighted criteria
    let organizer = Uuid::new_v4();
    let challenge = ctx
        .challenge_service
        .create_challenge(
            organizer,
            CreateChallengeRequest {
                title: "Low-waste packaging".to_string(),
                description: "Redesign our shipping packaging to cut material waste in half \
                              without raising per-unit cost."
                    .to_string(),
                category: ChallengeCategory::Sustainability,
                prize: Some("Pilot budget and a demo slot at the all-hands".to_string()),
                deadline: Some(Utc::now() + Duration::days(5)),
                criteria: vec![
                    JudgingCriterion {
                        name: "Impact".to_string(),
                        weight: 40.0,
                        description: Some("Waste reduction at projected volumes".to_string()),
                    },
                    JudgingCriterion {
                        name: "Feasibility".to_string(),
                        weight: 35.0,
                        description: None,
                    },
                    JudgingCriterion {
                        name: "Novelty".to_string(),
                        weight: 25.0,
                        description: None,
                    },
                ],
                judging_notes: None,
                publish: true,
            },
        )
        .await?;
    println!("  ✅ Created challenge '{}'", challenge.title);

    // Participants submit entries; every third one as a team
    let mut entry_ids = Vec::new();
    for i in 0..args.participants {
        let author = Uuid::new_v4();
        let team_members = if i % 3 == 0 {
            vec![Uuid::new_v4()]
        } else {
            Vec::new()
        };
        let submission = ctx
            .challenge_service
            .submit_entry(
                author,
                challenge.id,
                CreateSubmissionRequest {
                    title: format!("Packaging concept #{}", i + 1),
                    description: "Replaces molded foam inserts with folded corrugate cut from \
                                  the same blank as the outer box."
                        .to_string(),
                    team_members,
                },
            )
            .await?;
        entry_ids.push(submission.id);
    }
    println!("  ✅ Submitted {} entries", entry_ids.len());

    // A reviewer works the queue, scoring most entries
    let reviewer = Uuid::new_v4();
    let queue = ctx.review_service.review_queue(reviewer).await?;
    let to_review: Vec<_> = queue.iter().take(args.participants.max(1) - 1).collect();
    for (i, entry) in to_review.iter().enumerate() {
        ctx.review_service
            .assign_reviewer(reviewer, entry.submission.id)
            .await?;
        let base = 68.0 + (i as f64) * 6.0;
        ctx.review_service
            .submit_review(
                reviewer,
                entry.submission.id,
                ReviewInput {
                    score: None,
                    criterion_scores: vec![
                        CriterionScore {
                            name: "Impact".to_string(),
                            score: (base + 8.0).min(100.0),
                        },
                        CriterionScore {
                            name: "Feasibility".to_string(),
                            score: base,
                        },
                        CriterionScore {
                            name: "Novelty".to_string(),
                            score: (base - 6.0).max(0.0),
                        },
                    ],
                    feedback: "Strong direction overall; the cost model needs supplier quotes \
                               before a pilot."
                        .to_string(),
                    recommendation: Recommendation::Approve,
                    strengths: Some("Uses existing die-cut tooling".to_string()),
                    weaknesses: None,
                    suggestions: None,
                },
            )
            .await?;
        println!(
            "  📝 Reviewed '{}' ({} priority)",
            entry.submission.title, entry.priority
        );
    }

    // Winners from the top of the leaderboard, ranked by score
    let leaderboard = ctx.stats_service.leaderboard(challenge.id, 3).await?;
    let winner_ids: Vec<Uuid> = leaderboard
        .iter()
        .take(2)
        .map(|r| r.submission_id)
        .collect();
    if !winner_ids.is_empty() {
        ctx.winner_service
            .select_winners(
                organizer,
                challenge.id,
                SelectWinnersRequest {
                    submission_ids: winner_ids,
                    announcement: "Thanks to everyone who entered! The judges were impressed \
                                   by the depth of the submissions this round; the winning \
                                   concepts go to pilot next month."
                        .to_string(),
                    notify_winners: true,
                    notify_participants: true,
                },
            )
            .await?;
        println!("  🏆 Winners announced");
    }

    let challenges = ctx.challenge_repo.list(20, 0).await?;
    println!("📋 {} challenge(s) in the database", challenges.len());

    let statistics = ctx.stats_service.statistics(challenge.id).await?;
    println!(
        "📊 {} submissions from {} participants, {:.1}% reviewed, best score {:.1}",
        statistics.total_submissions,
        statistics.participant_count,
        statistics.review_completion_rate,
        statistics.max_average_score,
    );
    println!("✨ Seeding complete");

    Ok(())
}
