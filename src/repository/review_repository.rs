use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{CriterionScore, Recommendation, Review},
    error::{AppError, Result},
    repository::ReviewRepository,
};

#[derive(FromRow)]
struct ReviewRow {
    id: String,
    submission_id: String,
    reviewer_id: String,
    score: f64,
    feedback: String,
    recommendation: String,
    criterion_scores: String,
    strengths: Option<String>,
    weaknesses: Option<String>,
    suggestions: Option<String>,
    reviewed_at: NaiveDateTime,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteReviewRepository {
    pool: SqlitePool,
}

impl SqliteReviewRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_review(row: ReviewRow) -> Result<Review> {
        let criterion_scores: Vec<CriterionScore> = serde_json::from_str(&row.criterion_scores)
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Review {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            submission_id: Uuid::parse_str(&row.submission_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            reviewer_id: Uuid::parse_str(&row.reviewer_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            score: row.score,
            feedback: row.feedback,
            recommendation: Self::parse_recommendation(&row.recommendation)?,
            criterion_scores,
            strengths: row.strengths,
            weaknesses: row.weaknesses,
            suggestions: row.suggestions,
            reviewed_at: DateTime::from_naive_utc_and_offset(row.reviewed_at, Utc),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn parse_recommendation(s: &str) -> Result<Recommendation> {
        match s {
            "approve" => Ok(Recommendation::Approve),
            "reject" => Ok(Recommendation::Reject),
            "needs_revision" => Ok(Recommendation::NeedsRevision),
            _ => Err(AppError::Database(format!(
                "Invalid recommendation: {}",
                s
            ))),
        }
    }
}

#[async_trait]
impl ReviewRepository for SqliteReviewRepository {
    async fn record(&self, review: Review) -> Result<Review> {
        let id_str = review.id.to_string();
        let submission_str = review.submission_id.to_string();
        let reviewer_str = review.reviewer_id.to_string();
        let recommendation_str = review.recommendation.as_str();
        let scores_json = serde_json::to_string(&review.criterion_scores)
            .map_err(|e| AppError::Database(e.to_string()))?;
        let reviewed_naive = review.reviewed_at.naive_utc();
        let now = Utc::now().naive_utc();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // The unique (submission_id, reviewer_id) index turns a second
        // submission by the same reviewer into an in-place update.
        sqlx::query(
            r#"
            INSERT INTO reviews (
                id, submission_id, reviewer_id, score, feedback, recommendation,
                criterion_scores, strengths, weaknesses, suggestions,
                reviewed_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (submission_id, reviewer_id) DO UPDATE SET
                score = excluded.score,
                feedback = excluded.feedback,
                recommendation = excluded.recommendation,
                criterion_scores = excluded.criterion_scores,
                strengths = excluded.strengths,
                weaknesses = excluded.weaknesses,
                suggestions = excluded.suggestions,
                reviewed_at = excluded.reviewed_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&id_str)
        .bind(&submission_str)
        .bind(&reviewer_str)
        .bind(review.score)
        .bind(&review.feedback)
        .bind(recommendation_str)
        .bind(&scores_json)
        .bind(&review.strengths)
        .bind(&review.weaknesses)
        .bind(&review.suggestions)
        .bind(reviewed_naive)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        // Status and the derived average move together with the review;
        // a failure here rolls the upsert back too.
        sqlx::query(
            r#"
            UPDATE submissions
            SET status = 'reviewed',
                score = (SELECT AVG(score) FROM reviews WHERE submission_id = ?),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&submission_str)
        .bind(now)
        .bind(&submission_str)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let row = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT id, submission_id, reviewer_id, score, feedback, recommendation,
                   criterion_scores, strengths, weaknesses, suggestions,
                   reviewed_at, created_at, updated_at
            FROM reviews
            WHERE submission_id = ? AND reviewer_id = ?
            "#,
        )
        .bind(&submission_str)
        .bind(&reviewer_str)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Self::row_to_review(row)
    }

    async fn find_for_reviewer(
        &self,
        submission_id: Uuid,
        reviewer_id: Uuid,
    ) -> Result<Option<Review>> {
        let submission_str = submission_id.to_string();
        let reviewer_str = reviewer_id.to_string();
        let row = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT id, submission_id, reviewer_id, score, feedback, recommendation,
                   criterion_scores, strengths, weaknesses, suggestions,
                   reviewed_at, created_at, updated_at
            FROM reviews
            WHERE submission_id = ? AND reviewer_id = ?
            "#,
        )
        .bind(&submission_str)
        .bind(&reviewer_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_review(r)?)),
            None => Ok(None),
        }
    }

    async fn list_by_submission(&self, submission_id: Uuid) -> Result<Vec<Review>> {
        let submission_str = submission_id.to_string();
        let rows = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT id, submission_id, reviewer_id, score, feedback, recommendation,
                   criterion_scores, strengths, weaknesses, suggestions,
                   reviewed_at, created_at, updated_at
            FROM reviews
            WHERE submission_id = ?
            ORDER BY reviewed_at ASC
            "#,
        )
        .bind(&submission_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_review).collect()
    }

    async fn list_by_challenge(&self, challenge_id: Uuid) -> Result<Vec<Review>> {
        let challenge_str = challenge_id.to_string();
        let rows = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT r.id, r.submission_id, r.reviewer_id, r.score, r.feedback,
                   r.recommendation, r.criterion_scores, r.strengths, r.weaknesses,
                   r.suggestions, r.reviewed_at, r.created_at, r.updated_at
            FROM reviews r
            INNER JOIN submissions s ON s.id = r.submission_id
            WHERE s.challenge_id = ?
            ORDER BY r.reviewed_at ASC
            "#,
        )
        .bind(&challenge_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_review).collect()
    }

    async fn count_for_submission(&self, submission_id: Uuid) -> Result<i64> {
        let submission_str = submission_id.to_string();
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) as count
            FROM reviews
            WHERE submission_id = ?
            "#,
        )
        .bind(&submission_str)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(row.0)
    }
}
