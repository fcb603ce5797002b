use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Submission, SubmissionStatus},
    error::{AppError, Result},
    repository::SubmissionRepository,
};

#[derive(FromRow)]
struct SubmissionRow {
    id: String,
    challenge_id: String,
    submitted_by: String,
    title: String,
    description: String,
    is_team: i32,
    status: String,
    assigned_reviewer: Option<String>,
    score: Option<f64>,
    ranking: Option<i64>,
    submitted_at: NaiveDateTime,
    winner_announced_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteSubmissionRepository {
    pool: SqlitePool,
}

impl SqliteSubmissionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_submission(row: SubmissionRow, team_members: Vec<Uuid>) -> Result<Submission> {
        let assigned_reviewer = row
            .assigned_reviewer
            .as_ref()
            .map(|id| Uuid::parse_str(id))
            .transpose()
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Submission {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            challenge_id: Uuid::parse_str(&row.challenge_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            submitted_by: Uuid::parse_str(&row.submitted_by)
                .map_err(|e| AppError::Database(e.to_string()))?,
            title: row.title,
            description: row.description,
            is_team: row.is_team != 0,
            team_members,
            status: Self::parse_status(&row.status)?,
            assigned_reviewer,
            score: row.score,
            ranking: row.ranking,
            submitted_at: DateTime::from_naive_utc_and_offset(row.submitted_at, Utc),
            winner_announced_at: row
                .winner_announced_at
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn parse_status(s: &str) -> Result<SubmissionStatus> {
        match s {
            "draft" => Ok(SubmissionStatus::Draft),
            "submitted" => Ok(SubmissionStatus::Submitted),
            "under_review" => Ok(SubmissionStatus::UnderReview),
            "reviewed" => Ok(SubmissionStatus::Reviewed),
            "needs_revision" => Ok(SubmissionStatus::NeedsRevision),
            "approved" => Ok(SubmissionStatus::Approved),
            "rejected" => Ok(SubmissionStatus::Rejected),
            "winner" => Ok(SubmissionStatus::Winner),
            "completed" => Ok(SubmissionStatus::Completed),
            _ => Err(AppError::Database(format!(
                "Invalid submission status: {}",
                s
            ))),
        }
    }

    async fn load_team_members(&self, submission_id: &str) -> Result<Vec<Uuid>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT user_id
            FROM submission_members
            WHERE submission_id = ?
            ORDER BY user_id
            "#,
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(|(id,)| Uuid::parse_str(&id).map_err(|e| AppError::Database(e.to_string())))
            .collect()
    }

    async fn hydrate(&self, rows: Vec<SubmissionRow>) -> Result<Vec<Submission>> {
        let mut submissions = Vec::with_capacity(rows.len());
        for row in rows {
            let members = self.load_team_members(&row.id).await?;
            submissions.push(Self::row_to_submission(row, members)?);
        }
        Ok(submissions)
    }
}

#[async_trait]
impl SubmissionRepository for SqliteSubmissionRepository {
    async fn create(&self, submission: Submission) -> Result<Submission> {
        let id_str = submission.id.to_string();
        let challenge_str = submission.challenge_id.to_string();
        let author_str = submission.submitted_by.to_string();
        let is_team_int = if submission.is_team { 1i32 } else { 0i32 };
        let status_str = submission.status.as_str();
        let submitted_naive = submission.submitted_at.naive_utc();
        let now = Utc::now().naive_utc();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO submissions (
                id, challenge_id, submitted_by, title, description, is_team,
                status, assigned_reviewer, score, ranking, submitted_at,
                winner_announced_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, NULL, NULL, NULL, ?, NULL, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(&challenge_str)
        .bind(&author_str)
        .bind(&submission.title)
        .bind(&submission.description)
        .bind(is_team_int)
        .bind(status_str)
        .bind(submitted_naive)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        for member in &submission.team_members {
            let member_str = member.to_string();
            sqlx::query(
                r#"
                INSERT INTO submission_members (submission_id, user_id)
                VALUES (?, ?)
                ON CONFLICT (submission_id, user_id) DO NOTHING
                "#,
            )
            .bind(&id_str)
            .bind(&member_str)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(submission.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created submission".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Submission>> {
        let id_str = id.to_string();
        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"
            SELECT id, challenge_id, submitted_by, title, description, is_team,
                   status, assigned_reviewer, score, ranking, submitted_at,
                   winner_announced_at, created_at, updated_at
            FROM submissions
            WHERE id = ?
            "#,
        )
        .bind(&id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => {
                let members = self.load_team_members(&r.id).await?;
                Ok(Some(Self::row_to_submission(r, members)?))
            }
            None => Ok(None),
        }
    }

    async fn list_by_challenge(&self, challenge_id: Uuid) -> Result<Vec<Submission>> {
        let challenge_str = challenge_id.to_string();
        let rows = sqlx::query_as::<_, SubmissionRow>(
            r#"
            SELECT id, challenge_id, submitted_by, title, description, is_team,
                   status, assigned_reviewer, score, ranking, submitted_at,
                   winner_announced_at, created_at, updated_at
            FROM submissions
            WHERE challenge_id = ?
            ORDER BY submitted_at ASC
            "#,
        )
        .bind(&challenge_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.hydrate(rows).await
    }

    async fn list_awaiting_review(&self, reviewer: Uuid) -> Result<Vec<Submission>> {
        let reviewer_str = reviewer.to_string();
        let rows = sqlx::query_as::<_, SubmissionRow>(
            r#"
            SELECT s.id, s.challenge_id, s.submitted_by, s.title, s.description,
                   s.is_team, s.status, s.assigned_reviewer, s.score, s.ranking,
                   s.submitted_at, s.winner_announced_at, s.created_at, s.updated_at
            FROM submissions s
            INNER JOIN challenges c ON c.id = s.challenge_id
            WHERE c.status IN ('active', 'judging')
              AND (
                    (s.status = 'submitted' AND s.assigned_reviewer IS NULL)
                 OR (s.status = 'under_review' AND s.assigned_reviewer = ?)
              )
            ORDER BY s.submitted_at ASC
            "#,
        )
        .bind(&reviewer_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.hydrate(rows).await
    }

    async fn assign_if_unassigned(&self, id: Uuid, reviewer: Uuid) -> Result<Option<Submission>> {
        let id_str = id.to_string();
        let reviewer_str = reviewer.to_string();
        let now = Utc::now().naive_utc();

        // Single conditional UPDATE so two racing reviewers cannot both win.
        let result = sqlx::query(
            r#"
            UPDATE submissions
            SET assigned_reviewer = ?, status = 'under_review', updated_at = ?
            WHERE id = ?
              AND (assigned_reviewer IS NULL OR assigned_reviewer = ?)
              AND status IN ('submitted', 'under_review')
            "#,
        )
        .bind(&reviewer_str)
        .bind(now)
        .bind(&id_str)
        .bind(&reviewer_str)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let submission = self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve assigned submission".to_string())
        })?;
        Ok(Some(submission))
    }

    async fn set_status(&self, id: Uuid, status: SubmissionStatus) -> Result<Submission> {
        let id_str = id.to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE submissions
            SET status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(now)
        .bind(&id_str)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated submission".to_string())
        })
    }
}
