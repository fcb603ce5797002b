use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Challenge, ChallengeCategory, ChallengeStatus, JudgingCriterion},
    error::{AppError, Result},
    repository::ChallengeRepository,
};

#[derive(FromRow)]
struct ChallengeRow {
    id: String,
    title: String,
    description: String,
    category: String,
    prize: Option<String>,
    deadline: Option<NaiveDateTime>,
    criteria: String,
    judging_notes: Option<String>,
    status: String,
    created_by: String,
    winners_announced_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqliteChallengeRepository {
    pool: SqlitePool,
}

impl SqliteChallengeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_challenge(row: ChallengeRow) -> Result<Challenge> {
        let criteria: Vec<JudgingCriterion> =
            serde_json::from_str(&row.criteria).map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Challenge {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            title: row.title,
            description: row.description,
            category: Self::parse_category(&row.category)?,
            prize: row.prize,
            deadline: row
                .deadline
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            criteria,
            judging_notes: row.judging_notes,
            status: Self::parse_status(&row.status)?,
            created_by: Uuid::parse_str(&row.created_by)
                .map_err(|e| AppError::Database(e.to_string()))?,
            winners_announced_at: row
                .winners_announced_at
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn parse_status(s: &str) -> Result<ChallengeStatus> {
        match s {
            "draft" => Ok(ChallengeStatus::Draft),
            "active" => Ok(ChallengeStatus::Active),
            "judging" => Ok(ChallengeStatus::Judging),
            "completed" => Ok(ChallengeStatus::Completed),
            "cancelled" => Ok(ChallengeStatus::Cancelled),
            _ => Err(AppError::Database(format!("Invalid challenge status: {}", s))),
        }
    }

    fn parse_category(s: &str) -> Result<ChallengeCategory> {
        match s {
            "product" => Ok(ChallengeCategory::Product),
            "process" => Ok(ChallengeCategory::Process),
            "technology" => Ok(ChallengeCategory::Technology),
            "sustainability" => Ok(ChallengeCategory::Sustainability),
            "community" => Ok(ChallengeCategory::Community),
            "other" => Ok(ChallengeCategory::Other),
            _ => Err(AppError::Database(format!("Invalid category: {}", s))),
        }
    }

    fn category_to_str(category: &ChallengeCategory) -> &'static str {
        match category {
            ChallengeCategory::Product => "product",
            ChallengeCategory::Process => "process",
            ChallengeCategory::Technology => "technology",
            ChallengeCategory::Sustainability => "sustainability",
            ChallengeCategory::Community => "community",
            ChallengeCategory::Other => "other",
        }
    }
}

#[async_trait]
impl ChallengeRepository for SqliteChallengeRepository {
    async fn create(&self, challenge: Challenge) -> Result<Challenge> {
        let id_str = challenge.id.to_string();
        let category_str = Self::category_to_str(&challenge.category);
        let deadline_naive = challenge.deadline.map(|dt| dt.naive_utc());
        let criteria_json = serde_json::to_string(&challenge.criteria)
            .map_err(|e| AppError::Database(e.to_string()))?;
        let status_str = challenge.status.as_str();
        let created_by_str = challenge.created_by.to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO challenges (
                id, title, description, category, prize, deadline, criteria,
                judging_notes, status, created_by, winners_announced_at,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(&challenge.title)
        .bind(&challenge.description)
        .bind(category_str)
        .bind(&challenge.prize)
        .bind(deadline_naive)
        .bind(&criteria_json)
        .bind(&challenge.judging_notes)
        .bind(status_str)
        .bind(&created_by_str)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(challenge.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created challenge".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Challenge>> {
        let id_str = id.to_string();
        let row = sqlx::query_as::<_, ChallengeRow>(
            r#"
            SELECT id, title, description, category, prize, deadline, criteria,
                   judging_notes, status, created_by, winners_announced_at,
                   created_at, updated_at
            FROM challenges
            WHERE id = ?
            "#,
        )
        .bind(id_str)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_challenge(r)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Challenge>> {
        let rows = sqlx::query_as::<_, ChallengeRow>(
            r#"
            SELECT id, title, description, category, prize, deadline, criteria,
                   judging_notes, status, created_by, winners_announced_at,
                   created_at, updated_at
            FROM challenges
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_challenge).collect()
    }

    async fn list_expired_active(&self, now: DateTime<Utc>) -> Result<Vec<Challenge>> {
        let now_naive = now.naive_utc();
        let rows = sqlx::query_as::<_, ChallengeRow>(
            r#"
            SELECT id, title, description, category, prize, deadline, criteria,
                   judging_notes, status, created_by, winners_announced_at,
                   created_at, updated_at
            FROM challenges
            WHERE status = 'active' AND deadline IS NOT NULL AND deadline < ?
            ORDER BY deadline ASC
            "#,
        )
        .bind(now_naive)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_challenge).collect()
    }

    async fn update(&self, id: Uuid, challenge: Challenge) -> Result<Challenge> {
        let id_str = id.to_string();
        let category_str = Self::category_to_str(&challenge.category);
        let deadline_naive = challenge.deadline.map(|dt| dt.naive_utc());
        let criteria_json = serde_json::to_string(&challenge.criteria)
            .map_err(|e| AppError::Database(e.to_string()))?;
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE challenges
            SET title = ?, description = ?, category = ?, prize = ?, deadline = ?,
                criteria = ?, judging_notes = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&challenge.title)
        .bind(&challenge.description)
        .bind(category_str)
        .bind(&challenge.prize)
        .bind(deadline_naive)
        .bind(&criteria_json)
        .bind(&challenge.judging_notes)
        .bind(now)
        .bind(&id_str)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated challenge".to_string())
        })
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: &[ChallengeStatus],
        to: ChallengeStatus,
    ) -> Result<Option<Challenge>> {
        let id_str = id.to_string();
        let now = Utc::now().naive_utc();

        for from_status in from {
            let result = sqlx::query(
                r#"
                UPDATE challenges
                SET status = ?, updated_at = ?
                WHERE id = ? AND status = ?
                "#,
            )
            .bind(to.as_str())
            .bind(now)
            .bind(&id_str)
            .bind(from_status.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

            if result.rows_affected() > 0 {
                let challenge = self.find_by_id(id).await?.ok_or_else(|| {
                    AppError::Database("Failed to retrieve transitioned challenge".to_string())
                })?;
                return Ok(Some(challenge));
            }
        }

        Ok(None)
    }

    async fn complete_with_winners(
        &self,
        challenge_id: Uuid,
        winners: &[Uuid],
        announced_at: DateTime<Utc>,
    ) -> Result<bool> {
        let challenge_str = challenge_id.to_string();
        let announced_naive = announced_at.naive_utc();
        let now = Utc::now().naive_utc();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // The test-and-set that serializes concurrent selections: only one
        // caller can move the challenge out of its pre-completion status.
        let completed = sqlx::query(
            r#"
            UPDATE challenges
            SET status = 'completed', winners_announced_at = ?, updated_at = ?
            WHERE id = ? AND status IN ('active', 'judging')
            "#,
        )
        .bind(announced_naive)
        .bind(now)
        .bind(&challenge_str)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if completed.rows_affected() == 0 {
            return Ok(false);
        }

        for (i, submission_id) in winners.iter().enumerate() {
            let rank = (i + 1) as i64;
            let submission_str = submission_id.to_string();
            let updated = sqlx::query(
                r#"
                UPDATE submissions
                SET status = 'winner', ranking = ?, winner_announced_at = ?, updated_at = ?
                WHERE id = ? AND challenge_id = ?
                "#,
            )
            .bind(rank)
            .bind(announced_naive)
            .bind(now)
            .bind(&submission_str)
            .bind(&challenge_str)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

            // Dropping the transaction here rolls back the challenge update
            // and any winners already marked.
            if updated.rows_affected() == 0 {
                return Err(AppError::NotEligible {
                    submission_id: *submission_id,
                });
            }
        }

        sqlx::query(
            r#"
            UPDATE submissions
            SET status = 'completed', updated_at = ?
            WHERE challenge_id = ? AND status <> 'winner'
            "#,
        )
        .bind(now)
        .bind(&challenge_str)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let id_str = id.to_string();
        sqlx::query("DELETE FROM challenges WHERE id = ?")
            .bind(&id_str)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
