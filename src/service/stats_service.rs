use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    domain::Review,
    error::{AppError, Result},
    repository::{ChallengeRepository, ReviewRepository, SubmissionRepository},
    stats::{
        self, ChallengeStatistics, ParticipantMetric, RankedParticipant, RankedSubmission,
        SubmissionEntry,
    },
};

/// Read-only views: loads a challenge's submissions with their reviews and
/// hands the numbers to the pure functions in `stats`.
pub struct StatsService {
    challenges: Arc<dyn ChallengeRepository>,
    submissions: Arc<dyn SubmissionRepository>,
    reviews: Arc<dyn ReviewRepository>,
}

impl StatsService {
    pub fn new(
        challenges: Arc<dyn ChallengeRepository>,
        submissions: Arc<dyn SubmissionRepository>,
        reviews: Arc<dyn ReviewRepository>,
    ) -> Self {
        Self {
            challenges,
            submissions,
            reviews,
        }
    }

    pub async fn leaderboard(
        &self,
        challenge_id: Uuid,
        limit: usize,
    ) -> Result<Vec<RankedSubmission>> {
        let entries = self.load_entries(challenge_id).await?;
        Ok(stats::top_submissions(&entries, limit))
    }

    pub async fn team_leaderboard(
        &self,
        challenge_id: Uuid,
        limit: usize,
    ) -> Result<Vec<RankedSubmission>> {
        let entries = self.load_entries(challenge_id).await?;
        Ok(stats::top_teams(&entries, limit))
    }

    pub async fn participant_leaderboard(
        &self,
        challenge_id: Uuid,
        limit: usize,
        metric: ParticipantMetric,
    ) -> Result<Vec<RankedParticipant>> {
        let entries = self.load_entries(challenge_id).await?;
        Ok(stats::top_participants(&entries, limit, metric))
    }

    pub async fn statistics(&self, challenge_id: Uuid) -> Result<ChallengeStatistics> {
        let entries = self.load_entries(challenge_id).await?;
        Ok(stats::challenge_statistics(&entries))
    }

    async fn load_entries(&self, challenge_id: Uuid) -> Result<Vec<SubmissionEntry>> {
        self.challenges
            .find_by_id(challenge_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Challenge not found".to_string()))?;

        let submissions = self.submissions.list_by_challenge(challenge_id).await?;
        let reviews = self.reviews.list_by_challenge(challenge_id).await?;

        let mut by_submission: HashMap<Uuid, Vec<Review>> = HashMap::new();
        for review in reviews {
            by_submission
                .entry(review.submission_id)
                .or_default()
                .push(review);
        }

        Ok(submissions
            .into_iter()
            .map(|submission| SubmissionEntry {
                reviews: by_submission.remove(&submission.id).unwrap_or_default(),
                submission,
            })
            .collect())
    }
}
