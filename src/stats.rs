//! Leaderboards and challenge statistics. Read-only derived views computed
//! from loaded submissions and their reviews; ranks are dense and 1-based,
//! ties keep their iteration order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Review, Submission};
use crate::eligibility;
use crate::scoring::{self, ParticipantScore};

/// A submission together with its reviews, the unit every view here is
/// computed from.
#[derive(Debug, Clone)]
pub struct SubmissionEntry {
    pub submission: Submission,
    pub reviews: Vec<Review>,
}

impl SubmissionEntry {
    pub fn average(&self) -> Option<f64> {
        scoring::average_score(&self.reviews)
    }

    pub fn review_count(&self) -> usize {
        self.reviews.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedSubmission {
    pub rank: usize,
    pub submission_id: Uuid,
    pub title: String,
    pub submitted_by: Uuid,
    pub is_team: bool,
    pub average_score: f64,
    pub review_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedParticipant {
    pub rank: usize,
    pub user_id: Uuid,
    pub submissions: usize,
    pub score: ParticipantScore,
}

/// Which participant aggregate a leaderboard ranks by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ParticipantMetric {
    Average,
    Best,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChallengeStatistics {
    pub total_submissions: usize,
    /// Distinct authors and team members across all submissions.
    pub participant_count: usize,
    pub team_submissions: usize,
    pub individual_submissions: usize,
    /// Submissions with at least one review.
    pub reviewed_count: usize,
    /// Mean of per-submission averages over reviewed submissions, 0 when
    /// nothing is reviewed yet.
    pub mean_average_score: f64,
    pub max_average_score: f64,
    /// reviewed / total × 100, one decimal place, 0 for an empty challenge.
    pub review_completion_rate: f64,
}

/// Top submissions by average score, descending.
pub fn top_submissions(entries: &[SubmissionEntry], limit: usize) -> Vec<RankedSubmission> {
    rank_submissions(entries.iter(), limit)
}

/// Top team submissions by average score, descending.
pub fn top_teams(entries: &[SubmissionEntry], limit: usize) -> Vec<RankedSubmission> {
    rank_submissions(entries.iter().filter(|e| e.submission.is_team), limit)
}

fn rank_submissions<'a>(
    entries: impl Iterator<Item = &'a SubmissionEntry>,
    limit: usize,
) -> Vec<RankedSubmission> {
    let mut scored: Vec<(&SubmissionEntry, f64)> = entries
        .filter(|e| eligibility::on_leaderboard(e.review_count()))
        .map(|e| {
            let average = e.average().unwrap_or(0.0);
            (e, average)
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit);
    scored
        .into_iter()
        .enumerate()
        .map(|(i, (entry, average))| RankedSubmission {
            rank: i + 1,
            submission_id: entry.submission.id,
            title: entry.submission.title.clone(),
            submitted_by: entry.submission.submitted_by,
            is_team: entry.submission.is_team,
            average_score: average,
            review_count: entry.review_count(),
        })
        .collect()
}

/// Top participants grouped by submitting author, ranked by the chosen
/// aggregate.
pub fn top_participants(
    entries: &[SubmissionEntry],
    limit: usize,
    metric: ParticipantMetric,
) -> Vec<RankedParticipant> {
    // Group per author, keeping first-seen order so ties stay stable.
    let mut grouped: Vec<(Uuid, Vec<Option<f64>>)> = Vec::new();
    for entry in entries {
        let author = entry.submission.submitted_by;
        match grouped.iter_mut().find(|(id, _)| *id == author) {
            Some((_, averages)) => averages.push(entry.average()),
            None => grouped.push((author, vec![entry.average()])),
        }
    }

    let mut scored: Vec<(Uuid, usize, ParticipantScore)> = grouped
        .into_iter()
        .map(|(user_id, averages)| {
            let score = scoring::participant_score(&averages);
            (user_id, averages.len(), score)
        })
        .collect();
    scored.sort_by(|a, b| {
        let (x, y) = match metric {
            ParticipantMetric::Average => (a.2.average, b.2.average),
            ParticipantMetric::Best => (a.2.best, b.2.best),
        };
        y.total_cmp(&x)
    });
    scored.truncate(limit);
    scored
        .into_iter()
        .enumerate()
        .map(|(i, (user_id, submissions, score))| RankedParticipant {
            rank: i + 1,
            user_id,
            submissions,
            score,
        })
        .collect()
}

pub fn challenge_statistics(entries: &[SubmissionEntry]) -> ChallengeStatistics {
    let total = entries.len();
    let participants: HashSet<Uuid> = entries
        .iter()
        .flat_map(|e| e.submission.participants())
        .collect();
    let team_submissions = entries.iter().filter(|e| e.submission.is_team).count();

    let averages: Vec<f64> = entries.iter().filter_map(|e| e.average()).collect();
    let reviewed_count = averages.len();
    let (mean, max) = if averages.is_empty() {
        (0.0, 0.0)
    } else {
        let mean = averages.iter().sum::<f64>() / averages.len() as f64;
        let max = averages.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (scoring::round1(mean), scoring::round1(max))
    };
    let completion_rate = if total == 0 {
        0.0
    } else {
        scoring::round1(reviewed_count as f64 / total as f64 * 100.0)
    };

    ChallengeStatistics {
        total_submissions: total,
        participant_count: participants.len(),
        team_submissions,
        individual_submissions: total - team_submissions,
        reviewed_count,
        mean_average_score: mean,
        max_average_score: max,
        review_completion_rate: completion_rate,
    }
}
