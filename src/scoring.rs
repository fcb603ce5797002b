//! Score aggregation over reviews. Everything here is pure; the services
//! feed in loaded rows and persist whatever comes out.

use serde::{Deserialize, Serialize};

use crate::domain::{CriterionScore, JudgingCriterion, Review};

/// Arithmetic mean of the overall review scores. An unreviewed submission
/// has no score at all, which is not the same thing as scoring zero.
pub fn average_score(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let sum: f64 = reviews.iter().map(|r| r.score).sum();
    Some(sum / reviews.len() as f64)
}

/// Weighted overall score for one reviewer's criterion breakdown, joined to
/// the challenge's criteria by name: round(Σ(score × weight) / Σ(weight), 1).
/// Criteria the reviewer did not score contribute neither score nor weight.
/// A total matched weight of zero yields 0.
pub fn weighted_score(criteria: &[JudgingCriterion], scores: &[CriterionScore]) -> f64 {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for criterion in criteria {
        if let Some(entry) = scores.iter().find(|s| s.name == criterion.name) {
            weighted_sum += entry.score * criterion.weight;
            total_weight += criterion.weight;
        }
    }
    if total_weight == 0.0 {
        return 0.0;
    }
    round1(weighted_sum / total_weight)
}

/// Participant-level aggregate across their submissions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ParticipantScore {
    /// Mean of per-submission average scores.
    pub average: f64,
    /// Best per-submission average score.
    pub best: f64,
}

/// Aggregates one participant's per-submission averages. Unreviewed
/// submissions (None) are excluded from both figures; a participant with no
/// reviewed submissions scores 0 on both.
pub fn participant_score(submission_averages: &[Option<f64>]) -> ParticipantScore {
    let scored: Vec<f64> = submission_averages.iter().flatten().copied().collect();
    if scored.is_empty() {
        return ParticipantScore {
            average: 0.0,
            best: 0.0,
        };
    }
    let average = scored.iter().sum::<f64>() / scored.len() as f64;
    let best = scored.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    ParticipantScore { average, best }
}

/// Round to one decimal place, the precision scores are displayed at.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
