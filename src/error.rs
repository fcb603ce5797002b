use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::{ChallengeStatus, SubmissionStatus};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Submission {submission_id} is already assigned to reviewer {held_by}")]
    AlreadyAssigned { submission_id: Uuid, held_by: Uuid },

    #[error("Challenge {challenge_id} is already {status}")]
    AlreadyCompleted {
        challenge_id: Uuid,
        status: ChallengeStatus,
    },

    #[error("Challenge {challenge_id} is not open ({status})")]
    ChallengeNotOpen {
        challenge_id: Uuid,
        status: ChallengeStatus,
    },

    #[error("Cannot transition submission from {from} to {to}")]
    InvalidTransition {
        from: SubmissionStatus,
        to: SubmissionStatus,
    },

    #[error("Cannot transition challenge from {from} to {to}")]
    InvalidChallengeTransition {
        from: ChallengeStatus,
        to: ChallengeStatus,
    },

    #[error("Submission {submission_id} is not eligible for winner selection")]
    NotEligible { submission_id: Uuid },

    #[error("No submissions selected")]
    NoSelection,

    #[error("{selected} winners selected, the limit is {max}")]
    TooManyWinners { selected: usize, max: usize },

    #[error("Announcement must be between {min} and {max} characters, got {actual}")]
    InvalidAnnouncement {
        min: usize,
        max: usize,
        actual: usize,
    },
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

/// Field-level validation failures, collected so the caller sees every
/// violated field at once rather than one per round trip.
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

#[derive(Debug, Clone)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn contains(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// Ok when no field failed, otherwise the whole list as one error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}
