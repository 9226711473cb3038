use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{LearnerId, VocabId};
use crate::time::{DayKey, DayKeyFn};

/// Canonical default ease factor for a freshly graduated card.
pub const DEFAULT_EASE: f64 = 2.5;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Errors for progress-record values arriving from outside the core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProgressError {
    /// A persisted record carried a state string this version does not know.
    /// This is a data-integrity fault and must be surfaced, never defaulted.
    #[error("unknown study state: {0:?}")]
    UnknownState(String),

    #[error("invalid rating value: {0}")]
    InvalidRating(u8),
}

//
// ─── STUDY STATE ───────────────────────────────────────────────────────────────
//

/// Lifecycle state of a vocabulary card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StudyState {
    /// Never rated. A record with `reps == 0` is always `New`.
    New,
    /// Working through the short learning steps before first graduation.
    Learning,
    /// Graduated; scheduled on day-scale intervals grown by ease.
    Review,
    /// Lapsed out of review; working through the relearning steps.
    Relearning,
}

impl StudyState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StudyState::New => "new",
            StudyState::Learning => "learning",
            StudyState::Review => "review",
            StudyState::Relearning => "relearning",
        }
    }
}

impl FromStr for StudyState {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(StudyState::New),
            "learning" => Ok(StudyState::Learning),
            "review" => Ok(StudyState::Review),
            "relearning" => Ok(StudyState::Relearning),
            other => Err(ProgressError::UnknownState(other.to_string())),
        }
    }
}

//
// ─── RATING ────────────────────────────────────────────────────────────────────
//

/// Four-level recall rating driving every state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    /// Failed to recall. Resets learning steps; lapses a review card.
    Again,
    /// Recalled with significant difficulty. Interval grows slowly.
    Hard,
    /// Recalled correctly. Standard progression.
    Good,
    /// Recalled instantly. Graduates early or grows the interval the most.
    Easy,
}

impl Rating {
    /// Converts a numeric rating (0-3) to a `Rating`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidRating` if the value is not in 0-3.
    pub fn from_u8(value: u8) -> Result<Self, ProgressError> {
        match value {
            0 => Ok(Self::Again),
            1 => Ok(Self::Hard),
            2 => Ok(Self::Good),
            3 => Ok(Self::Easy),
            _ => Err(ProgressError::InvalidRating(value)),
        }
    }

    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Rating::Again => 0,
            Rating::Hard => 1,
            Rating::Good => 2,
            Rating::Easy => 3,
        }
    }
}

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// The scheduler's sole mutable entity: one per (learner, vocabulary item).
///
/// Created lazily on the first rating (no record means implicitly `New`),
/// mutated by `scheduler::apply_rating` on every rating afterwards, and never
/// deleted by the scheduler. All state lives in this record; the scheduler
/// itself holds none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub learner_id: LearnerId,
    pub vocab_id: VocabId,
    pub state: StudyState,
    /// Instant the card becomes eligible again. Meaningless while `New`.
    pub due_at: DateTime<Utc>,
    /// Last computed review interval in days; 0 until first graduation.
    pub interval_days: u32,
    /// Multiplicative interval growth factor; meaningful once graduated.
    pub ease: f64,
    /// Position within the learning/relearning step sequence. Only
    /// meaningful while `state` is `Learning` or `Relearning`.
    pub step_index: usize,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    /// Total ratings applied.
    pub reps: u32,
    /// Count of `Again` ratings received while in `Review`.
    pub lapses: u32,
    /// Instant of the very first rating. Write-once.
    pub first_reviewed_at: Option<DateTime<Utc>>,
    /// Study day of the very first rating, in the reference timezone.
    /// Write-once; the source of truth for "new cards introduced today".
    pub first_reviewed_day: Option<DayKey>,
}

impl ProgressRecord {
    /// Creates the implicit-`New` record for a card the learner has never
    /// rated before.
    #[must_use]
    pub fn new_for(learner_id: LearnerId, vocab_id: VocabId, now: DateTime<Utc>) -> Self {
        Self {
            learner_id,
            vocab_id,
            state: StudyState::New,
            due_at: now,
            interval_days: 0,
            ease: DEFAULT_EASE,
            step_index: 0,
            last_reviewed_at: None,
            reps: 0,
            lapses: 0,
            first_reviewed_at: None,
            first_reviewed_day: None,
        }
    }

    /// True when the card's scheduled instant has passed.
    ///
    /// Eligibility is independent of `state`; callers combine it with
    /// `scheduler::classify` as needed.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_at <= now
    }

    /// Records the first-review instant and study day exactly once.
    ///
    /// A no-op when the fact is already set; later ratings must never
    /// overwrite it.
    pub fn mark_first_review(&mut self, now: DateTime<Utc>, day_key: DayKeyFn) {
        if self.first_reviewed_at.is_none() {
            self.first_reviewed_at = Some(now);
            self.first_reviewed_day = Some(day_key(now));
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
