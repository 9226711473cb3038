use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OptionsError {
    #[error("learning steps cannot be empty")]
    EmptyLearningSteps,

    #[error("relearning steps cannot be empty")]
    EmptyRelearningSteps,

    #[error("step durations must be > 0 minutes")]
    InvalidStepDuration,

    #[error("graduating interval must be at least 1 day")]
    InvalidGraduatingInterval,

    #[error("easy interval must be at least 1 day")]
    InvalidEasyInterval,

    #[error("starting ease must be at least 1.3")]
    InvalidStartingEase,

    #[error("ease adjustments must be finite and non-negative")]
    InvalidEaseAdjustment,

    #[error("interval multipliers must be finite and > 0")]
    InvalidMultiplier,
}

//
// ─── SCHEDULER OPTIONS ─────────────────────────────────────────────────────────
//

/// Per-session scheduler configuration.
///
/// Supplied by the caller on every call; the scheduler persists nothing.
/// Callers must validate options before invoking the scheduler — an empty
/// step sequence is a fatal precondition violation once a transition needs
/// to index into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerOptions {
    max_new_per_day: u32,
    max_reviews_per_day: u32,
    learning_steps_mins: Vec<u32>,
    relearning_steps_mins: Vec<u32>,
    graduating_interval_days: u32,
    easy_interval_days: u32,
    starting_ease: f64,
    easy_ease_bonus: f64,
    hard_ease_penalty: f64,
    lapse_ease_penalty: f64,
    hard_interval_multiplier: f64,
    easy_bonus: f64,
    interval_modifier: f64,
    new_ignores_review_limit: bool,
}

impl SchedulerOptions {
    /// Creates the Anki-flavoured defaults:
    /// - learning steps 1 min and 10 min, one 10 min relearning step
    /// - graduate at 1 day, easy-graduate at 4 days
    /// - ease 2.5 with 0.15 bonus / 0.15 hard penalty / 0.2 lapse penalty
    /// - hard multiplier 1.2, easy bonus 1.3, interval modifier 1.0
    /// - 20 new and 200 reviews per day, new cards gated by the review cap
    #[must_use]
    pub fn anki_defaults() -> Self {
        Self {
            max_new_per_day: 20,
            max_reviews_per_day: 200,
            learning_steps_mins: vec![1, 10],
            relearning_steps_mins: vec![10],
            graduating_interval_days: 1,
            easy_interval_days: 4,
            starting_ease: 2.5,
            easy_ease_bonus: 0.15,
            hard_ease_penalty: 0.15,
            lapse_ease_penalty: 0.2,
            hard_interval_multiplier: 1.2,
            easy_bonus: 1.3,
            interval_modifier: 1.0,
            new_ignores_review_limit: false,
        }
    }

    /// Creates custom scheduler options.
    ///
    /// # Errors
    ///
    /// Returns an `OptionsError` when a step sequence is empty, a step
    /// duration is zero, an interval is zero, or a factor is out of range.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        max_new_per_day: u32,
        max_reviews_per_day: u32,
        learning_steps_mins: Vec<u32>,
        relearning_steps_mins: Vec<u32>,
        graduating_interval_days: u32,
        easy_interval_days: u32,
        starting_ease: f64,
        easy_ease_bonus: f64,
        hard_ease_penalty: f64,
        lapse_ease_penalty: f64,
        hard_interval_multiplier: f64,
        easy_bonus: f64,
        interval_modifier: f64,
        new_ignores_review_limit: bool,
    ) -> Result<Self, OptionsError> {
        if learning_steps_mins.is_empty() {
            return Err(OptionsError::EmptyLearningSteps);
        }
        if relearning_steps_mins.is_empty() {
            return Err(OptionsError::EmptyRelearningSteps);
        }
        if learning_steps_mins
            .iter()
            .chain(relearning_steps_mins.iter())
            .any(|&m| m == 0)
        {
            return Err(OptionsError::InvalidStepDuration);
        }
        if graduating_interval_days == 0 {
            return Err(OptionsError::InvalidGraduatingInterval);
        }
        if easy_interval_days == 0 {
            return Err(OptionsError::InvalidEasyInterval);
        }
        if !starting_ease.is_finite() || starting_ease < 1.3 {
            return Err(OptionsError::InvalidStartingEase);
        }
        for adjustment in [easy_ease_bonus, hard_ease_penalty, lapse_ease_penalty] {
            if !adjustment.is_finite() || adjustment < 0.0 {
                return Err(OptionsError::InvalidEaseAdjustment);
            }
        }
        for factor in [hard_interval_multiplier, easy_bonus, interval_modifier] {
            if !factor.is_finite() || factor <= 0.0 {
                return Err(OptionsError::InvalidMultiplier);
            }
        }

        Ok(Self {
            max_new_per_day,
            max_reviews_per_day,
            learning_steps_mins,
            relearning_steps_mins,
            graduating_interval_days,
            easy_interval_days,
            starting_ease,
            easy_ease_bonus,
            hard_ease_penalty,
            lapse_ease_penalty,
            hard_interval_multiplier,
            easy_bonus,
            interval_modifier,
            new_ignores_review_limit,
        })
    }

    // Accessors
    #[must_use]
    pub fn max_new_per_day(&self) -> u32 {
        self.max_new_per_day
    }

    #[must_use]
    pub fn max_reviews_per_day(&self) -> u32 {
        self.max_reviews_per_day
    }

    #[must_use]
    pub fn learning_steps_mins(&self) -> &[u32] {
        &self.learning_steps_mins
    }

    #[must_use]
    pub fn relearning_steps_mins(&self) -> &[u32] {
        &self.relearning_steps_mins
    }

    #[must_use]
    pub fn graduating_interval_days(&self) -> u32 {
        self.graduating_interval_days
    }

    #[must_use]
    pub fn easy_interval_days(&self) -> u32 {
        self.easy_interval_days
    }

    #[must_use]
    pub fn starting_ease(&self) -> f64 {
        self.starting_ease
    }

    #[must_use]
    pub fn easy_ease_bonus(&self) -> f64 {
        self.easy_ease_bonus
    }

    #[must_use]
    pub fn hard_ease_penalty(&self) -> f64 {
        self.hard_ease_penalty
    }

    #[must_use]
    pub fn lapse_ease_penalty(&self) -> f64 {
        self.lapse_ease_penalty
    }

    #[must_use]
    pub fn hard_interval_multiplier(&self) -> f64 {
        self.hard_interval_multiplier
    }

    #[must_use]
    pub fn easy_bonus(&self) -> f64 {
        self.easy_bonus
    }

    #[must_use]
    pub fn interval_modifier(&self) -> f64 {
        self.interval_modifier
    }

    /// When true, the new-card cap is honored independently of the review
    /// cap; when false, reaching the review cap also stops new cards.
    #[must_use]
    pub fn new_ignores_review_limit(&self) -> bool {
        self.new_ignores_review_limit
    }

    /// Builder-style override for the daily caps, for "extend today's
    /// limit" affordances.
    #[must_use]
    pub fn with_daily_caps(mut self, max_new: u32, max_reviews: u32) -> Self {
        self.max_new_per_day = max_new;
        self.max_reviews_per_day = max_reviews;
        self
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
