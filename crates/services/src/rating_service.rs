use chrono::{DateTime, Utc};
use serde::Serialize;

use storage::repository::ProgressRepository;
use vocab_core::model::{
    LearnerId, ProgressRecord, Rating, SchedulerOptions, StudyState, VocabId,
};
use vocab_core::scheduler::{apply_rating, classify};
use vocab_core::time::Clock;

use crate::error::RatingServiceError;

//
// ─── RATED CARD ────────────────────────────────────────────────────────────────
//

/// Outcome of rating one card: the state it was rated from and the stored
/// record after the transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatedCard {
    pub previous_state: StudyState,
    pub record: ProgressRecord,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Applies a learner's rating to a card and persists the transition.
pub struct RatingService {
    clock: Clock,
    options: SchedulerOptions,
}

impl RatingService {
    /// Create a rating service with the given scheduling options and a
    /// real-time clock.
    #[must_use]
    pub fn new(options: SchedulerOptions) -> Self {
        Self {
            clock: Clock::default(),
            options,
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[must_use]
    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Apply a rating to an in-memory record, without persistence.
    ///
    /// # Errors
    ///
    /// Propagates `SchedulerError` from the state transition.
    pub fn rate(
        &self,
        record: &ProgressRecord,
        rating: Rating,
        rated_at: DateTime<Utc>,
    ) -> Result<RatedCard, RatingServiceError> {
        let previous_state = classify(Some(record));
        let record = apply_rating(record, rating, rated_at, &self.options)?;
        Ok(RatedCard {
            previous_state,
            record,
        })
    }

    /// Rate one card for one learner, persisting the updated record.
    ///
    /// Always re-fetches the latest stored record before applying the
    /// transition; a stale snapshot held by the caller is never rated. For a
    /// card with no record yet, a fresh one is created on this first rating.
    ///
    /// # Errors
    ///
    /// Propagates scheduler errors from the transition and storage errors
    /// from the fetch or the write.
    pub async fn rate_persisted(
        &self,
        learner_id: LearnerId,
        vocab_id: VocabId,
        rating: Rating,
        progress: &dyn ProgressRepository,
    ) -> Result<RatedCard, RatingServiceError> {
        let rated_at = self.now();

        let current = match progress.get(learner_id, vocab_id).await? {
            Some(record) => record,
            None => ProgressRecord::new_for(learner_id, vocab_id, rated_at),
        };

        let rated = self.rate(&current, rating, rated_at)?;
        let stored = progress.upsert(&rated.record).await?;

        tracing::debug!(
            learner = learner_id.value(),
            vocab = vocab_id.value(),
            rating = rating.as_u8(),
            from = rated.previous_state.as_str(),
            to = stored.state.as_str(),
            due_at = %stored.due_at,
            "rating applied"
        );

        Ok(RatedCard {
            previous_state: rated.previous_state,
            record: stored,
        })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
