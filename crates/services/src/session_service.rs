use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use storage::repository::Storage;
use vocab_core::model::{LearnerId, ProgressRecord, Rating, SchedulerOptions, VocabId};
use vocab_core::queue::{
    QueueEntry, SessionEndState, StudyQueues, build_queues, get_next_card, get_session_end_state,
};
use vocab_core::stats::{DailyStats, calculate_daily_stats};
use vocab_core::time::{Clock, DayKeyFn, reference_day_key};

use crate::error::SessionServiceError;
use crate::rating_service::{RatedCard, RatingService};

//
// ─── SNAPSHOT ──────────────────────────────────────────────────────────────────
//

/// One learner's study state at a single instant.
///
/// Queues, quota counters, and the end decision are all computed from the
/// same catalog and record snapshot, so they cannot disagree with each
/// other. A snapshot goes stale the moment a rating lands; take a fresh one
/// after every `submit_rating`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudySnapshot {
    pub taken_at: DateTime<Utc>,
    pub queues: StudyQueues,
    pub stats: DailyStats,
    options: SchedulerOptions,
}

impl StudySnapshot {
    /// Next card to show, under strict queue priority and today's quotas.
    ///
    /// `excluded` holds ids already rated against this snapshot; pass an
    /// empty set right after a refresh.
    #[must_use]
    pub fn next_card(&self, excluded: &HashSet<VocabId>) -> Option<&QueueEntry> {
        get_next_card(&self.queues, &self.stats, &self.options, excluded)
    }

    /// Whether the session is over for now, and why.
    #[must_use]
    pub fn end_state(&self) -> SessionEndState {
        get_session_end_state(&self.queues, &self.stats, &self.options)
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Drives one learner's study session against a storage backend.
///
/// The service is stateless between calls: each `snapshot` reloads the
/// catalog and the learner's records and recomputes queues and quota
/// counters for the current clock reading.
pub struct SessionService {
    learner_id: LearnerId,
    level: Option<u32>,
    clock: Clock,
    day_key: DayKeyFn,
    ratings: RatingService,
}

impl SessionService {
    /// Create a session service for one learner with a real-time clock and
    /// the reference day boundary.
    #[must_use]
    pub fn new(learner_id: LearnerId, options: SchedulerOptions) -> Self {
        Self {
            learner_id,
            level: None,
            clock: Clock::default(),
            day_key: reference_day_key,
            ratings: RatingService::new(options),
        }
    }

    /// Override the clock (usually for deterministic testing). The rating
    /// side uses the same clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self.ratings = self.ratings.with_clock(clock);
        self
    }

    /// Restrict the session to one catalog level.
    #[must_use]
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    /// Override the study-day boundary function.
    #[must_use]
    pub fn with_day_key(mut self, day_key: DayKeyFn) -> Self {
        self.day_key = day_key;
        self
    }

    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[must_use]
    pub fn options(&self) -> &SchedulerOptions {
        self.ratings.options()
    }

    /// Load the catalog and the learner's records and compute the study
    /// snapshot for right now.
    ///
    /// # Errors
    ///
    /// Propagates storage errors from the catalog or progress reads.
    pub async fn snapshot(&self, storage: &Storage) -> Result<StudySnapshot, SessionServiceError> {
        let now = self.now();

        let catalog = storage.catalog.list_items(self.level).await?;
        let records: HashMap<VocabId, ProgressRecord> = storage
            .progress
            .list(self.learner_id)
            .await?
            .into_iter()
            .map(|r| (r.vocab_id, r))
            .collect();

        let stats = calculate_daily_stats(records.values(), now, self.day_key);
        let queues = build_queues(&catalog, &records, now, self.day_key);

        tracing::debug!(
            learner = self.learner_id.value(),
            catalog = catalog.len(),
            due_learning = queues.intraday_learning.len() + queues.interday_learning.len(),
            due_reviews = queues.reviews.len(),
            unseen = queues.total_unseen,
            new_today = stats.new_introduced_today,
            reviews_today = stats.reviews_done_today,
            "study snapshot taken"
        );

        Ok(StudySnapshot {
            taken_at: now,
            queues,
            stats,
            options: self.options().clone(),
        })
    }

    /// Rate one card and persist the transition.
    ///
    /// Any snapshot taken before this call is stale afterwards.
    ///
    /// # Errors
    ///
    /// Propagates scheduler and storage errors from the rating.
    pub async fn submit_rating(
        &self,
        storage: &Storage,
        vocab_id: VocabId,
        rating: Rating,
    ) -> Result<RatedCard, SessionServiceError> {
        let rated = self
            .ratings
            .rate_persisted(self.learner_id, vocab_id, rating, storage.progress.as_ref())
            .await?;
        Ok(rated)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use vocab_core::model::{StudyState, VocabItem};
    use vocab_core::queue::EndReason;
    use vocab_core::time::{fixed_clock, fixed_now};

    async fn seed_catalog(storage: &Storage, count: u64) {
        for id in 1..=count {
            let item = VocabItem::new(
                VocabId::new(id),
                u32::try_from(id).unwrap() - 1,
                1,
                format!("term-{id}"),
                None,
                format!("meaning-{id}"),
            )
            .unwrap();
            storage.catalog.upsert_item(&item).await.unwrap();
        }
    }

    fn service(options: SchedulerOptions) -> SessionService {
        SessionService::new(LearnerId::new(1), options).with_clock(fixed_clock())
    }

    #[tokio::test]
    async fn snapshot_serves_new_cards_in_catalog_order() {
        let storage = Storage::in_memory();
        seed_catalog(&storage, 3).await;
        let svc = service(SchedulerOptions::anki_defaults());

        let snapshot = svc.snapshot(&storage).await.unwrap();
        assert_eq!(snapshot.queues.total_unseen, 3);

        let next = snapshot.next_card(&HashSet::new()).unwrap();
        assert_eq!(next.vocab_id, VocabId::new(1));
        assert!(!snapshot.end_state().is_done);
    }

    #[tokio::test]
    async fn rating_moves_the_card_out_of_the_new_queue() {
        let storage = Storage::in_memory();
        seed_catalog(&storage, 2).await;
        let svc = service(SchedulerOptions::anki_defaults());

        let rated = svc
            .submit_rating(&storage, VocabId::new(1), Rating::Good)
            .await
            .unwrap();
        assert_eq!(rated.record.state, StudyState::Learning);

        let snapshot = svc.snapshot(&storage).await.unwrap();
        assert_eq!(snapshot.queues.total_unseen, 1);
        assert_eq!(snapshot.queues.total_learning, 1);
        assert_eq!(snapshot.stats.new_introduced_today, 1);

        // The learning step lands one minute out, so the next card now is
        // the remaining unseen one.
        let next = snapshot.next_card(&HashSet::new()).unwrap();
        assert_eq!(next.vocab_id, VocabId::new(2));
    }

    #[tokio::test]
    async fn due_learning_card_outranks_new_cards() {
        let storage = Storage::in_memory();
        seed_catalog(&storage, 2).await;
        let svc = service(SchedulerOptions::anki_defaults());

        svc.submit_rating(&storage, VocabId::new(2), Rating::Good)
            .await
            .unwrap();

        // Two minutes later the learning step has elapsed.
        let later = SessionService::new(LearnerId::new(1), SchedulerOptions::anki_defaults())
            .with_clock(Clock::fixed(fixed_now() + Duration::minutes(2)));
        let snapshot = later.snapshot(&storage).await.unwrap();

        let next = snapshot.next_card(&HashSet::new()).unwrap();
        assert_eq!(next.vocab_id, VocabId::new(2));
    }

    #[tokio::test]
    async fn spent_new_quota_ends_with_learning_pending() {
        let storage = Storage::in_memory();
        seed_catalog(&storage, 3).await;
        let options = SchedulerOptions::anki_defaults().with_daily_caps(1, 200);
        let svc = service(options);

        svc.submit_rating(&storage, VocabId::new(1), Rating::Good)
            .await
            .unwrap();

        let snapshot = svc.snapshot(&storage).await.unwrap();
        assert_eq!(snapshot.next_card(&HashSet::new()), None);

        // Quota spent, unseen cards remain, but a learning card is still in
        // flight: pending learning wins the explanation.
        let end = snapshot.end_state();
        assert!(end.is_done);
        assert_eq!(end.reason, Some(EndReason::LearningPending));
        assert!(snapshot.queues.next_learning_due_at.is_some());
    }

    #[tokio::test]
    async fn graduated_catalog_reports_all_done() {
        let storage = Storage::in_memory();
        seed_catalog(&storage, 1).await;
        let svc = service(SchedulerOptions::anki_defaults());

        // Easy on an unseen card graduates it straight to Review, due in
        // four days.
        svc.submit_rating(&storage, VocabId::new(1), Rating::Easy)
            .await
            .unwrap();

        let snapshot = svc.snapshot(&storage).await.unwrap();
        let end = snapshot.end_state();
        assert!(end.is_done);
        assert_eq!(end.reason, Some(EndReason::AllDone));
    }

    #[tokio::test]
    async fn level_filter_narrows_the_catalog() {
        let storage = Storage::in_memory();
        let item = VocabItem::new(VocabId::new(1), 0, 1, "a", None, "a").unwrap();
        let other = VocabItem::new(VocabId::new(2), 1, 2, "b", None, "b").unwrap();
        storage.catalog.upsert_item(&item).await.unwrap();
        storage.catalog.upsert_item(&other).await.unwrap();

        let svc = service(SchedulerOptions::anki_defaults()).with_level(2);
        let snapshot = svc.snapshot(&storage).await.unwrap();

        assert_eq!(snapshot.queues.total_unseen, 1);
        assert_eq!(
            snapshot.next_card(&HashSet::new()).unwrap().vocab_id,
            VocabId::new(2)
        );
    }
}
