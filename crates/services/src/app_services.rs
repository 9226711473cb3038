use std::sync::Arc;

use storage::repository::Storage;
use vocab_core::model::{LearnerId, SchedulerOptions};

use crate::Clock;
use crate::error::BootstrapError;
use crate::rating_service::RatingService;
use crate::session_service::SessionService;

/// Assembles the study services for one learner over a shared backend.
#[derive(Clone)]
pub struct AppServices {
    learner_id: LearnerId,
    storage: Storage,
    ratings: Arc<RatingService>,
    sessions: Arc<SessionService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `BootstrapError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        learner_id: LearnerId,
        options: SchedulerOptions,
    ) -> Result<Self, BootstrapError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::with_storage(storage, clock, learner_id, options))
    }

    /// Build services over an in-memory backend, for tests and prototyping.
    #[must_use]
    pub fn new_in_memory(
        clock: Clock,
        learner_id: LearnerId,
        options: SchedulerOptions,
    ) -> Self {
        Self::with_storage(Storage::in_memory(), clock, learner_id, options)
    }

    fn with_storage(
        storage: Storage,
        clock: Clock,
        learner_id: LearnerId,
        options: SchedulerOptions,
    ) -> Self {
        let ratings = Arc::new(RatingService::new(options.clone()).with_clock(clock));
        let sessions = Arc::new(SessionService::new(learner_id, options).with_clock(clock));
        Self {
            learner_id,
            storage,
            ratings,
            sessions,
        }
    }

    #[must_use]
    pub fn learner_id(&self) -> LearnerId {
        self.learner_id
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn ratings(&self) -> Arc<RatingService> {
        Arc::clone(&self.ratings)
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<SessionService> {
        Arc::clone(&self.sessions)
    }
}
