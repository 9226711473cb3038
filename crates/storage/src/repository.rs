use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use vocab_core::model::{LearnerId, ProgressError, ProgressRecord, VocabId, VocabItem};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A persisted record failed domain validation — e.g. an unrecognized
    /// study-state string. Data-integrity faults are surfaced, never
    /// silently defaulted.
    #[error("corrupt record: {0}")]
    Corrupt(#[from] ProgressError),
}

/// Read-only contract for the vocabulary catalog.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Persist or update a catalog item (admin/import tooling only; the
    /// scheduler never writes the catalog).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the item cannot be stored.
    async fn upsert_item(&self, item: &VocabItem) -> Result<(), StorageError>;

    /// Full ordered catalog for a level, or the whole catalog when `level`
    /// is `None`. Ordered by catalog position, ascending.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_items(&self, level: Option<u32>) -> Result<Vec<VocabItem>, StorageError>;
}

/// Repository contract for learner progress.
///
/// The scheduler never deletes records and never reads or writes partial
/// records; retired cards simply stop being due.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// All progress records for a learner.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list(&self, learner_id: LearnerId) -> Result<Vec<ProgressRecord>, StorageError>;

    /// One learner's record for one item, if a rating ever created it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get(
        &self,
        learner_id: LearnerId,
        vocab_id: VocabId,
    ) -> Result<Option<ProgressRecord>, StorageError>;

    /// Persist or update a full record, returning the stored value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert(&self, record: &ProgressRecord) -> Result<ProgressRecord, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    items: Arc<Mutex<HashMap<VocabId, VocabItem>>>,
    progress: Arc<Mutex<HashMap<(LearnerId, VocabId), ProgressRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn upsert_item(&self, item: &VocabItem) -> Result<(), StorageError> {
        let mut guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(item.id(), item.clone());
        Ok(())
    }

    async fn list_items(&self, level: Option<u32>) -> Result<Vec<VocabItem>, StorageError> {
        let guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut items: Vec<VocabItem> = guard
            .values()
            .filter(|item| level.is_none_or(|l| item.level() == l))
            .cloned()
            .collect();
        items.sort_by_key(VocabItem::position);
        Ok(items)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn list(&self, learner_id: LearnerId) -> Result<Vec<ProgressRecord>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .filter(|((learner, _), _)| *learner == learner_id)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn get(
        &self,
        learner_id: LearnerId,
        vocab_id: VocabId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&(learner_id, vocab_id)).cloned())
    }

    async fn upsert(&self, record: &ProgressRecord) -> Result<ProgressRecord, StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert((record.learner_id, record.vocab_id), record.clone());
        Ok(record.clone())
    }
}

/// Aggregates the catalog and progress repositories behind trait objects
/// for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let catalog: Arc<dyn CatalogRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self { catalog, progress }
    }
}
