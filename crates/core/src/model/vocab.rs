use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::VocabId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VocabError {
    #[error("term cannot be empty")]
    EmptyTerm,

    #[error("meaning cannot be empty")]
    EmptyMeaning,
}

//
// ─── VOCAB ITEM ────────────────────────────────────────────────────────────────
//

/// An immutable vocabulary catalog entry.
///
/// Items carry their catalog `position`, which fixes the deterministic order
/// in which unseen items are introduced. The scheduler never mutates an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabItem {
    id: VocabId,
    position: u32,
    level: u32,
    term: String,
    reading: Option<String>,
    meaning: String,
}

impl VocabItem {
    /// Creates a new vocabulary item.
    ///
    /// # Errors
    ///
    /// Returns `VocabError::EmptyTerm` or `VocabError::EmptyMeaning` if the
    /// respective field is empty or whitespace-only.
    pub fn new(
        id: VocabId,
        position: u32,
        level: u32,
        term: impl Into<String>,
        reading: Option<String>,
        meaning: impl Into<String>,
    ) -> Result<Self, VocabError> {
        let term = term.into();
        if term.trim().is_empty() {
            return Err(VocabError::EmptyTerm);
        }

        let meaning = meaning.into();
        if meaning.trim().is_empty() {
            return Err(VocabError::EmptyMeaning);
        }

        let reading = reading
            .map(|r| r.trim().to_owned())
            .filter(|r| !r.is_empty());

        Ok(Self {
            id,
            position,
            level,
            term: term.trim().to_owned(),
            reading,
            meaning: meaning.trim().to_owned(),
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> VocabId {
        self.id
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    #[must_use]
    pub fn reading(&self) -> Option<&str> {
        self.reading.as_deref()
    }

    #[must_use]
    pub fn meaning(&self) -> &str {
        &self.meaning
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
