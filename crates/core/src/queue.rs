use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::model::{ProgressRecord, SchedulerOptions, StudyState, VocabId, VocabItem};
use crate::scheduler::classify;
use crate::stats::DailyStats;
use crate::time::DayKeyFn;

//
// ─── QUEUES ────────────────────────────────────────────────────────────────────
//

/// One card's slot in a work queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub vocab_id: VocabId,
    /// Catalog ordering index; fixes the order of the new-card queue.
    pub position: u32,
    /// Scheduled instant. `None` for unseen cards, which have no schedule.
    pub due_at: Option<DateTime<Utc>>,
}

/// Prioritized work queues for "right now", plus the counters the
/// session-end decision needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyQueues {
    /// Unseen cards in catalog order. Deterministic, never shuffled.
    pub new_cards: Vec<QueueEntry>,
    /// Learning/relearning cards due now whose schedule falls on the
    /// current study day.
    pub intraday_learning: Vec<QueueEntry>,
    /// Learning/relearning cards due now carried over from an earlier
    /// study day.
    pub interday_learning: Vec<QueueEntry>,
    /// Graduated cards due now.
    pub reviews: Vec<QueueEntry>,
    /// All unseen cards in the catalog, due or not.
    pub total_unseen: u32,
    /// All learning/relearning cards, due or not.
    pub total_learning: u32,
    /// Earliest future due instant among not-yet-due learning cards.
    pub next_learning_due_at: Option<DateTime<Utc>>,
}

impl StudyQueues {
    /// True when some learning card is due right now.
    #[must_use]
    pub fn has_due_learning(&self) -> bool {
        !self.intraday_learning.is_empty() || !self.interday_learning.is_empty()
    }
}

/// Partitions the full catalog into prioritized work queues.
///
/// Every catalog item is classified through its paired progress record
/// (absent record means `New`). Due-now queues are sorted ascending by due
/// instant; the new-card queue preserves catalog order. The day-key
/// function decides whether a due learning card belongs to the intraday or
/// interday queue.
#[must_use]
pub fn build_queues(
    catalog: &[VocabItem],
    records: &HashMap<VocabId, ProgressRecord>,
    now: DateTime<Utc>,
    day_key: DayKeyFn,
) -> StudyQueues {
    let today = day_key(now);
    let mut queues = StudyQueues::default();

    for item in catalog {
        let record = records.get(&item.id());

        match classify(record) {
            StudyState::New => {
                queues.total_unseen += 1;
                queues.new_cards.push(QueueEntry {
                    vocab_id: item.id(),
                    position: item.position(),
                    due_at: None,
                });
            }
            StudyState::Learning | StudyState::Relearning => {
                let record = record.expect("classified learning card has a record");
                queues.total_learning += 1;

                if record.is_due(now) {
                    let entry = QueueEntry {
                        vocab_id: item.id(),
                        position: item.position(),
                        due_at: Some(record.due_at),
                    };
                    if day_key(record.due_at) == today {
                        queues.intraday_learning.push(entry);
                    } else {
                        queues.interday_learning.push(entry);
                    }
                } else {
                    // Track when the next learning card frees up so the
                    // session driver can report "come back in N minutes".
                    queues.next_learning_due_at = match queues.next_learning_due_at {
                        Some(existing) => Some(existing.min(record.due_at)),
                        None => Some(record.due_at),
                    };
                }
            }
            StudyState::Review => {
                let record = record.expect("classified review card has a record");
                if record.is_due(now) {
                    queues.reviews.push(QueueEntry {
                        vocab_id: item.id(),
                        position: item.position(),
                        due_at: Some(record.due_at),
                    });
                }
            }
        }
    }

    queues.new_cards.sort_by_key(|e| e.position);
    queues.intraday_learning.sort_by_key(|e| e.due_at);
    queues.interday_learning.sort_by_key(|e| e.due_at);
    queues.reviews.sort_by_key(|e| e.due_at);

    queues
}

//
// ─── SELECTION ─────────────────────────────────────────────────────────────────
//

/// Picks the next card under strict queue priority and today's quotas.
///
/// Priority: intraday learning, interday learning, reviews (while the
/// review cap holds), then new cards (while the new cap holds and, unless
/// configured otherwise, the review cap too). Ids in `excluded` — cards
/// just rated in this tick — are skipped everywhere. Returns `None` when
/// no queue yields a candidate, which is the normal "nothing available"
/// result, not a fault.
#[must_use]
pub fn get_next_card<'a>(
    queues: &'a StudyQueues,
    stats: &DailyStats,
    options: &SchedulerOptions,
    excluded: &HashSet<VocabId>,
) -> Option<&'a QueueEntry> {
    let first_eligible =
        |queue: &'a [QueueEntry]| queue.iter().find(|e| !excluded.contains(&e.vocab_id));

    if let Some(entry) = first_eligible(&queues.intraday_learning) {
        return Some(entry);
    }
    if let Some(entry) = first_eligible(&queues.interday_learning) {
        return Some(entry);
    }
    if stats.can_do_review(options) {
        if let Some(entry) = first_eligible(&queues.reviews) {
            return Some(entry);
        }
    }
    if stats.can_introduce_new(options) {
        if let Some(entry) = first_eligible(&queues.new_cards) {
            return Some(entry);
        }
    }

    None
}

//
// ─── SESSION END ───────────────────────────────────────────────────────────────
//

/// Why a session is over for now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// Learning cards exist but none is due yet.
    LearningPending,
    /// Unseen cards remain but today's new-card quota is spent.
    NewLimitReached,
    /// Today's review quota is spent, with due reviews remaining or unseen
    /// cards gated behind the review cap.
    ReviewLimitReached,
    /// Both quotas are spent with work remaining behind each.
    BothLimitsReached,
    /// The catalog is exhausted for this learner: nothing pending at all.
    AllDone,
}

/// Session-completion decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEndState {
    pub is_done: bool,
    pub reason: Option<EndReason>,
}

impl SessionEndState {
    #[must_use]
    fn in_progress() -> Self {
        Self {
            is_done: false,
            reason: None,
        }
    }

    #[must_use]
    fn done(reason: EndReason) -> Self {
        Self {
            is_done: true,
            reason: Some(reason),
        }
    }
}

/// Decides whether the session is over and why.
///
/// A session is never done while a learning card is due now — learning
/// continuity is not interrupted by any limit — and is never bounded by a
/// fixed card count. Otherwise it is done as soon as the quotas rule out
/// the remaining queues.
#[must_use]
pub fn get_session_end_state(
    queues: &StudyQueues,
    stats: &DailyStats,
    options: &SchedulerOptions,
) -> SessionEndState {
    if queues.has_due_learning() {
        return SessionEndState::in_progress();
    }
    if !queues.reviews.is_empty() && stats.can_do_review(options) {
        return SessionEndState::in_progress();
    }
    if !queues.new_cards.is_empty() && stats.can_introduce_new(options) {
        return SessionEndState::in_progress();
    }

    // Done for now; pick the most useful explanation.
    if queues.total_learning > 0 {
        return SessionEndState::done(EndReason::LearningPending);
    }

    let new_waiting = !queues.new_cards.is_empty();
    let reviews_waiting = !queues.reviews.is_empty();
    // Unseen cards whose own quota still has room are gated by the review
    // cap; that is the review limit's doing, not the new limit's.
    let new_capped = new_waiting && stats.new_introduced_today >= options.max_new_per_day();
    let review_capped = reviews_waiting || (new_waiting && !new_capped);
    let reason = match (new_capped, review_capped) {
        (true, true) => EndReason::BothLimitsReached,
        (true, false) => EndReason::NewLimitReached,
        (false, true) => EndReason::ReviewLimitReached,
        (false, false) => EndReason::AllDone,
    };
    SessionEndState::done(reason)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
