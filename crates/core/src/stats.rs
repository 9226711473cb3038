use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{ProgressRecord, SchedulerOptions, StudyState};
use crate::time::DayKeyFn;

//
// ─── DAILY STATS ───────────────────────────────────────────────────────────────
//

/// Per-day quota counters for one learner, derived from the full set of
/// progress records. Both counters are scoped to the current study day in
/// the fixed reference timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DailyStats {
    /// Cards whose write-once first-review day is today.
    pub new_introduced_today: u32,
    /// Graduated cards reviewed today, excluding each card's first-ever
    /// rating.
    pub reviews_done_today: u32,
}

impl DailyStats {
    /// True while today's new-card quota still has room.
    ///
    /// Unless `new_ignores_review_limit` is set, a reached review cap also
    /// stops new cards.
    #[must_use]
    pub fn can_introduce_new(&self, options: &SchedulerOptions) -> bool {
        if self.new_introduced_today >= options.max_new_per_day() {
            return false;
        }
        options.new_ignores_review_limit() || self.can_do_review(options)
    }

    /// True while today's review quota still has room.
    #[must_use]
    pub fn can_do_review(&self, options: &SchedulerOptions) -> bool {
        self.reviews_done_today < options.max_reviews_per_day()
    }
}

/// Computes today's counters from a learner's progress records.
///
/// `new_introduced_today` counts only the write-once `first_reviewed_day`
/// fact — never `reps` or `last_reviewed_at`, which mutate on every later
/// rating. `reviews_done_today` counts graduated cards (`state == Review`)
/// with more than one rating whose last rating fell within today's
/// boundary.
#[must_use]
pub fn calculate_daily_stats<'a, I>(records: I, now: DateTime<Utc>, day_key: DayKeyFn) -> DailyStats
where
    I: IntoIterator<Item = &'a ProgressRecord>,
{
    let today = day_key(now);
    let mut stats = DailyStats::default();

    for record in records {
        if record.first_reviewed_day == Some(today) {
            stats.new_introduced_today += 1;
        }

        let reviewed_today = record
            .last_reviewed_at
            .is_some_and(|at| day_key(at) == today);
        if record.state == StudyState::Review && record.reps > 1 && reviewed_today {
            stats.reviews_done_today += 1;
        }
    }

    stats
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
