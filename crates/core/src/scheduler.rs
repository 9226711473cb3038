use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::{ProgressRecord, Rating, SchedulerOptions, StudyState};
use crate::time::reference_day_key;

/// Ease never drops below this, no matter how many penalties accumulate.
const MIN_EASE: f64 = 1.3;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Fatal precondition violations in the scheduler configuration.
///
/// Every rating branch is a total function over its declared domain; the only
/// failures are options whose step sequences are empty where a transition
/// must index into them. Callers validate options up front
/// (`SchedulerOptions::new` already rejects these), so hitting one of these
/// at rating time is a programming error, not a recoverable case.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("learning steps are empty; cannot schedule a learning card")]
    EmptyLearningSteps,
    #[error("relearning steps are empty; cannot schedule a relearning card")]
    EmptyRelearningSteps,
}

//
// ─── CLASSIFICATION ────────────────────────────────────────────────────────────
//

/// Classifies a record's current study state.
///
/// A missing record, or any record with `reps == 0`, is `New` regardless of
/// what its other fields contain. Otherwise the stored state is returned.
/// Pure and idempotent; eligibility is a separate question answered by
/// [`is_due`].
#[must_use]
pub fn classify(record: Option<&ProgressRecord>) -> StudyState {
    match record {
        Some(rec) if rec.reps > 0 => rec.state,
        _ => StudyState::New,
    }
}

/// Due predicate: the card's scheduled instant has passed, independent of
/// its state.
#[must_use]
pub fn is_due(record: &ProgressRecord, now: DateTime<Utc>) -> bool {
    record.is_due(now)
}

//
// ─── RATING APPLICATION ────────────────────────────────────────────────────────
//

/// Applies a learner's rating to a progress record, returning the updated
/// record. Persistence is the caller's responsibility.
///
/// # Errors
///
/// Returns a `SchedulerError` only when the options carry an empty step
/// sequence the transition must index into.
pub fn apply_rating(
    record: &ProgressRecord,
    rating: Rating,
    now: DateTime<Utc>,
    options: &SchedulerOptions,
) -> Result<ProgressRecord, SchedulerError> {
    let mut card = record.clone();

    match classify(Some(record)) {
        StudyState::New => rate_new(&mut card, rating, now, options)?,
        StudyState::Learning => rate_learning(&mut card, rating, now, options)?,
        StudyState::Relearning => rate_relearning(&mut card, rating, now, options)?,
        StudyState::Review => rate_review(&mut card, rating, now, options)?,
    }

    card.reps += 1;
    card.last_reviewed_at = Some(now);

    Ok(card)
}

fn rate_new(
    card: &mut ProgressRecord,
    rating: Rating,
    now: DateTime<Utc>,
    options: &SchedulerOptions,
) -> Result<(), SchedulerError> {
    // The first rating ever pins the write-once "introduced" fact.
    card.mark_first_review(now, reference_day_key);

    match rating {
        Rating::Easy => {
            graduate(card, options.easy_interval_days(), options.starting_ease(), now);
        }
        Rating::Again | Rating::Good => {
            enter_step(card, StudyState::Learning, 0, options.learning_steps_mins(), now)?;
        }
        Rating::Hard => {
            // Hard on the very first step waits the average of the first two
            // configured steps, falling back to the first when only one exists.
            enter_step(card, StudyState::Learning, 0, options.learning_steps_mins(), now)?;
            card.due_at = now + first_step_hard_delay(options.learning_steps_mins())?;
        }
    }

    Ok(())
}

fn rate_learning(
    card: &mut ProgressRecord,
    rating: Rating,
    now: DateTime<Utc>,
    options: &SchedulerOptions,
) -> Result<(), SchedulerError> {
    let steps = options.learning_steps_mins();

    match rating {
        Rating::Easy => {
            graduate(card, options.easy_interval_days(), options.starting_ease(), now);
        }
        Rating::Again => {
            enter_step(card, StudyState::Learning, 0, steps, now)?;
        }
        Rating::Hard => {
            if card.step_index == 0 && steps.len() > 1 {
                card.due_at = now + first_step_hard_delay(steps)?;
            } else {
                enter_step(card, StudyState::Learning, card.step_index, steps, now)?;
            }
        }
        Rating::Good => {
            let next = card.step_index + 1;
            if next >= steps.len() {
                graduate(
                    card,
                    options.graduating_interval_days(),
                    options.starting_ease(),
                    now,
                );
            } else {
                enter_step(card, StudyState::Learning, next, steps, now)?;
            }
        }
    }

    Ok(())
}

fn rate_relearning(
    card: &mut ProgressRecord,
    rating: Rating,
    now: DateTime<Utc>,
    options: &SchedulerOptions,
) -> Result<(), SchedulerError> {
    let steps = options.relearning_steps_mins();

    match rating {
        Rating::Easy => {
            return_to_review(card, now);
        }
        Rating::Again => {
            enter_step(card, StudyState::Relearning, 0, steps, now)?;
        }
        Rating::Hard => {
            if card.step_index == 0 && steps.len() > 1 {
                card.due_at = now + first_step_hard_delay(steps)?;
            } else {
                enter_step(card, StudyState::Relearning, card.step_index, steps, now)?;
            }
        }
        Rating::Good => {
            let next = card.step_index + 1;
            if next >= steps.len() {
                return_to_review(card, now);
            } else {
                enter_step(card, StudyState::Relearning, next, steps, now)?;
            }
        }
    }

    Ok(())
}

fn rate_review(
    card: &mut ProgressRecord,
    rating: Rating,
    now: DateTime<Utc>,
    options: &SchedulerOptions,
) -> Result<(), SchedulerError> {
    match rating {
        Rating::Again => {
            // Lapse: back into relearning with a penalized ease and an
            // interval cut in half, floored at one day. The halved interval
            // is what the card returns to after relearning completes.
            card.lapses += 1;
            card.ease = (card.ease - options.lapse_ease_penalty()).max(MIN_EASE);
            card.interval_days = (card.interval_days / 2).max(1);
            enter_step(
                card,
                StudyState::Relearning,
                0,
                options.relearning_steps_mins(),
                now,
            )?;
        }
        Rating::Hard => {
            card.ease = (card.ease - options.hard_ease_penalty()).max(MIN_EASE);
            let factor = options.hard_interval_multiplier() * options.interval_modifier();
            reschedule_review(card, factor, now);
        }
        Rating::Good => {
            let factor = card.ease * options.interval_modifier();
            reschedule_review(card, factor, now);
        }
        Rating::Easy => {
            // Interval grows from the pre-bonus ease; the bonus applies to
            // the next review, matching Anki's ordering.
            let factor = card.ease * options.easy_bonus() * options.interval_modifier();
            reschedule_review(card, factor, now);
            card.ease += options.easy_ease_bonus();
        }
    }

    Ok(())
}

//
// ─── TRANSITION HELPERS ────────────────────────────────────────────────────────
//

/// Graduates a card into `Review`: assigns the supplied interval and ease,
/// clears step tracking, and schedules the first day-scale review.
fn graduate(card: &mut ProgressRecord, interval_days: u32, ease: f64, now: DateTime<Utc>) {
    card.state = StudyState::Review;
    card.interval_days = interval_days;
    card.ease = ease;
    card.step_index = 0;
    card.due_at = now + Duration::days(i64::from(interval_days));
}

/// Returns a relearning card to `Review`, reusing the interval stored at
/// lapse time instead of recomputing it from ease.
fn return_to_review(card: &mut ProgressRecord, now: DateTime<Utc>) {
    card.state = StudyState::Review;
    card.step_index = 0;
    card.due_at = now + Duration::days(i64::from(card.interval_days));
}

/// Places a card on `step_index` of the given step sequence.
fn enter_step(
    card: &mut ProgressRecord,
    state: StudyState,
    step_index: usize,
    steps_mins: &[u32],
    now: DateTime<Utc>,
) -> Result<(), SchedulerError> {
    let minutes = steps_mins
        .get(step_index)
        .copied()
        .ok_or(missing_steps_error(state))?;

    card.state = state;
    card.step_index = step_index;
    card.due_at = now + Duration::minutes(i64::from(minutes));
    Ok(())
}

/// Delay for `Hard` on the first step: the average of the first two step
/// durations, or the first step alone when only one is configured.
fn first_step_hard_delay(steps_mins: &[u32]) -> Result<Duration, SchedulerError> {
    match steps_mins {
        [] => Err(SchedulerError::EmptyLearningSteps),
        [only] => Ok(Duration::minutes(i64::from(*only))),
        [first, second, ..] => {
            let avg_secs = f64::from(first + second) * 60.0 / 2.0;
            #[allow(clippy::cast_possible_truncation)]
            Ok(Duration::seconds(avg_secs.round() as i64))
        }
    }
}

/// Grows a review interval multiplicatively, rounded to the nearest whole
/// day and floored at one day.
fn reschedule_review(card: &mut ProgressRecord, factor: f64, now: DateTime<Utc>) {
    let scaled = f64::from(card.interval_days) * factor;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let next_interval = scaled.round().max(1.0) as u32;

    card.interval_days = next_interval;
    card.due_at = now + Duration::days(i64::from(next_interval));
}

fn missing_steps_error(state: StudyState) -> SchedulerError {
    match state {
        StudyState::Relearning => SchedulerError::EmptyRelearningSteps,
        _ => SchedulerError::EmptyLearningSteps,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LearnerId, VocabId};
    use crate::time::{fixed_now, reference_day_key};

    fn options() -> SchedulerOptions {
        SchedulerOptions::anki_defaults()
    }

    fn new_record() -> ProgressRecord {
        ProgressRecord::new_for(LearnerId::new(1), VocabId::new(1), fixed_now())
    }

    fn learning_record(step_index: usize) -> ProgressRecord {
        let mut rec = new_record();
        rec.state = StudyState::Learning;
        rec.step_index = step_index;
        rec.reps = 1 + step_index as u32;
        rec.mark_first_review(fixed_now(), reference_day_key);
        rec
    }

    fn review_record(interval_days: u32, ease: f64) -> ProgressRecord {
        let mut rec = new_record();
        rec.state = StudyState::Review;
        rec.interval_days = interval_days;
        rec.ease = ease;
        rec.reps = 5;
        rec.mark_first_review(fixed_now(), reference_day_key);
        rec
    }

    /// Builds options through `Deserialize`, which skips the validating
    /// constructor. This is the route by which an empty step sequence can
    /// actually reach the scheduler (a hand-edited config, say).
    fn deserialized_options(learning_steps: &[u32], relearning_steps: &[u32]) -> SchedulerOptions {
        serde_json::from_value(serde_json::json!({
            "max_new_per_day": 20,
            "max_reviews_per_day": 200,
            "learning_steps_mins": learning_steps,
            "relearning_steps_mins": relearning_steps,
            "graduating_interval_days": 1,
            "easy_interval_days": 4,
            "starting_ease": 2.5,
            "easy_ease_bonus": 0.15,
            "hard_ease_penalty": 0.15,
            "lapse_ease_penalty": 0.2,
            "hard_interval_multiplier": 1.2,
            "easy_bonus": 1.3,
            "interval_modifier": 1.0,
            "new_ignores_review_limit": false
        }))
        .unwrap()
    }

    #[test]
    fn classify_absent_record_is_new() {
        assert_eq!(classify(None), StudyState::New);
    }

    #[test]
    fn classify_zero_reps_is_new_regardless_of_stored_state() {
        let mut rec = new_record();
        rec.state = StudyState::Review;
        rec.due_at = fixed_now() - Duration::days(30);
        assert_eq!(classify(Some(&rec)), StudyState::New);
    }

    #[test]
    fn classify_is_idempotent() {
        let rec = review_record(10, 2.5);
        assert_eq!(classify(Some(&rec)), classify(Some(&rec)));
    }

    #[test]
    fn new_card_rated_easy_graduates_immediately() {
        // Scenario: brand-new card, Easy, easy interval 4 days.
        let now = fixed_now();
        let card = apply_rating(&new_record(), Rating::Easy, now, &options()).unwrap();

        assert_eq!(card.state, StudyState::Review);
        assert_eq!(card.interval_days, 4);
        assert_eq!(card.due_at, now + Duration::days(4));
        assert!((card.ease - 2.5).abs() < f64::EPSILON);
        assert_eq!(card.reps, 1);
    }

    #[test]
    fn new_card_first_rating_pins_first_review_exactly_once() {
        let now = fixed_now();
        let card = apply_rating(&new_record(), Rating::Good, now, &options()).unwrap();
        assert_eq!(card.first_reviewed_at, Some(now));
        assert_eq!(card.first_reviewed_day, Some(reference_day_key(now)));

        let later = now + Duration::days(2);
        let card = apply_rating(&card, Rating::Good, later, &options()).unwrap();
        assert_eq!(card.first_reviewed_at, Some(now));
        assert_eq!(card.first_reviewed_day, Some(reference_day_key(now)));
    }

    #[test]
    fn new_card_again_enters_learning_at_first_step() {
        let now = fixed_now();
        let card = apply_rating(&new_record(), Rating::Again, now, &options()).unwrap();

        assert_eq!(card.state, StudyState::Learning);
        assert_eq!(card.step_index, 0);
        assert_eq!(card.due_at, now + Duration::minutes(1));
        assert_eq!(card.interval_days, 0);
    }

    #[test]
    fn new_card_hard_uses_average_of_first_two_steps() {
        // Scenario: steps [1, 10], Hard on the first step -> 5.5 minutes.
        let now = fixed_now();
        let card = apply_rating(&new_record(), Rating::Hard, now, &options()).unwrap();

        assert_eq!(card.state, StudyState::Learning);
        assert_eq!(card.due_at, now + Duration::seconds(330));
    }

    #[test]
    fn new_card_hard_falls_back_to_single_step() {
        let opts = SchedulerOptions::new(
            20, 200, vec![3], vec![10], 1, 4, 2.5, 0.15, 0.15, 0.2, 1.2, 1.3, 1.0, false,
        )
        .unwrap();
        let now = fixed_now();
        let card = apply_rating(&new_record(), Rating::Hard, now, &opts).unwrap();
        assert_eq!(card.due_at, now + Duration::minutes(3));
    }

    #[test]
    fn learning_good_advances_through_steps_then_graduates() {
        let now = fixed_now();

        let card = apply_rating(&learning_record(0), Rating::Good, now, &options()).unwrap();
        assert_eq!(card.state, StudyState::Learning);
        assert_eq!(card.step_index, 1);
        assert_eq!(card.due_at, now + Duration::minutes(10));

        let card = apply_rating(&card, Rating::Good, now, &options()).unwrap();
        assert_eq!(card.state, StudyState::Review);
        assert_eq!(card.interval_days, 1);
        assert_eq!(card.step_index, 0);
        assert_eq!(card.due_at, now + Duration::days(1));
    }

    #[test]
    fn learning_again_resets_to_first_step() {
        let now = fixed_now();
        let card = apply_rating(&learning_record(1), Rating::Again, now, &options()).unwrap();
        assert_eq!(card.state, StudyState::Learning);
        assert_eq!(card.step_index, 0);
        assert_eq!(card.due_at, now + Duration::minutes(1));
    }

    #[test]
    fn learning_hard_at_first_step_averages_steps() {
        let now = fixed_now();
        let card = apply_rating(&learning_record(0), Rating::Hard, now, &options()).unwrap();
        assert_eq!(card.step_index, 0);
        assert_eq!(card.due_at, now + Duration::seconds(330));
    }

    #[test]
    fn learning_hard_past_first_step_repeats_current_step() {
        let now = fixed_now();
        let card = apply_rating(&learning_record(1), Rating::Hard, now, &options()).unwrap();
        assert_eq!(card.step_index, 1);
        assert_eq!(card.due_at, now + Duration::minutes(10));
    }

    #[test]
    fn learning_easy_graduates_with_easy_interval() {
        let now = fixed_now();
        let card = apply_rating(&learning_record(0), Rating::Easy, now, &options()).unwrap();
        assert_eq!(card.state, StudyState::Review);
        assert_eq!(card.interval_days, 4);
    }

    #[test]
    fn review_good_grows_interval_by_ease() {
        // Scenario: interval 10, ease 2.5, modifier 1.0, Good -> 25 days.
        let now = fixed_now();
        let card = apply_rating(&review_record(10, 2.5), Rating::Good, now, &options()).unwrap();

        assert_eq!(card.state, StudyState::Review);
        assert_eq!(card.interval_days, 25);
        assert_eq!(card.due_at, now + Duration::days(25));
        assert!((card.ease - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn review_hard_shrinks_ease_and_grows_slowly() {
        let now = fixed_now();
        let card = apply_rating(&review_record(10, 2.5), Rating::Hard, now, &options()).unwrap();

        assert_eq!(card.interval_days, 12); // 10 * 1.2
        assert!((card.ease - 2.35).abs() < 1e-9);
    }

    #[test]
    fn review_easy_uses_pre_bonus_ease_then_bumps_it() {
        let now = fixed_now();
        let card = apply_rating(&review_record(10, 2.5), Rating::Easy, now, &options()).unwrap();

        // 10 * 2.5 * 1.3 = 32.5 -> rounds to 33 (banker-free f64 round).
        assert_eq!(card.interval_days, 33);
        assert!((card.ease - 2.65).abs() < 1e-9);
    }

    #[test]
    fn review_again_is_a_lapse() {
        // Scenario: lapse increments lapses, halves the interval, penalizes
        // ease, and re-enters relearning at step 0.
        let now = fixed_now();
        let before = review_record(10, 2.5);
        let card = apply_rating(&before, Rating::Again, now, &options()).unwrap();

        assert_eq!(card.state, StudyState::Relearning);
        assert_eq!(card.lapses, before.lapses + 1);
        assert_eq!(card.interval_days, 5);
        assert!((card.ease - 2.3).abs() < 1e-9);
        assert_eq!(card.step_index, 0);
        assert_eq!(card.due_at, now + Duration::minutes(10));
        assert!(card.ease <= before.ease);
    }

    #[test]
    fn lapse_interval_floors_at_one_day() {
        let now = fixed_now();
        let card = apply_rating(&review_record(1, 2.5), Rating::Again, now, &options()).unwrap();
        assert_eq!(card.interval_days, 1);
    }

    #[test]
    fn ease_never_drops_below_floor() {
        let now = fixed_now();
        let mut card = review_record(10, 1.35);
        for _ in 0..5 {
            card = apply_rating(&card, Rating::Again, now, &options()).unwrap();
            // climb back to review so the next Again is a lapse again
            card = apply_rating(&card, Rating::Easy, now, &options()).unwrap();
        }
        assert!(card.ease >= MIN_EASE);
    }

    #[test]
    fn relearning_completion_returns_to_review_with_stored_interval() {
        let now = fixed_now();
        let lapsed = apply_rating(&review_record(10, 2.5), Rating::Again, now, &options()).unwrap();
        assert_eq!(lapsed.interval_days, 5);

        // Single relearning step, so Good completes the sequence.
        let returned = apply_rating(&lapsed, Rating::Good, now, &options()).unwrap();
        assert_eq!(returned.state, StudyState::Review);
        assert_eq!(returned.interval_days, 5);
        assert_eq!(returned.due_at, now + Duration::days(5));
        assert_eq!(returned.step_index, 0);
    }

    #[test]
    fn relearning_easy_returns_to_review_immediately() {
        let now = fixed_now();
        let lapsed = apply_rating(&review_record(8, 2.5), Rating::Again, now, &options()).unwrap();
        let returned = apply_rating(&lapsed, Rating::Easy, now, &options()).unwrap();

        assert_eq!(returned.state, StudyState::Review);
        assert_eq!(returned.interval_days, 4);
        assert_eq!(returned.due_at, now + Duration::days(4));
    }

    #[test]
    fn relearning_again_resets_relearning_steps() {
        let now = fixed_now();
        let lapsed = apply_rating(&review_record(10, 2.5), Rating::Again, now, &options()).unwrap();
        let again = apply_rating(&lapsed, Rating::Again, now, &options()).unwrap();

        assert_eq!(again.state, StudyState::Relearning);
        assert_eq!(again.step_index, 0);
        // A second Again in relearning is not a lapse.
        assert_eq!(again.lapses, lapsed.lapses);
    }

    #[test]
    fn every_rating_updates_bookkeeping() {
        let now = fixed_now();
        for rating in [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy] {
            let card = apply_rating(&review_record(10, 2.5), rating, now, &options()).unwrap();
            assert_eq!(card.reps, 6);
            assert_eq!(card.last_reviewed_at, Some(now));
        }
    }

    #[test]
    fn empty_learning_steps_surface_as_a_scheduler_error() {
        let opts = deserialized_options(&[], &[10]);
        let err = apply_rating(&new_record(), Rating::Good, fixed_now(), &opts).unwrap_err();
        assert_eq!(err, SchedulerError::EmptyLearningSteps);
    }

    #[test]
    fn empty_relearning_steps_surface_on_a_lapse() {
        let opts = deserialized_options(&[1, 10], &[]);
        let err =
            apply_rating(&review_record(10, 2.5), Rating::Again, fixed_now(), &opts).unwrap_err();
        assert_eq!(err, SchedulerError::EmptyRelearningSteps);
    }

    #[test]
    fn interval_modifier_scales_review_growth() {
        let opts = SchedulerOptions::new(
            20, 200, vec![1, 10], vec![10], 1, 4, 2.5, 0.15, 0.15, 0.2, 1.2, 1.3, 0.8, false,
        )
        .unwrap();
        let now = fixed_now();
        let card = apply_rating(&review_record(10, 2.5), Rating::Good, now, &opts).unwrap();
        assert_eq!(card.interval_days, 20); // round(10 * 2.5 * 0.8)
    }
}
