use chrono::NaiveDate;
use sqlx::Row;

use vocab_core::model::{LearnerId, ProgressRecord, StudyState, VocabId, VocabItem};
use vocab_core::time::DayKey;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn vocab_id_from_i64(v: i64) -> Result<VocabId, StorageError> {
    Ok(VocabId::new(i64_to_u64("vocab_id", v)?))
}

pub(crate) fn learner_id_from_i64(v: i64) -> Result<LearnerId, StorageError> {
    Ok(LearnerId::new(i64_to_u64("learner_id", v)?))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn day_key_to_string(key: Option<DayKey>) -> Option<String> {
    key.map(|k| k.to_string())
}

pub(crate) fn day_key_from_string(s: Option<String>) -> Result<Option<DayKey>, StorageError> {
    s.map(|raw| {
        NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map(DayKey::new)
            .map_err(|_| StorageError::Serialization(format!("invalid day key: {raw}")))
    })
    .transpose()
}

pub(crate) fn map_vocab_row(row: &sqlx::sqlite::SqliteRow) -> Result<VocabItem, StorageError> {
    let id = vocab_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let position = u32_from_i64("position", row.try_get::<i64, _>("position").map_err(ser)?)?;
    let level = u32_from_i64("level", row.try_get::<i64, _>("level").map_err(ser)?)?;
    let term: String = row.try_get("term").map_err(ser)?;
    let reading: Option<String> = row.try_get("reading").map_err(ser)?;
    let meaning: String = row.try_get("meaning").map_err(ser)?;

    VocabItem::new(id, position, level, term, reading, meaning).map_err(ser)
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ProgressRecord, StorageError> {
    let state_str: String = row.try_get("state").map_err(ser)?;
    // An unrecognized state string is a data-integrity fault, not a default.
    let state: StudyState = state_str.parse()?;

    Ok(ProgressRecord {
        learner_id: learner_id_from_i64(row.try_get::<i64, _>("learner_id").map_err(ser)?)?,
        vocab_id: vocab_id_from_i64(row.try_get::<i64, _>("vocab_id").map_err(ser)?)?,
        state,
        due_at: row.try_get("due_at").map_err(ser)?,
        interval_days: u32_from_i64(
            "interval_days",
            row.try_get::<i64, _>("interval_days").map_err(ser)?,
        )?,
        ease: row.try_get("ease").map_err(ser)?,
        step_index: usize::try_from(row.try_get::<i64, _>("step_index").map_err(ser)?)
            .map_err(|_| StorageError::Serialization("invalid step_index".into()))?,
        last_reviewed_at: row.try_get("last_reviewed_at").map_err(ser)?,
        reps: u32_from_i64("reps", row.try_get::<i64, _>("reps").map_err(ser)?)?,
        lapses: u32_from_i64("lapses", row.try_get::<i64, _>("lapses").map_err(ser)?)?,
        first_reviewed_at: row.try_get("first_reviewed_at").map_err(ser)?,
        first_reviewed_day: day_key_from_string(
            row.try_get::<Option<String>, _>("first_reviewed_day")
                .map_err(ser)?,
        )?,
    })
}
