use vocab_core::model::{LearnerId, ProgressRecord, VocabId};

use super::{
    SqliteRepository,
    mapping::{day_key_to_string, id_to_i64, map_progress_row},
};
use crate::repository::{ProgressRepository, StorageError};

const PROGRESS_COLUMNS: &str = r"
    learner_id, vocab_id, state, due_at, interval_days, ease, step_index,
    last_reviewed_at, reps, lapses, first_reviewed_at, first_reviewed_day
";

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn list(&self, learner_id: LearnerId) -> Result<Vec<ProgressRecord>, StorageError> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress_records WHERE learner_id = ?1 ORDER BY vocab_id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(id_to_i64("learner_id", learner_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(map_progress_row(&row)?);
        }
        Ok(records)
    }

    async fn get(
        &self,
        learner_id: LearnerId,
        vocab_id: VocabId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress_records WHERE learner_id = ?1 AND vocab_id = ?2"
        );
        let row = sqlx::query(&sql)
            .bind(id_to_i64("learner_id", learner_id.value())?)
            .bind(id_to_i64("vocab_id", vocab_id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn upsert(&self, record: &ProgressRecord) -> Result<ProgressRecord, StorageError> {
        sqlx::query(
            r"
            INSERT INTO progress_records (
                learner_id, vocab_id, state, due_at, interval_days, ease, step_index,
                last_reviewed_at, reps, lapses, first_reviewed_at, first_reviewed_day
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT(learner_id, vocab_id) DO UPDATE SET
                state = excluded.state,
                due_at = excluded.due_at,
                interval_days = excluded.interval_days,
                ease = excluded.ease,
                step_index = excluded.step_index,
                last_reviewed_at = excluded.last_reviewed_at,
                reps = excluded.reps,
                lapses = excluded.lapses,
                -- first-review fields are write-once; COALESCE keeps the
                -- original values once set
                first_reviewed_at = COALESCE(progress_records.first_reviewed_at, excluded.first_reviewed_at),
                first_reviewed_day = COALESCE(progress_records.first_reviewed_day, excluded.first_reviewed_day)
            ",
        )
        .bind(id_to_i64("learner_id", record.learner_id.value())?)
        .bind(id_to_i64("vocab_id", record.vocab_id.value())?)
        .bind(record.state.as_str())
        .bind(record.due_at)
        .bind(i64::from(record.interval_days))
        .bind(record.ease)
        .bind(
            i64::try_from(record.step_index)
                .map_err(|_| StorageError::Serialization("step_index overflow".into()))?,
        )
        .bind(record.last_reviewed_at)
        .bind(i64::from(record.reps))
        .bind(i64::from(record.lapses))
        .bind(record.first_reviewed_at)
        .bind(day_key_to_string(record.first_reviewed_day))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        self.get(record.learner_id, record.vocab_id)
            .await?
            .ok_or(StorageError::NotFound)
    }
}
