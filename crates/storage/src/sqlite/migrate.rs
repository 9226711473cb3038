use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema (vocabulary catalog, per-learner progress records,
/// and indexes).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS vocab_items (
                    id INTEGER PRIMARY KEY,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    level INTEGER NOT NULL CHECK (level >= 0),
                    term TEXT NOT NULL,
                    reading TEXT,
                    meaning TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS progress_records (
                    learner_id INTEGER NOT NULL,
                    vocab_id INTEGER NOT NULL,
                    state TEXT NOT NULL,
                    due_at TEXT NOT NULL,
                    interval_days INTEGER NOT NULL CHECK (interval_days >= 0),
                    ease REAL NOT NULL,
                    step_index INTEGER NOT NULL CHECK (step_index >= 0),
                    last_reviewed_at TEXT,
                    reps INTEGER NOT NULL CHECK (reps >= 0),
                    lapses INTEGER NOT NULL CHECK (lapses >= 0),
                    first_reviewed_at TEXT,
                    first_reviewed_day TEXT,
                    PRIMARY KEY (learner_id, vocab_id),
                    FOREIGN KEY (vocab_id) REFERENCES vocab_items(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_vocab_items_level_position
                    ON vocab_items (level, position);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_progress_learner_due
                    ON progress_records (learner_id, due_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_progress_learner_state
                    ON progress_records (learner_id, state);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
