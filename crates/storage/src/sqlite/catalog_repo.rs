use vocab_core::model::VocabItem;

use super::{
    SqliteRepository,
    mapping::{id_to_i64, map_vocab_row},
};
use crate::repository::{CatalogRepository, StorageError};

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn upsert_item(&self, item: &VocabItem) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO vocab_items (id, position, level, term, reading, meaning)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                position = excluded.position,
                level = excluded.level,
                term = excluded.term,
                reading = excluded.reading,
                meaning = excluded.meaning
            ",
        )
        .bind(id_to_i64("vocab_id", item.id().value())?)
        .bind(i64::from(item.position()))
        .bind(i64::from(item.level()))
        .bind(item.term().to_owned())
        .bind(item.reading().map(ToOwned::to_owned))
        .bind(item.meaning().to_owned())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn list_items(&self, level: Option<u32>) -> Result<Vec<VocabItem>, StorageError> {
        let rows = match level {
            Some(level) => {
                sqlx::query(
                    r"
                    SELECT id, position, level, term, reading, meaning
                    FROM vocab_items
                    WHERE level = ?1
                    ORDER BY position ASC, id ASC
                    ",
                )
                .bind(i64::from(level))
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r"
                    SELECT id, position, level, term, reading, meaning
                    FROM vocab_items
                    ORDER BY position ASC, id ASC
                    ",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(map_vocab_row(&row)?);
        }
        Ok(items)
    }
}
