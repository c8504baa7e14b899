//! SQLite-backed vector index implementation.
//!
//! In-process store using SQLite for durability and brute-force cosine
//! similarity for search. Mutations run inside transactions, so a reader
//! sees either the previous or the next generation of a collection,
//! never a partially written one.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{EmbeddingRecord, PassageMatch, StoredPassage, VectorStore};
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;

pub struct SqliteVectorStore {
    pool: SqlitePool,
    #[allow(dead_code)]
    db_path: PathBuf,
}

impl SqliteVectorStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, ApiError> {
        Self::with_path(paths.index_db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_chunks (
                chunk_id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                content TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                page INTEGER,
                seq INTEGER NOT NULL DEFAULT 0,
                start_offset INTEGER NOT NULL DEFAULT 0,
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_collection ON index_chunks(collection)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn row_to_passage(row: &sqlx::sqlite::SqliteRow) -> StoredPassage {
        let page: Option<i64> = row.get("page");

        StoredPassage {
            chunk_id: row.get("chunk_id"),
            content: row.get("content"),
            source: row.get("source"),
            page: page.map(|p| p as u32),
        }
    }

    async fn insert_records(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        collection: &str,
        records: &[EmbeddingRecord],
    ) -> Result<(), ApiError> {
        for record in records {
            let blob = Self::serialize_embedding(&record.embedding);

            sqlx::query(
                "INSERT OR REPLACE INTO index_chunks
                 (chunk_id, collection, content, source, page, seq, start_offset, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .bind(&record.chunk_id)
            .bind(collection)
            .bind(&record.content)
            .bind(&record.source)
            .bind(record.page.map(|p| p as i64))
            .bind(record.seq as i64)
            .bind(record.start_offset as i64)
            .bind(&blob)
            .execute(&mut **tx)
            .await
            .map_err(ApiError::internal)?;
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert(
        &self,
        collection: &str,
        records: Vec<EmbeddingRecord>,
    ) -> Result<(), ApiError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;
        Self::insert_records(&mut tx, collection, &records).await?;
        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn replace(
        &self,
        collection: &str,
        records: Vec<EmbeddingRecord>,
    ) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        sqlx::query("DELETE FROM index_chunks WHERE collection = ?1")
            .bind(collection)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        Self::insert_records(&mut tx, collection, &records).await?;
        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<PassageMatch>, ApiError> {
        if k == 0 {
            return Err(ApiError::InvalidInput(
                "query limit must be greater than zero".to_string(),
            ));
        }

        // rowid order preserves insertion order; the stable sort below
        // keeps it as the tie-break between equal scores
        let rows = sqlx::query(
            "SELECT chunk_id, content, source, page, embedding
             FROM index_chunks
             WHERE collection = ?1
             ORDER BY rowid",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut scored: Vec<PassageMatch> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(embedding, &stored);

                Some(PassageMatch {
                    passage: Self::row_to_passage(row),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        Ok(scored)
    }

    async fn clear(&self, collection: &str) -> Result<usize, ApiError> {
        let result = sqlx::query("DELETE FROM index_chunks WHERE collection = ?1")
            .bind(collection)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(result.rows_affected() as usize)
    }

    async fn count(&self, collection: &str) -> Result<usize, ApiError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM index_chunks WHERE collection = ?1")
                .bind(collection)
                .fetch_one(&self.pool)
                .await
                .map_err(ApiError::internal)?;

        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteVectorStore {
        let tmp = std::env::temp_dir().join(format!(
            "docuchat-index-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        SqliteVectorStore::with_path(tmp).await.unwrap()
    }

    fn record(id: &str, content: &str, embedding: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            chunk_id: id.to_string(),
            content: content.to_string(),
            source: "doc.txt".to_string(),
            page: None,
            seq: 0,
            start_offset: 0,
            embedding,
        }
    }

    #[tokio::test]
    async fn upsert_and_query_ranks_by_similarity() {
        let store = test_store().await;

        store
            .upsert(
                "c",
                vec![
                    record("a", "about cats", vec![1.0, 0.0, 0.0]),
                    record("b", "about dogs", vec![0.0, 1.0, 0.0]),
                    record("c", "about birds", vec![0.7, 0.7, 0.0]),
                ],
            )
            .await
            .unwrap();

        let results = store.query("c", &[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].passage.chunk_id, "a");
        assert!(results[0].score > results[1].score);
        assert_eq!(results[1].passage.chunk_id, "c");
    }

    #[tokio::test]
    async fn query_returns_at_most_k_results() {
        let store = test_store().await;

        let records: Vec<EmbeddingRecord> = (0..5)
            .map(|i| record(&format!("c{}", i), "text", vec![1.0, i as f32]))
            .collect();
        store.upsert("c", records).await.unwrap();

        let results = store.query("c", &[1.0, 0.0], 3).await.unwrap();
        assert_eq!(results.len(), 3);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn equal_scores_break_ties_by_insertion_order() {
        let store = test_store().await;

        store
            .upsert("c", vec![record("first", "same", vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .upsert("c", vec![record("second", "same", vec![1.0, 0.0])])
            .await
            .unwrap();

        let results = store.query("c", &[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results[0].passage.chunk_id, "first");
        assert_eq!(results[1].passage.chunk_id, "second");
    }

    #[tokio::test]
    async fn zero_k_is_rejected_and_empty_index_is_not_an_error() {
        let store = test_store().await;

        let err = store.query("c", &[1.0], 0).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let results = store.query("c", &[1.0], 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn reupserting_a_chunk_id_replaces_instead_of_duplicating() {
        let store = test_store().await;

        store
            .upsert("c", vec![record("a", "old text", vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .upsert("c", vec![record("a", "new text", vec![0.0, 1.0])])
            .await
            .unwrap();

        assert_eq!(store.count("c").await.unwrap(), 1);
        let results = store.query("c", &[0.0, 1.0], 1).await.unwrap();
        assert_eq!(results[0].passage.content, "new text");
    }

    #[tokio::test]
    async fn replace_discards_the_previous_generation() {
        let store = test_store().await;

        store
            .upsert("c", vec![record("old", "stale passage", vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .replace("c", vec![record("new", "fresh passage", vec![0.0, 1.0])])
            .await
            .unwrap();

        assert_eq!(store.count("c").await.unwrap(), 1);
        let results = store.query("c", &[1.0, 0.0], 10).await.unwrap();
        assert!(results.iter().all(|m| m.passage.chunk_id != "old"));
    }

    #[tokio::test]
    async fn clear_empties_the_collection() {
        let store = test_store().await;

        store
            .upsert(
                "c",
                vec![
                    record("a", "one", vec![1.0]),
                    record("b", "two", vec![1.0]),
                ],
            )
            .await
            .unwrap();

        let removed = store.clear("c").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count("c").await.unwrap(), 0);
        assert!(store.query("c", &[1.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = test_store().await;

        store
            .upsert("left", vec![record("a", "left text", vec![1.0])])
            .await
            .unwrap();
        store
            .upsert("right", vec![record("b", "right text", vec![1.0])])
            .await
            .unwrap();

        assert_eq!(store.count("left").await.unwrap(), 1);
        store.clear("left").await.unwrap();
        assert_eq!(store.count("left").await.unwrap(), 0);
        assert_eq!(store.count("right").await.unwrap(), 1);
    }

    #[test]
    fn cosine_similarity_handles_degenerate_inputs() {
        assert_eq!(SqliteVectorStore::cosine_similarity(&[], &[]), 0.0);
        assert_eq!(
            SqliteVectorStore::cosine_similarity(&[1.0, 0.0], &[1.0]),
            0.0
        );
        assert_eq!(
            SqliteVectorStore::cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]),
            0.0
        );
        let sim = SqliteVectorStore::cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]);
        assert!((sim - 1.0).abs() < 1e-6);
    }
}
