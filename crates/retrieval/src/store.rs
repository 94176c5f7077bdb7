//! SQLite Chunk Store
//!
//! Embedded persistence for document chunks and their embeddings using
//! rusqlite with r2d2 connection pooling. The store is the source of truth;
//! the HNSW index is rebuilt from it.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

use crate::chunker::DocChunk;
use crate::embedding_service::{bytes_to_embedding, embedding_to_bytes};
use crate::error::{RetrievalError, RetrievalResult};

/// Type alias for the connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// A chunk as stored, hydrated with its rowid and embedding.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub rowid: i64,
    pub chunk_id: String,
    pub filename: String,
    pub title: String,
    pub page: i64,
    pub chunk_index: i64,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// Store for document chunks and the retrieval metadata table.
#[derive(Clone)]
pub struct ChunkStore {
    pool: DbPool,
}

impl ChunkStore {
    /// Open (or create) a chunk store at the given database path.
    pub fn open(path: &Path) -> RetrievalResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(8)
            .build(manager)
            .map_err(|e| RetrievalError::database(format!("Failed to build pool: {}", e)))?;
        Self::from_pool(pool)
    }

    /// Create a store from an existing connection pool.
    pub fn from_pool(pool: DbPool) -> RetrievalResult<Self> {
        let store = Self { pool };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> RetrievalResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| RetrievalError::database(format!("Failed to get connection: {}", e)))
    }

    /// Initialize chunk and metadata tables.
    fn init_schema(&self) -> RetrievalResult<()> {
        let conn = self.conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS doc_chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chunk_id TEXT NOT NULL UNIQUE,
                filename TEXT NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                page INTEGER NOT NULL,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB,
                created_at TEXT DEFAULT (datetime('now'))
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_doc_chunks_filename ON doc_chunks(filename)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS retrieval_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT DEFAULT (datetime('now'))
            )",
            [],
        )?;

        Ok(())
    }

    /// Insert or update a chunk with its embedding. Returns the rowid.
    ///
    /// Re-ingesting the same source is idempotent: chunks keep their
    /// `chunk_id` and the stored content/embedding is replaced.
    pub fn upsert_chunk(&self, chunk: &DocChunk, embedding: &[f32]) -> RetrievalResult<i64> {
        let conn = self.conn()?;
        let embedding_bytes = embedding_to_bytes(embedding);

        conn.execute(
            "INSERT INTO doc_chunks (chunk_id, filename, title, page, chunk_index, content, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(chunk_id) DO UPDATE SET
                filename = excluded.filename,
                title = excluded.title,
                page = excluded.page,
                chunk_index = excluded.chunk_index,
                content = excluded.content,
                embedding = excluded.embedding",
            params![
                chunk.chunk_id,
                chunk.filename,
                chunk.title,
                chunk.page,
                chunk.chunk_index,
                chunk.content,
                embedding_bytes,
            ],
        )?;

        let rowid: i64 = conn.query_row(
            "SELECT id FROM doc_chunks WHERE chunk_id = ?1",
            params![chunk.chunk_id],
            |row| row.get(0),
        )?;

        Ok(rowid)
    }

    /// Delete all chunks (used by rebuild-from-scratch ingestion).
    pub fn clear(&self) -> RetrievalResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM doc_chunks", [])?;
        Ok(())
    }

    /// Total number of stored chunks.
    pub fn count(&self) -> RetrievalResult<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM doc_chunks", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Fetch one chunk by rowid.
    pub fn get_by_rowid(&self, rowid: i64) -> RetrievalResult<Option<StoredChunk>> {
        let conn = self.conn()?;
        let result = conn
            .query_row(
                "SELECT id, chunk_id, filename, title, page, chunk_index, content,
                        COALESCE(embedding, X'')
                 FROM doc_chunks WHERE id = ?1",
                params![rowid],
                |row| {
                    Ok(StoredChunk {
                        rowid: row.get(0)?,
                        chunk_id: row.get(1)?,
                        filename: row.get(2)?,
                        title: row.get(3)?,
                        page: row.get(4)?,
                        chunk_index: row.get(5)?,
                        content: row.get(6)?,
                        embedding: bytes_to_embedding(&row.get::<_, Vec<u8>>(7)?),
                    })
                },
            )
            .map(Some);

        match result {
            Ok(chunk) => Ok(chunk),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All `(rowid, embedding)` pairs, for index rebuilds.
    pub fn all_embeddings(&self) -> RetrievalResult<Vec<(i64, Vec<f32>)>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, COALESCE(embedding, X'') FROM doc_chunks ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                bytes_to_embedding(&row.get::<_, Vec<u8>>(1)?),
            ))
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// All `(rowid, content)` pairs, for vocabulary rebuilds and
    /// re-embedding passes.
    pub fn all_chunk_texts(&self) -> RetrievalResult<Vec<(i64, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, content FROM doc_chunks ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Replace the stored embedding of one chunk.
    pub fn update_embedding(&self, rowid: i64, embedding: &[f32]) -> RetrievalResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE doc_chunks SET embedding = ?1 WHERE id = ?2",
            params![embedding_to_bytes(embedding), rowid],
        )?;
        Ok(())
    }

    /// Read a metadata value (e.g. the persisted TF-IDF vocabulary).
    pub fn get_meta(&self, key: &str) -> RetrievalResult<Option<String>> {
        let conn = self.conn()?;
        let result = conn.query_row(
            "SELECT value FROM retrieval_meta WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a metadata value.
    pub fn set_meta(&self, key: &str, value: &str) -> RetrievalResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO retrieval_meta (key, value, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }
}
