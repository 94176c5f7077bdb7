//! Retrieval Client
//!
//! Composes the chunker, embedding provider, chunk store, and vector index
//! into the retrieval boundary used by the agent pipeline: ingest documents,
//! then answer `search(query, k)` with ranked passages.
//!
//! The embedding provider and index are expensive shared handles. They are
//! lazily initialized on first use behind an async lock so that two
//! concurrent first callers race safely — exactly one rebuild wins and both
//! observe the same ready index.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::chunker::{chunk_document, ChunkingOptions, SourceDocument};
use crate::embedding_provider::EmbeddingProvider;
use crate::embedding_tfidf::TfIdfEmbeddingProvider;
use crate::error::RetrievalResult;
use crate::hnsw_index::VectorIndex;
use crate::store::ChunkStore;

/// Metadata key under which the TF-IDF vocabulary is persisted.
const VOCABULARY_META_KEY: &str = "tfidf_vocabulary";

/// A retrieved unit of source text plus its similarity score and metadata.
///
/// `distance` is cosine distance: ascending distance means descending
/// relevance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    /// The chunk text.
    pub document: String,
    /// Source metadata: `filename`, `page`, `title`, `chunk`.
    pub metadata: HashMap<String, String>,
    /// Cosine distance from the query embedding.
    pub distance: f32,
}

/// Options for an ingestion run.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Chunking parameters.
    pub chunking: ChunkingOptions,
    /// Drop all previously stored chunks first.
    pub rebuild: bool,
}

/// Summary of an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Number of source documents processed.
    pub documents: usize,
    /// Number of chunks written to the store.
    pub chunks: usize,
}

/// Retrieval boundary: embed query → vector search → hydrated passages.
pub struct RetrievalClient {
    store: ChunkStore,
    embedder: Arc<dyn EmbeddingProvider>,
    index: VectorIndex,
    /// Guards lazy index/vocabulary initialization.
    init_lock: Mutex<()>,
}

impl RetrievalClient {
    /// Create a client over an opened store and embedding provider.
    ///
    /// The vector index starts empty and is rebuilt from the store on first
    /// search.
    pub fn new(store: ChunkStore, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            embedder,
            index: VectorIndex::new(),
            init_lock: Mutex::new(()),
        }
    }

    /// Access the underlying chunk store.
    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Number of chunks currently indexed.
    pub fn chunk_count(&self) -> RetrievalResult<i64> {
        self.store.count()
    }

    /// Ingest documents: chunk, embed, store, and rebuild the index.
    pub async fn ingest(
        &self,
        documents: &[SourceDocument],
        options: &IngestOptions,
    ) -> RetrievalResult<IngestSummary> {
        let _guard = self.init_lock.lock().await;

        if options.rebuild {
            info!("Rebuilding chunk store from scratch");
            self.store.clear()?;
        }

        let chunks: Vec<_> = documents
            .iter()
            .flat_map(|doc| chunk_document(doc, &options.chunking))
            .collect();

        if chunks.is_empty() {
            return Ok(IngestSummary {
                documents: documents.len(),
                chunks: 0,
            });
        }

        let batch_size = self.embedder.max_batch_size().max(1);

        if let Some(tfidf) = self
            .embedder
            .as_any()
            .downcast_ref::<TfIdfEmbeddingProvider>()
        {
            // A fresh vocabulary changes the embedding space, invalidating
            // every stored vector. Store the new chunks first, rebuild the
            // vocabulary over the full corpus, persist it for query-time
            // processes, then re-embed everything.
            for chunk in &chunks {
                self.store.upsert_chunk(chunk, &[])?;
            }

            let rows = self.store.all_chunk_texts()?;
            let corpus: Vec<&str> = rows.iter().map(|(_, text)| text.as_str()).collect();
            tfidf.build_vocabulary(&corpus);
            if let Some(json) = tfidf.export_vocabulary() {
                self.store.set_meta(VOCABULARY_META_KEY, &json)?;
            }

            for batch in rows.chunks(batch_size) {
                let texts: Vec<&str> = batch.iter().map(|(_, text)| text.as_str()).collect();
                let embeddings = self.embedder.embed_documents(&texts).await?;
                for ((rowid, _), embedding) in batch.iter().zip(embeddings.iter()) {
                    self.store.update_embedding(*rowid, embedding)?;
                }
            }
        } else {
            // Fixed-dimension provider: only the incoming chunks need
            // embedding.
            let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
            let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
            for batch in texts.chunks(batch_size) {
                let mut batch_embeddings = self.embedder.embed_documents(batch).await?;
                embeddings.append(&mut batch_embeddings);
            }
            for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
                self.store.upsert_chunk(chunk, embedding)?;
            }
        }

        self.rebuild_index().await?;

        info!(
            documents = documents.len(),
            chunks = chunks.len(),
            "Ingestion complete"
        );

        Ok(IngestSummary {
            documents: documents.len(),
            chunks: chunks.len(),
        })
    }

    /// Search for the `k` passages nearest to `query`.
    ///
    /// Returns an empty sequence (not an error) when nothing has been
    /// ingested or the query embeds to a zero vocabulary.
    pub async fn search(&self, query: &str, k: usize) -> RetrievalResult<Vec<Passage>> {
        if k == 0 || self.store.count()? == 0 {
            return Ok(Vec::new());
        }

        self.ensure_ready().await?;

        let query_embedding = self.embedder.embed_query(query).await?;
        if query_embedding.is_empty() {
            debug!("Query produced an empty embedding; returning no passages");
            return Ok(Vec::new());
        }

        let hits = self.index.search(&query_embedding, k).await;

        let mut passages = Vec::with_capacity(hits.len());
        for (rowid, distance) in hits {
            if let Some(stored) = self.store.get_by_rowid(rowid as i64)? {
                let mut metadata = HashMap::new();
                metadata.insert("filename".to_string(), stored.filename);
                metadata.insert("title".to_string(), stored.title);
                metadata.insert("page".to_string(), stored.page.to_string());
                metadata.insert("chunk".to_string(), stored.chunk_index.to_string());

                passages.push(Passage {
                    document: stored.content,
                    metadata,
                    distance,
                });
            }
        }

        // hnsw returns ascending distances; keep that contract explicit.
        passages.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        passages.truncate(k);

        Ok(passages)
    }

    /// Make the index and vocabulary usable, rebuilding from the store if
    /// this is the first call in the process.
    async fn ensure_ready(&self) -> RetrievalResult<()> {
        if self.index.is_ready().await {
            return Ok(());
        }

        let _guard = self.init_lock.lock().await;
        // A concurrent first caller may have finished while we waited.
        if self.index.is_ready().await {
            return Ok(());
        }

        if let Some(tfidf) = self
            .embedder
            .as_any()
            .downcast_ref::<TfIdfEmbeddingProvider>()
        {
            if !tfidf.is_ready() {
                if let Some(json) = self.store.get_meta(VOCABULARY_META_KEY)? {
                    tfidf
                        .import_vocabulary(&json)
                        .map_err(crate::error::RetrievalError::internal)?;
                }
            }
        }

        self.rebuild_index().await
    }

    /// Rebuild the in-memory index from every stored embedding.
    async fn rebuild_index(&self) -> RetrievalResult<()> {
        self.index.initialize().await;
        let items: Vec<(usize, Vec<f32>)> = self
            .store
            .all_embeddings()?
            .into_iter()
            .map(|(rowid, embedding)| (rowid as usize, embedding))
            .collect();
        debug!(vectors = items.len(), "Rebuilding vector index");
        self.index.batch_insert(&items).await;
        Ok(())
    }
}
