//! HNSW Vector Index
//!
//! Wraps the `hnsw_rs` crate to provide approximate nearest neighbor search
//! for embedding vectors. The index is a derived cache: the SQLite chunk
//! store is the source of truth, and the in-memory index is rebuilt from it
//! on first use.
//!
//! ## Thread Safety
//!
//! The inner `Hnsw` is wrapped in `Arc` and accessed via `RwLock` so that
//! readers (search) can proceed concurrently while writers (insert, rebuild)
//! hold exclusive access.

use hnsw_rs::prelude::*;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// HNSW tuning parameters.
const MAX_NB_CONNECTION: usize = 24;
const MAX_LAYER: usize = 16;
const EF_CONSTRUCTION: usize = 200;
const EF_SEARCH: usize = 64;

/// Maximum number of elements for initial index creation. The index can grow
/// beyond this but performance may degrade.
const DEFAULT_MAX_ELEMENTS: usize = 100_000;

/// Wrapper around `hnsw_rs::Hnsw` providing thread-safe, async-friendly
/// approximate nearest neighbor search over cosine distance.
pub struct VectorIndex {
    /// The HNSW index wrapped for concurrent access.
    /// `None` means the index has not been built yet.
    inner: RwLock<Option<Arc<HnswInner>>>,
    /// Total number of vectors inserted.
    count: RwLock<usize>,
}

/// Newtype wrapper so the HNSW can be sent across threads.
///
/// The `'static` lifetime is safe because the index is always created via
/// `Hnsw::new()`, which owns all of its data.
struct HnswInner {
    hnsw: Hnsw<'static, f32, DistCosine>,
}

// SAFETY: hnsw_rs::Hnsw<'static, f32, DistCosine> uses Arc-based internal
// storage and is safe to share across threads.
unsafe impl Send for HnswInner {}
unsafe impl Sync for HnswInner {}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorIndex {
    /// Create a new, empty vector index. No graph is allocated until
    /// `initialize` is called.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
            count: RwLock::new(0),
        }
    }

    /// Initialize the index with an empty HNSW graph, discarding any
    /// previous contents.
    pub async fn initialize(&self) {
        let hnsw = Hnsw::<f32, DistCosine>::new(
            MAX_NB_CONNECTION,
            DEFAULT_MAX_ELEMENTS,
            MAX_LAYER,
            EF_CONSTRUCTION,
            DistCosine,
        );
        let mut guard = self.inner.write().await;
        *guard = Some(Arc::new(HnswInner { hnsw }));
        let mut count = self.count.write().await;
        *count = 0;
    }

    /// Whether the index has been initialized.
    pub async fn is_ready(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// Number of vectors inserted since the last `initialize`.
    pub async fn len(&self) -> usize {
        *self.count.read().await
    }

    /// Whether the index holds no vectors.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Insert a batch of `(id, vector)` pairs.
    ///
    /// IDs are the SQLite rowids of the corresponding chunks. Zero-length
    /// vectors are skipped.
    pub async fn batch_insert(&self, items: &[(usize, Vec<f32>)]) {
        let guard = self.inner.read().await;
        let Some(inner) = guard.as_ref() else {
            debug!("batch_insert called before initialize; ignoring");
            return;
        };

        let mut inserted = 0usize;
        for (id, vector) in items {
            if vector.is_empty() {
                continue;
            }
            inner.hnsw.insert_slice((vector.as_slice(), *id));
            inserted += 1;
        }
        drop(guard);

        let mut count = self.count.write().await;
        *count += inserted;
    }

    /// Search for the `k` nearest neighbors of `query`.
    ///
    /// Returns `(id, distance)` pairs ordered ascending by cosine distance.
    /// An uninitialized or empty index yields no results.
    pub async fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if query.is_empty() || k == 0 {
            return Vec::new();
        }

        let guard = self.inner.read().await;
        let Some(inner) = guard.as_ref() else {
            return Vec::new();
        };

        let ef = EF_SEARCH.max(k * 2);
        let mut results: Vec<(usize, f32)> = inner
            .hnsw
            .search(query, k, ef)
            .into_iter()
            .map(|n| (n.d_id, n.distance))
            .collect();

        results.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);
        results
    }
}
