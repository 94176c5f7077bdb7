//! TF-IDF Embedding Service
//!
//! Provides local, offline text vectorization using TF-IDF (Term Frequency —
//! Inverse Document Frequency). Designed as a drop-in surface for heavier
//! ML-based embeddings — the public API (`embed_text`, `embed_batch`,
//! `cosine_similarity`) stays the same regardless of the backend.
//!
//! * No external ML dependency, pure Rust.
//! * Fixed-size vocabulary, built from the ingestion corpus and persisted as
//!   JSON so query-time embedding matches index-time embedding across
//!   processes.
//! * Thread-safe via `Arc<Mutex<...>>` so it can be shared across concurrent
//!   pipeline runs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Maximum vocabulary size (number of unique tokens tracked).
const MAX_VOCAB_SIZE: usize = 8192;

/// Minimum document frequency — tokens appearing in fewer documents are pruned.
const MIN_DOC_FREQUENCY: usize = 1;

/// Vocabulary learned from a corpus.
///
/// Serializable so it can be exported at ingest time and imported at query
/// time by a different process.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Vocabulary {
    /// Map from token → column index in the TF-IDF vector.
    token_to_idx: HashMap<String, usize>,
    /// Inverse document frequency for each token (same order as `token_to_idx` values).
    idf: Vec<f32>,
    /// Total number of documents the vocabulary was built from.
    num_docs: usize,
}

/// Thread-safe TF-IDF embedding service.
///
/// The vocabulary is built once from the ingestion corpus (or imported from
/// its persisted form) and then frozen for all subsequent calls.
#[derive(Debug, Clone)]
pub struct EmbeddingService {
    inner: Arc<Mutex<EmbeddingServiceInner>>,
}

#[derive(Debug)]
struct EmbeddingServiceInner {
    vocab: Option<Vocabulary>,
}

impl Default for EmbeddingService {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbeddingService {
    /// Create a new, uninitialised embedding service.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(EmbeddingServiceInner { vocab: None })),
        }
    }

    /// Return the dimensionality of the embedding vectors.
    ///
    /// Returns 0 if the vocabulary has not been built yet.
    pub fn dimension(&self) -> usize {
        let guard = self.inner.lock().unwrap();
        guard.vocab.as_ref().map_or(0, |v| v.idf.len())
    }

    /// Build (or rebuild) the vocabulary from a corpus of documents.
    ///
    /// Each entry in `corpus` is the full text of one chunk. After this call,
    /// `embed_text` and `embed_batch` produce vectors of the vocabulary's
    /// dimensionality.
    pub fn build_vocabulary(&self, corpus: &[&str]) {
        let vocab = build_vocab(corpus);
        let mut guard = self.inner.lock().unwrap();
        guard.vocab = Some(vocab);
    }

    /// Embed a single text string into a TF-IDF vector.
    ///
    /// Returns an empty vector if the vocabulary has not been built yet.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let guard = self.inner.lock().unwrap();
        match &guard.vocab {
            Some(vocab) => tfidf_vector(text, vocab),
            None => Vec::new(),
        }
    }

    /// Embed a batch of text strings.
    ///
    /// If the vocabulary has not been built yet, it is built from the
    /// provided texts (treating them as the corpus). Subsequent calls reuse
    /// the existing vocabulary.
    pub fn embed_batch(&self, texts: &[&str]) -> Vec<Vec<f32>> {
        {
            let mut guard = self.inner.lock().unwrap();
            if guard.vocab.is_none() {
                guard.vocab = Some(build_vocab(texts));
            }
        }
        let guard = self.inner.lock().unwrap();
        let vocab = guard.vocab.as_ref().unwrap();
        texts.iter().map(|t| tfidf_vector(t, vocab)).collect()
    }

    /// Check whether the vocabulary has been initialised.
    pub fn is_ready(&self) -> bool {
        self.inner.lock().unwrap().vocab.is_some()
    }

    /// Export the current vocabulary as a JSON string.
    ///
    /// Returns `None` if no vocabulary has been built yet.
    pub fn export_vocabulary(&self) -> Option<String> {
        let guard = self.inner.lock().unwrap();
        guard
            .vocab
            .as_ref()
            .and_then(|v| serde_json::to_string(v).ok())
    }

    /// Import a vocabulary from a JSON string, replacing any existing one.
    pub fn import_vocabulary(&self, json: &str) -> Result<(), String> {
        let vocab: Vocabulary =
            serde_json::from_str(json).map_err(|e| format!("invalid vocabulary JSON: {}", e))?;
        let mut guard = self.inner.lock().unwrap();
        guard.vocab = Some(vocab);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Cosine similarity
// ---------------------------------------------------------------------------

/// Compute the cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero magnitude or lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut mag_a = 0.0f32;
    let mut mag_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }

    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

// ---------------------------------------------------------------------------
// Tokenisation
// ---------------------------------------------------------------------------

/// Simple tokeniser: lowercase, split on non-alphanumeric, filter short tokens.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() >= 2)
        .map(|word| word.to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Vocabulary building
// ---------------------------------------------------------------------------

/// Build a `Vocabulary` from a set of documents.
fn build_vocab(corpus: &[&str]) -> Vocabulary {
    let num_docs = corpus.len().max(1);

    // Count document frequency for each token.
    let mut doc_freq: HashMap<String, usize> = HashMap::new();

    for doc in corpus {
        let tokens = tokenize(doc);
        let unique: std::collections::HashSet<&str> = tokens.iter().map(|s| s.as_str()).collect();
        for tok in unique {
            *doc_freq.entry(tok.to_string()).or_insert(0) += 1;
        }
    }

    // Filter by minimum document frequency and sort by frequency descending
    // with an alphabetical tiebreak so indices are deterministic.
    let mut entries: Vec<(String, usize)> = doc_freq
        .into_iter()
        .filter(|(_, freq)| *freq >= MIN_DOC_FREQUENCY)
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(MAX_VOCAB_SIZE);

    let mut token_to_idx = HashMap::with_capacity(entries.len());
    let mut idf = Vec::with_capacity(entries.len());

    for (idx, (token, freq)) in entries.into_iter().enumerate() {
        token_to_idx.insert(token, idx);
        // Standard IDF formula: ln(N / df) + 1 (the +1 prevents zero IDF).
        let idf_val = ((num_docs as f32) / (freq as f32)).ln() + 1.0;
        idf.push(idf_val);
    }

    Vocabulary {
        token_to_idx,
        idf,
        num_docs,
    }
}

// ---------------------------------------------------------------------------
// TF-IDF vector computation
// ---------------------------------------------------------------------------

/// Compute a normalised TF-IDF vector for `text` using the given vocabulary.
fn tfidf_vector(text: &str, vocab: &Vocabulary) -> Vec<f32> {
    let dim = vocab.idf.len();
    if dim == 0 {
        return Vec::new();
    }

    let tokens = tokenize(text);
    let total_tokens = tokens.len().max(1) as f32;

    // Term frequency (normalised by document length)
    let mut tf = vec![0.0f32; dim];
    for tok in &tokens {
        if let Some(&idx) = vocab.token_to_idx.get(tok.as_str()) {
            tf[idx] += 1.0 / total_tokens;
        }
    }

    // Multiply by IDF
    for (i, idf_val) in vocab.idf.iter().enumerate() {
        tf[i] *= idf_val;
    }

    // L2 normalise
    let mag: f32 = tf.iter().map(|v| v * v).sum::<f32>().sqrt();
    if mag > 0.0 {
        for v in &mut tf {
            *v /= mag;
        }
    }

    tf
}

// ---------------------------------------------------------------------------
// BLOB helpers
// ---------------------------------------------------------------------------

/// Serialize an f32 vector to bytes (little-endian) for BLOB storage.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for val in embedding {
        bytes.extend_from_slice(&val.to_le_bytes());
    }
    bytes
}

/// Deserialize bytes (little-endian) back to an f32 vector.
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let arr: [u8; 4] = [chunk[0], chunk[1], chunk[2], chunk[3]];
            f32::from_le_bytes(arr)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_is_zero_before_vocab() {
        let svc = EmbeddingService::new();
        assert_eq!(svc.dimension(), 0);
        assert!(!svc.is_ready());
    }

    #[test]
    fn build_vocabulary_sets_dimension() {
        let svc = EmbeddingService::new();
        svc.build_vocabulary(&["invoices are paid monthly", "menu items can be paused"]);
        assert!(svc.is_ready());
        assert!(svc.dimension() > 0);
    }

    #[test]
    fn embed_text_is_deterministic() {
        let svc = EmbeddingService::new();
        svc.build_vocabulary(&["refund policy for invoices", "opening hours for the store"]);
        let a = svc.embed_text("refund policy");
        let b = svc.embed_text("refund policy");
        assert_eq!(a, b);
    }

    #[test]
    fn identical_texts_have_unit_similarity() {
        let svc = EmbeddingService::new();
        svc.build_vocabulary(&["refund policy for invoices", "opening hours for the store"]);
        let v = svc.embed_text("refund policy for invoices");
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-5, "self similarity was {}", sim);
    }

    #[test]
    fn related_text_scores_higher_than_unrelated() {
        let svc = EmbeddingService::new();
        svc.build_vocabulary(&[
            "refund policy for customer invoices",
            "opening hours for the store on weekends",
            "onboarding checklist for new partners",
        ]);
        let query = svc.embed_text("when are refunds issued for invoices");
        let related = svc.embed_text("refund policy for customer invoices");
        let unrelated = svc.embed_text("opening hours for the store on weekends");
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn embed_batch_builds_vocab_lazily() {
        let svc = EmbeddingService::new();
        let vectors = svc.embed_batch(&["hello world", "foo bar"]);
        assert!(svc.is_ready());
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), svc.dimension());
    }

    #[test]
    fn export_import_roundtrip() {
        let svc = EmbeddingService::new();
        svc.build_vocabulary(&["pause the garlic bread", "update opening hours"]);
        let exported = svc.export_vocabulary().expect("vocabulary json");

        let restored = EmbeddingService::new();
        restored.import_vocabulary(&exported).unwrap();
        assert_eq!(restored.dimension(), svc.dimension());
        assert_eq!(
            restored.embed_text("garlic bread"),
            svc.embed_text("garlic bread")
        );
    }

    #[test]
    fn import_rejects_invalid_json() {
        let svc = EmbeddingService::new();
        assert!(svc.import_vocabulary("{not json").is_err());
    }

    #[test]
    fn cosine_similarity_edge_cases() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn embedding_bytes_roundtrip() {
        let embedding = vec![0.25f32, -1.5, 3.75];
        let bytes = embedding_to_bytes(&embedding);
        assert_eq!(bytes.len(), 12);
        assert_eq!(bytes_to_embedding(&bytes), embedding);
    }
}
