//! Embedding-backed ephemeral index.
//!
//! Chunks are embedded through the configured provider and held in memory
//! for the life of the process. A rebuild replaces the whole index in one
//! write; a failed rebuild leaves the previous index in place.

use std::sync::Arc;

use async_trait::async_trait;
use studyplan_config::ContextConfig;
use studyplan_core::context::{ContextHit, ContextStore, IndexStats};
use studyplan_core::error::ContextError;
use studyplan_core::provider::{EmbeddingRequest, Provider};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::chunk::{Chunk, Chunker};
use crate::vector::top_k;

/// Most inputs sent in one embedding request.
pub const EMBED_BATCH_SIZE: usize = 100;

struct Entry {
    chunk: Chunk,
    vector: Vec<f32>,
}

#[derive(Default)]
struct Index {
    entries: Vec<Entry>,
    dimension: usize,
}

/// In-memory vector index over pasted notes.
pub struct EphemeralIndex {
    provider: Arc<dyn Provider>,
    model: String,
    chunker: Chunker,
    index: RwLock<Index>,
}

impl EphemeralIndex {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, chunker: Chunker) -> Self {
        Self {
            provider,
            model: model.into(),
            chunker,
            index: RwLock::new(Index::default()),
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &ContextConfig) -> Self {
        Self::new(provider, &config.embedding_model, Chunker::from_config(config))
    }

    async fn embed(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, ContextError> {
        let expected = inputs.len();
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs,
            })
            .await?;

        if response.embeddings.len() != expected {
            return Err(ContextError::EmbeddingFailed(format!(
                "expected {expected} embeddings, got {}",
                response.embeddings.len()
            )));
        }
        Ok(response.embeddings)
    }
}

#[async_trait]
impl ContextStore for EphemeralIndex {
    fn name(&self) -> &str {
        "embedding"
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<ContextHit>, ContextError> {
        if k == 0 || self.index.read().await.entries.is_empty() {
            return Ok(Vec::new());
        }

        // No index lock is held across the embedding call
        let query_vector = self
            .embed(vec![query.to_string()])
            .await?
            .pop()
            .unwrap_or_default();

        let index = self.index.read().await;
        if index.entries.is_empty() {
            return Ok(Vec::new());
        }
        if query_vector.len() != index.dimension {
            return Err(ContextError::DimensionMismatch {
                expected: index.dimension,
                actual: query_vector.len(),
            });
        }

        let hits: Vec<ContextHit> = top_k(&index.entries, |e| e.vector.as_slice(), &query_vector, k)
            .into_iter()
            .map(|(entry, score)| ContextHit {
                id: entry.chunk.id.clone(),
                path: entry.chunk.path.clone(),
                text: entry.chunk.text.clone(),
                score,
            })
            .collect();

        debug!(query = %query, hits = hits.len(), "Searched context index");
        Ok(hits)
    }

    async fn build(&self, snippets: &[String]) -> Result<IndexStats, ContextError> {
        let chunks = self.chunker.chunk_all(snippets);
        if chunks.is_empty() {
            *self.index.write().await = Index::default();
            info!("Cleared context index, no note text to embed");
            return Ok(IndexStats::default());
        }

        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts = batch.iter().map(|c| c.text.clone()).collect();
            vectors.extend(self.embed(texts).await?);
        }

        let dimension = vectors.first().map(Vec::len).unwrap_or_default();
        if dimension == 0 {
            return Err(ContextError::EmbeddingFailed("provider returned empty vectors".into()));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(ContextError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        let entries: Vec<Entry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| Entry { chunk, vector })
            .collect();
        let stats = IndexStats {
            chunk_count: entries.len(),
            dimension,
        };

        *self.index.write().await = Index { entries, dimension };
        info!(chunks = stats.chunk_count, dimension, model = %self.model, "Built context index");
        Ok(stats)
    }

    async fn len(&self) -> usize {
        self.index.read().await.entries.len()
    }
}
