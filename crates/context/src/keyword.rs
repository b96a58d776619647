//! Offline keyword index.
//!
//! Needs no provider. A chunk scores the fraction of distinct query terms
//! (lowercase, two characters or longer) that occur in its text.

use std::collections::BTreeSet;

use async_trait::async_trait;
use studyplan_config::ContextConfig;
use studyplan_core::context::{ContextHit, ContextStore, IndexStats};
use studyplan_core::error::ContextError;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::chunk::{Chunk, Chunker};

struct Entry {
    chunk: Chunk,
    lowered: String,
}

/// Substring-matching index over pasted notes.
pub struct KeywordIndex {
    chunker: Chunker,
    entries: RwLock<Vec<Entry>>,
}

impl KeywordIndex {
    pub fn new(chunker: Chunker) -> Self {
        Self {
            chunker,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(Chunker::from_config(config))
    }
}

/// Distinct lowercase alphanumeric terms of at least two characters.
fn query_terms(query: &str) -> BTreeSet<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl ContextStore for KeywordIndex {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<ContextHit>, ContextError> {
        let entries = self.entries.read().await;
        let terms = query_terms(query);
        if entries.is_empty() || terms.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<ContextHit> = entries
            .iter()
            .filter_map(|entry| {
                let matched = terms.iter().filter(|t| entry.lowered.contains(t.as_str())).count();
                (matched > 0).then(|| ContextHit {
                    id: entry.chunk.id.clone(),
                    path: entry.chunk.path.clone(),
                    text: entry.chunk.text.clone(),
                    score: matched as f32 / terms.len() as f32,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);

        debug!(query = %query, hits = hits.len(), "Searched keyword index");
        Ok(hits)
    }

    async fn build(&self, snippets: &[String]) -> Result<IndexStats, ContextError> {
        let entries: Vec<Entry> = self
            .chunker
            .chunk_all(snippets)
            .into_iter()
            .map(|chunk| Entry {
                lowered: chunk.text.to_lowercase(),
                chunk,
            })
            .collect();
        let chunk_count = entries.len();

        *self.entries.write().await = entries;
        info!(chunks = chunk_count, "Built keyword index");
        Ok(IndexStats {
            chunk_count,
            dimension: 0,
        })
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
