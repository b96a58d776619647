//! Context Store trait: retrieval over the user's pasted study notes.
//!
//! The store is rebuilt wholesale from a list of note snippets and then
//! searched once per subject while a plan is generated. A store that has
//! never been built is not an error: every search on it returns nothing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::error::ContextError;

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextHit {
    /// Chunk id, e.g. "Pasted#1.2"
    pub id: String,

    /// Where the chunk came from
    pub path: String,

    /// The chunk text
    pub text: String,

    /// Relevance score (higher is better)
    pub score: f32,
}

/// A retrieved snippet as carried in the plan state (score dropped).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnippet {
    pub id: String,
    pub path: String,
    pub text: String,
}

impl From<ContextHit> for ContextSnippet {
    fn from(hit: ContextHit) -> Self {
        Self {
            id: hit.id,
            path: hit.path,
            text: hit.text,
        }
    }
}

/// Per-subject retrieved snippets, keyed by subject name.
pub type Contexts = BTreeMap<String, Vec<ContextSnippet>>;

/// What a build produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of chunks indexed
    pub chunk_count: usize,

    /// Embedding dimension (0 for stores without vectors, or when empty)
    pub dimension: usize,
}

/// The core ContextStore trait.
///
/// Implementations: embedding-backed ephemeral index, offline keyword index,
/// no-op.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// The backend name (e.g., "embedding", "keyword", "none").
    fn name(&self) -> &str;

    /// Return at most `k` hits ordered by descending relevance.
    ///
    /// Returns an empty list when no index has been built.
    async fn search(&self, query: &str, k: usize) -> std::result::Result<Vec<ContextHit>, ContextError>;

    /// Replace any prior index with one built from `snippets`.
    async fn build(&self, snippets: &[String]) -> std::result::Result<IndexStats, ContextError>;

    /// Number of indexed chunks.
    async fn len(&self) -> usize;

    /// Whether no index is currently loaded.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_projects_to_snippet() {
        let hit = ContextHit {
            id: "Pasted#1.1".into(),
            path: "Pasted".into(),
            text: "v = u + at".into(),
            score: 0.93,
        };
        let snippet = ContextSnippet::from(hit);
        assert_eq!(snippet.id, "Pasted#1.1");
        assert_eq!(snippet.text, "v = u + at");

        let json = serde_json::to_string(&snippet).unwrap();
        assert!(!json.contains("score"));
    }
}
