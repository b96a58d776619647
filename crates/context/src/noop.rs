//! No-op context store: retrieval disabled.

use async_trait::async_trait;
use studyplan_core::context::{ContextHit, ContextStore, IndexStats};
use studyplan_core::error::ContextError;

/// A store that never holds anything.
pub struct NoopContextStore;

#[async_trait]
impl ContextStore for NoopContextStore {
    fn name(&self) -> &str {
        "none"
    }

    async fn search(&self, _query: &str, _k: usize) -> Result<Vec<ContextHit>, ContextError> {
        Ok(Vec::new())
    }

    async fn build(&self, _snippets: &[String]) -> Result<IndexStats, ContextError> {
        Ok(IndexStats::default())
    }

    async fn len(&self) -> usize {
        0
    }
}
