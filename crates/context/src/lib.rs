//! Context Store implementations for studyplan.
//!
//! All stores implement `studyplan_core::ContextStore`. [`build_store`]
//! picks one from the `[context]` config section.

pub mod chunk;
pub mod ephemeral;
pub mod keyword;
pub mod noop;
pub mod vector;

use std::sync::Arc;

use studyplan_config::ContextConfig;
use studyplan_core::context::ContextStore;
use studyplan_core::error::ContextError;
use studyplan_core::provider::Provider;

pub use chunk::{Chunk, Chunker};
pub use ephemeral::EphemeralIndex;
pub use keyword::KeywordIndex;
pub use noop::NoopContextStore;
pub use vector::cosine_similarity;

/// Build the store named by `config.backend`.
///
/// Only the `"embedding"` backend uses `provider`.
pub fn build_store(
    config: &ContextConfig,
    provider: Arc<dyn Provider>,
) -> Result<Arc<dyn ContextStore>, ContextError> {
    let store: Arc<dyn ContextStore> = match config.backend.as_str() {
        "embedding" => Arc::new(EphemeralIndex::from_config(provider, config)),
        "keyword" => Arc::new(KeywordIndex::from_config(config)),
        "none" => Arc::new(NoopContextStore),
        other => {
            return Err(ContextError::Storage(format!(
                "Unknown context backend '{other}'"
            )));
        }
    };
    Ok(store)
}
