pub mod doctor;
pub mod index;
pub mod onboard;
pub mod plan;

use std::path::PathBuf;
use std::sync::Arc;

use studyplan_config::AppConfig;
use studyplan_core::context::ContextStore;
use studyplan_core::provider::Provider;

/// The default provider and the configured context store.
pub struct Services {
    pub provider: Arc<dyn Provider>,
    pub store: Arc<dyn ContextStore>,
}

impl Services {
    pub fn from_config(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let router = studyplan_providers::build_from_config(config);
        let provider = router
            .default()
            .ok_or_else(|| format!("Provider '{}' is not registered", router.default_name()))?;
        let store = studyplan_context::build_store(&config.context, provider.clone())?;
        Ok(Self { provider, store })
    }
}

/// Read note files into one snippet each.
pub fn read_notes(paths: &[PathBuf]) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    paths
        .iter()
        .map(|path| {
            std::fs::read_to_string(path).map_err(|e| {
                Box::<dyn std::error::Error>::from(format!(
                    "Failed to read notes {}: {e}",
                    path.display()
                ))
            })
        })
        .collect()
}
