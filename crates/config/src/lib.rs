//! Configuration loading, validation, and management for studyplan.
//!
//! Loads configuration from `~/.studyplan/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.studyplan/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Model used for advice generation
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Sampling temperature for advice generation
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Max tokens per advice response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Scoring and allocation settings
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Note retrieval settings
    #[serde(default)]
    pub context: ContextConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-1.5-flash".into()
}
fn default_temperature() -> f32 {
    0.0
}
fn default_max_tokens() -> u32 {
    2048
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("planner", &self.planner)
            .field("context", &self.context)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Remaining-hours threshold below which a subject counts as satisfied
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    #[serde(default = "default_days_left")]
    pub default_days_left: u32,

    #[serde(default = "default_hours_per_day")]
    pub default_hours_per_day: f64,

    #[serde(default = "default_max_days_left")]
    pub max_days_left: u32,

    #[serde(default = "default_max_hours_per_day")]
    pub max_hours_per_day: f64,
}

fn default_epsilon() -> f64 {
    1e-4
}
fn default_days_left() -> u32 {
    7
}
fn default_hours_per_day() -> f64 {
    4.0
}
fn default_max_days_left() -> u32 {
    60
}
fn default_max_hours_per_day() -> f64 {
    24.0
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            default_days_left: default_days_left(),
            default_hours_per_day: default_hours_per_day(),
            max_days_left: default_max_days_left(),
            max_hours_per_day: default_max_hours_per_day(),
        }
    }
}

/// Which context store backs note retrieval.
pub const CONTEXT_BACKENDS: [&str; 3] = ["embedding", "keyword", "none"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// "embedding", "keyword" or "none"
    #[serde(default = "default_context_backend")]
    pub backend: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Snippets retrieved per subject
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Label used for chunk ids and paths
    #[serde(default = "default_source_name")]
    pub source_name: String,

    /// Appended to the subject name to form the retrieval query
    #[serde(default = "default_query_suffix")]
    pub query_suffix: String,
}

fn default_context_backend() -> String {
    "embedding".into()
}
fn default_embedding_model() -> String {
    "text-embedding-004".into()
}
fn default_top_k() -> usize {
    4
}
fn default_chunk_chars() -> usize {
    900
}
fn default_chunk_overlap() -> usize {
    120
}
fn default_source_name() -> String {
    "Pasted".into()
}
fn default_query_suffix() -> String {
    "key formulas concepts summaries".into()
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            backend: default_context_backend(),
            embedding_model: default_embedding_model(),
            top_k: default_top_k(),
            chunk_chars: default_chunk_chars(),
            chunk_overlap: default_chunk_overlap(),
            source_name: default_source_name(),
            query_suffix: default_query_suffix(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.studyplan/config.toml).
    ///
    /// Environment variables override the file:
    /// - `STUDYPLAN_API_KEY`, `GOOGLE_API_KEY`, `OPENAI_API_KEY` (first set wins)
    /// - `STUDYPLAN_PROVIDER`
    /// - `STUDYPLAN_MODEL`, `GEMINI_MODEL`
    /// - `EMBED_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with(&config_path, |key| std::env::var(key).ok())
    }

    /// Load from `path`, resolving overrides through `lookup`.
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::load_from(path)?;
        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("STUDYPLAN_API_KEY")
            .or_else(|| non_empty("GOOGLE_API_KEY"))
            .or_else(|| non_empty("OPENAI_API_KEY"))
        {
            self.api_key = Some(key);
        }

        if let Some(provider) = non_empty("STUDYPLAN_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = non_empty("STUDYPLAN_MODEL").or_else(|| non_empty("GEMINI_MODEL")) {
            self.default_model = model;
        }

        if let Some(model) = non_empty("EMBED_MODEL") {
            self.context.embedding_model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".studyplan")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let planner = &self.planner;
        if !(planner.epsilon > 0.0 && planner.epsilon < 1.0) {
            return Err(ConfigError::ValidationError(
                "planner.epsilon must be in (0, 1)".into(),
            ));
        }
        if planner.max_days_left == 0 || planner.default_days_left == 0 {
            return Err(ConfigError::ValidationError(
                "planner day counts must be at least 1".into(),
            ));
        }
        if planner.default_days_left > planner.max_days_left {
            return Err(ConfigError::ValidationError(
                "planner.default_days_left exceeds planner.max_days_left".into(),
            ));
        }
        if !(planner.max_hours_per_day > 0.0 && planner.default_hours_per_day > 0.0) {
            return Err(ConfigError::ValidationError(
                "planner hours per day must be positive".into(),
            ));
        }
        if planner.default_hours_per_day > planner.max_hours_per_day {
            return Err(ConfigError::ValidationError(
                "planner.default_hours_per_day exceeds planner.max_hours_per_day".into(),
            ));
        }

        let context = &self.context;
        if !CONTEXT_BACKENDS.contains(&context.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "context.backend must be one of {CONTEXT_BACKENDS:?}, got '{}'",
                context.backend
            )));
        }
        if context.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "context.top_k must be at least 1".into(),
            ));
        }
        if context.chunk_chars == 0 || context.chunk_overlap >= context.chunk_chars {
            return Err(ConfigError::ValidationError(
                "context.chunk_overlap must be smaller than a non-zero context.chunk_chars".into(),
            ));
        }

        Ok(())
    }

    /// API key for `provider`: its own key first, then the global one.
    pub fn api_key_for(&self, provider: &str) -> Option<String> {
        self.providers
            .get(provider)
            .and_then(|p| p.api_key.clone())
            .or_else(|| self.api_key.clone())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key_for(&self.default_provider).is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            planner: PlannerConfig::default(),
            context: ContextConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "gemini");
        assert_eq!(config.context.top_k, 4);
        assert_eq!(config.planner.epsilon, 1e-4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.context.chunk_chars, config.context.chunk_chars);
        assert_eq!(parsed.planner.max_days_left, config.planner.max_days_left);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_planner_and_context_settings_rejected() {
        let mut config = AppConfig::default();
        config.planner.epsilon = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.context.chunk_overlap = config.context.chunk_chars;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.context.backend = "faiss".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("faiss"));

        let mut config = AppConfig::default();
        config.planner.default_days_left = 90;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        let config = result.unwrap();
        assert_eq!(config.default_provider, "gemini");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
default_provider = "openai"
default_model = "gpt-4o-mini"

[context]
backend = "keyword"
top_k = 2

[providers.openai]
api_key = "sk-file"
"#
        )
        .unwrap();

        let config = AppConfig::load_with(file.path(), no_env).unwrap();
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.context.backend, "keyword");
        assert_eq!(config.context.top_k, 2);
        assert_eq!(config.context.chunk_chars, 900);
        assert_eq!(config.planner.default_hours_per_day, 4.0);
        assert_eq!(config.api_key_for("openai").as_deref(), Some("sk-file"));
        assert!(config.has_api_key());
    }

    #[test]
    fn unparseable_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_provider = [").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_apply_in_priority_order() {
        let env = |key: &str| match key {
            "GOOGLE_API_KEY" => Some("google-key".to_string()),
            "OPENAI_API_KEY" => Some("openai-key".to_string()),
            "GEMINI_MODEL" => Some("gemini-1.5-pro".to_string()),
            "EMBED_MODEL" => Some("embedding-001".to_string()),
            "STUDYPLAN_PROVIDER" => Some("   ".to_string()),
            _ => None,
        };
        let config = AppConfig::load_with(Path::new("/nonexistent/config.toml"), env).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("google-key"));
        assert_eq!(config.default_model, "gemini-1.5-pro");
        assert_eq!(config.context.embedding_model, "embedding-001");
        // Blank values are ignored.
        assert_eq!(config.default_provider, "gemini");
    }

    #[test]
    fn debug_output_redacts_keys() {
        let mut config = AppConfig {
            api_key: Some("super-secret".into()),
            ..AppConfig::default()
        };
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-hidden".into()),
                ..ProviderConfig::default()
            },
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("sk-hidden"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gemini"));
        assert!(toml_str.contains("text-embedding-004"));
    }
}
