//! LLM-backed advice generator.
//!
//! Builds a single system + user exchange describing the plan and the
//! retrieved note snippets, asks the provider for a JSON object, and parses
//! the reply into an [`AdviceOutcome`].

use std::sync::Arc;

use async_trait::async_trait;
use studyplan_config::AppConfig;
use studyplan_core::advice::{AdviceGenerator, AdviceOutcome, AdviceRequest};
use studyplan_core::error::ProviderError;
use studyplan_core::message::Message;
use studyplan_core::provider::{Provider, ProviderRequest};
use tracing::{debug, info, warn};

pub const SYSTEM_PROMPT: &str = "You are a precise study coach. Always return strict JSON only.";

/// Stands in for the context block when nothing was retrieved.
pub const NO_CONTEXT: &str = "NO_CONTEXT";

/// Snippet text is cut to this many characters in the prompt.
pub const SNIPPET_PREVIEW_CHARS: usize = 450;

const RESPONSE_SCHEMA: &str = r#"Return JSON exactly in this schema:
{
  "study_principles": [string],
  "focus_order": [string],
  "breaks": {"work": 50, "break": 10},
  "daily_checklist": [string],
  "rag_suggestions": [string],
  "citations": [string],
  "if_overbooked": {
     "strategy": "scope_cuts" | "extend_days" | "hybrid",
     "actions": [string]
  }
}
Include "if_overbooked" only when Overbooked is true.
If NO_CONTEXT, leave rag_suggestions empty and citations []."#;

/// Generates study advice through any chat provider.
pub struct LlmAdvisor {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl LlmAdvisor {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
        }
    }

    /// Model, temperature and token limit from config.
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        let model = config
            .providers
            .get(&config.default_provider)
            .and_then(|p| p.default_model.clone())
            .unwrap_or_else(|| config.default_model.clone());
        Self::new(provider, model)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The user prompt for `request`.
    pub fn build_prompt(request: &AdviceRequest<'_>) -> String {
        let subjects = serde_json::to_string(request.subjects).unwrap_or_default();
        let timetable = serde_json::to_string(request.timetable).unwrap_or_default();

        format!(
            "Subjects (name, difficulty, required_hours, score, weight):\n{subjects}\n\n\
             Timetable (per day, blocks of subject + hours):\n{timetable}\n\n\
             Overbooked: {}\n\
             Hours_gap: {}\n\n\
             Context passages (use to ground advice; cite as [chunk_id]):\n{}\n\n\
             {RESPONSE_SCHEMA}\n",
            request.overbooked,
            request.hours_gap,
            Self::context_block(request),
        )
    }

    /// One line per snippet, grouped in subject order, or [`NO_CONTEXT`].
    fn context_block(request: &AdviceRequest<'_>) -> String {
        let mut lines = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for subject in request.subjects {
            if !seen.insert(subject.name.as_str()) {
                continue;
            }
            let Some(snippets) = request.contexts.get(&subject.name) else {
                continue;
            };
            for snippet in snippets {
                let preview: String = snippet.text.chars().take(SNIPPET_PREVIEW_CHARS).collect();
                lines.push(format!("[{}] ({}) {}", snippet.id, snippet.path, preview));
            }
        }

        if lines.is_empty() {
            NO_CONTEXT.to_string()
        } else {
            lines.join("\n")
        }
    }
}

#[async_trait]
impl AdviceGenerator for LlmAdvisor {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn generate(&self, request: AdviceRequest<'_>) -> Result<AdviceOutcome, ProviderError> {
        let messages = vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(Self::build_prompt(&request)),
        ];
        let mut provider_request = ProviderRequest::json(&self.model, messages);
        provider_request.temperature = self.temperature;
        provider_request.max_tokens = self.max_tokens;

        debug!(
            provider = %self.provider.name(),
            model = %self.model,
            subjects = request.subjects.len(),
            "Requesting study advice"
        );

        let response = self.provider.complete(provider_request).await?;
        if let Some(usage) = &response.usage {
            info!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Advice received"
            );
        }

        let outcome = AdviceOutcome::parse(&response.message.content);
        if let AdviceOutcome::Malformed(m) = &outcome {
            warn!(error = %m.error, "Advice response was not usable");
        }
        Ok(outcome)
    }
}
