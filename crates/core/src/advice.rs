//! Advice Generator contract and its structured result.
//!
//! The generator is an external collaborator (an LLM in production). Its
//! payload is dynamically typed, so the result is a tagged [`AdviceOutcome`]:
//! either parsed [`Advice`] or a [`MalformedAdvice`] carrying the parse error
//! and the raw text. Only transport failures surface as `Err`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::context::Contexts;
use crate::error::ProviderError;
use crate::subject::Subject;
use crate::timetable::Timetable;

/// How to respond when the plan cannot cover every subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverbookStrategy {
    /// Drop low-priority topics
    ScopeCuts,
    /// Ask for more days
    ExtendDays,
    /// A mix of both
    Hybrid,
}

impl std::fmt::Display for OverbookStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OverbookStrategy::ScopeCuts => "scope_cuts",
            OverbookStrategy::ExtendDays => "extend_days",
            OverbookStrategy::Hybrid => "hybrid",
        };
        f.write_str(s)
    }
}

/// Present only when the plan is overbooked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverbookedPlan {
    pub strategy: OverbookStrategy,

    #[serde(default)]
    pub actions: Vec<String>,
}

/// Work/break cadence in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakPlan {
    #[serde(default = "default_work_minutes")]
    pub work: u32,

    #[serde(rename = "break", default = "default_break_minutes")]
    pub break_minutes: u32,
}

fn default_work_minutes() -> u32 {
    50
}
fn default_break_minutes() -> u32 {
    10
}

impl Default for BreakPlan {
    fn default() -> Self {
        Self {
            work: default_work_minutes(),
            break_minutes: default_break_minutes(),
        }
    }
}

/// Parsed study advice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    #[serde(default)]
    pub study_principles: Vec<String>,

    /// Subject names in suggested daily order
    #[serde(default)]
    pub focus_order: Vec<String>,

    #[serde(default)]
    pub breaks: BreakPlan,

    #[serde(default)]
    pub daily_checklist: Vec<String>,

    /// Suggestions grounded in retrieved notes; empty without context
    #[serde(default)]
    pub rag_suggestions: Vec<String>,

    /// Snippet ids the advice cites; empty without context
    #[serde(default)]
    pub citations: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_overbooked: Option<OverbookedPlan>,
}

impl Advice {
    /// Enforce the response contract against what the plan actually holds.
    ///
    /// - `if_overbooked` only survives when the plan is overbooked
    /// - without retrieved snippets, suggestions and citations are cleared
    /// - citations must name a retrieved snippet id (brackets are stripped)
    pub fn normalized(mut self, overbooked: bool, contexts: &Contexts) -> Self {
        if !overbooked {
            self.if_overbooked = None;
        }

        let known: HashSet<&str> = contexts
            .values()
            .flatten()
            .map(|s| s.id.as_str())
            .collect();

        if known.is_empty() {
            self.rag_suggestions.clear();
            self.citations.clear();
            return self;
        }

        let mut seen = HashSet::new();
        self.citations = self
            .citations
            .into_iter()
            .map(|c| c.trim().trim_start_matches('[').trim_end_matches(']').to_string())
            .filter(|c| known.contains(c.as_str()) && seen.insert(c.clone()))
            .collect();
        self
    }
}

/// Advice that could not be parsed or violated the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MalformedAdvice {
    pub error: String,
    pub raw: String,
}

/// The tagged result of an advice call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdviceOutcome {
    Malformed(MalformedAdvice),
    Ready(Advice),
}

impl AdviceOutcome {
    /// Parse a model response. Never fails: bad input becomes `Malformed`.
    pub fn parse(raw: &str) -> Self {
        let body = strip_code_fence(raw);
        let value: serde_json::Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(e) => return Self::malformed(format!("Invalid JSON from advice model: {e}"), raw),
        };
        if !value.is_object() {
            return Self::malformed("Schema violation: expected a JSON object", raw);
        }
        match serde_json::from_value::<Advice>(value) {
            Ok(advice) => AdviceOutcome::Ready(advice),
            Err(e) => Self::malformed(format!("Schema violation: {e}"), raw),
        }
    }

    fn malformed(error: impl Into<String>, raw: &str) -> Self {
        AdviceOutcome::Malformed(MalformedAdvice {
            error: error.into(),
            raw: raw.to_string(),
        })
    }

    pub fn advice(&self) -> Option<&Advice> {
        match self {
            AdviceOutcome::Ready(a) => Some(a),
            AdviceOutcome::Malformed(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, AdviceOutcome::Ready(_))
    }
}

/// Strip a surrounding Markdown code fence (```json ... ```), if any.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // Drop the info string ("json") on the opening line.
    match rest.find('\n') {
        Some(nl) => rest[nl + 1..].trim(),
        None => rest.trim(),
    }
}

/// Everything the advice generator is shown.
#[derive(Debug, Clone, Copy)]
pub struct AdviceRequest<'a> {
    pub subjects: &'a [Subject],
    pub timetable: &'a Timetable,
    pub overbooked: bool,
    pub hours_gap: f64,
    pub contexts: &'a Contexts,
}

/// The core AdviceGenerator trait.
#[async_trait]
pub trait AdviceGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Produce advice for a plan.
    ///
    /// `Err` means the generator could not be reached or is misconfigured;
    /// an unusable payload is reported as `Ok(AdviceOutcome::Malformed)`.
    async fn generate(&self, request: AdviceRequest<'_>) -> std::result::Result<AdviceOutcome, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextSnippet;

    fn contexts_with(ids: &[&str]) -> Contexts {
        let mut contexts = Contexts::new();
        contexts.insert(
            "Physics".into(),
            ids.iter()
                .map(|id| ContextSnippet {
                    id: (*id).into(),
                    path: "Pasted".into(),
                    text: "F = ma".into(),
                })
                .collect(),
        );
        contexts
    }

    #[test]
    fn parses_full_payload() {
        let raw = r#"{
            "study_principles": ["Active recall", "Spaced repetition"],
            "focus_order": ["Math", "History"],
            "breaks": {"work": 45, "break": 15},
            "daily_checklist": ["Review flashcards"],
            "rag_suggestions": [],
            "citations": [],
            "if_overbooked": {"strategy": "hybrid", "actions": ["Add a day"]}
        }"#;
        let outcome = AdviceOutcome::parse(raw);
        let advice = outcome.advice().expect("should parse");
        assert_eq!(advice.focus_order, vec!["Math", "History"]);
        assert_eq!(advice.breaks.work, 45);
        assert_eq!(advice.breaks.break_minutes, 15);
        let plan = advice.if_overbooked.as_ref().unwrap();
        assert_eq!(plan.strategy, OverbookStrategy::Hybrid);
    }

    #[test]
    fn missing_fields_default() {
        let advice = AdviceOutcome::parse(r#"{"study_principles": ["Pomodoro"]}"#);
        let advice = advice.advice().unwrap();
        assert_eq!(advice.breaks, BreakPlan::default());
        assert!(advice.citations.is_empty());
        assert!(advice.if_overbooked.is_none());
    }

    #[test]
    fn non_json_is_malformed_not_error() {
        let outcome = AdviceOutcome::parse("Sure! Here are some tips...");
        match outcome {
            AdviceOutcome::Malformed(m) => {
                assert!(m.error.contains("Invalid JSON"));
                assert_eq!(m.raw, "Sure! Here are some tips...");
            }
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn schema_violations_are_malformed() {
        let bad_strategy = r#"{"if_overbooked": {"strategy": "panic", "actions": []}}"#;
        assert!(!AdviceOutcome::parse(bad_strategy).is_ready());

        let wrong_type = r#"{"study_principles": "just one"}"#;
        assert!(!AdviceOutcome::parse(wrong_type).is_ready());

        assert!(!AdviceOutcome::parse("[1, 2, 3]").is_ready());
    }

    #[test]
    fn code_fences_are_stripped() {
        let raw = "```json\n{\"focus_order\": [\"Chem\"]}\n```";
        let outcome = AdviceOutcome::parse(raw);
        assert_eq!(outcome.advice().unwrap().focus_order, vec!["Chem"]);
    }

    #[test]
    fn normalization_drops_overbooked_section_when_not_overbooked() {
        let advice = Advice {
            if_overbooked: Some(OverbookedPlan {
                strategy: OverbookStrategy::ExtendDays,
                actions: vec!["Add 2 days".into()],
            }),
            ..Advice::default()
        };
        let kept = advice.clone().normalized(true, &Contexts::new());
        assert!(kept.if_overbooked.is_some());
        let dropped = advice.normalized(false, &Contexts::new());
        assert!(dropped.if_overbooked.is_none());
    }

    #[test]
    fn normalization_clears_rag_fields_without_context() {
        let advice = Advice {
            rag_suggestions: vec!["Re-read notes".into()],
            citations: vec!["Pasted#1.1".into()],
            ..Advice::default()
        };
        let normalized = advice.normalized(false, &Contexts::new());
        assert!(normalized.rag_suggestions.is_empty());
        assert!(normalized.citations.is_empty());
    }

    #[test]
    fn normalization_keeps_only_known_citations() {
        let advice = Advice {
            rag_suggestions: vec!["Drill Newton's laws".into()],
            citations: vec![
                "[Pasted#1.1]".into(),
                "Pasted#9.9".into(),
                "Pasted#1.1".into(),
            ],
            ..Advice::default()
        };
        let normalized = advice.normalized(false, &contexts_with(&["Pasted#1.1", "Pasted#1.2"]));
        assert_eq!(normalized.citations, vec!["Pasted#1.1"]);
        assert_eq!(normalized.rag_suggestions.len(), 1);
    }

    #[test]
    fn outcome_serializes_untagged() {
        let malformed = AdviceOutcome::parse("oops");
        let json = serde_json::to_value(&malformed).unwrap();
        assert!(json.get("error").is_some());
        assert_eq!(json["raw"], "oops");

        let back: AdviceOutcome = serde_json::from_value(json).unwrap();
        assert!(matches!(back, AdviceOutcome::Malformed(_)));

        let ready = AdviceOutcome::Ready(Advice::default());
        let json = serde_json::to_value(&ready).unwrap();
        assert_eq!(json["breaks"]["break"], 10);
        assert!(json.get("if_overbooked").is_none());
    }
}
