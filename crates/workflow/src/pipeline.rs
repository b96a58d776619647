//! The plan pipeline.
//!
//! ```text
//! Score ─▶ Allocate ─▶ RetrieveContext ─▶ GenerateAdvice ─▶ Done
//! ```
//!
//! Scoring and allocation are pure. Retrieval and advice call the injected
//! [`ContextStore`] and [`AdviceGenerator`]; when either fails, the error
//! carries the state reached so far so a caller can still show the plan.

use std::collections::BTreeMap;
use std::sync::Arc;

use studyplan_config::AppConfig;
use studyplan_core::advice::{AdviceGenerator, AdviceOutcome, AdviceRequest};
use studyplan_core::context::{ContextSnippet, ContextStore, Contexts};
use studyplan_core::error::{ContextError, ProviderError};
use studyplan_planner::{PriorityScorer, TimeAllocator, round_hours};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::stage::Stage;
use crate::state::{PipelineState, PlanInputs, StatePatch};

/// Snippets retrieved per subject unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 4;

/// Appended to the subject name to form each retrieval query.
pub const DEFAULT_QUERY_SUFFIX: &str = "key formulas concepts summaries";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Stage '{stage}' needs '{missing}', which no earlier stage produced")]
    Incomplete { stage: Stage, missing: &'static str },

    #[error("Context retrieval failed: {source}")]
    Context {
        #[source]
        source: ContextError,
        partial: Box<PipelineState>,
    },

    #[error("Advice generation failed: {source}")]
    Advice {
        #[source]
        source: ProviderError,
        partial: Box<PipelineState>,
    },
}

impl PipelineError {
    /// The state reached before a collaborator failed, if any.
    pub fn partial_state(&self) -> Option<&PipelineState> {
        match self {
            PipelineError::Context { partial, .. } | PipelineError::Advice { partial, .. } => {
                Some(partial)
            }
            _ => None,
        }
    }

    pub fn into_partial_state(self) -> Option<PipelineState> {
        match self {
            PipelineError::Context { partial, .. } | PipelineError::Advice { partial, .. } => {
                Some(*partial)
            }
            _ => None,
        }
    }
}

/// Runs the four planning stages.
pub struct Pipeline {
    scorer: PriorityScorer,
    allocator: TimeAllocator,
    context_store: Arc<dyn ContextStore>,
    advisor: Arc<dyn AdviceGenerator>,
    top_k: usize,
    query_suffix: String,
}

impl Pipeline {
    pub fn new(context_store: Arc<dyn ContextStore>, advisor: Arc<dyn AdviceGenerator>) -> Self {
        Self {
            scorer: PriorityScorer::new(),
            allocator: TimeAllocator::new(),
            context_store,
            advisor,
            top_k: DEFAULT_TOP_K,
            query_suffix: DEFAULT_QUERY_SUFFIX.into(),
        }
    }

    /// Apply the `[planner]` and `[context]` settings.
    pub fn with_config(self, config: &AppConfig) -> Self {
        self.with_allocator(TimeAllocator::with_epsilon(config.planner.epsilon))
            .with_top_k(config.context.top_k)
            .with_query_suffix(&config.context.query_suffix)
    }

    pub fn with_allocator(mut self, allocator: TimeAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k.max(1);
        self
    }

    pub fn with_query_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.query_suffix = suffix.into();
        self
    }

    /// Run every stage from the start.
    pub async fn run(&self, inputs: PlanInputs) -> Result<PipelineState, PipelineError> {
        self.run_with(inputs, |_| {}).await
    }

    /// Run every stage, handing each intermediate state to `observe`.
    pub async fn run_with<F>(&self, inputs: PlanInputs, mut observe: F) -> Result<PipelineState, PipelineError>
    where
        F: FnMut(&PipelineState),
    {
        let mut state = PipelineState::new(inputs);
        while !state.is_done() {
            state = self.advance(state).await?;
            observe(&state);
        }
        Ok(state)
    }

    /// Run the stage `state` is positioned at and move to the next one.
    ///
    /// A state already at `Done` comes back unchanged.
    pub async fn advance(&self, state: PipelineState) -> Result<PipelineState, PipelineError> {
        let stage = state.stage;
        let patch = match stage {
            Stage::Score => self.score(&state)?,
            Stage::Allocate => self.allocate(&state)?,
            Stage::RetrieveContext => {
                let retrieved = self.retrieve(&state).await;
                match retrieved {
                    Ok(patch) => patch,
                    Err(source) => {
                        warn!(error = %source, "Context retrieval failed");
                        return Err(PipelineError::Context {
                            source,
                            partial: Box::new(state),
                        });
                    }
                }
            }
            Stage::GenerateAdvice => {
                let generated = self.generate_advice(&state).await;
                match generated {
                    Ok(patch) => patch,
                    Err(AdviceFailure::Missing(missing)) => {
                        return Err(PipelineError::Incomplete { stage, missing });
                    }
                    Err(AdviceFailure::Provider(source)) => {
                        warn!(error = %source, advisor = %self.advisor.name(), "Advice generation failed");
                        return Err(PipelineError::Advice {
                            source,
                            partial: Box::new(state),
                        });
                    }
                }
            }
            Stage::Done => return Ok(state),
        };

        Ok(state.merge(patch).at(stage.next()))
    }

    fn score(&self, state: &PipelineState) -> Result<StatePatch, PipelineError> {
        let inputs = &state.inputs;
        inputs.validate().map_err(PipelineError::InvalidInput)?;
        info!(
            subjects = inputs.subjects.len(),
            days_left = inputs.days_left,
            "Scoring subjects"
        );

        let scored = self.scorer.score(&inputs.subjects, inputs.days_left);
        Ok(StatePatch {
            subjects_enriched: Some(scored.subjects),
            total_required_hours: Some(scored.total_required_hours),
            ..StatePatch::default()
        })
    }

    fn allocate(&self, state: &PipelineState) -> Result<StatePatch, PipelineError> {
        let missing = |missing| PipelineError::Incomplete {
            stage: Stage::Allocate,
            missing,
        };
        let subjects = state
            .subjects_enriched
            .as_ref()
            .ok_or_else(|| missing("subjects_enriched"))?;
        let total_required = state
            .total_required_hours
            .ok_or_else(|| missing("total_required_hours"))?;
        let inputs = &state.inputs;
        inputs.validate().map_err(PipelineError::InvalidInput)?;

        let result = self
            .allocator
            .allocate(subjects, inputs.days_left, inputs.hours_per_day);
        let overbooked = result.total_available_hours < total_required;
        let hours_gap = round_hours(total_required - result.total_available_hours);

        info!(
            required = total_required,
            available = result.total_available_hours,
            overbooked,
            hours_gap,
            "Allocated timetable"
        );

        Ok(StatePatch {
            timetable: Some(result.timetable),
            per_subject_allocation: Some(result.per_subject_allocation),
            total_available_hours: Some(result.total_available_hours),
            overbooked: Some(overbooked),
            hours_gap: Some(hours_gap),
            ..StatePatch::default()
        })
    }

    async fn retrieve(&self, state: &PipelineState) -> Result<StatePatch, ContextError> {
        let subjects = state.subjects_enriched.as_deref().unwrap_or_default();
        let mut contexts: Contexts = BTreeMap::new();

        for subject in subjects {
            if contexts.contains_key(&subject.name) {
                continue;
            }
            let query = format!("{} {}", subject.name, self.query_suffix);
            let hits = self.context_store.search(&query, self.top_k).await?;
            debug!(subject = %subject.name, hits = hits.len(), "Retrieved context");
            contexts.insert(
                subject.name.clone(),
                hits.into_iter().map(ContextSnippet::from).collect(),
            );
        }

        let snippets: usize = contexts.values().map(Vec::len).sum();
        info!(
            store = %self.context_store.name(),
            subjects = contexts.len(),
            snippets,
            "Retrieved note context"
        );

        Ok(StatePatch {
            contexts: Some(contexts),
            ..StatePatch::default()
        })
    }

    async fn generate_advice(&self, state: &PipelineState) -> Result<StatePatch, AdviceFailure> {
        let subjects = state
            .subjects_enriched
            .as_deref()
            .ok_or(AdviceFailure::Missing("subjects_enriched"))?;
        let timetable = state
            .timetable
            .as_ref()
            .ok_or(AdviceFailure::Missing("timetable"))?;
        let overbooked = state.overbooked.ok_or(AdviceFailure::Missing("overbooked"))?;
        let hours_gap = state.hours_gap.ok_or(AdviceFailure::Missing("hours_gap"))?;
        let empty = Contexts::new();
        let contexts = state.contexts.as_ref().unwrap_or(&empty);

        info!(advisor = %self.advisor.name(), overbooked, "Generating advice");

        let outcome = self
            .advisor
            .generate(AdviceRequest {
                subjects,
                timetable,
                overbooked,
                hours_gap,
                contexts,
            })
            .await
            .map_err(AdviceFailure::Provider)?;

        let tips = match outcome {
            AdviceOutcome::Ready(advice) => {
                AdviceOutcome::Ready(advice.normalized(overbooked, contexts))
            }
            malformed @ AdviceOutcome::Malformed(_) => malformed,
        };

        Ok(StatePatch {
            tips: Some(tips),
            ..StatePatch::default()
        })
    }
}

enum AdviceFailure {
    Missing(&'static str),
    Provider(ProviderError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use studyplan_core::advice::{Advice, MalformedAdvice, OverbookStrategy, OverbookedPlan};
    use studyplan_core::context::{ContextHit, IndexStats};
    use studyplan_core::subject::SubjectInput;

    /// Returns one fixed hit for every query and records the queries.
    #[derive(Default)]
    struct FixedStore {
        queries: Mutex<Vec<(String, usize)>>,
        fail: bool,
    }

    #[async_trait]
    impl ContextStore for FixedStore {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn search(&self, query: &str, k: usize) -> Result<Vec<ContextHit>, ContextError> {
            if self.fail {
                return Err(ContextError::EmbeddingFailed("endpoint down".into()));
            }
            self.queries.lock().unwrap().push((query.to_string(), k));
            let subject = query.split_whitespace().next().unwrap_or_default();
            Ok(vec![ContextHit {
                id: format!("Pasted#{subject}"),
                path: "Pasted".into(),
                text: format!("{subject} notes"),
                score: 0.9,
            }])
        }

        async fn build(&self, _snippets: &[String]) -> Result<IndexStats, ContextError> {
            Ok(IndexStats::default())
        }

        async fn len(&self) -> usize {
            1
        }
    }

    /// Always returns nothing.
    struct EmptyStore;

    #[async_trait]
    impl ContextStore for EmptyStore {
        fn name(&self) -> &str {
            "empty"
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

    enum Reply {
        Advice(Advice),
        Malformed,
        Unreachable,
    }

    struct ScriptedAdvisor {
        reply: Reply,
    }

    #[async_trait]
    impl AdviceGenerator for ScriptedAdvisor {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, request: AdviceRequest<'_>) -> Result<AdviceOutcome, ProviderError> {
            match &self.reply {
                Reply::Advice(advice) => {
                    let mut advice = advice.clone();
                    advice.focus_order = request.subjects.iter().map(|s| s.name.clone()).collect();
                    Ok(AdviceOutcome::Ready(advice))
                }
                Reply::Malformed => Ok(AdviceOutcome::Malformed(MalformedAdvice {
                    error: "Invalid JSON from advice model".into(),
                    raw: "Sure! Here you go".into(),
                })),
                Reply::Unreachable => Err(ProviderError::Network("connection refused".into())),
            }
        }
    }

    fn overbooked_advice() -> Advice {
        Advice {
            study_principles: vec!["Pomodoro".into(), "Active recall".into()],
            citations: vec!["Pasted#Math".into(), "Pasted#Nope".into()],
            rag_suggestions: vec!["Drill the formulas".into()],
            if_overbooked: Some(OverbookedPlan {
                strategy: OverbookStrategy::ExtendDays,
                actions: vec!["Add 2 days".into()],
            }),
            ..Advice::default()
        }
    }

    fn pipeline(store: Arc<dyn ContextStore>, reply: Reply) -> Pipeline {
        Pipeline::new(store, Arc::new(ScriptedAdvisor { reply }))
    }

    fn cram_inputs() -> PlanInputs {
        PlanInputs::new(
            3,
            3.0,
            vec![SubjectInput::new("Math", 5), SubjectInput::new("History", 2)],
        )
    }

    #[tokio::test]
    async fn full_run_reaches_done() {
        let store = Arc::new(FixedStore::default());
        let pipeline = pipeline(store.clone(), Reply::Advice(overbooked_advice()));

        let state = pipeline.run(cram_inputs()).await.unwrap();
        assert!(state.is_done());
        assert_eq!(state.total_required_hours, Some(28.0));
        assert_eq!(state.total_available_hours, Some(9.0));
        assert_eq!(state.overbooked, Some(true));
        assert_eq!(state.hours_gap, Some(19.0));
        assert_eq!(state.timetable.as_ref().unwrap().len(), 3);

        let contexts = state.contexts.as_ref().unwrap();
        assert_eq!(contexts["Math"][0].id, "Pasted#Math");

        let queries = store.queries.lock().unwrap().clone();
        assert_eq!(
            queries,
            vec![
                ("Math key formulas concepts summaries".to_string(), 4),
                ("History key formulas concepts summaries".to_string(), 4),
            ]
        );

        let advice = state.tips.as_ref().unwrap().advice().unwrap();
        assert_eq!(advice.focus_order, vec!["Math", "History"]);
        assert_eq!(advice.citations, vec!["Pasted#Math"]);
        assert!(advice.if_overbooked.is_some());
    }

    #[tokio::test]
    async fn input_subjects_are_untouched() {
        let inputs = PlanInputs::new(
            10,
            2.0,
            vec![SubjectInput::new("  b ", 9), SubjectInput::new("a", 1)],
        );
        let pipeline = pipeline(Arc::new(EmptyStore), Reply::Advice(Advice::default()));
        let state = pipeline.run(inputs.clone()).await.unwrap();
        assert_eq!(state.inputs, inputs);
        assert_eq!(state.subjects_enriched.unwrap()[0].name, "b");
    }

    #[tokio::test]
    async fn missing_index_yields_empty_snippets_and_no_citations() {
        let pipeline = pipeline(Arc::new(EmptyStore), Reply::Advice(overbooked_advice()));
        let state = pipeline.run(cram_inputs()).await.unwrap();

        let contexts = state.contexts.unwrap();
        assert_eq!(contexts.len(), 2);
        assert!(contexts.values().all(Vec::is_empty));

        let advice = state.tips.unwrap();
        let advice = advice.advice().unwrap();
        assert!(advice.citations.is_empty());
        assert!(advice.rag_suggestions.is_empty());
    }

    #[tokio::test]
    async fn surplus_plan_drops_overbooked_section() {
        let inputs = PlanInputs::new(14, 4.0, vec![SubjectInput::new("Bio", 2)]);
        let pipeline = pipeline(Arc::new(EmptyStore), Reply::Advice(overbooked_advice()));
        let state = pipeline.run(inputs).await.unwrap();

        assert_eq!(state.overbooked, Some(false));
        assert_eq!(state.hours_gap, Some(-48.0));
        assert!(state.tips.unwrap().advice().unwrap().if_overbooked.is_none());
    }

    #[tokio::test]
    async fn malformed_advice_still_completes() {
        let pipeline = pipeline(Arc::new(EmptyStore), Reply::Malformed);
        let state = pipeline.run(cram_inputs()).await.unwrap();
        assert!(state.is_done());
        match state.tips.unwrap() {
            AdviceOutcome::Malformed(m) => assert_eq!(m.raw, "Sure! Here you go"),
            other => panic!("expected malformed advice, got {other:?}"),
        }
        assert!(state.timetable.is_some());
    }

    #[tokio::test]
    async fn unreachable_advisor_keeps_the_plan() {
        let pipeline = pipeline(Arc::new(EmptyStore), Reply::Unreachable);
        let err = pipeline.run(cram_inputs()).await.unwrap_err();

        assert!(matches!(err, PipelineError::Advice { .. }));
        let partial = err.into_partial_state().unwrap();
        assert_eq!(partial.stage, Stage::GenerateAdvice);
        assert_eq!(partial.hours_gap, Some(19.0));
        assert!(partial.contexts.is_some());
        assert!(partial.tips.is_none());
    }

    #[tokio::test]
    async fn retrieval_failure_keeps_the_plan() {
        let store = Arc::new(FixedStore {
            fail: true,
            ..FixedStore::default()
        });
        let pipeline = pipeline(store, Reply::Advice(Advice::default()));
        let err = pipeline.run(cram_inputs()).await.unwrap_err();

        let partial = err.partial_state().unwrap();
        assert_eq!(partial.stage, Stage::RetrieveContext);
        assert!(partial.timetable.is_some());
        assert!(partial.contexts.is_none());
    }

    #[tokio::test]
    async fn invalid_horizon_is_rejected_before_scoring() {
        let pipeline = pipeline(Arc::new(EmptyStore), Reply::Advice(Advice::default()));
        let err = pipeline
            .run(PlanInputs::new(0, 4.0, vec![SubjectInput::new("Math", 3)]))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
        assert!(err.partial_state().is_none());
    }

    #[tokio::test]
    async fn stages_can_be_stepped() {
        let pipeline = pipeline(Arc::new(EmptyStore), Reply::Advice(Advice::default()));
        let state = PipelineState::new(cram_inputs());

        let scored = pipeline.advance(state).await.unwrap();
        assert_eq!(scored.stage, Stage::Allocate);
        assert!(scored.subjects_enriched.is_some());
        assert!(scored.timetable.is_none());

        let allocated = pipeline.advance(scored).await.unwrap();
        assert_eq!(allocated.stage, Stage::RetrieveContext);
        assert!(allocated.timetable.is_some());

        let mut stages = Vec::new();
        let done = pipeline
            .run_with(cram_inputs(), |s| stages.push(s.stage))
            .await
            .unwrap();
        assert_eq!(
            stages,
            vec![
                Stage::Allocate,
                Stage::RetrieveContext,
                Stage::GenerateAdvice,
                Stage::Done
            ]
        );

        let again = pipeline.advance(done.clone()).await.unwrap();
        assert_eq!(again, done);
    }

    #[tokio::test]
    async fn skipping_a_stage_is_reported() {
        let pipeline = pipeline(Arc::new(EmptyStore), Reply::Advice(Advice::default()));
        let state = PipelineState::new(cram_inputs()).at(Stage::Allocate);
        let err = pipeline.advance(state).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Incomplete {
                stage: Stage::Allocate,
                missing: "subjects_enriched"
            }
        ));
    }

    #[tokio::test]
    async fn identical_inputs_give_identical_states() {
        let pipeline = pipeline(Arc::new(FixedStore::default()), Reply::Advice(Advice::default()));
        let first = pipeline.run(cram_inputs()).await.unwrap();
        let second = pipeline.run(cram_inputs()).await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn config_tunes_retrieval() {
        let mut config = AppConfig::default();
        config.context.top_k = 2;
        config.context.query_suffix = "exam tips".into();
        let pipeline = pipeline(Arc::new(EmptyStore), Reply::Malformed).with_config(&config);
        assert_eq!(pipeline.top_k, 2);
        assert_eq!(pipeline.query_suffix, "exam tips");
        assert_eq!(pipeline.allocator.epsilon(), config.planner.epsilon);
    }
}
