//! The exported plan report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use studyplan_core::advice::AdviceOutcome;
use studyplan_core::context::Contexts;
use studyplan_core::subject::Subject;
use studyplan_core::timetable::Timetable;

use crate::state::{PipelineState, PlanInputs};

/// A flattened, serializable view of a finished (or partially finished) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReport {
    pub inputs: PlanInputs,
    pub subjects_enriched: Vec<Subject>,
    pub timetable: Timetable,
    pub per_subject_allocation: BTreeMap<String, f64>,
    pub total_required_hours: f64,
    pub total_available_hours: f64,
    pub overbooked: bool,
    pub hours_gap: f64,
    pub contexts: Contexts,
    pub tips: Option<AdviceOutcome>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advice_error: Option<String>,
}

impl PlanReport {
    /// Flatten `state`. Stages that never ran leave empty or zero fields.
    pub fn from_state(state: &PipelineState) -> Self {
        Self {
            inputs: state.inputs.clone(),
            subjects_enriched: state.subjects_enriched.clone().unwrap_or_default(),
            timetable: state.timetable.clone().unwrap_or_default(),
            per_subject_allocation: state.per_subject_allocation.clone().unwrap_or_default(),
            total_required_hours: state.total_required_hours.unwrap_or_default(),
            total_available_hours: state.total_available_hours.unwrap_or_default(),
            overbooked: state.overbooked.unwrap_or_default(),
            hours_gap: state.hours_gap.unwrap_or_default(),
            contexts: state.contexts.clone().unwrap_or_default(),
            tips: state.tips.clone(),
            advice_error: None,
        }
    }

    /// Record why advice is missing.
    pub fn with_advice_error(mut self, error: impl Into<String>) -> Self {
        self.advice_error = Some(error.into());
        self
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl From<&PipelineState> for PlanReport {
    fn from(state: &PipelineState) -> Self {
        Self::from_state(state)
    }
}
