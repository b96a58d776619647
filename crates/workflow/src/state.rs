//! Pipeline state and the patches stages produce.
//!
//! A [`PipelineState`] is never edited in place. Each stage returns a
//! [`StatePatch`] holding only the fields it derived, and
//! [`PipelineState::merge`] folds it into a new state. Fields a patch leaves
//! as `None` keep their previous value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use studyplan_core::advice::AdviceOutcome;
use studyplan_core::context::Contexts;
use studyplan_core::subject::{Subject, SubjectInput};
use studyplan_core::timetable::Timetable;

use crate::stage::Stage;

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanInputs {
    pub days_left: u32,
    pub hours_per_day: f64,
    #[serde(default)]
    pub subjects: Vec<SubjectInput>,
}

impl PlanInputs {
    pub fn new(days_left: u32, hours_per_day: f64, subjects: Vec<SubjectInput>) -> Self {
        Self {
            days_left,
            hours_per_day,
            subjects,
        }
    }

    /// Reject a horizon the allocator cannot work with.
    ///
    /// Subject fields are never rejected; they are normalized by the scorer.
    pub fn validate(&self) -> Result<(), String> {
        if self.days_left == 0 {
            return Err("days_left must be at least 1".into());
        }
        if !self.hours_per_day.is_finite() || self.hours_per_day <= 0.0 {
            return Err(format!(
                "hours_per_day must be a positive number, got {}",
                self.hours_per_day
            ));
        }
        Ok(())
    }
}

/// Everything known about one run so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub inputs: PlanInputs,

    /// The stage that runs next
    #[serde(default)]
    pub stage: Stage,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subjects_enriched: Option<Vec<Subject>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_required_hours: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timetable: Option<Timetable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_subject_allocation: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_available_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overbooked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_gap: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contexts: Option<Contexts>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tips: Option<AdviceOutcome>,
}

/// The fields one stage derived.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub subjects_enriched: Option<Vec<Subject>>,
    pub total_required_hours: Option<f64>,
    pub timetable: Option<Timetable>,
    pub per_subject_allocation: Option<BTreeMap<String, f64>>,
    pub total_available_hours: Option<f64>,
    pub overbooked: Option<bool>,
    pub hours_gap: Option<f64>,
    pub contexts: Option<Contexts>,
    pub tips: Option<AdviceOutcome>,
}

impl PipelineState {
    /// A fresh state, positioned at [`Stage::Score`].
    pub fn new(inputs: PlanInputs) -> Self {
        Self {
            inputs,
            stage: Stage::Score,
            subjects_enriched: None,
            total_required_hours: None,
            timetable: None,
            per_subject_allocation: None,
            total_available_hours: None,
            overbooked: None,
            hours_gap: None,
            contexts: None,
            tips: None,
        }
    }

    /// Fold `patch` into this state. Inputs and stage are untouched.
    pub fn merge(self, patch: StatePatch) -> Self {
        Self {
            inputs: self.inputs,
            stage: self.stage,
            subjects_enriched: patch.subjects_enriched.or(self.subjects_enriched),
            total_required_hours: patch.total_required_hours.or(self.total_required_hours),
            timetable: patch.timetable.or(self.timetable),
            per_subject_allocation: patch.per_subject_allocation.or(self.per_subject_allocation),
            total_available_hours: patch.total_available_hours.or(self.total_available_hours),
            overbooked: patch.overbooked.or(self.overbooked),
            hours_gap: patch.hours_gap.or(self.hours_gap),
            contexts: patch.contexts.or(self.contexts),
            tips: patch.tips.or(self.tips),
        }
    }

    /// The same state, positioned at `stage`.
    pub fn at(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn is_done(&self) -> bool {
        self.stage.is_done()
    }
}
