//! Timetable value objects produced by the time allocator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A slice of one day's study time given to one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Name of the subject this block belongs to
    pub subject: String,

    /// Hours, rounded to one decimal; never negative
    pub hours: f64,
}

/// One day of the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    /// 1-based day index
    pub day: u32,

    /// Blocks in the order they were allocated
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Day {
    pub fn new(day: u32) -> Self {
        Self { day, blocks: Vec::new() }
    }

    /// Sum of this day's block hours.
    pub fn total_hours(&self) -> f64 {
        self.blocks.iter().map(|b| b.hours).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// The ordered sequence of days; always exactly `days_left` entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timetable(pub Vec<Day>);

impl Timetable {
    pub fn days(&self) -> &[Day] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(day index, block)` pairs across the whole plan.
    pub fn blocks(&self) -> impl Iterator<Item = (u32, &Block)> {
        self.0
            .iter()
            .flat_map(|d| d.blocks.iter().map(move |b| (d.day, b)))
    }

    /// Sum of all block hours.
    pub fn total_hours(&self) -> f64 {
        self.0.iter().map(Day::total_hours).sum()
    }

    /// Block hours summed per subject name.
    pub fn hours_by_subject(&self) -> BTreeMap<String, f64> {
        let mut totals = BTreeMap::new();
        for (_, block) in self.blocks() {
            *totals.entry(block.subject.clone()).or_insert(0.0) += block.hours;
        }
        totals
    }
}

/// Output of one allocation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub timetable: Timetable,

    /// Hours actually given to each subject over the whole plan (1 decimal)
    pub per_subject_allocation: BTreeMap<String, f64>,

    /// `days_left × hours_per_day` (1 decimal)
    pub total_available_hours: f64,
}
