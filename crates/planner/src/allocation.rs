//! Weighted multi-pass water-filling.
//!
//! Each day starts with `hours_per_day` to hand out. A pass splits what is
//! left of the day among the subjects that still need time, in proportion to
//! their weight, capping every subject at its remaining need. Whatever a
//! capped subject could not absorb flows to the others on the next pass. The
//! day ends when its hours are gone, every subject is satisfied, or a pass
//! makes no progress.
//!
//! Blocks are recorded in tenths of an hour and subjects are charged exactly
//! what their blocks show, so the timetable, the per-subject totals and the
//! remaining needs always agree. A block never pushes a day past
//! `hours_per_day` (the whole tenths of it) or the plan past
//! `total_available_hours`.

use std::collections::BTreeMap;

use studyplan_core::subject::Subject;
use studyplan_core::timetable::{AllocationResult, Block, Day, Timetable};
use tracing::{debug, warn};

use crate::rounding::{floor_hours, round_hours};

/// Tolerance below which an amount of hours counts as zero.
pub const DEFAULT_EPSILON: f64 = 1e-4;

/// A subject's running state during allocation.
struct Slot<'a> {
    name: &'a str,
    weight: f64,
    required: f64,
    remaining: f64,
}

/// Spreads study hours over days in proportion to subject weight.
#[derive(Debug, Clone, Copy)]
pub struct TimeAllocator {
    epsilon: f64,
}

impl Default for TimeAllocator {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl TimeAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different zero tolerance. Non-positive or non-finite values
    /// fall back to [`DEFAULT_EPSILON`].
    pub fn with_epsilon(epsilon: f64) -> Self {
        let epsilon = if epsilon.is_finite() && epsilon > 0.0 {
            epsilon
        } else {
            DEFAULT_EPSILON
        };
        Self { epsilon }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Build a timetable of exactly `days_left` days.
    ///
    /// Subjects are keyed by name; when a name repeats, the last definition
    /// wins and keeps the position of the first. Callers are expected to pass
    /// `days_left >= 1` and a positive, finite `hours_per_day`; anything else
    /// yields empty days.
    pub fn allocate(&self, subjects: &[Subject], days_left: u32, hours_per_day: f64) -> AllocationResult {
        let eps = self.epsilon;
        let mut slots = build_slots(subjects);

        let total_available_hours = round_hours(days_left as f64 * hours_per_day);
        let day_cap = floor_hours(hours_per_day);
        let mut plan_recorded = 0.0;
        let mut days = Vec::with_capacity(days_left as usize);

        for day_index in 1..=days_left {
            let mut day = Day::new(day_index);
            let mut day_recorded = 0.0;
            let mut day_hours = hours_per_day;
            let mut passes = 0u32;

            while day_hours > eps {
                let active: Vec<usize> = slots
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.remaining > eps)
                    .map(|(i, _)| i)
                    .collect();
                if active.is_empty() {
                    break;
                }

                let weight_sum: f64 = active.iter().map(|&i| slots[i].weight).sum();
                let total_weight = if weight_sum == 0.0 { 1.0 } else { weight_sum };

                passes += 1;
                let mut progressed = false;
                for &i in &active {
                    let slot = &mut slots[i];
                    let give = (slot.weight / total_weight * day_hours).min(slot.remaining);
                    if give <= eps {
                        continue;
                    }

                    let budget = (day_cap - day_recorded).min(total_available_hours - plan_recorded);
                    let hours = round_hours(give)
                        .min(round_hours(slot.remaining))
                        .min(round_hours(budget));
                    if hours <= 0.0 {
                        continue;
                    }

                    day.blocks.push(Block {
                        subject: slot.name.to_string(),
                        hours,
                    });
                    slot.remaining -= hours;
                    day_recorded += hours;
                    plan_recorded += hours;
                    progressed = true;
                }

                if !progressed {
                    break;
                }

                day_hours = round_hours(day_cap - day_recorded).max(0.0);
            }

            debug!(
                day = day_index,
                blocks = day.blocks.len(),
                hours = day_recorded,
                passes,
                "Allocated day"
            );
            days.push(day);
        }

        let per_subject_allocation: BTreeMap<String, f64> = slots
            .iter()
            .map(|s| (s.name.to_string(), round_hours(s.required - s.remaining)))
            .collect();

        AllocationResult {
            timetable: Timetable(days),
            per_subject_allocation,
            total_available_hours,
        }
    }
}

fn build_slots(subjects: &[Subject]) -> Vec<Slot<'_>> {
    let mut slots: Vec<Slot<'_>> = Vec::with_capacity(subjects.len());
    for subject in subjects {
        let slot = Slot {
            name: subject.name.as_str(),
            weight: subject.weight.max(0.0),
            required: subject.required_hours.max(0.0),
            remaining: subject.required_hours.max(0.0),
        };
        match slots.iter_mut().find(|s| s.name == slot.name) {
            Some(existing) => {
                warn!(subject = %subject.name, "Duplicate subject name, keeping the last definition");
                *existing = slot;
            }
            None => slots.push(slot),
        }
    }
    slots
}
