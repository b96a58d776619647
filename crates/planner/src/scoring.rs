//! Priority scoring.
//!
//! Every subject gets `score = difficulty × urgency`, where urgency rises
//! linearly from 1.0 (two weeks or more out) to 2.0 (exam tomorrow or today).
//! Weights are the scores normalized to sum to one.

use studyplan_core::subject::{Subject, SubjectInput};
use tracing::debug;

use crate::rounding::{round_hours, round_to};

/// Days beyond which urgency stops mattering.
pub const URGENCY_HORIZON_DAYS: f64 = 14.0;

/// Hours per difficulty point when no explicit target is given.
pub const HOURS_PER_DIFFICULTY: f64 = 4.0;

/// Weights are reported in units of 1/10_000.
const WEIGHT_UNITS: f64 = 10_000.0;

/// `1 + max(0, 14 - days_left) / 14`, always in `[1.0, 2.0]`.
pub fn urgency(days_left: u32) -> f64 {
    1.0 + (URGENCY_HORIZON_DAYS - days_left as f64).max(0.0) / URGENCY_HORIZON_DAYS
}

/// The scorer's output.
#[derive(Debug, Clone, PartialEq)]
pub struct Priorities {
    /// One enriched subject per input, in input order
    pub subjects: Vec<Subject>,

    /// Sum of `required_hours` (1 decimal)
    pub total_required_hours: f64,
}

/// Turns raw subject inputs into weighted subjects.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityScorer;

impl PriorityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score `inputs` for an exam `days_left` days away.
    ///
    /// Never fails. Blank names become "Untitled", difficulty is clamped to
    /// 1..=5 and a missing or non-positive target falls back to
    /// `difficulty × 4` hours. Duplicate names are kept as separate entries.
    pub fn score(&self, inputs: &[SubjectInput], days_left: u32) -> Priorities {
        let urgency = urgency(days_left);

        let mut subjects: Vec<Subject> = inputs
            .iter()
            .map(|input| {
                let difficulty = input.clamped_difficulty();
                let required = input
                    .explicit_target()
                    .unwrap_or(difficulty as f64 * HOURS_PER_DIFFICULTY);
                Subject {
                    name: input.display_name(),
                    difficulty,
                    required_hours: round_hours(required),
                    score: round_to(difficulty as f64 * urgency, 3),
                    weight: 0.0,
                }
            })
            .collect();

        let scores: Vec<f64> = subjects.iter().map(|s| s.score).collect();
        for (subject, weight) in subjects.iter_mut().zip(normalize_weights(&scores)) {
            subject.weight = weight;
        }

        let total_required_hours = round_hours(subjects.iter().map(|s| s.required_hours).sum());

        debug!(
            subjects = subjects.len(),
            days_left,
            urgency,
            total_required_hours,
            "Scored subjects"
        );

        Priorities {
            subjects,
            total_required_hours,
        }
    }
}

/// Normalize scores to 4-decimal weights that still sum to one.
///
/// Each weight is rounded to the nearest 1/10_000. Whatever drift rounding
/// leaves is repaid one unit at a time, starting with the weights rounding
/// moved furthest, so no weight ends up more than one unit from its exact
/// share. A zero total leaves every weight at zero.
fn normalize_weights(scores: &[f64]) -> Vec<f64> {
    let total: f64 = scores.iter().sum();
    let denominator = if total > 0.0 { total } else { 1.0 };

    let exact: Vec<f64> = scores
        .iter()
        .map(|s| s / denominator * WEIGHT_UNITS)
        .collect();
    let mut units: Vec<i64> = exact.iter().map(|e| e.round() as i64).collect();

    if total > 0.0 {
        let drift = WEIGHT_UNITS as i64 - units.iter().sum::<i64>();
        if drift != 0 {
            // Residual > 0: rounded down; < 0: rounded up. The sort is stable,
            // so ties go to the earlier subject.
            let mut order: Vec<usize> = (0..units.len()).collect();
            let residual = |i: usize| exact[i] - units[i] as f64;
            if drift > 0 {
                order.sort_by(|&a, &b| residual(b).total_cmp(&residual(a)));
            } else {
                order.sort_by(|&a, &b| residual(a).total_cmp(&residual(b)));
            }
            let step = drift.signum();
            for &i in order.iter().cycle().take(drift.unsigned_abs() as usize) {
                units[i] += step;
            }
        }
    }

    units.into_iter().map(|u| u as f64 / WEIGHT_UNITS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn urgency_bounds() {
        assert!(approx(urgency(0), 2.0));
        assert!(approx(urgency(7), 1.5));
        assert!(approx(urgency(14), 1.0));
        assert!(approx(urgency(60), 1.0));
    }

    #[test]
    fn three_subjects_one_week_out() {
        let inputs = vec![
            SubjectInput::new("Math", 5),
            SubjectInput::new("History", 2),
            SubjectInput::new("Chemistry", 3).with_target_hours(6.5),
        ];
        let scored = PriorityScorer::new().score(&inputs, 7);

        let math = &scored.subjects[0];
        assert_eq!(math.required_hours, 20.0);
        assert!(approx(math.score, 7.5));
        assert!(approx(math.weight, 0.5));

        let history = &scored.subjects[1];
        assert_eq!(history.required_hours, 8.0);
        assert!(approx(history.score, 3.0));
        assert!(approx(history.weight, 0.2));

        let chem = &scored.subjects[2];
        assert_eq!(chem.required_hours, 6.5);
        assert!(approx(chem.score, 4.5));
        assert!(approx(chem.weight, 0.3));

        assert!(approx(scored.total_required_hours, 34.5));
    }

    #[test]
    fn short_deadline_raises_scores() {
        let inputs = vec![SubjectInput::new("Math", 5), SubjectInput::new("History", 2)];
        let scored = PriorityScorer::new().score(&inputs, 3);

        assert!(approx(scored.subjects[0].score, 8.929));
        assert!(approx(scored.subjects[1].score, 3.571));
        assert!(approx(scored.subjects[0].weight, 0.7143));
        assert!(approx(scored.subjects[1].weight, 0.2857));
        assert!(approx(scored.total_required_hours, 28.0));
    }

    #[test]
    fn blank_and_out_of_range_inputs_are_normalized() {
        let inputs = vec![
            SubjectInput::new("", 9),
            SubjectInput::new("  Bio  ", -1).with_target_hours(-3.0),
        ];
        let scored = PriorityScorer::new().score(&inputs, 20);

        assert_eq!(scored.subjects[0].name, "Untitled");
        assert_eq!(scored.subjects[0].difficulty, 5);
        assert_eq!(scored.subjects[0].required_hours, 20.0);

        assert_eq!(scored.subjects[1].name, "Bio");
        assert_eq!(scored.subjects[1].difficulty, 1);
        assert_eq!(scored.subjects[1].required_hours, 4.0);
    }

    #[test]
    fn empty_input_scores_nothing() {
        let scored = PriorityScorer::new().score(&[], 5);
        assert!(scored.subjects.is_empty());
        assert_eq!(scored.total_required_hours, 0.0);
    }

    #[test]
    fn duplicate_names_stay_separate() {
        let inputs = vec![SubjectInput::new("Math", 4), SubjectInput::new("Math", 4)];
        let scored = PriorityScorer::new().score(&inputs, 10);
        assert_eq!(scored.subjects.len(), 2);
        assert!(approx(scored.subjects[0].weight, 0.5));
        assert!(approx(scored.total_required_hours, 32.0));
    }

    #[test]
    fn equal_thirds_still_sum_to_one() {
        let inputs = vec![
            SubjectInput::new("A", 3),
            SubjectInput::new("B", 3),
            SubjectInput::new("C", 3),
        ];
        let scored = PriorityScorer::new().score(&inputs, 14);
        let weights: Vec<f64> = scored.subjects.iter().map(|s| s.weight).collect();
        assert!(approx(weights[0], 0.3334));
        assert!(approx(weights[1], 0.3333));
        assert!(approx(weights[2], 0.3333));
        assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn weight_drift_is_repaid_for_many_subjects() {
        let weights = normalize_weights(&[1.0; 7]);
        let total: f64 = weights.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        for w in weights {
            assert!((w - 1.0 / 7.0).abs() <= 1e-4 + 1e-12);
        }
    }
}
