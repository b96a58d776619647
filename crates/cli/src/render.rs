//! Plain-text rendering of a plan report.

use studyplan_core::advice::{Advice, AdviceOutcome};
use studyplan_workflow::PlanReport;

/// The full terminal view of `report`.
pub fn plan(report: &PlanReport) -> String {
    let mut lines = Vec::new();

    lines.push("📚 Study Plan".to_string());
    lines.push("=============".to_string());
    lines.push(format!(
        "  Required: {:.1}h   Available: {:.1}h   Gap (req - avail): {:+.1}h",
        report.total_required_hours, report.total_available_hours, report.hours_gap
    ));
    if report.overbooked {
        lines.push("  ⚠️  Overbooked: the plan cannot cover every subject".to_string());
    }
    lines.push(String::new());

    lines.push("Subjects & Priorities".to_string());
    lines.push(format!(
        "  {:<24} {:>10} {:>9} {:>7} {:>7}",
        "Subject", "Difficulty", "Required", "Score", "Weight"
    ));
    for s in &report.subjects_enriched {
        lines.push(format!(
            "  {:<24} {:>10} {:>8.1}h {:>7.3} {:>7.4}",
            s.name, s.difficulty, s.required_hours, s.score, s.weight
        ));
    }
    lines.push(String::new());

    lines.push("Timetable".to_string());
    if report.timetable.blocks().next().is_none() {
        lines.push("  No time allocated yet; try more hours per day or more days".to_string());
    } else {
        lines.push(format!("  {:>4}  {:<24} {:>6}", "Day", "Subject", "Hours"));
        for (day, block) in report.timetable.blocks() {
            lines.push(format!("  {:>4}  {:<24} {:>5.1}h", day, block.subject, block.hours));
        }
        lines.push(String::new());
        lines.push("Hours per subject".to_string());
        for (subject, hours) in &report.per_subject_allocation {
            lines.push(format!("  {subject:<24} {hours:>5.1}h"));
        }
    }
    lines.push(String::new());

    lines.push("Study Tips & Checklist".to_string());
    match &report.tips {
        Some(AdviceOutcome::Ready(advice)) => tips(advice, &mut lines),
        Some(AdviceOutcome::Malformed(m)) => {
            lines.push(format!("  ⚠️  Tips could not be read: {}", m.error));
        }
        None => match &report.advice_error {
            Some(error) => lines.push(format!("  ❌ Tips unavailable: {error}")),
            None => lines.push("  No tips returned.".to_string()),
        },
    }

    lines.push(String::new());
    lines.join("\n")
}

fn tips(advice: &Advice, lines: &mut Vec<String>) {
    if !advice.study_principles.is_empty() {
        lines.push(format!("  Principles: {}", advice.study_principles.join(", ")));
    }
    if !advice.focus_order.is_empty() {
        lines.push(format!("  Daily focus order: {}", advice.focus_order.join(" → ")));
    }
    lines.push(format!(
        "  Work/Break: {} / {} minutes",
        advice.breaks.work, advice.breaks.break_minutes
    ));
    if !advice.daily_checklist.is_empty() {
        lines.push("  Checklist:".to_string());
        lines.extend(advice.daily_checklist.iter().map(|item| format!("    • {item}")));
    }
    if let Some(over) = &advice.if_overbooked {
        lines.push(format!("  ⚠️  Overbooked. Strategy: {}", over.strategy));
        lines.extend(over.actions.iter().map(|a| format!("    • {a}")));
    }
    if !advice.rag_suggestions.is_empty() {
        lines.push("  From your notes:".to_string());
        lines.extend(advice.rag_suggestions.iter().map(|s| format!("    • {s}")));
    }
    if !advice.citations.is_empty() {
        lines.push(format!("  Sources: {}", advice.citations.join(", ")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use studyplan_core::advice::{BreakPlan, MalformedAdvice, OverbookStrategy, OverbookedPlan};
    use studyplan_core::subject::{Subject, SubjectInput};
    use studyplan_core::timetable::{Block, Day, Timetable};
    use studyplan_workflow::PlanInputs;

    fn report(tips: Option<AdviceOutcome>) -> PlanReport {
        PlanReport {
            inputs: PlanInputs::new(1, 2.0, vec![SubjectInput::new("Math", 5)]),
            subjects_enriched: vec![Subject {
                name: "Math".into(),
                difficulty: 5,
                required_hours: 20.0,
                score: 9.643,
                weight: 1.0,
            }],
            timetable: Timetable(vec![Day {
                day: 1,
                blocks: vec![Block {
                    subject: "Math".into(),
                    hours: 2.0,
                }],
            }]),
            per_subject_allocation: BTreeMap::from([("Math".to_string(), 2.0)]),
            total_required_hours: 20.0,
            total_available_hours: 2.0,
            overbooked: true,
            hours_gap: 18.0,
            contexts: Default::default(),
            tips,
            advice_error: None,
        }
    }

    #[test]
    fn renders_totals_tables_and_tips() {
        let advice = Advice {
            study_principles: vec!["Active recall".into()],
            focus_order: vec!["Math".into()],
            breaks: BreakPlan {
                work: 45,
                break_minutes: 15,
            },
            if_overbooked: Some(OverbookedPlan {
                strategy: OverbookStrategy::ScopeCuts,
                actions: vec!["Skip proofs".into()],
            }),
            ..Advice::default()
        };
        let text = plan(&report(Some(AdviceOutcome::Ready(advice))));

        assert!(text.contains("Gap (req - avail): +18.0h"));
        assert!(text.contains("Overbooked: the plan"));
        assert!(text.contains("9.643"));
        assert!(text.contains("Work/Break: 45 / 15 minutes"));
        assert!(text.contains("Strategy: scope_cuts"));
        assert!(text.contains("• Skip proofs"));
        assert!(!text.contains("Sources:"));
    }

    #[test]
    fn surplus_gap_is_negative() {
        let mut r = report(None);
        r.hours_gap = -4.5;
        r.overbooked = false;
        let text = plan(&r);
        assert!(text.contains("-4.5h"));
        assert!(text.contains("No tips returned."));
    }

    #[test]
    fn empty_timetable_is_called_out() {
        let mut r = report(None);
        r.timetable = Timetable(vec![Day {
            day: 1,
            blocks: vec![],
        }]);
        assert!(plan(&r).contains("No time allocated yet"));
    }

    #[test]
    fn advice_failures_are_shown() {
        let malformed = AdviceOutcome::Malformed(MalformedAdvice {
            error: "Invalid JSON from advice model".into(),
            raw: "nope".into(),
        });
        assert!(plan(&report(Some(malformed))).contains("Tips could not be read"));

        let failed = report(None).with_advice_error("Network error: refused");
        assert!(plan(&failed).contains("Tips unavailable: Network error: refused"));
    }
}
