//! `studyplan plan`: Generate a study plan.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use clap::Args;
use studyplan_config::{AppConfig, PlannerConfig};
use studyplan_core::subject::{DEFAULT_DIFFICULTY, SubjectInput};
use studyplan_workflow::{LlmAdvisor, Pipeline, PipelineState, PlanInputs, PlanReport};
use tracing::{Instrument, info_span, warn};
use uuid::Uuid;

use super::{Services, read_notes};
use crate::render;

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Days until the exam
    #[arg(short, long, conflicts_with = "exam_date")]
    pub days: Option<u32>,

    /// Exam date (YYYY-MM-DD); days left are counted from today
    #[arg(long)]
    pub exam_date: Option<NaiveDate>,

    /// Study hours available per day
    #[arg(short = 'H', long)]
    pub hours: Option<f64>,

    /// Subject as "Name[:difficulty[:target_hours]]"; repeatable
    #[arg(short, long = "subject", value_parser = parse_subject)]
    pub subjects: Vec<SubjectInput>,

    /// JSON array of subjects ({"name", "difficulty", "target_hours"})
    #[arg(long)]
    pub subjects_file: Option<PathBuf>,

    /// Note files to index for grounded tips; repeatable
    #[arg(short, long = "notes")]
    pub notes: Vec<PathBuf>,

    /// Write the JSON report here
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the state after every stage (to stderr)
    #[arg(long)]
    pub explain: bool,

    /// Print the JSON report instead of the rendered plan
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: PlanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let days_left = match (args.days, args.exam_date) {
        (Some(days), _) => days,
        (None, Some(date)) => days_until(date, Local::now().date_naive())?,
        (None, None) => config.planner.default_days_left,
    };
    let hours_per_day = args.hours.unwrap_or(config.planner.default_hours_per_day);
    check_horizon(days_left, hours_per_day, &config.planner)?;

    let mut subjects = match &args.subjects_file {
        Some(path) => load_subjects(path)?,
        None => Vec::new(),
    };
    subjects.extend(args.subjects);
    if subjects.is_empty() {
        return Err("Add at least one subject first (--subject or --subjects-file)".into());
    }

    let services = Services::from_config(&config)?;
    if !args.notes.is_empty() {
        let notes = read_notes(&args.notes)?;
        // A failed build leaves the store empty; the plan still runs without context
        match services.store.build(&notes).await {
            Ok(stats) if stats.chunk_count > 0 => eprintln!(
                "📎 Indexed notes: {} chunks (dim={})",
                stats.chunk_count, stats.dimension
            ),
            Ok(_) => eprintln!("📎 Notes were empty, nothing indexed"),
            Err(e) => eprintln!("⚠️  Note index build failed, continuing without context: {e}"),
        }
    }

    let advisor = LlmAdvisor::from_config(services.provider.clone(), &config);
    let pipeline = Pipeline::new(services.store, Arc::new(advisor)).with_config(&config);
    let inputs = PlanInputs::new(days_left, hours_per_day, subjects);

    let run_id = Uuid::new_v4();
    let explain = args.explain;
    let outcome = pipeline
        .run_with(inputs, |state| {
            if explain {
                print_snapshot(state);
            }
        })
        .instrument(info_span!("plan", %run_id))
        .await;

    let report = match outcome {
        Ok(state) => PlanReport::from_state(&state),
        Err(e) => {
            let message = e.to_string();
            let Some(partial) = e.into_partial_state() else {
                return Err(message.into());
            };
            warn!(%run_id, error = %message, "Plan finished without advice");
            eprintln!("⚠️  {message}. Showing the plan without tips.");
            PlanReport::from_state(&partial).with_advice_error(message)
        }
    };

    if args.json {
        println!("{}", report.to_json_pretty()?);
    } else {
        print!("{}", render::plan(&report));
    }

    if let Some(path) = &args.output {
        std::fs::write(path, report.to_json_pretty()?)?;
        eprintln!("💾 Wrote {}", path.display());
    }

    Ok(())
}

fn print_snapshot(state: &PipelineState) {
    match serde_json::to_string_pretty(state) {
        Ok(json) => eprintln!("── state, next stage: {} ──\n{json}", state.stage),
        Err(e) => eprintln!("── state, next stage: {} (unprintable: {e}) ──", state.stage),
    }
}

/// Parse `Name[:difficulty[:target_hours]]`.
fn parse_subject(raw: &str) -> Result<SubjectInput, String> {
    let mut parts = raw.splitn(3, ':');
    let name = parts.next().unwrap_or_default().trim();
    if name.is_empty() {
        return Err("subject name is empty".into());
    }
    let mut subject = SubjectInput::new(name, DEFAULT_DIFFICULTY);

    if let Some(difficulty) = parts.next().map(str::trim).filter(|s| !s.is_empty()) {
        // Out-of-range values are clamped by the scorer
        subject.difficulty = difficulty
            .parse()
            .map_err(|_| format!("difficulty '{difficulty}' is not a whole number"))?;
    }

    if let Some(target) = parts.next().map(str::trim).filter(|s| !s.is_empty()) {
        let hours: f64 = target
            .parse()
            .map_err(|_| format!("target hours '{target}' is not a number"))?;
        // 0 or less means "estimate from difficulty"
        if hours.is_finite() && hours > 0.0 {
            subject = subject.with_target_hours(hours);
        }
    }

    Ok(subject)
}

fn load_subjects(path: &Path) -> Result<Vec<SubjectInput>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let subjects = serde_json::from_str(&content)
        .map_err(|e| format!("{} is not a JSON list of subjects: {e}", path.display()))?;
    Ok(subjects)
}

fn days_until(exam: NaiveDate, today: NaiveDate) -> Result<u32, String> {
    let days = (exam - today).num_days();
    u32::try_from(days)
        .ok()
        .filter(|d| *d >= 1)
        .ok_or_else(|| format!("Exam date {exam} must be after today ({today})"))
}

fn check_horizon(days_left: u32, hours_per_day: f64, planner: &PlannerConfig) -> Result<(), String> {
    if days_left == 0 || days_left > planner.max_days_left {
        return Err(format!(
            "Days left must be between 1 and {}, got {days_left}",
            planner.max_days_left
        ));
    }
    if !hours_per_day.is_finite() || hours_per_day <= 0.0 || hours_per_day > planner.max_hours_per_day {
        return Err(format!(
            "Hours per day must be above 0 and at most {}, got {hours_per_day}",
            planner.max_hours_per_day
        ));
    }
    Ok(())
}
