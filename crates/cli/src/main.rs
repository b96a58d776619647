//! studyplan CLI: the main entry point.
//!
//! Commands:
//! - `plan`:     Score subjects, build the timetable and ask for study tips
//! - `index`:    Build the note index and optionally query it
//! - `onboard`:  Write the default config
//! - `doctor`:   Diagnose config and provider health

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod render;

#[derive(Parser)]
#[command(
    name = "studyplan",
    about = "studyplan: prioritized study timetables with note-grounded advice",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a study plan
    Plan(commands::plan::PlanArgs),

    /// Build the note index from files and optionally search it
    Index {
        /// Note files to index
        #[arg(short, long = "notes", required = true, num_args = 1..)]
        notes: Vec<PathBuf>,

        /// Run one search against the fresh index
        #[arg(short, long)]
        query: Option<String>,

        /// Hits to show for --query
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Initialize configuration
    Onboard,

    /// Diagnose configuration and provider health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so `plan --json` output stays clean
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Plan(args) => commands::plan::run(args).await?,
        Commands::Index {
            notes,
            query,
            top_k,
        } => commands::index::run(notes, query, top_k).await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
