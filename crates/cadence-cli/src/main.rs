//! Cadence CLI - plan guardrailed weekly social calendars

use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cadence_core::config::PlannerConfig;
use cadence_core::content::{ContentGenerator, QualityOracle, TemplateContentGenerator};
use cadence_core::orchestrator::{CalendarOrchestrator, GenerationOutcome};
use cadence_core::storage::{HistoryStore, SqliteHistoryStore};
use cadence_core::{CalendarWeek, PlannerInput};
use cadence_llm::{LlmContentGenerator, LlmQualityOracle};

/// Cadence - guardrailed weekly social calendar planner
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Planner input JSON (company, personas, subreddits, themes)
    #[arg(short, long, value_name = "FILE", default_value = "cadence.json")]
    input: PathBuf,

    /// History database path
    #[arg(long, value_name = "FILE", default_value = ".cadence/history.db")]
    db: PathBuf,

    /// Planner configuration file (JSON); defaults apply when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Generate content through the LLM endpoint configured in the environment
    #[arg(long)]
    llm: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a calendar for a specific week
    Generate {
        /// Week start date (YYYY-MM-DD, a Monday); defaults to the week after
        /// the last recorded one
        #[arg(long)]
        week: Option<NaiveDate>,

        /// Print the generated week as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Regenerate the week for a given start date, replacing any stored one
    Regenerate {
        /// Week start date (YYYY-MM-DD, a Monday)
        week: NaiveDate,

        /// Print the generated week as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Show the recorded generation history
    History,

    /// Print a stored week as JSON
    Export {
        /// Week start date (YYYY-MM-DD)
        week: NaiveDate,
    },

    /// Drop all stored history
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadence_core=info,cadence_llm=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut store = SqliteHistoryStore::open(&cli.db)
        .with_context(|| format!("opening history database {:?}", cli.db))?;

    match &cli.command {
        Commands::Generate { week, json } => {
            let (input, mut orchestrator) = setup(&cli)?;
            let (generator, oracle) = collaborators(&cli)?;

            let outcome = match week {
                Some(week_start) => {
                    ensure_monday(*week_start)?;
                    orchestrator
                        .generate_week(
                            &input,
                            &mut store,
                            generator.as_ref(),
                            oracle.as_deref(),
                            *week_start,
                        )
                        .await?
                }
                None => {
                    orchestrator
                        .generate_next_week(&input, &mut store, generator.as_ref(), oracle.as_deref())
                        .await?
                }
            };

            render_outcome(&outcome, *json)?;
        }
        Commands::Regenerate { week, json } => {
            ensure_monday(*week)?;
            let (input, mut orchestrator) = setup(&cli)?;
            let (generator, oracle) = collaborators(&cli)?;

            let outcome = orchestrator
                .regenerate(&input, &mut store, generator.as_ref(), oracle.as_deref(), *week)
                .await?;
            render_outcome(&outcome, *json)?;
        }
        Commands::History => {
            let history = store.load()?;
            if history.generated_weeks.is_empty() {
                println!("No weeks recorded yet.");
            }
            for week in &history.generated_weeks {
                println!(
                    "{}  (ISO week {:>2})  {} post(s)  generated {}",
                    week.week_start,
                    week.iso_week,
                    week.posts.len(),
                    week.generated_at.format("%Y-%m-%d %H:%M UTC"),
                );
            }
        }
        Commands::Export { week } => {
            let history = store.load()?;
            let Some(stored) = history.week_for(*week) else {
                bail!("no stored week starting {week}");
            };
            println!("{}", stored.to_json()?);
        }
        Commands::Clear => {
            store.clear()?;
            println!("History cleared.");
        }
    }

    Ok(())
}

fn setup(cli: &Cli) -> Result<(PlannerInput, CalendarOrchestrator)> {
    let content = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("reading planner input {:?}", cli.input))?;
    let input: PlannerInput =
        serde_json::from_str(&content).context("parsing planner input JSON")?;

    let mut config = match &cli.config {
        Some(path) => PlannerConfig::from_file(
            path.to_str().context("config path is not valid UTF-8")?,
        )?,
        None => PlannerConfig::default(),
    };
    if cli.llm {
        config = config.with_oracle_enabled(true);
    }

    Ok((input, CalendarOrchestrator::new(config)))
}

fn collaborators(
    cli: &Cli,
) -> Result<(Box<dyn ContentGenerator>, Option<Box<dyn QualityOracle>>)> {
    if cli.llm {
        let generator = LlmContentGenerator::from_env()
            .context("configuring the LLM content generator")?;
        let oracle = LlmQualityOracle::from_env()
            .context("configuring the LLM quality oracle")?;
        Ok((Box::new(generator), Some(Box::new(oracle))))
    } else {
        Ok((Box::new(TemplateContentGenerator::new()), None))
    }
}

fn ensure_monday(date: NaiveDate) -> Result<()> {
    if date.weekday() != Weekday::Mon {
        bail!("week start {date} is a {}, expected a Monday", date.weekday());
    }
    Ok(())
}

fn render_outcome(outcome: &GenerationOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", outcome.week.to_json()?);
        return Ok(());
    }

    print_week(&outcome.week);

    if outcome.report.rejected > 0 {
        println!(
            "\n{} slot(s) rejected during the run.",
            outcome.report.rejected
        );
    }
    for warning in &outcome.report.warnings {
        println!("warning: {warning}");
    }
    for violation in &outcome.report.violations {
        println!("{}: {} - {}", violation.severity, violation.rule, violation.message);
    }

    Ok(())
}

fn print_week(week: &CalendarWeek) {
    println!(
        "Week of {} (ISO week {}), {} post(s):",
        week.week_start,
        week.iso_week,
        week.posts.len()
    );

    for post in &week.posts {
        println!(
            "\n  {} {}  {}  by {}  [{:.1}/10]",
            post.scheduled_at.format("%a"),
            post.scheduled_at.format("%Y-%m-%d %H:%M"),
            post.subreddit,
            post.author_id,
            post.quality_score,
        );
        println!("    {}", post.title);
        for comment in &post.comments {
            let marker = if comment.parent_id.is_some() {
                "reply"
            } else {
                "comment"
            };
            println!(
                "      +{:>3}min {} by {}: {}",
                comment.delay_minutes,
                marker,
                comment.author_id,
                truncate(&comment.seed_text, 60),
            );
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}
