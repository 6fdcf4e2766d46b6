//! CLI entry point for the cohort grader.
//!
//! Provides subcommands for grading a cohort from its activity logs, joining
//! the logs into a single CSV, summarizing task loads, and printing the
//! built-in grading policies.

use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Parser, Subcommand};
use cohort_grader::grading::burndown::burndown;
use cohort_grader::grading::reduce::reduce;
use cohort_grader::grading::{GradingPolicy, TestResults, grade_cohort};
use cohort_grader::loader::{self, LogPaths, ParticipationSchema};
use cohort_grader::output::{Format, emit, print_pretty, render, render_json};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "cohort_grader")]
#[command(about = "Grade a course cohort from task, pull request, and participation logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute individual and group grades
    #[command(group(
        ArgGroup::new("input")
            .args(["tasks", "joined"])
            .required(true)
            .multiple(false)
    ))]
    Grade {
        /// Tab-delimited task export
        #[arg(short, long)]
        tasks: Option<PathBuf>,

        /// Pull request log
        #[arg(short = 'r', long, conflicts_with = "joined")]
        prs: Option<PathBuf>,

        /// Participation log
        #[arg(short, long, conflicts_with = "joined")]
        participation: Option<PathBuf>,

        /// Joined CSV, instead of the three logs. Accepts the headed file
        /// written by `join` or a headerless eight-column legacy file
        /// (task_id, pr_id, assignee, state, task_points, reviewers,
        /// attendance, discussion)
        #[arg(short, long)]
        joined: Option<PathBuf>,

        #[command(flatten)]
        policy: PolicyArgs,

        /// Number of passing tests, for policies that weigh tests
        #[arg(long, requires = "expected_tests")]
        real_tests: Option<u32>,

        /// Number of tests the project was expected to have
        #[arg(long, requires = "real_tests")]
        expected_tests: Option<u32>,

        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// File to write the report to (stdout when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Join the three activity logs into a single CSV with a header row
    Join {
        #[arg(short, long)]
        tasks: PathBuf,

        #[arg(short = 'r', long)]
        prs: PathBuf,

        #[arg(short, long)]
        participation: PathBuf,

        #[command(flatten)]
        policy: PolicyArgs,

        #[arg(short, long)]
        output: PathBuf,
    },
    /// Summarize task loads against the minimum load
    Burndown {
        #[arg(short, long)]
        tasks: PathBuf,

        /// Floor for the cohort task average, in quarter-hour points
        #[arg(short, long, default_value_t = 720.0)]
        minimum_load: f64,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a built-in grading policy as JSON
    Policy {
        #[arg(value_parser = clap::builder::PossibleValuesParser::new(GradingPolicy::PRESETS))]
        name: String,
    },
}

#[derive(clap::Args)]
struct PolicyArgs {
    /// Built-in grading policy
    #[arg(
        long,
        default_value = "engagement",
        value_parser = clap::builder::PossibleValuesParser::new(GradingPolicy::PRESETS)
    )]
    policy: String,

    /// JSON grading policy file, overrides --policy
    #[arg(long)]
    policy_file: Option<PathBuf>,
}

impl PolicyArgs {
    fn resolve(&self) -> Result<GradingPolicy> {
        let policy = match &self.policy_file {
            Some(path) => GradingPolicy::load(path)?,
            None => match GradingPolicy::preset(&self.policy) {
                Some(policy) => policy,
                None => bail!("unknown grading policy `{}`", self.policy),
            },
        };
        info!(policy = %policy.name, "Grading policy selected");
        Ok(policy)
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/cohort_grader.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("cohort_grader.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Grade {
            tasks,
            prs,
            participation,
            joined,
            policy,
            real_tests,
            expected_tests,
            format,
            output,
        } => {
            let policy = policy.resolve()?;
            let rows = match joined {
                Some(path) => loader::load_joined(&path)?,
                None => {
                    let paths = LogPaths {
                        tasks: tasks.as_deref(),
                        prs: prs.as_deref(),
                        participation: participation.as_deref(),
                    };
                    loader::load_logs(&paths, ParticipationSchema::from(&policy.participation_model))?
                }
            };

            let tests = match (real_tests, expected_tests) {
                (Some(passed), Some(expected)) => Some(TestResults { passed, expected }),
                _ => None,
            };

            let report = grade_cohort(&rows, &policy, tests).context("grading failed")?;
            print_pretty(&report);
            for (name, student) in &report.students {
                info!(
                    student = %name,
                    individual = student.scores.individual.total_score,
                    group = student.scores.group.group_score,
                    "Graded"
                );
            }

            let rendered = render(&report, format)?;
            emit(&rendered, output.as_deref())?;
        }
        Commands::Join {
            tasks,
            prs,
            participation,
            policy,
            output,
        } => {
            let policy = policy.resolve()?;
            let paths = LogPaths {
                tasks: Some(tasks.as_path()),
                prs: Some(prs.as_path()),
                participation: Some(participation.as_path()),
            };
            let rows = loader::load_logs(&paths, ParticipationSchema::from(&policy.participation_model))?;
            loader::write_joined(&output, &rows)?;
        }
        Commands::Burndown {
            tasks,
            minimum_load,
            output,
        } => {
            let paths = LogPaths {
                tasks: Some(tasks.as_path()),
                ..Default::default()
            };
            let rows = loader::load_logs(&paths, ParticipationSchema::Engagement)?;
            let summary = burndown(&reduce(&rows), minimum_load).context("burndown failed")?;

            info!(
                average_load = summary.average_load,
                effective_load = summary.effective_load,
                "Burndown computed"
            );
            emit(&render_json(&summary)?, output.as_deref())?;
        }
        Commands::Policy { name } => match GradingPolicy::preset(&name) {
            Some(policy) => emit(&render_json(&policy)?, None)?,
            None => bail!("unknown grading policy `{name}`"),
        },
    }

    Ok(())
}
