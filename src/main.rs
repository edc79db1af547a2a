use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod models;
mod report;
mod store;
mod synth;

use config::SynthConfig;
use models::LearnerId;

#[derive(Parser)]
#[command(name = "prompt-telemetry-synth")]
#[command(
    about = "Generate synthetic prompt interaction telemetry for the learner dashboard",
    long_about = None
)]
struct Cli {
    /// Number of interaction records to generate
    #[arg(long, env = "TELEMETRY_RECORDS", default_value_t = config::DEFAULT_RECORDS)]
    records: usize,
    /// Size of the synthetic learner pool
    #[arg(long, env = "TELEMETRY_LEARNERS", default_value_t = config::DEFAULT_LEARNERS)]
    learners: u32,
    /// Size of the synthetic resource pool
    #[arg(long, env = "TELEMETRY_RESOURCES", default_value_t = config::DEFAULT_RESOURCES)]
    resources: u32,
    /// First day of the window (UTC)
    #[arg(long, env = "TELEMETRY_START", default_value_t = config::DEFAULT_START)]
    start: NaiveDate,
    /// Last day of the window (UTC, inclusive)
    #[arg(long, env = "TELEMETRY_END", default_value_t = config::DEFAULT_END)]
    end: NaiveDate,
    /// Seed for reproducible output; drawn from entropy when absent
    #[arg(long, env = "TELEMETRY_SEED")]
    seed: Option<u64>,
    #[arg(long, env = "TELEMETRY_OUT", default_value = config::DEFAULT_OUTPUT)]
    out: PathBuf,
    /// Keep records in generation order instead of sorting by timestamp
    #[arg(long, env = "TELEMETRY_UNSORTED")]
    unsorted: bool,
    #[arg(long, env = "TELEMETRY_ENGAGEMENT_SKEW", default_value_t = config::DEFAULT_ENGAGEMENT_SKEW)]
    engagement_skew: f64,
    /// Relative weights for scores 1 through 5
    #[arg(
        long,
        env = "TELEMETRY_SCORE_WEIGHTS",
        value_delimiter = ',',
        default_values_t = config::DEFAULT_SCORE_WEIGHTS
    )]
    score_weights: Vec<f64>,
    #[arg(long, env = "TELEMETRY_LEARNING_GAIN", default_value_t = config::DEFAULT_LEARNING_GAIN)]
    learning_gain: f64,
    #[arg(
        long,
        env = "TELEMETRY_RECOMMENDATION_AFFINITY",
        default_value_t = config::DEFAULT_RECOMMENDATION_AFFINITY
    )]
    recommendation_affinity: f64,
    /// Also write a markdown summary built from the generated file
    #[arg(long, env = "TELEMETRY_REPORT")]
    report: Option<PathBuf>,
    /// Scope the markdown summary to one learner, e.g. L-007
    #[arg(long, env = "TELEMETRY_REPORT_LEARNER", requires = "report")]
    report_learner: Option<LearnerId>,
}

impl Cli {
    fn into_config(self) -> Result<SynthConfig, error::ConfigError> {
        Ok(SynthConfig {
            records: self.records,
            learners: self.learners,
            resources: self.resources,
            start: self.start,
            end: self.end,
            seed: self.seed,
            output: self.out,
            sort_by_time: !self.unsorted,
            engagement_skew: self.engagement_skew,
            score_weights: config::score_weights(&self.score_weights)?,
            learning_gain: self.learning_gain,
            recommendation_affinity: self.recommendation_affinity,
        })
    }
}

/// Refuses a report path that would clobber the generated CSV.
fn ensure_distinct_outputs(report: &Path, output: &Path) -> anyhow::Result<()> {
    let lexical = |path: &Path| -> PathBuf {
        path.components()
            .filter(|component| !matches!(component, Component::CurDir))
            .collect()
    };
    let same_file = match (report.canonicalize(), output.canonicalize()) {
        (Ok(report), Ok(output)) => report == output,
        _ => false,
    };
    if same_file || lexical(report) == lexical(output) {
        anyhow::bail!(
            "report path {} is the telemetry output; choose a different --report",
            report.display()
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let report_path = cli.report.clone();
    let report_learner = cli.report_learner;
    let config = cli.into_config().context("invalid telemetry configuration")?;
    if let Some(out) = &report_path {
        ensure_distinct_outputs(out, &config.output)
            .context("invalid telemetry configuration")?;
    }

    let records = synth::synthesize_to_file(&config)
        .with_context(|| format!("failed to generate {}", config.output.display()))?;
    println!(
        "Generated {} telemetry rows at {}",
        records.len(),
        config.output.display()
    );

    if let Some(out) = report_path {
        let loaded = store::read_records(&config.output)
            .with_context(|| format!("failed to read back {}", config.output.display()))?;
        let report = report::build_report(
            &config.output.display().to_string(),
            report_learner,
            &loaded,
        );
        std::fs::write(&out, report)
            .with_context(|| format!("failed to write report {}", out.display()))?;
        println!("Report written to {}.", out.display());
    }

    Ok(())
}
