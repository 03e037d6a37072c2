//! IMOEX Lab CLI — dataset build and tier status commands.
//!
//! Commands:
//! - `make-dataset` — reconcile a date range across tiers and write `dataset.csv`
//! - `status` — report per-tier gaps for a date range without fetching

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use imoexlab_core::domain::parse_key;
use imoexlab_runner::{
    DateRange, MergePolicy, Pipeline, PipelineConfig, PipelineReport, StdoutProgress,
};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "imoexlab",
    about = "IMOEX Lab CLI — news + index dataset builder"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill local gaps from the bucket or the origins, then assemble the dataset.
    MakeDataset {
        #[command(flatten)]
        common: CommonArgs,

        /// Override the configured merge policy.
        #[arg(long, value_enum)]
        merge_policy: Option<MergeArg>,
    },
    /// Report which dates are missing locally and remotely.
    Status {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// First date (YYYY-MM-DD), inclusive.
    #[arg(long = "from")]
    from_dt: String,

    /// Last date (YYYY-MM-DD), inclusive.
    #[arg(long = "till")]
    till_dt: String,

    /// Path to a TOML pipeline config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Local data directory. Overrides config and IMOEXLAB_DATA_DIR.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory where the bucket is mounted. Overrides config and IMOEXLAB_REMOTE_DIR.
    #[arg(long)]
    remote_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum MergeArg {
    AnchorOnTarget,
    Intersection,
}

impl From<MergeArg> for MergePolicy {
    fn from(arg: MergeArg) -> Self {
        match arg {
            MergeArg::AnchorOnTarget => MergePolicy::AnchorOnTarget,
            MergeArg::Intersection => MergePolicy::Intersection,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::MakeDataset {
            common,
            merge_policy,
        } => run_make_dataset(common, merge_policy),
        Commands::Status { common } => run_status(common),
    }
}

fn parse_date(s: &str, flag: &str) -> Result<NaiveDate> {
    parse_key(s).with_context(|| format!("--{flag} '{s}' is not a YYYY-MM-DD date"))
}

/// Config file (or defaults), then environment, then flags.
fn load_config(common: &CommonArgs) -> Result<(PipelineConfig, DateRange)> {
    let mut config = match &common.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    config.apply_env();
    if let Some(dir) = &common.data_dir {
        config.storage.data_dir = dir.clone();
    }
    if let Some(dir) = &common.remote_dir {
        config.storage.remote_dir = Some(dir.clone());
    }

    let from = parse_date(&common.from_dt, "from")?;
    let till = parse_date(&common.till_dt, "till")?;
    let range = DateRange::new(from, till)?;
    Ok((config, range))
}

fn run_make_dataset(common: CommonArgs, merge_policy: Option<MergeArg>) -> Result<()> {
    let (mut config, range) = load_config(&common)?;
    if let Some(policy) = merge_policy {
        config.dataset.merge_policy = policy.into();
    }

    let mut pipeline = Pipeline::from_config(&config)?;
    info!(
        from = %range.start(),
        till = %range.end(),
        data_dir = %config.storage.data_dir.display(),
        policy = ?pipeline.merge_policy(),
        "building dataset"
    );

    let report = pipeline.make_dataset(&range, &StdoutProgress)?;
    print_report(&report);

    if report.rows == 0 {
        warn!("assembled dataset is empty");
    }
    Ok(())
}

fn print_report(report: &PipelineReport) {
    let r = &report.reconcile;
    println!();
    println!("Requested dates:   {}", r.requested);
    println!("Missing locally:   {}", r.local_missing.len());
    println!("Missing remotely:  {}", r.remote_missing.len());

    let unresolved = r.unresolved();
    if !unresolved.is_empty() {
        println!("Unresolved dates:  {}", unresolved.len());
        for date in &unresolved {
            println!("  {date}");
        }
    }

    let a = &report.assembly;
    println!(
        "Read {} news / {} index files ({} skipped, {} legacy)",
        a.news_files,
        a.market_files,
        a.skipped_files.len(),
        a.legacy_files
    );
    for (path, reason) in &a.skipped_files {
        println!("  skipped {}: {reason}", path.display());
    }
    if !a.imputed_dates.is_empty() {
        println!("Dates without headlines (zero features): {}", a.imputed_dates.len());
    }

    println!(
        "Wrote {} rows x {} features to {}",
        report.rows,
        report.columns,
        report.output_path.display()
    );
    println!("Dataset hash: {}", report.dataset_hash);
}

fn run_status(common: CommonArgs) -> Result<()> {
    let (config, range) = load_config(&common)?;
    let pipeline = Pipeline::from_config(&config)?;
    let status = pipeline.status(&range)?;

    println!("Range:             {} .. {}", range.start(), range.end());
    println!("Requested dates:   {}", status.requested);
    println!("Missing locally:   {}", status.local_missing.len());
    println!("Missing remotely:  {}", status.remote_missing.len());
    if !status.remote_missing.is_empty() {
        let first = status.remote_missing.iter().next();
        let last = status.remote_missing.iter().next_back();
        if let (Some(first), Some(last)) = (first, last) {
            println!("Origin backfill needed for {first} .. {last}");
        }
    }
    Ok(())
}
