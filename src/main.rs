use std::path::{Path, PathBuf};

use barge_reconcile::config::{DEFAULT_SOURCE_SHEET, DeploymentProfile, RunOptions};
use barge_reconcile::io::excel_read;
use barge_reconcile::model::PeriodKey;
use barge_reconcile::pipeline::{self, format_summary};
use barge_reconcile::{ReconcileError, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging().and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| ReconcileError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(args) => execute_run(args),
        Command::Sheets { workbook } => list_sheets(&workbook),
        Command::Profile => print_profile(),
    }
}

fn execute_run(args: RunArgs) -> Result<()> {
    let profile = load_profile(args.profile.as_deref())?;
    let period_override = args
        .period
        .as_deref()
        .map(str::parse::<PeriodKey>)
        .transpose()?;

    let options = RunOptions {
        start_row: args.start_row,
        row_count: args.row_count,
        only_completed: args.only_completed,
        dry_run: args.dry_run,
        clear_before_write: !args.no_clear,
        period_override,
        ..RunOptions::new(args.master, args.barge, args.sheet, args.year)
    };

    println!("{}\n", options.summary());
    let report = pipeline::run(&options, &profile, |message| println!("> {message}"))?;

    println!();
    for line in &report.logs {
        println!("{line}");
    }
    println!();
    println!("{}", format_summary(&report.totals, &profile.categories));
    Ok(())
}

fn load_profile(path: Option<&Path>) -> Result<DeploymentProfile> {
    match path {
        Some(path) => DeploymentProfile::from_json_path(path),
        None => Ok(DeploymentProfile::default()),
    }
}

fn list_sheets(workbook: &Path) -> Result<()> {
    if !workbook.exists() {
        return Err(ReconcileError::MissingInput(workbook.to_path_buf()));
    }
    for name in excel_read::sheet_names(workbook)? {
        println!("{name}");
    }
    Ok(())
}

fn print_profile() -> Result<()> {
    let json = serde_json::to_string_pretty(&DeploymentProfile::default())?;
    println!("{json}");
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Reconcile barge log quantities into the monthly master ledger."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Aggregate a block of the barge log and write it into the master ledger.
    Run(RunArgs),
    /// List the worksheets of a workbook.
    Sheets {
        /// Workbook to inspect.
        workbook: PathBuf,
    },
    /// Print the built-in deployment profile as JSON.
    Profile,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Barge log workbook.
    #[arg(long)]
    barge: PathBuf,

    /// Worksheet of the barge log to read.
    #[arg(long, default_value = DEFAULT_SOURCE_SHEET)]
    sheet: String,

    /// Master ledger workbook, updated in place.
    #[arg(long)]
    master: PathBuf,

    /// Target year; selects the ledger sheet and anchors month values.
    #[arg(long)]
    year: i32,

    /// First row to process (1-based).
    #[arg(long, default_value_t = 1)]
    start_row: usize,

    /// Number of rows to process; 0 runs to the end of the sheet.
    #[arg(long, default_value_t = 0)]
    row_count: usize,

    /// Keep only rows whose status is COMPLETE or COMPLETED.
    #[arg(long)]
    only_completed: bool,

    /// Report the changes without saving the ledger.
    #[arg(long)]
    dry_run: bool,

    /// Keep existing category values instead of clearing the row first.
    #[arg(long)]
    no_clear: bool,

    /// Force every row into this period, e.g. `Aug-25`.
    #[arg(long)]
    period: Option<String>,

    /// JSON deployment profile overriding the built-in tables.
    #[arg(long)]
    profile: Option<PathBuf>,
}
