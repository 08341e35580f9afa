mod io;
mod logging;
mod manifest;
mod report;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use chronoshift_core::{Granularity, MonthPeriod};
use chronoshift_engine::{
    Boundary, DateRebaser, ExtendOptions, FieldRecalculator, SeriesExtender, TargetWindow,
};

use manifest::{Manifest, TableSpec, table_seed};
use report::{RunReport, TableOutcome};

#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("core error: {0}")]
    Core(#[from] chronoshift_core::Error),
    #[error("engine error: {0}")]
    Engine(#[from] chronoshift_engine::EngineError),
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("file '{file}' is missing declared column '{column}'")]
    MissingColumn { file: String, column: String },
    #[error("file '{file}' carries undeclared column '{column}'")]
    UndeclaredColumn { file: String, column: String },
    #[error("logging init failed: {0}")]
    Logging(String),
    #[error("{0} table(s) failed; their files were left untouched")]
    TablesFailed(u64),
}

#[derive(Parser, Debug)]
#[command(name = "chronoshift", version, about = "ChronoShift CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebase each table's timeline onto a target calendar window.
    Rebase(RebaseArgs),
    /// Extend each table forward in time to a target boundary.
    Extend(ExtendArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Table manifest (JSON).
    #[arg(long)]
    manifest: PathBuf,
    /// Directory holding the table CSV files.
    #[arg(long, default_value = "demo_data")]
    data_dir: PathBuf,
    /// Output directory for run artifacts.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
    /// Process only the named table.
    #[arg(long)]
    table: Option<String>,
    /// Override the manifest seed.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct RebaseArgs {
    #[command(flatten)]
    run: RunArgs,
    /// Target window start (YYYY-MM-DD, or YYYY-MM for month tables).
    #[arg(long)]
    start: String,
    /// Target window end (inclusive).
    #[arg(long)]
    end: String,
}

#[derive(Args, Debug)]
struct ExtendArgs {
    #[command(flatten)]
    run: RunArgs,
    /// Boundary the series must reach (inclusive).
    #[arg(long)]
    end: String,
    /// Records per missing unit; defaults to each table's historical average.
    #[arg(long)]
    rate: Option<f64>,
}

fn main() -> Result<(), CliError> {
    logging::init()?;
    let cli = Cli::parse();
    match cli.command {
        Command::Rebase(args) => run_phase(&args.run, "rebase", |spec, ctx| {
            rebase_table(spec, ctx, &args.start, &args.end)
        }),
        Command::Extend(args) => run_phase(&args.run, "extend", |spec, ctx| {
            extend_table(spec, ctx, &args.end, args.rate)
        }),
    }
}

struct RunContext<'a> {
    data_dir: &'a Path,
    seed: u64,
    recalc: FieldRecalculator,
}

/// Process every selected table in isolation: a fatal error for one table
/// is reported and its file left untouched while the run continues.
fn run_phase<F>(args: &RunArgs, phase: &str, process: F) -> Result<(), CliError>
where
    F: Fn(&TableSpec, &RunContext<'_>) -> Result<TableOutcome, CliError>,
{
    let manifest = Manifest::load(&args.manifest)?;
    let seed = args.seed.unwrap_or(manifest.seed);

    let run_id = Uuid::new_v4().to_string();
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let run_dir = args.run_dir.join(format!("{timestamp}__run_{run_id}"));
    fs::create_dir_all(&run_dir)?;
    fs::write(
        run_dir.join("resolved_manifest.json"),
        serde_json::to_vec_pretty(&manifest)?,
    )?;

    let ctx = RunContext {
        data_dir: &args.data_dir,
        seed,
        recalc: build_recalculator(&manifest),
    };

    info!(run_id = %run_id, phase, tables = manifest.tables.len(), seed, "run started");

    let mut outcomes = Vec::new();
    let mut failures = 0_u64;
    for spec in &manifest.tables {
        if let Some(only) = &args.table
            && only != &spec.name
        {
            continue;
        }
        match process(spec, &ctx) {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => {
                failures += 1;
                warn!(table = %spec.name, error = %err, "table failed; file left untouched");
                outcomes.push(TableOutcome::failed(&spec.name, err.to_string()));
            }
        }
    }

    let run_report = RunReport {
        run_id: run_id.clone(),
        phase: phase.to_string(),
        tables: outcomes,
        failures,
    };
    fs::write(
        run_dir.join("run_report.json"),
        serde_json::to_vec_pretty(&run_report)?,
    )?;

    info!(
        run_id = %run_id,
        phase,
        tables = run_report.tables.len(),
        failures,
        "run completed"
    );
    if failures > 0 {
        return Err(CliError::TablesFailed(failures));
    }
    Ok(())
}

/// Built-in rule sets, overridden by any manifest-declared rules.
fn build_recalculator(manifest: &Manifest) -> FieldRecalculator {
    let mut recalc = FieldRecalculator::builtin();
    for table in &manifest.tables {
        if !table.derived.is_empty() {
            recalc.register(table.kind(), table.derived.clone());
        }
    }
    recalc
}

fn rebase_table(
    spec: &TableSpec,
    ctx: &RunContext<'_>,
    start: &str,
    end: &str,
) -> Result<TableOutcome, CliError> {
    let schema = spec.schema();
    let granularity = table_granularity(spec, &schema)?;
    let window = TargetWindow::new(
        parse_boundary(start, granularity)?,
        parse_boundary(end, granularity)?,
    );

    let path = ctx.data_dir.join(&spec.file);
    let mut dataset = io::read_table_csv(&path, &schema)?;
    let mut rng = ChaCha8Rng::seed_from_u64(table_seed(ctx.seed, &spec.name));
    let report = DateRebaser::new(window).rebase(&mut dataset, spec.kind(), &ctx.recalc, &mut rng)?;
    let bytes_written = io::write_table_csv(&path, &dataset)?;

    info!(
        table = %spec.name,
        old_range = format!("{}..{}", report.old_min, report.old_max),
        new_range = format!("{}..{}", report.new_min, report.new_max),
        records = report.records,
        "table rebased"
    );
    Ok(TableOutcome::rebased(&spec.name, report, bytes_written))
}

fn extend_table(
    spec: &TableSpec,
    ctx: &RunContext<'_>,
    end: &str,
    rate: Option<f64>,
) -> Result<TableOutcome, CliError> {
    let schema = spec.schema();
    let granularity = table_granularity(spec, &schema)?;
    let mut options = ExtendOptions::new(spec.kind(), parse_boundary(end, granularity)?);
    options.records_per_unit = rate;
    options.scope_field = spec.scope_field.clone();

    let path = ctx.data_dir.join(&spec.file);
    let mut dataset = io::read_table_csv(&path, &schema)?;
    let mut rng = ChaCha8Rng::seed_from_u64(table_seed(ctx.seed, &spec.name));
    let report = SeriesExtender::new(options).extend(&mut dataset, &ctx.recalc, &mut rng)?;

    let bytes_written = if report.already_current {
        0
    } else {
        io::write_table_csv(&path, &dataset)?
    };

    if report.skipped_scopes > 0 {
        warn!(
            table = %spec.name,
            added = report.records_added,
            skipped_scopes = report.skipped_scopes,
            new_max = %report.new_max,
            "table extended with skipped scopes"
        );
    } else {
        info!(
            table = %spec.name,
            added = report.records_added,
            new_max = %report.new_max,
            "table extended"
        );
    }
    Ok(TableOutcome::extended(&spec.name, report, bytes_written))
}

fn table_granularity(spec: &TableSpec, schema: &chronoshift_core::Schema) -> Result<Granularity, CliError> {
    schema.granularity().ok_or_else(|| {
        CliError::InvalidManifest(format!(
            "table '{}' declares no usable primary_timestamp field",
            spec.name
        ))
    })
}

fn parse_boundary(raw: &str, granularity: Granularity) -> Result<Boundary, CliError> {
    match granularity {
        Granularity::MonthPeriod => raw
            .parse::<MonthPeriod>()
            .map(Boundary::Month)
            .map_err(|_| CliError::InvalidArgument(format!("'{raw}' is not a YYYY-MM period"))),
        Granularity::Date | Granularity::DateTime => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Boundary::Day)
            .map_err(|_| CliError::InvalidArgument(format!("'{raw}' is not a YYYY-MM-DD date"))),
    }
}
