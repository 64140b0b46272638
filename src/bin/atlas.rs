use std::fs;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use microbiome_atlas::app::{App, ProgressSink};
use microbiome_atlas::catalog::{CatalogFilter, FilterColumn};
use microbiome_atlas::config::ConfigLoader;
use microbiome_atlas::error::AtlasError;
use microbiome_atlas::export::ARCHIVE_FILE_NAME;
use microbiome_atlas::output::{JsonOutput, OutputMode, TextOutput};
use microbiome_atlas::store::ObjectStore;
use microbiome_atlas::submission::UploadedFile;

#[derive(Parser)]
#[command(name = "atlas")]
#[command(about = "Explore, download and submit curated ASV-based microbiome datasets")]
#[command(version, author)]
struct Cli {
    /// Path to the config file (default: ./atlas.json)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Print JSON instead of human readable output
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List projects, optionally filtered")]
    Catalog(CatalogArgs),
    #[command(about = "Show the distinct values of a filter column")]
    Values(ValuesArgs),
    #[command(about = "Download selected projects as one ZIP")]
    Export(ExportArgs),
    #[command(about = "Upload a new dataset (count.csv, taxa.csv, meta.csv, asv.fasta)")]
    Submit(SubmitArgs),
}

#[derive(Args)]
struct CatalogArgs {
    #[arg(long)]
    gene: Option<String>,

    #[arg(long)]
    platform: Option<String>,

    #[arg(long)]
    environment: Option<String>,

    /// Also list projects whose descriptor could not be read
    #[arg(long)]
    show_skipped: bool,
}

#[derive(Args)]
struct ValuesArgs {
    column: FilterColumn,
}

#[derive(Args)]
struct ExportArgs {
    #[arg(required = true)]
    projects: Vec<String>,

    #[arg(long, short, default_value = ARCHIVE_FILE_NAME)]
    output: Utf8PathBuf,
}

#[derive(Args)]
struct SubmitArgs {
    #[arg(long)]
    title: String,

    files: Vec<Utf8PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(atlas) = report.downcast_ref::<AtlasError>() {
            return ExitCode::from(map_exit_code(atlas));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &AtlasError) -> u8 {
    match error {
        AtlasError::Rejected(_)
        | AtlasError::MissingConfig
        | AtlasError::ConfigRead(_)
        | AtlasError::ConfigParse(_)
        | AtlasError::ObjectNotFound { .. }
        | AtlasError::InvalidProjectId(_)
        | AtlasError::EmptySelection => 2,
        AtlasError::Storage(_) | AtlasError::IdentifierSpaceExhausted => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let store = config.open_store()?;
    let app = App::new(store, config.bucket.clone());

    match cli.command {
        Commands::Catalog(args) => run_catalog(args, &app, output_mode),
        Commands::Values(args) => run_values(args, &app, output_mode),
        Commands::Export(args) => run_export(args, &app, output_mode),
        Commands::Submit(args) => run_submit(args, &app, output_mode),
    }
}

fn sink_for(output_mode: OutputMode) -> &'static dyn ProgressSink {
    match output_mode {
        OutputMode::Interactive => &TextOutput,
        OutputMode::NonInteractive => &JsonOutput,
    }
}

fn run_catalog<S: ObjectStore>(
    args: CatalogArgs,
    app: &App<S>,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let filter = CatalogFilter {
        gene: args.gene,
        platform: args.platform,
        environment: args.environment,
    };
    let mut result = app.filtered_catalog(filter, sink_for(output_mode))?;
    if !args.show_skipped {
        result.skipped.clear();
    }
    match output_mode {
        OutputMode::Interactive => TextOutput::print_catalog(&result).into_diagnostic(),
        OutputMode::NonInteractive => JsonOutput::print_catalog(&result).into_diagnostic(),
    }
}

fn run_values<S: ObjectStore>(
    args: ValuesArgs,
    app: &App<S>,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let result = app.values(args.column, sink_for(output_mode))?;
    match output_mode {
        OutputMode::Interactive => TextOutput::print_values(&result).into_diagnostic(),
        OutputMode::NonInteractive => JsonOutput::print_values(&result).into_diagnostic(),
    }
}

fn run_export<S: ObjectStore>(
    args: ExportArgs,
    app: &App<S>,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let mut result = app.export(&args.projects, sink_for(output_mode))?;
    fs::write(args.output.as_std_path(), &result.archive)
        .map_err(|err| AtlasError::Filesystem(format!("write {}: {err}", args.output)))?;
    result.output = Some(args.output.to_string());
    match output_mode {
        OutputMode::Interactive => TextOutput::print_export(&result).into_diagnostic(),
        OutputMode::NonInteractive => JsonOutput::print_export(&result).into_diagnostic(),
    }
}

fn run_submit<S: ObjectStore>(
    args: SubmitArgs,
    app: &App<S>,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let files = args
        .files
        .iter()
        .map(read_upload)
        .collect::<Result<Vec<_>, AtlasError>>()?;
    let receipt = app.submit(&files, &args.title, sink_for(output_mode))?;
    match output_mode {
        OutputMode::Interactive => TextOutput::print_submission(&receipt).into_diagnostic(),
        OutputMode::NonInteractive => JsonOutput::print_submission(&receipt).into_diagnostic(),
    }
}

fn read_upload(path: &Utf8PathBuf) -> Result<UploadedFile, AtlasError> {
    let name = path
        .file_name()
        .ok_or_else(|| AtlasError::Filesystem(format!("not a file: {path}")))?;
    let content = fs::read(path.as_std_path())
        .map_err(|err| AtlasError::Filesystem(format!("read {path}: {err}")))?;
    Ok(UploadedFile::new(name, content))
}
