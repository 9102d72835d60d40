use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use tcga_scraper::config::{ConfigLoader, ResolvedConfig};
use tcga_scraper::domain::FetchErrorPolicy;
use tcga_scraper::error::ScraperError;
use tcga_scraper::gdc::GdcHttpClient;
use tcga_scraper::gene_map::GeneMapping;
use tcga_scraper::layout::Layout;
use tcga_scraper::output::{JsonOutput, OutputMode, TextOutput};
use tcga_scraper::pipeline::{Pipeline, RunOptions, assemble_only, classify_only};

#[derive(Parser)]
#[command(name = "tcga-scraper")]
#[command(about = "Parse TCGA manifests, download RNA-seq counts and build DESeq input matrices")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Classify, download, assemble and hand off to the statistical script")]
    Run(RunArgs),
    #[command(about = "Classify a manifest into Tumor/Normal/Other files")]
    Classify(ClassifyArgs),
    #[command(about = "Assemble a folder of count files into one matrix")]
    Assemble(AssembleArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Name of the histology, used as the top-level folder.
    histology: String,

    /// Parent folder where the histology tree is built.
    root_folder: PathBuf,

    /// Manifest JSON; copied into the histology folder.
    manifest: PathBuf,

    #[arg(long)]
    config: Option<PathBuf>,

    /// Include samples that are neither primary tumor nor solid tissue normal.
    #[arg(long)]
    optional: bool,

    #[arg(long)]
    gene_mapping: Option<PathBuf>,

    #[arg(long)]
    on_fetch_error: Option<FetchErrorPolicy>,

    /// Reuse count files already in the tissue folders.
    #[arg(long)]
    skip_download: bool,

    #[arg(long)]
    no_script: bool,
}

#[derive(Args)]
struct ClassifyArgs {
    manifest: PathBuf,

    #[arg(long)]
    optional: bool,

    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct AssembleArgs {
    folder: PathBuf,

    #[arg(long)]
    gene_mapping: Option<PathBuf>,

    #[arg(long)]
    output: PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<ScraperError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ScraperError) -> u8 {
    match error {
        ScraperError::ManifestRead(_)
        | ScraperError::ManifestParse(_)
        | ScraperError::MalformedSubmitterId { .. }
        | ScraperError::ConfigRead(_)
        | ScraperError::ConfigParse(_)
        | ScraperError::GeneMappingRead(_)
        | ScraperError::GeneMappingParse(_)
        | ScraperError::EmptyCohort => 2,
        ScraperError::GdcHttp(_) | ScraperError::GdcStatus { .. } => 3,
        ScraperError::MissingTool(_) | ScraperError::ScriptFailed(_) => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    match cli.command {
        Commands::Run(args) => run_pipeline(args, output_mode),
        Commands::Classify(args) => {
            let result = classify_only(&args.manifest, args.optional, args.output.as_deref())?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_classify(&result).into_diagnostic()?,
                OutputMode::Text => TextOutput::print_classify(&result),
            }
            Ok(())
        }
        Commands::Assemble(args) => {
            let mapping = match &args.gene_mapping {
                Some(path) => GeneMapping::load(path)?,
                None => GeneMapping::identity(),
            };
            let result = assemble_only(&args.folder, &mapping, &args.output)?;
            match output_mode {
                OutputMode::Json => JsonOutput::print_assemble(&result).into_diagnostic()?,
                OutputMode::Text => TextOutput::print_assemble(&result),
            }
            Ok(())
        }
    }
}

fn run_pipeline(args: RunArgs, output_mode: OutputMode) -> miette::Result<()> {
    let mut config: ResolvedConfig = ConfigLoader::resolve(args.config.as_deref())?;
    if let Some(path) = args.gene_mapping {
        config.gene_mapping = Some(path);
    }
    if let Some(policy) = args.on_fetch_error {
        config.on_fetch_error = policy;
    }
    let options = RunOptions {
        include_others: args.optional || config.include_others,
        skip_download: args.skip_download,
        run_script: !args.no_script,
    };

    let root = std::path::absolute(&args.root_folder).into_diagnostic()?;
    let manifest = std::path::absolute(&args.manifest).into_diagnostic()?;
    let layout = Layout::from_std(&root, &args.histology)?;
    let client = GdcHttpClient::with_base_url(&config.base_url, config.timeout)?;
    let pipeline = Pipeline::new(layout, config, client);

    let result = pipeline.run(&manifest, &options)?;
    match output_mode {
        OutputMode::Json => JsonOutput::print_run(&result).into_diagnostic()?,
        OutputMode::Text => TextOutput::print_run(&result),
    }
    Ok(())
}
