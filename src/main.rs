use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use quizdup::config::{self, Number, OutputFormat, Overrides, Settings};
use quizdup::record::{read_records, QuestionRecord};
use quizdup::render::{
    render_json, render_markdown, render_removal_script, render_text, SourceFiles,
};
use quizdup::{analyze_with, AnalysisOptions, SearchMethod};

#[derive(Parser)]
#[command(name = "quizdup")]
#[command(version = "0.1")]
#[command(about = "Find near-duplicate quiz questions", long_about = None)]
struct Cli {
    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare question records read as JSON lines
    Analyze(AnalyzeArgs),
    /// Print the resolved configuration
    Config,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// JSON-lines file with one question record per line (stdin if omitted)
    file: Option<PathBuf>,

    /// Similarity threshold (0.0-1.0)
    #[arg(short, long)]
    threshold: Option<Number>,

    /// Similarity at or above which a pair counts as an exact duplicate
    #[arg(long)]
    exact_threshold: Option<Number>,

    /// Output format: text, json or markdown
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Compare pairs on all cores
    #[arg(long)]
    parallel: bool,

    /// Also write a bash script removing exact cross-source duplicates
    #[arg(long, value_name = "PATH")]
    removal_script: Option<PathBuf>,

    /// Directory source paths are relative to, used for Markdown diffs and
    /// as the working directory of the removal script
    #[arg(long, value_name = "DIR")]
    base_dir: Option<String>,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose || config::verbose_from_env() { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_records(file: Option<&Path>) -> Result<Vec<QuestionRecord>> {
    match file {
        Some(path) => {
            let handle = File::open(path)
                .with_context(|| format!("Failed to open question file '{}'", path.display()))?;
            read_records(BufReader::new(handle))
                .with_context(|| format!("Failed to read question records from '{}'", path.display()))
        }
        None => read_records(io::stdin().lock()).context("Failed to read question records from stdin"),
    }
}

fn analyze_command(settings: Settings, args: &AnalyzeArgs, verbose: bool) -> Result<()> {
    let settings = settings.merge(Overrides {
        threshold: args.threshold,
        exact_threshold: args.exact_threshold,
        format: args.format,
        parallel: args.parallel,
    })?;

    let records = load_records(args.file.as_deref())?;
    tracing::info!(records = records.len(), "Loaded question records");

    let options = AnalysisOptions {
        threshold: settings.threshold,
        exact_threshold: settings.exact_threshold,
        method: if settings.parallel {
            SearchMethod::Parallel
        } else {
            SearchMethod::Sequential
        },
    };
    let result = analyze_with(&records, options)?;

    let output = match settings.format {
        OutputFormat::Text => render_text(&result, &records, verbose)?,
        OutputFormat::Json => render_json(&result)?,
        OutputFormat::Markdown => {
            let sources = SourceFiles::new(args.base_dir.as_deref().map(PathBuf::from));
            render_markdown(&result, &records, &sources)?
        }
    };
    print!("{}", output);

    if let Some(path) = &args.removal_script {
        match render_removal_script(&result, args.base_dir.as_deref())? {
            Some(script) => {
                fs::write(path, script)
                    .with_context(|| format!("Failed to write removal script '{}'", path.display()))?;
                make_executable(path)?;
                tracing::info!(path = %path.display(), "Removal script written");
            }
            None => tracing::warn!("No exact cross-source duplicates; removal script not written"),
        }
    }

    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("Failed to mark '{}' executable", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

fn config_command(settings: &Settings) -> Result<()> {
    settings.print_config();
    if let Err(e) = settings.validate() {
        tracing::warn!("{}", e);
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);
    let settings = Settings::load()?;

    match &args.command {
        Commands::Analyze(analyze_args) => analyze_command(settings, analyze_args, args.verbose)?,
        Commands::Config => config_command(&settings)?,
    }
    Ok(())
}
