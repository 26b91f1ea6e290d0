mod logging;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use kwscout::{
    search::{run_worker_main, runs_agree},
    CliOverrides, EncodingMode, GeneratorConfig, SearchConfig, SearchError, StrategyChoice,
    StrategyRun, TracingReporter,
};
use std::{num::NonZeroUsize, path::PathBuf, time::Duration};
use tracing::{debug, info};

type Result<T> = std::result::Result<T, SearchError>;

#[derive(Parser)]
#[command(name = "kwscout", author, version, about, long_about = None)]
struct Cli {
    /// Run as a process-pool worker on stdin/stdout
    #[arg(long = "internal-worker", hide = true)]
    internal_worker: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a tree of random text files
    Generate(GenerateArgs),

    /// Search files for keywords with the thread and/or process pool
    Search(Box<SearchArgs>),
}

#[derive(Args, Default)]
struct GenerateArgs {
    /// Directory to generate into
    #[arg(short = 'd', long)]
    root: Option<PathBuf>,

    /// Number of files to create
    #[arg(short = 'n', long)]
    files: Option<usize>,

    /// Number of writer threads
    #[arg(short = 'j', long)]
    workers: Option<NonZeroUsize>,

    /// Keep files already under the root
    #[arg(long)]
    keep: bool,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Args, Default)]
struct SearchArgs {
    /// Keyword to search for (can be specified multiple times)
    #[arg(short = 'k', long = "keyword")]
    keywords: Vec<String>,

    /// Root directory to search in
    #[arg(short = 'd', long)]
    root: Option<PathBuf>,

    /// Worker pool(s) to run (threads|processes|both)
    #[arg(short = 's', long, value_parser = parse_strategy)]
    strategy: Option<StrategyChoice>,

    /// Number of workers per pool
    #[arg(short = 'j', long)]
    workers: Option<NonZeroUsize>,

    /// Seconds to wait for each worker process message
    #[arg(long)]
    timeout: Option<u64>,

    /// How to handle invalid UTF-8 sequences (failfast|lossy)
    #[arg(long, value_parser = parse_encoding)]
    encoding: Option<EncodingMode>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print every match location
    #[arg(long)]
    show_matches: bool,

    /// Log level for stderr (trace|debug|info|warn|error)
    #[arg(long)]
    log_level: Option<String>,

    /// Also write debug logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn parse_strategy(value: &str) -> std::result::Result<StrategyChoice, String> {
    StrategyChoice::parse(value).ok_or_else(|| {
        format!(
            "unknown strategy '{}', expected threads, processes or both",
            value
        )
    })
}

fn parse_encoding(value: &str) -> std::result::Result<EncodingMode, String> {
    match value.to_lowercase().as_str() {
        "failfast" | "fail-fast" => Ok(EncodingMode::FailFast),
        "lossy" => Ok(EncodingMode::Lossy),
        _ => Err(format!(
            "unknown encoding mode '{}', expected failfast or lossy",
            value
        )),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.internal_worker {
        return run_worker_main();
    }

    match cli.command {
        Some(Commands::Generate(args)) => cmd_generate(args),
        Some(Commands::Search(args)) => cmd_search(*args),
        None => cmd_search(SearchArgs::default()),
    }
}

fn cmd_generate(args: GenerateArgs) -> Result<()> {
    let config = SearchConfig::load_from(args.config.as_deref())?;
    logging::init(&config.log_level, config.log_file.as_deref())?;

    let generator = GeneratorConfig {
        base_dir: args.root.unwrap_or(config.root_path),
        num_files: args.files.unwrap_or(config.generate_files),
        workers: args.workers.unwrap_or(config.worker_count),
        clean: !args.keep,
        ..GeneratorConfig::default()
    };

    info!(
        "Generating {} files with {} workers",
        generator.num_files, generator.workers
    );
    let created = kwscout::create_test_files(&generator)?;
    println!(
        "Created {} files in {}",
        created.len().to_string().green(),
        generator.base_dir.display().to_string().blue()
    );
    Ok(())
}

fn cmd_search(args: SearchArgs) -> Result<()> {
    let overrides = CliOverrides {
        keywords: args.keywords,
        root_path: args.root,
        worker_count: args.workers,
        strategy: args.strategy,
        message_timeout_secs: args.timeout,
        encoding_mode: args.encoding,
        log_level: args.log_level,
        log_file: args.log_file,
        generate_files: None,
    };
    let config = SearchConfig::load_from(args.config.as_deref())?.merge_with_cli(overrides);
    logging::init(&config.log_level, config.log_file.as_deref())?;
    debug!("Effective configuration: {:?}", config);

    let files = collect_files(&config)?;
    println!(
        "Searching {} files in {} for {}",
        files.len(),
        config.root_path.display().to_string().blue(),
        config.keywords.join(", ").yellow()
    );

    let runs = kwscout::search(&config, files, &TracingReporter)?;
    for run in &runs {
        info!(
            "{} search took {:?} ({}/{} workers reported)",
            run.strategy,
            run.outcome.elapsed,
            run.outcome.workers_reported,
            run.outcome.workers_launched
        );
        print_run(run, &config.keywords, args.show_matches);
    }

    if runs.len() > 1 {
        let verdict = if runs_agree(&runs) {
            "yes".green()
        } else {
            "no".red()
        };
        println!("\nStrategies agree on results: {}", verdict);
    }
    Ok(())
}

/// Lists the files under the root, generating a fresh tree when it is empty.
fn collect_files(config: &SearchConfig) -> Result<Vec<PathBuf>> {
    let files = kwscout::find_all_files(&config.root_path)?;
    if !files.is_empty() || config.generate_files == 0 {
        return Ok(files);
    }

    println!(
        "No files under {}, generating {}",
        config.root_path.display(),
        config.generate_files
    );
    let generator = GeneratorConfig {
        base_dir: config.root_path.clone(),
        num_files: config.generate_files,
        workers: config.worker_count,
        clean: false,
        ..GeneratorConfig::default()
    };
    kwscout::create_test_files(&generator)
}

fn print_run(run: &StrategyRun, keywords: &[String], show_matches: bool) {
    let outcome = &run.outcome;
    println!("\n{}", format!("== {} ==", run.strategy).bold());

    let mut seen = Vec::new();
    for keyword in keywords {
        if seen.contains(&keyword) {
            continue;
        }
        seen.push(keyword);

        let count = outcome.matches.count(keyword);
        println!("{}: found in {} places", keyword.cyan(), count);
        if show_matches {
            if let Some(locations) = outcome.matches.get(keyword) {
                let mut locations = locations.to_vec();
                locations.sort();
                for location in locations {
                    println!("  {}", location);
                }
            }
        }
    }

    let elapsed = Duration::from_millis(outcome.elapsed.as_millis() as u64);
    println!(
        "Elapsed: {}",
        humantime::format_duration(elapsed).to_string().green()
    );
    println!(
        "Scanned {} files ({} failed), {} lines, {} bytes",
        outcome.stats.files_scanned,
        outcome.stats.files_failed,
        outcome.stats.lines_scanned,
        outcome.stats.bytes_read
    );

    if !outcome.diagnostics.is_empty() {
        println!(
            "{}",
            format!("{} diagnostics", outcome.diagnostics.len()).yellow()
        );
    }
    if !outcome.is_complete() {
        println!(
            "{}",
            format!(
                "Incomplete: {} of {} workers reported",
                outcome.workers_reported, outcome.workers_launched
            )
            .red()
        );
    }
}
