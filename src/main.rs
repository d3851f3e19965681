//! Cinesift main entry point
//!
//! This is the command-line interface for the Cinesift movie metadata harvester.

use anyhow::Context;
use cinesift::config::{load_config_with_hash, Config};
use cinesift::crawler::{plan_jobs, MultiPlatformCoordinator};
use cinesift::output::{load_records, print_summary, JsonOutputHandler, OutputHandler};
use cinesift::platform::{catalog, select_platforms};
use cinesift::{merge_records, Platform, RunContext};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Cinesift: a polite movie metadata harvester
///
/// Cinesift crawls movie listings on Douban and IMDb under randomized rate
/// limits and bounded retries, and writes one validated, deduplicated JSON
/// record set per platform together with a run summary.
#[derive(Parser, Debug)]
#[command(name = "cinesift")]
#[command(version)]
#[command(about = "A polite movie metadata harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Platform to crawl: douban, imdb or all
    #[arg(short, long, default_value = "all")]
    platform: String,

    /// Comma-separated category names (platform defaults when omitted)
    #[arg(long, value_delimiter = ',')]
    categories: Vec<String>,

    /// Maximum records per platform, overriding the configuration
    #[arg(long)]
    max_movies: Option<usize>,

    /// Output directory, overriding the configuration
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Check that each selected platform is reachable and exit
    #[arg(long, conflicts_with_all = ["list_categories", "merge"])]
    test_connection: bool,

    /// List the categories each platform offers and exit
    #[arg(long, conflicts_with_all = ["test_connection", "merge"])]
    list_categories: bool,

    /// Merge two record files into one deduplicated file and exit
    #[arg(long, num_args = 2, value_names = ["FIRST", "SECOND"])]
    merge: Option<Vec<PathBuf>>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("cannot load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(max_movies) = cli.max_movies {
        config.crawler.max_movies = max_movies;
    }
    if let Some(output) = &cli.output {
        config.output.directory = output.display().to_string();
    }

    if cli.list_categories {
        handle_list_categories();
        return Ok(());
    }

    if let Some(files) = &cli.merge {
        return handle_merge(&config, files);
    }

    let platforms = select_platforms(&cli.platform)?;

    if cli.test_connection {
        return handle_test_connection(config, &platforms).await;
    }

    handle_crawl(config, &platforms, &cli.categories).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cinesift=info,warn")),
            1 => EnvFilter::new("cinesift=debug,info"),
            2 => EnvFilter::new("cinesift=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --list-categories
fn handle_list_categories() {
    for platform in Platform::ALL {
        println!("{}:", platform.display_name());
        for category in catalog(platform) {
            let default = if platform.default_categories().contains(&category.name) {
                " (default)"
            } else {
                ""
            };
            println!("  {:<14} {}{}", category.name, category.label, default);
        }
        println!();
    }
}

/// Handles --merge: combines two record files, dropping duplicates
fn handle_merge(config: &Config, files: &[PathBuf]) -> anyhow::Result<()> {
    let [first, second] = files else {
        anyhow::bail!("--merge takes exactly two files");
    };

    let first_records =
        load_records(first).with_context(|| format!("cannot read {}", first.display()))?;
    let second_records =
        load_records(second).with_context(|| format!("cannot read {}", second.display()))?;
    let (first_len, second_len) = (first_records.len(), second_records.len());

    let merged = merge_records(first_records, second_records);
    let handler = JsonOutputHandler::new(&config.output.directory)?;
    let path = handler.write_merged(&merged.records)?;

    tracing::info!(
        first = first_len,
        second = second_len,
        merged = merged.records.len(),
        duplicates = merged.duplicates_dropped,
        "Merged record files"
    );
    println!(
        "✓ Merged {} + {} records into {} ({} duplicates dropped): {}",
        first_len,
        second_len,
        merged.records.len(),
        merged.duplicates_dropped,
        path.display()
    );
    Ok(())
}

/// Handles --test-connection
async fn handle_test_connection(config: Config, platforms: &[Platform]) -> anyhow::Result<()> {
    let coordinator = MultiPlatformCoordinator::new(config);
    let mut all_reachable = true;

    for &platform in platforms {
        let report = coordinator.test_connection(platform).await;
        let latency = report
            .latency
            .map(|l| format!("{} ms", l.as_millis()))
            .unwrap_or_else(|| "-".to_string());
        let mark = if report.reachable { "✓" } else { "✗" };
        println!(
            "{} {:<8} {} ({})",
            mark,
            platform.display_name(),
            report.message,
            latency
        );
        all_reachable &= report.reachable;
    }

    if !all_reachable {
        anyhow::bail!("at least one platform is unreachable");
    }
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, platforms: &[Platform], categories: &[String]) -> anyhow::Result<()> {
    let jobs = plan_jobs(platforms, categories, config.crawler.max_movies)?;
    for job in &jobs {
        let names: Vec<&str> = job.categories.iter().map(|c| c.name).collect();
        tracing::info!(
            platform = %job.platform,
            categories = ?names,
            max_movies = job.max_movies,
            "Planned platform job"
        );
    }

    let handler = JsonOutputHandler::new(&config.output.directory)?;
    let ctx = RunContext::new();

    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing with the records gathered so far");
            interrupt.cancel();
        }
    });

    let coordinator = MultiPlatformCoordinator::with_context(config, ctx);
    let output = coordinator.run(jobs).await;

    for platform in output.summary.platforms.keys() {
        let records: Vec<_> = output.records_for(*platform).into_iter().cloned().collect();
        let path = handler.write_records(*platform, &records)?;
        tracing::info!(platform = %platform, records = records.len(), path = %path.display(), "Records written");
    }
    let summary_path = handler.write_summary(&output.summary)?;
    tracing::info!(path = %summary_path.display(), "Summary written");

    print_summary(&output.summary);

    if !output.summary.failed_platforms().is_empty() && output.records.is_empty() {
        anyhow::bail!("no platform produced records");
    }
    Ok(())
}
