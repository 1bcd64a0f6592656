//! Ripple-Frontier main entry point
//!
//! This is the command-line interface for the Ripple-Frontier crawl frontier.

use clap::Parser;
use ripple_frontier::config::{load_config_with_hash, Config};
use ripple_frontier::crawler::{http_crawlers, CrawlController};
use ripple_frontier::output::{load_statistics, print_statistics, CrawlStatistics};
use ripple_frontier::storage::SqliteStatsStore;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// How often progress is logged and statistics are persisted
const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// How often the controller is polled for remaining tasks
const IDLE_POLL: Duration = Duration::from_millis(200);

/// Ripple-Frontier: A polite, concurrent crawl frontier
///
/// Crawls from the configured seeds with a pool of worker threads while
/// spacing out requests per domain, capping parallel requests per domain and
/// giving up on domains that return too many errors.
#[derive(Parser, Debug)]
#[command(name = "ripple-frontier")]
#[command(version)]
#[command(about = "A polite, concurrent crawl frontier", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG", default_value = "ripple-frontier.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only show warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the effective settings without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Additional seed URL (repeatable)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Stop the crawl after this many seconds
    #[arg(long, value_name = "SECS")]
    max_runtime: Option<u64>,

    /// Show the statistics persisted by the previous run and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = match load_config_with_hash(&cli.config) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    config.crawler.seeds.extend(cli.seeds.iter().cloned());

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, cli.max_runtime.map(Duration::from_secs))?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` takes precedence over the command-line flags.
fn setup_logging(verbose: u8, quiet: bool) {
    let default_filter = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "ripple_frontier=info,warn",
            1 => "ripple_frontier=debug,info",
            _ => "ripple_frontier=trace,debug",
        }
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Ripple-Frontier Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Max level: {}", display_limit(config.crawler.max_level));
    println!(
        "  Max parallel requests per domain: {}",
        display_limit(config.crawler.max_parallel_requests)
    );
    println!("  Politeness period: {}ms", config.crawler.politeness_period);
    println!("  Defer timeout: {}ms", config.crawler.defer_timeout);
    println!(
        "  Max parallel tasks per sequence: {}",
        display_limit(config.crawler.max_parallel_sequences)
    );
    println!("  Spread domains: {}", config.crawler.spread_domains);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nFetcher:");
    println!("  Tries: {}", config.fetcher.tries);
    println!(
        "  Timeouts: connect {}ms, read {}ms",
        config.fetcher.connect_timeout, config.fetcher.read_timeout
    );
    println!(
        "  Allowed content types: {}",
        config.fetcher.allowed_content_types.join(", ")
    );

    println!("\nStorage:");
    println!("  Queue: {}", config.storage.queue_dir);
    println!("  Statistics: {}", config.storage.stats_dir);
    println!("  In-memory queue capacity: {}", config.storage.queue_capacity);

    println!("\nHTTP Error Limits ({}):", config.http_error_limits.len());
    for limit in &config.http_error_limits {
        println!("  - {} after {} responses", limit.status, limit.limit);
    }

    println!("\nDomain Overrides ({}):", config.domains.len());
    for domain in &config.domains {
        let limits = config.limits_for(&domain.name);
        println!(
            "  - {}: max level {}, parallel {}, politeness {}ms",
            domain.name,
            display_limit(limits.max_level),
            display_limit(limits.max_parallel_requests),
            limits.politeness_period.as_millis()
        );
    }

    println!("\nSeeds ({}):", config.crawler.seeds.len());
    for seed in &config.crawler.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

fn display_limit(value: u32) -> String {
    if value == 0 {
        "unlimited".to_string()
    } else {
        value.to_string()
    }
}

/// Handles the --stats mode: shows statistics persisted by the previous run
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Statistics: {}\n", config.storage.stats_dir);

    let store = SqliteStatsStore::inspect(Path::new(&config.storage.stats_dir))?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
fn handle_crawl(
    config: Config,
    max_runtime: Option<Duration>,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Starting crawl with {} workers and {} seeds",
        config.crawler.workers,
        config.crawler.seeds.len()
    );

    let crawlers = http_crawlers(&config)?;
    let controller = CrawlController::open(config, crawlers)?;
    controller.start()?;

    let started = Instant::now();
    loop {
        let wait = next_wait(max_runtime, started.elapsed());
        if controller.wait_until_idle(IDLE_POLL, Some(wait)) {
            tracing::info!("No tasks left, crawl complete");
            break;
        }

        let totals = controller.statistics().totals();
        tracing::info!(
            "{} tasks pending; {} scheduled, {} downloaded, {} errors across {} domains",
            controller.tasks_count(),
            totals.scheduled,
            totals.downloaded,
            totals.errors,
            totals.domains
        );
        if let Err(e) = controller.persist_statistics() {
            tracing::warn!("Failed to persist statistics: {}", e);
        }

        if max_runtime.is_some_and(|limit| started.elapsed() >= limit) {
            tracing::info!("Maximum runtime reached, stopping");
            break;
        }
    }

    if !controller.stop() {
        tracing::warn!("Some workers did not finish in time");
    }
    controller.persist_statistics()?;

    print_statistics(&CrawlStatistics::from_service(controller.statistics()));
    Ok(())
}

/// Time to wait before the next progress report, capped by the runtime left
fn next_wait(max_runtime: Option<Duration>, elapsed: Duration) -> Duration {
    max_runtime.map_or(PROGRESS_INTERVAL, |limit| {
        limit.saturating_sub(elapsed).min(PROGRESS_INTERVAL)
    })
}
