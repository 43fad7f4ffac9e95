//! Siphon main entry point
//!
//! Command-line interface for the creator-gallery mirroring crawler.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use siphon::config::load_config_with_hash;
use siphon::crawler::{run_job, CancelToken};
use siphon::events::TracingSink;
use tracing_subscriber::EnvFilter;

/// Siphon: mirror a creator's public gallery to a cloud media host
///
/// Crawls the configured aggregation site for a creator's posts, transfers
/// every media item to the media host, and reports progress as it goes.
/// Runs either as a one-shot crawl (`--target`) or as an HTTP server that
/// accepts jobs from connected clients (`--serve`).
#[derive(Parser, Debug)]
#[command(name = "siphon")]
#[command(version)]
#[command(about = "Creator-gallery mirroring crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Crawl a single target and exit
    #[arg(long, conflicts_with = "serve")]
    target: Option<String>,

    /// Run the HTTP/WebSocket front end
    #[arg(long, conflicts_with = "target")]
    serve: bool,

    /// Validate config and show what would run without crawling
    #[arg(long, conflicts_with_all = ["target", "serve"])]
    dry_run: bool,

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

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config, &config_hash);
        return Ok(());
    }

    let config = Arc::new(config);

    if cli.serve {
        siphon::server::serve(config).await?;
        return Ok(());
    }

    match cli.target {
        Some(target) => handle_crawl(config, &target).await,
        None => {
            eprintln!("Nothing to do: pass --target <name> or --serve");
            std::process::exit(2);
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("siphon=info,warn"),
            1 => EnvFilter::new("siphon=debug,info"),
            2 => EnvFilter::new("siphon=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would run
fn handle_dry_run(config: &siphon::Config, config_hash: &str) {
    println!("=== Siphon Dry Run ===\n");

    println!("Config hash: {}", config_hash);

    println!("\nSite:");
    println!("  Host: {}", config.site.host);
    println!("  Platform: {}", config.site.platform);

    println!("\nCrawl:");
    println!("  Page size: {}", config.crawl.page_size);
    println!("  Posts per chunk: {}", config.crawl.posts_per_chunk);
    println!("  Stall threshold: {}", config.crawl.stall_threshold);
    println!("  Inter-chunk delay: {}ms", config.crawl.inter_chunk_delay_ms);
    println!("  Fallback estimate: {}", config.crawl.fallback_estimate);

    println!("\nBrowser:");
    println!("  Headless: {}", config.browser.headless);
    println!(
        "  Fresh session per chunk: {}",
        config.browser.fresh_session_per_chunk
    );

    println!("\nStorage:");
    println!("  Upload URL: {}", config.storage.upload_url);
    println!("  Namespace prefix: {}", config.storage.namespace_prefix);

    println!("\nServer:");
    println!("  Bind: {}", config.server.bind);
    println!(
        "  Allowed origins: {}",
        config.server.allowed_origins.len()
    );

    println!("\n✓ Configuration is valid");
}

/// Handles the one-shot --target mode
async fn handle_crawl(config: Arc<siphon::Config>, target: &str) -> anyhow::Result<()> {
    tracing::info!("Starting one-shot crawl for '{}'", target);

    let sink = Arc::new(TracingSink);
    let cancel = CancelToken::new();

    // Ctrl-C requests cancellation; the job finishes its current item and
    // shuts down cleanly.
    let ctrlc_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing current item before stopping");
            ctrlc_token.cancel();
        }
    });

    match run_job(config, target, sink, cancel).await {
        Ok(job) => {
            tracing::info!(
                "Finished: state={}, posts processed={}",
                job.state,
                job.total_processed
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
