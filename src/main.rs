// src/main.rs

//! skyharvest: Bluesky search harvester CLI
//!
//! Crawls the post search endpoint over a day range, one fixed-length
//! window at a time, and writes the results as gzip-compressed CSV shards.

use std::path::PathBuf;

use clap::Parser;

use skyharvest::error::Result;
use skyharvest::models::Config;
use skyharvest::pipeline::{parse_day, run_crawl, WindowPlan};
use skyharvest::services::SearchClient;
use skyharvest::storage::ShardWriter;
use skyharvest::utils::RunLogger;

/// CLI Arguments
#[derive(Parser, Debug)]
#[command(
    name = "skyharvest",
    version,
    about = "Harvests Bluesky search results into compressed CSV shards"
)]
struct Cli {
    /// Search query
    query: String,

    /// First day of the range (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    since: String,

    /// Last day of the range, inclusive (defaults to the first day)
    #[arg(long)]
    until: Option<String>,

    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: String,

    /// Language filter override
    #[arg(long)]
    lang: Option<String>,

    /// Page size override (1..=100)
    #[arg(long)]
    limit: Option<u32>,

    /// Window length override in minutes
    #[arg(long)]
    interval_minutes: Option<u32>,

    /// Records per shard override
    #[arg(long)]
    posts_per_file: Option<usize>,

    /// Output directory override
    #[arg(short, long)]
    output: Option<String>,

    /// Suppress per-window progress output
    #[arg(short, long)]
    quiet: bool,
}

/// Main entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        log::error!("run aborted: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load_or_default(&cli.config);

    // CLI values override the config file.
    if let Some(lang) = cli.lang {
        config.search.language = lang;
    }
    if let Some(limit) = cli.limit {
        config.search.limit = limit;
    }
    if let Some(interval) = cli.interval_minutes {
        config.search.interval_minutes = interval;
    }
    if let Some(posts_per_file) = cli.posts_per_file {
        config.output.posts_per_file = posts_per_file;
    }
    if let Some(output) = cli.output {
        config.output.base_dir = output;
    }
    if cli.quiet {
        config.logging.show_progress = false;
    }

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    config.validate()?;

    let start_day = parse_day(&cli.since)?;
    let end_day = match &cli.until {
        Some(until) => parse_day(until)?,
        None => start_day,
    };
    let plan = WindowPlan::new(
        start_day,
        end_day,
        config.search.interval_minutes,
        config.search.offset()?,
    )?;

    let base_dir = PathBuf::from(&config.output.base_dir);
    let mut run_log = RunLogger::open(base_dir.join(&config.output.run_log))?;
    let client = SearchClient::new(&config.search)?;
    let mut writer = ShardWriter::new(
        &base_dir,
        &config.output.file_prefix,
        config.output.posts_per_file,
    );

    match run_crawl(
        &config,
        &cli.query,
        &plan,
        &client,
        &mut writer,
        &mut run_log,
    )
    .await
    {
        Ok(state) => {
            log::info!(
                "harvest complete: {} posts across {} windows into {} shards",
                state.total_posts,
                state.windows_done,
                state.shards_finalized
            );
            Ok(())
        }
        Err(e) => {
            // The run log records the terminal error even when the console
            // write itself fails.
            let _ = run_log.event(&format!("run aborted: {e}"));
            Err(e)
        }
    }
}
