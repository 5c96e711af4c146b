// src/pipeline/crawl.rs

//! Time-windowed crawl driver.
//!
//! Windows are processed strictly sequentially; within a window the
//! continuation cursor is drained to exhaustion before the next window
//! starts, so output ordering across shards is non-decreasing by window
//! start and, within a window, the source's native ordering.

use std::time::Duration;

use chrono::Utc;

use crate::error::Result;
use crate::models::{Config, TimeWindow};
use crate::pipeline::windows::WindowPlan;
use crate::services::PostSource;
use crate::storage::ShardWriter;
use crate::utils::RunLogger;

/// Counters for one run, returned at normal completion.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunState {
    pub total_posts: u64,
    pub windows_done: u64,
    pub shards_finalized: u64,
}

/// Run the crawl over every window of the plan.
///
/// On success any leftover OPEN shard is finalized. A failure mid-fetch
/// propagates immediately and leaves the current shard as-is, containing
/// records up to the last successful append.
pub async fn run_crawl(
    config: &Config,
    query: &str,
    plan: &WindowPlan,
    source: &dyn PostSource,
    writer: &mut ShardWriter,
    run_log: &mut RunLogger,
) -> Result<RunState> {
    let started = Utc::now();
    run_log.event(&format!("run started: query={query:?}"))?;

    let delay = Duration::from_millis(config.search.request_delay_ms);
    let mut state = RunState::default();
    for window in plan.iter() {
        if config.logging.show_progress {
            log::info!("window {window}");
        }
        state.total_posts += run_window(query, &window, source, writer, run_log, delay).await?;
        state.windows_done += 1;
    }

    writer.finish(run_log)?;
    state.shards_finalized = writer.finalized_count();

    let elapsed = (Utc::now() - started).num_seconds();
    run_log.event(&format!(
        "run complete: {} windows, {} posts, {} shards, {elapsed}s",
        state.windows_done, state.total_posts, state.shards_finalized
    ))?;
    Ok(state)
}

/// Drain one window's cursor, forwarding every page to the shard writer.
async fn run_window(
    query: &str,
    window: &TimeWindow,
    source: &dyn PostSource,
    writer: &mut ShardWriter,
    run_log: &mut RunLogger,
    delay: Duration,
) -> Result<u64> {
    let mut cursor: Option<String> = None;
    let mut appended = 0u64;

    loop {
        let page = source
            .fetch_page(query, window, cursor.as_deref(), run_log)
            .await?;

        // A zero-post page ends the window even when it carries a cursor:
        // the endpoint returns empty pages for cursors past the result set.
        if page.posts.is_empty() {
            run_log.event(&format!("window {window} exhausted ({appended} posts)"))?;
            break;
        }

        log::debug!("page of {} posts for window {window}", page.posts.len());
        for post in &page.posts {
            writer.append(post, run_log)?;
            appended += 1;
        }

        match page.cursor {
            Some(next) => cursor = Some(next),
            None => {
                run_log.event(&format!("window {window} done ({appended} posts)"))?;
                break;
            }
        }

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    Ok(appended)
}
