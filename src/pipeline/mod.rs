//! Pipeline entry points for harvester operations.
//!
//! - `WindowPlan`: partition the date range into crawl windows
//! - `run_crawl`: drive the windowed crawl into rotating shards

pub mod crawl;
pub mod windows;

pub use crawl::{run_crawl, RunState};
pub use windows::{parse_day, WindowPlan};
