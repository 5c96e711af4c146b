//! Service layer for the harvester application.
//!
//! This module contains the network-facing logic:
//! - Post search fetching (`SearchClient`, one request per page)

mod search;

pub use search::{PostSource, SearchClient};
