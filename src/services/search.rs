// src/services/search.rs

//! Post search client.
//!
//! One `fetch_page` call performs exactly one request against the search
//! endpoint. The caller decides disposition of every failure; there are no
//! retries at this layer.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Page, SearchConfig, SearchResponse, TimeWindow};
use crate::utils::http::create_async_client;
use crate::utils::RunLogger;

/// Source of search result pages.
///
/// Implemented by [`SearchClient`] for the real endpoint and by scripted
/// sources in tests.
#[async_trait]
pub trait PostSource {
    /// Fetch one page of posts for `query` inside `window`.
    ///
    /// Pass the previous page's cursor to continue; `None` starts the window.
    async fn fetch_page(
        &self,
        query: &str,
        window: &TimeWindow,
        cursor: Option<&str>,
        run_log: &mut RunLogger,
    ) -> Result<Page>;
}

/// HTTP client for the post search endpoint.
pub struct SearchClient {
    endpoint: Url,
    config: SearchConfig,
    client: Client,
}

impl SearchClient {
    /// Create a new search client from the search configuration.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint)?;
        let client = create_async_client(config)?;
        Ok(Self {
            endpoint,
            config: config.clone(),
            client,
        })
    }

    /// Resolve the request URL for one page fetch.
    fn request_url(&self, query: &str, window: &TimeWindow, cursor: Option<&str>) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", query)
                .append_pair("sort", "latest")
                .append_pair("since", &window.since.to_rfc3339())
                .append_pair("until", &window.until.to_rfc3339())
                .append_pair("lang", &self.config.language)
                .append_pair("limit", &self.config.limit.to_string());
            if let Some(cursor) = cursor {
                pairs.append_pair("cursor", cursor);
            }
        }
        url
    }
}

#[async_trait]
impl PostSource for SearchClient {
    async fn fetch_page(
        &self,
        query: &str,
        window: &TimeWindow,
        cursor: Option<&str>,
        run_log: &mut RunLogger,
    ) -> Result<Page> {
        let url = self.request_url(query, window, cursor);

        // Logged before the request goes out so a crashed run's log shows
        // the last attempted call.
        run_log.event(&format!("GET {url}"))?;

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::http_status(status, url.as_str()));
        }

        let body = response.text().await?;
        let decoded: SearchResponse = serde_json::from_str(&body)?;
        Ok(Page::from(decoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn test_window() -> TimeWindow {
        TimeWindow::new(
            DateTime::parse_from_rfc3339("2024-01-01T00:00:00-03:00").unwrap(),
            DateTime::parse_from_rfc3339("2024-01-01T00:59:59-03:00").unwrap(),
        )
    }

    fn test_client() -> SearchClient {
        SearchClient::new(&SearchConfig::default()).unwrap()
    }

    #[test]
    fn request_url_carries_window_and_limit() {
        let url = test_client().request_url("lula", &test_window(), None);
        let query = url.query().unwrap();

        assert!(query.contains("q=lula"));
        assert!(query.contains("sort=latest"));
        assert!(query.contains("since=2024-01-01T00%3A00%3A00-03%3A00"));
        assert!(query.contains("until=2024-01-01T00%3A59%3A59-03%3A00"));
        assert!(query.contains("lang=pt"));
        assert!(query.contains("limit=100"));
        assert!(!query.contains("cursor"));
    }

    #[test]
    fn request_url_appends_cursor_when_present() {
        let url = test_client().request_url("lula", &test_window(), Some("100"));
        assert!(url.query().unwrap().contains("cursor=100"));
    }
}
