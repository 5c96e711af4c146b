//! Post data structures.
//!
//! `Post` is the domain record kept for output; the `Api*` types mirror the
//! search endpoint's JSON shape and are discarded after conversion.

use serde::{Deserialize, Serialize};

/// A post fetched from the search endpoint.
///
/// Only these seven fields survive into the output; everything else the
/// endpoint returns is dropped at decode time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    /// Author handle, e.g. "alice.bsky.social"
    pub handle: String,

    /// Creation timestamp as reported by the source (RFC 3339)
    pub created_at: String,

    /// Post text
    pub text: String,

    /// Reply count at fetch time
    pub reply_count: u64,

    /// Repost count at fetch time
    pub repost_count: u64,

    /// Like count at fetch time
    pub like_count: u64,

    /// Quote count at fetch time
    pub quote_count: u64,
}

/// One page of search results plus the continuation token, if any.
///
/// A page with no cursor is the last page of its window.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub posts: Vec<Post>,
    pub cursor: Option<String>,
}

/// Wire shape of the search endpoint's response body.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub posts: Vec<ApiPost>,
}

impl From<SearchResponse> for Page {
    fn from(response: SearchResponse) -> Self {
        Self {
            posts: response.posts.into_iter().map(Post::from).collect(),
            cursor: response.cursor,
        }
    }
}

/// Wire shape of a single post.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPost {
    pub author: ApiAuthor,
    pub record: ApiRecord,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub repost_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub quote_count: u64,
}

/// Wire shape of a post author.
#[derive(Debug, Deserialize)]
pub struct ApiAuthor {
    pub handle: String,
}

/// Wire shape of a post record.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRecord {
    pub created_at: String,
    #[serde(default)]
    pub text: String,
}

impl From<ApiPost> for Post {
    fn from(api: ApiPost) -> Self {
        Self {
            handle: api.author.handle,
            created_at: api.record.created_at,
            text: api.record.text,
            reply_count: api.reply_count,
            repost_count: api.repost_count,
            like_count: api.like_count,
            quote_count: api.quote_count,
        }
    }
}
