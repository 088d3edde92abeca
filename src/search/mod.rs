pub mod providers;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Search engines reachable through a SERP provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    Google,
    Bing,
}

impl SearchEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchEngine::Google => "google",
            SearchEngine::Bing => "bing",
        }
    }

    /// Human-facing name, as used in prompts and progress output
    pub fn label(&self) -> &'static str {
        match self {
            SearchEngine::Google => "Google",
            SearchEngine::Bing => "Bing",
        }
    }
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search-engine results page search (Google/Bing)
#[async_trait::async_trait]
pub trait SerpSearch: Send + Sync {
    /// Returns `None` when the provider produced no parsable results
    async fn search(&self, query: &str, engine: SearchEngine) -> Result<Option<SerpResults>, SearchError>;
}

/// Keyword search over Reddit posts
#[async_trait::async_trait]
pub trait RedditSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<RedditSearchHit>, SearchError>;
}

/// Batched post + comment retrieval for Reddit URLs
#[async_trait::async_trait]
pub trait RedditPostRetrieval: Send + Sync {
    async fn retrieve(&self, urls: &[String]) -> Result<Vec<RedditPost>, SearchError>;
}

/// Parsed SERP results for one engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerpResults {
    pub engine: SearchEngine,
    pub items: Vec<SerpResult>,
}

/// One organic SERP entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerpResult {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub description: String,
}

/// One Reddit post returned by keyword search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditSearchHit {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subreddit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_comments: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
}

/// A retrieved Reddit thread with its comments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditPost {
    pub url: String,
    pub post_title: String,
    pub comments: Vec<RedditComment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditComment {
    pub comment_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<String>,
}

/// Prompt rendering for raw search output.
///
/// Analyzers receive these blocks verbatim; an empty input renders as an
/// empty string.
pub fn format_serp(results: Option<&SerpResults>) -> String {
    let Some(results) = results else {
        return String::new();
    };

    results
        .items
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}\n   {}\n   {}", i + 1, r.title, r.link, r.description))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_reddit_hits(hits: &[RedditSearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            let mut line = format!("{}. {}\n   {}", i + 1, hit.title, hit.url);
            if let Some(sub) = &hit.subreddit {
                line.push_str(&format!("\n   r/{}", sub.trim_start_matches("r/")));
            }
            match (hit.score, hit.num_comments) {
                (Some(score), Some(comments)) => {
                    line.push_str(&format!(" | {score} upvotes, {comments} comments"))
                }
                (Some(score), None) => line.push_str(&format!(" | {score} upvotes")),
                (None, Some(comments)) => line.push_str(&format!(" | {comments} comments")),
                (None, None) => {}
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_reddit_posts(posts: &[RedditPost]) -> String {
    let mut out = String::new();
    for post in posts {
        out.push_str(&format!("## {}\n{}\n", post.post_title, post.url));
        for comment in &post.comments {
            let reply = if comment.parent_comment_id.is_some() { "  ↳ " } else { "- " };
            out.push_str(reply);
            out.push_str(comment.content.trim());
            out.push('\n');
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

fn thread_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^https?://(?:[a-z0-9-]+\.)?reddit\.com(/r/[^/?#]+/comments/[^/?#]+)(?:[/?#].*)?$")
            .ok()
    })
    .as_ref()
}

/// Canonical key for a Reddit thread URL: `reddit.com/r/<sub>/comments/<id>`
/// in lowercase. Host variant, slug, comment path, query and fragment are
/// ignored. Anything else compares on the trimmed URL.
pub fn thread_key(url: &str) -> String {
    let url = url.trim();
    match thread_re().and_then(|re| re.captures(url)) {
        Some(caps) => format!("reddit.com{}", caps[1].to_lowercase()),
        None => url.trim_end_matches('/').to_string(),
    }
}

/// Search-related errors
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Snapshot {snapshot_id} not ready after {attempts} polls")]
    SnapshotTimeout { snapshot_id: String, attempts: u32 },

    #[error("Snapshot {snapshot_id} failed: {message}")]
    SnapshotFailed { snapshot_id: String, message: String },

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}
