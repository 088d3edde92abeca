use crate::config::SearchConfig;
use crate::search::{
    thread_key, RedditComment, RedditPost, RedditPostRetrieval, RedditSearch, RedditSearchHit,
    SearchEngine, SearchError, SerpResult, SerpResults, SerpSearch,
};
use anyhow::Context;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Bright Data provider
///
/// SERP queries go through the Web Unlocker `/request` endpoint with
/// `brd_json=1` so Google and Bing pages come back pre-parsed. Reddit
/// search and comment collection use the Datasets v3 API, which is
/// asynchronous: trigger a collection, poll its progress, then download
/// the snapshot.
///
/// The token comes from `search.api_key` or `BRIGHTDATA_API_KEY`.
/// Documentation: https://docs.brightdata.com/
pub struct BrightDataClient {
    client: reqwest::Client,
    config: SearchConfig,
}

impl BrightDataClient {
    pub fn new(config: SearchConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build Bright Data HTTP client")?;

        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn ensure_key(&self) -> Result<(), SearchError> {
        if self.config.api_key.trim().is_empty() {
            return Err(SearchError::InvalidApiKey);
        }
        Ok(())
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response, SearchError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();

        tracing::warn!(
            status = %status,
            error = %crate::logging::redact_secrets(&error_text),
            request = what,
            "bright data api error"
        );

        match status.as_u16() {
            401 | 403 => Err(SearchError::InvalidApiKey),
            429 => Err(SearchError::RateLimitExceeded),
            _ => Err(SearchError::ApiError(format!("HTTP {}: {}", status, error_text))),
        }
    }

    /// Trigger a dataset collection and wait for its snapshot records.
    async fn collect(
        &self,
        dataset_id: &str,
        extra_params: &[(&str, &str)],
        inputs: Value,
    ) -> Result<Vec<Value>, SearchError> {
        let mut params = vec![("dataset_id", dataset_id), ("include_errors", "true")];
        params.extend_from_slice(extra_params);

        let response = self
            .client
            .post(self.api_url("/datasets/v3/trigger"))
            .bearer_auth(&self.config.api_key)
            .query(&params)
            .json(&inputs)
            .send()
            .await?;
        let trigger: TriggerResponse = Self::check(response, "trigger").await?.json().await?;
        let snapshot_id = trigger.snapshot_id;

        tracing::debug!(dataset_id, snapshot_id = %snapshot_id, "bright data collection triggered");

        let interval = Duration::from_secs(self.config.poll_interval_secs);
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            if attempts > self.config.max_poll_attempts {
                return Err(SearchError::SnapshotTimeout {
                    snapshot_id,
                    attempts: self.config.max_poll_attempts,
                });
            }

            let response = self
                .client
                .get(self.api_url(&format!("/datasets/v3/progress/{snapshot_id}")))
                .bearer_auth(&self.config.api_key)
                .send()
                .await?;
            let progress: ProgressResponse = Self::check(response, "progress").await?.json().await?;

            match progress.status.as_str() {
                "ready" => break,
                "failed" => {
                    return Err(SearchError::SnapshotFailed {
                        snapshot_id,
                        message: progress.error.unwrap_or_else(|| "collection failed".to_string()),
                    })
                }
                status => {
                    tracing::trace!(snapshot_id = %snapshot_id, status, attempts, "snapshot not ready");
                    tokio::time::sleep(interval).await;
                }
            }
        }

        let response = self
            .client
            .get(self.api_url(&format!("/datasets/v3/snapshot/{snapshot_id}")))
            .bearer_auth(&self.config.api_key)
            .query(&[("format", "json")])
            .send()
            .await?;
        let records: Value = Self::check(response, "snapshot").await?.json().await?;

        let records = match records {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        };

        // include_errors=true interleaves per-input error records.
        let (ok, errors): (Vec<Value>, Vec<Value>) = records
            .into_iter()
            .partition(|r| r.get("error").map_or(true, Value::is_null));
        if !errors.is_empty() {
            tracing::warn!(snapshot_id = %snapshot_id, error_count = errors.len(), "snapshot contained error records");
        }

        tracing::debug!(snapshot_id = %snapshot_id, record_count = ok.len(), "bright data snapshot downloaded");
        Ok(ok)
    }
}

#[async_trait::async_trait]
impl SerpSearch for BrightDataClient {
    async fn search(&self, query: &str, engine: SearchEngine) -> Result<Option<SerpResults>, SearchError> {
        self.ensure_key()?;

        let target = serp_target_url(query, engine)?;

        tracing::debug!(query = %query, engine = %engine, "performing bright data serp search");

        let response = self
            .client
            .post(self.api_url("/request"))
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "zone": self.config.serp_zone,
                "url": target.as_str(),
                "format": "raw",
            }))
            .send()
            .await?;

        let body: Value = Self::check(response, "serp").await?.json().await?;
        let results = parse_serp(&body, engine, self.config.results_per_query);

        tracing::debug!(
            query = %query,
            engine = %engine,
            result_count = results.as_ref().map_or(0, |r| r.items.len()),
            "serp search completed"
        );

        Ok(results)
    }
}

#[async_trait::async_trait]
impl RedditSearch for BrightDataClient {
    async fn search(&self, query: &str) -> Result<Vec<RedditSearchHit>, SearchError> {
        self.ensure_key()?;

        tracing::debug!(query = %query, "performing bright data reddit search");

        let inputs = json!([{
            "keyword": query,
            "date": "All time",
            "sort_by": "Hot",
            "num_of_posts": self.config.results_per_query,
        }]);
        let records = self
            .collect(
                &self.config.reddit_search_dataset,
                &[("type", "discover_new"), ("discover_by", "keyword")],
                inputs,
            )
            .await?;

        let hits = parse_reddit_hits(&records);
        tracing::debug!(query = %query, result_count = hits.len(), "reddit search completed");
        Ok(hits)
    }
}

#[async_trait::async_trait]
impl RedditPostRetrieval for BrightDataClient {
    async fn retrieve(&self, urls: &[String]) -> Result<Vec<RedditPost>, SearchError> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }
        self.ensure_key()?;

        tracing::debug!(url_count = urls.len(), "retrieving reddit comments");

        let inputs: Vec<Value> = urls
            .iter()
            .map(|url| {
                json!({
                    "url": url,
                    "days_back": self.config.days_back,
                    "load_all_replies": false,
                    "comment_limit": self.config.comments_per_post,
                })
            })
            .collect();

        let records = self
            .collect(&self.config.reddit_comments_dataset, &[], Value::Array(inputs))
            .await?;

        Ok(group_comments(urls, &records))
    }
}

fn serp_target_url(query: &str, engine: SearchEngine) -> Result<Url, SearchError> {
    let base = match engine {
        SearchEngine::Google => "https://www.google.com/search",
        SearchEngine::Bing => "https://www.bing.com/search",
    };
    Url::parse_with_params(base, &[("q", query), ("brd_json", "1")])
        .map_err(|e| SearchError::Other(anyhow::anyhow!("invalid search url: {e}")))
}

#[derive(Debug, Deserialize)]
struct TriggerResponse {
    snapshot_id: String,
}

#[derive(Debug, Deserialize)]
struct ProgressResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
}

fn str_field(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| record.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

/// Extract organic results from a `brd_json=1` SERP body.
///
/// Returns `None` when the page has no `organic` section at all.
fn parse_serp(body: &Value, engine: SearchEngine, limit: usize) -> Option<SerpResults> {
    let organic = body.get("organic")?.as_array()?;

    let items = organic
        .iter()
        .filter_map(|entry| {
            let link = str_field(entry, &["link", "url"])?;
            Some(SerpResult {
                title: str_field(entry, &["title"]).unwrap_or_default(),
                link,
                description: str_field(entry, &["description", "snippet"]).unwrap_or_default(),
            })
        })
        .take(limit)
        .collect();

    Some(SerpResults { engine, items })
}

fn parse_reddit_hits(records: &[Value]) -> Vec<RedditSearchHit> {
    records
        .iter()
        .filter_map(|r| {
            let url = str_field(r, &["url", "post_url"])?;
            Some(RedditSearchHit {
                title: str_field(r, &["title"]).unwrap_or_default(),
                url,
                subreddit: str_field(r, &["community_name", "subreddit"]),
                num_comments: r.get("num_comments").and_then(Value::as_u64),
                score: r
                    .get("num_upvotes")
                    .or_else(|| r.get("score"))
                    .and_then(Value::as_i64),
            })
        })
        .collect()
}

/// Group flat comment records into one post per requested URL, in request order.
fn group_comments(urls: &[String], records: &[Value]) -> Vec<RedditPost> {
    let mut posts: Vec<RedditPost> = urls
        .iter()
        .map(|url| RedditPost {
            url: url.clone(),
            post_title: String::new(),
            comments: Vec::new(),
        })
        .collect();
    let keys: Vec<String> = urls.iter().map(|url| thread_key(url)).collect();

    for record in records {
        let Some(content) = str_field(record, &["comment", "content"]) else {
            continue;
        };
        let source = str_field(record, &["post_url", "url"]).unwrap_or_default();
        let source_key = thread_key(&source);
        let Some(post) = keys
            .iter()
            .position(|key| !source_key.is_empty() && *key == source_key)
            .map(|i| &mut posts[i])
        else {
            tracing::trace!(url = %source, "comment for unrequested thread dropped");
            continue;
        };

        if post.post_title.is_empty() {
            if let Some(title) = str_field(record, &["post_title"]) {
                post.post_title = title;
            }
        }
        post.comments.push(RedditComment {
            comment_id: str_field(record, &["comment_id", "id"]).unwrap_or_default(),
            content,
            date: str_field(record, &["date_posted", "date"]),
            parent_comment_id: str_field(record, &["parent_comment_id"]),
        });
    }

    posts.retain(|p| !p.comments.is_empty());
    posts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serp_target_encodes_query() {
        let url = serp_target_url("Trip to Tokyo,activities:,interests:food", SearchEngine::Bing).unwrap();
        assert_eq!(url.host_str(), Some("www.bing.com"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("q".to_string(), "Trip to Tokyo,activities:,interests:food".to_string()));
        assert_eq!(pairs[1], ("brd_json".to_string(), "1".to_string()));
    }

    #[test]
    fn parse_serp_reads_organic_and_limits() {
        let body = json!({
            "general": { "query": "tokyo" },
            "organic": [
                { "title": "A", "link": "https://a.example", "description": "first" },
                { "title": "no link" },
                { "title": "B", "url": "https://b.example", "snippet": "second" },
                { "title": "C", "link": "https://c.example" }
            ]
        });
        let results = parse_serp(&body, SearchEngine::Google, 2).unwrap();
        assert_eq!(results.items.len(), 2);
        assert_eq!(results.items[1].link, "https://b.example");
        assert_eq!(results.items[1].description, "second");
    }

    #[test]
    fn parse_serp_without_organic_is_none() {
        assert!(parse_serp(&json!({ "html": "<html/>" }), SearchEngine::Google, 10).is_none());
    }

    #[test]
    fn parse_reddit_hits_maps_dataset_fields() {
        let records = vec![
            json!({
                "title": "3 days in Tokyo for food",
                "url": "https://www.reddit.com/r/JapanTravel/comments/abc/3_days/",
                "community_name": "JapanTravel",
                "num_comments": 87,
                "num_upvotes": 512
            }),
            json!({ "title": "missing url" }),
        ];
        let hits = parse_reddit_hits(&records);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].subreddit.as_deref(), Some("JapanTravel"));
        assert_eq!(hits[0].num_comments, Some(87));
        assert_eq!(hits[0].score, Some(512));
    }

    #[test]
    fn group_comments_follows_request_order_and_drops_empty_threads() {
        let urls = vec![
            "https://www.reddit.com/r/a/comments/1/x/".to_string(),
            "https://www.reddit.com/r/b/comments/2/y/".to_string(),
            "https://www.reddit.com/r/c/comments/3/z/".to_string(),
        ];
        let records = vec![
            json!({
                "post_url": "https://www.reddit.com/r/b/comments/2/y/",
                "post_title": "Thread B",
                "comment_id": "b1",
                "comment": "Try the izakaya",
                "date_posted": "2025-05-01"
            }),
            json!({
                "url": "https://www.reddit.com/r/a/comments/1/x/a1/",
                "post_title": "Thread A",
                "comment_id": "a1",
                "comment": "Depachika basements!"
            }),
            json!({
                "post_url": "https://www.reddit.com/r/b/comments/2/y/",
                "comment_id": "b2",
                "comment": "Seconded",
                "parent_comment_id": "b1"
            }),
            json!({ "post_url": "https://www.reddit.com/r/other/comments/9/", "comment": "stray" }),
        ];

        let posts = group_comments(&urls, &records);
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].post_title, "Thread A");
        assert_eq!(posts[1].post_title, "Thread B");
        assert_eq!(posts[1].comments.len(), 2);
        assert_eq!(posts[1].comments[1].parent_comment_id.as_deref(), Some("b1"));
    }

    #[test]
    fn group_comments_does_not_match_on_id_prefix() {
        let urls = vec!["https://www.reddit.com/r/JapanTravel/comments/abc12".to_string()];
        let records = vec![json!({
            "post_url": "https://www.reddit.com/r/JapanTravel/comments/abc123/unrelated_thread/",
            "comment_id": "x1",
            "comment": "Wrong thread"
        })];
        assert!(group_comments(&urls, &records).is_empty());
    }

    #[test]
    fn group_comments_accepts_host_variants() {
        let urls = vec!["https://reddit.com/r/JapanTravel/comments/abc/ramen/".to_string()];
        let records = vec![
            json!({
                "post_url": "https://www.reddit.com/r/JapanTravel/comments/abc/ramen/",
                "comment_id": "c1",
                "comment": "Fuunji near Shinjuku"
            }),
            json!({
                "url": "https://old.reddit.com/r/japantravel/comments/abc/ramen/c2/",
                "comment_id": "c2",
                "comment": "Go early"
            }),
        ];

        let posts = group_comments(&urls, &records);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].url, urls[0]);
        assert_eq!(posts[0].comments.len(), 2);
    }

    #[tokio::test]
    async fn calls_without_token_fail_before_network() {
        let client = BrightDataClient::new(SearchConfig::default()).unwrap();
        let err = SerpSearch::search(&client, "tokyo", SearchEngine::Google)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidApiKey));
    }

    #[tokio::test]
    async fn empty_url_batch_is_a_no_op() {
        let client = BrightDataClient::new(SearchConfig::default()).unwrap();
        assert!(client.retrieve(&[]).await.unwrap().is_empty());
    }
}
