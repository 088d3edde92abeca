use crate::event::RunContext;
use crate::graph::{ConversationState, Field, FieldValue, Node, NodeError, StateUpdate};
use crate::llm::types::OutputSchema;
use crate::llm::{invoke_structured, LanguageModel, LlmError};
use crate::prompts;
use crate::search::{
    format_reddit_hits, thread_key, RedditPost, RedditPostRetrieval, RedditSearchHit, SearchError,
};
use crate::trip::{RedditUrlSelection, TripRequest};
use std::collections::HashSet;
use std::sync::Arc;

/// Keep model picks that point at a search hit, de-duplicated in pick order.
///
/// Returned URLs are the hits' own spelling so retrieval sees exactly what
/// search produced.
pub fn filter_selection(selected: &[String], hits: &[RedditSearchHit], max_urls: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    selected
        .iter()
        .filter_map(|pick| {
            let key = thread_key(pick);
            let hit = hits.iter().find(|h| thread_key(&h.url) == key);
            if hit.is_none() {
                tracing::debug!(url = %pick, "dropping selected url not present in search results");
            }
            hit.filter(|_| seen.insert(key)).map(|h| h.url.clone())
        })
        .take(max_urls)
        .collect()
}

/// Ask the model which Reddit threads deserve a deep-dive.
///
/// Empty search results short-circuit to an empty selection without a model call.
pub async fn select_reddit_urls(
    llm: &dyn LanguageModel,
    user_question: &str,
    hits: &[RedditSearchHit],
    trip_request: Option<&TripRequest>,
    max_urls: usize,
) -> Result<Vec<String>, LlmError> {
    if hits.is_empty() {
        return Ok(Vec::new());
    }

    let schema = OutputSchema::of::<RedditUrlSelection>(
        "reddit_url_selection",
        "Reddit post URLs worth retrieving in full",
    );
    let messages =
        prompts::reddit_url_selection_messages(user_question, &format_reddit_hits(hits), trip_request);
    let selection: RedditUrlSelection = invoke_structured(llm, &messages, &schema).await?;

    let urls = filter_selection(&selection.selected_urls, hits, max_urls);
    tracing::info!(
        proposed = selection.selected_urls.len(),
        kept = urls.len(),
        "selected reddit urls"
    );
    Ok(urls)
}

/// Fetch posts and comments for the selected URLs in one batch.
///
/// An empty selection short-circuits without a collaborator call.
pub async fn retrieve_reddit_posts(
    retriever: &dyn RedditPostRetrieval,
    urls: &[String],
) -> Result<Vec<RedditPost>, SearchError> {
    if urls.is_empty() {
        return Ok(Vec::new());
    }
    retriever.retrieve(urls).await
}

pub struct SelectRedditUrls {
    llm: Arc<dyn LanguageModel>,
    max_urls: usize,
}

impl SelectRedditUrls {
    pub const ID: &'static str = "select_reddit_urls";

    pub fn new(llm: Arc<dyn LanguageModel>, max_urls: usize) -> Self {
        Self { llm, max_urls }
    }
}

#[async_trait::async_trait]
impl Node for SelectRedditUrls {
    fn id(&self) -> &str {
        Self::ID
    }

    fn reads(&self) -> &[Field] {
        &[Field::UserQuestion, Field::TripRequest, Field::RedditResults]
    }

    fn writes(&self) -> &[Field] {
        &[Field::SelectedRedditUrls]
    }

    async fn run(&self, state: &ConversationState, ctx: &RunContext) -> Result<StateUpdate, NodeError> {
        let hits = state.reddit_results.as_deref().unwrap_or_default();
        let urls = select_reddit_urls(
            self.llm.as_ref(),
            &state.user_question,
            hits,
            state.trip_request.as_ref(),
            self.max_urls,
        )
        .await?;

        if !urls.is_empty() {
            let listing = urls
                .iter()
                .enumerate()
                .map(|(i, url)| format!("   {}. {url}", i + 1))
                .collect::<Vec<_>>()
                .join("\n");
            ctx.progress(Self::ID, format!("Selected Reddit threads:\n{listing}"));
        }
        Ok(StateUpdate::new().with(FieldValue::SelectedRedditUrls(urls)))
    }

    fn fallback(&self) -> StateUpdate {
        StateUpdate::new().with(FieldValue::SelectedRedditUrls(Vec::new()))
    }
}

pub struct RetrieveRedditPosts {
    retriever: Arc<dyn RedditPostRetrieval>,
}

impl RetrieveRedditPosts {
    pub const ID: &'static str = "retrieve_reddit_posts";

    pub fn new(retriever: Arc<dyn RedditPostRetrieval>) -> Self {
        Self { retriever }
    }
}

#[async_trait::async_trait]
impl Node for RetrieveRedditPosts {
    fn id(&self) -> &str {
        Self::ID
    }

    fn reads(&self) -> &[Field] {
        &[Field::SelectedRedditUrls]
    }

    fn writes(&self) -> &[Field] {
        &[Field::RedditPostData]
    }

    async fn run(&self, state: &ConversationState, ctx: &RunContext) -> Result<StateUpdate, NodeError> {
        let urls = state.selected_reddit_urls.as_deref().unwrap_or_default();
        if !urls.is_empty() {
            ctx.progress(Self::ID, format!("Retrieving comments for {} Reddit threads", urls.len()));
        }

        let posts = retrieve_reddit_posts(self.retriever.as_ref(), urls).await?;
        if !urls.is_empty() {
            ctx.progress(Self::ID, format!("Retrieved {} Reddit threads", posts.len()));
        }
        Ok(StateUpdate::new().with(FieldValue::RedditPostData(posts)))
    }

    fn fallback(&self) -> StateUpdate {
        StateUpdate::new().with(FieldValue::RedditPostData(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(url: &str) -> RedditSearchHit {
        RedditSearchHit {
            title: "t".to_string(),
            url: url.to_string(),
            subreddit: None,
            num_comments: None,
            score: None,
        }
    }

    #[test]
    fn filter_keeps_only_known_urls_in_pick_order() {
        let hits = vec![
            hit("https://www.reddit.com/r/a/comments/1/one/"),
            hit("https://www.reddit.com/r/b/comments/2/two/"),
        ];
        let picks = vec![
            "https://www.reddit.com/r/b/comments/2/two".to_string(),
            "https://www.reddit.com/r/made/comments/up/".to_string(),
            "https://reddit.com/r/a/comments/1/one/".to_string(),
            "https://www.reddit.com/r/b/comments/2/two/".to_string(),
        ];
        assert_eq!(
            filter_selection(&picks, &hits, 5),
            vec![
                "https://www.reddit.com/r/b/comments/2/two/".to_string(),
                "https://www.reddit.com/r/a/comments/1/one/".to_string(),
            ]
        );
    }

    #[test]
    fn filter_respects_cap() {
        let hits: Vec<_> = (0..4)
            .map(|i| hit(&format!("https://www.reddit.com/r/x/comments/{i}/")))
            .collect();
        let picks: Vec<String> = hits.iter().map(|h| h.url.clone()).collect();
        assert_eq!(filter_selection(&picks, &hits, 2).len(), 2);
    }
}
