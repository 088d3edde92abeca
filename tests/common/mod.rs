//! Scripted collaborators shared by the integration tests
#![allow(dead_code)]

use roamer::llm::types::{Message, OutputSchema};
use roamer::llm::{LanguageModel, LlmError};
use roamer::planner::{Services, TravelPlanner};
use roamer::prompts;
use roamer::search::{
    RedditComment, RedditPost, RedditPostRetrieval, RedditSearch, RedditSearchHit, SearchEngine,
    SearchError, SerpResult, SerpResults, SerpSearch,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub const TOKYO_QUESTION: &str = "Plan a 3-day food trip to Tokyo with a $1000 budget";
pub const TOKYO_QUERY: &str = "Trip to Tokyo,activities:,interests:food";

/// Pipeline step a model call belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    TripRequest,
    UrlSelection,
    Google,
    Bing,
    Reddit,
    Synthesis,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct LlmCall {
    pub step: Step,
    pub user_prompt: String,
}

/// Language model that answers by recognizing which step is calling.
pub struct MockLlm {
    pub trip_request: Value,
    pub selected_urls: Vec<String>,
    pub failing: HashSet<Step>,
    calls: Mutex<Vec<LlmCall>>,
}

impl MockLlm {
    pub fn new(trip_request: Value, selected_urls: Vec<String>) -> Self {
        Self {
            trip_request,
            selected_urls,
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn tokyo() -> Self {
        Self::new(tokyo_trip_json(), vec![tokyo_hits()[0].url.clone(), tokyo_hits()[2].url.clone()])
    }

    pub fn failing(mut self, step: Step) -> Self {
        self.failing.insert(step);
        self
    }

    pub fn calls(&self) -> Vec<LlmCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, step: Step) -> Vec<LlmCall> {
        self.calls().into_iter().filter(|c| c.step == step).collect()
    }

    fn record(&self, step: Step, messages: &[Message]) -> Result<(), LlmError> {
        let user_prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.calls.lock().unwrap().push(LlmCall { step, user_prompt });
        if self.failing.contains(&step) {
            return Err(LlmError::Api {
                status: 500,
                message: format!("scripted failure for {step:?}"),
            });
        }
        Ok(())
    }
}

fn text_step(messages: &[Message]) -> Step {
    let system = messages.first().map(|m| m.content.as_str()).unwrap_or_default();
    match system {
        s if s == prompts::GOOGLE_ANALYSIS_SYSTEM => Step::Google,
        s if s == prompts::BING_ANALYSIS_SYSTEM => Step::Bing,
        s if s == prompts::REDDIT_ANALYSIS_SYSTEM => Step::Reddit,
        s if s == prompts::SYNTHESIS_SYSTEM => Step::Synthesis,
        _ => Step::Unknown,
    }
}

#[async_trait::async_trait]
impl LanguageModel for MockLlm {
    fn model_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let step = text_step(messages);
        self.record(step, messages)?;
        let user = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        Ok(match step {
            Step::Google => "Google: Tsukiji outer market and Shinjuku izakaya alleys".to_string(),
            Step::Bing => "Bing: depachika food halls and a ramen tasting route".to_string(),
            Step::Reddit => "Reddit: locals recommend Omoide Yokocho and early sushi breakfasts".to_string(),
            Step::Synthesis => format!("Plan drawing on Google, Bing and Reddit.\n\n{user}"),
            _ => "unexpected".to_string(),
        })
    }

    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &OutputSchema,
    ) -> Result<Value, LlmError> {
        match schema.name.as_str() {
            "trip_request" => {
                self.record(Step::TripRequest, messages)?;
                Ok(self.trip_request.clone())
            }
            "reddit_url_selection" => {
                self.record(Step::UrlSelection, messages)?;
                Ok(json!({ "selected_urls": self.selected_urls }))
            }
            other => {
                self.record(Step::Unknown, messages)?;
                Err(LlmError::Schema {
                    schema: other.to_string(),
                    message: "unknown schema".to_string(),
                })
            }
        }
    }
}

/// SERP provider returning one canned result per engine.
#[derive(Default)]
pub struct MockSerp {
    pub fail: bool,
    pub empty: bool,
    queries: Mutex<Vec<(String, SearchEngine)>>,
}

impl MockSerp {
    pub fn queries(&self) -> Vec<(String, SearchEngine)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SerpSearch for MockSerp {
    async fn search(&self, query: &str, engine: SearchEngine) -> Result<Option<SerpResults>, SearchError> {
        self.queries.lock().unwrap().push((query.to_string(), engine));
        if self.fail {
            return Err(SearchError::ApiError("serp down".to_string()));
        }
        if self.empty {
            return Ok(None);
        }
        Ok(Some(SerpResults {
            engine,
            items: vec![SerpResult {
                title: format!("{} guide to Tokyo food", engine.label()),
                link: format!("https://example.com/{engine}/tokyo-food"),
                description: "Where to eat in Tokyo".to_string(),
            }],
        }))
    }
}

#[derive(Default)]
pub struct MockRedditSearch {
    pub hits: Vec<RedditSearchHit>,
    pub fail: bool,
    queries: Mutex<Vec<String>>,
}

impl MockRedditSearch {
    pub fn with_hits(hits: Vec<RedditSearchHit>) -> Self {
        Self {
            hits,
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RedditSearch for MockRedditSearch {
    async fn search(&self, query: &str) -> Result<Vec<RedditSearchHit>, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(SearchError::ApiError("reddit search down".to_string()));
        }
        Ok(self.hits.clone())
    }
}

/// Builds one post with a single comment per requested URL.
#[derive(Default)]
pub struct MockRetrieval {
    pub fail: bool,
    batches: Mutex<Vec<Vec<String>>>,
}

impl MockRetrieval {
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RedditPostRetrieval for MockRetrieval {
    async fn retrieve(&self, urls: &[String]) -> Result<Vec<RedditPost>, SearchError> {
        self.batches.lock().unwrap().push(urls.to_vec());
        if self.fail {
            return Err(SearchError::ApiError("snapshot failed".to_string()));
        }
        Ok(urls
            .iter()
            .enumerate()
            .map(|(i, url)| RedditPost {
                url: url.clone(),
                post_title: format!("Thread {i}"),
                comments: vec![RedditComment {
                    comment_id: format!("c{i}"),
                    content: format!("Comment on thread {i}"),
                    date: None,
                    parent_comment_id: None,
                }],
            })
            .collect())
    }
}

pub fn tokyo_trip_json() -> Value {
    json!({
        "destination": "Tokyo",
        "days": 3,
        "budget": 1000.0,
        "interests": ["food"],
        "activities": []
    })
}

pub fn tokyo_hits() -> Vec<RedditSearchHit> {
    (1..=3)
        .map(|i| RedditSearchHit {
            title: format!("Tokyo food tips {i}"),
            url: format!("https://www.reddit.com/r/JapanTravel/comments/t{i}/tokyo_food_{i}/"),
            subreddit: Some("JapanTravel".to_string()),
            num_comments: Some(10 * i),
            score: Some(100),
        })
        .collect()
}

/// Collaborators kept around so tests can inspect what was called.
pub struct Harness {
    pub llm: Arc<MockLlm>,
    pub serp: Arc<MockSerp>,
    pub reddit_search: Arc<MockRedditSearch>,
    pub retrieval: Arc<MockRetrieval>,
}

impl Harness {
    pub fn new(llm: MockLlm, serp: MockSerp, reddit_search: MockRedditSearch, retrieval: MockRetrieval) -> Self {
        Self {
            llm: Arc::new(llm),
            serp: Arc::new(serp),
            reddit_search: Arc::new(reddit_search),
            retrieval: Arc::new(retrieval),
        }
    }

    pub fn tokyo() -> Self {
        Self::new(
            MockLlm::tokyo(),
            MockSerp::default(),
            MockRedditSearch::with_hits(tokyo_hits()),
            MockRetrieval::default(),
        )
    }

    pub fn services(&self) -> Services {
        Services {
            llm: self.llm.clone(),
            serp: self.serp.clone(),
            reddit_search: self.reddit_search.clone(),
            reddit_posts: self.retrieval.clone(),
            max_selected_urls: 5,
        }
    }

    pub fn planner(&self) -> TravelPlanner {
        TravelPlanner::new(self.services()).expect("pipeline wiring is valid")
    }
}
