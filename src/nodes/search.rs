use crate::event::RunContext;
use crate::graph::{ConversationState, Field, FieldValue, Node, NodeError, StateUpdate};
use crate::search::{RedditSearch, SearchEngine, SerpResults, SerpSearch};
use crate::trip::search_query;
use std::sync::Arc;

/// Google or Bing search through the SERP collaborator.
pub struct SerpSearchNode {
    engine: SearchEngine,
    client: Arc<dyn SerpSearch>,
}

impl SerpSearchNode {
    pub const GOOGLE_ID: &'static str = "google_search";
    pub const BING_ID: &'static str = "bing_search";

    pub fn new(engine: SearchEngine, client: Arc<dyn SerpSearch>) -> Self {
        Self { engine, client }
    }

    fn target(&self) -> Field {
        match self.engine {
            SearchEngine::Google => Field::GoogleResults,
            SearchEngine::Bing => Field::BingResults,
        }
    }

    fn value(&self, results: Option<SerpResults>) -> FieldValue {
        match self.engine {
            SearchEngine::Google => FieldValue::GoogleResults(results),
            SearchEngine::Bing => FieldValue::BingResults(results),
        }
    }
}

#[async_trait::async_trait]
impl Node for SerpSearchNode {
    fn id(&self) -> &str {
        match self.engine {
            SearchEngine::Google => Self::GOOGLE_ID,
            SearchEngine::Bing => Self::BING_ID,
        }
    }

    fn reads(&self) -> &[Field] {
        &[Field::UserQuestion, Field::TripRequest]
    }

    fn writes(&self) -> &[Field] {
        match self.engine {
            SearchEngine::Google => &[Field::GoogleResults],
            SearchEngine::Bing => &[Field::BingResults],
        }
    }

    async fn run(&self, state: &ConversationState, ctx: &RunContext) -> Result<StateUpdate, NodeError> {
        let query = search_query(state.trip_request.as_ref(), &state.user_question);
        if query.trim().is_empty() {
            return Ok(StateUpdate::new().with(self.value(None)));
        }

        ctx.progress(self.id(), format!("Searching {} for: {query}", self.engine.label()));
        let results = self.client.search(&query, self.engine).await?;

        tracing::debug!(
            field = %self.target(),
            result_count = results.as_ref().map_or(0, |r| r.items.len()),
            "serp results stored"
        );
        Ok(StateUpdate::new().with(self.value(results)))
    }

    fn fallback(&self) -> StateUpdate {
        StateUpdate::new().with(self.value(None))
    }
}

/// Reddit keyword search.
pub struct RedditSearchNode {
    client: Arc<dyn RedditSearch>,
}

impl RedditSearchNode {
    pub const ID: &'static str = "reddit_search";

    pub fn new(client: Arc<dyn RedditSearch>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Node for RedditSearchNode {
    fn id(&self) -> &str {
        Self::ID
    }

    fn reads(&self) -> &[Field] {
        &[Field::UserQuestion, Field::TripRequest]
    }

    fn writes(&self) -> &[Field] {
        &[Field::RedditResults]
    }

    async fn run(&self, state: &ConversationState, ctx: &RunContext) -> Result<StateUpdate, NodeError> {
        let query = search_query(state.trip_request.as_ref(), &state.user_question);
        if query.trim().is_empty() {
            return Ok(self.fallback());
        }

        ctx.progress(Self::ID, format!("Searching Reddit for: {query}"));
        let hits = self.client.search(&query).await?;
        ctx.progress(Self::ID, format!("Found {} Reddit posts", hits.len()));

        Ok(StateUpdate::new().with(FieldValue::RedditResults(hits)))
    }

    fn fallback(&self) -> StateUpdate {
        StateUpdate::new().with(FieldValue::RedditResults(Vec::new()))
    }
}
