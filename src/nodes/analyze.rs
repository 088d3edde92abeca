use crate::event::RunContext;
use crate::graph::{ConversationState, Field, FieldValue, Node, NodeError, StateUpdate};
use crate::llm::types::Message;
use crate::llm::{LanguageModel, LlmError};
use crate::prompts;
use crate::search::{
    format_reddit_hits, format_reddit_posts, format_serp, RedditPost, RedditSearchHit, SearchEngine,
    SerpResults,
};
use crate::trip::{search_query, TripRequest};
use std::sync::Arc;

async fn analyze(llm: &dyn LanguageModel, source: &str, messages: Vec<Message>) -> Result<String, LlmError> {
    let analysis = llm.complete(&messages).await?;
    tracing::debug!(source, chars = analysis.len(), "analysis complete");
    Ok(analysis)
}

/// Summarize Google results for the question. Empty results still reach the model.
pub async fn analyze_google(
    llm: &dyn LanguageModel,
    search_context: &str,
    results: Option<&SerpResults>,
    trip_request: Option<&TripRequest>,
) -> Result<String, LlmError> {
    let messages = prompts::google_analysis_messages(search_context, &format_serp(results), trip_request);
    analyze(llm, "google", messages).await
}

pub async fn analyze_bing(
    llm: &dyn LanguageModel,
    search_context: &str,
    results: Option<&SerpResults>,
    trip_request: Option<&TripRequest>,
) -> Result<String, LlmError> {
    let messages = prompts::bing_analysis_messages(search_context, &format_serp(results), trip_request);
    analyze(llm, "bing", messages).await
}

/// Summarize Reddit community input: the raw hits plus whatever threads were retrieved.
pub async fn analyze_reddit(
    llm: &dyn LanguageModel,
    search_context: &str,
    hits: &[RedditSearchHit],
    posts: &[RedditPost],
    trip_request: Option<&TripRequest>,
) -> Result<String, LlmError> {
    let messages = prompts::reddit_analysis_messages(
        search_context,
        &format_reddit_hits(hits),
        &format_reddit_posts(posts),
        trip_request,
    );
    analyze(llm, "reddit", messages).await
}

/// Analyzer for one of the SERP engines.
pub struct AnalyzeSerp {
    engine: SearchEngine,
    llm: Arc<dyn LanguageModel>,
}

impl AnalyzeSerp {
    pub const GOOGLE_ID: &'static str = "analyze_google_results";
    pub const BING_ID: &'static str = "analyze_bing_results";

    pub fn new(engine: SearchEngine, llm: Arc<dyn LanguageModel>) -> Self {
        Self { engine, llm }
    }

    fn value(&self, analysis: String) -> FieldValue {
        match self.engine {
            SearchEngine::Google => FieldValue::GoogleAnalysis(analysis),
            SearchEngine::Bing => FieldValue::BingAnalysis(analysis),
        }
    }
}

#[async_trait::async_trait]
impl Node for AnalyzeSerp {
    fn id(&self) -> &str {
        match self.engine {
            SearchEngine::Google => Self::GOOGLE_ID,
            SearchEngine::Bing => Self::BING_ID,
        }
    }

    fn reads(&self) -> &[Field] {
        match self.engine {
            SearchEngine::Google => &[Field::UserQuestion, Field::TripRequest, Field::GoogleResults],
            SearchEngine::Bing => &[Field::UserQuestion, Field::TripRequest, Field::BingResults],
        }
    }

    fn writes(&self) -> &[Field] {
        match self.engine {
            SearchEngine::Google => &[Field::GoogleAnalysis],
            SearchEngine::Bing => &[Field::BingAnalysis],
        }
    }

    async fn run(&self, state: &ConversationState, ctx: &RunContext) -> Result<StateUpdate, NodeError> {
        let trip = state.trip_request.as_ref();
        let context = search_query(trip, &state.user_question);
        ctx.progress(self.id(), format!("Analyzing {} results", self.engine.label()));

        let analysis = match self.engine {
            SearchEngine::Google => {
                analyze_google(self.llm.as_ref(), &context, state.google_results.as_ref(), trip).await?
            }
            SearchEngine::Bing => {
                analyze_bing(self.llm.as_ref(), &context, state.bing_results.as_ref(), trip).await?
            }
        };
        Ok(StateUpdate::new().with(self.value(analysis)))
    }

    fn fallback(&self) -> StateUpdate {
        StateUpdate::new().with(self.value(String::new()))
    }
}

pub struct AnalyzeReddit {
    llm: Arc<dyn LanguageModel>,
}

impl AnalyzeReddit {
    pub const ID: &'static str = "analyze_reddit_results";

    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }
}

#[async_trait::async_trait]
impl Node for AnalyzeReddit {
    fn id(&self) -> &str {
        Self::ID
    }

    fn reads(&self) -> &[Field] {
        &[
            Field::UserQuestion,
            Field::TripRequest,
            Field::RedditResults,
            Field::RedditPostData,
        ]
    }

    fn writes(&self) -> &[Field] {
        &[Field::RedditAnalysis]
    }

    async fn run(&self, state: &ConversationState, ctx: &RunContext) -> Result<StateUpdate, NodeError> {
        let trip = state.trip_request.as_ref();
        let context = search_query(trip, &state.user_question);
        ctx.progress(Self::ID, "Analyzing Reddit discussions");

        let analysis = analyze_reddit(
            self.llm.as_ref(),
            &context,
            state.reddit_results.as_deref().unwrap_or_default(),
            state.reddit_post_data.as_deref().unwrap_or_default(),
            trip,
        )
        .await?;
        Ok(StateUpdate::new().with(FieldValue::RedditAnalysis(analysis)))
    }

    fn fallback(&self) -> StateUpdate {
        StateUpdate::new().with(FieldValue::RedditAnalysis(String::new()))
    }
}
