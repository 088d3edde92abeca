use crate::config::Config;
use crate::event::{PlannerEvent, RunContext};
use crate::graph::{ConversationState, FailurePolicy, GraphError, Pipeline, END};
use crate::llm::{self, LanguageModel};
use crate::nodes::{
    AnalyzeReddit, AnalyzeSerp, ExtractTripParameters, RedditSearchNode, RetrieveRedditPosts,
    SelectRedditUrls, SerpSearchNode, SynthesizeAnalyses,
};
use crate::search::providers::BrightDataClient;
use crate::search::{RedditPostRetrieval, RedditSearch, SearchEngine, SerpSearch};
use anyhow::Context;
use std::sync::Arc;
use tokio::sync::mpsc;

/// External collaborators shared by every run.
#[derive(Clone)]
pub struct Services {
    pub llm: Arc<dyn LanguageModel>,
    pub serp: Arc<dyn SerpSearch>,
    pub reddit_search: Arc<dyn RedditSearch>,
    pub reddit_posts: Arc<dyn RedditPostRetrieval>,
    /// Upper bound on threads picked for a deep-dive
    pub max_selected_urls: usize,
}

/// Wire the fixed pipeline for one run:
///
/// ```text
/// extract -> {google, bing, reddit} search -> select urls -> retrieve posts
///         -> {google, bing, reddit} analysis -> synthesize
/// ```
pub fn build_graph(services: &Services, ctx: RunContext) -> Pipeline {
    let searches = [
        SerpSearchNode::GOOGLE_ID,
        SerpSearchNode::BING_ID,
        RedditSearchNode::ID,
    ];
    let analyses = [AnalyzeSerp::GOOGLE_ID, AnalyzeSerp::BING_ID, AnalyzeReddit::ID];

    let mut pipeline = Pipeline::new(ctx)
        .add_node(ExtractTripParameters::new(services.llm.clone()), FailurePolicy::Degrade)
        .add_node(
            SerpSearchNode::new(SearchEngine::Google, services.serp.clone()),
            FailurePolicy::Degrade,
        )
        .add_node(
            SerpSearchNode::new(SearchEngine::Bing, services.serp.clone()),
            FailurePolicy::Degrade,
        )
        .add_node(
            RedditSearchNode::new(services.reddit_search.clone()),
            FailurePolicy::Degrade,
        )
        .add_node(
            SelectRedditUrls::new(services.llm.clone(), services.max_selected_urls),
            FailurePolicy::Degrade,
        )
        .add_node(
            RetrieveRedditPosts::new(services.reddit_posts.clone()),
            FailurePolicy::Degrade,
        )
        .add_node(
            AnalyzeSerp::new(SearchEngine::Google, services.llm.clone()),
            FailurePolicy::Degrade,
        )
        .add_node(
            AnalyzeSerp::new(SearchEngine::Bing, services.llm.clone()),
            FailurePolicy::Degrade,
        )
        .add_node(AnalyzeReddit::new(services.llm.clone()), FailurePolicy::Degrade)
        .add_node(SynthesizeAnalyses::new(services.llm.clone()), FailurePolicy::Abort)
        .set_entry(ExtractTripParameters::ID)
        .add_parallel_edges(ExtractTripParameters::ID, &searches)
        .add_edge(SelectRedditUrls::ID, RetrieveRedditPosts::ID)
        .add_parallel_edges(RetrieveRedditPosts::ID, &analyses)
        .add_edge(SynthesizeAnalyses::ID, END);

    for search in searches {
        pipeline = pipeline.add_edge(search, SelectRedditUrls::ID);
    }
    for analysis in analyses {
        pipeline = pipeline.add_edge(analysis, SynthesizeAnalyses::ID);
    }
    pipeline
}

/// Answers travel questions by running the pipeline graph once per question.
///
/// Holds no per-question state, so one instance serves concurrent callers.
/// Each run wires a fresh graph around its own [`RunContext`].
pub struct TravelPlanner {
    services: Services,
}

impl TravelPlanner {
    /// Checks the wiring once up front so a bad graph fails at startup.
    pub fn new(services: Services) -> Result<Self, GraphError> {
        let order = build_graph(&services, RunContext::new(None)).validate()?;
        tracing::debug!(nodes = ?order, "pipeline graph validated");
        Ok(Self { services })
    }

    /// Build the production collaborators from config.
    ///
    /// Missing credentials are not an error here; calls fail when made.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let station = config
            .active_station()
            .with_context(|| format!("Station '{}' not found in config", config.default_station))?;
        if !llm::has_api_key(station) {
            tracing::warn!(station = %station.id, "no API key configured; model calls will fail");
        }
        tracing::info!(station = %station.id, model = %station.model, "using language model");

        let bright_data = Arc::new(BrightDataClient::new(config.search.clone())?);
        let services = Services {
            llm: llm::from_station(station),
            serp: bright_data.clone(),
            reddit_search: bright_data.clone(),
            reddit_posts: bright_data,
            max_selected_urls: config.search.max_selected_urls,
        };
        Ok(Self::new(services)?)
    }

    /// Run the pipeline for one question and return the final state.
    pub async fn run(
        &self,
        user_question: &str,
        events: Option<mpsc::UnboundedSender<PlannerEvent>>,
    ) -> Result<ConversationState, GraphError> {
        let ctx = RunContext::new(events);
        tracing::info!(run_id = %ctx.run_id, "planning run started");
        build_graph(&self.services, ctx)
            .invoke(ConversationState::new(user_question))
            .await
    }

    /// Run the pipeline and return only the final answer.
    pub async fn ask(&self, user_question: &str) -> Result<Option<String>, GraphError> {
        Ok(self.run(user_question, None).await?.final_answer)
    }
}
