use crate::event::RunContext;
use crate::graph::{ConversationState, Field, FieldValue, Node, NodeError, StateUpdate};
use crate::llm::types::Message;
use crate::llm::{LanguageModel, LlmError};
use crate::prompts;
use crate::trip::{search_query, TripRequest};
use std::sync::Arc;

/// The three per-source analyses going into the final answer
#[derive(Debug, Clone, Copy, Default)]
pub struct Analyses<'a> {
    pub google: &'a str,
    pub bing: &'a str,
    pub reddit: &'a str,
}

/// Merge the per-source analyses into one answer.
pub async fn synthesize(
    llm: &dyn LanguageModel,
    search_context: &str,
    analyses: Analyses<'_>,
    trip_request: Option<&TripRequest>,
) -> Result<String, LlmError> {
    let messages = prompts::synthesis_messages(
        search_context,
        analyses.google,
        analyses.bing,
        analyses.reddit,
        trip_request,
    );
    let answer = llm.complete(&messages).await?;
    tracing::info!(chars = answer.len(), "final answer synthesized");
    Ok(answer)
}

pub struct SynthesizeAnalyses {
    llm: Arc<dyn LanguageModel>,
}

impl SynthesizeAnalyses {
    pub const ID: &'static str = "synthesize_analyses";

    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }
}

#[async_trait::async_trait]
impl Node for SynthesizeAnalyses {
    fn id(&self) -> &str {
        Self::ID
    }

    fn reads(&self) -> &[Field] {
        &[
            Field::UserQuestion,
            Field::TripRequest,
            Field::GoogleAnalysis,
            Field::BingAnalysis,
            Field::RedditAnalysis,
        ]
    }

    fn writes(&self) -> &[Field] {
        &[Field::FinalAnswer, Field::Messages]
    }

    async fn run(&self, state: &ConversationState, ctx: &RunContext) -> Result<StateUpdate, NodeError> {
        let trip = state.trip_request.as_ref();
        let context = search_query(trip, &state.user_question);
        ctx.progress(Self::ID, "Combining all results");

        let analyses = Analyses {
            google: state.google_analysis.as_deref().unwrap_or_default(),
            bing: state.bing_analysis.as_deref().unwrap_or_default(),
            reddit: state.reddit_analysis.as_deref().unwrap_or_default(),
        };
        let answer = synthesize(self.llm.as_ref(), &context, analyses, trip).await?;

        Ok(StateUpdate::new()
            .with(FieldValue::Messages(vec![Message::assistant(answer.clone())]))
            .with(FieldValue::FinalAnswer(answer)))
    }
}
