use crate::event::RunContext;
use crate::graph::{ConversationState, Field, FieldValue, Node, NodeError, StateUpdate};
use crate::llm::types::OutputSchema;
use crate::llm::{invoke_structured, LanguageModel, LlmError};
use crate::prompts;
use crate::trip::TripRequest;
use std::sync::Arc;

/// Turn a free-text question into a [`TripRequest`].
///
/// An empty (or whitespace-only) question yields `None` without a model call.
pub async fn extract_trip_request(
    llm: &dyn LanguageModel,
    user_question: &str,
) -> Result<Option<TripRequest>, LlmError> {
    if user_question.trim().is_empty() {
        return Ok(None);
    }

    let schema = OutputSchema::of::<TripRequest>(
        "trip_request",
        "Structured trip parameters extracted from the user's question",
    );
    let messages = prompts::trip_request_messages(user_question);
    let trip: TripRequest = invoke_structured(llm, &messages, &schema).await?;

    tracing::info!(
        destination = %trip.destination,
        days = trip.days,
        budget = ?trip.budget,
        interests = ?trip.interests,
        activities = ?trip.activities,
        "extracted trip request"
    );
    Ok(Some(trip))
}

pub struct ExtractTripParameters {
    llm: Arc<dyn LanguageModel>,
}

impl ExtractTripParameters {
    pub const ID: &'static str = "extract_trip_parameters";

    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }
}

#[async_trait::async_trait]
impl Node for ExtractTripParameters {
    fn id(&self) -> &str {
        Self::ID
    }

    fn reads(&self) -> &[Field] {
        &[Field::UserQuestion]
    }

    fn writes(&self) -> &[Field] {
        &[Field::TripRequest]
    }

    async fn run(&self, state: &ConversationState, ctx: &RunContext) -> Result<StateUpdate, NodeError> {
        ctx.progress(Self::ID, "Extracting trip parameters");
        let trip = extract_trip_request(self.llm.as_ref(), &state.user_question).await?;
        if let Some(trip) = &trip {
            ctx.progress(Self::ID, format!("Trip request: {trip}"));
        }
        Ok(StateUpdate::new().with(FieldValue::TripRequest(trip)))
    }

    /// Unparsable output means "search with the raw question".
    fn fallback(&self) -> StateUpdate {
        StateUpdate::new().with(FieldValue::TripRequest(None))
    }
}
