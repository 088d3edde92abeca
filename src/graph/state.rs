use crate::llm::types::Message;
use crate::search::{RedditPost, RedditSearchHit, SerpResults};
use crate::trip::TripRequest;
use dashflow::MergeableState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Addressable fields of [`ConversationState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    UserQuestion,
    Messages,
    TripRequest,
    GoogleResults,
    BingResults,
    RedditResults,
    SelectedRedditUrls,
    RedditPostData,
    GoogleAnalysis,
    BingAnalysis,
    RedditAnalysis,
    FinalAnswer,
}

impl Field {
    /// Fields populated before the graph starts.
    pub fn is_input(&self) -> bool {
        matches!(self, Field::UserQuestion | Field::Messages)
    }

    /// Append-merged rather than write-once.
    pub fn is_append_only(&self) -> bool {
        matches!(self, Field::Messages)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::UserQuestion => "user_question",
            Field::Messages => "messages",
            Field::TripRequest => "trip_request",
            Field::GoogleResults => "google_results",
            Field::BingResults => "bing_results",
            Field::RedditResults => "reddit_results",
            Field::SelectedRedditUrls => "selected_reddit_urls",
            Field::RedditPostData => "reddit_post_data",
            Field::GoogleAnalysis => "google_analysis",
            Field::BingAnalysis => "bing_analysis",
            Field::RedditAnalysis => "reddit_analysis",
            Field::FinalAnswer => "final_answer",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field write produced by a node
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    TripRequest(Option<TripRequest>),
    GoogleResults(Option<SerpResults>),
    BingResults(Option<SerpResults>),
    RedditResults(Vec<RedditSearchHit>),
    SelectedRedditUrls(Vec<String>),
    RedditPostData(Vec<RedditPost>),
    GoogleAnalysis(String),
    BingAnalysis(String),
    RedditAnalysis(String),
    FinalAnswer(String),
    /// Appended to the message log
    Messages(Vec<Message>),
}

impl FieldValue {
    pub fn field(&self) -> Field {
        match self {
            FieldValue::TripRequest(_) => Field::TripRequest,
            FieldValue::GoogleResults(_) => Field::GoogleResults,
            FieldValue::BingResults(_) => Field::BingResults,
            FieldValue::RedditResults(_) => Field::RedditResults,
            FieldValue::SelectedRedditUrls(_) => Field::SelectedRedditUrls,
            FieldValue::RedditPostData(_) => Field::RedditPostData,
            FieldValue::GoogleAnalysis(_) => Field::GoogleAnalysis,
            FieldValue::BingAnalysis(_) => Field::BingAnalysis,
            FieldValue::RedditAnalysis(_) => Field::RedditAnalysis,
            FieldValue::FinalAnswer(_) => Field::FinalAnswer,
            FieldValue::Messages(_) => Field::Messages,
        }
    }
}

/// Partial state produced by one node run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    values: Vec<FieldValue>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, value: FieldValue) -> Self {
        self.values.push(value);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.values.iter().map(FieldValue::field)
    }
}

/// Per-question state threaded through the graph.
///
/// `None` means "not written (yet)". Apart from `messages`, each field
/// accepts exactly one write per run. Parallel branches each get a clone
/// and are joined back by [`MergeableState::merge`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    pub user_question: String,
    pub messages: Vec<Message>,
    pub trip_request: Option<TripRequest>,
    pub google_results: Option<SerpResults>,
    pub bing_results: Option<SerpResults>,
    pub reddit_results: Option<Vec<RedditSearchHit>>,
    pub selected_reddit_urls: Option<Vec<String>>,
    pub reddit_post_data: Option<Vec<RedditPost>>,
    pub google_analysis: Option<String>,
    pub bing_analysis: Option<String>,
    pub reddit_analysis: Option<String>,
    pub final_answer: Option<String>,
    written: BTreeSet<Field>,
}

impl ConversationState {
    /// Fresh state for one question; the question opens the message log.
    pub fn new(user_question: impl Into<String>) -> Self {
        let user_question = user_question.into();
        Self {
            messages: vec![Message::user(user_question.clone())],
            user_question,
            ..Self::default()
        }
    }

    /// Whether `field` has received its write in this run.
    pub fn is_written(&self, field: Field) -> bool {
        field.is_input() || self.written.contains(&field)
    }

    /// Merge a node's update, enforcing write-once on every non-append field.
    ///
    /// On a second write the offending field is returned and the state is
    /// left as it was before that value.
    pub fn apply(&mut self, update: StateUpdate) -> Result<(), Field> {
        for value in update.values {
            let field = value.field();
            if !field.is_append_only() && !self.written.insert(field) {
                return Err(field);
            }

            match value {
                FieldValue::TripRequest(v) => self.trip_request = v,
                FieldValue::GoogleResults(v) => self.google_results = v,
                FieldValue::BingResults(v) => self.bing_results = v,
                FieldValue::RedditResults(v) => self.reddit_results = Some(v),
                FieldValue::SelectedRedditUrls(v) => self.selected_reddit_urls = Some(v),
                FieldValue::RedditPostData(v) => self.reddit_post_data = Some(v),
                FieldValue::GoogleAnalysis(v) => self.google_analysis = Some(v),
                FieldValue::BingAnalysis(v) => self.bing_analysis = Some(v),
                FieldValue::RedditAnalysis(v) => self.reddit_analysis = Some(v),
                FieldValue::FinalAnswer(v) => self.final_answer = Some(v),
                FieldValue::Messages(v) => self.messages.extend(v),
            }
        }
        Ok(())
    }

    /// Take `field` from `other` if this state has not written it yet.
    fn adopt(&mut self, other: &Self, field: Field) {
        if !other.written.contains(&field) || !self.written.insert(field) {
            return;
        }
        match field {
            Field::TripRequest => self.trip_request = other.trip_request.clone(),
            Field::GoogleResults => self.google_results = other.google_results.clone(),
            Field::BingResults => self.bing_results = other.bing_results.clone(),
            Field::RedditResults => self.reddit_results = other.reddit_results.clone(),
            Field::SelectedRedditUrls => {
                self.selected_reddit_urls = other.selected_reddit_urls.clone()
            }
            Field::RedditPostData => self.reddit_post_data = other.reddit_post_data.clone(),
            Field::GoogleAnalysis => self.google_analysis = other.google_analysis.clone(),
            Field::BingAnalysis => self.bing_analysis = other.bing_analysis.clone(),
            Field::RedditAnalysis => self.reddit_analysis = other.reddit_analysis.clone(),
            Field::FinalAnswer => self.final_answer = other.final_answer.clone(),
            Field::UserQuestion | Field::Messages => {}
        }
    }
}

/// Joins a parallel branch into this one.
///
/// Branches start from the same state, so a field is taken from `other`
/// only when this side never wrote it, and messages past the shared
/// prefix are appended.
impl MergeableState for ConversationState {
    fn merge(&mut self, other: &Self) {
        for &field in &other.written {
            self.adopt(other, field);
        }

        let shared = self
            .messages
            .iter()
            .zip(&other.messages)
            .take_while(|(a, b)| a == b)
            .count();
        self.messages.extend(other.messages[shared..].iter().cloned());
    }
}
