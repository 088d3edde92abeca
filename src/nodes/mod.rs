//! Pipeline steps.
//!
//! Each step is exposed twice: as a plain async function over explicit
//! inputs, and as a [`Node`](crate::graph::Node) that pulls those inputs
//! from the conversation state.

mod analyze;
mod extract;
mod reddit;
mod search;
mod synthesize;

pub use analyze::{analyze_bing, analyze_google, analyze_reddit, AnalyzeReddit, AnalyzeSerp};
pub use extract::{extract_trip_request, ExtractTripParameters};
pub use reddit::{
    filter_selection, retrieve_reddit_posts, select_reddit_urls, RetrieveRedditPosts, SelectRedditUrls,
};
pub use search::{RedditSearchNode, SerpSearchNode};
pub use synthesize::{synthesize, Analyses, SynthesizeAnalyses};
