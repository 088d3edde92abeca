//! Prompt templates for every model call in the pipeline.
//!
//! Each builder returns a system + user message pair.

use crate::llm::types::Message;
use crate::trip::TripRequest;

pub const TRIP_REQUEST_SYSTEM: &str = "You are an expert travel planner and data extractor. \
Read the user's input carefully and extract:\n\
1. destination: the city, country or region the user wants to visit.\n\
2. days: the number of days for the trip.\n\
3. budget: the total budget as a number if mentioned, otherwise null.\n\
4. interests: the user's interests or travel preferences (e.g. food, adventure, museums, beaches); empty list if none.\n\
5. activities: specific activities the user wants to do (e.g. hiking, snorkeling, cooking class); empty list if none.\n\n\
Respond only with JSON matching the provided schema.";

pub const REDDIT_URL_SELECTION_SYSTEM: &str = "You are an expert at analyzing social media content. \
Examine the Reddit search results and pick the posts most likely to add valuable information for answering the user's question.\n\n\
Prefer posts that:\n\
- relate directly to the user's question\n\
- contain detailed discussion or first-hand expertise\n\
- have high engagement (upvotes, comments)\n\
- offer unique perspectives or insights\n\n\
Only return URLs that appear in the results. Respond with the selected URLs in the provided schema.";

pub const GOOGLE_ANALYSIS_SYSTEM: &str = "You are an expert research analyst. \
Analyze the provided Google search results and extract the key insights that answer the user's question.\n\n\
Focus on:\n\
- main factual information and authoritative sources\n\
- official websites and reliable guides\n\
- key prices, dates, opening hours and other verifiable details\n\
- conflicting information between sources\n\n\
Give a concise analysis of the most relevant findings.";

pub const BING_ANALYSIS_SYSTEM: &str = "You are an expert research analyst. \
Analyze the provided Bing search results and extract insights that complement other search sources.\n\n\
Focus on:\n\
- perspectives not covered elsewhere\n\
- practical details such as transport, bookings and logistics\n\
- news and recent developments affecting travel\n\n\
Give a concise analysis highlighting unique findings.";

pub const REDDIT_ANALYSIS_SYSTEM: &str = "You are a travel research expert analyzing social media discussions. \
Extract insights that help the user plan their trip.\n\n\
Focus on:\n\
- community experiences and tips\n\
- recommended activities and places\n\
- warnings and pitfalls mentioned by users\n\
- popular or highly upvoted opinions\n\n\
When referencing specific content, quote it directly and mention the subreddit or thread. \
Cover positive and negative experiences as well as disagreements.";

pub const SYNTHESIS_SYSTEM: &str = "You are an expert research synthesizer. \
Combine the analyses from different sources into one comprehensive, well-structured answer.\n\n\
Your task:\n\
- merge the insights from the Google, Bing and Reddit analyses\n\
- identify common themes and conflicting information\n\
- present a balanced view across perspectives\n\
- structure the answer in clear sections\n\
- cite the source type (Google, Bing, Reddit) for key claims\n\
- call out contradictions and uncertainties\n\n\
Answer the user's question from multiple angles.";

fn trip_details(trip_request: Option<&TripRequest>) -> String {
    trip_request
        .map(|trip| format!("\nTrip Request Details: {trip}"))
        .unwrap_or_default()
}

pub fn trip_request_messages(user_input: &str) -> Vec<Message> {
    Message::pair(TRIP_REQUEST_SYSTEM, format!("User Input: {user_input}"))
}

pub fn reddit_url_selection_messages(
    user_question: &str,
    reddit_results: &str,
    trip_request: Option<&TripRequest>,
) -> Vec<Message> {
    let user = format!(
        "Question: {user_question}{}\n\n\
Reddit Results:\n{reddit_results}\n\n\
Select the most valuable posts for answering the user's question.",
        trip_details(trip_request)
    );
    Message::pair(REDDIT_URL_SELECTION_SYSTEM, user)
}

pub fn google_analysis_messages(
    search_context: &str,
    google_results: &str,
    trip_request: Option<&TripRequest>,
) -> Vec<Message> {
    let user = format!(
        "Question: {search_context}{}\n\n\
Google Search Results:\n{google_results}\n\n\
Based on this information, provide actionable insights for planning the trip:\n\
- recommended places to visit\n\
- popular activities matching the user's interests\n\
- relevant travel tips and considerations\n\
- a summary of conflicting information or choices\n\n\
Use a clear, structured format.",
        trip_details(trip_request)
    );
    Message::pair(GOOGLE_ANALYSIS_SYSTEM, user)
}

pub fn bing_analysis_messages(
    search_context: &str,
    bing_results: &str,
    trip_request: Option<&TripRequest>,
) -> Vec<Message> {
    let user = format!(
        "Question: {search_context}{}\n\n\
Bing Search Results:\n{bing_results}\n\n\
Analyze these Bing results and extract insights that complement other search sources.",
        trip_details(trip_request)
    );
    Message::pair(BING_ANALYSIS_SYSTEM, user)
}

pub fn reddit_analysis_messages(
    search_context: &str,
    reddit_results: &str,
    reddit_post_data: &str,
    trip_request: Option<&TripRequest>,
) -> Vec<Message> {
    let user = format!(
        "Question: {search_context}{}\n\n\
Reddit Search Results:\n{reddit_results}\n\n\
Detailed Reddit Post Data:\n{reddit_post_data}\n\n\
Analyze this Reddit content and extract community insights, user experiences and relevant discussions.",
        trip_details(trip_request)
    );
    Message::pair(REDDIT_ANALYSIS_SYSTEM, user)
}

pub fn synthesis_messages(
    search_context: &str,
    google_analysis: &str,
    bing_analysis: &str,
    reddit_analysis: &str,
    trip_request: Option<&TripRequest>,
) -> Vec<Message> {
    let user = format!(
        "Question: {search_context}{}\n\n\
Google Analysis:\n{google_analysis}\n\n\
Bing Analysis:\n{bing_analysis}\n\n\
Reddit Community Analysis:\n{reddit_analysis}\n\n\
Synthesize these analyses into a comprehensive trip plan:\n\
- highlight recommended destinations, activities and interests\n\
- include pros and cons or conflicting opinions\n\
- present the answer in a structured, readable format\n\
- use a section per source where it helps",
        trip_details(trip_request)
    );
    Message::pair(SYNTHESIS_SYSTEM, user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::Role;

    #[test]
    fn builders_return_system_then_user() {
        let messages = google_analysis_messages("Trip to Rome,activities:,interests:", "", None);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, GOOGLE_ANALYSIS_SYSTEM);
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.starts_with("Question: Trip to Rome"));
    }

    #[test]
    fn trip_details_are_included_when_present() {
        let trip = TripRequest {
            destination: "Rome".to_string(),
            days: 2,
            budget: None,
            interests: vec!["history".to_string()],
            activities: vec![],
        };
        let messages = synthesis_messages("ctx", "g", "b", "r", Some(&trip));
        assert!(messages[1]
            .content
            .contains("Trip Request Details: destination: Rome, days: 2"));

        let without = synthesis_messages("ctx", "g", "b", "r", None);
        assert!(!without[1].content.contains("Trip Request Details"));
    }

    #[test]
    fn reddit_analysis_carries_both_inputs() {
        let messages = reddit_analysis_messages("ctx", "RAW HITS", "POST DATA", None);
        assert!(messages[1].content.contains("RAW HITS"));
        assert!(messages[1].content.contains("POST DATA"));
    }
}
