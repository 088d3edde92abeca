//! Structured trip parameters and the search query derived from them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trip parameters extracted from a free-text question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TripRequest {
    /// Destination city or country
    pub destination: String,
    /// Number of days for the trip
    pub days: u32,
    /// Total budget if provided
    #[serde(default)]
    pub budget: Option<f64>,
    /// User interests (e.g. food, adventure, museums)
    #[serde(default)]
    pub interests: Vec<String>,
    /// Activities the user explicitly wants to do (e.g. hiking, snorkeling)
    #[serde(default)]
    pub activities: Vec<String>,
}

impl fmt::Display for TripRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "destination: {}, days: {}", self.destination, self.days)?;
        if let Some(budget) = self.budget {
            write!(f, ", budget: {budget}")?;
        }
        write!(
            f,
            ", interests: [{}], activities: [{}]",
            self.interests.join(", "),
            self.activities.join(", ")
        )
    }
}

/// Reddit threads chosen for a deep-dive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RedditUrlSelection {
    /// Reddit URLs that contain valuable information for answering the user's question
    pub selected_urls: Vec<String>,
}

/// Build the query shared by every search and analysis step.
///
/// With a trip request: `Trip to {destination},activities:{..},interests:{..}`
/// with both lists comma-joined in order. Without one, the question is used
/// verbatim.
pub fn search_query(trip_request: Option<&TripRequest>, user_question: &str) -> String {
    match trip_request {
        Some(trip) => format!(
            "Trip to {},activities:{},interests:{}",
            trip.destination,
            trip.activities.join(","),
            trip.interests.join(",")
        ),
        None => user_question.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokyo() -> TripRequest {
        TripRequest {
            destination: "Tokyo".to_string(),
            days: 3,
            budget: Some(1000.0),
            interests: vec!["food".to_string()],
            activities: vec![],
        }
    }

    #[test]
    fn query_embeds_destination_activities_and_interests() {
        assert_eq!(
            search_query(Some(&tokyo()), "ignored"),
            "Trip to Tokyo,activities:,interests:food"
        );
    }

    #[test]
    fn query_keeps_list_order() {
        let trip = TripRequest {
            activities: vec!["hiking".to_string(), "onsen".to_string()],
            interests: vec!["nature".to_string(), "food".to_string(), "temples".to_string()],
            ..tokyo()
        };
        assert_eq!(
            search_query(Some(&trip), ""),
            "Trip to Tokyo,activities:hiking,onsen,interests:nature,food,temples"
        );
    }

    #[test]
    fn query_falls_back_to_question() {
        assert_eq!(
            search_query(None, "Where should I eat in Osaka?"),
            "Where should I eat in Osaka?"
        );
    }

    #[test]
    fn missing_lists_default_to_empty() {
        let trip: TripRequest =
            serde_json::from_str(r#"{"destination":"Lima","days":5,"budget":null}"#).unwrap();
        assert!(trip.interests.is_empty());
        assert!(trip.activities.is_empty());
        assert_eq!(trip.budget, None);
    }

    #[test]
    fn display_omits_missing_budget() {
        let trip = TripRequest { budget: None, ..tokyo() };
        assert_eq!(
            trip.to_string(),
            "destination: Tokyo, days: 3, interests: [food], activities: []"
        );
    }
}
