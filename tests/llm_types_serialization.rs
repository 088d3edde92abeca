use roamer::llm::types::{Message, OutputSchema, Role};
use roamer::trip::{RedditUrlSelection, TripRequest};
use serde_json::json;

#[test]
fn serializes_user_message_with_text_content() {
    let msg = Message::user("hi");
    let value = serde_json::to_value(msg).unwrap();
    assert_eq!(value, json!({ "role": "user", "content": "hi" }));
}

#[test]
fn serializes_assistant_message_with_text_content() {
    let msg = Message::assistant("ok");
    let value = serde_json::to_value(msg).unwrap();
    assert_eq!(value, json!({ "role": "assistant", "content": "ok" }));
}

#[test]
fn pair_puts_system_first() {
    let messages = Message::pair("be terse", "hello");
    let value = serde_json::to_value(&messages).unwrap();
    assert_eq!(
        value,
        json!([
            { "role": "system", "content": "be terse" },
            { "role": "user", "content": "hello" }
        ])
    );
    assert_eq!(messages[0].role, Role::System);
}

#[test]
fn trip_request_schema_lists_required_fields() {
    let schema = OutputSchema::of::<TripRequest>("trip_request", "trip");
    assert!(schema.schema.get("$schema").is_none());

    let properties = schema.schema["properties"].as_object().unwrap();
    for key in ["destination", "days", "budget", "interests", "activities"] {
        assert!(properties.contains_key(key), "missing {key}");
    }
    let required: Vec<&str> = schema.schema["required"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert!(required.contains(&"destination"));
    assert!(required.contains(&"days"));
}

#[test]
fn trip_request_defaults_optional_fields() {
    let trip: TripRequest = serde_json::from_value(json!({ "destination": "Oslo", "days": 2 })).unwrap();
    assert_eq!(trip.budget, None);
    assert!(trip.interests.is_empty());
    assert!(trip.activities.is_empty());
}

#[test]
fn url_selection_deserializes() {
    let selection: RedditUrlSelection =
        serde_json::from_value(json!({ "selected_urls": ["https://www.reddit.com/r/a/comments/1/"] }))
            .unwrap();
    assert_eq!(selection.selected_urls.len(), 1);
}
