mod common;

use common::*;
use roamer::cli::chat_loop;

async fn run_chat(harness: &Harness, input: &str) -> String {
    let planner = harness.planner();
    let mut out = Vec::new();
    chat_loop(&planner, input.as_bytes(), &mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn exit_ends_loop_without_running_graph() {
    let harness = Harness::tokyo();
    let out = run_chat(&harness, "  EXIT \nPlan a trip to Rome\n").await;

    assert!(out.contains("Bye!"));
    assert!(harness.llm.calls().is_empty());
    assert!(harness.serp.queries().is_empty());
}

#[tokio::test]
async fn answers_then_exits() {
    let harness = Harness::tokyo();
    let out = run_chat(&harness, &format!("\n{TOKYO_QUESTION}\nexit\n")).await;

    assert!(out.contains(&format!("Searching Google for: {TOKYO_QUERY}")));
    assert!(out.contains("Final Answer:"));
    assert!(out.contains("Plan drawing on Google, Bing and Reddit."));
    assert!(out.trim_end().ends_with("Bye!"));
    assert_eq!(harness.llm.calls_for(Step::Synthesis).len(), 1);
}

#[tokio::test]
async fn failed_turn_does_not_end_session() {
    let harness = Harness::new(
        MockLlm::tokyo().failing(Step::Synthesis),
        MockSerp::default(),
        MockRedditSearch::with_hits(tokyo_hits()),
        MockRetrieval::default(),
    );
    let out = run_chat(&harness, &format!("{TOKYO_QUESTION}\n{TOKYO_QUESTION}\n")).await;

    assert_eq!(out.matches("Error: ").count(), 2);
    assert_eq!(harness.llm.calls_for(Step::Synthesis).len(), 2);
}

#[tokio::test]
async fn end_of_input_ends_loop() {
    let harness = Harness::tokyo();
    let out = run_chat(&harness, "").await;
    assert!(out.contains("Ask me anything: "));
    assert!(harness.llm.calls().is_empty());
}
