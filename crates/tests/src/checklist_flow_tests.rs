use tokio::time::{Duration, sleep};

use callpilot_orchestration::AssistEvent;

use crate::fixtures::test_session::{
    CountingGenerator, ScriptedAdequacy, ScriptedChecklist, TestSession, completion,
    standard_items,
};

async fn sleep_ms(ms: u64) {
    sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn completions_fold_in_monotonically() {
    let mut s = TestSession::start(
        TestSession::scenario_config(),
        standard_items(),
        ScriptedAdequacy::adequate(),
        ScriptedChecklist::empty(),
        CountingGenerator::instant(),
    );
    // Round 1 completes item 1; round 2 re-reports item 1 and adds item 2;
    // round 3 only has a sub-threshold item 3.
    s.checklist.push(vec![completion(1, 0.9)]).await;
    s.checklist
        .push(vec![completion(1, 0.99), completion(2, 0.85)])
        .await;
    s.checklist.push(vec![completion(3, 0.5)]).await;

    s.caption("You", "What revenue are you targeting?").await;
    s.caption("Dana", "fifty thousand a month by december").await;
    sleep_ms(200).await;

    s.caption("You", "And how big is the team?").await;
    s.caption("Dana", "five people full time right now").await;
    sleep_ms(200).await;

    s.caption("You", "When would you want to start?").await;
    s.caption("Dana", "maybe sometime next year, not sure").await;
    sleep_ms(200).await;

    assert_eq!(s.checklist.call_count(), 3, "one analysis per client turn");

    let view = s.view().await;
    let by_id = |id: i64| {
        view.checklist
            .iter()
            .find(|i| i.id == id)
            .expect("item exists")
    };
    assert!(by_id(1).completed);
    assert!(by_id(2).completed);
    assert!(!by_id(3).completed, "sub-threshold completion ignored");
    assert_eq!(
        by_id(1).extracted_info.as_deref(),
        Some("scripted extraction")
    );

    // Item 1 completed exactly once even though it was reported twice.
    let completions: Vec<i64> = s
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            AssistEvent::ChecklistItemCompleted { item, .. } => Some(item.id),
            _ => None,
        })
        .collect();
    assert_eq!(completions, vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn updates_within_a_turn_do_not_reanalyze() {
    let s = TestSession::start(
        TestSession::scenario_config(),
        standard_items(),
        ScriptedAdequacy::adequate(),
        ScriptedChecklist::empty(),
        CountingGenerator::instant(),
    );

    s.caption("You", "Tell me about your goals.").await;
    s.caption("Dana", "we want to").await;
    sleep_ms(200).await;
    // Word-by-word rewrites of the same utterance must not fan out extra
    // analysis calls.
    s.caption("Dana", "we want to double").await;
    s.caption("Dana", "we want to double our revenue").await;
    sleep_ms(200).await;

    assert_eq!(s.checklist.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn empty_checklist_skips_analysis_entirely() {
    let s = TestSession::start(
        TestSession::scenario_config(),
        Vec::new(),
        ScriptedAdequacy::adequate(),
        ScriptedChecklist::empty(),
        CountingGenerator::instant(),
    );

    s.caption("You", "Anything you want to cover?").await;
    s.caption("Dana", "just wanted to say hello really").await;
    sleep_ms(6000).await;

    assert_eq!(s.checklist.call_count(), 0);
    // And with nothing pending, no questions are ever suggested either.
    assert_eq!(s.generator.call_count(), 0);
}
