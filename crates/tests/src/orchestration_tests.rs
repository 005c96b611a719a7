use tokio::time::{Duration, sleep};

use callpilot_orchestration::{AssistEvent, OrchestratorConfig, OrchestratorState};

use crate::fixtures::test_session::{
    CountingGenerator, ScriptedAdequacy, ScriptedChecklist, TestSession, standard_items,
};

async fn sleep_ms(ms: u64) {
    sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn client_pause_triggers_exactly_one_generation() {
    let s = TestSession::start(
        TestSession::scenario_config(),
        standard_items(),
        ScriptedAdequacy::adequate(),
        ScriptedChecklist::empty(),
        CountingGenerator::instant(),
    );

    s.caption("You", "Could you walk me through your goals?").await;
    s.caption("Dana", "we want to grow").await;
    sleep_ms(1000).await;
    s.caption("Dana", "we want to grow to around fifty thousand a month")
        .await;

    // Pause check is scheduled 4s after the last client activity.
    sleep_ms(6000).await;

    assert_eq!(s.generator.call_count(), 1);
    let view = s.view().await;
    assert_eq!(view.state, OrchestratorState::WaitingForAnswer);
    let prompt = view.current_prompt.expect("one prompt should be live");
    assert_eq!(prompt.prompt, "Scripted question 1?");

    // The same turn never re-triggers, no matter how long the silence.
    sleep_ms(10_000).await;
    assert_eq!(s.generator.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn inflight_generation_blocks_second_trigger() {
    let s = TestSession::start(
        TestSession::scenario_config(),
        standard_items(),
        ScriptedAdequacy::adequate(),
        ScriptedChecklist::empty(),
        CountingGenerator::slow(6000),
    );

    s.caption("You", "What does success look like for you?").await;
    s.caption("Dana", "honestly success for us means doubling revenue")
        .await;

    // t=4000: pause fires, generation starts and stays in flight until
    // t=10000.
    sleep_ms(4100).await;
    assert_eq!(s.generator.call_count(), 1);

    // Client adds more words, pausing again at t=8100; that second
    // qualifying trigger must be swallowed by the in-flight guard.
    s.caption("Dana", "and we also want to expand into new markets")
        .await;
    sleep_ms(5000).await;
    assert_eq!(s.generator.call_count(), 1);

    // After the slow generation lands there is exactly one prompt.
    sleep_ms(2000).await;
    assert_eq!(s.generator.call_count(), 1);
    let view = s.view().await;
    assert_eq!(view.current_prompt.expect("prompt").prompt, "Scripted question 1?");
}

#[tokio::test(start_paused = true)]
async fn min_interval_rate_limits_generations() {
    let config = OrchestratorConfig {
        min_question_interval_ms: 20_000,
        ..TestSession::scenario_config()
    };
    let s = TestSession::start(
        config,
        standard_items(),
        ScriptedAdequacy::adequate(),
        ScriptedChecklist::empty(),
        CountingGenerator::instant(),
    );

    s.caption("You", "Could you share your revenue target?").await;
    s.caption("Dana", "we are aiming for fifty thousand a month")
        .await;
    // First generation fires off the pause at t=4000.
    sleep_ms(4500).await;
    assert_eq!(s.generator.call_count(), 1);

    // A second qualifying answer+pause well inside the interval stays
    // suppressed.
    s.caption("Dana", "and our team is five people right now").await;
    sleep_ms(6000).await;
    assert_eq!(s.generator.call_count(), 1);

    // Past the interval the next pause generates again.
    sleep_ms(15_000).await;
    s.caption("Dana", "we would want to launch before the summer")
        .await;
    sleep_ms(4500).await;
    assert_eq!(s.generator.call_count(), 2);
    let view = s.view().await;
    assert_eq!(view.current_prompt.expect("prompt").prompt, "Scripted question 2?");
}

#[tokio::test(start_paused = true)]
async fn exhausted_checklist_never_generates() {
    let checklist = ScriptedChecklist::empty();
    let s = TestSession::start(
        TestSession::scenario_config(),
        vec![crate::fixtures::test_session::item(1, "Revenue target", true)],
        ScriptedAdequacy::adequate(),
        checklist,
        CountingGenerator::instant(),
    );
    s.checklist
        .push(vec![crate::fixtures::test_session::completion(1, 0.9)])
        .await;

    s.caption("You", "Could you share your revenue target?").await;
    s.caption("Dana", "we are aiming for fifty thousand a month")
        .await;
    sleep_ms(500).await;

    // The only item is now complete; the client pause that follows must not
    // transition into generating.
    let view = s.view().await;
    assert!(view.checklist[0].completed);

    sleep_ms(6000).await;
    assert_eq!(s.generator.call_count(), 0);
    assert_eq!(s.view().await.state, OrchestratorState::Idle);
}

#[tokio::test(start_paused = true)]
async fn resumed_speech_defers_the_pause() {
    let s = TestSession::start(
        TestSession::scenario_config(),
        standard_items(),
        ScriptedAdequacy::adequate(),
        ScriptedChecklist::empty(),
        CountingGenerator::instant(),
    );

    s.caption("You", "What timeline are you working against?").await;
    s.caption("Dana", "well we were thinking").await;
    // Client resumes just before the first pause deadline; the check must
    // restart from the new activity, not fire early.
    sleep_ms(3900).await;
    s.caption("Dana", "well we were thinking maybe this autumn").await;

    sleep_ms(3100).await; // t=7000, still within the new debounce window
    assert_eq!(s.generator.call_count(), 0);

    sleep_ms(1500).await; // t=8500, past the t=7900 deadline
    assert_eq!(s.generator.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn adequacy_fallback_gates_on_substance() {
    // Analyzer always errors, so the core's heuristic fallback decides.
    let config = OrchestratorConfig {
        generate_initial_question: true,
        ..OrchestratorConfig::default()
    };
    let s = TestSession::start(
        config,
        standard_items(),
        ScriptedAdequacy::failing(),
        ScriptedChecklist::empty(),
        CountingGenerator::instant(),
    );

    // Opening question arrives at t=2000 without any captions.
    sleep_ms(2500).await;
    assert_eq!(s.generator.call_count(), 1);
    assert_eq!(s.view().await.state, OrchestratorState::WaitingForAnswer);

    // A bare filler answer pauses, but the fallback rejects it. (The agent
    // reads the question out loud first; evaluation waits for a two-sided
    // exchange.)
    s.caption("You", "Let me start with the first question.").await;
    s.caption("Dana", "not really").await;
    sleep_ms(6000).await;
    assert_eq!(s.adequacy.call_count(), 1, "analyzer consulted and failed");
    assert_eq!(s.generator.call_count(), 1, "filler answer must not advance");

    // The client elaborates within the same turn; now the fallback accepts.
    s.caption("Dana", "we are hoping to double revenue by next spring")
        .await;
    sleep_ms(6000).await;
    assert_eq!(s.generator.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_generation_recovers_on_next_trigger() {
    let s = TestSession::start(
        TestSession::scenario_config(),
        standard_items(),
        ScriptedAdequacy::adequate(),
        ScriptedChecklist::empty(),
        CountingGenerator::failing(),
    );

    s.caption("You", "How big is the team today?").await;
    s.caption("Dana", "there are five of us full time").await;
    sleep_ms(5000).await;

    assert_eq!(s.generator.call_count(), 1);
    let view = s.view().await;
    assert_eq!(view.state, OrchestratorState::Idle, "failure lands back in idle");
    assert!(view.current_prompt.is_none(), "no prompt on failure");

    // The next natural trigger simply tries again.
    s.caption("Dana", "although we are hiring two more people").await;
    sleep_ms(6000).await;
    assert_eq!(s.generator.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn prompt_updates_are_broadcast() {
    let mut s = TestSession::start(
        TestSession::scenario_config(),
        standard_items(),
        ScriptedAdequacy::adequate(),
        ScriptedChecklist::empty(),
        CountingGenerator::instant(),
    );

    s.caption("You", "Where do you want the business to be next year?")
        .await;
    s.caption("Dana", "we want three new enterprise customers").await;
    sleep_ms(6000).await;

    let events = s.drain_events();
    let prompts: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, AssistEvent::PromptUpdated { .. }))
        .collect();
    assert_eq!(prompts.len(), 1);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, AssistEvent::SegmentAppended { .. })),
        "segment events precede the prompt"
    );
}

#[tokio::test(start_paused = true)]
async fn stopped_session_rejects_captions() {
    let s = TestSession::start(
        TestSession::scenario_config(),
        standard_items(),
        ScriptedAdequacy::adequate(),
        ScriptedChecklist::empty(),
        CountingGenerator::instant(),
    );

    s.caption("You", "Thanks for joining today.").await;
    let view = s.engine.stop_session(s.session_id).await;
    assert!(view.is_some(), "stop returns the final snapshot");
    sleep_ms(100).await;

    assert!(!s.engine.is_active(&s.session_id));
    assert_eq!(s.engine.active_session_count(), 0);
    let delivered = s
        .engine
        .send_caption(
            s.session_id,
            callpilot_orchestration::CaptionEvent {
                speaker_name: "Dana".to_string(),
                text: "are we still on?".to_string(),
                timestamp: chrono::Utc::now(),
            },
        )
        .await;
    assert!(!delivered);
}
