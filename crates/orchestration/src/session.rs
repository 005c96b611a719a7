use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Duration, Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::adequacy::AdequacyGate;
use crate::checklist::ChecklistProgressTracker;
use crate::collaborator::{
    AnalyzerError, AnswerQuality, ChecklistCompletion, Collaborators, GeneratedQuestion,
    GenerationRequest,
};
use crate::config::OrchestratorConfig;
use crate::normalizer::{CaptionNormalizer, SegmentDelta};
use crate::orchestrator::{OrchestratorState, QuestionOrchestrator};
use crate::turns::{PauseCheck, TurnTracker};
use crate::{AssistEvent, CaptionEvent, ChecklistItem, QuestionPrompt, Speaker, TranscriptSegment};

/// Commands accepted by a session worker.
pub enum SessionCommand {
    Caption(CaptionEvent),
    View(oneshot::Sender<SessionView>),
    Stop,
}

/// Read-only snapshot of a live session for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    #[serde(serialize_with = "bson::serde_helpers::serialize_object_id_as_hex_string")]
    pub session_id: ObjectId,
    pub meeting_url: String,
    pub state: OrchestratorState,
    pub current_prompt: Option<QuestionPrompt>,
    pub checklist: Vec<ChecklistItem>,
    pub transcript: Vec<TranscriptSegment>,
    pub client_name: Option<String>,
}

/// Why the evaluation timer is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckReason {
    /// Debounced client-inactivity check; re-verifies elapsed time on fire.
    ClientPause,
    /// The agent took the floor; evaluate after a short grace period.
    AgentFloor,
}

/// Results of spawned collaborator calls, delivered back into the mailbox.
enum TaskOutcome {
    Adequacy(AnswerQuality),
    Generation(Result<GeneratedQuestion, AnalyzerError>),
    Checklist(Result<Vec<ChecklistCompletion>, AnalyzerError>),
}

/// Per-session actor task owning the entire mutable state bag: transcript,
/// checklist, turn tracking and the question state machine.
///
/// Caption events are processed strictly in arrival order. Collaborator calls
/// are spawned with their guard flags already set, and their results re-enter
/// through the same mailbox, so guard-then-act sequences never interleave
/// with other event handling.
pub struct SessionWorker {
    session_id: ObjectId,
    meeting_url: String,
    config: OrchestratorConfig,
    collaborators: Arc<Collaborators>,
    normalizer: CaptionNormalizer,
    turns: TurnTracker,
    gate: AdequacyGate,
    orchestrator: QuestionOrchestrator,
    checklist: ChecklistProgressTracker,
    transcript: Vec<TranscriptSegment>,
    eval_in_flight: bool,
    events_tx: broadcast::Sender<AssistEvent>,
    last_emitted_state: OrchestratorState,
}

impl SessionWorker {
    pub fn new(
        session_id: ObjectId,
        meeting_url: String,
        checklist_items: Vec<ChecklistItem>,
        config: OrchestratorConfig,
        collaborators: Arc<Collaborators>,
        events_tx: broadcast::Sender<AssistEvent>,
    ) -> Self {
        let normalizer = CaptionNormalizer::new(config.min_caption_chars);
        let turns = TurnTracker::new(&config);
        let gate = AdequacyGate::new(&config);
        let orchestrator = QuestionOrchestrator::new(&config);
        let checklist =
            ChecklistProgressTracker::new(checklist_items, config.completion_confidence_threshold);

        Self {
            session_id,
            meeting_url,
            config,
            collaborators,
            normalizer,
            turns,
            gate,
            orchestrator,
            checklist,
            transcript: Vec::new(),
            eval_in_flight: false,
            events_tx,
            last_emitted_state: OrchestratorState::Idle,
        }
    }

    /// Runs the worker until `Stop` arrives or the command channel closes.
    pub async fn run(mut self, mut cmd_rx: mpsc::Receiver<SessionCommand>) {
        info!(
            session_id = %self.session_id,
            meeting_url = %self.meeting_url,
            checklist_items = self.checklist.items().len(),
            "Session worker started"
        );

        let (outcome_tx, mut outcome_rx) = mpsc::channel::<TaskOutcome>(16);

        // Evaluation trigger timer; a single slot means a pause check and an
        // agent-floor check can never be pending at the same time.
        let mut check_at: Option<(Instant, CheckReason)> = None;

        let mut initial_at = (self.config.generate_initial_question
            && !self.checklist.is_empty())
        .then(|| Instant::now() + Duration::from_millis(self.config.initial_question_delay_ms));

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(SessionCommand::Caption(event)) => {
                        self.on_caption(event, &outcome_tx, &mut check_at);
                    }
                    Some(SessionCommand::View(reply)) => {
                        let _ = reply.send(self.view());
                    }
                    Some(SessionCommand::Stop) | None => break,
                },
                Some(outcome) = outcome_rx.recv() => {
                    self.on_outcome(outcome, &outcome_tx);
                }
                _ = wait_until(check_at.map(|(at, _)| at)) => {
                    if let Some((_, reason)) = check_at.take() {
                        self.on_check_timer(reason, &outcome_tx, &mut check_at);
                    }
                }
                _ = wait_until(initial_at) => {
                    initial_at = None;
                    self.try_generate(Instant::now(), &outcome_tx);
                    self.emit_state();
                }
            }
        }

        self.orchestrator.reset();
        debug!(session_id = %self.session_id, "Session worker stopped");
    }

    fn on_caption(
        &mut self,
        event: CaptionEvent,
        outcome_tx: &mpsc::Sender<TaskOutcome>,
        check_at: &mut Option<(Instant, CheckReason)>,
    ) {
        let Some(delta) = self.normalizer.apply(&event) else {
            return;
        };
        let now = Instant::now();

        match delta {
            SegmentDelta::Updated(segment) => {
                if let Some(last) = self.transcript.last_mut() {
                    *last = segment.clone();
                }
                if segment.speaker == Speaker::Client {
                    let deadline = self.turns.mark_client_activity(now);
                    *check_at = Some((deadline, CheckReason::ClientPause));
                    self.orchestrator.on_client_activity();
                }
                self.emit(AssistEvent::SegmentUpdated {
                    session_id: self.session_id,
                    segment,
                });
            }
            SegmentDelta::Appended(segment) => {
                let prev_speaker = self.transcript.last().map(|s| s.speaker);
                // The previous utterance is final once the floor changes;
                // persist its settled text.
                if let Some(prev) = self.transcript.last() {
                    self.persist_segment(prev.clone());
                }

                self.transcript.push(segment.clone());

                match segment.speaker {
                    Speaker::Client => {
                        let deadline = self.turns.mark_client_activity(now);
                        *check_at = Some((deadline, CheckReason::ClientPause));
                        self.orchestrator.on_client_activity();
                        self.maybe_analyze_checklist(outcome_tx);
                    }
                    Speaker::Agent => {
                        if prev_speaker == Some(Speaker::Client)
                            && self.turns.mark_agent_took_floor().is_some()
                        {
                            debug!(session_id = %self.session_id, "Agent took the floor");
                            self.orchestrator.on_client_paused();
                            *check_at = Some((
                                now + Duration::from_millis(self.config.agent_floor_delay_ms),
                                CheckReason::AgentFloor,
                            ));
                        }
                    }
                    Speaker::Unknown => {}
                }

                self.persist_segment(segment.clone());
                self.emit(AssistEvent::SegmentAppended {
                    session_id: self.session_id,
                    segment,
                });
            }
        }

        self.emit_state();
    }

    fn on_check_timer(
        &mut self,
        reason: CheckReason,
        outcome_tx: &mpsc::Sender<TaskOutcome>,
        check_at: &mut Option<(Instant, CheckReason)>,
    ) {
        let now = Instant::now();
        match reason {
            CheckReason::ClientPause => match self.turns.pause_check(now) {
                PauseCheck::Fire => {
                    debug!(session_id = %self.session_id, "Client pause detected");
                    self.orchestrator.on_client_paused();
                    self.try_begin_evaluation(now, outcome_tx);
                }
                PauseCheck::Reschedule(at) => {
                    *check_at = Some((at, CheckReason::ClientPause));
                }
                PauseCheck::Stale => {}
            },
            CheckReason::AgentFloor => {
                self.try_begin_evaluation(now, outcome_tx);
            }
        }
        self.emit_state();
    }

    fn on_outcome(&mut self, outcome: TaskOutcome, outcome_tx: &mpsc::Sender<TaskOutcome>) {
        match outcome {
            TaskOutcome::Adequacy(quality) => {
                self.eval_in_flight = false;
                self.orchestrator.finish_evaluating();
                let now = Instant::now();
                let has_pause = self.has_pause(now);
                if has_pause && quality.has_answered && quality.is_substantial {
                    self.try_generate(now, outcome_tx);
                } else {
                    debug!(
                        session_id = %self.session_id,
                        has_pause,
                        has_answered = quality.has_answered,
                        is_substantial = quality.is_substantial,
                        reasoning = quality.reasoning.as_deref().unwrap_or(""),
                        "Not generating yet"
                    );
                }
            }
            TaskOutcome::Generation(result) => {
                let outcome = match result {
                    Ok(generated) => Some(generated),
                    Err(error) => {
                        warn!(session_id = %self.session_id, %error, "Question generation failed");
                        None
                    }
                };
                if let Some(prompt) = self.orchestrator.complete_generation(Instant::now(), outcome)
                {
                    info!(
                        session_id = %self.session_id,
                        category = prompt.category.as_deref().unwrap_or("general"),
                        "New question suggestion ready"
                    );
                    self.emit(AssistEvent::PromptUpdated {
                        session_id: self.session_id,
                        prompt,
                    });
                }
            }
            TaskOutcome::Checklist(result) => {
                self.checklist.finish_analysis();
                match result {
                    Ok(completions) => {
                        let newly = self.checklist.apply_completions(&completions, Utc::now());
                        for item in newly {
                            info!(
                                session_id = %self.session_id,
                                item_id = item.id,
                                label = %item.label,
                                "Checklist item completed"
                            );
                            self.emit(AssistEvent::ChecklistItemCompleted {
                                session_id: self.session_id,
                                item,
                            });
                        }
                    }
                    Err(error) => {
                        debug!(session_id = %self.session_id, %error, "Checklist analysis failed");
                    }
                }
            }
        }
        self.emit_state();
    }

    /// Starts an adequacy analysis unless one is running, a generation is in
    /// flight, or the throttle says it's too soon.
    fn try_begin_evaluation(&mut self, now: Instant, outcome_tx: &mpsc::Sender<TaskOutcome>) {
        if self.transcript.len() < 2 {
            return;
        }
        if self.eval_in_flight || self.orchestrator.is_generating() {
            return;
        }
        if !self.gate.try_begin_check(now) {
            return;
        }

        self.eval_in_flight = true;
        self.orchestrator.note_evaluating();

        let analyzer = Arc::clone(&self.collaborators.adequacy);
        let question = self
            .orchestrator
            .current_prompt()
            .map(|p| p.prompt.clone());
        let window = self.window();
        let tx = outcome_tx.clone();
        tokio::spawn(async move {
            let quality = AdequacyGate::assess(analyzer, question, window).await;
            let _ = tx.send(TaskOutcome::Adequacy(quality)).await;
        });
    }

    /// Evaluates the generation gate; on pass, the in-flight guard is claimed
    /// before the collaborator future is spawned.
    fn try_generate(&mut self, now: Instant, outcome_tx: &mpsc::Sender<TaskOutcome>) {
        let client_speaking = self.turns.is_client_actively_speaking(now);
        if !self
            .orchestrator
            .begin_generation(now, client_speaking, self.checklist.pending_count())
        {
            return;
        }

        let request = GenerationRequest {
            session_id: self.session_id,
            pending_items: self.checklist.pending().into_iter().cloned().collect(),
            completed_ids: self.checklist.completed_ids(),
            window: self.window(),
            previous_questions: self.orchestrator.previous_questions(&self.transcript),
        };
        let generator = Arc::clone(&self.collaborators.generator);
        let tx = outcome_tx.clone();
        tokio::spawn(async move {
            let result = generator.generate(request).await;
            let _ = tx.send(TaskOutcome::Generation(result)).await;
        });
    }

    /// Checklist analysis on every new client segment, bounded by the
    /// single-in-flight guard.
    fn maybe_analyze_checklist(&mut self, outcome_tx: &mpsc::Sender<TaskOutcome>) {
        if self.transcript.len() < 2 {
            return;
        }
        if !self.checklist.try_begin_analysis() {
            return;
        }

        let analyzer = Arc::clone(&self.collaborators.checklist);
        let window = self.window();
        let pending: Vec<ChecklistItem> = self.checklist.pending().into_iter().cloned().collect();
        let tx = outcome_tx.clone();
        tokio::spawn(async move {
            let result = analyzer.analyze(&window, &pending).await;
            let _ = tx.send(TaskOutcome::Checklist(result)).await;
        });
    }

    /// Pause status recomputed at decision time; speaking status may have
    /// changed while the adequacy analysis was in flight.
    fn has_pause(&self, now: Instant) -> bool {
        if self.turns.is_client_actively_speaking(now) {
            return false;
        }
        let elapsed_ok = self
            .turns
            .millis_since_client_activity(now)
            .is_none_or(|ms| ms >= self.config.server_pause_threshold_ms);
        let agent_speaking = self
            .transcript
            .last()
            .is_some_and(|s| s.speaker == Speaker::Agent);
        elapsed_ok || agent_speaking
    }

    fn window(&self) -> Vec<TranscriptSegment> {
        let skip = self
            .transcript
            .len()
            .saturating_sub(self.config.transcript_window);
        self.transcript[skip..].to_vec()
    }

    fn persist_segment(&self, segment: TranscriptSegment) {
        let store = Arc::clone(&self.collaborators.store);
        let session_id = self.session_id;
        tokio::spawn(async move {
            if let Err(error) = store.store_segment(session_id, &segment).await {
                warn!(
                    %session_id,
                    segment_id = segment.id,
                    %error,
                    "Failed to store segment"
                );
            }
        });
    }

    fn view(&self) -> SessionView {
        SessionView {
            session_id: self.session_id,
            meeting_url: self.meeting_url.clone(),
            state: self.orchestrator.state(),
            current_prompt: self.orchestrator.current_prompt().cloned(),
            checklist: self.checklist.items().to_vec(),
            transcript: self.transcript.clone(),
            client_name: self.normalizer.client_name().map(str::to_string),
        }
    }

    fn emit(&self, event: AssistEvent) {
        if let Err(error) = self.events_tx.send(event) {
            debug!("No assist event subscribers: {}", error);
        }
    }

    fn emit_state(&mut self) {
        let state = self.orchestrator.state();
        if state != self.last_emitted_state {
            self.last_emitted_state = state;
            self.emit(AssistEvent::StateChanged {
                session_id: self.session_id,
                state,
            });
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
