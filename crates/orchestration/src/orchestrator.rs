use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use crate::collaborator::GeneratedQuestion;
use crate::config::OrchestratorConfig;
use crate::{QuestionPrompt, Speaker, TranscriptSegment};

/// Question sentences inside an agent utterance, for the dedup history.
static QUESTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?]*\?").expect("question regex is valid"));

/// Lifecycle of the current question suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    /// No question pending.
    Idle,
    /// Question shown, waiting for the client to respond.
    WaitingForAnswer,
    /// Client is actively speaking.
    ClientSpeaking,
    /// Client finished speaking; answer captured.
    AnswerReceived,
    /// Adequacy analysis in flight.
    Evaluating,
    /// Next-question generation in flight.
    Generating,
}

/// Owns the question lifecycle: when to generate, what was asked, what is
/// currently shown.
///
/// All methods are synchronous; the session worker calls them between awaits,
/// so a gate check and its flag set can never interleave with other event
/// handling.
pub struct QuestionOrchestrator {
    min_question_interval: Duration,
    history_cap: usize,
    state: OrchestratorState,
    /// In-flight guard; set synchronously the moment generation is decided.
    generating: bool,
    last_question_at: Option<Instant>,
    current_prompt: Option<QuestionPrompt>,
    asked_questions: Vec<String>,
    /// Where to return after an evaluation that doesn't lead to generation.
    eval_return: Option<OrchestratorState>,
}

impl QuestionOrchestrator {
    pub fn new(config: &OrchestratorConfig) -> Self {
        Self {
            min_question_interval: Duration::from_millis(config.min_question_interval_ms),
            history_cap: config.asked_question_history,
            state: OrchestratorState::Idle,
            generating: false,
            last_question_at: None,
            current_prompt: None,
            asked_questions: Vec::new(),
            eval_return: None,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn current_prompt(&self) -> Option<&QuestionPrompt> {
        self.current_prompt.as_ref()
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Client activity while a question is on screen means they're answering.
    pub fn on_client_activity(&mut self) {
        if self.state == OrchestratorState::WaitingForAnswer {
            self.state = OrchestratorState::ClientSpeaking;
        }
    }

    /// A pause (or the agent taking the floor) ends the client's answer.
    pub fn on_client_paused(&mut self) {
        if self.state == OrchestratorState::ClientSpeaking {
            self.state = OrchestratorState::AnswerReceived;
        }
    }

    /// Marks the adequacy analysis as in flight.
    pub fn note_evaluating(&mut self) {
        if matches!(
            self.state,
            OrchestratorState::Idle | OrchestratorState::AnswerReceived
        ) {
            self.eval_return = Some(self.state);
            self.state = OrchestratorState::Evaluating;
        }
    }

    /// Restores the pre-evaluation state so the generation gate sees the
    /// state the evaluation was entered from.
    pub fn finish_evaluating(&mut self) {
        if self.state == OrchestratorState::Evaluating {
            if let Some(back) = self.eval_return.take() {
                self.state = back;
            }
        }
        self.eval_return = None;
    }

    /// The generation gate. ALL clauses must hold:
    /// not already generating, client not speaking (re-verified now), the
    /// minimum interval since the last question elapsed, at least one
    /// checklist item still pending, and the lifecycle is at a point where a
    /// new question makes sense.
    pub fn should_generate(
        &self,
        now: Instant,
        client_speaking: bool,
        pending_items: usize,
    ) -> bool {
        if self.generating {
            return false;
        }
        if client_speaking {
            return false;
        }
        if let Some(last) = self.last_question_at {
            if now.duration_since(last) < self.min_question_interval {
                return false;
            }
        }
        if pending_items == 0 {
            return false;
        }
        matches!(
            self.state,
            OrchestratorState::Idle | OrchestratorState::AnswerReceived
        )
    }

    /// Evaluates the gate and, when it passes, claims the in-flight guard and
    /// the rate-limit slot in the same synchronous step.
    pub fn begin_generation(
        &mut self,
        now: Instant,
        client_speaking: bool,
        pending_items: usize,
    ) -> bool {
        if !self.should_generate(now, client_speaking, pending_items) {
            debug!(
                state = ?self.state,
                generating = self.generating,
                client_speaking,
                pending_items,
                "Generation gate closed"
            );
            return false;
        }
        self.generating = true;
        self.state = OrchestratorState::Generating;
        self.last_question_at = Some(now);
        true
    }

    /// Completes a generation cycle. `None` (failure or empty result) returns
    /// the machine to `Idle` with no user-facing error; the next natural
    /// trigger will try again.
    pub fn complete_generation(
        &mut self,
        now: Instant,
        outcome: Option<GeneratedQuestion>,
    ) -> Option<QuestionPrompt> {
        self.generating = false;
        match outcome {
            Some(generated) if !generated.prompt.trim().is_empty() => {
                let prompt = QuestionPrompt {
                    id: Uuid::new_v4(),
                    prompt: generated.prompt.trim().to_string(),
                    category: generated.category,
                    created_at: Utc::now(),
                };
                self.track_asked(prompt.prompt.clone());
                self.current_prompt = Some(prompt.clone());
                self.state = OrchestratorState::WaitingForAnswer;
                self.last_question_at = Some(now);
                Some(prompt)
            }
            _ => {
                self.state = OrchestratorState::Idle;
                None
            }
        }
    }

    /// Asked-questions history for the generator: generated prompts merged
    /// with question sentences extracted from recent agent segments,
    /// deduplicated, capped at the most recent `history_cap`.
    pub fn previous_questions(&self, transcript: &[TranscriptSegment]) -> Vec<String> {
        let transcript_questions: Vec<String> = transcript
            .iter()
            .filter(|s| s.speaker == Speaker::Agent)
            .flat_map(|s| QUESTION_RE.find_iter(&s.text))
            .map(|m| m.as_str().trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();
        let recent_transcript = transcript_questions
            .iter()
            .rev()
            .take(5)
            .rev()
            .cloned();

        let mut seen = HashSet::new();
        let mut merged: Vec<String> = self
            .asked_questions
            .iter()
            .cloned()
            .chain(recent_transcript)
            .filter(|q| seen.insert(q.clone()))
            .collect();
        if merged.len() > self.history_cap {
            merged.drain(..merged.len() - self.history_cap);
        }
        merged
    }

    /// Any state → Idle; session reset/stop.
    pub fn reset(&mut self) {
        self.state = OrchestratorState::Idle;
        self.generating = false;
        self.last_question_at = None;
        self.current_prompt = None;
        self.asked_questions.clear();
        self.eval_return = None;
    }

    fn track_asked(&mut self, prompt: String) {
        self.asked_questions.push(prompt);
        if self.asked_questions.len() > self.history_cap {
            let excess = self.asked_questions.len() - self.history_cap;
            self.asked_questions.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn orchestrator() -> QuestionOrchestrator {
        QuestionOrchestrator::new(&OrchestratorConfig::default())
    }

    fn generated(text: &str) -> GeneratedQuestion {
        GeneratedQuestion {
            prompt: text.to_string(),
            category: None,
        }
    }

    fn agent_seg(id: u64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            id,
            speaker: Speaker::Agent,
            text: text.to_string(),
            timestamp: Utc::now(),
            confidence: Some(1.0),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn gate_requires_all_clauses() {
        let mut o = orchestrator();
        let now = Instant::now();

        assert!(o.should_generate(now, false, 3));
        assert!(!o.should_generate(now, true, 3));
        assert!(!o.should_generate(now, false, 0));

        assert!(o.begin_generation(now, false, 3));
        // In-flight guard blocks re-entry.
        assert!(!o.should_generate(now, false, 3));
        assert!(!o.begin_generation(now, false, 3));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_between_questions() {
        let mut o = orchestrator();
        let start = Instant::now();

        assert!(o.begin_generation(start, false, 3));
        let prompt = o.complete_generation(start, Some(generated("What is your budget?")));
        assert!(prompt.is_some());
        assert_eq!(o.state(), OrchestratorState::WaitingForAnswer);

        // Answer cycle completes quickly; still inside the interval.
        o.on_client_activity();
        o.on_client_paused();
        assert_eq!(o.state(), OrchestratorState::AnswerReceived);
        assert!(!o.should_generate(start + Duration::from_millis(3000), false, 3));
        assert!(o.should_generate(start + Duration::from_millis(5000), false, 3));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_generation_returns_to_idle() {
        let mut o = orchestrator();
        let now = Instant::now();
        assert!(o.begin_generation(now, false, 2));
        assert!(o.complete_generation(now, None).is_none());
        assert_eq!(o.state(), OrchestratorState::Idle);
        assert!(!o.is_generating());
        assert!(o.current_prompt().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn evaluation_restores_entry_state() {
        let mut o = orchestrator();
        o.note_evaluating();
        assert_eq!(o.state(), OrchestratorState::Evaluating);
        o.finish_evaluating();
        assert_eq!(o.state(), OrchestratorState::Idle);

        let now = Instant::now();
        assert!(o.begin_generation(now, false, 1));
        o.complete_generation(now, Some(generated("How big is the team?")));
        o.on_client_activity();
        o.on_client_paused();
        o.note_evaluating();
        o.finish_evaluating();
        assert_eq!(o.state(), OrchestratorState::AnswerReceived);
    }

    #[tokio::test(start_paused = true)]
    async fn history_merges_and_caps() {
        let mut o = orchestrator();
        let mut now = Instant::now();
        for i in 0..12 {
            assert!(o.begin_generation(now, false, 3), "generation {i}");
            o.complete_generation(now, Some(generated(&format!("Question number {i}?"))));
            o.on_client_activity();
            o.on_client_paused();
            now += Duration::from_millis(6000);
        }

        let transcript = vec![agent_seg(
            1,
            "Thanks for that. What markets are you in? And since when?",
        )];
        let history = o.previous_questions(&transcript);
        assert_eq!(history.len(), 10);
        // Oldest generated questions were evicted; transcript questions are
        // kept at the tail.
        assert!(history.contains(&"What markets are you in?".to_string()));
        assert!(history.contains(&"And since when?".to_string()));
        assert!(!history.iter().any(|q| q == "Question number 0?"));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_clears_everything() {
        let mut o = orchestrator();
        let now = Instant::now();
        o.begin_generation(now, false, 1);
        o.complete_generation(now, Some(generated("Anything else?")));
        o.reset();
        assert_eq!(o.state(), OrchestratorState::Idle);
        assert!(o.current_prompt().is_none());
        assert!(o.previous_questions(&[]).is_empty());
    }
}
