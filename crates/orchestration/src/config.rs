use serde::{Deserialize, Serialize};

/// Timing and sizing knobs for the question orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Captions shorter than this are UI noise, not speech.
    pub min_caption_chars: usize,
    /// Delay after client activity before the pause check runs.
    pub pause_check_delay_ms: u64,
    /// Client inactivity required for the pause check to actually fire;
    /// anything shorter reschedules (word-by-word captions keep trickling in
    /// after the speaker has effectively finished).
    pub pause_threshold_ms: u64,
    /// Inactivity threshold for the fallback pause recomputation done at
    /// decision time, after the adequacy result comes back.
    pub server_pause_threshold_ms: u64,
    /// Client activity within this window counts as "actively speaking".
    pub active_speech_window_ms: u64,
    /// Hard rate limit between question suggestions.
    pub min_question_interval_ms: u64,
    /// Minimum spacing between adequacy analyses (bounds external-call cost).
    pub adequacy_throttle_ms: u64,
    /// Delay before evaluating after the agent takes the floor; the agent may
    /// be asking a follow-up rather than moving on.
    pub agent_floor_delay_ms: u64,
    /// How many trailing segments the analysis collaborators see.
    pub transcript_window: usize,
    /// Cap on the asked-questions dedup history.
    pub asked_question_history: usize,
    /// Checklist completions below this confidence are ignored.
    pub completion_confidence_threshold: f64,
    /// Generate an opening question shortly after the session starts.
    pub generate_initial_question: bool,
    pub initial_question_delay_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            min_caption_chars: 5,
            pause_check_delay_ms: 4000,
            pause_threshold_ms: 3500,
            server_pause_threshold_ms: 2000,
            active_speech_window_ms: 2000,
            min_question_interval_ms: 5000,
            adequacy_throttle_ms: 2000,
            agent_floor_delay_ms: 1500,
            transcript_window: 10,
            asked_question_history: 10,
            completion_confidence_threshold: 0.8,
            generate_initial_question: true,
            initial_question_delay_ms: 2000,
        }
    }
}
