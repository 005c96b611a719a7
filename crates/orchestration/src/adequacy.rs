use std::sync::{Arc, LazyLock};

use regex::Regex;
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::collaborator::{AdequacyAnalyzer, AnswerQuality};
use crate::config::OrchestratorConfig;
use crate::{Speaker, TranscriptSegment};

/// Bare affirmations/negations/fillers that never count as a substantial
/// answer on their own.
static FILLER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(yes|no|maybe|i think so|probably|perhaps|i guess|not really|sort of|kinda)[\s.,!?]*$",
    )
    .expect("filler regex is valid")
});

/// Concatenated client text must exceed this to pass the fallback heuristic.
const FALLBACK_MIN_CHARS: usize = 15;

/// Decides whether the client's latest response answers the pending question,
/// delegating the semantic judgment to an external collaborator and falling
/// back to a length/filler heuristic when that collaborator fails.
pub struct AdequacyGate {
    throttle: Duration,
    last_check: Option<Instant>,
}

impl AdequacyGate {
    pub fn new(config: &OrchestratorConfig) -> Self {
        Self {
            throttle: Duration::from_millis(config.adequacy_throttle_ms),
            last_check: None,
        }
    }

    /// Throttle: at most one adequacy analysis per configured interval.
    /// Returns false (and leaves state untouched) when a check ran too
    /// recently.
    pub fn try_begin_check(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_check {
            if now.duration_since(last) < self.throttle {
                return false;
            }
        }
        self.last_check = Some(now);
        true
    }

    /// Assesses the client's response against the current question.
    ///
    /// Never fails: collaborator errors and malformed results degrade to the
    /// heuristic verdict.
    pub async fn assess(
        analyzer: Arc<dyn AdequacyAnalyzer>,
        question: Option<String>,
        window: Vec<TranscriptSegment>,
    ) -> AnswerQuality {
        // No question pending: vacuously ready for the next one.
        let Some(question) = question else {
            return AnswerQuality {
                has_answered: true,
                is_substantial: true,
                confidence: 1.0,
                reasoning: None,
            };
        };

        if !window.iter().any(|s| s.speaker == Speaker::Client) {
            return AnswerQuality {
                has_answered: false,
                is_substantial: false,
                confidence: 1.0,
                reasoning: Some("No client responses found".to_string()),
            };
        }

        match analyzer.analyze(Some(&question), &window).await {
            Ok(quality) => {
                debug!(
                    has_answered = quality.has_answered,
                    is_substantial = quality.is_substantial,
                    confidence = quality.confidence,
                    "Answer adequacy analyzed"
                );
                quality
            }
            Err(error) => {
                warn!(%error, "Adequacy analysis failed, using fallback heuristic");
                Self::fallback_heuristic(&window)
            }
        }
    }

    /// Deterministic stand-in for the semantic analysis: the answer counts if
    /// the client said more than a few words and it wasn't a bare
    /// affirmation/filler.
    pub fn fallback_heuristic(window: &[TranscriptSegment]) -> AnswerQuality {
        let client_text = window
            .iter()
            .filter(|s| s.speaker == Speaker::Client)
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let long_enough = client_text.len() > FALLBACK_MIN_CHARS;
        let not_filler = !FILLER_RE.is_match(client_text.trim());
        let adequate = long_enough && not_filler;

        AnswerQuality {
            has_answered: adequate,
            is_substantial: adequate,
            confidence: if adequate { 0.8 } else { 0.5 },
            reasoning: Some("Fallback analysis".to_string()),
        }
    }

}
