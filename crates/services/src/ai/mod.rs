pub mod answer_quality;
pub mod checklist_analysis;
pub mod claude;
pub mod question_gen;

pub use answer_quality::ClaudeAdequacyAnalyzer;
pub use checklist_analysis::ClaudeChecklistAnalyzer;
pub use claude::{AiError, ClaudeClient};
pub use question_gen::ClaudeQuestionGenerator;

use callpilot_orchestration::AnalyzerError;

impl From<AiError> for AnalyzerError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::MissingKey => AnalyzerError::Unavailable(err.to_string()),
            AiError::Request(_) | AiError::Api { .. } => AnalyzerError::Request(err.to_string()),
            AiError::EmptyResponse => AnalyzerError::Malformed(err.to_string()),
        }
    }
}

/// Formats a transcript window as "Agent:/Client:" dialog lines for prompts.
pub(crate) fn format_transcript(window: &[callpilot_orchestration::TranscriptSegment]) -> String {
    use callpilot_orchestration::Speaker;
    window
        .iter()
        .map(|seg| {
            let who = match seg.speaker {
                Speaker::Agent => "Agent",
                Speaker::Client => "Client",
                Speaker::Unknown => "Speaker",
            };
            format!("{}: {}", who, seg.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
