use async_trait::async_trait;
use tracing::debug;

use callpilot_orchestration::{
    AdequacyAnalyzer, AnalyzerError, AnswerQuality, Speaker, TranscriptSegment,
};

use super::claude::{ClaudeClient, strip_code_fences};

const SYSTEM_PROMPT: &str = r#"You are analyzing a sales conversation to determine if the client has adequately answered the agent's question.

Your task:
1. Determine if the client's response addresses the question asked
2. Assess if the answer is substantial (not just "yes", "no", "maybe", or non-committal)
3. Return a confidence score based on answer quality

IMPORTANT RULES:
- An answer is "adequate" if it provides ANY information related to the question, even if tentative or partial
- An answer is "substantial" if it contains specific details, numbers, targets, examples, or explanations (even if prefaced with uncertainty like "if I had to guess")
- ACCEPT partial answers: "I haven't fully decided, but I'm thinking X" COUNTS as answering
- ACCEPT tentative answers: "if I had to guess", "maybe around" still indicate they're providing information
- Low confidence ONLY if the client completely deflected, said "I don't know" with no attempt, or gave no relevant information

Return JSON only, with exactly these fields:
{
  "has_answered": boolean,
  "is_substantial": boolean,
  "confidence": 0.0-1.0,
  "reasoning": "brief explanation"
}"#;

/// Claude-backed answer adequacy analysis.
///
/// Parsing is strict: a response that doesn't match the schema surfaces as
/// [`AnalyzerError::Malformed`], which makes the orchestration core apply its
/// deterministic fallback heuristic.
pub struct ClaudeAdequacyAnalyzer {
    client: ClaudeClient,
}

impl ClaudeAdequacyAnalyzer {
    pub fn new(client: ClaudeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AdequacyAnalyzer for ClaudeAdequacyAnalyzer {
    async fn analyze(
        &self,
        question: Option<&str>,
        window: &[TranscriptSegment],
    ) -> Result<AnswerQuality, AnalyzerError> {
        let question = question.unwrap_or_default();

        // Last few turns on each side; the full window would bury the answer.
        let agent_lines: Vec<&TranscriptSegment> = window
            .iter()
            .filter(|s| s.speaker == Speaker::Agent)
            .collect();
        let client_lines: Vec<&TranscriptSegment> = window
            .iter()
            .filter(|s| s.speaker == Speaker::Client)
            .collect();

        let context: String = agent_lines
            .iter()
            .rev()
            .take(3)
            .rev()
            .map(|s| format!("Agent: {}", s.text))
            .chain(
                client_lines
                    .iter()
                    .rev()
                    .take(5)
                    .rev()
                    .map(|s| format!("Client: {}", s.text)),
            )
            .collect::<Vec<_>>()
            .join("\n");

        let user_prompt = format!(
            "Current question being asked: \"{question}\"\n\n\
             Recent conversation:\n{context}\n\n\
             Has the client adequately answered the question? Is the answer substantial?\n\
             Remember: accept partial or tentative answers if they contain any specific \
             information (numbers, targets, timeframes, etc.)."
        );

        let text = self.client.complete(SYSTEM_PROMPT, &user_prompt).await?;
        let quality = parse_quality(&text)?;
        debug!(
            has_answered = quality.has_answered,
            is_substantial = quality.is_substantial,
            confidence = quality.confidence,
            "Adequacy analysis parsed"
        );
        Ok(quality)
    }
}

fn parse_quality(text: &str) -> Result<AnswerQuality, AnalyzerError> {
    let mut quality: AnswerQuality = serde_json::from_str(strip_code_fences(text))
        .map_err(|e| AnalyzerError::Malformed(e.to_string()))?;
    quality.confidence = quality.confidence.clamp(0.0, 1.0);
    Ok(quality)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_verdict() {
        let quality = parse_quality(
            r#"{"has_answered": true, "is_substantial": true, "confidence": 0.9, "reasoning": "gave a number"}"#,
        )
        .unwrap();
        assert!(quality.has_answered);
        assert!(quality.is_substantial);
        assert_eq!(quality.confidence, 0.9);
    }

    #[test]
    fn parses_fenced_verdict() {
        let quality = parse_quality(
            "```json\n{\"has_answered\": false, \"is_substantial\": false, \"confidence\": 1.2}\n```",
        )
        .unwrap();
        assert!(!quality.has_answered);
        assert_eq!(quality.confidence, 1.0, "confidence clamped");
        assert!(quality.reasoning.is_none());
    }

    #[test]
    fn missing_fields_are_malformed() {
        // Strict schema: a verdict without has_answered must not be guessed
        // at here; the core's fallback heuristic handles it.
        assert!(matches!(
            parse_quality(r#"{"confidence": 0.7}"#),
            Err(AnalyzerError::Malformed(_))
        ));
        assert!(matches!(
            parse_quality("The client answered well."),
            Err(AnalyzerError::Malformed(_))
        ));
    }
}
