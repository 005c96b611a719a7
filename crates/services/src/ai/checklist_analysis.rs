use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use callpilot_orchestration::{
    AnalyzerError, ChecklistAnalyzer, ChecklistCompletion, ChecklistItem, Speaker,
    TranscriptSegment,
};

use super::claude::{ClaudeClient, strip_code_fences};
use super::format_transcript;

const SYSTEM_PROMPT: &str = r#"You are an expert at extracting structured information from sales conversations.

Your task: identify which checklist items have been answered (directly or indirectly) in the conversation, and extract the relevant information the client provided.

Rules:
1. Only mark items as completed if the client ACTUALLY provided the information
2. Extract the exact words/numbers the client said
3. Don't make assumptions or fill in gaps
4. Assign a confidence score: 1.0 (certain), 0.8-0.9 (very likely), 0.6-0.7 (possible), <0.6 (uncertain)

Return a JSON array of completed items in this exact format:
[
  {
    "item_id": <number>,
    "extracted_info": "<exact quote from client>",
    "confidence": <0.0-1.0>
  }
]

CRITICAL: Always return an array [], even if there's only one item. Never return a single object."#;

/// Claude-backed checklist completion detection.
///
/// Models are told to return an array but occasionally return a single object
/// or wrap the array in `{"completions": [...]}`; all tolerated shapes are
/// handled here and nowhere else.
pub struct ClaudeChecklistAnalyzer {
    client: ClaudeClient,
}

impl ClaudeChecklistAnalyzer {
    pub fn new(client: ClaudeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChecklistAnalyzer for ClaudeChecklistAnalyzer {
    async fn analyze(
        &self,
        window: &[TranscriptSegment],
        pending: &[ChecklistItem],
    ) -> Result<Vec<ChecklistCompletion>, AnalyzerError> {
        if pending.is_empty() || window.is_empty() {
            return Ok(Vec::new());
        }
        // Only client turns carry the information; skip the call outright if
        // there are none in the window.
        if !window.iter().any(|s| s.speaker == Speaker::Client) {
            return Ok(Vec::new());
        }

        let items = pending
            .iter()
            .map(|item| match &item.description {
                Some(desc) => format!("ID {}: {} - {}", item.id, item.label, desc),
                None => format!("ID {}: {}", item.id, item.label),
            })
            .collect::<Vec<_>>()
            .join("\n");

        let user_prompt = format!(
            "Checklist items to check:\n{items}\n\n\
             Recent conversation:\n{}\n\n\
             Which items were answered? Return JSON array only.",
            format_transcript(window)
        );

        let text = self.client.complete(SYSTEM_PROMPT, &user_prompt).await?;
        let completions = parse_completions(&text)?;
        debug!(found = completions.len(), "Checklist analysis parsed");
        Ok(completions)
    }
}

/// Accepts an array, a bare single object, or `{"completions": [...]}`.
fn parse_completions(text: &str) -> Result<Vec<ChecklistCompletion>, AnalyzerError> {
    let value: Value = serde_json::from_str(strip_code_fences(text))
        .map_err(|e| AnalyzerError::Malformed(e.to_string()))?;

    let array = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => {
            if obj.contains_key("item_id") {
                vec![Value::Object(obj)]
            } else {
                match obj.remove("completions") {
                    Some(Value::Array(items)) => items,
                    _ => {
                        return Err(AnalyzerError::Malformed(
                            "expected array, object with item_id, or completions key".to_string(),
                        ));
                    }
                }
            }
        }
        other => {
            return Err(AnalyzerError::Malformed(format!(
                "expected JSON array, got {other}"
            )));
        }
    };

    array
        .into_iter()
        .map(|item| {
            serde_json::from_value::<ChecklistCompletion>(item)
                .map_err(|e| AnalyzerError::Malformed(e.to_string()))
        })
        .collect()
}
