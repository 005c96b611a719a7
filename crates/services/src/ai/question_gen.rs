use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use callpilot_orchestration::{
    AnalyzerError, ChecklistItem, GeneratedQuestion, GenerationRequest, QuestionGenerator,
};

use super::claude::ClaudeClient;
use super::format_transcript;
use crate::dao::question::QuestionDao;

static QUESTION_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^QUESTION:\s*(.+)$").expect("question line regex is valid"));
static ADDRESSES_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^ADDRESSES:\s*(.+)$").expect("addresses line regex is valid")
});

const SYSTEM_PROMPT: &str = r#"You are an AI assistant helping a sales agent conduct a client onboarding call.

Based on the conversation so far, suggest the MOST NATURAL next question for the agent to ask to gather information about the remaining checklist items.

Rules:
1. Questions should feel conversational and build on what the client just said
2. Reference the client's words when possible
3. Prioritize required checklist items
4. Don't repeat information already covered, and never re-ask a previously asked question
5. Keep questions open-ended to encourage dialogue
6. Maximum 1-2 sentences
7. Sound like a professional consultant, NOT a robot

Respond in exactly this format:
QUESTION: [the question to ask]
ADDRESSES: [checklist item label it targets]"#;

/// Claude-backed next-question generation.
///
/// Every generated prompt is also logged to the durable question history;
/// working memory only ever holds the latest one.
pub struct ClaudeQuestionGenerator {
    client: ClaudeClient,
    log: Option<Arc<QuestionDao>>,
}

impl ClaudeQuestionGenerator {
    pub fn new(client: ClaudeClient) -> Self {
        Self { client, log: None }
    }

    pub fn with_log(mut self, log: Arc<QuestionDao>) -> Self {
        self.log = Some(log);
        self
    }
}

#[async_trait]
impl QuestionGenerator for ClaudeQuestionGenerator {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GeneratedQuestion, AnalyzerError> {
        let user_prompt = build_user_prompt(&request);
        let text = self.client.complete(SYSTEM_PROMPT, &user_prompt).await?;
        let generated = parse_generated(&text);
        debug!(
            category = generated.category.as_deref().unwrap_or(""),
            "Question generated"
        );

        if let Some(log) = &self.log {
            let log = Arc::clone(log);
            let session_id = request.session_id;
            let prompt = generated.prompt.clone();
            let category = generated.category.clone();
            tokio::spawn(async move {
                if let Err(error) = log.record(session_id, &prompt, category.as_deref()).await {
                    warn!(%session_id, %error, "Failed to log generated question");
                }
            });
        }

        Ok(generated)
    }
}

fn build_user_prompt(request: &GenerationRequest) -> String {
    let format_item = |item: &ChecklistItem| {
        let mut line = format!("- {}", item.label);
        if let Some(desc) = &item.description {
            line.push_str(&format!(" ({desc})"));
        }
        if item.required {
            line.push_str(" [REQUIRED]");
        }
        line
    };

    let required: Vec<String> = request
        .pending_items
        .iter()
        .filter(|i| i.required)
        .map(format_item)
        .collect();
    let optional: Vec<String> = request
        .pending_items
        .iter()
        .filter(|i| !i.required)
        .map(format_item)
        .collect();

    let previous = if request.previous_questions.is_empty() {
        "(none yet)".to_string()
    } else {
        request
            .previous_questions
            .iter()
            .map(|q| format!("- {q}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Remaining checklist items to cover:\n{}\n{}\n\n\
         Questions already asked (do not repeat these):\n{previous}\n\n\
         Recent conversation:\n{}\n\n\
         What should the agent ask next?",
        required.join("\n"),
        optional.join("\n"),
        format_transcript(&request.window),
    )
}

/// Pulls the QUESTION/ADDRESSES lines out of the response. A response that
/// ignored the format is used verbatim as the prompt.
fn parse_generated(text: &str) -> GeneratedQuestion {
    let prompt = QUESTION_LINE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| text.trim().to_string());
    let category = ADDRESSES_LINE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string());

    GeneratedQuestion { prompt, category }
}
