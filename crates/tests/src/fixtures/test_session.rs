use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::Utc;
use tokio::sync::{Mutex, broadcast};
use tokio::time::Duration;

use callpilot_orchestration::{
    AdequacyAnalyzer, AnalyzerError, AnswerQuality, AssistEvent, CaptionEvent, ChecklistAnalyzer,
    ChecklistCompletion, ChecklistItem, Collaborators, GeneratedQuestion, GenerationRequest,
    OrchestratorConfig, QuestionGenerator, SegmentStore, SessionEngine, SessionView,
    TranscriptSegment,
};

/// Scripted adequacy analyzer: pops queued verdicts, or returns an
/// "adequate" default once the script runs dry. Set `fail` to exercise the
/// core's fallback heuristic.
pub struct ScriptedAdequacy {
    pub calls: AtomicUsize,
    pub script: Mutex<VecDeque<AnswerQuality>>,
    pub fail: bool,
}

impl ScriptedAdequacy {
    pub fn adequate() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(VecDeque::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(VecDeque::new()),
            fail: true,
        }
    }

    pub async fn push(&self, quality: AnswerQuality) {
        self.script.lock().await.push_back(quality);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdequacyAnalyzer for ScriptedAdequacy {
    async fn analyze(
        &self,
        _question: Option<&str>,
        _window: &[TranscriptSegment],
    ) -> Result<AnswerQuality, AnalyzerError> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AnalyzerError::Malformed("scripted failure".to_string()));
        }
        Ok(self.script.lock().await.pop_front().unwrap_or(AnswerQuality {
            has_answered: true,
            is_substantial: true,
            confidence: 0.9,
            reasoning: None,
        }))
    }
}

/// Scripted checklist analyzer: pops one completion batch per call, empty
/// once the script runs dry.
pub struct ScriptedChecklist {
    pub calls: AtomicUsize,
    pub script: Mutex<VecDeque<Vec<ChecklistCompletion>>>,
}

impl ScriptedChecklist {
    pub fn empty() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(VecDeque::new()),
        }
    }

    pub async fn push(&self, completions: Vec<ChecklistCompletion>) {
        self.script.lock().await.push_back(completions);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChecklistAnalyzer for ScriptedChecklist {
    async fn analyze(
        &self,
        _window: &[TranscriptSegment],
        _pending: &[ChecklistItem],
    ) -> Result<Vec<ChecklistCompletion>, AnalyzerError> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.script.lock().await.pop_front().unwrap_or_default())
    }
}

/// Counting generator with a configurable completion delay, for racing
/// triggers against an in-flight generation.
pub struct CountingGenerator {
    pub calls: AtomicUsize,
    pub delay: Duration,
    pub fail: bool,
}

impl CountingGenerator {
    pub fn instant() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(0),
            fail: false,
        }
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(delay_ms),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(0),
            fail: true,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionGenerator for CountingGenerator {
    async fn generate(
        &self,
        _request: GenerationRequest,
    ) -> Result<GeneratedQuestion, AnalyzerError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(AnalyzerError::Request("scripted failure".to_string()));
        }
        Ok(GeneratedQuestion {
            prompt: format!("Scripted question {n}?"),
            category: None,
        })
    }
}

/// Segment store that drops everything.
pub struct NullStore;

#[async_trait]
impl SegmentStore for NullStore {
    async fn store_segment(
        &self,
        _session_id: ObjectId,
        _segment: &TranscriptSegment,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// In-process session harness: a real engine + worker wired to scripted
/// collaborators, driven with synthetic captions under paused tokio time.
pub struct TestSession {
    pub engine: Arc<SessionEngine>,
    pub session_id: ObjectId,
    pub adequacy: Arc<ScriptedAdequacy>,
    pub checklist: Arc<ScriptedChecklist>,
    pub generator: Arc<CountingGenerator>,
    pub events: broadcast::Receiver<AssistEvent>,
}

impl TestSession {
    pub fn start(
        config: OrchestratorConfig,
        items: Vec<ChecklistItem>,
        adequacy: ScriptedAdequacy,
        checklist: ScriptedChecklist,
        generator: CountingGenerator,
    ) -> Self {
        let adequacy = Arc::new(adequacy);
        let checklist = Arc::new(checklist);
        let generator = Arc::new(generator);

        let collaborators = Collaborators {
            adequacy: Arc::clone(&adequacy) as Arc<dyn AdequacyAnalyzer>,
            checklist: Arc::clone(&checklist) as Arc<dyn ChecklistAnalyzer>,
            generator: Arc::clone(&generator) as Arc<dyn QuestionGenerator>,
            store: Arc::new(NullStore),
        };

        let (engine, events) = SessionEngine::new(config, collaborators);
        let session_id = ObjectId::new();
        engine.start_session(session_id, "https://meet.example.com/abc-defg".to_string(), items);

        Self {
            engine,
            session_id,
            adequacy,
            checklist,
            generator,
            events,
        }
    }

    /// Default config for scenarios: production timings, but no opening
    /// question so trigger counting starts from zero.
    pub fn scenario_config() -> OrchestratorConfig {
        OrchestratorConfig {
            generate_initial_question: false,
            ..OrchestratorConfig::default()
        }
    }

    pub async fn caption(&self, speaker: &str, text: &str) {
        let delivered = self
            .engine
            .send_caption(
                self.session_id,
                CaptionEvent {
                    speaker_name: speaker.to_string(),
                    text: text.to_string(),
                    timestamp: Utc::now(),
                },
            )
            .await;
        assert!(delivered, "caption should reach the session worker");
    }

    pub async fn view(&self) -> SessionView {
        self.engine
            .view(self.session_id)
            .await
            .expect("session should be active")
    }

    /// Drains all assist events observed so far.
    pub fn drain_events(&mut self) -> Vec<AssistEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

pub fn item(id: i64, label: &str, required: bool) -> ChecklistItem {
    ChecklistItem {
        id,
        label: label.to_string(),
        description: None,
        category: None,
        order: id as u32,
        required,
        completed: false,
        extracted_info: None,
        completed_at: None,
    }
}

pub fn standard_items() -> Vec<ChecklistItem> {
    vec![
        item(1, "Revenue target", true),
        item(2, "Team size", true),
        item(3, "Timeline", false),
    ]
}

pub fn completion(item_id: i64, confidence: f64) -> ChecklistCompletion {
    ChecklistCompletion {
        item_id,
        extracted_info: "scripted extraction".to_string(),
        confidence,
    }
}
