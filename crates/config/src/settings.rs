use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub claude: ClaudeSettings,
    pub orchestrator: OrchestratorSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClaudeSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
}

/// Timing knobs for the live-call question orchestrator. All intervals in
/// milliseconds; defaults follow the tuned production values.
#[derive(Debug, Deserialize, Clone)]
pub struct OrchestratorSettings {
    pub min_caption_chars: usize,
    pub pause_check_delay_ms: u64,
    pub pause_threshold_ms: u64,
    pub server_pause_threshold_ms: u64,
    pub active_speech_window_ms: u64,
    pub min_question_interval_ms: u64,
    pub adequacy_throttle_ms: u64,
    pub agent_floor_delay_ms: u64,
    pub transcript_window: usize,
    pub asked_question_history: usize,
    pub completion_confidence_threshold: f64,
    pub generate_initial_question: bool,
    pub initial_question_delay_ms: u64,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("CALLPILOT"),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 3000)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("database.url", "mongodb://localhost:27017")?
            .set_default("database.name", "callpilot")?
            .set_default("claude.model", "claude-sonnet-4-5-20250929")?
            .set_default("claude.max_tokens", 1024)?
            .set_default("orchestrator.min_caption_chars", 5)?
            .set_default("orchestrator.pause_check_delay_ms", 4000)?
            .set_default("orchestrator.pause_threshold_ms", 3500)?
            .set_default("orchestrator.server_pause_threshold_ms", 2000)?
            .set_default("orchestrator.active_speech_window_ms", 2000)?
            .set_default("orchestrator.min_question_interval_ms", 5000)?
            .set_default("orchestrator.adequacy_throttle_ms", 2000)?
            .set_default("orchestrator.agent_floor_delay_ms", 1500)?
            .set_default("orchestrator.transcript_window", 10)?
            .set_default("orchestrator.asked_question_history", 10)?
            .set_default("orchestrator.completion_confidence_threshold", 0.8)?
            .set_default("orchestrator.generate_initial_question", true)?
            .set_default("orchestrator.initial_question_delay_ms", 2000)?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::load().expect("Failed to load default settings")
    }
}
