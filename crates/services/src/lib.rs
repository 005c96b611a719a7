pub mod ai;
pub mod dao;
pub mod persistence;

pub use ai::{
    AiError, ClaudeAdequacyAnalyzer, ClaudeChecklistAnalyzer, ClaudeClient,
    ClaudeQuestionGenerator,
};
pub use dao::*;
pub use persistence::MongoSegmentStore;
