pub mod base;
pub mod checklist;
pub mod question;
pub mod session;
pub mod transcript;

pub use base::{DaoError, DaoResult, PaginatedResult, PaginationParams};
pub use checklist::{ChecklistDao, from_template, to_session_items};
pub use question::QuestionDao;
pub use session::SessionDao;
pub use transcript::TranscriptDao;
