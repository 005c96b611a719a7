pub mod call_session;
pub mod checklist;
pub mod question;
pub mod transcript;

pub use call_session::{CallSession, SessionStatus};
pub use checklist::{ChecklistTemplate, SessionChecklist, SessionChecklistItem, TemplateItem};
pub use question::StoredQuestion;
pub use transcript::StoredSegment;
