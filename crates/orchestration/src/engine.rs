use std::sync::Arc;

use bson::oid::ObjectId;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::collaborator::Collaborators;
use crate::config::OrchestratorConfig;
use crate::session::{SessionCommand, SessionView, SessionWorker};
use crate::{AssistEvent, CaptionEvent, ChecklistItem};

/// Manages per-call session workers.
///
/// Created once at startup and shared via `Arc`. Each active call session
/// gets its own worker task; assist events from all sessions fan out on one
/// broadcast channel.
pub struct SessionEngine {
    config: OrchestratorConfig,
    collaborators: Arc<Collaborators>,
    /// Active workers, keyed by session id.
    sessions: DashMap<ObjectId, SessionHandle>,
    /// Broadcast channel for assist events.
    events_tx: broadcast::Sender<AssistEvent>,
}

struct SessionHandle {
    cmd_tx: mpsc::Sender<SessionCommand>,
    abort_handle: tokio::task::AbortHandle,
}

impl SessionEngine {
    /// Creates the engine.
    ///
    /// Returns `(engine, event_receiver)`.
    pub fn new(
        config: OrchestratorConfig,
        collaborators: Collaborators,
    ) -> (Arc<Self>, broadcast::Receiver<AssistEvent>) {
        let (events_tx, events_rx) = broadcast::channel(256);

        let engine = Arc::new(Self {
            config,
            collaborators: Arc::new(collaborators),
            sessions: DashMap::new(),
            events_tx,
        });

        (engine, events_rx)
    }

    /// Returns a new broadcast receiver for assist events.
    pub fn subscribe(&self) -> broadcast::Receiver<AssistEvent> {
        self.events_tx.subscribe()
    }

    /// Starts a worker for a call session.
    ///
    /// If a worker already exists for this session it is replaced (e.g. the
    /// agent restarted the sidebar).
    pub fn start_session(
        self: &Arc<Self>,
        session_id: ObjectId,
        meeting_url: String,
        checklist_items: Vec<ChecklistItem>,
    ) {
        if let Some((_, old)) = self.sessions.remove(&session_id) {
            info!(%session_id, "Replacing existing session worker");
            old.abort_handle.abort();
        }

        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let worker = SessionWorker::new(
            session_id,
            meeting_url,
            checklist_items,
            self.config.clone(),
            Arc::clone(&self.collaborators),
            self.events_tx.clone(),
        );

        // Spawn worker and auto-cleanup on completion
        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move {
            worker.run(cmd_rx).await;
            engine.sessions.remove(&session_id);
            debug!(%session_id, "Session worker entry cleaned up");
        });

        self.sessions.insert(
            session_id,
            SessionHandle {
                cmd_tx,
                abort_handle: handle.abort_handle(),
            },
        );

        debug!(%session_id, "Session worker started");
    }

    /// Forwards a caption event to the session's worker, preserving arrival
    /// order. Returns false when the session has no active worker.
    pub async fn send_caption(&self, session_id: ObjectId, event: CaptionEvent) -> bool {
        let Some(cmd_tx) = self.command_sender(&session_id) else {
            return false;
        };
        cmd_tx.send(SessionCommand::Caption(event)).await.is_ok()
    }

    /// Current state snapshot of an active session.
    pub async fn view(&self, session_id: ObjectId) -> Option<SessionView> {
        let cmd_tx = self.command_sender(&session_id)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        if cmd_tx.send(SessionCommand::View(reply_tx)).await.is_err() {
            return None;
        }
        reply_rx.await.ok()
    }

    /// Stops the session's worker, returning its final snapshot.
    pub async fn stop_session(&self, session_id: ObjectId) -> Option<SessionView> {
        let view = self.view(session_id).await;
        if let Some(cmd_tx) = self.command_sender(&session_id) {
            if cmd_tx.send(SessionCommand::Stop).await.is_err() {
                warn!(%session_id, "Session worker already gone on stop");
            }
        }
        view
    }

    pub fn is_active(&self, session_id: &ObjectId) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Returns the number of active session workers.
    pub fn active_session_count(&self) -> usize {
        self.sessions.len()
    }

    // Clone the sender out so no map guard is held across an await.
    fn command_sender(&self, session_id: &ObjectId) -> Option<mpsc::Sender<SessionCommand>> {
        self.sessions.get(session_id).map(|h| h.cmd_tx.clone())
    }
}
