use tokio::time::{Duration, Instant};

use crate::config::OrchestratorConfig;

/// Turn-taking signals derived from the segment stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnSignal {
    /// The client stopped talking long enough to count as done answering.
    ClientPaused,
    /// The agent started talking right after the client; faster, equivalent
    /// end-of-turn signal.
    AgentTookFloor,
}

/// Outcome of a pause-check timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseCheck {
    /// Inactivity threshold met; the client turn is over.
    Fire,
    /// Client spoke again in the interim; re-arm the timer at this deadline.
    Reschedule(Instant),
    /// This turn was already signaled (or there never was client activity);
    /// drop the timer.
    Stale,
}

/// Tracks whose turn it is and debounces the client-pause signal.
///
/// The tracker itself is deterministic; the session worker owns the actual
/// timer and feeds `Instant`s in. At most one of {`ClientPaused`,
/// `AgentTookFloor`} is produced per client turn.
pub struct TurnTracker {
    pause_check_delay: Duration,
    pause_threshold: Duration,
    active_speech_window: Duration,
    last_client_activity: Option<Instant>,
    client_speaking: bool,
    signaled: bool,
}

impl TurnTracker {
    pub fn new(config: &OrchestratorConfig) -> Self {
        Self {
            pause_check_delay: Duration::from_millis(config.pause_check_delay_ms),
            pause_threshold: Duration::from_millis(config.pause_threshold_ms),
            active_speech_window: Duration::from_millis(config.active_speech_window_ms),
            last_client_activity: None,
            client_speaking: false,
            signaled: false,
        }
    }

    /// Records client speech (new segment or in-place update) and returns the
    /// deadline at which the pause check should next run. Cancels any earlier
    /// signal state: this is a fresh (or continuing) turn.
    pub fn mark_client_activity(&mut self, now: Instant) -> Instant {
        self.last_client_activity = Some(now);
        self.client_speaking = true;
        self.signaled = false;
        now + self.pause_check_delay
    }

    /// Runs the scheduled pause check. The caller must re-arm the timer on
    /// `Reschedule` and treat `Stale` as a no-op; this is what keeps a stale
    /// timer from firing after the state has moved on.
    pub fn pause_check(&mut self, now: Instant) -> PauseCheck {
        if self.signaled {
            return PauseCheck::Stale;
        }
        let Some(last) = self.last_client_activity else {
            return PauseCheck::Stale;
        };
        if now.duration_since(last) >= self.pause_threshold {
            self.client_speaking = false;
            self.signaled = true;
            PauseCheck::Fire
        } else {
            PauseCheck::Reschedule(last + self.pause_check_delay)
        }
    }

    /// The agent started a segment immediately after a client segment. Ends
    /// the client turn unless a pause was already signaled for it.
    pub fn mark_agent_took_floor(&mut self) -> Option<TurnSignal> {
        self.client_speaking = false;
        if self.signaled {
            None
        } else {
            self.signaled = true;
            Some(TurnSignal::AgentTookFloor)
        }
    }

    /// Re-verified at decision time: speaking status can change during the
    /// debounce window and while analyses are in flight.
    pub fn is_client_actively_speaking(&self, now: Instant) -> bool {
        self.client_speaking
            && self
                .last_client_activity
                .is_some_and(|last| now.duration_since(last) < self.active_speech_window)
    }

    pub fn millis_since_client_activity(&self, now: Instant) -> Option<u64> {
        self.last_client_activity
            .map(|last| now.duration_since(last).as_millis() as u64)
    }
}
