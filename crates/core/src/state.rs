// Session state tracking shared between command threads and engine callbacks

use crate::engine::EngineEvent;
use parking_lot::RwLock;
use std::sync::Arc;

/// Lifecycle of the controller's current session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No live session
    Absent,
    /// Player being created and bound
    Creating,
    Playing,
    Paused,
    /// Engine stopped or reached the end; the session can still be replayed
    Stopped,
    /// Session being torn down
    Stopping,
    /// Player creation failed, or the engine reported an error
    Error,
}

impl SessionState {
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            SessionState::Playing | SessionState::Paused | SessionState::Stopped
        )
    }

    pub fn can_transition(from: SessionState, to: SessionState) -> bool {
        use SessionState::*;
        match (from, to) {
            // a new play command may start from anywhere but a teardown
            (Stopping, Creating) => false,
            (_, Creating) => true,
            (Creating, Playing | Error | Stopping) => true,
            (Playing, Paused | Stopped | Error | Stopping) => true,
            (Paused, Playing | Stopped | Error | Stopping) => true,
            (Stopped, Playing | Error | Stopping) => true,
            (Error, Stopping) => true,
            (Stopping, Absent) => true,
            (Error, Absent) => true,
            (s, t) => s == t,
        }
    }
}

struct Tracked {
    generation: u64,
    state: SessionState,
}

/// Thread-safe state container.
///
/// Every session gets a generation number; updates carrying an older
/// generation come from a torn-down session's late callbacks and are ignored.
#[derive(Clone)]
pub struct SessionStateContainer {
    inner: Arc<RwLock<Tracked>>,
}

impl SessionStateContainer {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Tracked {
                generation: 0,
                state: SessionState::Absent,
            })),
        }
    }

    pub fn get_state(&self) -> SessionState {
        self.inner.read().state
    }

    /// Start a new session generation in `Creating`
    pub fn begin(&self) -> u64 {
        let mut tracked = self.inner.write();
        tracked.generation += 1;
        tracked.state = SessionState::Creating;
        log::debug!(
            "Session {} state changed to: {:?}",
            tracked.generation,
            tracked.state
        );
        tracked.generation
    }

    /// Set the state unconditionally for the current generation
    pub fn set_state(&self, new_state: SessionState) {
        let mut tracked = self.inner.write();
        tracked.state = new_state;
        log::debug!(
            "Session {} state changed to: {:?}",
            tracked.generation,
            new_state
        );
    }

    /// Apply a transition on behalf of session `generation`.
    /// Returns false if the session is stale or the transition is not allowed.
    pub fn transition(&self, generation: u64, to: SessionState) -> bool {
        let mut tracked = self.inner.write();
        if tracked.generation != generation {
            return false;
        }
        if !SessionState::can_transition(tracked.state, to) {
            return false;
        }
        if tracked.state != to {
            log::debug!("Session {} state: {:?} -> {:?}", generation, tracked.state, to);
        }
        tracked.state = to;
        true
    }

    /// Like `transition`, but only out of `from`
    pub fn transition_from(&self, generation: u64, from: SessionState, to: SessionState) -> bool {
        let mut tracked = self.inner.write();
        if tracked.generation != generation || tracked.state != from {
            return false;
        }
        tracked.state = to;
        log::debug!("Session {} state: {:?} -> {:?}", generation, from, to);
        true
    }

    /// Track an engine event for session `generation`
    pub fn apply_event(&self, generation: u64, event: &EngineEvent) {
        let to = match event {
            EngineEvent::Playing => SessionState::Playing,
            EngineEvent::Paused => SessionState::Paused,
            EngineEvent::Stopped | EngineEvent::EndReached => SessionState::Stopped,
            EngineEvent::EncounteredError => SessionState::Error,
            _ => return,
        };
        self.transition(generation, to);
    }
}

impl Default for SessionStateContainer {
    fn default() -> Self {
        Self::new()
    }
}
