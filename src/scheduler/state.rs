use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
    ShuttingDown,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Running => write!(f, "running"),
            RunState::Paused => write!(f, "paused"),
            RunState::ShuttingDown => write!(f, "shutting down"),
        }
    }
}

/// Outcome of a requested run-state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Changed,
    /// Already in the requested state.
    Unchanged,
    /// Not allowed from the current state (shutdown is terminal).
    Rejected,
}

/// Run/pause/shutdown flag shared by every actor.
///
/// The state lives in a watch channel so a paused scheduler can block on
/// the next change instead of polling. Reaching `ShuttingDown` also cancels
/// a token that the receiver, console and idle waits select on.
#[derive(Debug, Clone)]
pub struct RunControl {
    state: Arc<watch::Sender<RunState>>,
    shutdown: CancellationToken,
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

impl RunControl {
    pub fn new() -> Self {
        let (state, _) = watch::channel(RunState::Running);
        Self {
            state: Arc::new(state),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state() == RunState::ShuttingDown
    }

    /// RUNNING -> PAUSED
    pub fn pause(&self) -> Transition {
        self.transition(RunState::Running, RunState::Paused)
    }

    /// PAUSED -> RUNNING
    pub fn resume(&self) -> Transition {
        self.transition(RunState::Paused, RunState::Running)
    }

    /// Any state -> SHUTTING_DOWN. Idempotent.
    pub fn shutdown(&self) -> Transition {
        let changed = self.state.send_if_modified(|state| {
            if *state == RunState::ShuttingDown {
                false
            } else {
                *state = RunState::ShuttingDown;
                true
            }
        });
        self.shutdown.cancel();
        if changed {
            tracing::info!("Run state changed to shutting down");
            Transition::Changed
        } else {
            Transition::Unchanged
        }
    }

    fn transition(&self, from: RunState, to: RunState) -> Transition {
        let mut outcome = Transition::Unchanged;
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                outcome = Transition::Changed;
                true
            } else {
                if *state == RunState::ShuttingDown {
                    outcome = Transition::Rejected;
                }
                false
            }
        });
        if outcome == Transition::Changed {
            tracing::info!(from = %from, to = %to, "Run state changed");
        }
        outcome
    }

    /// Block while paused. Returns the first non-paused state observed.
    pub async fn wait_while_paused(&self) -> RunState {
        let mut rx = self.state.subscribe();
        let state = match rx.wait_for(|state| *state != RunState::Paused).await {
            Ok(state) => *state,
            Err(_) => RunState::ShuttingDown,
        };
        state
    }

    /// Resolves once shutdown has been requested.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.shutdown.cancelled()
    }
}
