//! One-shot component lifecycle
//!
//! Guards a component so the start and stop bodies each execute at most once,
//! across any number of concurrent callers. The component calls
//! [`Lifecycle::begin_start`] / [`Lifecycle::begin_stop`] before running the
//! body and records the outcome afterwards; redundant callers get the
//! `AlreadyStarted` / `AlreadyStopped` signal instead of re-entering.

use parking_lot::Mutex;

use crate::ComponentError;

/// Observable component states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Constructed, never started
    Created,
    /// Start body in progress
    Starting,
    /// Start completed successfully
    Running,
    /// Stop body in progress
    Stopping,
    /// Stopped, or start failed; terminal
    Stopped,
}

/// The one-shot state machine.
///
/// Transitions are guarded by a mutex; the start/stop bodies themselves run
/// outside the lock.
#[derive(Debug)]
pub struct Lifecycle {
    state: Mutex<State>,
}

impl Lifecycle {
    /// Create a lifecycle in the `Created` state
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Created),
        }
    }

    /// Current state
    pub fn state(&self) -> State {
        *self.state.lock()
    }

    /// Claim the start body: `Created → Starting`.
    ///
    /// # Errors
    ///
    /// `AlreadyStarted` when the component is starting or running,
    /// `AlreadyStopped` once it has begun stopping.
    pub fn begin_start(&self) -> Result<(), ComponentError> {
        let mut state = self.state.lock();
        match *state {
            State::Created => {
                *state = State::Starting;
                Ok(())
            }
            State::Starting | State::Running => Err(ComponentError::AlreadyStarted),
            State::Stopping | State::Stopped => Err(ComponentError::AlreadyStopped),
        }
    }

    /// Record a successful start: `Starting → Running`
    pub fn start_succeeded(&self) {
        let mut state = self.state.lock();
        if *state == State::Starting {
            *state = State::Running;
        }
    }

    /// Record a failed start: `Starting → Stopped`. Components do not restart.
    pub fn start_failed(&self) {
        let mut state = self.state.lock();
        if *state == State::Starting {
            *state = State::Stopped;
        }
    }

    /// Claim the stop body: `{Created, Starting, Running} → Stopping`.
    ///
    /// Stopping a never-started component is allowed so the runtime can
    /// unwind a partially started graph.
    ///
    /// # Errors
    ///
    /// `AlreadyStopped` when the component is stopping or stopped.
    pub fn begin_stop(&self) -> Result<(), ComponentError> {
        let mut state = self.state.lock();
        match *state {
            State::Created | State::Starting | State::Running => {
                *state = State::Stopping;
                Ok(())
            }
            State::Stopping | State::Stopped => Err(ComponentError::AlreadyStopped),
        }
    }

    /// Record the end of the stop body: `Stopping → Stopped`
    pub fn stopped(&self) {
        *self.state.lock() = State::Stopped;
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod tests;
