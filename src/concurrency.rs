//! Rebuild coalescing
//!
//! A [`SingleFlight`] gate lets at most one rebuild run at a time. Requests
//! that arrive while a run is in flight collapse into a single queued rerun,
//! so the final state always reflects the most recent request without
//! unbounded queuing.

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Gate state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightState {
    /// Nothing running
    Idle,
    /// One run in flight
    Running,
    /// One run in flight and one more requested
    Queued,
}

/// Single-flight gate with one-deep rerun queue
pub struct SingleFlight {
    state: Mutex<FlightState>,
    idle: Notify,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FlightState::Idle),
            idle: Notify::new(),
        }
    }

    /// Request a run
    ///
    /// Returns true when the caller now owns the flight and must run; false
    /// when the request was folded into the in-flight run.
    pub fn try_begin(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            FlightState::Idle => {
                *state = FlightState::Running;
                true
            }
            FlightState::Running | FlightState::Queued => {
                *state = FlightState::Queued;
                false
            }
        }
    }

    /// Finish a run
    ///
    /// Returns true when a rerun was queued; the owner must run again.
    pub fn complete(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            FlightState::Queued => {
                *state = FlightState::Running;
                true
            }
            FlightState::Running | FlightState::Idle => {
                *state = FlightState::Idle;
                drop(state);
                self.idle.notify_waiters();
                false
            }
        }
    }

    /// Drop a queued rerun; the in-flight run, if any, still completes
    ///
    /// Returns true when a rerun was dropped.
    pub fn cancel_queued(&self) -> bool {
        let mut state = self.state.lock();
        if *state == FlightState::Queued {
            *state = FlightState::Running;
            true
        } else {
            false
        }
    }

    pub fn state(&self) -> FlightState {
        *self.state.lock()
    }

    pub fn is_idle(&self) -> bool {
        self.state() == FlightState::Idle
    }

    /// Wait until no run is in flight or queued
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for SingleFlight {
    fn default() -> Self {
        Self::new()
    }
}
