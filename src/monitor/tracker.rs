// SPDX-License-Identifier: MPL-2.0

//! Connected/disconnected state machine.
//!
//! Only the previous state and the latest probe result are compared, there
//! is no debouncing. One failed probe between two good ones produces a
//! disconnect and a reconnect event.

use std::fmt;

use crate::history::EventKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    Connected,
    /// Assumed until the first probe says otherwise
    #[default]
    Disconnected,
}

impl ConnectionState {
    pub fn from_reachable(reachable: bool) -> Self {
        if reachable {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connected => f.write_str("Connected"),
            ConnectionState::Disconnected => f.write_str("Disconnected"),
        }
    }
}

impl From<ConnectionState> for EventKind {
    fn from(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Connected => EventKind::Connected,
            ConnectionState::Disconnected => EventKind::Disconnected,
        }
    }
}

/// An edge between two consecutive probe results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ConnectionState,
    pub to: ConnectionState,
}

#[derive(Debug, Default)]
pub struct ConnectionTracker {
    state: ConnectionState,
    latency: Option<u32>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Latest latency, only ever set while connected.
    pub fn latency(&self) -> Option<u32> {
        self.latency
    }

    /// Compare a probe result with the current state without changing it.
    pub fn detect(&self, reachable: bool) -> Option<Transition> {
        let next = ConnectionState::from_reachable(reachable);
        (next != self.state).then_some(Transition {
            from: self.state,
            to: next,
        })
    }

    /// Apply a transition once its side effects have run.
    pub fn commit(&mut self, transition: Transition) {
        debug_assert_eq!(transition.from, self.state);
        self.state = transition.to;
        if !self.state.is_connected() {
            self.latency = None;
        }
    }

    pub fn set_latency(&mut self, latency: Option<u32>) {
        self.latency = if self.state.is_connected() {
            latency
        } else {
            None
        };
    }
}
