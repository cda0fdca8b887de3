//! Request lifecycle state machine
//!
//! ```text
//! Received -> Validated -> AccessChecked -> Aggregated -> Reconciled -> Serialized -> Returned
//!     \___________\______________\______________\_____________\_____________\--> Errored
//! ```
//!
//! `Returned` and `Errored` are terminal.

use crate::domain::{Component, GatewayError, Result};
use serde::Serialize;
use std::fmt;

/// Lifecycle state of one `$everything` request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CoordinationState {
    Received,
    Validated,
    AccessChecked,
    Aggregated,
    Reconciled,
    Serialized,
    Returned,
    Errored,
}

impl CoordinationState {
    /// The state a successful step leads to
    pub fn next(self) -> Option<CoordinationState> {
        use CoordinationState::*;
        match self {
            Received => Some(Validated),
            Validated => Some(AccessChecked),
            AccessChecked => Some(Aggregated),
            Aggregated => Some(Reconciled),
            Reconciled => Some(Serialized),
            Serialized => Some(Returned),
            Returned | Errored => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CoordinationState::Returned | CoordinationState::Errored)
    }

    /// Whether `self -> to` is a legal transition
    pub fn can_transition_to(self, to: CoordinationState) -> bool {
        if to == CoordinationState::Errored {
            return !self.is_terminal();
        }
        self.next() == Some(to)
    }
}

impl fmt::Display for CoordinationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Tracks the current state and every state visited
#[derive(Debug, Clone)]
pub struct StateTracker {
    current: CoordinationState,
    trace: Vec<CoordinationState>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self {
            current: CoordinationState::Received,
            trace: vec![CoordinationState::Received],
        }
    }

    pub fn current(&self) -> CoordinationState {
        self.current
    }

    pub fn trace(&self) -> &[CoordinationState] {
        &self.trace
    }

    pub fn into_trace(self) -> Vec<CoordinationState> {
        self.trace
    }

    /// Moves to `to`
    ///
    /// # Errors
    ///
    /// Returns a `Service` error for an illegal transition; the tracker is
    /// left unchanged.
    pub fn advance(&mut self, to: CoordinationState) -> Result<()> {
        if !self.current.can_transition_to(to) {
            return Err(GatewayError::service(
                Component::Coordination,
                format!("illegal state transition {} -> {}", self.current, to),
            ));
        }

        tracing::trace!(from = %self.current, to = %to, "Coordination state transition");
        self.current = to;
        self.trace.push(to);
        Ok(())
    }

    /// Moves to `Errored` unless already terminal
    pub fn fail(&mut self) {
        if !self.current.is_terminal() {
            self.current = CoordinationState::Errored;
            self.trace.push(CoordinationState::Errored);
        }
    }
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}
