//! Session State Machine
//!
//! Defines the token lifecycle against the Data API server: when to log in,
//! when to reuse the held token and when to retire it.

use chrono::{DateTime, Local, TimeDelta};

use crate::timing;

/// Lifecycle states of the remote session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No token held
    Unauthenticated,
    /// Token held and younger than the maximum age
    Authenticated,
    /// Token reached its maximum age and must be logged out
    Expiring,
}

/// Events that can trigger session transitions
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Server answered the login with a token
    TokenIssued {
        token: String,
        issued_at: DateTime<Local>,
    },
    /// Server rejected the login or could not be reached
    AuthenticationFailed { reason: String },
    /// Held token reached its maximum age
    ExpiryReached,
    /// Token was logged out (or the logout was attempted)
    LoggedOut,
    /// Server no longer accepts the held token
    TokenRejected,
}

/// Result of a state transition attempt
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionResult {
    /// Transition was valid, machine is now in this state
    Success(SessionState),
    /// Transition was invalid from current state
    Invalid { from: SessionState, event: SessionEvent },
}

/// What the cycle has to do with the session before uploading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// No token: log in
    Authenticate,
    /// Token still valid: use it
    Reuse,
    /// Token too old: log out and skip this cycle
    Retire,
}

/// Token lifecycle state machine
#[derive(Debug)]
pub struct SessionStateMachine {
    current_state: SessionState,
    token: Option<String>,
    issued_at: Option<DateTime<Local>>,
    max_age: TimeDelta,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new(TimeDelta::seconds(timing::TOKEN_MAX_AGE_SECS))
    }
}

impl SessionStateMachine {
    /// Create a new state machine without a token
    pub fn new(max_age: TimeDelta) -> Self {
        Self {
            current_state: SessionState::Unauthenticated,
            token: None,
            issued_at: None,
            max_age,
        }
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.current_state
    }

    /// Token usable for requests, only while authenticated
    pub fn token(&self) -> Option<&str> {
        match self.current_state {
            SessionState::Authenticated => self.token.as_deref(),
            _ => None,
        }
    }

    /// Token held for logout, regardless of its age
    pub fn held_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn issued_at(&self) -> Option<DateTime<Local>> {
        self.issued_at
    }

    pub fn max_age(&self) -> TimeDelta {
        self.max_age
    }

    /// Check whether the held token has reached its maximum age
    pub fn is_expired(&self, now: DateTime<Local>) -> bool {
        match self.issued_at {
            Some(issued_at) => now.signed_duration_since(issued_at) >= self.max_age,
            None => false,
        }
    }

    /// Decide what the current cycle has to do with the session
    pub fn next_action(&self, now: DateTime<Local>) -> SessionAction {
        match self.current_state {
            SessionState::Unauthenticated => SessionAction::Authenticate,
            SessionState::Authenticated if self.is_expired(now) => SessionAction::Retire,
            SessionState::Authenticated => SessionAction::Reuse,
            SessionState::Expiring => SessionAction::Retire,
        }
    }

    /// Return the expiry event if the held token is too old
    pub fn check_expiry(&self, now: DateTime<Local>) -> Option<SessionEvent> {
        if self.current_state == SessionState::Authenticated && self.is_expired(now) {
            Some(SessionEvent::ExpiryReached)
        } else {
            None
        }
    }

    /// Process an event and return the transition result
    pub fn process_event(&mut self, event: SessionEvent) -> TransitionResult {
        use SessionEvent::*;
        use SessionState::*;

        match (self.current_state, &event) {
            // An empty token is an error response in disguise
            (Unauthenticated, TokenIssued { token, .. }) if token.is_empty() => {
                TransitionResult::Success(Unauthenticated)
            }
            (Unauthenticated, TokenIssued { token, issued_at }) => {
                self.token = Some(token.clone());
                self.issued_at = Some(*issued_at);
                self.current_state = Authenticated;
                TransitionResult::Success(Authenticated)
            }
            (Unauthenticated, AuthenticationFailed { .. }) => {
                TransitionResult::Success(Unauthenticated)
            }

            (Authenticated, ExpiryReached) => {
                self.current_state = Expiring;
                TransitionResult::Success(Expiring)
            }

            (Authenticated | Expiring, LoggedOut | TokenRejected) => {
                self.clear();
                TransitionResult::Success(Unauthenticated)
            }

            _ => TransitionResult::Invalid {
                from: self.current_state,
                event: event.clone(),
            },
        }
    }

    fn clear(&mut self) {
        self.token = None;
        self.issued_at = None;
        self.current_state = SessionState::Unauthenticated;
    }
}
