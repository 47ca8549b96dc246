//! Remote Session
//!
//! Owns the token lifecycle against the Data API server: logs in when no
//! token is held, reuses the token while it is young enough, and logs it out
//! (skipping the cycle) once it reaches its maximum age.

use crate::clock::Clock;
use crate::remote::traits::DataApi;
use chrono::TimeDelta;
use sensehat_shared::state_machine::{
    SessionAction, SessionEvent, SessionState, SessionStateMachine, TransitionResult,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// What the current cycle may do after the session check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Token available for uploading
    Ready(String),
    /// Login failed; the cycle is abandoned
    AuthenticationFailed { reason: String },
    /// Token was logged out for age; the cycle is abandoned
    Retired,
}

/// Session token lifecycle against one Data API server
pub struct RemoteSession {
    api: Box<dyn DataApi>,
    fsm: SessionStateMachine,
    clock: Arc<dyn Clock>,
}

impl RemoteSession {
    /// Create a session without a token
    pub fn new(api: Box<dyn DataApi>, max_age: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            fsm: SessionStateMachine::new(max_age),
            clock,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> SessionState {
        self.fsm.state()
    }

    /// Token usable for requests
    #[cfg(test)]
    pub fn token(&self) -> Option<&str> {
        self.fsm.token()
    }

    pub fn api(&self) -> &dyn DataApi {
        self.api.as_ref()
    }

    /// Make sure the cycle has a token: log in, reuse, or retire
    pub async fn ensure(&mut self) -> SessionStatus {
        let now = self.clock.now();

        match self.fsm.next_action(now) {
            SessionAction::Authenticate => self.login().await,
            SessionAction::Reuse => match self.fsm.token() {
                Some(token) => SessionStatus::Ready(token.to_string()),
                // Unreachable by construction of the state machine
                None => self.login().await,
            },
            SessionAction::Retire => {
                if let Some(event) = self.fsm.check_expiry(now) {
                    self.fsm.process_event(event);
                }
                info!(
                    "[SESSION] Token older than {} minutes, logging out",
                    self.fsm.max_age().num_minutes()
                );
                self.logout().await;
                self.rebuild().await;
                SessionStatus::Retired
            }
        }
    }

    async fn login(&mut self) -> SessionStatus {
        info!("[SESSION] Logging in to {}", self.api.endpoint());

        let event = match self.api.authenticate().await {
            Ok(token) => SessionEvent::TokenIssued {
                token,
                issued_at: self.clock.now(),
            },
            Err(e) => SessionEvent::AuthenticationFailed {
                reason: format!("{:#}", e),
            },
        };

        let reason = match &event {
            SessionEvent::AuthenticationFailed { reason } => reason.clone(),
            _ => "server returned an empty token".to_string(),
        };

        match self.fsm.process_event(event) {
            TransitionResult::Success(SessionState::Authenticated) => {
                info!("[SESSION] Token received");
                match self.fsm.token() {
                    Some(token) => SessionStatus::Ready(token.to_string()),
                    None => SessionStatus::AuthenticationFailed { reason },
                }
            }
            _ => {
                error!("[SESSION] Login failed: {}", reason);
                SessionStatus::AuthenticationFailed { reason }
            }
        }
    }

    /// Log the held token out; the token is dropped even if the server refuses
    async fn logout(&mut self) {
        if let Some(token) = self.fsm.held_token().map(str::to_owned) {
            match self.api.logout(&token).await {
                Ok(()) => info!("[SESSION] Logged out"),
                Err(e) => warn!("[SESSION] Logout failed: {:#}", e),
            }
        }
        self.fsm.process_event(SessionEvent::LoggedOut);
    }

    /// Reload connection settings so the next login uses fresh values
    async fn rebuild(&mut self) {
        if let Err(e) = self.api.reload().await {
            error!("[SESSION] Failed to reload connection settings: {:#}", e);
        }
    }

    /// Drop a token the server no longer accepts so the next cycle logs in
    pub fn invalidate(&mut self) {
        if let TransitionResult::Success(_) = self.fsm.process_event(SessionEvent::TokenRejected) {
            warn!("[SESSION] Server rejected the token, logging in again next cycle");
        }
    }

    /// Log out at process stop
    pub async fn shutdown(&mut self) {
        if self.fsm.held_token().is_some() {
            info!("[SESSION] Shutting down, logging out");
            self.logout().await;
        }
    }
}
