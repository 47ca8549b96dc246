//! Cycle processing
//!
//! One cycle: paint the progress pixel, make sure a session token exists,
//! read and upload a record when it does, show the outcome on the matrix,
//! hold, clear, and advance the progress counter.

use crate::clock::Clock;
use crate::config::AgentSettings;
use crate::display::{CycleCounter, DisplayFeedback, StatusColor};
use crate::remote::{RemoteSession, SessionStatus};
use crate::sensor::SensorReader;
use crate::upload::RecordUploader;
use chrono::{DateTime, Local};
use sensehat_shared::ApiFault;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Display holds applied during a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleHolds {
    pub cycle_end: Duration,
    pub upload_failure: Duration,
    pub auth_failure: Duration,
}

impl From<&AgentSettings> for CycleHolds {
    fn from(settings: &AgentSettings) -> Self {
        Self {
            cycle_end: Duration::from_millis(settings.cycle_end_hold_ms),
            upload_failure: Duration::from_millis(settings.upload_failure_hold_ms),
            auth_failure: Duration::from_millis(settings.auth_failure_hold_ms),
        }
    }
}

/// How a cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Record created; the script may still have failed
    Uploaded {
        record_id: Option<String>,
        script_error: Option<ApiFault>,
    },
    /// Record not created
    UploadFailed {
        fault: ApiFault,
        script_error: Option<ApiFault>,
    },
    /// Login failed, nothing was uploaded
    AuthenticationFailed { reason: String },
    /// Token was logged out for age, nothing was uploaded
    SessionRetired,
}

/// Result of one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Progress position used by this cycle
    pub index: usize,
    pub outcome: CycleOutcome,
}

impl CycleReport {
    fn log(&self) {
        let script = |error: &Option<ApiFault>| if error.is_some() { ", script failed" } else { "" };

        match &self.outcome {
            CycleOutcome::Uploaded {
                record_id,
                script_error,
            } => debug!(
                "[CYCLE] #{} uploaded record {}{}",
                self.index,
                record_id.as_deref().unwrap_or("?"),
                script(script_error)
            ),
            CycleOutcome::UploadFailed {
                fault,
                script_error,
            } => warn!(
                "[CYCLE] #{} upload failed ({}){}",
                self.index,
                fault.code,
                script(script_error)
            ),
            CycleOutcome::AuthenticationFailed { reason } => {
                warn!("[CYCLE] #{} skipped, not logged in: {}", self.index, reason)
            }
            CycleOutcome::SessionRetired => {
                info!("[CYCLE] #{} skipped, session retired", self.index)
            }
        }
    }
}

/// Everything a cycle touches
pub struct Agent {
    session: RemoteSession,
    sensors: SensorReader,
    uploader: RecordUploader,
    feedback: DisplayFeedback,
    counter: CycleCounter,
    clock: Arc<dyn Clock>,
    holds: CycleHolds,
}

impl Agent {
    pub fn new(
        session: RemoteSession,
        sensors: SensorReader,
        uploader: RecordUploader,
        feedback: DisplayFeedback,
        clock: Arc<dyn Clock>,
        holds: CycleHolds,
    ) -> Self {
        Self {
            session,
            sensors,
            uploader,
            feedback,
            counter: CycleCounter::new(),
            clock,
            holds,
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> &RemoteSession {
        &self.session
    }

    #[cfg(test)]
    pub fn counter(&self) -> CycleCounter {
        self.counter
    }

    /// Blank the matrix before the first cycle
    pub async fn reset_display(&mut self) {
        self.feedback.finish_cycle().await;
    }

    /// Run one complete cycle
    pub async fn process_cycle(&mut self) -> CycleReport {
        let index = self.counter.index();
        self.feedback.begin_cycle(&self.counter).await;
        let started_at = self.clock.now();

        let outcome = match self.session.ensure().await {
            SessionStatus::Ready(token) => self.upload(&token, started_at).await,
            SessionStatus::AuthenticationFailed { reason } => {
                self.feedback
                    .show_status(StatusColor::AuthenticationFailed)
                    .await;
                self.clock.sleep(self.holds.auth_failure).await;
                CycleOutcome::AuthenticationFailed { reason }
            }
            SessionStatus::Retired => CycleOutcome::SessionRetired,
        };

        self.clock.sleep(self.holds.cycle_end).await;
        self.feedback.finish_cycle().await;
        self.counter.advance();

        let report = CycleReport { index, outcome };
        report.log();
        report
    }

    async fn upload(&mut self, token: &str, started_at: DateTime<Local>) -> CycleOutcome {
        let snapshot = self.sensors.snapshot(self.clock.now()).await;
        let record = self
            .uploader
            .build_record(&snapshot, &started_at, &self.clock.now());
        let result = self
            .uploader
            .submit(self.session.api(), token, &record)
            .await;

        match result.record_error {
            Some(fault) => {
                if fault.is_invalid_token() {
                    self.session.invalidate();
                }
                self.feedback.show_status(StatusColor::UploadFailed).await;
                self.clock.sleep(self.holds.upload_failure).await;
                CycleOutcome::UploadFailed {
                    fault,
                    script_error: result.script_error,
                }
            }
            None => CycleOutcome::Uploaded {
                record_id: result.record_id,
                script_error: result.script_error,
            },
        }
    }

    /// Log out and blank the matrix at process stop
    pub async fn shutdown(&mut self) {
        self.session.shutdown().await;
        self.feedback.finish_cycle().await;
    }
}
