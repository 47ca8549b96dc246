//! Sense HAT Telemetry Shared Types
//!
//! This crate provides the hardware-independent pieces of the telemetry
//! agent: the session lifecycle state machine, the sensor snapshot and
//! upload record types, and the FileMaker Data API wire codec.

pub mod record;
pub mod state_machine;
pub mod wire;

use chrono::{DateTime, Local};

// Re-export commonly used types at crate root
pub use record::{fields, BoardIdentity, ScriptRequest, ScriptTiming, SensorSnapshot, UploadRecord, GAP_SCRIPT};
pub use state_machine::{SessionAction, SessionEvent, SessionState, SessionStateMachine, TransitionResult};
pub use wire::{ApiFault, SubmitResult, WireError};

/// Get the current local wall-clock time
pub fn now_local() -> DateTime<Local> {
    Local::now()
}

/// Format a timestamp the way FileMaker timestamp fields accept it
pub fn format_timestamp(at: &DateTime<Local>) -> String {
    at.format("%m/%d/%Y %H:%M:%S").to_string()
}

/// Timing parameters for the agent
pub mod timing {
    /// Default tick interval in milliseconds
    pub const DEFAULT_TICK_INTERVAL_MS: u64 = 60_000;

    /// Token age at which the session is logged out and retired
    pub const TOKEN_MAX_AGE_SECS: i64 = 14 * 60;

    /// Hold after the cycle outcome is rendered, before the matrix is cleared
    pub const CYCLE_END_HOLD_MS: u64 = 500;

    /// Red overlay hold after a failed upload
    pub const UPLOAD_FAILURE_HOLD_MS: u64 = 5_000;

    /// Amber overlay hold after a failed login
    pub const AUTH_FAILURE_HOLD_MS: u64 = 1_000;

    /// HTTP request timeout for Data API calls
    pub const REQUEST_TIMEOUT_MS: u64 = 15_000;
}

/// Matrix geometry
pub mod matrix {
    /// Pixels per row and per column
    pub const SIDE: usize = 8;

    /// Number of progress positions before the indicator wraps
    pub const PIXEL_COUNT: usize = SIDE * SIDE;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp() {
        let at = Local.with_ymd_and_hms(2024, 3, 7, 14, 5, 9).unwrap();
        assert_eq!(format_timestamp(&at), "03/07/2024 14:05:09");
    }

    #[test]
    fn test_matrix_geometry() {
        assert_eq!(matrix::PIXEL_COUNT, 64);
    }
}
